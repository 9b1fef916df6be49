use anyhow::{Context as _, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use clap::Args;
use labeltime_core::config::EffectiveConfig;
use labeltime_core::duration::{as_seconds_f64, format_elapsed};
use labeltime_core::error::LabeltimeError;
use labeltime_core::{AggregateEntry, Aggregator, LabelIntervalState, reconstruct_with_diagnostics};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{SourceArgs, ensure_found, fetch_records};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};
use crate::snapshot::{IssueRecord, Snapshot};

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Analyse a snapshot file instead of fetching from GitLab.
    #[arg(long, value_name = "SNAPSHOT")]
    pub input: Option<PathBuf>,

    /// Also write the aggregate table to this file.
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Report only the configured workflow lane labels.
    #[arg(long)]
    pub lanes: bool,

    /// Print the label table of every analysed issue.
    #[arg(long)]
    pub per_item: bool,

    /// Measure open intervals up to this instant (RFC 3339). Defaults to the
    /// snapshot's fetch time with --input, otherwise now.
    #[arg(long, value_name = "RFC3339")]
    pub as_of: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct AnalysisReport {
    project: Option<String>,
    as_of: DateTime<Utc>,
    since: DateTime<Utc>,
    issues: usize,
    skipped_events: usize,
    labels: Vec<LabelRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    items: Option<Vec<ItemReport>>,
}

#[derive(Debug, Serialize)]
struct LabelRow {
    label_id: u64,
    name: String,
    count: usize,
    mean_seconds: f64,
    mean: String,
}

#[derive(Debug, Serialize)]
struct ItemReport {
    iid: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    labels: Vec<ItemLabelRow>,
    skipped: Vec<SkippedRow>,
}

#[derive(Debug, Serialize)]
struct ItemLabelRow {
    label_id: u64,
    name: String,
    seconds: f64,
    duration: String,
}

#[derive(Debug, Serialize)]
struct SkippedRow {
    index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    event_id: Option<u64>,
    reason: String,
}

pub fn run_analyze(
    args: &AnalyzeArgs,
    config: &EffectiveConfig,
    output: OutputMode,
    verbose: bool,
) -> Result<()> {
    let snapshot = match &args.input {
        Some(path) => {
            let snapshot = Snapshot::read(path)?;
            info!(
                path = %path.display(),
                issues = snapshot.issues.len(),
                fetched_at = %snapshot.fetched_at,
                "loaded snapshot"
            );
            Some(snapshot)
        }
        None => None,
    };

    // A replay measures up to the moment it was fetched unless pinned.
    let now = args
        .as_of
        .or_else(|| snapshot.as_ref().map(|snapshot| snapshot.fetched_at))
        .unwrap_or_else(Utc::now);
    let cutoff = args.source.cutoff(config, now);

    let (project, records) = match snapshot {
        Some(snapshot) => (Some(snapshot.project), snapshot.issues),
        None => {
            let (project, records) = fetch_records(&args.source, config, cutoff)?;
            (Some(project), records)
        }
    };

    let records = args.source.select(records, cutoff);
    ensure_found(&args.source, &records)?;
    info!(issues = records.len(), since = %cutoff, "analysing issues");

    let analysis = analyse(&records, now, args.per_item || verbose);
    let mut aggregator = analysis.aggregator;
    if args.lanes {
        aggregator.retain_names(&config.project.analysis.lane_labels);
    }

    let report = AnalysisReport {
        project,
        as_of: now,
        since: cutoff,
        issues: aggregator.item_count(),
        skipped_events: analysis.skipped_events,
        labels: label_rows(aggregator.finish().values())?,
        items: analysis.items,
    };

    if let Some(path) = &args.file {
        write_report_file(path, &report)?;
    }

    render_mode(output, &report, render_text, render_pretty)
}

struct Analysis {
    aggregator: Aggregator,
    skipped_events: usize,
    items: Option<Vec<ItemReport>>,
}

/// Reconstruct every record and fold it into an aggregator.
fn analyse(records: &[IssueRecord], now: DateTime<Utc>, keep_items: bool) -> Analysis {
    let mut aggregator = Aggregator::new();
    let mut skipped_events = 0;
    let mut items = keep_items.then(Vec::new);

    for record in records {
        let result = reconstruct_with_diagnostics(&record.issue, &record.label_events, now);
        debug!(
            iid = record.issue.iid,
            labels = result.labels.len(),
            skipped = result.skipped.len(),
            "reconstructed issue"
        );
        skipped_events += result.skipped.len();
        aggregator.add_item(&result.labels);

        if let Some(items) = items.as_mut() {
            let mut labels: Vec<ItemLabelRow> =
                result.labels.values().map(item_label_row).collect();
            labels.sort_by(|a, b| b.name.cmp(&a.name));
            items.push(ItemReport {
                iid: record.issue.iid,
                title: record.issue.title.clone(),
                labels,
                skipped: result
                    .skipped
                    .iter()
                    .map(|skip| SkippedRow {
                        index: skip.index,
                        event_id: skip.raw.id,
                        reason: skip.reason.to_string(),
                    })
                    .collect(),
            });
        }
    }

    Analysis {
        aggregator,
        skipped_events,
        items,
    }
}

fn item_label_row(state: &LabelIntervalState) -> ItemLabelRow {
    ItemLabelRow {
        label_id: state.label_id,
        name: state.label_name.clone(),
        seconds: as_seconds_f64(state.accumulated),
        duration: format_elapsed(state.accumulated),
    }
}

/// Mean per label, sorted by name descending.
fn label_rows<'a>(entries: impl Iterator<Item = &'a AggregateEntry>) -> Result<Vec<LabelRow>> {
    let mut rows = entries
        .map(|entry| {
            let mean = entry.mean().map_err(LabeltimeError::from)?;
            Ok(LabelRow {
                label_id: entry.label_id,
                name: entry.label_name.clone(),
                count: entry.count(),
                mean_seconds: as_seconds_f64(mean),
                mean: format_elapsed(mean),
            })
        })
        .collect::<Result<Vec<_>, LabeltimeError>>()
        .context("failed to compute label means")?;
    rows.sort_by(|a, b| b.name.cmp(&a.name));
    Ok(rows)
}

fn write_report_file(path: &Path, report: &AnalysisReport) -> Result<()> {
    let mut buf = Vec::new();
    write_grid(
        &mut buf,
        &["Name", "Average Time"],
        report
            .labels
            .iter()
            .map(|row| [row.name.clone(), row.mean.clone()]),
    )
    .and_then(|()| std::fs::write(path, &buf))
    .map_err(|err| LabeltimeError::ReportWrite {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    info!(path = %path.display(), "wrote report");
    Ok(())
}

fn render_text(report: &AnalysisReport, w: &mut dyn Write) -> io::Result<()> {
    if let Some(items) = &report.items {
        writeln!(w, "iid\tname\tseconds\tduration")?;
        for item in items {
            for label in &item.labels {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}",
                    item.iid, label.name, label.seconds, label.duration
                )?;
            }
        }
        writeln!(w)?;
    }

    writeln!(w, "name\tcount\tmean_seconds\tmean")?;
    for row in &report.labels {
        writeln!(
            w,
            "{}\t{}\t{}\t{}",
            row.name, row.count, row.mean_seconds, row.mean
        )?;
    }
    Ok(())
}

fn render_pretty(report: &AnalysisReport, w: &mut dyn Write) -> io::Result<()> {
    if let Some(items) = &report.items {
        for item in items {
            writeln!(w, ">> Label Analysis for Issue {} <<", item.iid)?;
            write_grid(
                w,
                &["Name", "Time"],
                item.labels
                    .iter()
                    .map(|label| [label.name.clone(), label.duration.clone()]),
            )?;
            for skip in &item.skipped {
                let id = skip
                    .event_id
                    .map_or_else(|| "?".to_string(), |id| id.to_string());
                writeln!(
                    w,
                    "  skipped event #{} (id {id}): {}",
                    skip.index, skip.reason
                )?;
            }
            writeln!(w)?;
        }
    }

    pretty_section(w, ">> Analysis <<")?;
    if let Some(project) = &report.project {
        pretty_kv(w, "Project", project)?;
    }
    pretty_kv(
        w,
        "Window",
        format!(
            "{} .. {}",
            report.since.to_rfc3339_opts(SecondsFormat::Secs, true),
            report.as_of.to_rfc3339_opts(SecondsFormat::Secs, true)
        ),
    )?;
    pretty_kv(w, "Issues", report.issues.to_string())?;
    if report.skipped_events > 0 {
        pretty_kv(w, "Skipped", format!("{} malformed events", report.skipped_events))?;
    }
    writeln!(w)?;

    write_grid(
        w,
        &["Name", "Average Time"],
        report
            .labels
            .iter()
            .map(|row| [row.name.clone(), row.mean.clone()]),
    )
}

/// Two-column boxed table: first column left-aligned, second right-aligned.
fn write_grid(
    w: &mut dyn Write,
    headers: &[&str; 2],
    rows: impl Iterator<Item = [String; 2]>,
) -> io::Result<()> {
    let rows: Vec<[String; 2]> = rows.collect();
    let mut widths = [headers[0].chars().count(), headers[1].chars().count()];
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let border = format!("+{}+{}+", "-".repeat(widths[0] + 2), "-".repeat(widths[1] + 2));
    writeln!(w, "{border}")?;
    writeln!(
        w,
        "| {:^w0$} | {:^w1$} |",
        headers[0],
        headers[1],
        w0 = widths[0],
        w1 = widths[1]
    )?;
    writeln!(w, "{border}")?;
    for [name, value] in &rows {
        writeln!(
            w,
            "| {name:<w0$} | {value:>w1$} |",
            w0 = widths[0],
            w1 = widths[1]
        )?;
    }
    writeln!(w, "{border}")
}
