use anyhow::Result;
use chrono::Utc;
use clap::Args;
use labeltime_core::config::EffectiveConfig;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

use super::{SourceArgs, ensure_found, fetch_records};
use crate::output::{OutputMode, pretty_kv, render_mode};
use crate::snapshot::Snapshot;

#[derive(Args, Debug)]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Where to write the snapshot JSON.
    #[arg(long, short, value_name = "PATH")]
    pub output: PathBuf,
}

#[derive(Debug, Serialize)]
struct SnapshotSummary {
    path: String,
    project: String,
    issues: usize,
    label_events: usize,
}

pub fn run_snapshot(args: &SnapshotArgs, config: &EffectiveConfig, output: OutputMode) -> Result<()> {
    let now = Utc::now();
    let cutoff = args.source.cutoff(config, now);
    let (project, records) = fetch_records(&args.source, config, cutoff)?;
    let records = args.source.select(records, cutoff);
    ensure_found(&args.source, &records)?;

    let summary = SnapshotSummary {
        path: args.output.display().to_string(),
        project: project.clone(),
        issues: records.len(),
        label_events: records.iter().map(|record| record.label_events.len()).sum(),
    };

    Snapshot::new(project, now, records).write(&args.output)?;

    render_mode(
        output,
        &summary,
        |s, w| {
            writeln!(
                w,
                "ok=true path={} project={} issues={} label_events={}",
                s.path, s.project, s.issues, s.label_events
            )
        },
        |s, w| {
            writeln!(w, "Wrote snapshot {}", s.path)?;
            pretty_kv(w, "Project", &s.project)?;
            pretty_kv(w, "Issues", s.issues.to_string())?;
            pretty_kv(w, "Events", s.label_events.to_string())
        },
    )
}
