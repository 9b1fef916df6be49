pub mod analyze;
pub mod completions;
pub mod config;
pub mod snapshot;

use anyhow::{Context as _, Result};
use chrono::{DateTime, TimeDelta, Utc};
use clap::Args;
use labeltime_core::config::{EffectiveConfig, TOKEN_ENV};
use labeltime_core::error::LabeltimeError;
use tracing::info;

use crate::gitlab::{GitLabClient, IssueQuery};
use crate::snapshot::IssueRecord;

/// Selection and connection flags shared by `analyze` and `snapshot`.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Restrict to a single issue (project-scoped iid).
    #[arg(value_name = "ISSUE_ID")]
    pub issue_id: Option<u64>,

    /// Only issues updated within the last N days (defaults to config, 14).
    #[arg(short, long, value_name = "N")]
    pub days: Option<u32>,

    /// GitLab project id or `group/project` path.
    #[arg(long, value_name = "ID")]
    pub project: Option<String>,

    /// GitLab base URL. Falls back to GITLAB_URL, then config.
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// GitLab API token. Falls back to GITLAB_TOKEN env var.
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,
}

impl SourceArgs {
    /// Oldest `updated_at` an issue may have to be included.
    ///
    /// Windows reaching back past the Unix epoch are clamped to it.
    pub fn cutoff(&self, config: &EffectiveConfig, now: DateTime<Utc>) -> DateTime<Utc> {
        let days = self.days.unwrap_or(config.project.analysis.days);
        TimeDelta::try_days(i64::from(days))
            .and_then(|window| now.checked_sub_signed(window))
            .map_or(DateTime::<Utc>::UNIX_EPOCH, |cutoff| {
                cutoff.max(DateTime::<Utc>::UNIX_EPOCH)
            })
    }

    /// Keep only records matching the issue filter and the update window.
    pub fn select(&self, records: Vec<IssueRecord>, cutoff: DateTime<Utc>) -> Vec<IssueRecord> {
        records
            .into_iter()
            .filter(|record| self.issue_id.is_none_or(|iid| record.issue.iid == iid))
            .filter(|record| record.issue.updated_since(cutoff))
            .collect()
    }
}

/// Fetch matching issues and their label events from GitLab.
///
/// Returns the resolved project name with the records, in ascending iid order.
pub fn fetch_records(
    args: &SourceArgs,
    config: &EffectiveConfig,
    cutoff: DateTime<Utc>,
) -> Result<(String, Vec<IssueRecord>)> {
    let project = config.project(args.project.as_deref())?;
    let url = args.url.clone().unwrap_or_else(|| config.gitlab_url());
    let token = args
        .token
        .clone()
        .or_else(|| std::env::var(TOKEN_ENV).ok());

    info!(%project, %url, since = %cutoff, "fetching issues");

    let client = GitLabClient::new(&url, token)?;
    let query = IssueQuery {
        iid: args.issue_id,
        updated_after: Some(cutoff),
    };
    let mut issues = client.fetch_issues(&project, &query)?;
    issues.sort_by_key(|issue| issue.iid);
    info!(issues = issues.len(), "fetched issues");

    let mut records = Vec::with_capacity(issues.len());
    for issue in issues {
        let label_events = client.fetch_label_events(&project, issue.iid)?;
        records.push(IssueRecord {
            issue,
            label_events,
        });
    }

    info!(requests = client.request_count(), "fetch complete");
    Ok((project, records))
}

/// Fail with [`LabeltimeError::ItemNotFound`] when a single issue was
/// requested and nothing matched.
pub fn ensure_found(args: &SourceArgs, records: &[IssueRecord]) -> Result<()> {
    match args.issue_id {
        Some(iid) if records.is_empty() => Err(LabeltimeError::ItemNotFound(iid))
            .context("no issue matched the selection"),
        _ => Ok(()),
    }
}
