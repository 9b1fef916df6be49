//! On-disk snapshot of fetched issues and their label history.
//!
//! A snapshot lets `glt analyze --input` rerun an analysis offline and makes
//! reports reproducible.

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use labeltime_core::error::LabeltimeError;
use labeltime_core::{Item, RawLabelEvent};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub fetched_at: DateTime<Utc>,
    pub project: String,
    #[serde(default)]
    pub issues: Vec<IssueRecord>,
}

/// One issue together with its raw label events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRecord {
    pub issue: Item,
    #[serde(default)]
    pub label_events: Vec<RawLabelEvent>,
}

impl Snapshot {
    pub const fn new(project: String, fetched_at: DateTime<Utc>, issues: Vec<IssueRecord>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            fetched_at,
            project,
            issues,
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let unreadable = |reason: String| LabeltimeError::SnapshotUnreadable {
            path: path.to_path_buf(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|err| unreadable(err.to_string()))?;
        let snapshot: Self =
            serde_json::from_str(&content).map_err(|err| unreadable(err.to_string()))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(LabeltimeError::SnapshotVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            }
            .into());
        }

        Ok(snapshot)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(self)?;
        std::fs::write(path, serialized)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use labeltime_core::LabelAction;

    fn sample() -> Snapshot {
        let created = Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap();
        Snapshot::new(
            "acme/widgets".to_string(),
            Utc.with_ymd_and_hms(2024, 4, 7, 0, 0, 0).unwrap(),
            vec![IssueRecord {
                issue: Item::open(12, created),
                label_events: vec![RawLabelEvent::new(
                    1,
                    LabelAction::Add,
                    created,
                    7,
                    "workflow::wip",
                )],
            }],
        )
    }

    #[test]
    fn written_snapshot_reads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/snap.json");
        let snapshot = sample();
        snapshot.write(&path).expect("write");

        let loaded = Snapshot::read(&path).expect("read");
        assert_eq!(loaded.project, "acme/widgets");
        assert_eq!(loaded.issues.len(), 1);
        assert_eq!(loaded.issues[0].issue, snapshot.issues[0].issue);
        assert_eq!(loaded.issues[0].label_events, snapshot.issues[0].label_events);
    }

    #[test]
    fn future_versions_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("snap.json");
        std::fs::write(
            &path,
            r#"{"version": 9, "fetched_at": "2024-04-07T00:00:00Z", "project": "7", "issues": []}"#,
        )
        .expect("write");

        let err = Snapshot::read(&path).expect_err("version 9 must fail");
        assert!(matches!(
            err.downcast_ref::<LabeltimeError>(),
            Some(LabeltimeError::SnapshotVersion {
                found: 9,
                expected: 1
            })
        ));
    }

    #[test]
    fn garbage_is_unreadable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("snap.json");
        std::fs::write(&path, "not json").expect("write");

        let err = Snapshot::read(&path).expect_err("garbage must fail");
        assert!(matches!(
            err.downcast_ref::<LabeltimeError>(),
            Some(LabeltimeError::SnapshotUnreadable { .. })
        ));
    }
}
