use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The two lifecycle states of a tracked item.
///
/// GitLab spells the open state `opened`; both spellings are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    #[serde(alias = "opened")]
    Open,
    Closed,
}

impl Lifecycle {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

/// One tracked work item, as far as label analysis is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Project-scoped item number.
    pub iid: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub state: Lifecycle,
}

impl Item {
    /// An open item with no title.
    #[must_use]
    pub const fn open(iid: u64, created_at: DateTime<Utc>) -> Self {
        Self {
            iid,
            title: None,
            created_at,
            closed_at: None,
            updated_at: None,
            state: Lifecycle::Open,
        }
    }

    /// A closed item with no title.
    #[must_use]
    pub const fn closed(iid: u64, created_at: DateTime<Utc>, closed_at: DateTime<Utc>) -> Self {
        Self {
            iid,
            title: None,
            created_at,
            closed_at: Some(closed_at),
            updated_at: None,
            state: Lifecycle::Closed,
        }
    }

    /// Whether the item was touched at or after `cutoff`.
    ///
    /// Items without an `updated_at` are kept.
    #[must_use]
    pub fn updated_since(&self, cutoff: DateTime<Utc>) -> bool {
        self.updated_at.is_none_or(|updated| updated >= cutoff)
    }
}

/// Error returned when parsing a lifecycle value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLifecycleError {
    pub got: String,
}

impl fmt::Display for ParseLifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid lifecycle state: '{}'", self.got)
    }
}

impl std::error::Error for ParseLifecycleError {}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lifecycle {
    type Err = ParseLifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" | "opened" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(ParseLifecycleError { got: s.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Item, Lifecycle};
    use chrono::{TimeZone, Utc};
    use std::str::FromStr;

    #[test]
    fn lifecycle_accepts_gitlab_spelling() {
        assert_eq!(
            serde_json::from_str::<Lifecycle>("\"opened\"").unwrap(),
            Lifecycle::Open
        );
        assert_eq!(
            serde_json::from_str::<Lifecycle>("\"open\"").unwrap(),
            Lifecycle::Open
        );
        assert_eq!(
            serde_json::from_str::<Lifecycle>("\"closed\"").unwrap(),
            Lifecycle::Closed
        );
        assert_eq!(serde_json::to_string(&Lifecycle::Open).unwrap(), "\"open\"");
    }

    #[test]
    fn lifecycle_display_parse_roundtrips() {
        for value in [Lifecycle::Open, Lifecycle::Closed] {
            assert_eq!(Lifecycle::from_str(&value.to_string()).unwrap(), value);
        }
        assert_eq!(Lifecycle::from_str(" Opened ").unwrap(), Lifecycle::Open);
        assert!(Lifecycle::from_str("locked").is_err());
    }

    #[test]
    fn item_deserializes_from_gitlab_issue_json() {
        let raw = r#"{
            "id": 9912,
            "iid": 42,
            "title": "Pipeline flakes",
            "state": "opened",
            "created_at": "2024-03-01T09:15:00.123Z",
            "updated_at": "2024-03-04T10:00:00.000Z",
            "closed_at": null,
            "labels": ["workflow::wip"]
        }"#;
        let item: Item = serde_json::from_str(raw).unwrap();
        assert_eq!(item.iid, 42);
        assert_eq!(item.title.as_deref(), Some("Pipeline flakes"));
        assert_eq!(item.state, Lifecycle::Open);
        assert!(item.closed_at.is_none());
        assert_eq!(
            item.created_at,
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 15, 0).unwrap()
                + chrono::TimeDelta::milliseconds(123)
        );
    }

    #[test]
    fn updated_since_keeps_items_without_timestamp() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let cutoff = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();

        let mut item = Item::open(1, created);
        assert!(item.updated_since(cutoff));

        item.updated_at = Some(Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap());
        assert!(!item.updated_since(cutoff));

        item.updated_at = Some(cutoff);
        assert!(item.updated_since(cutoff));
    }
}
