//! Label events: the lenient wire shape and the validated form.
//!
//! Tracker audit logs are loosely shaped. Every field of [`RawLabelEvent`] is
//! optional so that one bad record never fails a whole page; the
//! [`TryFrom`] step into [`LabelEvent`] is where validation happens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tracker-assigned label identity.
pub type LabelId = u64;

/// Whether a label was attached or detached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelAction {
    Add,
    Remove,
}

impl LabelAction {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for LabelAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label detail as it appears inside a raw event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLabel {
    #[serde(default)]
    pub id: Option<LabelId>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A label event exactly as the tracker returned it.
///
/// Unknown fields (user, resource type, ...) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLabelEvent {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub label: Option<RawLabel>,
}

/// Validated label identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub name: String,
}

/// A well-formed label event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEvent {
    pub id: u64,
    pub action: LabelAction,
    pub created_at: DateTime<Utc>,
    pub label: Label,
}

/// Why a raw event could not be turned into a [`LabelEvent`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedEvent {
    /// A required field is absent (or `null`).
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// The action is neither `add` nor `remove`.
    #[error("unknown action `{0}`")]
    UnknownAction(String),

    /// The timestamp is not RFC 3339.
    #[error("invalid timestamp `{value}`: {reason}")]
    InvalidTimestamp { value: String, reason: String },
}

impl TryFrom<&RawLabelEvent> for LabelEvent {
    type Error = MalformedEvent;

    fn try_from(raw: &RawLabelEvent) -> Result<Self, Self::Error> {
        let id = raw.id.ok_or(MalformedEvent::MissingField("id"))?;
        let action = raw
            .action
            .as_deref()
            .ok_or(MalformedEvent::MissingField("action"))?;
        let created_at = raw
            .created_at
            .as_deref()
            .ok_or(MalformedEvent::MissingField("created_at"))?;
        let label = raw
            .label
            .as_ref()
            .ok_or(MalformedEvent::MissingField("label"))?;
        let label_id = label.id.ok_or(MalformedEvent::MissingField("label.id"))?;
        let label_name = label
            .name
            .clone()
            .ok_or(MalformedEvent::MissingField("label.name"))?;

        let action = match action {
            "add" => LabelAction::Add,
            "remove" => LabelAction::Remove,
            other => return Err(MalformedEvent::UnknownAction(other.to_string())),
        };

        let created_at = DateTime::parse_from_rfc3339(created_at)
            .map_err(|err| MalformedEvent::InvalidTimestamp {
                value: created_at.to_string(),
                reason: err.to_string(),
            })?
            .with_timezone(&Utc);

        Ok(Self {
            id,
            action,
            created_at,
            label: Label {
                id: label_id,
                name: label_name,
            },
        })
    }
}

impl RawLabelEvent {
    /// Build a well-formed raw event; handy for fixtures and snapshots.
    #[must_use]
    pub fn new(
        id: u64,
        action: LabelAction,
        created_at: DateTime<Utc>,
        label_id: LabelId,
        label_name: &str,
    ) -> Self {
        Self {
            id: Some(id),
            action: Some(action.to_string()),
            created_at: Some(created_at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)),
            label: Some(RawLabel {
                id: Some(label_id),
                name: Some(label_name.to_string()),
            }),
        }
    }
}
