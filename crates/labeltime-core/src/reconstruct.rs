//! Label interval reconstruction for a single item.
//!
//! Turns one item's label audit log into the total time each label spent
//! attached to the item. The walk is a small per-label state machine:
//!
//! ```text
//!            add                      remove
//!  (unseen) ─────► open(since = ts) ─────────► completed(acc += ts - since)
//!     │                  ▲                          │
//!     │ remove           └──────────── add ─────────┘
//!     ▼
//!  completed(acc = ts - item.created_at)
//! ```
//!
//! Duplicate transitions (add while open, remove while completed) are
//! ignored. Intervals still open after the walk are closed at the item's
//! close time, or at the caller-supplied `now` for open items.
//!
//! # Ordering
//!
//! Events are sorted by `(created_at, id)`. Two events with the same
//! timestamp are applied in ascending event-id order, which matches the
//! order the tracker recorded them in.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::duration::elapsed;
use crate::model::{
    Item, LabelAction, LabelEvent, LabelId, Lifecycle, MalformedEvent, RawLabelEvent,
};

/// Attachment history of one label on one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelIntervalState {
    pub label_id: LabelId,
    pub label_name: String,
    /// Total attached time of every closed interval so far.
    #[serde(serialize_with = "serialize_delta")]
    pub accumulated: TimeDelta,
    /// Start of the interval that is currently open, if any.
    ///
    /// `None` means the label is completed: its whole history is in
    /// `accumulated`.
    pub open_since: Option<DateTime<Utc>>,
}

impl LabelIntervalState {
    /// A label attached at `since`, with nothing accumulated yet.
    #[must_use]
    pub fn opened(label_id: LabelId, label_name: String, since: DateTime<Utc>) -> Self {
        Self {
            label_id,
            label_name,
            accumulated: TimeDelta::zero(),
            open_since: Some(since),
        }
    }

    /// Whether no interval is currently open.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.open_since.is_none()
    }

    /// Close the open interval at `end`. No-op when already completed.
    pub fn close_at(&mut self, end: DateTime<Utc>) {
        if let Some(since) = self.open_since.take() {
            self.accumulated += elapsed(since, end);
        }
    }

    /// Open a new interval at `since`. No-op when one is already open.
    pub fn reopen_at(&mut self, since: DateTime<Utc>) {
        if self.open_since.is_none() {
            self.open_since = Some(since);
        }
    }
}

fn serialize_delta<S: serde::Serializer>(delta: &TimeDelta, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(crate::duration::as_seconds_f64(*delta))
}

/// Finalized per-item result: label id to its completed interval state.
pub type ItemLabels = BTreeMap<LabelId, LabelIntervalState>;

/// A raw event that failed validation and was left out of the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEvent {
    /// Position of the event in the input slice.
    pub index: usize,
    pub raw: RawLabelEvent,
    pub reason: MalformedEvent,
}

/// Reconstruction output including diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reconstruction {
    pub labels: ItemLabels,
    pub skipped: Vec<SkippedEvent>,
}

/// Reconstruct per-label attached durations for one item.
///
/// Malformed events are skipped (and logged). `now` closes the dangling
/// intervals of items that are still open.
#[must_use]
pub fn reconstruct(item: &Item, events: &[RawLabelEvent], now: DateTime<Utc>) -> ItemLabels {
    reconstruct_with_diagnostics(item, events, now).labels
}

/// Like [`reconstruct`], but also returns the events that were skipped.
#[must_use]
pub fn reconstruct_with_diagnostics(
    item: &Item,
    events: &[RawLabelEvent],
    now: DateTime<Utc>,
) -> Reconstruction {
    let mut skipped = Vec::new();
    let mut valid: Vec<LabelEvent> = Vec::with_capacity(events.len());

    for (index, raw) in events.iter().enumerate() {
        match LabelEvent::try_from(raw) {
            Ok(event) => valid.push(event),
            Err(reason) => {
                tracing::warn!(
                    item = item.iid,
                    index,
                    event_id = ?raw.id,
                    error = %reason,
                    "skipping malformed label event"
                );
                skipped.push(SkippedEvent {
                    index,
                    raw: raw.clone(),
                    reason,
                });
            }
        }
    }

    valid.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

    let mut labels = walk_events(item, &valid);
    close_dangling(item, &mut labels, now);

    Reconstruction { labels, skipped }
}

fn walk_events(item: &Item, events: &[LabelEvent]) -> ItemLabels {
    let mut labels = ItemLabels::new();

    for event in events {
        tracing::debug!(
            item = item.iid,
            action = %event.action,
            label = %event.label.name,
            label_id = event.label.id,
            at = %event.created_at,
            "label event"
        );

        if let Some(state) = labels.get_mut(&event.label.id) {
            match event.action {
                LabelAction::Add => state.reopen_at(event.created_at),
                LabelAction::Remove => state.close_at(event.created_at),
            }
            continue;
        }

        let state = match event.action {
            LabelAction::Add => LabelIntervalState::opened(
                event.label.id,
                event.label.name.clone(),
                event.created_at,
            ),
            LabelAction::Remove => {
                // Attached before the observed history began: the item's
                // creation is the earliest possible attach time.
                let mut state = LabelIntervalState::opened(
                    event.label.id,
                    event.label.name.clone(),
                    item.created_at,
                );
                state.close_at(event.created_at);
                state
            }
        };
        labels.insert(event.label.id, state);
    }

    labels
}

fn close_dangling(item: &Item, labels: &mut ItemLabels, now: DateTime<Utc>) {
    let end = match (item.state, item.closed_at) {
        (Lifecycle::Closed, Some(closed_at)) => closed_at,
        (Lifecycle::Closed, None) => {
            if labels.values().any(|state| !state.is_completed()) {
                tracing::warn!(
                    item = item.iid,
                    "closed item has no close timestamp; closing open labels at analysis time"
                );
            }
            now
        }
        (Lifecycle::Open, _) => now,
    };

    for state in labels.values_mut() {
        state.close_at(end);
    }
}
