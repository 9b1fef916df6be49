//! Cross-item aggregation of per-label durations.
//!
//! Every item contributes at most one duration per label (its reconstructed
//! total). Entries are keyed by label id, so the result does not depend on the
//! order items are fed in.

use std::collections::{BTreeMap, HashSet};

use chrono::TimeDelta;

use crate::duration::{self, DurationError};
use crate::model::LabelId;
use crate::reconstruct::ItemLabels;

/// Durations observed for one label across a batch of items.
///
/// Always holds at least one duration: entries only come into existence on
/// the first observation of their label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateEntry {
    pub label_id: LabelId,
    pub label_name: String,
    durations: Vec<TimeDelta>,
}

impl AggregateEntry {
    /// Start an entry from its first observed duration.
    #[must_use]
    pub fn new(label_id: LabelId, label_name: String, first: TimeDelta) -> Self {
        Self {
            label_id,
            label_name,
            durations: vec![first],
        }
    }

    /// Record another item's duration.
    pub fn push(&mut self, duration: TimeDelta) {
        self.durations.push(duration);
    }

    /// Observed durations, in the order items were aggregated.
    #[must_use]
    pub fn durations(&self) -> &[TimeDelta] {
        &self.durations
    }

    /// Number of items that carried this label.
    #[must_use]
    pub fn count(&self) -> usize {
        self.durations.len()
    }

    /// Sum of all observed durations.
    ///
    /// # Errors
    ///
    /// [`DurationError::Overflow`] when the sum is not representable.
    pub fn total(&self) -> Result<TimeDelta, DurationError> {
        self.durations
            .iter()
            .try_fold(TimeDelta::zero(), |acc, d| acc.checked_add(d))
            .ok_or(DurationError::Overflow)
    }

    /// Mean duration across items.
    ///
    /// # Errors
    ///
    /// [`DurationError::Overflow`] when the sum is not representable.
    /// [`DurationError::EmptyInput`] cannot happen for entries built through
    /// [`AggregateEntry::new`].
    pub fn mean(&self) -> Result<TimeDelta, DurationError> {
        debug_assert!(!self.durations.is_empty(), "aggregate entry without durations");
        duration::mean(&self.durations)
    }
}

/// Aggregated entries keyed by label id.
pub type Aggregate = BTreeMap<LabelId, AggregateEntry>;

/// Incremental cross-item aggregator.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    entries: Aggregate,
    items: usize,
}

impl Aggregator {
    /// Create an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one item's reconstructed labels into the aggregate.
    pub fn add_item(&mut self, labels: &ItemLabels) {
        self.items += 1;
        for (label_id, state) in labels {
            debug_assert!(state.is_completed(), "aggregating an unfinished label state");
            self.entries
                .entry(*label_id)
                .and_modify(|entry| entry.push(state.accumulated))
                .or_insert_with(|| {
                    AggregateEntry::new(*label_id, state.label_name.clone(), state.accumulated)
                });
        }
    }

    /// Number of items folded in so far.
    #[must_use]
    pub const fn item_count(&self) -> usize {
        self.items
    }

    /// Drop every entry whose label name is not in `names`.
    pub fn retain_names(&mut self, names: &[String]) {
        let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
        self.entries
            .retain(|_, entry| wanted.contains(entry.label_name.as_str()));
    }

    /// Finish aggregation and hand out the entries.
    #[must_use]
    pub fn finish(self) -> Aggregate {
        self.entries
    }
}

/// Aggregate a batch of per-item results in one go.
#[must_use]
pub fn aggregate<'a, I>(items: I) -> Aggregate
where
    I: IntoIterator<Item = &'a ItemLabels>,
{
    let mut aggregator = Aggregator::new();
    for labels in items {
        aggregator.add_item(labels);
    }
    aggregator.finish()
}
