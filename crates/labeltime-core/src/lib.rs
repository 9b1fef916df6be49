//! labeltime-core: label lifecycle reconstruction and aggregation.
//!
//! For each tracked item, [`reconstruct`](reconstruct::reconstruct) turns the
//! item's label add/remove audit log into the total time every label was
//! attached. [`aggregate`](aggregate::aggregate) then folds those per-item
//! totals into one entry per label, ready for a mean.
//!
//! The engine does no I/O: fetching and rendering belong to the caller.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums for typed failures, `anyhow::Result` where
//!   files are read.
//! - **Logging**: `tracing` macros; skipped events are reported with `warn!`.

pub mod aggregate;
pub mod config;
pub mod duration;
pub mod error;
pub mod model;
pub mod reconstruct;

pub use aggregate::{Aggregate, AggregateEntry, Aggregator, aggregate};
pub use model::{Item, LabelAction, LabelEvent, LabelId, Lifecycle, RawLabelEvent};
pub use reconstruct::{
    ItemLabels, LabelIntervalState, Reconstruction, SkippedEvent, reconstruct,
    reconstruct_with_diagnostics,
};
