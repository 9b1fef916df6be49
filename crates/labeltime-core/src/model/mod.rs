//! Input data model: tracked items and their label events.

pub mod event;
pub mod item;

pub use event::{Label, LabelAction, LabelEvent, LabelId, MalformedEvent, RawLabel, RawLabelEvent};
pub use item::{Item, Lifecycle};
