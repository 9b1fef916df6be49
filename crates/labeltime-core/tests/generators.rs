#![allow(dead_code)]

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use labeltime_core::{Item, LabelAction, LabelId, Lifecycle, RawLabelEvent};
use proptest::prelude::*;

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn minutes(n: i64) -> DateTime<Utc> {
    base_time() + TimeDelta::minutes(n)
}

pub fn label_name(id: LabelId) -> String {
    format!("workflow::lane-{id}")
}

/// Items created at minute 0; closed ones close somewhere in the first
/// ten thousand minutes.
pub fn arb_item() -> impl Strategy<Value = Item> + Clone {
    (
        1u64..10_000,
        prop_oneof![Just(Lifecycle::Open), Just(Lifecycle::Closed)],
        0i64..10_000,
    )
        .prop_map(|(iid, state, closed_at)| Item {
            iid,
            title: None,
            created_at: base_time(),
            closed_at: (state == Lifecycle::Closed).then(|| minutes(closed_at)),
            updated_at: None,
            state,
        })
}

/// Well-formed events with unique ids over a small label alphabet.
pub fn arb_events() -> impl Strategy<Value = Vec<RawLabelEvent>> + Clone {
    prop::collection::vec(
        (
            prop_oneof![Just(LabelAction::Add), Just(LabelAction::Remove)],
            0i64..10_000,
            1u64..5,
        ),
        0..40,
    )
    .prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(index, (action, at, label))| {
                RawLabelEvent::new(
                    index as u64 + 1,
                    action,
                    minutes(at),
                    label,
                    &label_name(label),
                )
            })
            .collect()
    })
}
