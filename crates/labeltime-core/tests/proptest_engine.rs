use chrono::TimeDelta;
use labeltime_core::{
    Item, ItemLabels, LabelAction, LabelIntervalState, RawLabelEvent, aggregate, reconstruct,
};
use proptest::prelude::*;

#[path = "generators.rs"]
mod generators;
use generators::*;

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(512))]

    #[test]
    fn reconstruction_ignores_input_order(
        item in arb_item(),
        (events, shuffled) in arb_events().prop_flat_map(|events| {
            let shuffled = Just(events.clone()).prop_shuffle();
            (Just(events), shuffled)
        }),
    ) {
        let now = minutes(20_000);
        prop_assert_eq!(
            reconstruct(&item, &events, now),
            reconstruct(&item, &shuffled, now)
        );
    }

    #[test]
    fn every_label_is_completed(item in arb_item(), events in arb_events()) {
        let labels = reconstruct(&item, &events, minutes(20_000));
        prop_assert!(labels.values().all(LabelIntervalState::is_completed));
    }

    #[test]
    fn each_label_in_events_appears_once(item in arb_item(), events in arb_events()) {
        let labels = reconstruct(&item, &events, minutes(20_000));
        let mut expected: Vec<u64> = events
            .iter()
            .filter_map(|raw| raw.label.as_ref().and_then(|label| label.id))
            .collect();
        expected.sort_unstable();
        expected.dedup();
        let actual: Vec<u64> = labels.keys().copied().collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn duplicate_add_while_attached_is_idempotent(
        item in arb_item(),
        start in 0i64..5_000,
        gap in 2i64..1_000,
        dup_offset in 1i64..1_000,
    ) {
        let dup_offset = dup_offset % gap;
        prop_assume!(dup_offset > 0);

        let base = vec![
            RawLabelEvent::new(1, LabelAction::Add, minutes(start), 1, "wip"),
            RawLabelEvent::new(3, LabelAction::Remove, minutes(start + gap), 1, "wip"),
        ];
        let mut with_dup = base.clone();
        with_dup.push(RawLabelEvent::new(
            2,
            LabelAction::Add,
            minutes(start + dup_offset),
            1,
            "wip",
        ));

        let now = minutes(20_000);
        let plain = reconstruct(&item, &base, now);
        prop_assert_eq!(&plain, &reconstruct(&item, &with_dup, now));
        prop_assert_eq!(plain[&1].accumulated, TimeDelta::minutes(gap));
    }

    #[test]
    fn aggregation_is_commutative(
        batch in prop::collection::vec((arb_item(), arb_events()), 0..12)
            .prop_flat_map(|batch| {
                let shuffled = Just(batch.clone()).prop_shuffle();
                (Just(batch), shuffled)
            }),
    ) {
        let (items, shuffled) = batch;
        let now = minutes(20_000);
        let reconstruct_all = |batch: &[(Item, Vec<RawLabelEvent>)]| -> Vec<ItemLabels> {
            batch
                .iter()
                .map(|(item, events)| reconstruct(item, events, now))
                .collect()
        };

        let forward = aggregate(&reconstruct_all(&items));
        let permuted = aggregate(&reconstruct_all(&shuffled));

        prop_assert_eq!(forward.len(), permuted.len());
        for (label_id, entry) in &forward {
            let other = &permuted[label_id];
            prop_assert_eq!(entry.count(), other.count());
            prop_assert_eq!(entry.mean(), other.mean());
            prop_assert_eq!(entry.total(), other.total());
        }
    }

    #[test]
    fn aggregate_count_equals_items_carrying_label(
        batch in prop::collection::vec((arb_item(), arb_events()), 0..12),
    ) {
        let now = minutes(20_000);
        let per_item: Vec<ItemLabels> = batch
            .iter()
            .map(|(item, events)| reconstruct(item, events, now))
            .collect();
        let result = aggregate(&per_item);

        for (label_id, entry) in &result {
            let carriers = per_item.iter().filter(|labels| labels.contains_key(label_id)).count();
            prop_assert_eq!(entry.count(), carriers);
        }
        let distinct: std::collections::BTreeSet<u64> =
            per_item.iter().flat_map(|labels| labels.keys().copied()).collect();
        prop_assert_eq!(result.len(), distinct.len());
    }
}
