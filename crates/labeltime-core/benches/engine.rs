use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use labeltime_core::{Item, ItemLabels, LabelAction, RawLabelEvent, aggregate, reconstruct};

#[derive(Clone, Copy, Debug)]
struct BenchmarkTier {
    name: &'static str,
    item_count: usize,
    events_per_item: usize,
}

const TIERS: [BenchmarkTier; 3] = [
    BenchmarkTier {
        name: "S",
        item_count: 100,
        events_per_item: 20,
    },
    BenchmarkTier {
        name: "M",
        item_count: 1_000,
        events_per_item: 50,
    },
    BenchmarkTier {
        name: "L",
        item_count: 10_000,
        events_per_item: 100,
    },
];

#[derive(Clone, Copy, Debug)]
struct Prng(u64);

impl Prng {
    fn next_u64(&mut self) -> u64 {
        // 64-bit LCG constants from Numerical Recipes.
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0
    }

    fn below(&mut self, upper_exclusive: u64) -> u64 {
        self.next_u64() % upper_exclusive.max(1)
    }
}

struct Corpus {
    items: Vec<(Item, Vec<RawLabelEvent>)>,
    now: DateTime<Utc>,
}

fn generate_corpus(tier: BenchmarkTier, seed: u64) -> Corpus {
    let mut rng = Prng(seed);
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let now = start + TimeDelta::days(120);

    let items = (0..tier.item_count)
        .map(|index| {
            let created_at = start + TimeDelta::minutes(rng.below(10_000) as i64);
            let item = if rng.below(3) == 0 {
                Item::open(index as u64 + 1, created_at)
            } else {
                let closed_at = created_at + TimeDelta::minutes(rng.below(100_000) as i64);
                Item::closed(index as u64 + 1, created_at, closed_at)
            };

            let events = (0..tier.events_per_item)
                .map(|n| {
                    let label = rng.below(8) + 1;
                    let action = if rng.below(2) == 0 {
                        LabelAction::Add
                    } else {
                        LabelAction::Remove
                    };
                    let at = created_at + TimeDelta::minutes(rng.below(100_000) as i64);
                    RawLabelEvent::new(n as u64, action, at, label, &format!("lane-{label}"))
                })
                .collect();

            (item, events)
        })
        .collect();

    Corpus { items, now }
}

fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine.tiered");

    for tier in TIERS {
        let corpus = generate_corpus(tier, 0x1AB_E17 + tier.item_count as u64);
        group.throughput(Throughput::Elements(
            (tier.item_count * tier.events_per_item) as u64,
        ));

        group.bench_with_input(
            BenchmarkId::new("reconstruct", tier.name),
            &corpus,
            |b, corpus| {
                b.iter(|| {
                    for (item, events) in &corpus.items {
                        black_box(reconstruct(item, events, corpus.now));
                    }
                });
            },
        );

        let per_item: Vec<ItemLabels> = corpus
            .items
            .iter()
            .map(|(item, events)| reconstruct(item, events, corpus.now))
            .collect();

        group.bench_with_input(
            BenchmarkId::new("aggregate", tier.name),
            &per_item,
            |b, per_item| b.iter(|| black_box(aggregate(per_item))),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_engine);
criterion_main!(benches);
