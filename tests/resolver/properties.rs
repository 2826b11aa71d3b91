//! Model-Based Property Tests
//!
//! Random multi-batch histories over a tiny key alphabet, so ranges collide
//! often, checked batch by batch against the naive [`Model`].

use crate::*;
use proptest::prelude::*;

// =============================================================================
// STRATEGIES
// =============================================================================

/// `(snapshot lag, reads, writes)`
type RawTxn = (i64, Vec<(String, String)>, Vec<(String, String)>);

/// `(transactions, version step, retention lag)`
type RawBatch = (Vec<RawTxn>, i64, i64);

fn key() -> impl Strategy<Value = String> {
    "[a-d]{0,3}"
}

fn range() -> impl Strategy<Value = (String, String)> {
    (key(), key()).prop_map(|(a, b)| if a <= b { (a, b) } else { (b, a) })
}

fn raw_txn() -> impl Strategy<Value = RawTxn> {
    (
        0i64..6,
        proptest::collection::vec(range(), 0..3),
        proptest::collection::vec(range(), 0..3),
    )
}

fn raw_batches() -> impl Strategy<Value = Vec<RawBatch>> {
    proptest::collection::vec(
        (proptest::collection::vec(raw_txn(), 0..8), 1i64..3, 0i64..5),
        1..12,
    )
}

fn options() -> impl Strategy<Value = ResolverOptions> {
    (any::<u64>(), 2usize..8, 0usize..4, 0usize..6, 1usize..12).prop_map(
        |(seed, stripe, per_range, base, cutoff)| {
            let mut options = ResolverOptions::deterministic(seed);
            options.merge_stripe_size = stripe;
            options.gc_budget_per_range = per_range;
            options.gc_budget_base = base;
            options.radix_cutoff = cutoff;
            options
        },
    )
}

fn build(raw: &[RawTxn], now: Version) -> Vec<ConflictTransaction> {
    raw.iter()
        .map(|(lag, reads, writes)| {
            let mut tr = ConflictTransaction::new((now - 1 - lag).max(0));
            for (b, e) in reads {
                tr = tr.read(b.as_str(), e.as_str());
            }
            for (b, e) in writes {
                tr = tr.write(b.as_str(), e.as_str());
            }
            tr
        })
        .collect()
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn prop_matches_model(batches in raw_batches(), options in options()) {
        let mut history = ConflictHistory::with_options(0, options.index.clone());
        let mut model = Model::new(0);
        let mut now = 0;

        for (raw, step, retention) in &batches {
            now += step;
            let batch = build(raw, now);
            let new_oldest = (now - retention).max(0);

            let outcome = resolve_batch(&mut history, &batch, now, new_oldest, &options);
            let (expected, too_old) = model.resolve(&batch, now, new_oldest);

            prop_assert_eq!(&outcome.non_conflicting, &expected, "commits at {}", now);
            prop_assert_eq!(&outcome.too_old, &too_old, "too old at {}", now);
            history.index().check_invariants();
        }
    }

    #[test]
    fn prop_same_input_same_output(
        raw in proptest::collection::vec(raw_txn(), 0..12),
        seed in any::<u64>(),
    ) {
        let options = ResolverOptions::deterministic(seed);
        let batch = build(&raw, 10);

        let mut first = ConflictHistory::with_options(0, options.index.clone());
        let mut second = ConflictHistory::with_options(0, options.index.clone());
        let a = resolve_batch(&mut first, &batch, 10, 0, &options);
        let b = resolve_batch(&mut second, &batch, 10, 0, &options);
        prop_assert_eq!(a.non_conflicting, b.non_conflicting);
        prop_assert_eq!(boundaries(&first), boundaries(&second));
    }

    #[test]
    fn prop_merged_writes_cover_exactly_the_accepted_union(
        raw in proptest::collection::vec(raw_txn(), 1..10),
        samples in proptest::collection::vec(key(), 1..20),
    ) {
        let mut history = ConflictHistory::new();
        let batch = build(&raw, 7);
        let outcome = resolve(&mut history, &batch, 7, 0);

        let accepted: Vec<&KeyRange> = outcome
            .non_conflicting
            .iter()
            .flat_map(|&t| batch[t].write_ranges.iter())
            .collect();
        for sample in &samples {
            let covered = accepted.iter().any(|w| w.contains(sample.as_bytes()));
            let version = history.version_at(sample.as_bytes());
            prop_assert_eq!(version == 7, covered, "key {:?}", sample);
        }

        // Coalesced: no two neighbouring boundaries both open a write at 7
        let versions: Vec<Version> = history.index().iter().map(|(_, v)| v).collect();
        prop_assert!(versions.windows(2).all(|w| !(w[0] == 7 && w[1] == 7)));
    }
}
