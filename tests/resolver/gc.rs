//! Retention and Incremental GC Tests
//!
//! The history only answers reliably for snapshots at or after its oldest
//! version. Older readers are reported too old; what GC forgets is never
//! turned into a false conflict.

use crate::*;
use conflict_resolver::VersionedIntervalIndex;

// =============================================================================
// TOO-OLD REPORTING
// =============================================================================

#[test]
fn test_reader_behind_retention_is_too_old() {
    let mut history = ConflictHistory::new();
    resolve(&mut history, &[txn(0, &[], &[("a", "z")])], 5, 0);

    let outcome = resolve(&mut history, &[txn(4, &[("m", "n")], &[])], 6, 0);
    assert!(outcome.non_conflicting.is_empty());

    // Retention moves past the write
    resolve(&mut history, &[], 7, 6);
    assert_eq!(history.oldest_version(), 6);

    // The same stale read is no longer judged against history at all
    let outcome = resolve(&mut history, &[txn(4, &[("m", "n")], &[])], 8, 6);
    assert_eq!(outcome.too_old, vec![0]);
    assert!(outcome.non_conflicting.is_empty());

    // A snapshot inside the window still gets an exact answer
    let outcome = resolve(&mut history, &[txn(6, &[("m", "n")], &[])], 9, 6);
    assert_eq!(outcome.non_conflicting, vec![0]);
}

#[test]
fn test_write_only_transaction_is_never_too_old() {
    let mut history = ConflictHistory::new();
    resolve(&mut history, &[], 10, 10);
    let outcome = resolve(&mut history, &[txn(1, &[], &[("a", "b")])], 11, 10);
    assert_eq!(outcome.non_conflicting, vec![0]);
    assert!(outcome.too_old.is_empty());
    assert_eq!(history.version_at(b"a"), 11);
}

// =============================================================================
// FORGETTING
// =============================================================================

#[test]
fn test_removed_boundaries_are_forgotten_not_fabricated() {
    let mut index = VersionedIntervalIndex::new(0);
    index.add_write_range(b"a", b"b", 1);
    index.add_write_range(b"c", b"d", 2);
    index.add_write_range(b"e", b"f", 3);
    index.add_write_range(b"x", b"y", 9);

    let mut cursor = index.cursor(b"");
    let removed = index.remove_before(5, &mut cursor, 100);
    assert!(removed > 0);
    index.check_invariants();

    // [c, d) held version 2; below the bound it may now read as older
    assert!(index.max_version_in(b"c", b"d") <= 2);
    // Nothing at or above the bound was lost
    assert_eq!(index.version_at(b"x"), 9);
    assert_eq!(index.max_version_in(b"g", b"z"), 9);
    assert_eq!(index.version_at(b"y"), 0);
}

#[test]
fn test_gc_budget_spreads_work_across_batches() {
    let options = ResolverOptions {
        gc_budget_per_range: 0,
        gc_budget_base: 4,
        ..Default::default()
    };
    let mut history = ConflictHistory::new();
    let writes: Vec<ConflictTransaction> = (0..30)
        .map(|i| {
            let b = format!("{:02}a", i);
            let e = format!("{:02}b", i);
            txn(0, &[], &[(b.as_str(), e.as_str())])
        })
        .collect();
    resolve_batch(&mut history, &writes, 1, 0, &options);
    assert_eq!(history.len(), 60);

    let mut now = 2;
    let mut sizes = vec![history.len()];
    while history.len() > 1 && now < 100 {
        let outcome = resolve_batch(&mut history, &[], now, now - 1, &options);
        assert!(outcome.stats.nodes_removed <= 4);
        sizes.push(history.len());
        history.index().check_invariants();
        now += 1;
    }

    assert_eq!(history.len(), 1, "sizes over time: {:?}", sizes);
    // Each pass visits at most four boundaries
    assert!(sizes.len() > 10);
}

#[test]
fn test_gc_never_changes_answers_inside_window() {
    let options = ResolverOptions::deterministic(5);
    let mut history = ConflictHistory::with_options(0, options.index.clone());
    let mut model = Model::new(0);

    for now in 1..60i64 {
        let k = format!("{:02}", (now * 7) % 50);
        let k2 = format!("{:02}", (now * 7) % 50 + 1);
        let r = format!("{:02}", (now * 13) % 50);
        let r2 = format!("{:02}", (now * 13) % 50 + 5);
        let new_oldest = (now - 10).max(0);
        let batch = vec![
            txn(now - 1, &[(r.as_str(), r2.as_str())], &[(k.as_str(), k2.as_str())]),
            txn((now - 8).max(0), &[(k.as_str(), r2.as_str())], &[]),
        ];
        let outcome = resolve_batch(&mut history, &batch, now, new_oldest, &options);
        let (expected, too_old) = model.resolve(&batch, now, new_oldest);
        assert_eq!(outcome.non_conflicting, expected, "batch at {}", now);
        assert_eq!(outcome.too_old, too_old, "batch at {}", now);
    }
    history.index().check_invariants();
}
