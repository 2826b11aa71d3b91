//! Resolver Facade Tests
//!
//! Validation, lifecycle, and shared use across threads.

use crate::*;
use conflict_resolver::{Error, Resolver, INVALID_VERSION};
use std::sync::Arc;
use std::thread;

// =============================================================================
// VALIDATION
// =============================================================================

#[test]
fn test_rejects_version_regression() {
    let resolver = Resolver::new();
    resolver.resolve(&[], 10, 0).unwrap();

    let err = resolver.resolve(&[], 9, 0).unwrap_err();
    assert_eq!(err, Error::VersionRegression { now: 9, previous: 10 });
    assert!(err.is_caller_error());
    assert_eq!(resolver.last_commit_version(), 10);

    // Equal versions are fine
    resolver.resolve(&[], 10, 0).unwrap();
}

#[test]
fn test_rejects_oldest_ahead_of_commit() {
    let resolver = Resolver::new();
    let err = resolver.resolve(&[], 5, 6).unwrap_err();
    assert_eq!(err, Error::OldestAheadOfCommit { new_oldest: 6, now: 5 });
    assert_eq!(resolver.oldest_version(), 0);
}

#[test]
fn test_rejects_inverted_range_without_touching_history() {
    let resolver = Resolver::new();
    let batch = vec![
        txn(0, &[], &[("a", "b")]),
        txn(0, &[("q", "p")], &[]),
    ];
    let err = resolver.resolve(&batch, 1, 0).unwrap_err();
    match err {
        Error::InvalidRange { transaction, ref begin, ref end } => {
            assert_eq!(transaction, 1);
            assert_eq!(begin.as_bytes(), b"q");
            assert_eq!(end.as_bytes(), b"p");
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(resolver.history_len(), 0);
    assert_eq!(resolver.last_commit_version(), INVALID_VERSION);
}

#[test]
fn test_fast_options_skip_validation() {
    let resolver = Resolver::with_options(ResolverOptions::fast());
    resolver.resolve(&[], 10, 0).unwrap();

    // Inverted ranges cover nothing when unchecked
    let batch = vec![txn(0, &[("q", "p")], &[("z", "y")])];
    let outcome = resolver.resolve(&batch, 9, 0).unwrap();
    assert_eq!(outcome.non_conflicting, vec![0]);
    assert_eq!(resolver.history_len(), 0);
}

#[test]
fn test_strict_options_self_check_every_batch() {
    let resolver = Resolver::with_options(ResolverOptions::strict());
    for now in 1..40i64 {
        let b = format!("{:02}", (now * 7) % 30);
        let e = format!("{:02}", (now * 7) % 30 + 3);
        let batch = vec![
            txn(now - 1, &[(b.as_str(), e.as_str())], &[(b.as_str(), e.as_str())]),
            txn(0, &[], &[(e.as_str(), "zz")]),
        ];
        let outcome = resolver.resolve(&batch, now, (now - 5).max(0)).unwrap();
        assert!(outcome.non_conflicting.contains(&1));
    }
    assert!(resolver.history_len() > 0);
}

// =============================================================================
// LIFECYCLE
// =============================================================================

#[test]
fn test_reset_starts_a_new_epoch() {
    let resolver = Resolver::new();
    resolver.resolve(&[txn(0, &[], &[("a", "b")])], 3, 0).unwrap();
    assert_eq!(resolver.history_len(), 2);

    resolver.reset(20);
    assert_eq!(resolver.history_len(), 0);
    assert_eq!(resolver.version_at(b"anything"), 20);
    assert_eq!(resolver.last_commit_version(), 20);

    // Readers from before the reset conflict everywhere
    let outcome = resolver.resolve(&[txn(19, &[("x", "y")], &[])], 21, 0).unwrap();
    assert!(outcome.non_conflicting.is_empty());
    let outcome = resolver.resolve(&[txn(20, &[("x", "y")], &[])], 22, 0).unwrap();
    assert_eq!(outcome.non_conflicting, vec![0]);

    assert!(matches!(
        resolver.resolve(&[], 19, 0),
        Err(Error::VersionRegression { .. })
    ));
}

#[test]
fn test_builder_initial_version() {
    let resolver = Resolver::builder().seed(3).initial_version(50).build();
    assert_eq!(resolver.version_at(b"k"), 50);
    assert!(resolver.resolve(&[], 49, 0).is_err());

    let outcome = resolver.resolve(&[txn(49, &[("k", "l")], &[])], 51, 0).unwrap();
    assert!(outcome.non_conflicting.is_empty());
}

#[test]
fn test_stats_come_back_with_outcome() {
    let resolver = Resolver::new();
    let batch = vec![
        txn(0, &[("a", "b")], &[("a", "b")]),
        txn(0, &[], &[("c", "d")]),
    ];
    let outcome = resolver.resolve(&batch, 1, 0).unwrap();
    assert_eq!(outcome.stats.transactions, 2);
    assert_eq!(outcome.stats.read_ranges, 1);
    assert_eq!(outcome.stats.combined_write_ranges, 2);
}

// =============================================================================
// CONCURRENT CALLERS
// =============================================================================

#[test]
fn test_concurrent_callers_are_serialized() {
    let resolver = Arc::new(Resolver::new());
    let threads = 4;
    let per_thread = 50;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let resolver = Arc::clone(&resolver);
            thread::spawn(move || {
                for i in 0..per_thread {
                    let key = format!("t{}-{:03}", t, i);
                    let end = format!("{}\0", key);
                    let batch = vec![txn(0, &[], &[(key.as_str(), end.as_str())])];
                    // One shared version keeps commits non-decreasing in any interleaving
                    let outcome = resolver.resolve(&batch, 1, 0).unwrap();
                    assert_eq!(outcome.non_conflicting, vec![0]);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(resolver.history_len(), threads * per_thread * 2);
}
