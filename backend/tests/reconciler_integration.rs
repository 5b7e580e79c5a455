use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;

use pricewatch::livecoinwatch::{RawAssetQuote, RawDelta};
use pricewatch::prices::memory::InMemorySnapshotRepository;
use pricewatch::prices::store::SnapshotStore;
use pricewatch::reconciler::{ReconcileMode, Reconciler};

fn quote(code: &str, name: &str, rate: f64) -> RawAssetQuote {
    RawAssetQuote {
        code: code.into(),
        name: name.into(),
        rate,
        volume: rate * 10.0,
        cap: rate * 100.0,
        delta: RawDelta {
            hour: rate,
            day: rate,
            week: rate,
            month: rate,
            quarter: rate,
            year: rate,
        },
    }
}

fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
}

fn setup(mode: ReconcileMode) -> (SnapshotStore, Reconciler) {
    let store = SnapshotStore::new(Arc::new(InMemorySnapshotRepository::new()));
    let reconciler = Reconciler::new(store.clone(), mode);
    (store, reconciler)
}

async fn names(store: &SnapshotStore) -> BTreeSet<String> {
    store
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.crypto)
        .collect()
}

#[tokio::test]
async fn bitcoin_scenario() {
    for mode in [ReconcileMode::Swap, ReconcileMode::ClearThenUpsert] {
        let (store, reconciler) = setup(mode);

        let batch = vec![RawAssetQuote {
            code: "BTC".into(),
            name: "Bitcoin".into(),
            rate: 50_000.0,
            volume: 1e9,
            cap: 1e12,
            delta: RawDelta {
                hour: 0.1,
                day: 1.0,
                week: 2.0,
                month: 5.0,
                quarter: 10.0,
                year: 50.0,
            },
        }];

        let summary = reconciler.reconcile(&batch, t0()).await.unwrap();
        assert_eq!(summary.written, 1);
        assert_eq!(summary.at, t0());

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].crypto, "Bitcoin");
        assert_eq!(all[0].data.rate, 50_000.0);
        assert_eq!(all[0].data.cap, 1e12);
        assert_eq!(all[0].data.delta.quarter, 10.0);
        assert_eq!(all[0].last_updated, t0());
    }
}

#[tokio::test]
async fn disjoint_batches_evict_previous_assets() {
    for mode in [ReconcileMode::Swap, ReconcileMode::ClearThenUpsert] {
        let (store, reconciler) = setup(mode);

        reconciler
            .reconcile(&[quote("A", "Alpha", 1.0)], t0())
            .await
            .unwrap();
        reconciler
            .reconcile(&[quote("B", "Beta", 2.0)], t0() + Duration::seconds(5))
            .await
            .unwrap();

        assert_eq!(names(&store).await, BTreeSet::from(["Beta".to_string()]));
    }
}

#[tokio::test]
async fn duplicate_names_are_counted() {
    let (store, reconciler) = setup(ReconcileMode::Swap);

    let summary = reconciler
        .reconcile(
            &[quote("X1", "Xcoin", 1.0), quote("X2", "Xcoin", 2.0)],
            t0(),
        )
        .await
        .unwrap();

    assert_eq!(summary.written, 1);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(store.list_all().await.unwrap()[0].data.rate, 2.0);
}

/// Every field of a record encodes the same generation, so a torn write
/// would show up as a mismatch.
fn generation_batch(generation: f64) -> Vec<RawAssetQuote> {
    (0..20)
        .map(|i| quote(&format!("C{i}"), &format!("Coin {i:02}"), generation))
        .collect()
}

async fn concurrent_reads_see_whole_records(mode: ReconcileMode) {
    let (store, reconciler) = setup(mode);
    let reconciler = Arc::new(reconciler);

    reconciler
        .reconcile(&generation_batch(1.0), t0())
        .await
        .unwrap();

    let done = Arc::new(AtomicBool::new(false));

    let mut readers = Vec::new();
    for _ in 0..4 {
        let store = store.clone();
        let done = done.clone();
        readers.push(tokio::spawn(async move {
            let mut reads = 0usize;
            while !done.load(Ordering::Relaxed) {
                let all = store.list_all().await.unwrap();
                for s in &all {
                    let g = s.data.rate;
                    assert_eq!(s.data.volume, g * 10.0);
                    assert_eq!(s.data.cap, g * 100.0);
                    assert_eq!(s.data.delta.year, g);
                }
                if mode == ReconcileMode::Swap {
                    assert_eq!(all.len(), 20, "swap must never expose a partial set");
                }
                reads += 1;
                tokio::task::yield_now().await;
            }
            reads
        }));
    }

    for round in 0..50 {
        let g = if round % 2 == 0 { 2.0 } else { 1.0 };
        reconciler
            .reconcile(&generation_batch(g), t0() + Duration::seconds(round))
            .await
            .unwrap();
        tokio::task::yield_now().await;
    }

    done.store(true, Ordering::Relaxed);
    for r in readers {
        assert!(r.await.unwrap() > 0);
    }

    assert_eq!(store.list_all().await.unwrap().len(), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reads_during_swap() {
    concurrent_reads_see_whole_records(ReconcileMode::Swap).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reads_during_clear_then_upsert() {
    concurrent_reads_see_whole_records(ReconcileMode::ClearThenUpsert).await;
}

fn batch_strategy() -> impl Strategy<Value = Vec<RawAssetQuote>> {
    prop::collection::vec(("[A-E]", 0.0..1e6f64), 1..30).prop_map(|items| {
        items
            .into_iter()
            .map(|(name, rate)| quote(&name, &name, rate))
            .collect()
    })
}

fn mode_strategy() -> impl Strategy<Value = ReconcileMode> {
    prop_oneof![
        Just(ReconcileMode::Swap),
        Just(ReconcileMode::ClearThenUpsert)
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn reconcile_invariants(
        batches in prop::collection::vec(batch_strategy(), 1..6),
        mode in mode_strategy(),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let (store, reconciler) = setup(mode);
            let mut last_seen: std::collections::HashMap<String, DateTime<Utc>> =
                std::collections::HashMap::new();

            for (i, batch) in batches.iter().enumerate() {
                let now = t0() + Duration::seconds(i as i64 * 5);
                reconciler.reconcile(batch, now).await.unwrap();
                let once = store.list_all().await.unwrap();

                // Idempotence: same batch, same `now`, same state.
                reconciler.reconcile(batch, now).await.unwrap();
                let mut twice = store.list_all().await.unwrap();
                let mut once_sorted = once.clone();
                once_sorted.sort_by(|a, b| a.crypto.cmp(&b.crypto));
                twice.sort_by(|a, b| a.crypto.cmp(&b.crypto));
                assert_eq!(once_sorted, twice);

                // Key uniqueness.
                let keys: Vec<&str> = once.iter().map(|s| s.crypto.as_str()).collect();
                let unique: BTreeSet<&str> = keys.iter().copied().collect();
                assert_eq!(keys.len(), unique.len());

                // Set equality with the batch.
                let expected: BTreeSet<&str> = batch.iter().map(|q| q.name.as_str()).collect();
                assert_eq!(unique, expected);

                // Monotonic lastUpdated.
                for s in &once {
                    if let Some(prev) = last_seen.get(&s.crypto) {
                        assert!(s.last_updated >= *prev);
                    }
                    last_seen.insert(s.crypto.clone(), s.last_updated);
                }
            }
        });
    }
}
