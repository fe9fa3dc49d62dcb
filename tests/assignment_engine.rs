mod common;

use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{stock, ContendedStore, FlakyLedger, OfflineLedger};
use wifibank::models::transaction::TransactionFilter;
use wifibank::services::assignment::{
    AssignmentEngine, AssignmentError, AssignmentRequest, EngineConfig,
};
use wifibank::services::catalog::Catalog;
use wifibank::store::memory::InMemoryStore;
use wifibank::store::{CredentialStore, LedgerStore, Page};

fn config() -> EngineConfig {
    EngineConfig {
        ledger_retry_backoff: Duration::ZERO,
        ..EngineConfig::default()
    }
}

fn engine(store: Arc<InMemoryStore>) -> AssignmentEngine {
    AssignmentEngine::new(store.clone(), store.clone(), Catalog::new(store), config())
}

fn request(package_id: &str, phone: &str, reference: &str) -> AssignmentRequest {
    AssignmentRequest {
        package_id: package_id.to_string(),
        buyer_name: "Kofi".to_string(),
        buyer_phone: phone.to_string(),
        payment_reference: reference.to_string(),
        amount: 20.0,
    }
}

#[tokio::test]
async fn sale_consumes_credential_and_records_ledger_entry() {
    let store = Arc::new(InMemoryStore::new());
    stock(&store, "bronze-1w", "u1", "p1").await;
    let engine = engine(store.clone());

    let sale = engine
        .assign(request("bronze-1w", "+233201234567", "ref-1"))
        .await
        .expect("sale");
    assert_eq!(sale.username, "u1");
    assert_eq!(sale.password, "p1");
    assert!(sale.transaction_id.is_some());
    assert!(!sale.replayed);

    let credential = store.get_credential(&sale.credential_id).await.expect("credential");
    assert!(credential.used);
    assert_eq!(credential.assigned_to.as_deref(), Some("+233201234567"));
    assert!(credential.assigned_at.is_some());

    let ledger = store
        .list_transactions(&TransactionFilter::default(), Page::default())
        .await
        .expect("ledger");
    assert_eq!(ledger.total, 1);
    assert_eq!(ledger.items[0].reference, "ref-1");
    assert_eq!(ledger.items[0].username, "u1");
    assert_eq!(ledger.items[0].amount, 20.0);
}

#[tokio::test]
async fn second_buyer_sees_out_of_stock_until_reset() {
    let store = Arc::new(InMemoryStore::new());
    stock(&store, "bronze-1w", "u1", "p1").await;
    let engine = engine(store.clone());

    let first = engine
        .assign(request("bronze-1w", "+233200000001", "ref-a"))
        .await
        .expect("first sale");

    let second = engine
        .assign(request("bronze-1w", "+233200000002", "ref-b"))
        .await;
    assert!(matches!(second, Err(AssignmentError::OutOfStock { .. })));
    assert_eq!(engine.remaining_stock("bronze-1w").await.expect("stock"), 0);

    store.reset_credential(&first.credential_id).await.expect("reset");
    let third = engine
        .assign(request("bronze-1w", "+233200000003", "ref-c"))
        .await
        .expect("sale after reset");
    assert_eq!(third.username, "u1");
    assert_eq!(third.buyer_phone, "+233200000003");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_buyers_never_share_a_credential() {
    const STOCK: usize = 6;
    const EXTRA: usize = 4;

    let store = Arc::new(InMemoryStore::new());
    for i in 0..STOCK {
        stock(&store, "silver-2w", &format!("user{i}"), &format!("pass{i}")).await;
    }
    let engine = Arc::new(engine(store.clone()));

    let mut handles = Vec::new();
    for i in 0..STOCK + EXTRA {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .assign(request("silver-2w", &format!("+23324000000{i}"), &format!("ref-{i}")))
                .await
        }));
    }

    let mut usernames = HashSet::new();
    let mut sold_out = 0;
    for handle in handles {
        match handle.await.expect("join") {
            Ok(sale) => assert!(usernames.insert(sale.username), "credential sold twice"),
            Err(AssignmentError::OutOfStock { .. }) => sold_out += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(usernames.len(), STOCK);
    assert_eq!(sold_out, EXTRA);

    let ledger = store
        .list_transactions(&TransactionFilter::default(), Page::default())
        .await
        .expect("ledger");
    assert_eq!(ledger.total as usize, STOCK);
}

#[tokio::test]
async fn packages_draw_from_their_own_stock() {
    let store = Arc::new(InMemoryStore::new());
    stock(&store, "gold-3w", "gold-user", "gold-pass").await;
    let engine = engine(store.clone());

    let result = engine
        .assign(request("bronze-1w", "+233200000010", "ref-x"))
        .await;
    assert!(matches!(result, Err(AssignmentError::OutOfStock { .. })));
    assert_eq!(engine.remaining_stock("gold-3w").await.expect("stock"), 1);
}

#[tokio::test]
async fn ledger_failure_keeps_the_claim() {
    let store = Arc::new(InMemoryStore::new());
    stock(&store, "bronze-1w", "u1", "p1").await;
    let engine = AssignmentEngine::new(
        store.clone(),
        Arc::new(OfflineLedger),
        Catalog::new(store.clone()),
        config(),
    );

    let err = engine
        .assign(request("bronze-1w", "+233200000020", "ref-ledger"))
        .await
        .expect_err("ledger is offline");

    let assignment = match err {
        AssignmentError::LedgerWriteFailed { assignment, .. } => assignment,
        other => panic!("expected a ledger failure, got {other}"),
    };
    assert_eq!(assignment.username, "u1");
    assert!(assignment.transaction_id.is_none());

    let credential = store
        .get_credential(&assignment.credential_id)
        .await
        .expect("credential");
    assert!(credential.used);
    assert_eq!(credential.assigned_to.as_deref(), Some("+233200000020"));
    assert_eq!(engine.remaining_stock("bronze-1w").await.expect("stock"), 0);
}

#[tokio::test]
async fn lost_claim_reselects_from_a_fresh_read() {
    let store = Arc::new(InMemoryStore::new());
    stock(&store, "bronze-1w", "u1", "p1").await;
    let contended = Arc::new(ContendedStore::new(store.clone(), 1));
    let engine = AssignmentEngine::new(
        contended.clone(),
        store.clone(),
        Catalog::new(store.clone()),
        config(),
    );

    let sale = engine
        .assign(request("bronze-1w", "+233200000030", "ref-race"))
        .await
        .expect("sale after one lost race");
    assert_eq!(sale.username, "u1");
    assert!(sale.transaction_id.is_some());
    assert_eq!(contended.claims.load(Ordering::SeqCst), 2);
    assert_eq!(contended.selects.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn endless_contention_stops_at_the_attempt_cap() {
    let store = Arc::new(InMemoryStore::new());
    stock(&store, "bronze-1w", "u1", "p1").await;
    let contended = Arc::new(ContendedStore::new(store.clone(), u32::MAX));
    let engine = AssignmentEngine::new(
        contended.clone(),
        store.clone(),
        Catalog::new(store.clone()),
        EngineConfig {
            claim_max_attempts: 2,
            ..config()
        },
    );

    let result = engine
        .assign(request("bronze-1w", "+233200000031", "ref-cap"))
        .await;
    assert!(matches!(
        result,
        Err(AssignmentError::AssignmentConflict { attempts: 2, .. })
    ));
    assert_eq!(contended.claims.load(Ordering::SeqCst), 2);
    assert_eq!(store.count_credentials("bronze-1w", Some(false)).await.expect("count"), 1);
}

#[tokio::test]
async fn transient_ledger_failure_is_retried() {
    let store = Arc::new(InMemoryStore::new());
    stock(&store, "bronze-1w", "u1", "p1").await;
    let engine = AssignmentEngine::new(
        store.clone(),
        Arc::new(FlakyLedger::new(store.clone(), 1)),
        Catalog::new(store.clone()),
        config(),
    );

    let sale = engine
        .assign(request("bronze-1w", "+233200000032", "ref-flaky"))
        .await
        .expect("sale");
    assert!(sale.transaction_id.is_some());

    let ledger = store
        .list_transactions(&TransactionFilter::default(), Page::default())
        .await
        .expect("ledger");
    assert_eq!(ledger.total, 1);
}

#[tokio::test]
async fn replay_backfills_a_missing_ledger_entry() {
    let store = Arc::new(InMemoryStore::new());
    stock(&store, "bronze-1w", "u1", "p1").await;
    let engine = AssignmentEngine::new(
        store.clone(),
        Arc::new(FlakyLedger::new(store.clone(), config().ledger_write_attempts)),
        Catalog::new(store.clone()),
        config(),
    );

    let first = engine
        .assign(request("bronze-1w", "+233200000033", "ref-backfill"))
        .await;
    assert!(matches!(first, Err(AssignmentError::LedgerWriteFailed { .. })));

    let replay = engine
        .assign(request("bronze-1w", "+233200000033", "ref-backfill"))
        .await
        .expect("replay");
    assert!(replay.replayed);
    assert_eq!(replay.username, "u1");
    assert!(replay.transaction_id.is_some());

    let ledger = store
        .list_transactions(&TransactionFilter::default(), Page::default())
        .await
        .expect("ledger");
    assert_eq!(ledger.total, 1);
    assert_eq!(ledger.items[0].reference, "ref-backfill");
}
