//! Concurrency properties of the rewards ledger over the real document store.
//!
//! The single most important invariant: concurrent ledger operations on the
//! same user never lose an update. Every delta must land, in some order, in
//! the final balance.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::join_all;
use mockable::DefaultClock;

use dispatch_backend::domain::ports::{RewardsCommand, UserRepository};
use dispatch_backend::domain::{ActorRef, Email, Role, RewardsLedger, User, UserId};
use dispatch_backend::outbound::persistence::{MemoryAuditLogRepository, MemoryUserRepository};

fn courier() -> User {
    User {
        id: UserId::random(),
        name: "Mara".into(),
        last_name: "Lindqvist".into(),
        email: Email::new("mara@example.com").expect("email"),
        password_hash: "hash".into(),
        roles: BTreeSet::from([Role::Delivery]),
        active: true,
        points: 0,
        consecutive_deliveries: 0,
        assigned_packages: Vec::new(),
        lockout: None,
        revision: 1,
    }
}

async fn ledger_with_user() -> (
    Arc<RewardsLedger<MemoryUserRepository, MemoryAuditLogRepository>>,
    Arc<MemoryUserRepository>,
    Arc<MemoryAuditLogRepository>,
    UserId,
) {
    let users = Arc::new(MemoryUserRepository::new());
    let audit = Arc::new(MemoryAuditLogRepository::new());
    let user = courier();
    let user_id = user.id;
    users.insert(&user).await.expect("insert user");
    let ledger = Arc::new(RewardsLedger::new(
        users.clone(),
        audit.clone(),
        Arc::new(DefaultClock),
    ));
    (ledger, users, audit, user_id)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_deltas_all_land_in_the_final_balance() {
    let (ledger, users, _, user_id) = ledger_with_user().await;

    let mut handles = Vec::new();
    // 20 deliveries (+10 each) racing 5 cancellations (−10 each).
    for _ in 0..20 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            ledger.add_points_for_delivery(&user_id).await
        }));
    }
    for _ in 0..5 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            ledger.subtract_points_for_cancellation(&user_id).await
        }));
    }
    for joined in join_all(handles).await {
        joined.expect("task").expect("ledger op");
    }

    let user = users
        .find_by_id(&user_id)
        .await
        .expect("lookup")
        .expect("present");
    assert_eq!(user.points, 20 * 10 - 5 * 10);
    // 25 committed saves on top of the initial revision.
    assert_eq!(user.revision, 26);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_mutation_pairs_with_exactly_one_audit_entry() {
    let (ledger, _, audit, user_id) = ledger_with_user().await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            ledger.add_points_for_delivery(&user_id).await
        }));
    }
    for joined in join_all(handles).await {
        joined.expect("task").expect("ledger op");
    }

    use dispatch_backend::domain::ports::AuditLogRepository;
    let entries = audit.find_all().await.expect("entries");
    assert_eq!(entries.len(), 10);
    assert!(entries
        .iter()
        .all(|entry| entry.action == "points.delivery.add"));
    // Sequences are unique and monotonic.
    let sequences: Vec<u64> = entries.iter().map(|entry| entry.sequence).collect();
    let mut sorted = sequences.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), 10);
}

#[tokio::test]
async fn penalties_may_drive_the_balance_negative() {
    let (ledger, users, _, user_id) = ledger_with_user().await;

    ledger
        .add_points_for_delivery(&user_id)
        .await
        .expect("delivery");
    let receipt = ledger
        .subtract_points_for_negative_declaration(&user_id)
        .await
        .expect("penalty");
    assert_eq!(receipt.points, 10 - 100);
    assert_eq!(receipt.consecutive_deliveries, 0);

    let user = users
        .find_by_id(&user_id)
        .await
        .expect("lookup")
        .expect("present");
    assert_eq!(user.points, -90);
}

#[tokio::test]
async fn set_points_overrides_whatever_raced_before_it() {
    let (ledger, users, _, user_id) = ledger_with_user().await;

    ledger
        .add_points_for_delivery(&user_id)
        .await
        .expect("delivery");
    let receipt = ledger
        .set_points(&user_id, -42, ActorRef::System)
        .await
        .expect("override");
    assert_eq!(receipt.points, -42);

    let user = users
        .find_by_id(&user_id)
        .await
        .expect("lookup")
        .expect("present");
    assert_eq!(user.points, -42);
}
