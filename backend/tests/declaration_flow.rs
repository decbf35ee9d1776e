//! Declaration gate behaviour over the real stores.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use mockable::{Clock, DefaultClock};

use dispatch_backend::domain::ports::{
    AuditLogRepository, DeclarationRepository, FixtureSessionTerminator, RewardsCommand,
    UserRepository,
};
use dispatch_backend::domain::{
    DeclarationAnswers, DeclarationGatePorts, DeclarationOutcome, Email, LegalDeclarationGate,
    RewardsLedger, Role, User, UserId, DEFAULT_LOCKOUT_HOURS,
};
use dispatch_backend::server::Stores;

fn courier(email: &str) -> User {
    User {
        id: UserId::random(),
        name: "Mara".into(),
        last_name: "Lindqvist".into(),
        email: Email::new(email).expect("email"),
        password_hash: "hash".into(),
        roles: BTreeSet::from([Role::Delivery]),
        active: true,
        points: 0,
        consecutive_deliveries: 3,
        assigned_packages: Vec::new(),
        lockout: None,
        revision: 1,
    }
}

fn gate(stores: &Stores) -> LegalDeclarationGate {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let ledger = Arc::new(RewardsLedger::new(
        stores.users.clone(),
        stores.audit.clone(),
        clock.clone(),
    ));
    let rewards: Arc<dyn RewardsCommand> = ledger;
    LegalDeclarationGate::new(
        DeclarationGatePorts {
            declarations: stores.declarations.clone(),
            users: stores.users.clone(),
            rewards,
            sessions: Arc::new(FixtureSessionTerminator),
            audit: stores.audit.clone(),
        },
        clock,
        DEFAULT_LOCKOUT_HOURS,
    )
}

#[tokio::test]
async fn unfit_declaration_applies_every_consequence() {
    let stores = Stores::new();
    let user = courier("mara@example.com");
    let user_id = user.id;
    stores.users.insert(&user).await.expect("insert");
    let gate = gate(&stores);

    let answers = DeclarationAnswers {
        alcohol: true,
        psychoactive_substances: false,
        emotional_distress: false,
    };
    let (declaration, outcome) = gate
        .handle_declaration(&user_id, answers)
        .await
        .expect("handled");
    assert_eq!(
        outcome,
        DeclarationOutcome::UnfitRecorded {
            penalty_applied: true
        }
    );

    // Declaration persisted.
    let history = stores
        .declarations
        .find_by_user(&user_id)
        .await
        .expect("history");
    assert_eq!(history, vec![declaration]);

    // −100 and streak cleared.
    let penalised = stores
        .users
        .find_by_id(&user_id)
        .await
        .expect("lookup")
        .expect("present");
    assert_eq!(penalised.points, -100);
    assert_eq!(penalised.consecutive_deliveries, 0);

    // Lockout active now, expired after the configured duration.
    let now = Utc::now();
    assert!(penalised.is_locked_out(now));
    assert!(!penalised.is_locked_out(now + chrono::TimeDelta::hours(DEFAULT_LOCKOUT_HOURS + 1)));
    let lockout = penalised.lockout.expect("lockout");
    assert_eq!(lockout.reason, "legal.declaration.negative");

    // Audit: submission, ledger penalty, and lockout.
    let entries = stores.audit.find_all().await.expect("entries");
    let actions: Vec<&str> = entries.iter().map(|entry| entry.action.as_str()).collect();
    assert!(actions.contains(&"declaration.submit"));
    assert!(actions.contains(&"points.legal.subtract"));
    assert!(actions.contains(&"user.lockout"));
}

#[tokio::test]
async fn fit_declaration_only_stores_the_record() {
    let stores = Stores::new();
    let user = courier("ivan@example.com");
    let user_id = user.id;
    stores.users.insert(&user).await.expect("insert");
    let gate = gate(&stores);

    let answers = DeclarationAnswers {
        alcohol: false,
        psychoactive_substances: false,
        emotional_distress: false,
    };
    let (_, outcome) = gate
        .handle_declaration(&user_id, answers)
        .await
        .expect("handled");
    assert_eq!(outcome, DeclarationOutcome::FitToWork);

    let unchanged = stores
        .users
        .find_by_id(&user_id)
        .await
        .expect("lookup")
        .expect("present");
    assert_eq!(unchanged.points, 0);
    assert_eq!(unchanged.consecutive_deliveries, 3);
    assert!(unchanged.lockout.is_none());
    assert_eq!(
        stores
            .declarations
            .find_by_user(&user_id)
            .await
            .expect("history")
            .len(),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_unfit_declarations_both_record_and_both_penalise() {
    let stores = Stores::new();
    let user = courier("sam@example.com");
    let user_id = user.id;
    stores.users.insert(&user).await.expect("insert");
    let gate = Arc::new(gate(&stores));

    let answers = DeclarationAnswers {
        alcohol: false,
        psychoactive_substances: true,
        emotional_distress: false,
    };
    let mut handles = Vec::new();
    for _ in 0..2 {
        let gate = gate.clone();
        handles.push(tokio::spawn(async move {
            gate.handle_declaration(&user_id, answers).await
        }));
    }
    for handle in handles {
        handle.await.expect("task").expect("handled");
    }

    // Both submissions persist and both penalties land.
    assert_eq!(
        stores
            .declarations
            .find_by_user(&user_id)
            .await
            .expect("history")
            .len(),
        2
    );
    let penalised = stores
        .users
        .find_by_id(&user_id)
        .await
        .expect("lookup")
        .expect("present");
    assert_eq!(penalised.points, -200);
}
