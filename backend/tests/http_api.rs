//! End-to-end HTTP behaviour: identity headers, authorisation, and the
//! error envelope, exercised against the full route table.

use actix_web::{test, web, App};
use serde_json::json;

use dispatch_backend::api::identity::{ACTOR_ID_HEADER, ACTOR_ROLES_HEADER};
use dispatch_backend::domain::ports::{PackageRepository, UserRepository};
use dispatch_backend::domain::{Email, Role, User};
use dispatch_backend::server::{build_services, configure_api, seed_example_data, Stores};
use dispatch_backend::Trace;

async fn seeded_stores() -> Stores {
    let stores = Stores::new();
    seed_example_data(&stores).await.expect("seed");
    stores
}

async fn user_by_email(stores: &Stores, email: &str) -> User {
    stores
        .users
        .find_by_email(&Email::new(email).expect("email"))
        .await
        .expect("lookup")
        .expect("seeded user")
}

fn roles_header(user: &User) -> String {
    user.roles
        .iter()
        .map(|role| match role {
            Role::Delivery => "delivery",
            Role::Admin => "admin",
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn as_actor(req: test::TestRequest, user: &User) -> test::TestRequest {
    req.insert_header((ACTOR_ID_HEADER, user.id.to_string()))
        .insert_header((ACTOR_ROLES_HEADER, roles_header(user)))
}

macro_rules! app {
    ($stores:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(build_services($stores, 24)))
                .wrap(Trace)
                .configure(configure_api),
        )
        .await
    };
}

#[actix_rt::test]
async fn missing_identity_yields_the_unauthorized_envelope() {
    let stores = seeded_stores().await;
    let app = app!(&stores);

    let req = test::TestRequest::get()
        .uri("/api/v1/packages/assigned")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    assert!(resp.headers().contains_key("trace-id"));

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "unauthorized");
    assert!(body["message"].is_string());
    assert!(body["traceId"].is_string());
}

#[actix_rt::test]
async fn couriers_cannot_reach_admin_endpoints() {
    let stores = seeded_stores().await;
    let courier = user_by_email(&stores, "mara@example.com").await;
    let app = app!(&stores);

    let req = as_actor(test::TestRequest::get(), &courier)
        .uri("/api/v1/packages/assigned")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "forbidden");
}

#[actix_rt::test]
async fn registration_normalises_the_email_and_rejects_duplicates() {
    let stores = seeded_stores().await;
    let admin = user_by_email(&stores, "admin@example.com").await;
    let app = app!(&stores);

    let payload = json!({
        "name": "Noor",
        "lastName": "Haddad",
        "email": "Noor@Example.COM",
        "passwordHash": "hash",
        "roles": ["delivery"]
    });
    let req = as_actor(test::TestRequest::post(), &admin)
        .uri("/api/v1/users")
        .set_json(&payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["email"], "noor@example.com");
    assert!(body.get("passwordHash").is_none());

    let req = as_actor(test::TestRequest::post(), &admin)
        .uri("/api/v1/users")
        .set_json(&payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "conflict");
}

#[actix_rt::test]
async fn assignment_requires_a_primed_assignment_list() {
    let stores = seeded_stores().await;
    let admin = user_by_email(&stores, "admin@example.com").await;
    let primed = user_by_email(&stores, "mara@example.com").await;
    let unprimed = user_by_email(&stores, "ivan@example.com").await;
    let app = app!(&stores);

    let mut created = Vec::new();
    for description in ["Archive boxes", "Printer toner"] {
        let req = as_actor(test::TestRequest::post(), &admin)
            .uri("/api/v1/packages")
            .set_json(json!({
                "description": description,
                "address": "9 Mill Lane",
                "weightGrams": 900,
                "deliveryDate": chrono::Utc::now() + chrono::TimeDelta::days(1)
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 201);
        let body: serde_json::Value = test::read_body_json(resp).await;
        created.push(body["id"].as_str().expect("package id").to_owned());
    }

    // Ivan holds no assignments yet, so the gate refuses him.
    let req = as_actor(test::TestRequest::post(), &admin)
        .uri(&format!("/api/v1/packages/{}/assign", created[0]))
        .set_json(json!({ "userId": unprimed.id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 406);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "invalid_state");

    // Mara already carries one package, so she may take another.
    let req = as_actor(test::TestRequest::post(), &admin)
        .uri(&format!("/api/v1/packages/{}/assign", created[1]))
        .set_json(json!({ "userId": primed.id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["state"], "pending");
    assert_eq!(body["deliveryMan"], json!(primed.id));
}

#[actix_rt::test]
async fn the_delivery_flow_credits_the_courier() {
    let stores = seeded_stores().await;
    let courier = user_by_email(&stores, "mara@example.com").await;
    let assigned = stores
        .packages
        .find_all_with_delivery_man()
        .await
        .expect("assigned")
        .pop()
        .expect("primed package");
    let app = app!(&stores);

    let req = as_actor(test::TestRequest::post(), &courier)
        .uri(&format!("/api/v1/packages/{}/start", assigned.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["state"], "on-the-way");

    let req = as_actor(test::TestRequest::post(), &courier)
        .uri(&format!("/api/v1/packages/{}/delivered", assigned.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["package"]["state"], "delivered");
    assert_eq!(body["receipt"]["points"], 10);
    assert_eq!(body["receipt"]["consecutiveDeliveries"], 1);

    // Couriers may read their own balance.
    let req = as_actor(test::TestRequest::get(), &courier)
        .uri(&format!("/api/v1/users/{}/points", courier.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["points"], 10);
}

#[actix_rt::test]
async fn only_the_assignee_may_progress_a_package() {
    let stores = seeded_stores().await;
    let other = user_by_email(&stores, "ivan@example.com").await;
    let assigned = stores
        .packages
        .find_all_with_delivery_man()
        .await
        .expect("assigned")
        .pop()
        .expect("primed package");
    let app = app!(&stores);

    let req = as_actor(test::TestRequest::post(), &other)
        .uri(&format!("/api/v1/packages/{}/start", assigned.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 406);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "invalid_state");
}

#[actix_rt::test]
async fn the_manual_reset_trigger_reports_the_sweep() {
    let stores = seeded_stores().await;
    let admin = user_by_email(&stores, "admin@example.com").await;
    let app = app!(&stores);

    let req = as_actor(test::TestRequest::post(), &admin)
        .uri("/api/v1/jobs/daily-reset")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["released"], 1);
    assert_eq!(body["usersCleared"], 1);
    assert_eq!(body["failures"], 0);
}

#[actix_rt::test]
async fn unknown_resources_yield_not_found() {
    let stores = seeded_stores().await;
    let admin = user_by_email(&stores, "admin@example.com").await;
    let app = app!(&stores);

    let req = as_actor(test::TestRequest::get(), &admin)
        .uri(&format!("/api/v1/packages/{}", uuid::Uuid::new_v4()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "not_found");
}
