//! End-to-end tests of the HTTP surface over an in-memory SQLite database

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use sea_orm::{ConnectOptions, Database, DbBackend, MockDatabase};
use serde_json::{json, Value};
use std::sync::Arc;
use talentforge_common::{
    auth::{JwtManager, WRITE_SCOPE},
    config::AppConfig,
    db::{repository, schema, DbPool},
};
use talentforge_gateway::{create_router, AppState};
use tower::util::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "integration-secret";

struct TestApp {
    router: Router,
    db: DbPool,
    tenant_id: Uuid,
    credential_id: Uuid,
    token: String,
}

impl TestApp {
    async fn new() -> Self {
        let mut opts = ConnectOptions::new("sqlite::memory:");
        opts.max_connections(1).min_connections(1).sqlx_logging(false);
        let conn = Database::connect(opts).await.unwrap();
        schema::create_tables(&conn).await.unwrap();
        let tenant = repository::insert_tenant(&conn, "Acme Academy").await.unwrap();

        Self::with_pool(DbPool::from_connection(conn), tenant.id)
    }

    fn with_pool(db: DbPool, tenant_id: Uuid) -> Self {
        let mut config = AppConfig::default();
        config.rate_limit.enabled = false;
        config.auth.legacy_credential_paths = true;

        let jwt = JwtManager::new(SECRET, 3600);
        let credential_id = Uuid::new_v4();
        let token = jwt
            .generate_token(credential_id, tenant_id, vec![WRITE_SCOPE.to_string()])
            .unwrap();

        Self {
            router: create_router(AppState::new(config, db.clone(), jwt)),
            db,
            tenant_id,
            credential_id,
            token,
        }
    }

    fn path(&self, rest: &str) -> String {
        format!("/tenant/{}{}", self.tenant_id, rest)
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn post(&self, rest: &str, body: Value) -> Response {
        self.send(Method::POST, &self.path(rest), Some(&self.token), Some(body)).await
    }

    async fn put(&self, rest: &str, body: Value) -> Response {
        self.send(Method::PUT, &self.path(rest), Some(&self.token), Some(body)).await
    }

    async fn get(&self, rest: &str) -> Response {
        self.send(Method::GET, &self.path(rest), Some(&self.token), None).await
    }

    async fn delete(&self, rest: &str) -> Response {
        self.send(Method::DELETE, &self.path(rest), Some(&self.token), None).await
    }

    /// POST expecting 201 and return the new id
    async fn create(&self, rest: &str, body: Value) -> Uuid {
        let response = self.post(rest, body).await;
        assert_eq!(response.status(), StatusCode::CREATED, "POST {}", rest);
        let body = json_body(response).await;
        body["id"].as_str().unwrap().parse().unwrap()
    }
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn header_of<'a>(response: &'a Response, name: &str) -> &'a str {
    response.headers()[name].to_str().unwrap()
}

fn talent(email: &str) -> Value {
    json!({
        "firstName": "Asha",
        "lastName": "Rao",
        "email": email,
        "contact": "9876543210",
        "academicYear": "graduate",
        "lifetimeValue": 1200.5
    })
}

fn batch() -> Value {
    json!({
        "name": "Rust Jan",
        "courseName": "Rust",
        "startDate": "2026-01-05",
        "endDate": "2026-03-31",
        "totalIntake": 20,
        "status": "upcoming",
        "timings": [
            { "day": "monday", "fromTime": "09:00", "toTime": "11:00" },
            { "day": "wednesday", "fromTime": "09:00", "toTime": "11:00" }
        ]
    })
}

// ============================================================================
// Probes and authentication
// ============================================================================

#[tokio::test]
async fn test_health_needs_no_token() {
    let app = TestApp::new().await;

    let response = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "healthy");

    let response = app.send(Method::GET, "/ready", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new().await;

    let response = app.send(Method::GET, &app.path("/talent"), None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_for_other_tenant_is_forbidden() {
    let app = TestApp::new().await;
    let other = Uuid::new_v4();

    let uri = format!("/tenant/{}/talent", other);
    let response = app.send(Method::GET, &uri, Some(&app.token), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_read_only_token_cannot_write() {
    let app = TestApp::new().await;
    let jwt = JwtManager::new(SECRET, 3600);
    let reader = jwt
        .generate_token(Uuid::new_v4(), app.tenant_id, vec!["read".to_string()])
        .unwrap();

    let response = app
        .send(Method::POST, &app.path("/talent"), Some(&reader), Some(talent("a@x.com")))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.send(Method::GET, &app.path("/talent"), Some(&reader), None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_ids_and_bodies_are_bad_requests() {
    let app = TestApp::new().await;

    let response = app.get("/talent/not-a-uuid").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(Method::GET, "/tenant/nope/talent", Some(&app.token), None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method(Method::POST)
        .uri(app.path("/talent"))
        .header(header::AUTHORIZATION, format!("Bearer {}", app.token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"firstName\": "))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.get("/talent?limit=0").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.get("/talent?offset=9223372036854775808").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["field"], "offset");
}

// ============================================================================
// Talents
// ============================================================================

#[tokio::test]
async fn test_talent_lifecycle() {
    let app = TestApp::new().await;
    let id = app.create("/talent", talent("asha@x.com")).await;

    let response = app.get(&format!("/talent/{}", id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["email"], "asha@x.com");
    assert_eq!(body["createdBy"], app.credential_id.to_string());

    let mut update = talent("asha@x.com");
    update["college"] = json!("IIT");
    let response = app.put(&format!("/talent/{}", id), update).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!("Talent updated successfully"));

    let response = app.delete(&format!("/talent/{}", id)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.delete(&format!("/talent/{}", id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.get(&format!("/talent/{}", id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_provenance_comes_from_token_not_body() {
    let app = TestApp::new().await;
    let forged = Uuid::new_v4();

    let mut body = talent("asha@x.com");
    body["createdBy"] = json!(forged);
    let id = app.create("/talent", body).await;

    let stored = json_body(app.get(&format!("/talent/{}", id)).await).await;
    assert_eq!(stored["createdBy"], app.credential_id.to_string());
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let app = TestApp::new().await;
    app.create("/talent", talent("asha@x.com")).await;

    let response = app.post("/talent", talent("ASHA@x.com")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_talent_list_headers_and_paging() {
    let app = TestApp::new().await;
    for n in 0..3 {
        app.create("/talent", talent(&format!("t{}@x.com", n))).await;
    }

    let response = app.get("/talent?limit=2&offset=0").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_of(&response, "x-total-count"), "3");
    assert_eq!(header_of(&response, "x-total-lifetime-value"), "3601.5");
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_bulk_add_reports_partial_failure() {
    let app = TestApp::new().await;
    app.create("/talent", talent("taken@x.com")).await;

    let response = app
        .post(
            "/talents",
            json!([talent("new@x.com"), talent("taken@x.com"), talent("new@x.com")]),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["addedCount"], 1);
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0]["index"], 1);
    assert_eq!(errors[1]["index"], 2);
}

#[tokio::test]
async fn test_bulk_add_rejects_whole_request_on_invalid_record() {
    let app = TestApp::new().await;

    let mut bad = talent("bad@x.com");
    bad["contact"] = json!("12");
    let response = app.post("/talents", json!([talent("ok@x.com"), bad])).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.get("/talent").await;
    assert_eq!(header_of(&response, "x-total-count"), "0");
}

#[tokio::test]
async fn test_validation_failure_touches_no_database() {
    let conn = MockDatabase::new(DbBackend::Postgres).into_connection();
    let app = TestApp::with_pool(DbPool::from_connection(conn), Uuid::new_v4());

    let mut body = talent("asha@x.com");
    body["firstName"] = json!("");
    let response = app.post("/talent", body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["field"], "firstName");

    // The router holds the other handle on the pool
    let TestApp { router, db, .. } = app;
    drop(router);
    let Ok(conn) = Arc::try_unwrap(db.primary) else {
        panic!("connection still shared after the router was dropped");
    };
    assert!(conn.into_transaction_log().is_empty());
}

#[tokio::test]
async fn test_legacy_credential_path() {
    let app = TestApp::new().await;

    let uri = format!("/talent/credential/{}", app.credential_id);
    let response = app.post(&uri, talent("legacy@x.com")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let location = header_of(&response, "location").to_string();
    assert!(location.starts_with(&app.path("/talent/")));

    let response = app
        .send(Method::GET, &location, Some(&app.token), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["createdBy"], app.credential_id.to_string());

    let uri = format!("/talent/credential/{}", Uuid::new_v4());
    let response = app.post(&uri, talent("other@x.com")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ============================================================================
// Enquiries and the waiting list
// ============================================================================

#[tokio::test]
async fn test_enquiry_conversion() {
    let app = TestApp::new().await;
    let enquiry_id = app
        .create(
            "/enquiry",
            json!({
                "firstName": "Ravi",
                "lastName": "Kumar",
                "email": "ravi@x.com",
                "contact": "9123456780",
                "source": "website",
                "enquiryDate": "2026-01-02",
                "academicYear": "third"
            }),
        )
        .await;

    let talent_id = app
        .create(&format!("/enquiry/{}/convert", enquiry_id), json!({}))
        .await;

    let talent = json_body(app.get(&format!("/talent/{}", talent_id)).await).await;
    assert_eq!(talent["email"], "ravi@x.com");

    let enquiry = json_body(app.get(&format!("/enquiry/{}", enquiry_id)).await).await;
    assert_eq!(enquiry["isConverted"], true);

    let response = app.post(&format!("/enquiry/{}/convert", enquiry_id), json!({})).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_waiting_list_transfer() {
    let app = TestApp::new().await;
    let talent_id = app.create("/talent", talent("wait@x.com")).await;
    let batch_id = app.create("/batch", batch()).await;

    let entry_id = app
        .create(
            "/waiting-list",
            json!({ "talentId": talent_id, "email": "wait@x.com", "courseName": "Rust" }),
        )
        .await;

    let response = app
        .post(
            &format!("/waiting-list/{}/transfer", entry_id),
            json!({ "batchId": batch_id }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["addedCount"], 1);

    let entry = json_body(app.get(&format!("/waiting-list/{}", entry_id)).await).await;
    assert_eq!(entry["isActive"], false);

    let response = app.get(&format!("/batch/{}/talent", batch_id)).await;
    assert_eq!(header_of(&response, "x-total-talents"), "1");

    let response = app
        .post(
            &format!("/waiting-list/{}/transfer", entry_id),
            json!({ "batchId": batch_id }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

// ============================================================================
// Batches, session plans and feedback
// ============================================================================

#[tokio::test]
async fn test_session_plan_and_feedback() {
    let app = TestApp::new().await;
    let talent_id = app.create("/talent", talent("learner@x.com")).await;
    let batch_id = app.create("/batch", batch()).await;

    let module_id = app.create("/module", json!({ "name": "Ownership" })).await;
    for (order, minutes) in [(1, 90), (2, 120), (3, 30)] {
        app.create(
            &format!("/module/{}/topic", module_id),
            json!({ "name": format!("Topic {}", order), "order": order, "totalTime": minutes }),
        )
        .await;
    }

    let response = app
        .post(
            &format!("/batch/{}/module", batch_id),
            json!({ "modules": [{ "moduleId": module_id, "order": 1 }] }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .post(&format!("/batch/{}/talent", batch_id), json!({ "talentIds": [talent_id] }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.post(&format!("/batch/{}/session-plan", batch_id), json!({})).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let count = json_body(response).await["sessionCount"].as_u64().unwrap();
    assert!(count > 0);

    let response = app.post(&format!("/batch/{}/session-plan", batch_id), json!({})).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app.get(&format!("/batch/{}/session-plan", batch_id)).await;
    assert_eq!(header_of(&response, "x-total-count"), count.to_string());
    assert_eq!(header_of(&response, "x-completed-count"), "0");
    let plan = json_body(response).await;
    let session_id = plan[0]["id"].as_str().unwrap().to_string();

    let response = app
        .put(
            &format!("/batch/{}/session/{}", batch_id, session_id),
            json!({ "isCompleted": true }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get(&format!("/batch/{}/session-plan", batch_id)).await;
    assert_eq!(header_of(&response, "x-completed-count"), "1");

    let feedback_path = format!("/batch/{}/session/{}/feedback", batch_id, session_id);
    app.create(
        &feedback_path,
        json!({ "talentId": talent_id, "question": "Pace?", "score": 8 }),
    )
    .await;

    let response = app
        .post(
            &feedback_path,
            json!({ "talentId": talent_id, "question": "Pace?", "score": 6 }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app.get(&feedback_path).await;
    assert_eq!(header_of(&response, "x-total-count"), "1");
    assert_eq!(header_of(&response, "x-average-score"), "8");

    let response = app.delete(&format!("/batch/{}/session-plan", batch_id)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = app.delete(&format!("/batch/{}/session-plan", batch_id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Forum and notifications
// ============================================================================

#[tokio::test]
async fn test_reply_to_missing_discussion_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .post(
            &format!("/discussion/{}/reply", Uuid::new_v4()),
            json!({ "reply": "Me too" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_discussion_reply_count() {
    let app = TestApp::new().await;
    let discussion_id = app
        .create("/discussion", json!({ "title": "Lifetimes", "question": "Why 'a?" }))
        .await;
    app.create(&format!("/discussion/{}/reply", discussion_id), json!({ "reply": "Because" }))
        .await;

    let body = json_body(app.get(&format!("/discussion/{}", discussion_id)).await).await;
    assert_eq!(body["replyCount"], 1);

    let response = app.delete(&format!("/discussion/{}", discussion_id)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = app.get(&format!("/discussion/{}/reply", discussion_id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_notifications_are_per_recipient() {
    let app = TestApp::new().await;
    let mut body = json!({
        "credentialId": app.credential_id,
        "title": "Welcome",
        "notificationType": "general"
    });
    let response = app.post("/notification", body.clone()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["field"], "description");

    body["description"] = json!("Your cohort starts on Monday");
    let id = app.create("/notification", body).await;

    let response = app.get("/notification").await;
    assert_eq!(header_of(&response, "x-unseen-count"), "1");

    let response = app.put(&format!("/notification/{}/seen", id), json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get("/notification").await;
    assert_eq!(header_of(&response, "x-total-count"), "1");
    assert_eq!(header_of(&response, "x-unseen-count"), "0");
}

// ============================================================================
// Tenant isolation
// ============================================================================

#[tokio::test]
async fn test_records_do_not_leak_across_tenants() {
    let app = TestApp::new().await;
    let id = app.create("/talent", talent("asha@x.com")).await;

    let other = repository::insert_tenant(app.db.write(), "Other Academy")
        .await
        .unwrap();
    let token = JwtManager::new(SECRET, 3600)
        .generate_token(Uuid::new_v4(), other.id, vec![WRITE_SCOPE.to_string()])
        .unwrap();

    let uri = format!("/tenant/{}/talent/{}", other.id, id);
    let response = app.send(Method::GET, &uri, Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let uri = format!("/tenant/{}/talent/{}", other.id, id);
    let response = app.send(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let uri = format!("/tenant/{}/talent", other.id);
    let response = app.send(Method::GET, &uri, Some(&token), None).await;
    assert_eq!(header_of(&response, "x-total-count"), "0");

    let response = app.get(&format!("/talent/{}", id)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_tenant_is_not_found() {
    let app = TestApp::new().await;
    let ghost = Uuid::new_v4();
    let token = JwtManager::new(SECRET, 3600)
        .generate_token(Uuid::new_v4(), ghost, vec![WRITE_SCOPE.to_string()])
        .unwrap();

    let uri = format!("/tenant/{}/talent", ghost);
    let response = app.send(Method::GET, &uri, Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
