use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use booking_server::jwt::TokenService;
use booking_server::models::NewTeacher;
use booking_server::principal::Principal;
use booking_server::store::{MemoryStore, Store};
use booking_server::{app, AppState};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

struct Harness {
    app: Router,
    state: AppState,
}

impl Harness {
    fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let state = AppState::new(
            Arc::new(MemoryStore::new()),
            TokenService::new("integration-secret", 3_600_000),
        );
        Self {
            app: app(state.clone()),
            state,
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let res = self.app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = hyper::body::to_bytes(res.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn register(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": email,
                "firstName": "Alice",
                "lastName": "Liddell",
                "password": password,
            })),
        )
        .await
    }

    async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    /// Registers and logs in, returning `(id, token)`.
    async fn account(&self, email: &str) -> (i64, String) {
        let (status, _) = self.register(email, "pw12345").await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = self.login(email, "pw12345").await;
        assert_eq!(status, StatusCode::OK);
        (
            body["id"].as_i64().unwrap(),
            body["token"].as_str().unwrap().to_string(),
        )
    }

    async fn session(&self, token: &str) -> i64 {
        let teacher = self
            .state
            .store
            .insert_teacher(NewTeacher {
                first_name: "Margot".to_string(),
                last_name: "Delahaye".to_string(),
            })
            .await
            .unwrap();
        let (status, body) = self
            .send(
                Method::POST,
                "/api/session",
                Some(token),
                Some(json!({
                    "name": "Yoga Class",
                    "date": "2024-01-01T10:00:00Z",
                    "teacher_id": teacher.id,
                    "description": "A relaxing yoga session",
                    "users": [],
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["id"].as_i64().unwrap()
    }
}

#[tokio::test]
async fn register_login_and_delete_own_account() {
    let h = Harness::new();
    let (status, body) = h.register("alice@example.com", "pw123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User registered successfully!");

    let (status, body) = h.login("alice@example.com", "pw123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice@example.com");
    assert_eq!(body["type"], "Bearer");
    assert_eq!(body["admin"], false);
    let alice_id = body["id"].as_i64().unwrap();
    let alice_token = body["token"].as_str().unwrap().to_string();
    assert_eq!(
        h.state.tokens.subject(&alice_token).unwrap(),
        "alice@example.com"
    );

    let (bob_id, bob_token) = h.account("bob@example.com").await;

    let (status, _) = h
        .send(
            Method::DELETE,
            &format!("/api/user/{}", bob_id),
            Some(&alice_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(h.state.store.find_user(bob_id).await.unwrap().is_some());

    let (status, _) = h
        .send(
            Method::DELETE,
            &format!("/api/user/{}", alice_id),
            Some(&alice_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = h
        .send(
            Method::GET,
            &format!("/api/user/{}", alice_id),
            Some(&bob_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Her token names an account that is gone.
    let (status, _) = h
        .send(Method::GET, "/api/teacher", Some(&alice_token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() {
    let h = Harness::new();
    let (status, body) = h
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": "alice@example.com",
                "firstName": "Alice",
                "lastName": "Liddell",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadRequest");
    assert!(h
        .state
        .store
        .find_user_by_email("alice@example.com")
        .await
        .unwrap()
        .is_none());

    let (status, body) = h
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": 12345 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadRequest");

    let (_, token) = h.account("bob@example.com").await;
    let (status, body) = h
        .send(
            Method::POST,
            "/api/session",
            Some(&token),
            Some(json!({
                "name": "Yoga",
                "date": "not a date",
                "teacher_id": 1,
                "description": "A relaxing yoga session",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadRequest");
}

#[tokio::test]
async fn duplicate_registration_is_a_bad_request() {
    let h = Harness::new();
    let (status, _) = h.register("alice@example.com", "pw123456").await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = h.register("alice@example.com", "different1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Error: Email is already taken!");

    let (status, _) = h.login("alice@example.com", "different1").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bad_credentials_are_unauthorized() {
    let h = Harness::new();
    h.register("alice@example.com", "pw123456").await;

    let (wrong_status, wrong_body) = h.login("alice@example.com", "wrongpassword").await;
    let (unknown_status, unknown_body) = h.login("nobody@example.com", "pw123456").await;
    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let h = Harness::new();
    let (status, _) = h.send(Method::GET, "/api/session", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = h
        .send(Method::GET, "/api/session", Some("not.a.token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (id, _) = h.account("alice@example.com").await;
    let expired = h
        .state
        .tokens
        .issue_at(
            &Principal {
                id,
                username: "alice@example.com".to_string(),
                first_name: "Alice".to_string(),
                last_name: "Liddell".to_string(),
                admin: false,
                password_hash: String::new(),
            },
            Utc::now() - Duration::hours(2),
        )
        .unwrap();
    let (status, _) = h
        .send(Method::GET, "/api/session", Some(&expired), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn join_and_leave_a_session() {
    let h = Harness::new();
    let (alice, token) = h.account("alice@example.com").await;
    let (bob, _) = h.account("bob@example.com").await;
    let session = h.session(&token).await;

    let join = |user: i64| format!("/api/session/{}/participate/{}", session, user);

    let (status, body) = h.send(Method::POST, &join(alice), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"], json!([alice]));

    let (status, _) = h.send(Method::POST, &join(alice), Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = h.send(Method::POST, &join(bob), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"], json!([alice, bob]));

    let (status, body) = h.send(Method::DELETE, &join(alice), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"], json!([bob]));

    let (status, _) = h.send(Method::DELETE, &join(alice), Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = h.send(Method::POST, &join(9999), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = h
        .send(
            Method::POST,
            &format!("/api/session/9999/participate/{}", alice),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn session_crud() {
    let h = Harness::new();
    let (_, token) = h.account("alice@example.com").await;
    let id = h.session(&token).await;

    let (status, body) = h
        .send(Method::GET, &format!("/api/session/{}", id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Yoga Class");
    let teacher_id = body["teacher_id"].as_i64().unwrap();

    let (status, body) = h
        .send(
            Method::PUT,
            &format!("/api/session/{}", id),
            Some(&token),
            Some(json!({
                "name": "Updated Session",
                "date": "2024-02-01T10:00:00Z",
                "teacher_id": teacher_id,
                "description": "Updated Description",
                "users": [1, 2],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Updated Session");
    assert_eq!(body["users"], json!([]));

    let (status, body) = h.send(Method::GET, "/api/session", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessions"].as_array().unwrap().len(), 1);

    let (status, _) = h
        .send(
            Method::DELETE,
            &format!("/api/session/{}", id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = h
        .send(Method::GET, &format!("/api/session/{}", id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_session_payload_is_rejected() {
    let h = Harness::new();
    let (_, token) = h.account("alice@example.com").await;
    let (status, _) = h
        .send(
            Method::POST,
            "/api/session",
            Some(&token),
            Some(json!({
                "name": "",
                "date": "2024-01-01T10:00:00Z",
                "teacher_id": 1,
                "description": "A relaxing yoga session",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = h
        .send(
            Method::POST,
            "/api/session",
            Some(&token),
            Some(json!({
                "name": "Yoga",
                "date": "2024-01-01T10:00:00Z",
                "teacher_id": 4242,
                "description": "A relaxing yoga session",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn teachers_are_listed_and_fetched() {
    let h = Harness::new();
    let (_, token) = h.account("alice@example.com").await;
    let teacher = h
        .state
        .store
        .insert_teacher(NewTeacher {
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
        })
        .await
        .unwrap();

    let (status, body) = h.send(Method::GET, "/api/teacher", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["teachers"].as_array().unwrap().len(), 1);

    let (status, body) = h
        .send(
            Method::GET,
            &format!("/api/teacher/{}", teacher.id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lastName"], "Doe");
    assert_eq!(body["firstName"], "John");

    let (status, _) = h
        .send(Method::GET, "/api/teacher/999999", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = h
        .send(Method::GET, "/api/teacher/invalid-id", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn user_profile_hides_password() {
    let h = Harness::new();
    let (id, token) = h.account("alice@example.com").await;
    let (status, body) = h
        .send(Method::GET, &format!("/api/user/{}", id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "alice@example.com");
    assert!(body.get("password").is_none());
    assert!(body.get("passwordHash").is_none());
}

#[tokio::test]
async fn unknown_paths_are_not_found() {
    let h = Harness::new();
    let (status, body) = h.send(Method::GET, "/api/nothing", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
}
