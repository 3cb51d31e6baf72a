//! Router-level tests against an in-memory database.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::config::Config;
use crate::crypto::TokenKeys;
use crate::db::{ensure_admin_user, init_in_memory, seed_demo_data, Role};
use crate::AppState;

const SECRET: &str = "test-secret";
const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "admin-password";

struct TestApp {
    router: Router,
    state: Arc<AppState>,
}

impl TestApp {
    async fn new() -> Self {
        let mut config = Config::default();
        config.auth.jwt_secret = Some(SECRET.to_string());

        let db = init_in_memory().await.unwrap();
        ensure_admin_user(&db, ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();

        let state = Arc::new(AppState::new(config, db));
        let router = super::create_router(state.clone());
        Self { router, state }
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
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

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        (status, value)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, token, Some(body)).await
    }

    /// Register a user and return (token, user id)
    async fn register(&self, email: &str, name: &str) -> (String, String) {
        let (status, body) = self
            .post(
                "/api/register",
                None,
                json!({ "email": email, "name": name, "password": "password123" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {}", body);
        (
            body["token"].as_str().unwrap().to_string(),
            body["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    async fn admin_token(&self) -> String {
        let (status, body) = self
            .post(
                "/api/login",
                None,
                json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "admin login failed: {}", body);
        assert_eq!(body["user"]["role"], "ADMIN");
        body["token"].as_str().unwrap().to_string()
    }

    async fn create_business(&self, admin: &str, name: &str, category: &str, location: &str) -> String {
        let (status, body) = self
            .post(
                "/api/admin/businesses",
                Some(admin),
                json!({
                    "name": name,
                    "description": format!("{} description", name),
                    "category": category,
                    "location": location,
                    "imageUrl": "https://example.com/image.png"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create business failed: {}", body);
        body["id"].as_str().unwrap().to_string()
    }

    async fn submit_review(&self, token: &str, business_id: &str, overall: i64) -> String {
        let (status, body) = self
            .post(
                "/api/reviews",
                Some(token),
                json!({
                    "businessId": business_id,
                    "content": format!("Rated {}", overall),
                    "qualityRating": 4,
                    "serviceRating": 4,
                    "valueRating": 4,
                    "overallRating": overall
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "submit review failed: {}", body);
        body["id"].as_str().unwrap().to_string()
    }

    async fn moderate(&self, admin: &str, review_id: &str, status: &str) -> (StatusCode, Value) {
        self.patch(
            &format!("/api/admin/reviews/{}", review_id),
            Some(admin),
            json!({ "status": status }),
        )
        .await
    }
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn test_register_returns_token_and_user() {
    let app = TestApp::new().await;
    let (status, body) = app
        .post(
            "/api/register",
            None,
            json!({ "email": "  Ann@Example.com ", "name": "Ann", "password": "password123" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "ann@example.com");
    assert_eq!(body["user"]["name"], "Ann");
    assert_eq!(body["user"]["role"], "USER");
    assert!(body["user"].get("passwordHash").is_none());

    let claims = app.state.tokens.verify(body["token"].as_str().unwrap()).unwrap();
    assert_eq!(claims.user_id, body["user"]["id"].as_str().unwrap());
    assert_eq!(claims.role, Role::User);
    assert!(claims.exp > claims.iat);
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let app = TestApp::new().await;
    app.register("ann@example.com", "Ann").await;

    let (status, body) = app
        .post(
            "/api/register",
            None,
            json!({ "email": "ANN@example.com", "name": "Other Ann", "password": "password123" }),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");
}

#[tokio::test]
async fn test_register_validation() {
    let app = TestApp::new().await;
    let (status, body) = app
        .post(
            "/api/register",
            None,
            json!({ "email": "not-an-email", "name": "", "password": "short" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
    let details = &body["error"]["details"];
    assert!(details.get("email").is_some());
    assert!(details.get("name").is_some());
    assert!(details.get("password").is_some());
}

#[tokio::test]
async fn test_login() {
    let app = TestApp::new().await;
    app.register("ann@example.com", "Ann").await;

    let (status, body) = app
        .post("/api/login", None, json!({ "email": "ann@example.com", "password": "password123" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Ann");
    assert!(body["token"].is_string());

    let (status, wrong_password) = app
        .post("/api/login", None, json!({ "email": "ann@example.com", "password": "wrong-password" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, unknown_email) = app
        .post("/api/login", None, json!({ "email": "nobody@example.com", "password": "password123" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(wrong_password["error"]["message"], unknown_email["error"]["message"]);
}

#[tokio::test]
async fn test_missing_token_is_unauthenticated() {
    let app = TestApp::new().await;

    let (status, body) = app.post("/api/reviews", None, json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");

    let (status, _) = app.get("/api/admin/reviews", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bad_tokens_are_forbidden() {
    let app = TestApp::new().await;
    let (_, user_id) = app.register("ann@example.com", "Ann").await;

    let foreign = TokenKeys::new("another-secret", 1).issue(&user_id, Role::Admin).unwrap();
    let expired = TokenKeys::new(SECRET, -1).issue(&user_id, Role::User).unwrap();

    for token in ["garbage", foreign.as_str(), expired.as_str()] {
        let (status, body) = app.get("/api/me", Some(token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "token {}", token);
        assert_eq!(body["error"]["code"], "forbidden");

        let (status, _) = app.get("/api/admin/reviews", Some(token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn test_non_admin_is_forbidden() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let business_id = app.create_business(&admin, "Pizza Palace", "Restaurant", "Downtown").await;
    let (user, _) = app.register("ann@example.com", "Ann").await;
    let review_id = app.submit_review(&user, &business_id, 5).await;

    let (status, _) = app.get("/api/admin/reviews", Some(&user)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.moderate(&user, &review_id, "APPROVED").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            "/api/admin/businesses",
            Some(&user),
            json!({ "name": "Sneaky Shop", "category": "Shop" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Nothing changed
    let (_, pending) = app.get("/api/admin/reviews", Some(&admin)).await;
    assert_eq!(pending.as_array().unwrap().len(), 1);
    let (_, businesses) = app.get("/api/businesses", None).await;
    assert_eq!(businesses.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_review_lifecycle() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let business_id = app.create_business(&admin, "Pizza Palace", "Restaurant", "Downtown").await;
    let (user, user_id) = app.register("john@example.com", "John Doe").await;

    // Client-supplied status and user id are ignored
    let (status, review) = app
        .post(
            "/api/reviews",
            Some(&user),
            json!({
                "businessId": business_id,
                "content": "Amazing crust",
                "qualityRating": 5,
                "serviceRating": 4,
                "valueRating": 4,
                "overallRating": 5,
                "status": "APPROVED",
                "userId": "someone-else"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(review["status"], "PENDING");
    assert_eq!(review["userId"], user_id);
    assert_eq!(review["businessId"], business_id);
    let review_id = review["id"].as_str().unwrap().to_string();

    // Pending reviews are not public
    let (_, detail) = app.get(&format!("/api/businesses/{}", business_id), None).await;
    assert_eq!(detail["reviews"].as_array().unwrap().len(), 0);
    assert_eq!(detail["averageRating"], 0.0);
    assert_eq!(detail["reviewCount"], 0);

    let (status, pending) = app.get("/api/admin/reviews", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    let pending = pending.as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["id"], review_id);
    assert_eq!(pending[0]["user"]["name"], "John Doe");
    assert_eq!(pending[0]["user"]["email"], "john@example.com");
    assert_eq!(pending[0]["business"]["name"], "Pizza Palace");

    let (status, approved) = app.moderate(&admin, &review_id, "APPROVED").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "APPROVED");
    assert_eq!(approved["content"], "Amazing crust");

    let (status, detail) = app.get(&format!("/api/businesses/{}", business_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["name"], "Pizza Palace");
    assert_eq!(detail["averageRating"], 5.0);
    assert_eq!(detail["reviewCount"], 1);
    let reviews = detail["reviews"].as_array().unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0]["id"], review_id);
    assert_eq!(reviews[0]["user"]["name"], "John Doe");
    assert_eq!(reviews[0]["qualityRating"], 5);

    let (_, list) = app.get("/api/businesses", None).await;
    assert_eq!(list[0]["averageRating"], 5.0);
    assert_eq!(list[0]["reviewCount"], 1);

    let (_, pending) = app.get("/api/admin/reviews", Some(&admin)).await;
    assert!(pending.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_average_counts_only_approved_reviews() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let business_id = app.create_business(&admin, "Coffee Corner", "Cafe", "Main Street").await;
    let other_id = app.create_business(&admin, "Tech Repair Shop", "Service", "Tech District").await;
    let (user, _) = app.register("ann@example.com", "Ann").await;

    let first = app.submit_review(&user, &business_id, 5).await;
    let second = app.submit_review(&user, &business_id, 4).await;
    let third = app.submit_review(&user, &business_id, 4).await;
    let rejected = app.submit_review(&user, &business_id, 1).await;
    let _pending = app.submit_review(&user, &business_id, 1).await;
    let other = app.submit_review(&user, &other_id, 2).await;

    for id in [&first, &second, &third, &other] {
        let (status, _) = app.moderate(&admin, id, "APPROVED").await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = app.moderate(&admin, &rejected, "REJECTED").await;
    assert_eq!(status, StatusCode::OK);

    // (5 + 4 + 4) / 3 = 4.33
    let (_, detail) = app.get(&format!("/api/businesses/{}", business_id), None).await;
    assert_eq!(detail["averageRating"], 4.3);
    assert_eq!(detail["reviewCount"], 3);

    // Newest first
    let ids: Vec<&str> = detail["reviews"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![third.as_str(), second.as_str(), first.as_str()]);

    let (_, list) = app.get("/api/businesses", None).await;
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 2);
    let coffee = list.iter().find(|b| b["id"] == business_id.as_str()).unwrap();
    let tech = list.iter().find(|b| b["id"] == other_id.as_str()).unwrap();
    assert_eq!(coffee["averageRating"], 4.3);
    assert_eq!(coffee["reviewCount"], 3);
    assert_eq!(tech["averageRating"], 2.0);
    assert_eq!(tech["reviewCount"], 1);
}

#[tokio::test]
async fn test_moderation_rules() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let business_id = app.create_business(&admin, "Pizza Palace", "Restaurant", "Downtown").await;
    let (user, _) = app.register("ann@example.com", "Ann").await;
    let review_id = app.submit_review(&user, &business_id, 3).await;

    for bad in ["DELETED", "PENDING", ""] {
        let (status, body) = app.moderate(&admin, &review_id, bad).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "status {:?}", bad);
        assert_eq!(body["error"]["code"], "validation_error");
    }

    let (status, _) = app.moderate(&admin, "no-such-review", "APPROVED").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.moderate(&admin, &review_id, "REJECTED").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "REJECTED");

    // Same terminal status again is a no-op
    let (status, body) = app.moderate(&admin, &review_id, "REJECTED").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "REJECTED");

    // Terminal states do not change
    let (status, body) = app.moderate(&admin, &review_id, "APPROVED").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");

    let (_, detail) = app.get(&format!("/api/businesses/{}", business_id), None).await;
    assert_eq!(detail["reviewCount"], 0);
}

#[tokio::test]
async fn test_review_validation() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let business_id = app.create_business(&admin, "Pizza Palace", "Restaurant", "Downtown").await;
    let (user, _) = app.register("ann@example.com", "Ann").await;

    let (status, body) = app
        .post(
            "/api/reviews",
            Some(&user),
            json!({
                "businessId": business_id,
                "content": "",
                "qualityRating": 0,
                "serviceRating": 4,
                "valueRating": 4,
                "overallRating": 6
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let details = &body["error"]["details"];
    assert!(details.get("content").is_some());
    assert!(details.get("qualityRating").is_some());
    assert!(details.get("overallRating").is_some());
    assert!(details.get("serviceRating").is_none());

    let (status, body) = app
        .post(
            "/api/reviews",
            Some(&user),
            json!({
                "businessId": "no-such-business",
                "content": "Where is it?",
                "qualityRating": 3,
                "serviceRating": 3,
                "valueRating": 3,
                "overallRating": 3
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let (_, pending) = app.get("/api/admin/reviews", Some(&admin)).await;
    assert!(pending.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_bodies_use_error_envelope() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let business_id = app.create_business(&admin, "Pizza Palace", "Restaurant", "Downtown").await;
    let (user, _) = app.register("ann@example.com", "Ann").await;

    // overallRating missing
    let (status, body) = app
        .post(
            "/api/reviews",
            Some(&user),
            json!({
                "businessId": business_id,
                "content": "No overall",
                "qualityRating": 3,
                "serviceRating": 3,
                "valueRating": 3
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
    assert!(body["error"]["message"].as_str().unwrap().contains("overallRating"));

    // Fractional rating
    let (status, body) = app
        .post(
            "/api/reviews",
            Some(&user),
            json!({
                "businessId": business_id,
                "content": "Half a star",
                "qualityRating": 3,
                "serviceRating": 3,
                "valueRating": 3,
                "overallRating": 4.5
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");

    let review_id = app.submit_review(&user, &business_id, 4).await;
    let (status, body) = app
        .patch(&format!("/api/admin/reviews/{}", review_id), Some(&admin), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");

    let (status, body) = app.post("/api/register", None, json!({ "email": "bob@example.com" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");

    // Nothing was written by the rejected requests
    let (_, pending) = app.get("/api/admin/reviews", Some(&admin)).await;
    assert_eq!(pending.as_array().unwrap().len(), 1);
    assert_eq!(pending[0]["status"], "PENDING");
}

#[tokio::test]
async fn test_business_filters() {
    let app = TestApp::new().await;
    seed_demo_data(&app.state.db).await.unwrap();

    let names = |body: &Value| -> Vec<String> {
        body.as_array()
            .unwrap()
            .iter()
            .map(|b| b["name"].as_str().unwrap().to_string())
            .collect()
    };

    let (status, all) = app.get("/api/businesses", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 4);

    let (_, body) = app.get("/api/businesses?search=Pizza", None).await;
    assert_eq!(names(&body), vec!["Pizza Palace"]);

    let (_, body) = app.get("/api/businesses?search=pIzZa", None).await;
    assert_eq!(names(&body), vec!["Pizza Palace"]);

    // Matches location too
    let (_, body) = app.get("/api/businesses?search=main%20street", None).await;
    assert_eq!(names(&body), vec!["Coffee Corner"]);

    let (_, body) = app.get("/api/businesses?category=Cafe", None).await;
    assert_eq!(names(&body), vec!["Coffee Corner"]);

    // Category AND (name OR location)
    let (_, body) = app.get("/api/businesses?category=Cafe&search=pizza", None).await;
    assert!(names(&body).is_empty());

    let (_, body) = app.get("/api/businesses?category=Service&search=tech", None).await;
    assert_eq!(names(&body), vec!["Tech Repair Shop"]);

    // Empty filters are ignored
    let (_, body) = app.get("/api/businesses?category=&search=", None).await;
    assert_eq!(body.as_array().unwrap().len(), 4);

    // Category is an exact match
    let (_, body) = app.get("/api/businesses?category=cafe", None).await;
    assert!(names(&body).is_empty());
}

#[tokio::test]
async fn test_unknown_business_is_not_found() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/api/businesses/does-not-exist", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_create_business_rules() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let (status, body) = app
        .post(
            "/api/admin/businesses",
            Some(&admin),
            json!({ "name": "Pizza Palace", "category": "Restaurant" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], "");
    assert_eq!(body["imageUrl"], Value::Null);

    let (status, body) = app
        .post(
            "/api/admin/businesses",
            Some(&admin),
            json!({ "name": "Pizza Palace", "category": "Cafe" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");

    let (status, body) = app
        .post(
            "/api/admin/businesses",
            Some(&admin),
            json!({ "name": " ", "category": "Cafe", "imageUrl": "javascript:alert(1)" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["details"].get("name").is_some());
    assert!(body["error"]["details"].get("imageUrl").is_some());
}

#[tokio::test]
async fn test_me_and_refresh() {
    let app = TestApp::new().await;
    let (token, user_id) = app.register("ann@example.com", "Ann").await;

    let (status, me) = app.get("/api/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], user_id);
    assert_eq!(me["role"], "USER");

    let (status, refreshed) = app.request(Method::POST, "/api/refresh", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(refreshed["user"]["id"], user_id);
    let new_token = refreshed["token"].as_str().unwrap();
    let claims = app.state.tokens.verify(new_token).unwrap();
    assert_eq!(claims.user_id, user_id);

    // A token for a user that no longer exists cannot be refreshed
    let ghost = app.state.tokens.issue("ghost", Role::User).unwrap();
    let (status, _) = app.request(Method::POST, "/api/refresh", Some(&ghost), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
