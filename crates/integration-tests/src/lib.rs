//! Integration tests for the Joestar Peptide API.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process HTTP tests against the memory store
//! cargo test -p joestar-integration-tests
//!
//! # Smoke test against a running server
//! JOESTAR_API_URL=http://localhost:3001 cargo test -p joestar-integration-tests -- --ignored
//! ```
//!
//! [`TestApp`] builds the full router (request ids, tracing and error
//! mapping included, rate limiting off) over a fresh [`MemoryStore`] and
//! drives it with `tower::ServiceExt::oneshot`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use joestar_api::config::{ApiConfig, LogFormat, StoreBackend};
use joestar_api::content::BlogStore;
use joestar_api::db::MemoryStore;
use joestar_api::seed::SeedData;
use joestar_api::state::AppState;

/// Password used for every test account.
pub const TEST_PASSWORD: &str = "peptide-lab-2026";

/// Directory of the API crate (seed files and blog content).
#[must_use]
pub fn api_crate_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../api")
}

/// Configuration for in-process tests.
#[must_use]
pub fn test_config() -> ApiConfig {
    ApiConfig {
        store: StoreBackend::Memory,
        host: [127, 0, 0, 1].into(),
        port: 0,
        jwt_secret: SecretString::from("q7Vt2mXw9LpR4sKd8ZbN3yHc6FgJ1aUe".to_string()),
        token_ttl_hours: 1,
        content_dir: api_crate_dir().join("content"),
        seed_dir: api_crate_dir().join("seed"),
        log_format: LogFormat::Pretty,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// A decoded response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// The `message` field of the body, or "".
    #[must_use]
    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }
}

/// A registered test account.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: i64,
    pub email: String,
    pub token: String,
    pub redeem_code: String,
}

/// The API router over a memory store.
pub struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
}

impl TestApp {
    /// Empty store, no blog posts.
    #[must_use]
    pub fn new() -> Self {
        Self::with_blog(BlogStore::default())
    }

    /// Store loaded from the shipped seed files, blog loaded from content.
    ///
    /// # Panics
    ///
    /// Panics if the seed files or blog content fail to load.
    pub async fn seeded() -> Self {
        let config = test_config();
        let blog = BlogStore::load(&config.content_dir).expect("Failed to load blog content");
        let app = Self::with_blog(blog);

        SeedData::load(&config.seed_dir)
            .await
            .expect("Failed to read seed data")
            .apply(app.store.as_ref())
            .await
            .expect("Failed to apply seed data");
        app
    }

    fn with_blog(blog: BlogStore) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(test_config(), store.clone(), blog);
        Self {
            router: joestar_api::app(state, false),
            store,
        }
    }

    /// Direct access to the store for fixtures.
    #[must_use]
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Send a request and decode the JSON body (`Null` when empty).
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body is not JSON.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        self.send_request(request).await
    }

    /// Send a prepared request.
    ///
    /// # Panics
    ///
    /// Panics if the router fails or the body is not JSON.
    pub async fn send_request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Response body is not JSON")
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(Method::DELETE, uri, token, None).await
    }

    /// Register an account, optionally referred by `referral_code`.
    ///
    /// # Panics
    ///
    /// Panics if registration does not return 201.
    pub async fn register(&self, name: &str, referral_code: Option<&str>) -> TestUser {
        let email = format!("{}-{}@example.com", name.to_lowercase(), uuid::Uuid::new_v4());
        let response = self
            .post(
                "/api/auth/register",
                None,
                json!({
                    "name": name,
                    "email": email,
                    "password": TEST_PASSWORD,
                    "referralCode": referral_code,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);

        TestUser {
            id: response.body["user"]["id"].as_i64().expect("user id"),
            email,
            token: response.body["token"].as_str().expect("token").to_string(),
            redeem_code: response.body["redeemCode"]
                .as_str()
                .expect("redeem code")
                .to_string(),
        }
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a money field, which serializes as a string.
///
/// # Panics
///
/// Panics if the value is not a decimal string or number.
#[must_use]
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("expected a decimal, got {other}"),
    }
}

/// Build a catalog product for fixtures.
///
/// # Panics
///
/// Panics if the fields do not form a valid product.
#[must_use]
pub fn product(id: &str, name: &str, price: i64, in_stock: bool) -> joestar_core::catalog::Product {
    serde_json::from_value(json!({
        "id": id,
        "name": name,
        "category": "research",
        "price": price.to_string(),
        "inStock": in_stock,
    }))
    .expect("valid product fixture")
}

/// Build a discount code for fixtures.
///
/// # Panics
///
/// Panics if the fields do not form a valid discount code.
#[must_use]
pub fn discount_code(
    code: &str,
    kind: &str,
    discount: i64,
    max_uses: i32,
) -> joestar_core::discount::DiscountCode {
    serde_json::from_value(json!({
        "id": code.to_lowercase(),
        "code": code,
        "discount": discount.to_string(),
        "type": kind,
        "maxUses": max_uses,
    }))
    .expect("valid discount fixture")
}
