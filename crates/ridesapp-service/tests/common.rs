//! Common test utilities for ridesapp integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use axum_test::TestServer;
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use ridesapp_service::{create_router, AppState, ServiceConfig};
use ridesapp_store::MemoryStore;

/// Password used for every test account.
pub const PASSWORD: &str = "correct-horse-battery";

/// A registered user and their session token.
pub struct Session {
    /// User ID as returned by the API.
    pub user_id: String,
    /// Bearer token.
    pub token: String,
}

impl Session {
    /// The `Authorization` header for this session.
    pub fn auth(&self) -> (HeaderName, HeaderValue) {
        bearer(&self.token)
    }
}

/// Build an `Authorization: Bearer` header.
pub fn bearer(token: &str) -> (HeaderName, HeaderValue) {
    (
        axum::http::header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).expect("valid header value"),
    )
}

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The backing store, for assertions that bypass the API.
    pub store: Arc<MemoryStore>,
}

impl TestHarness {
    /// Create a new test harness over a fresh in-memory store.
    pub fn new() -> Self {
        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            jwt_secret: "integration-test-secret".into(),
            ..ServiceConfig::default()
        };

        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self { server, store }
    }

    /// Register a user with `role` and return their session.
    pub async fn register(&self, email: &str, role: &str) -> Session {
        let response = self
            .server
            .post("/api/v1/auth/register")
            .json(&json!({
                "email": email,
                "password": PASSWORD,
                "first_name": "Test",
                "last_name": role,
                "phone": "+15550100",
                "role": role,
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);

        let body: Value = response.json();
        Session {
            user_id: body["user"]["id"].as_str().expect("user id").to_string(),
            token: body["token"].as_str().expect("token").to_string(),
        }
    }

    /// Create a shared ride for `rider` with `seats` seats; returns its ID.
    pub async fn shared_ride(&self, rider: &Session, seats: i32) -> String {
        let (name, value) = rider.auth();
        let response = self
            .server
            .post("/api/v1/rides")
            .add_header(name, value)
            .json(&shared_ride_body(seats))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);

        let body: Value = response.json();
        body["id"].as_str().expect("ride id").to_string()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Request body for a shared ride departing in an hour.
pub fn shared_ride_body(seats: i32) -> Value {
    json!({
        "ride_type": "shared",
        "pickup": { "lat": 52.52, "lng": 13.405, "address": "Alexanderplatz" },
        "dropoff": { "lat": 52.36, "lng": 13.50, "address": "BER Airport" },
        "price_cents": 1500,
        "distance_km": 27.0,
        "duration_minutes": 35,
        "seats_available": seats,
        "departure_time": (Utc::now() + Duration::hours(1)).to_rfc3339(),
        "payment_method": "card",
    })
}

/// Request body for an on-demand ride.
pub fn on_demand_ride_body() -> Value {
    json!({
        "ride_type": "on_demand",
        "pickup": { "lat": 52.52, "lng": 13.405, "address": "Alexanderplatz" },
        "dropoff": { "lat": 52.50, "lng": 13.37, "address": "Potsdamer Platz" },
        "price_cents": 900,
        "distance_km": 4.2,
        "duration_minutes": 12,
        "payment_method": "cash",
    })
}
