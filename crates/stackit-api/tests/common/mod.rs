//! Shared fixtures for gateway integration tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use stackit_api::{
    ApiGatewayService, Claims, GatewayConfig, GatewayMetrics, NotificationHub, TokenUser,
};
use stackit_forum::{ForumService, InMemoryKVStore, SystemTimeSource};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub const SECRET: &str = "integration-secret";

pub struct TestGateway {
    pub service: ApiGatewayService,
    pub forum: Arc<ForumService>,
    pub hub: Arc<NotificationHub>,
}

pub fn config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.auth.jwt_secret = SECRET.to_string();
    config
}

pub fn gateway_with(config: GatewayConfig) -> TestGateway {
    let metrics = Arc::new(GatewayMetrics::new());
    let hub = Arc::new(NotificationHub::new(
        config.websocket.room_buffer,
        Arc::clone(&metrics),
    ));
    let forum = Arc::new(ForumService::new(
        Box::new(InMemoryKVStore::new()),
        Arc::new(SystemTimeSource),
        hub.clone(),
    ));
    let service = ApiGatewayService::new(config, Arc::clone(&forum), Arc::clone(&hub), metrics)
        .expect("valid config");
    TestGateway {
        service,
        forum,
        hub,
    }
}

pub fn gateway() -> TestGateway {
    gateway_with(config())
}

/// Token as the identity provider would mint it.
pub fn token_for(user: Uuid) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        user: TokenUser { id: user },
        iat: now,
        exp: now + 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("token encodes")
}

/// Send one request through the router and decode the JSON reply.
pub async fn call(
    router: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("x-auth-token", token);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, json)
}

/// Unauthenticated GET.
pub async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    call(router, "GET", uri, None, None).await
}

/// Register through the API and return (id, token).
pub async fn register(router: &Router, username: &str) -> (Uuid, String) {
    let (status, body) = call(
        router,
        "POST",
        "/api/auth/register",
        None,
        Some(serde_json::json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "password1",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register failed: {}", body);
    let id: Uuid = body["_id"].as_str().unwrap().parse().unwrap();
    (id, token_for(id))
}
