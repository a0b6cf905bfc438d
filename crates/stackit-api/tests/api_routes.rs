//! Route-level tests through the full middleware stack.

mod common;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use common::{call, config, gateway, gateway_with, get, register, token_for};
use serde_json::json;
use std::net::SocketAddr;
use tower::ServiceExt;
use uuid::Uuid;

async fn ask(router: &axum::Router, token: &str, title: &str, tags: &[&str]) -> String {
    let (status, body) = call(
        router,
        "POST",
        "/api/questions",
        Some(token),
        Some(json!({ "title": title, "description": "Details here", "tags": tags })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_and_metrics() {
    let router = gateway().service.router();

    let (status, body) = get(&router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = get(&router, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_str().unwrap().contains("stackit_requests_total 1"));
}

#[tokio::test]
async fn test_register_validation_and_duplicates() {
    let router = gateway().service.router();

    let (status, body) = call(
        &router,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": "ada", "email": "not-an-email", "password": "123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let params: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["param"].as_str().unwrap())
        .collect();
    assert_eq!(params, vec!["email", "password"]);

    register(&router, "ada").await;
    let (status, body) = call(
        &router,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": "ada", "email": "ada2@example.com", "password": "password1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "User already exists");
}

#[tokio::test]
async fn test_private_routes_require_valid_token() {
    let router = gateway().service.router();
    let body = json!({ "title": "t", "description": "d", "tags": ["x"] });

    let (status, reply) = call(&router, "POST", "/api/questions", None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply["msg"], "No token, authorization denied");

    let (status, reply) = call(
        &router,
        "POST",
        "/api/questions",
        Some("garbage"),
        Some(body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply["msg"], "Token is not valid");

    // Well-signed token for an account that does not exist.
    let ghost = token_for(Uuid::new_v4());
    let (status, reply) = call(&router, "POST", "/api/questions", Some(&ghost), Some(body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply["msg"], "User not authorized");
}

#[tokio::test]
async fn test_bearer_header_is_accepted() {
    let router = gateway().service.router();
    let (id, token) = register(&router, "bearer").await;

    let request = Request::builder()
        .uri("/api/users/me")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let me: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(me["_id"], id.to_string());
    assert!(me.get("passwordHash").is_none());
}

#[tokio::test]
async fn test_question_routes() {
    let router = gateway().service.router();
    let (_, asker) = register(&router, "asker").await;

    let first = ask(&router, &asker, "Borrow checker woes", &["rust"]).await;
    let second = ask(&router, &asker, "Async runtimes", &["rust", "tokio"]).await;

    let (status, list) = get(&router, "/api/questions?tags=tokio").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["_id"], second);

    let (_, list) = get(&router, "/api/questions?sortBy=createdAt&order=asc").await;
    assert_eq!(list[0]["_id"], first);

    let (status, question) = get(&router, &format!("/api/questions/{}", first)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(question["tags"][0]["name"], "rust");
    assert_eq!(question["author"]["username"], "asker");

    let (status, body) = get(&router, "/api/questions/not-an-id").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["msg"], "Question not found");

    let (status, body) = call(
        &router,
        "PUT",
        &format!("/api/questions/{}", first),
        Some(&asker),
        Some(json!({
            "title": "Borrow checker, solved",
            "description": "d",
            "tags": ["rust", "lifetimes"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Borrow checker, solved");
    assert_eq!(body["tags"].as_array().unwrap().len(), 2);

    let (status, body) = call(
        &router,
        "POST",
        "/api/questions",
        Some(&asker),
        Some(json!({ "title": "", "description": "", "tags": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_answer_vote_accept_flow() {
    let router = gateway().service.router();
    let (asker_id, asker) = register(&router, "asker").await;
    let (helper_id, helper) = register(&router, "helper").await;
    let (_, voter) = register(&router, "voter").await;
    let question = ask(&router, &asker, "How do I share state in axum?", &["axum"]).await;

    let (status, answer) = call(
        &router,
        "POST",
        &format!("/api/answers/{}", question),
        Some(&helper),
        Some(json!({ "content": "Use State with an Arc" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let answer_id = answer["_id"].as_str().unwrap().to_string();
    assert_eq!(answer["isAccepted"], false);

    let (status, body) = call(
        &router,
        "PUT",
        &format!("/api/answers/vote/{}/up", answer_id),
        Some(&helper),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "Cannot vote on your own answer");

    let (status, body) = call(
        &router,
        "PUT",
        &format!("/api/answers/vote/{}/sideways", answer_id),
        Some(&voter),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "Invalid vote type");

    let (status, body) = call(
        &router,
        "PUT",
        &format!("/api/answers/vote/{}/up", answer_id),
        Some(&voter),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["upvotes"], 1);

    let (status, body) = call(
        &router,
        "PUT",
        &format!("/api/answers/accept/{}", answer_id),
        Some(&helper),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["msg"], "User not authorized to accept this answer");

    let (status, body) = call(
        &router,
        "PUT",
        &format!("/api/answers/accept/{}", answer_id),
        Some(&asker),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isAccepted"], true);

    let (_, helper_profile) = get(&router, &format!("/api/users/{}", helper_id)).await;
    assert_eq!(helper_profile["reputation"], 25);

    let (status, answers) = get(&router, &format!("/api/answers/{}", question)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(answers[0]["author"]["username"], "helper");

    let (_, asked) = get(&router, &format!("/api/users/{}/questions", asker_id)).await;
    assert_eq!(asked[0]["answersCount"], 1);
    let (_, answered) = get(&router, &format!("/api/users/{}/answers", helper_id)).await;
    assert_eq!(answered[0]["question"]["title"], "How do I share state in axum?");

    let (status, body) = call(
        &router,
        "DELETE",
        &format!("/api/answers/{}", answer_id),
        Some(&helper),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "Answer removed");

    let (_, answers) = get(&router, &format!("/api/answers/{}", question)).await;
    assert!(answers.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_comments_and_notifications() {
    let router = gateway().service.router();
    let (asker_id, asker) = register(&router, "asker").await;
    let (_, helper) = register(&router, "helper").await;
    let (_, reader) = register(&router, "reader").await;
    let question = ask(&router, &asker, "Where do integration tests go?", &["testing"]).await;

    let (status, comment) = call(
        &router,
        "POST",
        &format!("/api/comments/question/{}", question),
        Some(&helper),
        Some(json!({ "content": "In tests/, ask @reader too" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comment["question"], question);
    let comment_id = comment["_id"].as_str().unwrap().to_string();

    let (_, listed) = get(&router, &format!("/api/comments/question/{}", question)).await;
    assert_eq!(listed[0]["author"]["username"], "helper");

    let (status, body) = call(
        &router,
        "POST",
        &format!("/api/comments/answer/{}", Uuid::new_v4()),
        Some(&helper),
        Some(json!({ "content": "orphan" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["msg"], "Answer not found");

    let (status, notifications) =
        call(&router, "GET", "/api/notifications", Some(&asker), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(notifications.as_array().unwrap().len(), 1);
    assert_eq!(notifications[0]["type"], "comment");
    assert_eq!(notifications[0]["recipient"], asker_id.to_string());
    let notification_id = notifications[0]["_id"].as_str().unwrap().to_string();

    let (_, mentions) = call(&router, "GET", "/api/notifications", Some(&reader), None).await;
    assert_eq!(mentions[0]["type"], "mention");
    assert_eq!(
        mentions[0]["message"],
        "helper mentioned you: \"In tests/, ask @reader too...\""
    );

    let (status, _) = call(
        &router,
        "PUT",
        &format!("/api/notifications/mark-read/{}", notification_id),
        Some(&reader),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, marked) = call(
        &router,
        "PUT",
        &format!("/api/notifications/mark-read/{}", notification_id),
        Some(&asker),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(marked["isRead"], true);

    let (status, body) =
        call(&router, "PUT", "/api/notifications/mark-all-read", Some(&reader), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "All notifications marked as read");

    let (status, body) = call(
        &router,
        "DELETE",
        &format!("/api/comments/{}", comment_id),
        Some(&asker),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["msg"], "User not authorized");

    let (status, body) = call(
        &router,
        "DELETE",
        &format!("/api/comments/{}", comment_id),
        Some(&helper),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "Comment removed");

    let (status, body) = call(
        &router,
        "DELETE",
        &format!("/api/questions/{}", question),
        Some(&asker),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "Question removed");
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let router = gateway().service.router();
    let (_, token) = register(&router, "sloppy").await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/questions")
        .header("x-auth-token", &token)
        .header("content-type", "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cors_preflight_allows_client_origin() {
    let router = gateway().service.router();
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/questions")
        .header("origin", "http://localhost:3000")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://localhost:3000"
    );
}

fn from_peer(peer: &str, forwarded_for: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/health");
    if let Some(forwarded) = forwarded_for {
        builder = builder.header("x-forwarded-for", forwarded);
    }
    let mut request = builder.body(Body::empty()).unwrap();
    let addr: SocketAddr = peer.parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

fn tight_limits() -> stackit_api::GatewayConfig {
    let mut config = config();
    config.rate_limit.requests_per_second = 1;
    config.rate_limit.burst_size = 2;
    config
}

#[tokio::test]
async fn test_rate_limit_rejects_burst() {
    let gateway = gateway_with(tight_limits());
    let router = gateway.service.router();

    let mut statuses = Vec::new();
    for _ in 0..3 {
        let response = router
            .clone()
            .oneshot(from_peer("203.0.113.9:50000", None))
            .await
            .unwrap();
        statuses.push(response.status());
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            assert!(response.headers().contains_key("retry-after"));
        }
    }
    assert_eq!(
        statuses,
        vec![StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]
    );

    let metrics = gateway.service.metrics().to_json();
    assert_eq!(metrics["rate_limiting"]["rejected"], 1);
}

#[tokio::test]
async fn test_forwarded_header_cannot_claim_whitelisted_ip() {
    let router = gateway_with(tight_limits()).service.router();

    let mut statuses = Vec::new();
    for _ in 0..5 {
        let request = from_peer("203.0.113.9:50000", Some("127.0.0.1"));
        statuses.push(router.clone().oneshot(request).await.unwrap().status());
    }
    assert_eq!(&statuses[..2], &[StatusCode::OK, StatusCode::OK]);
    assert!(statuses[2..]
        .iter()
        .all(|s| *s == StatusCode::TOO_MANY_REQUESTS));

    // The loopback peer itself stays whitelisted.
    for _ in 0..5 {
        let response = router
            .clone()
            .oneshot(from_peer("127.0.0.1:50001", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_trusted_proxy_header_selects_bucket() {
    let mut config = tight_limits();
    config.rate_limit.trust_proxy_headers = true;
    let router = gateway_with(config).service.router();

    // Two clients behind one proxy get separate buckets.
    for client in ["198.51.100.1", "198.51.100.2"] {
        for _ in 0..2 {
            let request = from_peer("10.0.0.5:443", Some(client));
            let response = router.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }
    let request = from_peer("10.0.0.5:443", Some("198.51.100.1"));
    assert_eq!(
        router.oneshot(request).await.unwrap().status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}
