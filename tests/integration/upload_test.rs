//! Upload session HTTP flow tests.

use axum::body::Body;
use http::StatusCode;
use serde_json::json;

use uploadhub_core::types::{ActorId, ScopeId};

use crate::helpers::{PNG_MAGIC, TestApp, png_payload, session_uri, sessions_uri};

#[tokio::test]
async fn test_out_of_order_upload_then_idempotent_complete() {
    let app = TestApp::new().await;
    let (actor, scope) = app.member();
    let payload = png_payload();
    let session = app.create_session(actor, scope, 16).await;

    let res = app.put_chunk(actor, scope, &session, 1, &payload[8..]).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["uploaded_chunks"], json!([1]));

    let res = app.put_chunk(actor, scope, &session, 0, &payload[..8]).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["uploaded_chunks"], json!([0, 1]));

    let complete_uri = format!("{}/complete", session_uri(scope, &session));
    let first = app
        .send("POST", &complete_uri, Some(actor), Body::empty(), None)
        .await;
    assert_eq!(first.status, StatusCode::OK, "{}", first.body);
    assert_eq!(first.body["success"], json!(true));
    assert_eq!(first.body["data"]["status"], json!("completed"));
    let reference = first.body["data"]["file_reference"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(reference.starts_with(&format!("/api/scopes/{scope}/files/")));
    assert!(reference.ends_with(".png"));

    let second = app
        .send("POST", &complete_uri, Some(actor), Body::empty(), None)
        .await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.body["data"]["file_reference"], json!(reference));

    let scope_dir = app.config.blob.root_path.join(scope.to_string());
    let mut entries = std::fs::read_dir(&scope_dir).unwrap();
    let stored = entries.next().unwrap().unwrap().path();
    assert!(entries.next().is_none(), "exactly one stored blob");
    assert_eq!(std::fs::read(stored).unwrap(), payload);

    let session_id = session.parse().unwrap();
    assert!(!app.stack.chunks.session_dir(session_id).exists());

    let metrics = app
        .send("GET", "/api/uploads/metrics", None, Body::empty(), None)
        .await;
    assert_eq!(metrics.body["data"]["sessions_completed"], json!(1));
    assert_eq!(metrics.body["data"]["chunks_uploaded"], json!(2));
}

#[tokio::test]
async fn test_missing_or_malformed_actor_is_unauthorized() {
    let app = TestApp::new().await;
    let (_, scope) = app.member();

    let res = app
        .send("GET", &session_uri(scope, &ActorId::new().to_string()), None, Body::empty(), None)
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"], json!("UNAUTHORIZED"));

    let request = http::Request::builder()
        .method("GET")
        .uri(session_uri(scope, &ActorId::new().to_string()))
        .header("x-actor-id", "not-a-uuid")
        .body(Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_validation_errors() {
    let app = TestApp::new().await;
    let (actor, scope) = app.member();

    for body in [
        json!({ "content_type": "image/png", "total_size_bytes": 0 }),
        json!({ "content_type": "image/png", "total_size_bytes": 4096 }),
        json!({ "content_type": "image/png", "total_size_bytes": 16, "chunk_size_bytes": 128 }),
        json!({ "content_type": "application/zip", "total_size_bytes": 16 }),
        json!({ "content_type": "", "total_size_bytes": 16 }),
        json!({ "total_size_bytes": 16 }),
    ] {
        let res = app.post_json(&sessions_uri(scope), actor, body.clone()).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(res.body["error"], json!("VALIDATION_ERROR"));
    }
}

#[tokio::test]
async fn test_chunk_size_mismatch_is_rejected() {
    let app = TestApp::new().await;
    let (actor, scope) = app.member();
    let session = app.create_session(actor, scope, 12).await;

    let res = app.put_chunk(actor, scope, &session, 1, b"CCCCCCCC").await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app.put_chunk(actor, scope, &session, 2, b"CCCC").await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app.put_chunk(actor, scope, &session, 1, b"CCCC").await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_chunk_over_body_limit_is_refused() {
    let app = TestApp::new().await;
    let (actor, scope) = app.member();
    let session = app.create_session(actor, scope, 16).await;

    let res = app.put_chunk(actor, scope, &session, 0, &[0u8; 65]).await;
    assert_eq!(res.status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_quota_and_cancel() {
    let app = TestApp::new().await;
    let (actor, scope) = app.member();

    let first = app.create_session(actor, scope, 16).await;
    app.create_session(actor, scope, 16).await;
    app.create_session(actor, scope, 16).await;

    let res = app
        .post_json(
            &sessions_uri(scope),
            actor,
            json!({ "content_type": "image/png", "total_size_bytes": 16 }),
        )
        .await;
    assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(res.body["error"], json!("QUOTA_EXCEEDED"));

    let res = app
        .send("DELETE", &session_uri(scope, &first), Some(actor), Body::empty(), None)
        .await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);

    let res = app
        .send("DELETE", &session_uri(scope, &first), Some(actor), Body::empty(), None)
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.body["error"], json!("PRECONDITION_FAILED"));

    let res = app
        .send("GET", &session_uri(scope, &first), Some(actor), Body::empty(), None)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["status"], json!("cancelled"));

    app.create_session(actor, scope, 16).await;
}

#[tokio::test]
async fn test_cross_scope_access_is_refused() {
    let app = TestApp::new().await;
    let (actor, scope) = app.member();
    let session = app.create_session(actor, scope, 16).await;

    let other_scope = ScopeId::new();
    app.directory.add_member(other_scope, actor);

    let res = app
        .send("GET", &session_uri(other_scope, &session), Some(actor), Body::empty(), None)
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = app.put_chunk(actor, other_scope, &session, 0, &PNG_MAGIC).await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = app
        .send("DELETE", &session_uri(other_scope, &session), Some(actor), Body::empty(), None)
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let outsider = ActorId::new();
    let res = app
        .send("GET", &session_uri(scope, &session), Some(outsider), Body::empty(), None)
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = app
        .send("GET", &session_uri(scope, &session), Some(actor), Body::empty(), None)
        .await;
    assert_eq!(res.body["data"]["status"], json!("active"));
    assert_eq!(res.body["data"]["uploaded_chunks"], json!([]));
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let app = TestApp::new().await;
    let (actor, scope) = app.member();
    let res = app
        .send(
            "GET",
            &session_uri(scope, &ActorId::new().to_string()),
            Some(actor),
            Body::empty(),
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_content_that_does_not_match_declared_type_keeps_session_active() {
    let app = TestApp::new().await;
    let (actor, scope) = app.member();
    let session = app.create_session(actor, scope, 8).await;

    let res = app.put_chunk(actor, scope, &session, 0, b"GIF89a!!").await;
    assert_eq!(res.status, StatusCode::OK);

    let res = app
        .send(
            "POST",
            &format!("{}/complete", session_uri(scope, &session)),
            Some(actor),
            Body::empty(),
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .send("GET", &session_uri(scope, &session), Some(actor), Body::empty(), None)
        .await;
    assert_eq!(res.body["data"]["status"], json!("active"));
    assert_eq!(res.body["data"]["uploaded_chunks"], json!([0]));
}

#[tokio::test]
async fn test_health_reports_store() {
    let app = TestApp::new().await;
    let res = app.send("GET", "/api/health", None, Body::empty(), None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["status"], json!("ok"));
    assert_eq!(res.body["data"]["store"], json!("memory"));
}

#[tokio::test]
async fn test_malformed_path_segments_use_error_body() {
    let app = TestApp::new().await;
    let (actor, scope) = app.member();
    let session = app.create_session(actor, scope, 16).await;

    let uris = [
        session_uri(scope, "not-a-uuid"),
        format!("{}/chunks/first", session_uri(scope, &session)),
        format!("{}/chunks/99999999999", session_uri(scope, &session)),
        format!("/api/scopes/nope/uploads/sessions/{session}"),
    ];
    for uri in uris {
        let method = if uri.contains("/chunks/") { "PUT" } else { "GET" };
        let res = app
            .send(method, &uri, Some(actor), Body::from(&b"AAAAAAAA"[..]), None)
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(res.body["error"], json!("VALIDATION_ERROR"), "{uri}");
    }
}
