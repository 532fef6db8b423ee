//! HTTP registry 客户端测试（wiremock）

use push_link::{
    DevicePlatform, HttpRegistry, HttpRegistryConfig, PushToken, RegistrySynchronizer,
    RetryPolicy, Session, SyncResult,
};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn synchronizer(api_url: &str, retry: RetryPolicy) -> RegistrySynchronizer {
    let registry = HttpRegistry::new(HttpRegistryConfig {
        api_url: api_url.to_string(),
        timeout_secs: 5,
        retry,
    })
    .unwrap();
    RegistrySynchronizer::new(Arc::new(registry))
}

fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        initial_backoff_ms: 1,
        max_backoff_ms: 5,
        backoff_multiplier: 2.0,
    }
}

#[tokio::test]
async fn test_register_posts_token_with_bearer_credential() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/push-tokens"))
        .and(header("authorization", "Bearer cred-1"))
        .and(body_json(json!({"token": "ExponentPushToken[abc]", "platform": "android"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let sync = synchronizer(&server.uri(), RetryPolicy::default());
    let token = PushToken::new("ExponentPushToken[abc]", DevicePlatform::Android);

    let result = sync.register(Some(&Session::new("u1", "cred-1")), &token).await;
    assert_eq!(result, SyncResult::Synced);
}

#[tokio::test]
async fn test_repeated_register_sends_identical_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/push-tokens"))
        .and(header("authorization", "Bearer cred-1"))
        .and(body_json(json!({"token": "tok", "platform": "ios"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let sync = synchronizer(&server.uri(), RetryPolicy::default());
    let session = Session::new("u1", "cred-1");
    let token = PushToken::new("tok", DevicePlatform::Ios);

    assert_eq!(sync.register(Some(&session), &token).await, SyncResult::Synced);
    assert_eq!(sync.register(Some(&session), &token).await, SyncResult::Synced);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].body, requests[1].body);
}

#[tokio::test]
async fn test_api_url_trailing_slash_is_tolerated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/push-tokens"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let sync = synchronizer(&format!("{}/", server.uri()), RetryPolicy::default());
    let token = PushToken::new("tok", DevicePlatform::Ios);

    assert_eq!(sync.register(Some(&Session::new("u1", "cred")), &token).await, SyncResult::Synced);
}

#[tokio::test]
async fn test_deregister_sends_delete_with_token() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/push-tokens"))
        .and(header("authorization", "Bearer cred-1"))
        .and(body_json(json!({"token": "tok"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let sync = synchronizer(&server.uri(), RetryPolicy::default());
    let result = sync.deregister(Some(&Session::new("u1", "cred-1")), "tok").await;
    assert_eq!(result, SyncResult::Synced);
}

#[tokio::test]
async fn test_deregister_missing_record_counts_as_synced() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/push-tokens"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let sync = synchronizer(&server.uri(), RetryPolicy::default());
    let result = sync.deregister(Some(&Session::new("u1", "cred")), "unknown").await;
    assert_eq!(result, SyncResult::Synced);
}

#[tokio::test]
async fn test_register_404_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let sync = synchronizer(&server.uri(), RetryPolicy::default());
    let token = PushToken::new("tok", DevicePlatform::Ios);

    let result = sync.register(Some(&Session::new("u1", "cred")), &token).await;
    assert!(matches!(result, SyncResult::Failed(reason) if reason.contains("404")));
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .expect(1)
        .mount(&server)
        .await;

    let sync = synchronizer(&server.uri(), fast_retry(3));
    let token = PushToken::new("tok", DevicePlatform::Ios);

    let result = sync.register(Some(&Session::new("u1", "stale")), &token).await;
    match result {
        SyncResult::Failed(reason) => {
            assert!(reason.contains("401"));
            assert!(reason.contains("Unauthorized"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_not_retried_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let sync = synchronizer(&server.uri(), RetryPolicy::default());
    let token = PushToken::new("tok", DevicePlatform::Ios);

    let result = sync.register(Some(&Session::new("u1", "cred")), &token).await;
    assert!(matches!(result, SyncResult::Failed(_)));
}

#[tokio::test]
async fn test_server_error_retried_up_to_policy_limit() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let sync = synchronizer(&server.uri(), fast_retry(2));

    let result = sync.deregister(Some(&Session::new("u1", "cred")), "tok").await;
    assert!(matches!(result, SyncResult::Failed(reason) if reason.contains("500")));
}

#[tokio::test]
async fn test_no_session_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let sync = synchronizer(&server.uri(), RetryPolicy::default());
    let token = PushToken::new("tok", DevicePlatform::Ios);

    assert!(matches!(sync.register(None, &token).await, SyncResult::Skipped(_)));
    assert!(matches!(
        sync.register(Some(&Session::new("u1", "")), &token).await,
        SyncResult::Skipped(_)
    ));
}

#[tokio::test]
async fn test_unreachable_server_fails_quietly() {
    // 占用一个临时端口后立即释放，保证没有服务在监听
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let sync = synchronizer(&format!("http://127.0.0.1:{}", port), fast_retry(1));
    let token = PushToken::new("tok", DevicePlatform::Ios);

    let result = sync.register(Some(&Session::new("u1", "cred")), &token).await;
    assert!(matches!(result, SyncResult::Failed(_)));
}

#[test]
fn test_invalid_api_url_rejected() {
    let result = HttpRegistry::new(HttpRegistryConfig {
        api_url: "not a url".to_string(),
        ..HttpRegistryConfig::default()
    });
    assert!(result.is_err());
}
