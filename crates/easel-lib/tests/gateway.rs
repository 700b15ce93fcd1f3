use easel_lib::api::{NotificationGateway, SessionState};
use easel_lib::auth::{
    Credential, CredentialStore, MemoryCredentialStore, ACCESS_TOKEN_KEY, LEGACY_TOKEN_KEY,
};
use easel_lib::config::ClientConfig;
use easel_lib::error::GatewayError;
use easel_lib::models::{NotificationId, NotificationKind};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway_for(server: &MockServer, store: Arc<MemoryCredentialStore>) -> NotificationGateway {
    let config = ClientConfig {
        api_url: server.uri(),
        ..Default::default()
    };
    NotificationGateway::new(&config, store).expect("gateway")
}

fn logged_in() -> Arc<MemoryCredentialStore> {
    Arc::new(MemoryCredentialStore::with_credential("tok-123"))
}

#[tokio::test]
async fn test_fetch_notifications_sends_bearer_and_paging() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications/with-details"))
        .and(query_param("limit", "50"))
        .and(query_param("offset", "0"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "notifications": [
                {
                    "id": 7,
                    "type": "post_reaction",
                    "message": "ana liked your sketch",
                    "timestamp": "2024-03-20T11:58:00Z",
                    "is_read": false,
                    "username": "ana"
                },
                {
                    "id": 6,
                    "type": "follow",
                    "message": "jun started following you",
                    "timestamp": "2024-03-19T08:00:00Z",
                    "is_read": true
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, logged_in());
    let items = gateway.fetch_notifications_default().await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, NotificationId::from(7));
    assert_eq!(items[0].kind, NotificationKind::Reaction);
    assert_eq!(items[0].username.as_deref(), Some("ana"));
    assert!(items[1].is_read);
}

#[tokio::test]
async fn test_missing_credential_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, Arc::new(MemoryCredentialStore::new()));

    assert!(gateway.fetch_notifications(50, 0).await.is_empty());
    let err = assert_err!(gateway.fetch_unread_count().await);
    assert!(matches!(err, GatewayError::MissingCredential));
    assert!(!gateway.mark_all_as_read().await);
}

#[tokio::test]
async fn test_list_server_error_is_soft_but_visible_on_side_channel() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications/with-details"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, logged_in());

    assert!(gateway.fetch_notifications(50, 0).await.is_empty());
    match gateway.try_fetch_notifications(50, 0).await {
        Err(GatewayError::Status { status, body }) => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unread_count() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications/unread-count"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unread_count": 4 })))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, logged_in());
    assert_eq!(assert_ok!(gateway.fetch_unread_count().await), 4);
}

#[tokio::test]
async fn test_malformed_count_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications/unread-count"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, logged_in());
    let err = assert_err!(gateway.fetch_unread_count().await);
    assert!(matches!(err, GatewayError::Decode(_)));
}

#[tokio::test]
async fn test_unauthorized_clears_credential_and_expires_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications/unread-count"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "detail": "expired" })))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::new());
    store.insert_raw(ACCESS_TOKEN_KEY, "stale");
    store.insert_raw(LEGACY_TOKEN_KEY, "stale");
    let gateway = gateway_for(&server, store.clone());
    let mut session = gateway.subscribe_session();

    let err = assert_err!(gateway.fetch_unread_count().await);
    assert!(err.is_session_ending());

    assert!(!store.contains_key(ACCESS_TOKEN_KEY));
    assert!(!store.contains_key(LEGACY_TOKEN_KEY));
    assert!(store.get().is_none());

    assert_ok!(session.changed().await);
    assert_eq!(*session.borrow(), SessionState::Expired);
}

#[tokio::test]
async fn test_new_login_reactivates_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications/unread-count"))
        .and(header("authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/notifications/unread-count"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unread_count": 0 })))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::with_credential("old"));
    let gateway = gateway_for(&server, store.clone());

    assert_err!(gateway.fetch_unread_count().await);
    assert_eq!(gateway.session_state(), SessionState::Expired);

    assert_ok!(store.set(Credential::new("fresh")));
    assert_ok!(gateway.fetch_unread_count().await);
    assert_eq!(gateway.session_state(), SessionState::Active);
}

#[tokio::test]
async fn test_mark_read_encodes_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/notifications/a%2Fb/mark-read"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Notification marked as read"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/notifications/42/mark-read"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, logged_in());

    let ack = assert_ok!(gateway.try_mark_as_read(&NotificationId::from("a/b")).await);
    assert_eq!(ack.message.as_deref(), Some("Notification marked as read"));
    assert!(gateway.mark_as_read(&NotificationId::from(42)).await);
}

#[tokio::test]
async fn test_mark_all_ack_handling() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/notifications/mark-all-read"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "All notifications marked as read"
        })))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/notifications/mark-all-read"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "nothing to do"
        })))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, logged_in());

    // idempotent on the server
    assert!(gateway.mark_all_as_read().await);
    assert!(gateway.mark_all_as_read().await);

    let err = assert_err!(gateway.try_mark_all_as_read().await);
    assert!(matches!(err, GatewayError::Rejected { .. }));
}

#[tokio::test]
async fn test_late_success_does_not_revive_expired_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications/with-details"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "notifications": [] }))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/notifications/unread-count"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let store = logged_in();
    let gateway = Arc::new(gateway_for(&server, store.clone()));

    // list request goes out with the soon-to-expire token
    let slow_list = tokio::spawn({
        let gateway = gateway.clone();
        async move { gateway.try_fetch_notifications(50, 0).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_err!(gateway.fetch_unread_count().await);
    assert_eq!(gateway.session_state(), SessionState::Expired);

    assert_ok!(slow_list.await.expect("list task"));
    assert_eq!(gateway.session_state(), SessionState::Expired);
    assert!(store.get().is_none());
}

#[tokio::test]
async fn test_stale_unauthorized_keeps_newer_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications/unread-count"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(300)))
        .mount(&server)
        .await;

    let store = logged_in();
    let gateway = Arc::new(gateway_for(&server, store.clone()));
    let mut session = gateway.subscribe_session();

    let stale = tokio::spawn({
        let gateway = gateway.clone();
        async move { gateway.fetch_unread_count().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_ok!(store.set(Credential::new("fresh")));

    let err = assert_err!(stale.await.expect("count task"));
    assert!(!err.is_session_ending());
    assert_eq!(err.status().map(|s| s.as_u16()), Some(401));

    assert_eq!(store.get(), Some(Credential::new("fresh")));
    assert_eq!(gateway.session_state(), SessionState::Active);
    assert!(!session.has_changed().expect("gateway alive"));
}
