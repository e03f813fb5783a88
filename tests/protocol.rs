//! End-to-end protocol tests against an in-process RouterOS fake

mod common;

use std::sync::{Arc, Mutex};

use common::{FakeRouter, RouterBehavior};
use routeros_client::{ApiError, Client, ClientConfig, ReplyValue, TelemetryEvent, TelemetryHook};

#[tokio::test]
async fn test_plain_login_and_typed_reply() {
    let router = FakeRouter::spawn(RouterBehavior::default()).await;
    let client = Client::connect(router.config()).await.unwrap();
    assert_eq!(router.login_count(), 1);

    let rows = client.command(&["/interface/print"]).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][".id"], ReplyValue::Text("*1".to_string()));
    assert_eq!(rows[0]["name"], ReplyValue::Text("ether1".to_string()));
    assert_eq!(rows[0]["running"], ReplyValue::Bool(true));
    assert_eq!(rows[1]["running"], ReplyValue::Bool(false));

    client.close().await;
}

#[tokio::test]
async fn test_md5_fallback_login() {
    let router = FakeRouter::spawn(RouterBehavior {
        require_md5: true,
        ..RouterBehavior::default()
    })
    .await;

    let client = Client::connect(router.config()).await.unwrap();
    assert_eq!(router.login_count(), 1);

    let rows = client.command(&["/interface/print"]).await.unwrap();
    assert_eq!(rows.len(), 2);
    client.close().await;
}

#[tokio::test]
async fn test_rejected_login_is_auth_failed() {
    let router = FakeRouter::spawn(RouterBehavior {
        reject_logins: true,
        ..RouterBehavior::default()
    })
    .await;

    let err = Client::connect(router.config()).await.unwrap_err();
    match err {
        ApiError::AuthFailed(message) => {
            assert_eq!(message, "invalid user name or password (6)");
        }
        other => panic!("expected auth_failed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_wrong_password_is_auth_failed() {
    let router = FakeRouter::spawn(RouterBehavior::default()).await;
    let mut config = router.config();
    config.password = secrecy::SecretString::new("wrong".to_string().into_boxed_str());

    let err = Client::connect(config).await.unwrap_err();
    assert_eq!(err.kind(), "auth_failed");
}

#[tokio::test]
async fn test_trap_keeps_session_usable() {
    let router = FakeRouter::spawn(RouterBehavior::default()).await;
    let client = Client::connect(router.config()).await.unwrap();

    let err = client.command(&["/trap"]).await.unwrap_err();
    match err {
        ApiError::Trap { message, details } => {
            assert_eq!(message, "no such item");
            assert_eq!(details["category"], "2");
        }
        other => panic!("expected trap, got {other:?}"),
    }

    assert!(client.is_alive().await);
    let rows = client.command(&["/interface/print"]).await.unwrap();
    assert_eq!(rows.len(), 2);
    client.close().await;
}

#[tokio::test]
async fn test_fatal_closes_session() {
    let router = FakeRouter::spawn(RouterBehavior::default()).await;
    let client = Client::connect(router.config()).await.unwrap();

    // The fake sends the reason as a bare word, as RouterOS does; the
    // parsed message falls back to the default since no `=message=` is
    // present.
    let err = client.command(&["/fatal"]).await.unwrap_err();
    match err {
        ApiError::Fatal { message } => assert_eq!(message, "Unknown error"),
        other => panic!("expected fatal, got {other:?}"),
    }

    assert!(!client.is_alive().await);
    let err = client.command(&["/interface/print"]).await.unwrap_err();
    assert_eq!(err.kind(), "closed");
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let router = FakeRouter::spawn(RouterBehavior::default()).await;
    let client = Client::connect(router.config()).await.unwrap();

    client.close().await;
    client.close().await;

    let err = client.command(&["/interface/print"]).await.unwrap_err();
    assert_eq!(err.kind(), "closed");
}

#[tokio::test]
async fn test_cloned_handles_share_one_connection() {
    let router = FakeRouter::spawn(RouterBehavior::default()).await;
    let client = Client::connect(router.config()).await.unwrap();
    let clone = client.clone();

    clone.command(&["/interface/print"]).await.unwrap();
    assert_eq!(router.login_count(), 1);

    client.close().await;
    let err = clone.command(&["/interface/print"]).await.unwrap_err();
    assert_eq!(err.kind(), "closed");
}

#[tokio::test]
async fn test_connect_plain_overrides_tls_port() {
    let router = FakeRouter::spawn(RouterBehavior::default()).await;
    let mut config = router.config();
    // Pretend the port implies TLS; connect_plain must override it.
    config.tls = None;
    let client = Client::connect_plain(config).await.unwrap();
    let rows = client.command(&["/interface/print"]).await.unwrap();
    assert_eq!(rows.len(), 2);
    client.close().await;
}

#[derive(Default)]
struct Recorder(Mutex<Vec<&'static str>>);

impl Recorder {
    fn names(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().clone()
    }
}

impl TelemetryHook for Recorder {
    fn emit(&self, event: TelemetryEvent) {
        let name = match event {
            TelemetryEvent::ConnectionStart { .. } => "connection.start",
            TelemetryEvent::ConnectionStop { .. } => "connection.stop",
            TelemetryEvent::ConnectionException { .. } => "connection.exception",
            TelemetryEvent::CommandStart { .. } => "command.start",
            TelemetryEvent::CommandStop { .. } => "command.stop",
            TelemetryEvent::CommandException { .. } => "command.exception",
            TelemetryEvent::PoolCheckout { .. } => "pool.checkout",
            TelemetryEvent::PoolCheckin { .. } => "pool.checkin",
            _ => "unknown",
        };
        self.0.lock().unwrap().push(name);
    }
}

#[tokio::test]
async fn test_telemetry_event_flow() {
    let router = FakeRouter::spawn(RouterBehavior::default()).await;
    let recorder = Arc::new(Recorder::default());

    let client = Client::connect_with_telemetry(router.config(), recorder.clone())
        .await
        .unwrap();
    client.command(&["/interface/print"]).await.unwrap();
    client.close().await;

    assert_eq!(
        recorder.names(),
        vec![
            "connection.start",
            "command.start",
            "command.stop",
            "connection.stop",
        ]
    );
}

#[tokio::test]
async fn test_telemetry_connection_exception() {
    let recorder = Arc::new(Recorder::default());
    let mut config = ClientConfig::new("127.0.0.1", "admin", "secret");
    config.port = Some(1);
    config.tls = Some(false);

    let _ = Client::connect_with_telemetry(config, recorder.clone())
        .await
        .unwrap_err();

    assert_eq!(
        recorder.names(),
        vec!["connection.start", "connection.exception"]
    );
}

#[tokio::test]
async fn test_telemetry_command_exception_on_trap() {
    let router = FakeRouter::spawn(RouterBehavior::default()).await;
    let recorder = Arc::new(Recorder::default());

    let client = Client::connect_with_telemetry(router.config(), recorder.clone())
        .await
        .unwrap();
    let _ = client.command(&["/trap"]).await.unwrap_err();

    assert_eq!(
        recorder.names(),
        vec!["connection.start", "command.start", "command.exception"]
    );
    client.close().await;
}
