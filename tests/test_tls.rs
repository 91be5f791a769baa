use std::net::SocketAddr;

use axum::{Json, Router};
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use graylog_mcp::client::GraylogClient;
use graylog_mcp::config::GraylogConfig;
use graylog_mcp::error::GraylogError;
use serde_json::json;

/// Graylog stand-in behind a self-signed certificate.
async fn spawn_self_signed_backend() -> SocketAddr {
    let _ = rustls::crypto::ring::default_provider().install_default();
    let tls = RustlsConfig::from_pem(
        include_bytes!("fixtures/self_signed.crt").to_vec(),
        include_bytes!("fixtures/self_signed.key").to_vec(),
    )
    .await
    .unwrap();
    let app = Router::new().fallback(|| async { Json(json!({"messages": [{"message": {"_id": "tls"}}]})) });

    let handle = Handle::new();
    let server_handle = handle.clone();
    tokio::spawn(async move {
        axum_server::bind_rustls("127.0.0.1:0".parse().unwrap(), tls)
            .handle(server_handle)
            .serve(app.into_make_service())
            .await
            .unwrap();
    });
    handle.listening().await.expect("tls server failed to start")
}

fn client(addr: SocketAddr, ssl_verify: bool) -> GraylogClient {
    let mut cfg = GraylogConfig::new(format!("https://{addr}"), "secret");
    cfg.ssl_verify = ssl_verify;
    cfg.timeout_secs = 5;
    GraylogClient::new(&cfg).unwrap()
}

#[tokio::test]
async fn self_signed_backend_accepted_when_verification_disabled() {
    let addr = spawn_self_signed_backend().await;
    let body = client(addr, false).stream_messages("s", 60, None).await.unwrap();
    assert_eq!(body["messages"][0]["message"]["_id"], json!("tls"));
}

#[tokio::test]
async fn self_signed_backend_rejected_when_verification_enabled() {
    let addr = spawn_self_signed_backend().await;
    let err = client(addr, true).stream_messages("s", 60, None).await.unwrap_err();
    assert!(matches!(err, GraylogError::Http(_)), "{err:?}");
    assert_eq!(err.status(), None);
}
