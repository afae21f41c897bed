use breatheasy::{models::SessionPhase, test_helpers::wait_for_snapshot};

use crate::helpers::TestServer;

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let server = TestServer::new().await;
    let response = server.get("/health").await;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    server.cleanup().await;
}

#[tokio::test]
async fn test_health_reports_session_phase() {
    let server = TestServer::new().await;
    wait_for_snapshot(&server.coordinator, |s| s.phase == SessionPhase::Loading).await;

    let body = server.get_json("/health").await;
    assert_eq!(body["phase"], "loading");

    server.cleanup().await;
}
