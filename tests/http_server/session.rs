use breatheasy::{
    models::{Pollutant, SessionPhase, ThresholdSet},
    test_helpers::{PayloadBuilder, StaticThresholdStore, wait_for_snapshot},
};
use chrono::{TimeZone, Utc};
use serde_json::json;

use crate::helpers::TestServer;

#[tokio::test]
async fn test_state_reflects_latest_reading() {
    let server = TestServer::new().await;
    let captured_at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    server.send_payload(PayloadBuilder::new().co_ppm(1.5).pm2_5(12.0).timestamp(captured_at)).await;
    wait_for_snapshot(&server.coordinator, |s| s.history.len() == 1).await;

    let body = server.get_json("/state").await;
    assert_eq!(body["phase"], "live");
    assert_eq!(body["currentReading"]["co"], 1.5);
    assert_eq!(body["currentReading"]["pm2_5"], 12.0);
    assert_eq!(body["history"].as_array().unwrap().len(), 1);
    assert_eq!(body["isLoadingReadings"], false);
    assert_eq!(body["isLoadingAnalysis"], true);

    server.cleanup().await;
}

#[tokio::test]
async fn test_put_threshold_updates_and_persists() {
    let server = TestServer::new().await;

    let response = server.put_json("/thresholds/pm2_5", json!({ "value": 35.0 })).await;
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["pollutant"], "pm2_5");
    assert_eq!(body["persisted"], true);

    wait_for_snapshot(&server.coordinator, |s| s.thresholds.limit(Pollutant::Pm25).is_some())
        .await;
    let body = server.get_json("/thresholds").await;
    assert_eq!(body["thresholds"]["pm2_5"], 35.0);
    assert_eq!(server.thresholds.saved().len(), 1);

    server.cleanup().await;
}

#[tokio::test]
async fn test_put_null_clears_threshold() {
    let store = StaticThresholdStore::new(ThresholdSet::unlimited().with(Pollutant::Co, 9.0));
    let server = TestServer::with_store(store).await;

    let response = server.put_json("/thresholds/co", json!({ "value": null })).await;
    assert_eq!(response.status(), 200);

    let snapshot =
        wait_for_snapshot(&server.coordinator, |s| s.thresholds.limit(Pollutant::Co).is_none())
            .await;
    assert!(snapshot.thresholds.is_unlimited());

    server.cleanup().await;
}

#[tokio::test]
async fn test_failed_save_is_reported_but_applied() {
    let server = TestServer::with_store(StaticThresholdStore::failing_saves(
        ThresholdSet::unlimited(),
    ))
    .await;

    let response = server.put_json("/thresholds/co", json!({ "value": 9.0 })).await;
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["persisted"], false);
    assert!(body["warning"].is_string());

    wait_for_snapshot(&server.coordinator, |s| s.thresholds.limit(Pollutant::Co) == Some(9.0))
        .await;

    server.cleanup().await;
}

#[tokio::test]
async fn test_unknown_pollutant_is_rejected() {
    let server = TestServer::new().await;

    let response = server.put_json("/thresholds/ozone", json!({ "value": 1.0 })).await;
    assert_eq!(response.status(), 422);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("ozone"));

    server.cleanup().await;
}

#[tokio::test]
async fn test_negative_threshold_is_rejected() {
    let server = TestServer::new().await;

    let response = server.put_json("/thresholds/co", json!({ "value": -1.0 })).await;
    assert_eq!(response.status(), 422);
    assert!(server.coordinator.snapshot().thresholds.is_unlimited());

    server.cleanup().await;
}

#[tokio::test]
async fn test_dismiss_alert() {
    let store = StaticThresholdStore::new(ThresholdSet::unlimited().with(Pollutant::Pm25, 20.0));
    let server = TestServer::with_store(store).await;
    let captured_at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    server.send_payload(PayloadBuilder::new().pm2_5(30.0).timestamp(captured_at)).await;

    let snapshot = wait_for_snapshot(&server.coordinator, |s| !s.alerts.is_empty()).await;
    let id = snapshot.alerts[0].id.clone();

    let body = server.get_json("/state").await;
    assert_eq!(body["alerts"][0]["id"], id.as_str());

    let response = server.delete(&format!("/alerts/{id}")).await;
    assert_eq!(response.status(), 204);

    let response = server.delete(&format!("/alerts/{id}")).await;
    assert_eq!(response.status(), 404);

    server.cleanup().await;
}

#[tokio::test]
async fn test_unknown_alert_is_not_found() {
    let server = TestServer::new().await;

    let response = server.delete("/alerts/does-not-exist").await;
    assert_eq!(response.status(), 404);

    server.cleanup().await;
}

#[tokio::test]
async fn test_stopped_session_is_unavailable() {
    let server = TestServer::new().await;
    server.coordinator.shutdown().await;
    wait_for_snapshot(&server.coordinator, |s| s.phase == SessionPhase::Terminated).await;

    let response = server.delete("/alerts/co-1").await;
    assert_eq!(response.status(), 503);

    let response = server.put_json("/thresholds/co", json!({ "value": 9.0 })).await;
    assert_eq!(response.status(), 503);

    server.cleanup().await;
}
