use std::io::Write;

use breatheasy::{
    cmd::{ReplayArgs, replay::replay},
    models::{InsightStatus, Pollutant, SessionPhase},
};
use serde_json::json;
use tempfile::NamedTempFile;

fn recording(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file
}

fn args(file: &NamedTempFile) -> ReplayArgs {
    ReplayArgs {
        file: file.path().to_path_buf(),
        thresholds: None,
        analysis_url: None,
        analysis_timeout_secs: 5,
    }
}

#[tokio::test]
async fn test_replay_without_analysis_service() {
    let file = recording(&[
        r#"{"CO_ppm": 1.0, "PM2_5_ug_m3": 8.0, "timestamp": 1700000000000}"#,
        r#"{"CO_ppm": 1.2, "PM2_5_ug_m3": 9.0, "timestamp": 1700000005000}"#,
        r#"{"CO_ppm": 1.1, "PM2_5_ug_m3": 7.5, "timestamp": 1700000010000}"#,
    ]);

    let snapshot = replay(&args(&file)).await.unwrap();

    assert_eq!(snapshot.phase, SessionPhase::Terminated);
    assert_eq!(snapshot.history.len(), 3);
    assert_eq!(snapshot.current_reading.unwrap().get(Pollutant::Pm25), 7.5);
    assert!(snapshot.alerts.is_empty());
    assert!(!snapshot.is_loading_analysis);
    assert_eq!(snapshot.derived_insight.unwrap().status, InsightStatus::Unavailable);
}

#[tokio::test]
async fn test_replay_applies_thresholds_file() {
    let file = recording(&[
        r#"{"PM2_5_ug_m3": 40.0, "timestamp": 1700000000000}"#,
        r#"{"PM2_5_ug_m3": 45.0, "timestamp": 1700000030000}"#,
        "null",
    ]);
    let mut thresholds = NamedTempFile::new().unwrap();
    write!(thresholds, "{}", json!({ "pm2_5": 35.0 })).unwrap();

    let mut args = args(&file);
    args.thresholds = Some(thresholds.path().to_path_buf());
    let snapshot = replay(&args).await.unwrap();

    assert_eq!(snapshot.history.len(), 2);
    assert_eq!(snapshot.alerts.len(), 1);
    assert_eq!(snapshot.alerts[0].value, 40.0);
    assert!(snapshot.current_reading.is_none());
}

#[tokio::test]
async fn test_replay_reset_clears_history() {
    let file = recording(&[
        r#"{"CO_ppm": 1.0, "timestamp": 1700000000000}"#,
        r#""reset""#,
        r#"{"CO_ppm": 2.0, "timestamp": 1700000100000}"#,
    ]);

    let snapshot = replay(&args(&file)).await.unwrap();

    assert_eq!(snapshot.history.len(), 1);
    assert_eq!(snapshot.history[0].reading.get(Pollutant::Co), 2.0);
}

#[tokio::test]
async fn test_replay_with_analysis_service() {
    let mut server = mockito::Server::new_async().await;
    let analysis = server
        .mock("POST", "/analysis")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "summary": "Moderate particulate levels." }).to_string())
        .expect(1)
        .create_async()
        .await;
    let recommendations = server
        .mock("POST", "/recommendations")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "recommendations": ["Open a window."] }).to_string())
        .expect(1)
        .create_async()
        .await;

    let file = recording(&[
        r#"{"CO_ppm": 1.0, "PM2_5_ug_m3": 20.0, "timestamp": 1700000000000}"#,
    ]);
    let mut args = args(&file);
    args.analysis_url = Some(format!("{}/", server.url()).parse().unwrap());

    let snapshot = replay(&args).await.unwrap();

    let insight = snapshot.derived_insight.unwrap();
    assert_eq!(insight.status, InsightStatus::Fresh);
    assert_eq!(insight.summary, "Moderate particulate levels.");
    assert_eq!(insight.recommendations, vec!["Open a window.".to_string()]);
    analysis.assert_async().await;
    recommendations.assert_async().await;
}

#[tokio::test]
async fn test_missing_recording_ends_degraded_session() {
    let file = recording(&[]);
    let mut args = args(&file);
    args.file = file.path().with_extension("missing");

    let snapshot = replay(&args).await.unwrap();

    assert_eq!(snapshot.phase, SessionPhase::Terminated);
    assert!(snapshot.history.is_empty());
}
