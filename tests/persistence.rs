use std::{sync::Arc, time::Duration};

use breatheasy::{
    models::{Pollutant, ThresholdSet},
    persistence::{
        KeyValueThresholdStore, SqliteStateRepository,
        threshold_store::DEFAULT_THRESHOLDS_KEY,
        traits::{KeyValueStore, ThresholdStore},
    },
};
use tempfile::TempDir;

async fn file_repository(dir: &TempDir) -> SqliteStateRepository {
    let path = dir.path().join("state.db");
    let url = format!("sqlite://{}", path.display());
    let repo = SqliteStateRepository::new(&url).await.expect("Failed to open database");
    repo.run_migrations().await.expect("Failed to run migrations");
    repo
}

#[tokio::test]
async fn test_thresholds_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let expected = ThresholdSet::unlimited().with(Pollutant::Co, 9.0).with(Pollutant::Pm25, 35.0);

    {
        let repo = Arc::new(file_repository(&dir).await);
        let store = KeyValueThresholdStore::new(Arc::clone(&repo), DEFAULT_THRESHOLDS_KEY);
        store.save(&expected).await.unwrap();
        repo.close().await;
    }

    let repo = Arc::new(file_repository(&dir).await);
    let store = KeyValueThresholdStore::new(repo, DEFAULT_THRESHOLDS_KEY);
    assert_eq!(store.load().await, expected);

    let mut rx = store.subscribe().await;
    let initial = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
    assert_eq!(initial, Some(expected));
}

#[tokio::test]
async fn test_fresh_database_means_no_thresholds() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(file_repository(&dir).await);
    let store = KeyValueThresholdStore::new(repo, DEFAULT_THRESHOLDS_KEY);

    assert!(store.load().await.is_unlimited());
}

#[tokio::test]
async fn test_subscribers_see_writes_made_through_another_store() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(file_repository(&dir).await);
    let reader = KeyValueThresholdStore::new(Arc::clone(&repo), DEFAULT_THRESHOLDS_KEY);
    let writer = KeyValueThresholdStore::new(Arc::clone(&repo), DEFAULT_THRESHOLDS_KEY);

    let mut rx = reader.subscribe().await;
    let initial = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
    assert_eq!(initial, Some(ThresholdSet::unlimited()));

    let updated = ThresholdSet::unlimited().with(Pollutant::Vocs, 300.0);
    writer.save(&updated).await.unwrap();

    let next = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
    assert_eq!(next, Some(updated));
}

#[tokio::test]
async fn test_other_keys_do_not_disturb_subscribers() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(file_repository(&dir).await);
    let store = KeyValueThresholdStore::new(Arc::clone(&repo), DEFAULT_THRESHOLDS_KEY);

    let mut rx = store.subscribe().await;
    rx.recv().await.unwrap();

    repo.set_json_state("user_settings/theme", &"dark").await.unwrap();
    let next = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
    assert!(next.is_err(), "unrelated write must not produce a threshold update");

    let theme: Option<String> = repo.get_json_state("user_settings/theme").await.unwrap();
    assert_eq!(theme.as_deref(), Some("dark"));
}

#[tokio::test]
async fn test_corrupt_value_falls_back_to_unlimited() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(file_repository(&dir).await);
    repo.set_json_state(DEFAULT_THRESHOLDS_KEY, &vec![1, 2, 3]).await.unwrap();

    let store = KeyValueThresholdStore::new(repo, DEFAULT_THRESHOLDS_KEY);
    assert!(store.load().await.is_unlimited());
}
