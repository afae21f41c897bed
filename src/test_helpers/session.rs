use std::time::Duration;

use crate::{coordinator::CoordinatorHandle, models::SessionSnapshot};

/// Waits up to two seconds for a snapshot satisfying `predicate`.
///
/// # Panics
/// If no such snapshot is published in time.
pub async fn wait_for_snapshot(
    handle: &CoordinatorHandle,
    predicate: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    let mut rx = handle.subscribe();
    let result = tokio::time::timeout(Duration::from_secs(2), rx.wait_for(predicate)).await;
    match result {
        Ok(Ok(snapshot)) => snapshot.clone(),
        Ok(Err(_)) => panic!("coordinator dropped its snapshot channel"),
        Err(_) => panic!("timed out waiting for snapshot; last: {:?}", handle.snapshot()),
    }
}
