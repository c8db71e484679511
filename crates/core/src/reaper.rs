//! Periodic cleanup of artifacts that outlived the retention window.
//!
//! Delivery deletes what it sends, but an artifact can be orphaned when a process stops before
//! its scheduled deletion runs. The reaper sweeps those up by age.

use crate::ClinicResult;
use clinic_artifacts::{ArtifactName, ArtifactStore};
use std::time::{Duration, SystemTime};

/// Delete every artifact older than `retention`, once.
pub fn reap_once(store: &ArtifactStore, retention: Duration) -> ClinicResult<Vec<ArtifactName>> {
    let removed = store.reap(retention, SystemTime::now())?;
    if !removed.is_empty() {
        tracing::info!("reaped {} expired artifact(s)", removed.len());
    }
    Ok(removed)
}

/// Sweep the store every `interval` until the task is dropped.
pub async fn run_reaper(store: ArtifactStore, retention: Duration, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let sweep_store = store.clone();
        match tokio::task::spawn_blocking(move || reap_once(&sweep_store, retention)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::warn!("artifact sweep failed: {}", e),
            Err(e) => tracing::error!("artifact sweep task failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_reap_once_keeps_fresh_artifacts() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        let name = ArtifactName::parse("prescription_p1_1.pdf").unwrap();
        store.write(&name, b"%PDF-1.3").unwrap();

        let removed = reap_once(&store, Duration::from_secs(300)).unwrap();
        assert!(removed.is_empty());
        assert_eq!(store.list().unwrap(), vec![name]);
    }

    #[test]
    fn test_reap_once_with_zero_retention_clears_old_files() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        let name = ArtifactName::parse("prescription_p1_1.pdf").unwrap();
        store.write(&name, b"%PDF-1.3").unwrap();
        std::thread::sleep(Duration::from_millis(20));

        let removed = reap_once(&store, Duration::ZERO).unwrap();
        assert_eq!(removed, vec![name]);
        assert!(store.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_reaper_sweeps_in_background() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        let name = ArtifactName::parse("prescription_p1_1.pdf").unwrap();
        store.write(&name, b"%PDF-1.3").unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let handle = tokio::spawn(run_reaper(
            store.clone(),
            Duration::ZERO,
            Duration::from_millis(10),
        ));
        for _ in 0..100 {
            if store.list().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();

        assert!(store.list().unwrap().is_empty());
    }
}
