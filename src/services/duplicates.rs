use crate::config::DuplicateConfig;
use crate::core::duplicate::{DuplicateVerdict, resolve};
use crate::core::fingerprint::ImageFingerprint;
use crate::core::geo::Coordinate;
use crate::services::store::{CandidateStore, StoreReadError};
use std::sync::Arc;

/// Fetches the stored reports once and scans them in memory.
pub struct DuplicateService<S> {
    store: Arc<S>,
    config: DuplicateConfig,
}

impl<S: CandidateStore> DuplicateService<S> {
    pub fn new(store: Arc<S>, config: DuplicateConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &DuplicateConfig {
        &self.config
    }

    /// A failed fetch is returned as-is, never reported as "not a duplicate".
    pub async fn check(
        &self,
        location: Option<&Coordinate>,
        fingerprint: Option<&ImageFingerprint>,
    ) -> Result<DuplicateVerdict, StoreReadError> {
        let candidates = self.store.fetch_candidates().await?;
        let verdict = resolve(location, fingerprint, &candidates, &self.config);

        log::info!(
            "Duplicate check over {} candidates: duplicate={} reason={:?} of={:?}",
            candidates.len(),
            verdict.is_duplicate,
            verdict.reason,
            verdict.duplicate_of_id
        );
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::duplicate::{CandidateReport, DuplicateReason};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeStore {
        candidates: Vec<CandidateReport>,
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl CandidateStore for FakeStore {
        async fn fetch_candidates(&self) -> Result<Vec<CandidateReport>, StoreReadError> {
            self.fetches.fetch_add(1, Ordering::Relaxed);
            Ok(self.candidates.clone())
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl CandidateStore for BrokenStore {
        async fn fetch_candidates(&self) -> Result<Vec<CandidateReport>, StoreReadError> {
            Err(StoreReadError::Unavailable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_check_fetches_once_and_resolves() {
        let here = Coordinate::new(12.9716, 77.5946);
        let store = Arc::new(FakeStore {
            candidates: vec![CandidateReport {
                id: "r1".to_string(),
                location: Some(here),
                fingerprint: None,
            }],
            fetches: AtomicUsize::new(0),
        });
        let service = DuplicateService::new(store.clone(), DuplicateConfig::default());

        let first = service.check(Some(&here), None).await.unwrap();
        assert_eq!(first.reason, DuplicateReason::Location);
        assert_eq!(store.fetches.load(Ordering::Relaxed), 1);

        let second = service.check(Some(&here), None).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_store_failure_is_surfaced() {
        let service = DuplicateService::new(Arc::new(BrokenStore), DuplicateConfig::default());
        let fp = ImageFingerprint(0);
        let result = service.check(None, Some(&fp)).await;
        assert!(matches!(result, Err(StoreReadError::Unavailable(_))));
    }
}
