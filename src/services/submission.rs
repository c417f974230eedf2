use crate::config::{EngineConfig, StoreFailurePolicy};
use crate::core::duplicate::DuplicateVerdict;
use crate::core::fingerprint::compute_fingerprint;
use crate::core::geo::Coordinate;
use crate::services::duplicates::DuplicateService;
use crate::services::labels::{LabelRequest, LabelSource};
use crate::services::store::{
    CandidateStore, ReportSink, ReportStatus, StoreReadError, StoreWriteError, StoredReport,
};
use crate::services::triage::TriageService;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Duplicate check failed")]
    DuplicateCheck(#[source] StoreReadError),

    #[error("Failed to save report")]
    Persist(#[from] StoreWriteError),
}

/// One incoming citizen report.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub image: Vec<u8>,
    /// Where the uploaded image lives (URL or path).
    pub image_ref: String,
    pub description: String,
    pub location: Option<Coordinate>,
    pub user_name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub report: StoredReport,
    pub verdict: DuplicateVerdict,
    pub warnings: Vec<String>,
}

/// Runs a submission end to end: fingerprint, duplicate check, triage, save.
pub struct SubmissionService<S, L> {
    store: Arc<S>,
    duplicates: DuplicateService<S>,
    triage: TriageService<L>,
    on_store_failure: StoreFailurePolicy,
}

impl<S, L> SubmissionService<S, L>
where
    S: CandidateStore + ReportSink,
    L: LabelSource,
{
    pub fn new(store: Arc<S>, labels: Arc<L>, config: &EngineConfig) -> Self {
        Self {
            duplicates: DuplicateService::new(store.clone(), config.duplicate.clone()),
            triage: TriageService::new(labels, config.categories.clone()),
            store,
            on_store_failure: config.submission.on_store_failure,
        }
    }

    pub async fn submit(&self, submission: Submission) -> Result<SubmissionOutcome, SubmissionError> {
        let mut warnings = Vec::new();

        let fingerprint = match compute_fingerprint(&submission.image) {
            Ok(fp) => Some(fp),
            Err(e) => {
                log::warn!("Could not fingerprint {}: {}", submission.image_ref, e);
                warnings.push(format!("image not fingerprinted: {}", e));
                None
            }
        };

        let verdict = match self
            .duplicates
            .check(submission.location.as_ref(), fingerprint.as_ref())
            .await
        {
            Ok(verdict) => verdict,
            Err(e) => match self.on_store_failure {
                StoreFailurePolicy::Block => return Err(SubmissionError::DuplicateCheck(e)),
                StoreFailurePolicy::Proceed => {
                    log::warn!("Duplicate check skipped: {}", e);
                    warnings.push(format!("duplicate check skipped: {}", e));
                    DuplicateVerdict::unique()
                }
            },
        };

        let triage = self
            .triage
            .triage_or_default(LabelRequest {
                bytes: &submission.image,
                reference: Some(submission.image_ref.as_str()),
            })
            .await;

        let report = StoredReport {
            id: Uuid::new_v4().to_string(),
            image_ref: submission.image_ref,
            description: submission.description,
            location: submission.location,
            user_name: submission.user_name,
            phone: submission.phone,
            fingerprint: fingerprint.map(|fp| fp.to_string()),
            status: if verdict.is_duplicate {
                ReportStatus::Duplicate
            } else {
                ReportStatus::Pending
            },
            is_duplicate: verdict.is_duplicate,
            duplicate_of: verdict.duplicate_of_id.clone(),
            category: triage.category,
            severity: triage.severity,
            created_at: Utc::now(),
        };

        self.store.append(&report).await?;
        log::info!(
            "Saved report {} status={:?} category={} severity={}",
            report.id,
            report.status,
            report.category,
            report.severity
        );

        Ok(SubmissionOutcome {
            report,
            verdict,
            warnings,
        })
    }
}
