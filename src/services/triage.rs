use crate::config::CategoryKeywords;
use crate::core::category::{Category, classify};
use crate::core::labels::LabelAnnotation;
use crate::core::severity::{Severity, score_severity};
use crate::services::labels::{LabelRequest, LabelSource, LabelSourceError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triage {
    pub category: Category,
    pub severity: Severity,
    /// Labels the decision was made from; empty on fallback.
    pub labels: Vec<LabelAnnotation>,
}

impl Triage {
    /// Used when labels could not be obtained.
    pub fn fallback() -> Self {
        Self {
            category: Category::Other,
            severity: Severity::Mild,
            labels: Vec::new(),
        }
    }
}

/// Category and severity from labels already in hand.
pub fn triage_labels(labels: Vec<LabelAnnotation>, keywords: &CategoryKeywords) -> Triage {
    let descriptions: Vec<&str> = labels.iter().map(|l| l.description.as_str()).collect();
    let category = classify(&descriptions, keywords);
    let severity = score_severity(&labels, category);
    Triage {
        category,
        severity,
        labels,
    }
}

pub struct TriageService<L> {
    source: Arc<L>,
    keywords: CategoryKeywords,
}

impl<L: LabelSource> TriageService<L> {
    pub fn new(source: Arc<L>, keywords: CategoryKeywords) -> Self {
        Self { source, keywords }
    }

    pub async fn triage(&self, request: LabelRequest<'_>) -> Result<Triage, LabelSourceError> {
        let labels = self.source.detect_labels(request).await?;
        log::debug!(
            "Labels: {:?}",
            labels.iter().map(|l| &l.description).collect::<Vec<_>>()
        );

        let triage = triage_labels(labels, &self.keywords);
        log::info!(
            "Predicted category={} severity={}",
            triage.category,
            triage.severity
        );
        Ok(triage)
    }

    /// Like [`triage`](Self::triage) but never fails: a label source error
    /// degrades to `other`/`mild`.
    pub async fn triage_or_default(&self, request: LabelRequest<'_>) -> Triage {
        match self.triage(request).await {
            Ok(triage) => triage,
            Err(e) => {
                log::warn!("Label detection failed, using fallback triage: {}", e);
                Triage::fallback()
            }
        }
    }
}
