use serde::{Deserialize, Serialize};

/// One label emitted by the external image annotation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelAnnotation {
    pub description: String,
    /// In `[0, 1]`. Vision responses call this `score`.
    #[serde(alias = "score")]
    pub confidence: f32,
}

impl LabelAnnotation {
    pub fn new(description: impl Into<String>, confidence: f32) -> Self {
        Self {
            description: description.into(),
            confidence,
        }
    }

    pub fn normalized(&self) -> String {
        self.description.to_lowercase()
    }
}

/// Lower-cased descriptions, in input order.
pub fn normalized_descriptions(labels: &[LabelAnnotation]) -> Vec<String> {
    labels.iter().map(LabelAnnotation::normalized).collect()
}
