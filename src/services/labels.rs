use crate::core::labels::LabelAnnotation;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LabelSourceError {
    #[error("Failed to read labels from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid label data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Label source unavailable: {0}")]
    Unavailable(String),
}

/// The image a label source is asked to annotate.
#[derive(Debug, Clone, Copy)]
pub struct LabelRequest<'a> {
    pub bytes: &'a [u8],
    /// Fetchable reference (URL or path) when the source prefers one.
    pub reference: Option<&'a str>,
}

/// External image annotation. An empty result is a valid answer.
#[async_trait]
pub trait LabelSource: Send + Sync {
    async fn detect_labels(
        &self,
        request: LabelRequest<'_>,
    ) -> Result<Vec<LabelAnnotation>, LabelSourceError>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LabelDocument {
    Vision {
        #[serde(rename = "labelAnnotations")]
        label_annotations: Vec<LabelAnnotation>,
    },
    List(Vec<LabelAnnotation>),
}

/// Parse either a bare annotation array or a vision response object.
pub fn parse_labels(json: &str) -> Result<Vec<LabelAnnotation>, LabelSourceError> {
    let document: LabelDocument = serde_json::from_str(json)?;
    Ok(match document {
        LabelDocument::Vision { label_annotations } => label_annotations,
        LabelDocument::List(labels) => labels,
    })
}

/// Labels previously exported to a JSON file.
pub struct FileLabelSource {
    path: PathBuf,
}

impl FileLabelSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl LabelSource for FileLabelSource {
    async fn detect_labels(
        &self,
        _request: LabelRequest<'_>,
    ) -> Result<Vec<LabelAnnotation>, LabelSourceError> {
        let contents =
            tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|source| LabelSourceError::Io {
                    path: self.path.display().to_string(),
                    source,
                })?;
        parse_labels(&contents)
    }
}

/// Returns the same labels for every image.
#[derive(Debug, Clone, Default)]
pub struct StaticLabelSource {
    labels: Vec<LabelAnnotation>,
}

impl StaticLabelSource {
    pub fn new(labels: Vec<LabelAnnotation>) -> Self {
        Self { labels }
    }
}

#[async_trait]
impl LabelSource for StaticLabelSource {
    async fn detect_labels(
        &self,
        _request: LabelRequest<'_>,
    ) -> Result<Vec<LabelAnnotation>, LabelSourceError> {
        Ok(self.labels.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const REQUEST: LabelRequest<'static> = LabelRequest {
        bytes: &[],
        reference: None,
    };

    #[test]
    fn test_parse_plain_list() {
        let labels = parse_labels(r#"[{"description": "Trash", "confidence": 0.6}]"#).unwrap();
        assert_eq!(labels, vec![LabelAnnotation::new("Trash", 0.6)]);
    }

    #[test]
    fn test_parse_vision_response() {
        let json = r#"{"labelAnnotations": [
            {"mid": "/m/0c4ys", "description": "Dumpster", "score": 0.83, "topicality": 0.83},
            {"description": "Asphalt", "score": 0.71}
        ]}"#;
        let labels = parse_labels(json).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].description, "Dumpster");
        assert!((labels[0].confidence - 0.83).abs() < 1e-6);
    }

    #[test]
    fn test_parse_rejects_other_shapes() {
        assert!(matches!(
            parse_labels(r#"{"labels": []}"#),
            Err(LabelSourceError::Json(_))
        ));
    }

    #[tokio::test]
    async fn test_file_source() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("labels.json");
        fs::write(&path, r#"[{"description": "flood", "score": 0.9}]"#).unwrap();

        let source = FileLabelSource::new(&path);
        let labels = source.detect_labels(REQUEST).await.unwrap();
        assert_eq!(labels[0].description, "flood");
    }

    #[tokio::test]
    async fn test_missing_file_is_a_source_error() {
        let temp_dir = TempDir::new().unwrap();
        let source = FileLabelSource::new(temp_dir.path().join("missing.json"));
        let result = source.detect_labels(REQUEST).await;
        assert!(matches!(result, Err(LabelSourceError::Io { .. })));
    }

    #[tokio::test]
    async fn test_static_source_can_be_empty() {
        let source = StaticLabelSource::default();
        assert!(source.detect_labels(REQUEST).await.unwrap().is_empty());
    }
}
