use crate::core::fingerprint::{DecodeError, ImageFingerprint, compute_fingerprint};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Computes average-hash fingerprints for image files.
pub struct PerceptualService;

impl PerceptualService {
    pub fn new() -> Self {
        Self
    }

    pub fn fingerprint_bytes(&self, bytes: &[u8]) -> Result<ImageFingerprint, DecodeError> {
        compute_fingerprint(bytes)
    }

    pub async fn fingerprint_file<P: AsRef<Path>>(
        &self,
        image_path: P,
    ) -> Result<ImageFingerprint, FingerprintError> {
        let bytes = tokio::fs::read(image_path.as_ref()).await?;
        Ok(compute_fingerprint(&bytes)?)
    }

    fn fingerprint_file_sync(&self, image_path: &Path) -> Result<ImageFingerprint, FingerprintError> {
        let bytes = std::fs::read(image_path)?;
        Ok(compute_fingerprint(&bytes)?)
    }

    /// Fingerprint many files in parallel.
    /// Results come back in input order, one per path.
    pub fn fingerprint_batch(
        &self,
        paths: &[PathBuf],
    ) -> Vec<(PathBuf, Result<ImageFingerprint, FingerprintError>)> {
        use rayon::prelude::*;

        paths
            .par_iter()
            .map(|path| (path.clone(), self.fingerprint_file_sync(path)))
            .collect()
    }
}

impl Default for PerceptualService {
    fn default() -> Self {
        Self::new()
    }
}
