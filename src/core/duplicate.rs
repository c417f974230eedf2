// Duplicate detection for incoming reports.
// A report is compared against stored candidates in the order given and the
// first qualifying candidate wins:
// - co-located with a close image (or no image to compare) is a duplicate
// - co-located with a different image is rejected and the scan continues
// - otherwise a close image alone is a duplicate

use crate::config::DuplicateConfig;
use crate::core::fingerprint::ImageFingerprint;
use crate::core::geo::{Coordinate, distance_meters};
use serde::{Deserialize, Serialize};

/// A previously stored report as seen by the duplicate check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateReport {
    pub id: String,
    #[serde(default)]
    pub location: Option<Coordinate>,
    /// Stored hex form; values that do not parse never match.
    #[serde(default, alias = "imageHash")]
    pub fingerprint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateReason {
    None,
    Location,
    Image,
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateVerdict {
    pub is_duplicate: bool,
    pub duplicate_of_id: Option<String>,
    pub reason: DuplicateReason,
}

impl DuplicateVerdict {
    pub fn unique() -> Self {
        Self {
            is_duplicate: false,
            duplicate_of_id: None,
            reason: DuplicateReason::None,
        }
    }

    fn duplicate_of(candidate: &CandidateReport, reason: DuplicateReason) -> Self {
        Self {
            is_duplicate: true,
            duplicate_of_id: Some(candidate.id.clone()),
            reason,
        }
    }
}

/// Image distance between the new report and a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageEvidence {
    /// At least one side has no fingerprint.
    Missing,
    /// Both sides have one but they cannot be compared.
    Incomparable,
    Distance(u32),
}

impl ImageEvidence {
    fn within(&self, threshold: u32) -> bool {
        matches!(self, ImageEvidence::Distance(d) if *d <= threshold)
    }
}

fn image_evidence(
    new_fingerprint: Option<&ImageFingerprint>,
    candidate: &CandidateReport,
) -> ImageEvidence {
    match (new_fingerprint, candidate.fingerprint.as_deref()) {
        (Some(new), Some(stored)) => match stored.parse::<ImageFingerprint>() {
            Ok(stored) => ImageEvidence::Distance(new.hamming_distance(&stored)),
            Err(e) => {
                log::debug!("Candidate {} has unusable fingerprint: {}", candidate.id, e);
                ImageEvidence::Incomparable
            }
        },
        _ => ImageEvidence::Missing,
    }
}

/// Decide whether a new report duplicates one of `candidates`.
pub fn resolve(
    new_location: Option<&Coordinate>,
    new_fingerprint: Option<&ImageFingerprint>,
    candidates: &[CandidateReport],
    config: &DuplicateConfig,
) -> DuplicateVerdict {
    for candidate in candidates {
        let image = image_evidence(new_fingerprint, candidate);

        let co_located = match (new_location, candidate.location.as_ref()) {
            (Some(new), Some(stored)) => {
                distance_meters(new, stored) <= config.location_radius_meters
            }
            _ => false,
        };

        if co_located {
            match image {
                ImageEvidence::Missing => {
                    log::debug!("Candidate {} matches on location alone", candidate.id);
                    return DuplicateVerdict::duplicate_of(candidate, DuplicateReason::Location);
                }
                _ if image.within(config.hamming_threshold) => {
                    log::debug!("Candidate {} matches on location and image", candidate.id);
                    return DuplicateVerdict::duplicate_of(candidate, DuplicateReason::Both);
                }
                _ => {
                    log::debug!(
                        "Candidate {} is co-located but the image differs ({:?})",
                        candidate.id,
                        image
                    );
                    continue;
                }
            }
        }

        if image.within(config.hamming_threshold) {
            log::debug!("Candidate {} matches on image alone", candidate.id);
            return DuplicateVerdict::duplicate_of(candidate, DuplicateReason::Image);
        }
    }

    DuplicateVerdict::unique()
}
