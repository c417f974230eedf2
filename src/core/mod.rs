pub mod category;
pub mod duplicate;
pub mod fingerprint;
pub mod geo;
pub mod labels;
pub mod severity;

pub use category::{Category, CategoryScores, classify};
pub use duplicate::{CandidateReport, DuplicateReason, DuplicateVerdict, resolve};
pub use fingerprint::{DecodeError, ImageFingerprint, compute_fingerprint, hamming_distance_hex};
pub use geo::{Coordinate, distance_meters};
pub use labels::LabelAnnotation;
pub use severity::{Severity, score_severity};
