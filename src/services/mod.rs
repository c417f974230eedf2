pub mod duplicates;
pub mod labels;
pub mod perceptual;
pub mod scanner;
pub mod store;
pub mod submission;
pub mod triage;

pub use duplicates::DuplicateService;
pub use labels::{FileLabelSource, LabelRequest, LabelSource, LabelSourceError, StaticLabelSource};
pub use perceptual::PerceptualService;
pub use store::{
    CandidateStore, JsonlReportStore, MemoryReportStore, ReportSink, ReportStatus, StoreReadError,
    StoreWriteError, StoredReport,
};
pub use submission::{Submission, SubmissionError, SubmissionOutcome, SubmissionService};
pub use triage::{Triage, TriageService};
