//! 單一影片的預覽產生工作

mod job;
mod workspace;

pub use job::{ExtractionJob, JobContext, JobError, JobOutcome, JobState, SkipReason};
pub use workspace::JobWorkspace;
