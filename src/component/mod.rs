//! 預覽產生流程的各個元件
//!
//! 分派器把每個媒體檔交給抽取工作；工作依序使用資源分配、ffmpeg 抽取、
//! 影格整理與 BIF 編碼。

pub mod bif;
pub mod dispatcher;
pub mod extraction_job;
pub mod frame_catalog;
pub mod resource_allocator;
pub mod transcoder;

pub use dispatcher::{Dispatcher, RunSummary};
pub use extraction_job::{ExtractionJob, JobContext, JobError, JobOutcome, JobState};
pub use resource_allocator::ResourcePool;
pub use transcoder::{FfmpegTranscoder, FrameExtractor};
