use super::workspace::JobWorkspace;
use crate::catalog::MediaItem;
use crate::component::bif::{self, BifError};
use crate::component::frame_catalog::{self, FrameCatalogError};
use crate::component::resource_allocator::ResourcePool;
use crate::component::transcoder::{FrameExtractor, TranscodeError};
use crate::config::{BundlePaths, Settings};
use log::{debug, info};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    PathResolved,
    Skipped,
    Extracting,
    Cataloging,
    Encoding,
    Installed,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::PathResolved => "path_resolved",
            Self::Skipped => "skipped",
            Self::Extracting => "extracting",
            Self::Cataloging => "cataloging",
            Self::Encoding => "encoding",
            Self::Installed => "installed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// 路徑不符合過濾字串
    FilteredOut,
    /// 內容雜湊為空，無法決定輸出位置
    MissingHash,
    /// 預覽檔已存在
    AlreadyGenerated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Installed { path: PathBuf, frames: usize },
    Skipped(SkipReason),
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("找不到影片檔案: {0}")]
    SourceMissing(PathBuf),

    #[error("無法建立資料夾 {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("抽取影格失敗: {0}")]
    Extraction(#[source] TranscodeError),

    #[error("沒有產生任何影格: {0}")]
    NoFrames(PathBuf),

    #[error("整理影格失敗: {0}")]
    Catalog(#[source] FrameCatalogError),

    #[error("寫入 BIF 失敗: {0}")]
    Encoding(#[from] BifError),

    #[error("工作異常中止: {0}")]
    Panicked(String),
}

impl JobError {
    /// 寫入日誌用的錯誤分類
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SourceMissing(_) => "source_missing",
            Self::CreateDirectory { .. } => "create_directory",
            Self::Extraction(_) => "extraction",
            Self::NoFrames(_) => "no_frames",
            Self::Catalog(_) => "catalog",
            Self::Encoding(_) => "encoding",
            Self::Panicked(_) => "panicked",
        }
    }
}

impl From<TranscodeError> for JobError {
    fn from(err: TranscodeError) -> Self {
        match err {
            TranscodeError::NoFrames(dir) => Self::NoFrames(dir),
            other => Self::Extraction(other),
        }
    }
}

impl From<FrameCatalogError> for JobError {
    fn from(err: FrameCatalogError) -> Self {
        match err {
            FrameCatalogError::Empty(dir) => Self::NoFrames(dir),
            other => Self::Catalog(other),
        }
    }
}

/// 每個工作共用的唯讀資源
#[derive(Clone, Copy)]
pub struct JobContext<'a> {
    pub settings: &'a Settings,
    pub pool: &'a ResourcePool,
    pub extractor: &'a dyn FrameExtractor,
}

/// 單一影片的預覽產生流程
///
/// `Pending → PathResolved → (Skipped | Extracting → Cataloging → Encoding → Installed) | Failed`
pub struct ExtractionJob<'a> {
    item: &'a MediaItem,
    context: JobContext<'a>,
    state: JobState,
}

impl<'a> ExtractionJob<'a> {
    #[must_use]
    pub const fn new(item: &'a MediaItem, context: JobContext<'a>) -> Self {
        Self {
            item,
            context,
            state: JobState::Pending,
        }
    }

    #[must_use]
    pub const fn state(&self) -> JobState {
        self.state
    }

    #[must_use]
    pub fn source_path(&self) -> PathBuf {
        self.context.settings.map_source_path(&self.item.file)
    }

    fn transition(&mut self, next: JobState) {
        debug!("{} [{}]: {} -> {next}", self.item.file, self.item.hash, self.state);
        self.state = next;
    }

    pub fn run(&mut self) -> Result<JobOutcome, JobError> {
        let settings = self.context.settings;

        // 過濾不記錄狀態轉換
        if !settings.matches_filter(&self.item.file) {
            return Ok(JobOutcome::Skipped(SkipReason::FilteredOut));
        }
        let Some(paths) = settings.bundle_paths(&self.item.hash) else {
            return Ok(JobOutcome::Skipped(SkipReason::MissingHash));
        };

        let source = self.source_path();
        self.transition(JobState::PathResolved);

        if paths.index_bif.exists() {
            self.transition(JobState::Skipped);
            return Ok(JobOutcome::Skipped(SkipReason::AlreadyGenerated));
        }

        let result = self.generate(&source, &paths);
        match &result {
            Ok(JobOutcome::Installed { .. }) => self.transition(JobState::Installed),
            Ok(JobOutcome::Skipped(_)) => self.transition(JobState::Skipped),
            Err(_) => self.transition(JobState::Failed),
        }
        result
    }

    fn generate(&mut self, source: &Path, paths: &BundlePaths) -> Result<JobOutcome, JobError> {
        let settings = self.context.settings;
        let interval = settings.frame_interval;

        if !source.exists() {
            return Err(JobError::SourceMissing(source.to_path_buf()));
        }
        fs::create_dir_all(&paths.indexes_dir).map_err(|e| JobError::CreateDirectory {
            path: paths.indexes_dir.clone(),
            source: e,
        })?;

        let tmp_dir = settings.job_tmp_dir(&self.item.hash);
        let mut workspace =
            JobWorkspace::acquire(&tmp_dir, &paths.index_bif).map_err(|e| {
                JobError::CreateDirectory {
                    path: tmp_dir.clone(),
                    source: e,
                }
            })?;

        self.transition(JobState::Extracting);
        let hardware = self.context.pool.admit();
        self.context.extractor.extract(
            source,
            workspace.tmp_dir(),
            self.item.duration_seconds,
            hardware,
        )?;

        self.transition(JobState::Cataloging);
        let frames = frame_catalog::normalize(workspace.tmp_dir(), interval)?;

        self.transition(JobState::Encoding);
        workspace.claim_target();
        match bif::encode(&frames, interval, workspace.target()) {
            Ok(()) => {}
            // 其他程序已先寫好同一個檔案
            Err(BifError::Io { source: e, .. }) if e.kind() == io::ErrorKind::AlreadyExists => {
                workspace.release_target();
                return Ok(JobOutcome::Skipped(SkipReason::AlreadyGenerated));
            }
            Err(e) => return Err(e.into()),
        }
        workspace.commit();

        info!(
            "已安裝 {} 張預覽圖: {} -> {}",
            frames.len(),
            source.display(),
            paths.index_bif.display()
        );
        Ok(JobOutcome::Installed {
            path: paths.index_bif.clone(),
            frames: frames.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(JobError::SourceMissing(PathBuf::from("/a.mkv")).kind(), "source_missing");
        assert_eq!(JobError::Panicked("boom".into()).kind(), "panicked");
        assert_eq!(
            JobError::from(FrameCatalogError::Empty(PathBuf::from("/tmp/x"))).kind(),
            "no_frames"
        );
        assert_eq!(
            JobError::from(FrameCatalogError::Gap { expected: 1, found: 2 }).kind(),
            "catalog"
        );
        assert_eq!(
            JobError::from(TranscodeError::NoFrames(PathBuf::from("/tmp/x"))).kind(),
            "no_frames"
        );
    }

    #[test]
    fn test_state_display() {
        assert_eq!(JobState::PathResolved.to_string(), "path_resolved");
        assert_eq!(JobState::Installed.to_string(), "installed");
    }
}
