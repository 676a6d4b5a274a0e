//! 工作分派
//!
//! 固定大小的執行緒池（GPU 工作者數 + CPU 工作者數），每條執行緒一次只處理
//! 一個項目並阻塞在 ffmpeg 子程序上。單一項目失敗或 panic 不影響其他項目。

use crate::catalog::{LibrarySection, MediaCatalog, MediaItem};
use crate::component::extraction_job::{ExtractionJob, JobContext, JobError, JobOutcome};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::any::Any;
use std::ops::AddAssign;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub installed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.installed + self.skipped + self.failed
    }

    fn record(&mut self, outcome: &Result<JobOutcome, JobError>) {
        match outcome {
            Ok(JobOutcome::Installed { .. }) => self.installed += 1,
            Ok(JobOutcome::Skipped(_)) => self.skipped += 1,
            Err(_) => self.failed += 1,
        }
    }

    fn merge(mut self, other: Self) -> Self {
        self += other;
        self
    }
}

impl AddAssign for RunSummary {
    fn add_assign(&mut self, other: Self) {
        self.installed += other.installed;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "未知的 panic".to_string()
    }
}

pub struct Dispatcher<'a> {
    threads: ThreadPool,
    catalog: &'a dyn MediaCatalog,
    context: JobContext<'a>,
    shutdown_signal: Arc<AtomicBool>,
    show_progress: bool,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        worker_count: usize,
        catalog: &'a dyn MediaCatalog,
        context: JobContext<'a>,
        shutdown_signal: Arc<AtomicBool>,
    ) -> Result<Self> {
        let threads = ThreadPoolBuilder::new()
            .num_threads(worker_count)
            .thread_name(|index| format!("preview-worker-{index}"))
            .build()
            .context("無法建立工作執行緒池")?;

        Ok(Self {
            threads,
            catalog,
            context,
            shutdown_signal,
            show_progress: true,
        })
    }

    /// 不顯示進度條（測試或非互動環境）
    #[must_use]
    pub const fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.threads.current_num_threads()
    }

    fn is_shutting_down(&self) -> bool {
        self.shutdown_signal.load(Ordering::SeqCst)
    }

    fn progress_bar(&self, len: usize, title: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let progress_bar = ProgressBar::new(len as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("#>-"),
        );
        progress_bar.set_message(title.to_string());
        progress_bar
    }

    /// 處理整個媒體庫
    pub fn run_section(&self, section: &LibrarySection) -> Result<RunSummary> {
        let item_keys = self
            .catalog
            .item_keys(section)
            .with_context(|| format!("無法取得媒體庫 {} 的項目", section.title))?;
        info!(
            "媒體庫 {} ({}): {} 個項目，{} 個工作者",
            section.title,
            section.kind,
            item_keys.len(),
            self.worker_count()
        );

        let summary = self.run_items(&section.title, &item_keys);
        if self.is_shutting_down() {
            warn!("收到中斷信號，媒體庫 {} 未處理完畢", section.title);
        }
        Ok(summary)
    }

    /// 平行處理項目，所有項目完成或失敗後才回傳
    pub fn run_items(&self, title: &str, item_keys: &[String]) -> RunSummary {
        let progress_bar = self.progress_bar(item_keys.len(), title);

        let summary = self.threads.install(|| {
            item_keys
                .par_iter()
                .map(|item_key| {
                    let summary = self.process_item(item_key);
                    progress_bar.inc(1);
                    summary
                })
                .reduce(RunSummary::default, RunSummary::merge)
        });

        progress_bar.finish_with_message(format!("{title} 完成"));
        summary
    }

    fn process_item(&self, item_key: &str) -> RunSummary {
        let mut summary = RunSummary::default();
        // 只停止派送新項目，執行中的工作會跑完
        if self.is_shutting_down() {
            return summary;
        }

        let parts = match self.catalog.media_parts(item_key) {
            Ok(parts) => parts,
            Err(e) => {
                error!("無法取得項目 {item_key} 的檔案資訊: {e:#}");
                summary.failed += 1;
                return summary;
            }
        };

        for item in &parts {
            summary.record(&self.run_job(item));
        }
        summary
    }

    /// 執行單一工作；panic 轉為該項目的失敗
    pub fn run_job(&self, item: &MediaItem) -> Result<JobOutcome, JobError> {
        let mut job = ExtractionJob::new(item, self.context);
        let result = panic::catch_unwind(AssertUnwindSafe(|| job.run()))
            .unwrap_or_else(|payload| Err(JobError::Panicked(panic_message(payload.as_ref()))));

        if let Err(e) = &result {
            error!(
                "產生預覽失敗 [{}] {}: {e}",
                e.kind(),
                self.context.settings.map_source_path(&item.file).display()
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_merge() {
        let a = RunSummary { installed: 2, skipped: 1, failed: 0 };
        let b = RunSummary { installed: 1, skipped: 0, failed: 3 };
        let merged = a.merge(b);
        assert_eq!(merged, RunSummary { installed: 3, skipped: 1, failed: 3 });
        assert_eq!(merged.total(), 7);
    }

    #[test]
    fn test_summary_record() {
        let mut summary = RunSummary::default();
        summary.record(&Ok(JobOutcome::Skipped(
            crate::component::extraction_job::SkipReason::AlreadyGenerated,
        )));
        summary.record(&Err(JobError::Panicked("boom".into())));
        assert_eq!(summary, RunSummary { installed: 0, skipped: 1, failed: 1 });
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(42_u32);
        assert_eq!(panic_message(payload.as_ref()), "未知的 panic");
    }
}
