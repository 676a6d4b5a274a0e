//! 呼叫 ffmpeg 抽取預覽影格

mod ffmpeg_command;
mod invoker;
mod progress;

pub use ffmpeg_command::{FfmpegCommand, PREVIEW_HEIGHT, PREVIEW_WIDTH};
pub use invoker::{ExtractionStats, FfmpegTranscoder, FrameExtractor, TranscodeError};
pub use progress::{
    ProgressMonitor, ProgressReport, ProgressSample, expected_frame_count, for_each_line,
    parse_progress_line,
};

/// 在 `dir` 寫一個可執行的 `/bin/sh` 腳本充當 ffmpeg
#[cfg(all(test, unix))]
pub(crate) fn write_fake_ffmpeg(dir: &std::path::Path, body: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("ffmpeg");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
