use super::ffmpeg_command::FfmpegCommand;
use super::progress::{ProgressMonitor, for_each_line};
use crate::component::frame_catalog::{FRAME_EXTENSION, FRAME_PREFIX};
use crate::component::resource_allocator::Accelerator;
use crate::tools::{format_time, get_video_info, human_readable_size};
use log::{info, warn};
use std::collections::VecDeque;
use std::fs;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;

/// 失敗時保留的 ffmpeg 最後幾行輸出
const STDERR_TAIL_LINES: usize = 5;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("無法啟動 ffmpeg: {0}")]
    Spawn(#[source] io::Error),

    #[error("讀取 ffmpeg 輸出失敗: {0}")]
    Output(#[source] io::Error),

    #[error("ffmpeg 結束狀態 {status}: {tail}")]
    ExitStatus { status: ExitStatus, tail: String },

    #[error("ffmpeg 沒有產生任何影格: {0}")]
    NoFrames(PathBuf),
}

/// 一次抽取的結果
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionStats {
    /// 由影片長度推算；長度未知時為 0
    pub expected_frames: u64,
    /// 輸出資料夾中實際的影格數
    pub frames_produced: usize,
    pub duration_secs: Option<f64>,
    pub elapsed: Duration,
    pub hardware: bool,
}

impl ExtractionStats {
    /// 影片長度相對於實際耗時的倍數，長度未知時為 0
    #[must_use]
    pub fn throughput(&self) -> f64 {
        match self.duration_secs {
            Some(duration) if self.elapsed.as_secs_f64() > 0.0 => {
                duration / self.elapsed.as_secs_f64()
            }
            _ => 0.0,
        }
    }
}

/// 把影片在固定間隔抽成 JPEG 影格
///
/// 影格以 `img-NNNNNN.jpg`（從 1 開始）寫入 `output_dir`。
pub trait FrameExtractor: Send + Sync {
    fn extract(
        &self,
        source: &Path,
        output_dir: &Path,
        duration_hint: Option<f64>,
        hardware: Option<&Accelerator>,
    ) -> Result<ExtractionStats, TranscodeError>;
}

pub struct FfmpegTranscoder {
    ffmpeg_path: PathBuf,
    interval_secs: u32,
    quality: u8,
}

impl FfmpegTranscoder {
    #[must_use]
    pub fn new(ffmpeg_path: &Path, interval_secs: u32, quality: u8) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.to_path_buf(),
            interval_secs,
            quality,
        }
    }

    fn count_frames(output_dir: &Path) -> usize {
        fs::read_dir(output_dir)
            .map(|entries| {
                entries
                    .flatten()
                    .filter(|entry| {
                        let name = entry.file_name().to_string_lossy().to_string();
                        name.starts_with(FRAME_PREFIX)
                            && name.ends_with(&format!(".{FRAME_EXTENSION}"))
                    })
                    .count()
            })
            .unwrap_or(0)
    }
}

impl FrameExtractor for FfmpegTranscoder {
    fn extract(
        &self,
        source: &Path,
        output_dir: &Path,
        duration_hint: Option<f64>,
        hardware: Option<&Accelerator>,
    ) -> Result<ExtractionStats, TranscodeError> {
        // 探測失敗不影響抽取，只是沒有進度與 HDR 處理
        let video_info = get_video_info(source).unwrap_or_else(|e| {
            warn!("無法讀取影片資訊 {}: {e:#}", source.display());
            Default::default()
        });
        let duration_secs = video_info.duration_seconds.or(duration_hint);
        let hdr = video_info.is_hdr();

        let command = FfmpegCommand::new(
            &self.ffmpeg_path,
            source,
            output_dir,
            self.interval_secs,
            self.quality,
        )
        .with_hdr(hdr)
        .with_hardware(hardware);
        let use_hardware = hardware.is_some();

        let size = fs::metadata(source).map(|m| m.len()).unwrap_or(0);
        info!(
            "開始產生預覽圖: {} ({}, {}, HDR={hdr}, HW={use_hardware})",
            source.display(),
            duration_secs.map_or_else(|| "長度未知".to_string(), format_time),
            human_readable_size(size),
        );

        let started = Instant::now();
        let mut child = command
            .build_command()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(TranscodeError::Spawn)?;

        let mut monitor = ProgressMonitor::new(duration_secs, self.interval_secs);
        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
        let name = source
            .file_name()
            .map_or_else(|| source.display().to_string(), |n| n.to_string_lossy().to_string());

        let read_result = match child.stderr.take() {
            Some(stderr) => for_each_line(BufReader::new(stderr), |line| {
                if let Some(report) = monitor.observe(line) {
                    info!(
                        "{name}: {}% | {}/{} 張 @ {:.2}x (HW={use_hardware})",
                        report.percent,
                        report.frames_generated,
                        report.expected_frames,
                        report.speed,
                    );
                }
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line.to_string());
            }),
            None => Ok(()),
        };

        // 讀取失敗也要等子程序結束，避免留下殭屍程序
        let status = child.wait().map_err(TranscodeError::Output)?;
        read_result.map_err(TranscodeError::Output)?;

        if !status.success() {
            return Err(TranscodeError::ExitStatus {
                status,
                tail: tail.into_iter().collect::<Vec<_>>().join(" | "),
            });
        }

        let frames_produced = Self::count_frames(output_dir);
        if frames_produced == 0 {
            return Err(TranscodeError::NoFrames(output_dir.to_path_buf()));
        }

        let stats = ExtractionStats {
            expected_frames: monitor.expected_frames(),
            frames_produced,
            duration_secs,
            elapsed: started.elapsed(),
            hardware: use_hardware,
        };
        info!(
            "已產生 {} 張預覽圖 {}，耗時 {:.1}s（{:.1}x 即時速度，HW={use_hardware}）",
            stats.frames_produced,
            source.display(),
            stats.elapsed.as_secs_f64(),
            stats.throughput(),
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throughput() {
        let stats = ExtractionStats {
            expected_frames: 720,
            frames_produced: 720,
            duration_secs: Some(3600.0),
            elapsed: Duration::from_secs(90),
            hardware: false,
        };
        assert!((stats.throughput() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_throughput_unknown_duration() {
        let stats = ExtractionStats {
            expected_frames: 0,
            frames_produced: 12,
            duration_secs: None,
            elapsed: Duration::from_secs(90),
            hardware: true,
        };
        assert_eq!(stats.throughput(), 0.0);
    }

    #[test]
    fn test_count_frames_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("img-000001.jpg"), b"a").unwrap();
        fs::write(dir.path().join("img-000002.jpg"), b"b").unwrap();
        fs::write(dir.path().join("notes.txt"), b"c").unwrap();
        assert_eq!(FfmpegTranscoder::count_frames(dir.path()), 2);
    }

    #[test]
    fn test_missing_ffmpeg_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let transcoder = FfmpegTranscoder::new(Path::new("/nonexistent/ffmpeg"), 5, 4);
        let result = transcoder.extract(&dir.path().join("a.mkv"), dir.path(), None, None);
        assert!(matches!(result, Err(TranscodeError::Spawn(_))));
    }

    /// 取最後一個參數（輸出樣式）所在的資料夾
    #[cfg(unix)]
    const OUTPUT_DIR_OF_LAST_ARG: &str = r#"for last; do :; done
out=$(dirname "$last")"#;

    #[cfg(unix)]
    fn source_file(dir: &Path) -> PathBuf {
        let source = dir.join("movie.mkv");
        fs::write(&source, b"not really a video").unwrap();
        source
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_reads_carriage_return_progress() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("frames");
        fs::create_dir(&output_dir).unwrap();
        let ffmpeg = crate::component::transcoder::write_fake_ffmpeg(
            dir.path(),
            &format!(
                r#"{OUTPUT_DIR_OF_LAST_ARG}
printf 'frame=1 time=00:00:05.00 bitrate=N/A speed=5.0x\r' >&2
printf 'frame=2 time=00:00:10.00 bitrate=N/A speed=5.0x\r' >&2
printf 'frame=3 time=00:00:15.00 bitrate=N/A speed=5.0x\n' >&2
for n in 1 2 3; do printf 'jpeg' > "$out/img-00000$n.jpg"; done"#
            ),
        );

        let transcoder = FfmpegTranscoder::new(&ffmpeg, 5, 4);
        let stats = transcoder
            .extract(&source_file(dir.path()), &output_dir, Some(15.0), None)
            .unwrap();

        assert_eq!(stats.expected_frames, 3);
        assert_eq!(stats.frames_produced, 3);
        assert_eq!(stats.duration_secs, Some(15.0));
        assert!(!stats.hardware);
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_unknown_duration_counts_actual_frames() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("frames");
        fs::create_dir(&output_dir).unwrap();
        let ffmpeg = crate::component::transcoder::write_fake_ffmpeg(
            dir.path(),
            &format!(
                r#"{OUTPUT_DIR_OF_LAST_ARG}
printf 'frame=1 time=00:00:05.00 bitrate=N/A speed=5.0x\r' >&2
for n in 1 2 3 4; do printf 'jpeg' > "$out/img-00000$n.jpg"; done"#
            ),
        );

        let transcoder = FfmpegTranscoder::new(&ffmpeg, 5, 4);
        let stats = transcoder
            .extract(&source_file(dir.path()), &output_dir, None, None)
            .unwrap();

        assert_eq!(stats.expected_frames, 0);
        assert_eq!(stats.frames_produced, 4);
        assert_eq!(stats.duration_secs, None);
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_failure_keeps_stderr_tail() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = crate::component::transcoder::write_fake_ffmpeg(
            dir.path(),
            r#"printf 'frame=1 time=00:00:05.00 bitrate=N/A speed=5.0x\r' >&2
echo 'boom' >&2
exit 1"#,
        );

        let transcoder = FfmpegTranscoder::new(&ffmpeg, 5, 4);
        let result = transcoder.extract(&source_file(dir.path()), dir.path(), Some(60.0), None);

        match result {
            Err(TranscodeError::ExitStatus { status, tail }) => {
                assert_eq!(status.code(), Some(1));
                assert!(tail.starts_with("frame=1 time=00:00:05.00"), "{tail}");
                assert!(tail.ends_with(" | boom"), "{tail}");
            }
            other => panic!("預期 ExitStatus，實際為 {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_success_without_frames() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("frames");
        fs::create_dir(&output_dir).unwrap();
        let ffmpeg = crate::component::transcoder::write_fake_ffmpeg(dir.path(), "exit 0");

        let transcoder = FfmpegTranscoder::new(&ffmpeg, 5, 4);
        let result = transcoder.extract(&source_file(dir.path()), &output_dir, Some(60.0), None);

        assert!(matches!(result, Err(TranscodeError::NoFrames(path)) if path == output_dir));
    }
}
