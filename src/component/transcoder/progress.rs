//! ffmpeg 進度解析
//!
//! 每行同時出現 `time=HH:MM:SS.ff` 與 `speed=<n>x` 才視為進度行；
//! 進度整數百分比至少前進 1 才回報，以限制日誌量。

use regex::Regex;
use std::io::{self, BufRead};
use std::sync::LazyLock;

static TIME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"time=(\d{2}):(\d{2}):(\d{2}\.\d{2})").expect("Invalid regex")
});

static SPEED_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"speed=\s*([\d.]+)x").expect("Invalid regex"));

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSample {
    pub elapsed_secs: f64,
    pub speed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressReport {
    pub percent: u32,
    pub frames_generated: u64,
    pub expected_frames: u64,
    pub speed: f64,
}

/// 解析單行 ffmpeg 輸出
#[must_use]
pub fn parse_progress_line(line: &str) -> Option<ProgressSample> {
    let time = TIME_REGEX.captures(line)?;
    let speed = SPEED_REGEX.captures(line)?;

    let hours: f64 = time[1].parse().ok()?;
    let minutes: f64 = time[2].parse().ok()?;
    let seconds: f64 = time[3].parse().ok()?;

    Some(ProgressSample {
        elapsed_secs: hours * 3600.0 + minutes * 60.0 + seconds,
        speed: speed[1].parse().ok()?,
    })
}

/// 預期影格數：round(duration / interval)，長度未知時為 0
#[must_use]
pub fn expected_frame_count(duration_secs: Option<f64>, interval_secs: u32) -> u64 {
    match duration_secs {
        Some(d) if d > 0.0 && interval_secs > 0 => (d / f64::from(interval_secs)).round() as u64,
        _ => 0,
    }
}

pub struct ProgressMonitor {
    duration_secs: Option<f64>,
    interval_secs: u32,
    expected_frames: u64,
    last_percent: u32,
}

impl ProgressMonitor {
    #[must_use]
    pub fn new(duration_secs: Option<f64>, interval_secs: u32) -> Self {
        Self {
            duration_secs: duration_secs.filter(|d| *d > 0.0),
            interval_secs,
            expected_frames: expected_frame_count(duration_secs, interval_secs),
            last_percent: 0,
        }
    }

    #[must_use]
    pub const fn expected_frames(&self) -> u64 {
        self.expected_frames
    }

    /// 處理一行輸出，需要寫日誌時回傳進度
    pub fn observe(&mut self, line: &str) -> Option<ProgressReport> {
        let sample = parse_progress_line(line)?;
        let duration = self.duration_secs?;

        let percent = (sample.elapsed_secs / duration * 100.0).min(100.0) as u32;
        if percent < self.last_percent + 1 {
            return None;
        }
        self.last_percent = percent;

        Some(ProgressReport {
            percent,
            frames_generated: (sample.elapsed_secs / f64::from(self.interval_secs)) as u64,
            expected_frames: self.expected_frames,
            speed: sample.speed,
        })
    }
}

/// 逐行讀取，`\r` 與 `\n` 都視為換行（ffmpeg 的狀態列以 `\r` 覆寫）
pub fn for_each_line<R: BufRead>(mut reader: R, mut on_line: impl FnMut(&str)) -> io::Result<()> {
    let mut line = Vec::new();

    loop {
        let (used, eof) = {
            let available = reader.fill_buf()?;
            if available.is_empty() {
                (0, true)
            } else if let Some(pos) = available.iter().position(|b| *b == b'\n' || *b == b'\r') {
                line.extend_from_slice(&available[..pos]);
                if !line.is_empty() {
                    on_line(&String::from_utf8_lossy(&line));
                    line.clear();
                }
                (pos + 1, false)
            } else {
                line.extend_from_slice(available);
                (available.len(), false)
            }
        };

        if eof {
            break;
        }
        reader.consume(used);
    }

    if !line.is_empty() {
        on_line(&String::from_utf8_lossy(&line));
    }
    Ok(())
}
