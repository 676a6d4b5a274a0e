use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

/// HDR 傳輸特性（PQ 與 HLG）
const HDR_TRANSFERS: [&str; 2] = ["smpte2084", "arib-std-b67"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoInfo {
    /// 影片長度（秒），無法解析時為 None
    pub duration_seconds: Option<f64>,
    /// 視訊串流的 color_transfer
    pub color_transfer: Option<String>,
}

impl VideoInfo {
    #[must_use]
    pub fn is_hdr(&self) -> bool {
        self.color_transfer
            .as_deref()
            .is_some_and(|t| HDR_TRANSFERS.contains(&t))
    }
}

#[derive(Deserialize)]
struct FfprobeOutput {
    format: Option<FormatInfo>,
    streams: Option<Vec<StreamInfo>>,
}

#[derive(Deserialize)]
struct FormatInfo {
    duration: Option<String>,
}

#[derive(Deserialize)]
struct StreamInfo {
    codec_type: Option<String>,
    color_transfer: Option<String>,
    duration: Option<String>,
}

/// 使用 ffprobe 取得影片長度與傳輸特性
pub fn get_video_info(path: &Path) -> Result<VideoInfo> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .with_context(|| format!("無法執行 ffprobe: {}", path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("ffprobe 執行失敗: {stderr}");
    }

    parse_ffprobe_json(&String::from_utf8_lossy(&output.stdout))
}

fn parse_ffprobe_json(raw: &str) -> Result<VideoInfo> {
    let probe: FfprobeOutput = serde_json::from_str(raw).context("無法解析 ffprobe 輸出")?;

    let video_stream = probe.streams.as_ref().and_then(|streams| {
        streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
    });

    // 優先採用視訊串流長度，其次為容器長度
    let duration_seconds = video_stream
        .and_then(|s| s.duration.as_ref())
        .or_else(|| probe.format.as_ref().and_then(|f| f.duration.as_ref()))
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0);

    Ok(VideoInfo {
        duration_seconds,
        color_transfer: video_stream.and_then(|s| s.color_transfer.clone()),
    })
}
