use anyhow::{Result, bail};
use log::debug;
use std::path::PathBuf;

/// 執行所需的外部工具
pub const REQUIRED_TOOLS: [&str; 2] = ["ffmpeg", "ffprobe"];

/// 確認外部工具存在於 PATH，回傳 ffmpeg 的完整路徑
pub fn check_required_tools() -> Result<PathBuf> {
    let mut ffmpeg_path = None;

    for tool in REQUIRED_TOOLS {
        match which::which(tool) {
            Ok(path) => {
                debug!("找到 {tool}: {}", path.display());
                if tool == "ffmpeg" {
                    ffmpeg_path = Some(path);
                }
            }
            Err(_) => bail!("{tool} not found. {tool} must be installed and available in PATH."),
        }
    }

    match ffmpeg_path {
        Some(path) => Ok(path),
        None => bail!("ffmpeg not found. ffmpeg must be installed and available in PATH."),
    }
}
