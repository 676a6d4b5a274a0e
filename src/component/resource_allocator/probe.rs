use anyhow::Result;
use log::{info, warn};
use std::fmt;
use std::path::PathBuf;

/// 偵測到的硬體加速裝置；沒有裝置時整個 `Option<Accelerator>` 為 `None`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accelerator {
    Nvidia,
    /// AMD GPU，透過 VAAPI render node 存取
    Vaapi { device: PathBuf },
}

impl fmt::Display for Accelerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nvidia => write!(f, "NVIDIA"),
            Self::Vaapi { device } => write!(f, "AMD {}", device.display()),
        }
    }
}

/// 單一 GPU 廠商的偵測與使用量查詢
///
/// 偵測失敗（例如工具或驅動不存在）只代表該廠商不存在，不會中止程式。
pub trait AcceleratorProbe: Send + Sync {
    fn vendor(&self) -> &'static str;

    /// 偵測此廠商的 GPU，`Ok(None)` 表示不存在
    fn detect(&self) -> Result<Option<Accelerator>>;

    /// 目前正在使用此 GPU 的 ffmpeg 程序數量
    fn active_transcoders(&self, accelerator: &Accelerator) -> Result<usize>;
}

/// 依序嘗試每個偵測器，回傳第一個找到的裝置與其偵測器
pub fn detect_accelerator(
    probes: Vec<Box<dyn AcceleratorProbe>>,
) -> Option<(Accelerator, Box<dyn AcceleratorProbe>)> {
    for probe in probes {
        match probe.detect() {
            Ok(Some(accelerator)) => {
                info!("偵測到 {} GPU: {accelerator}", probe.vendor());
                return Some((accelerator, probe));
            }
            Ok(None) => {
                info!("未偵測到 {} GPU", probe.vendor());
            }
            Err(e) => {
                warn!("{} GPU 偵測失敗，視為不存在: {e:#}", probe.vendor());
            }
        }
    }

    warn!("未偵測到 GPU，全部使用 CPU 解碼");
    None
}

/// 判斷程序名稱或路徑是否為 ffmpeg
pub(crate) fn is_ffmpeg_process(name: &str) -> bool {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    base.trim().to_lowercase().starts_with("ffmpeg")
}
