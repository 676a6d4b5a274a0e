use super::FrameCatalogError;
use std::path::PathBuf;

/// 擷取出的單一影格
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// 從 0 開始的連續序號
    pub ordinal: u32,
    /// ordinal × interval（秒）
    pub timestamp_secs: u64,
    pub path: PathBuf,
    pub size: u64,
}

/// 依序號排序、無缺號的影格序列
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameSequence {
    frames: Vec<Frame>,
}

impl FrameSequence {
    /// 排序並驗證序號為 `0..N` 且時間戳為 `ordinal * interval`
    pub fn new(mut frames: Vec<Frame>, interval_secs: u32) -> Result<Self, FrameCatalogError> {
        frames.sort_by_key(|f| f.ordinal);

        for (expected, frame) in frames.iter().enumerate() {
            if frame.ordinal as usize != expected {
                return Err(FrameCatalogError::Gap {
                    expected: expected as u32,
                    found: frame.ordinal,
                });
            }
            let timestamp = u64::from(frame.ordinal) * u64::from(interval_secs);
            if frame.timestamp_secs != timestamp {
                return Err(FrameCatalogError::Timestamp {
                    ordinal: frame.ordinal,
                    timestamp: frame.timestamp_secs,
                });
            }
        }

        Ok(Self { frames })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.frames.iter().map(|f| f.size).sum()
    }
}
