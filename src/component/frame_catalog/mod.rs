//! 影格整理
//!
//! 將 ffmpeg 輸出的 `img-000001.jpg` 依序改名為 10 位數、補零的秒數
//! （`(序號 - 1) * interval`），讓字典序與時間順序一致。

mod frame;

pub use frame::{Frame, FrameSequence};

use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

pub const FRAME_EXTENSION: &str = "jpg";
/// ffmpeg 輸出檔名前綴，對應 `img-%06d.jpg`
pub const FRAME_PREFIX: &str = "img-";

#[derive(Debug, Error)]
pub enum FrameCatalogError {
    #[error("I/O 錯誤 {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("無法辨識的影格檔名: {0}")]
    UnexpectedName(String),
    #[error("影格序號不連續：預期 {expected}，實際 {found}")]
    Gap { expected: u32, found: u32 },
    #[error("影格 {ordinal} 的時間戳 {timestamp} 不符合間隔")]
    Timestamp { ordinal: u32, timestamp: u64 },
    #[error("找不到任何影格: {0}")]
    Empty(PathBuf),
}

/// 影格在整理後的檔名
#[must_use]
pub fn frame_file_name(timestamp_secs: u64) -> String {
    format!("{timestamp_secs:010}.{FRAME_EXTENSION}")
}

/// 從 `img-000001.jpg` 取出 1 起算的序號
fn parse_sequence_number(file_name: &str) -> Option<u32> {
    let stem = file_name
        .strip_prefix(FRAME_PREFIX)?
        .strip_suffix(FRAME_EXTENSION)?
        .strip_suffix('.')?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse::<u32>().ok().filter(|n| *n >= 1)
}

fn list_frame_files(dir: &Path) -> Result<Vec<(u32, PathBuf)>, FrameCatalogError> {
    let mut numbered = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| FrameCatalogError::Io {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.into_path();
        let is_frame = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == FRAME_EXTENSION);
        if !is_frame {
            continue;
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let number =
            parse_sequence_number(&name).ok_or(FrameCatalogError::UnexpectedName(name))?;
        numbered.push((number, path));
    }

    numbered.sort_by_key(|(number, _)| *number);
    Ok(numbered)
}

/// 整理資料夾中的影格並回傳排序後的序列
pub fn normalize(dir: &Path, interval_secs: u32) -> Result<FrameSequence, FrameCatalogError> {
    let numbered = list_frame_files(dir)?;
    if numbered.is_empty() {
        return Err(FrameCatalogError::Empty(dir.to_path_buf()));
    }

    // 先確認沒有缺號，避免改名到一半才失敗
    for (index, (number, _)) in numbered.iter().enumerate() {
        let ordinal = number - 1;
        if ordinal as usize != index {
            return Err(FrameCatalogError::Gap {
                expected: index as u32,
                found: ordinal,
            });
        }
    }

    let mut frames = Vec::with_capacity(numbered.len());
    for (number, source) in numbered {
        let ordinal = number - 1;
        let timestamp_secs = u64::from(ordinal) * u64::from(interval_secs);
        let target = dir.join(frame_file_name(timestamp_secs));
        fs::rename(&source, &target).map_err(|source_err| FrameCatalogError::Io {
            path: source.clone(),
            source: source_err,
        })?;

        let size = fs::metadata(&target)
            .map_err(|e| FrameCatalogError::Io {
                path: target.clone(),
                source: e,
            })?
            .len();

        frames.push(Frame {
            ordinal,
            timestamp_secs,
            path: target,
            size,
        });
    }

    debug!("整理完成 {} 張影格: {}", frames.len(), dir.display());
    FrameSequence::new(frames, interval_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sequence_number() {
        assert_eq!(parse_sequence_number("img-000001.jpg"), Some(1));
        assert_eq!(parse_sequence_number("img-001234.jpg"), Some(1234));
        assert_eq!(parse_sequence_number("img-000000.jpg"), None);
        assert_eq!(parse_sequence_number("img-.jpg"), None);
        assert_eq!(parse_sequence_number("thumb-000001.jpg"), None);
        assert_eq!(parse_sequence_number("img-00a001.jpg"), None);
    }

    #[test]
    fn test_frame_file_name() {
        assert_eq!(frame_file_name(0), "0000000000.jpg");
        assert_eq!(frame_file_name(3605), "0000003605.jpg");
    }

    #[test]
    fn test_lexical_order_matches_timestamps() {
        let names: Vec<String> = [0u64, 5, 10, 95, 100, 1000]
            .iter()
            .map(|t| frame_file_name(*t))
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_normalize_renames_frames() {
        let dir = tempfile::tempdir().unwrap();
        for n in 1..=12 {
            fs::write(dir.path().join(format!("img-{n:06}.jpg")), vec![0u8; n]).unwrap();
        }
        fs::write(dir.path().join("ffmpeg.log"), "ignored").unwrap();

        let seq = normalize(dir.path(), 5).unwrap();
        assert_eq!(seq.len(), 12);

        for (i, frame) in seq.iter().enumerate() {
            assert_eq!(frame.ordinal as usize, i);
            assert_eq!(frame.timestamp_secs, i as u64 * 5);
            assert_eq!(frame.size, i as u64 + 1);
            assert_eq!(frame.path, dir.path().join(frame_file_name(i as u64 * 5)));
            assert!(frame.path.exists());
        }
        assert!(!dir.path().join("img-000001.jpg").exists());
    }

    #[test]
    fn test_normalize_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = normalize(dir.path(), 5).unwrap_err();
        assert!(matches!(err, FrameCatalogError::Empty(_)));
    }

    #[test]
    fn test_normalize_detects_gap() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("img-000001.jpg"), b"a").unwrap();
        fs::write(dir.path().join("img-000003.jpg"), b"c").unwrap();
        let err = normalize(dir.path(), 5).unwrap_err();
        assert!(matches!(err, FrameCatalogError::Gap { expected: 1, found: 2 }));
    }
}
