//! 媒體庫目錄
//!
//! 列舉媒體庫並取得每部影片的內容雜湊與檔案路徑。
//! `MediaCatalog` 是與外部服務之間的邊界，`PlexCatalog` 為其 HTTP 實作。

mod plex;
mod xml;

pub use plex::PlexCatalog;
pub use xml::{parse_item_keys, parse_media_parts, parse_sections};

use anyhow::Result;
use std::fmt;

/// 媒體庫類型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Movie,
    Show,
    Unsupported,
}

impl SectionKind {
    #[must_use]
    pub fn from_plex_type(raw: &str) -> Self {
        match raw {
            "movie" => Self::Movie,
            "show" => Self::Show,
            _ => Self::Unsupported,
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movie => write!(f, "movie"),
            Self::Show => write!(f, "episode"),
            Self::Unsupported => write!(f, "unsupported"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibrarySection {
    pub key: String,
    pub title: String,
    pub kind: SectionKind,
}

/// 單一媒體檔案（Plex 的 MediaPart）
///
/// 於整次執行期間不會變動
#[derive(Debug, Clone, PartialEq)]
pub struct MediaItem {
    /// 所屬項目的目錄鍵值
    pub item_key: String,
    /// Plex 記錄的檔案路徑（尚未套用路徑對應）
    pub file: String,
    /// 內容雜湊，決定 bundle 位置
    pub hash: String,
    /// 長度（秒），目錄未提供時為 None
    pub duration_seconds: Option<f64>,
}

pub trait MediaCatalog: Send + Sync {
    fn sections(&self) -> Result<Vec<LibrarySection>>;

    /// 取得媒體庫中所有項目的鍵值（電影或劇集單集）
    fn item_keys(&self, section: &LibrarySection) -> Result<Vec<String>>;

    /// 取得項目下所有具備雜湊值的檔案
    fn media_parts(&self, item_key: &str) -> Result<Vec<MediaItem>>;
}
