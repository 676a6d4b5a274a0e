//! BIF 預覽圖容器
//!
//! 檔案結構（整數皆為 little-endian）：
//! - 0..8：魔術數字
//! - 8..12：版本（0）
//! - 12..16：影格數 N
//! - 16..20：間隔（毫秒）
//! - 20..64：保留，填 0
//! - 64..：N+1 筆索引（影格序號、檔案內位移），最後一筆為結尾標記
//! - 之後依序串接所有影格資料

mod reader;
mod writer;

pub use reader::BifIndex;
pub use writer::{IndexEntry, build_index_table, encode, write_bif};

use std::path::PathBuf;
use thiserror::Error;

pub const BIF_MAGIC: [u8; 8] = [0x89, 0x42, 0x49, 0x46, 0x0d, 0x0a, 0x1a, 0x0a];
pub const BIF_VERSION: u32 = 0;
pub const HEADER_SIZE: u32 = 64;
pub const INDEX_ENTRY_SIZE: u32 = 8;
/// 結尾標記的序號欄位
pub const SENTINEL_ORDINAL: u32 = 0xFFFF_FFFF;

#[derive(Debug, Error)]
pub enum BifError {
    #[error("I/O 錯誤 {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("容器讀寫失敗: {0}")]
    Stream(#[from] std::io::Error),
    #[error("容器超過 4 GiB 位移上限")]
    TooLarge,
    #[error("影格 {ordinal} 大小不符：索引記錄 {expected} bytes，實際 {actual} bytes")]
    SizeMismatch {
        ordinal: u32,
        expected: u64,
        actual: u64,
    },
    #[error("不是 BIF 檔案")]
    BadMagic,
    #[error("不支援的 BIF 版本: {0}")]
    UnsupportedVersion(u32),
    #[error("索引表無效: {0}")]
    InvalidIndex(String),
}
