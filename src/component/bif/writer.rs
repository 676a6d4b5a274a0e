use super::{BIF_MAGIC, BIF_VERSION, BifError, HEADER_SIZE, INDEX_ENTRY_SIZE, SENTINEL_ORDINAL};
use crate::component::frame_catalog::FrameSequence;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// 索引表中的一筆記錄
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub ordinal: u32,
    pub offset: u32,
}

/// 依影格大小計算索引表（含結尾標記）
///
/// 第一筆位移為 `64 + 8 * (N + 1)`，之後逐筆累加影格大小。
pub fn build_index_table(sizes: &[u64]) -> Result<Vec<IndexEntry>, BifError> {
    let entry_count = sizes.len() as u64 + 1;
    let mut offset = u64::from(HEADER_SIZE) + u64::from(INDEX_ENTRY_SIZE) * entry_count;
    let mut table = Vec::with_capacity(sizes.len() + 1);

    for (ordinal, size) in sizes.iter().enumerate() {
        table.push(IndexEntry {
            ordinal: u32::try_from(ordinal).map_err(|_| BifError::TooLarge)?,
            offset: u32::try_from(offset).map_err(|_| BifError::TooLarge)?,
        });
        offset += size;
    }

    table.push(IndexEntry {
        ordinal: SENTINEL_ORDINAL,
        offset: u32::try_from(offset).map_err(|_| BifError::TooLarge)?,
    });

    Ok(table)
}

fn write_header<W: Write>(writer: &mut W, frame_count: u32, interval_ms: u32) -> io::Result<()> {
    writer.write_all(&BIF_MAGIC)?;
    writer.write_all(&BIF_VERSION.to_le_bytes())?;
    writer.write_all(&frame_count.to_le_bytes())?;
    writer.write_all(&interval_ms.to_le_bytes())?;
    writer.write_all(&[0u8; (HEADER_SIZE - 20) as usize])
}

/// 依序寫出 header、索引表與影格資料，回傳寫入的總位元組數
pub fn write_bif<W: Write>(
    mut writer: W,
    frames: &FrameSequence,
    interval_secs: u32,
) -> Result<u64, BifError> {
    let sizes: Vec<u64> = frames.iter().map(|f| f.size).collect();
    let table = build_index_table(&sizes)?;
    let frame_count = u32::try_from(frames.len()).map_err(|_| BifError::TooLarge)?;
    let interval_ms = interval_secs.checked_mul(1000).ok_or(BifError::TooLarge)?;

    write_header(&mut writer, frame_count, interval_ms)?;
    for entry in &table {
        writer.write_all(&entry.ordinal.to_le_bytes())?;
        writer.write_all(&entry.offset.to_le_bytes())?;
    }

    for frame in frames.iter() {
        let mut source = File::open(&frame.path).map_err(|e| BifError::Io {
            path: frame.path.clone(),
            source: e,
        })?;
        let copied = io::copy(&mut source, &mut writer)?;
        if copied != frame.size {
            return Err(BifError::SizeMismatch {
                ordinal: frame.ordinal,
                expected: frame.size,
                actual: copied,
            });
        }
    }

    writer.flush()?;

    // 最後一筆索引即為檔案總長度
    Ok(table.last().map_or(0, |entry| u64::from(entry.offset)))
}

/// 將影格序列寫成 BIF 檔案
///
/// 目標檔案必須不存在；寫入失敗時留下的殘檔由呼叫端負責移除。
pub fn encode(frames: &FrameSequence, interval_secs: u32, out_path: &Path) -> Result<(), BifError> {
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(out_path)
        .map_err(|e| BifError::Io {
            path: out_path.to_path_buf(),
            source: e,
        })?;

    let mut writer = BufWriter::new(file);
    write_bif(&mut writer, frames, interval_secs)?;

    let file = writer.into_inner().map_err(|e| BifError::Stream(e.into_error()))?;
    file.sync_all()?;
    Ok(())
}
