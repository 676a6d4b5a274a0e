use super::writer::IndexEntry;
use super::{BIF_MAGIC, BIF_VERSION, BifError, HEADER_SIZE, INDEX_ENTRY_SIZE, SENTINEL_ORDINAL};
use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;

/// 已解析的 BIF header 與索引表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BifIndex {
    pub version: u32,
    pub interval_ms: u32,
    /// N 筆影格索引加上一筆結尾標記
    pub entries: Vec<IndexEntry>,
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32, BifError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

impl BifIndex {
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, BifError> {
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic)?;
        if magic != BIF_MAGIC {
            return Err(BifError::BadMagic);
        }

        let version = read_u32(reader)?;
        if version != BIF_VERSION {
            return Err(BifError::UnsupportedVersion(version));
        }
        let frame_count = read_u32(reader)?;
        let interval_ms = read_u32(reader)?;

        let mut reserved = [0u8; (HEADER_SIZE - 20) as usize];
        reader.read_exact(&mut reserved)?;

        let mut entries = Vec::with_capacity((frame_count as usize).min(1 << 16) + 1);
        for _ in 0..=frame_count {
            let ordinal = read_u32(reader)?;
            let offset = read_u32(reader)?;
            entries.push(IndexEntry { ordinal, offset });
        }

        let index = Self {
            version,
            interval_ms,
            entries,
        };
        index.validate()?;
        Ok(index)
    }

    fn validate(&self) -> Result<(), BifError> {
        let Some((sentinel, frames)) = self.entries.split_last() else {
            return Err(BifError::InvalidIndex("缺少結尾標記".to_string()));
        };
        if sentinel.ordinal != SENTINEL_ORDINAL {
            return Err(BifError::InvalidIndex("最後一筆不是結尾標記".to_string()));
        }

        let data_start =
            u64::from(HEADER_SIZE) + u64::from(INDEX_ENTRY_SIZE) * self.entries.len() as u64;
        if u64::from(self.entries[0].offset) != data_start {
            return Err(BifError::InvalidIndex(format!(
                "第一筆位移 {} 應為 {data_start}",
                self.entries[0].offset
            )));
        }

        for (i, pair) in self.entries.windows(2).enumerate() {
            if pair[1].offset < pair[0].offset {
                return Err(BifError::InvalidIndex(format!("位移在第 {i} 筆後遞減")));
            }
        }
        for (i, entry) in frames.iter().enumerate() {
            if entry.ordinal as usize != i {
                return Err(BifError::InvalidIndex(format!("第 {i} 筆序號為 {}", entry.ordinal)));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.entries.len() - 1
    }

    /// 第 `ordinal` 張影格在檔案中的位元組範圍
    #[must_use]
    pub fn frame_range(&self, ordinal: usize) -> Option<Range<u64>> {
        if ordinal >= self.frame_count() {
            return None;
        }
        let start = u64::from(self.entries[ordinal].offset);
        let end = u64::from(self.entries[ordinal + 1].offset);
        Some(start..end)
    }

    /// 檔案總長度（結尾標記的位移）
    #[must_use]
    pub fn end_offset(&self) -> u64 {
        self.entries.last().map_or(0, |e| u64::from(e.offset))
    }

    pub fn read_frame<R: Read + Seek>(
        &self,
        reader: &mut R,
        ordinal: usize,
    ) -> Result<Vec<u8>, BifError> {
        let range = self
            .frame_range(ordinal)
            .ok_or_else(|| BifError::InvalidIndex(format!("影格 {ordinal} 不存在")))?;
        reader.seek(SeekFrom::Start(range.start))?;
        let mut data = vec![0u8; (range.end - range.start) as usize];
        reader.read_exact(&mut data)?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::bif::build_index_table;
    use std::io::Cursor;

    fn sample_file(sizes: &[u64]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&BIF_MAGIC);
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&(sizes.len() as u32).to_le_bytes());
        buf.extend_from_slice(&5000u32.to_le_bytes());
        buf.extend_from_slice(&[0u8; 44]);
        for entry in build_index_table(sizes).unwrap() {
            buf.extend_from_slice(&entry.ordinal.to_le_bytes());
            buf.extend_from_slice(&entry.offset.to_le_bytes());
        }
        for (i, size) in sizes.iter().enumerate() {
            buf.extend(std::iter::repeat_n(i as u8 + 1, *size as usize));
        }
        buf
    }

    #[test]
    fn test_read_index_and_frames() {
        let bytes = sample_file(&[4, 2, 3]);
        let mut cursor = Cursor::new(bytes.clone());
        let index = BifIndex::read(&mut cursor).unwrap();

        assert_eq!(index.frame_count(), 3);
        assert_eq!(index.interval_ms, 5000);
        assert_eq!(index.end_offset(), bytes.len() as u64);
        assert_eq!(index.read_frame(&mut cursor, 1).unwrap(), vec![2, 2]);
        assert_eq!(index.read_frame(&mut cursor, 2).unwrap(), vec![3, 3, 3]);
        assert!(index.frame_range(3).is_none());
    }

    #[test]
    fn test_read_rejects_bad_magic() {
        let mut bytes = sample_file(&[1]);
        bytes[1] = b'X';
        let err = BifIndex::read(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, BifError::BadMagic));
    }

    #[test]
    fn test_read_rejects_truncated_index() {
        let bytes = sample_file(&[1, 1]);
        let err = BifIndex::read(&mut Cursor::new(&bytes[..70])).unwrap_err();
        assert!(matches!(err, BifError::Stream(_)));
    }
}
