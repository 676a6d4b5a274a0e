use super::{LibrarySection, MediaItem, SectionKind};
use anyhow::{Context, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;

/// 讀取所有指定名稱元素的屬性（同時處理開始標籤與自閉合標籤）
fn collect_elements(xml: &str, element: &[u8]) -> Result<Vec<HashMap<String, String>>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut elements = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e) | Event::Empty(ref e)) => {
                if e.name().as_ref() == element {
                    elements.push(read_attributes(e, &reader));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("XML 解析錯誤，位置 {}", reader.buffer_position())
                });
            }
        }
        buf.clear();
    }

    Ok(elements)
}

fn read_attributes(e: &BytesStart<'_>, reader: &Reader<&[u8]>) -> HashMap<String, String> {
    e.attributes()
        .flatten()
        .filter_map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            attr.decode_and_unescape_value(reader)
                .ok()
                .map(|value| (key, value.to_string()))
        })
        .collect()
}

/// 解析 `/library/sections`
pub fn parse_sections(xml: &str) -> Result<Vec<LibrarySection>> {
    Ok(collect_elements(xml, b"Directory")?
        .into_iter()
        .filter_map(|mut attrs| {
            Some(LibrarySection {
                key: attrs.remove("key")?,
                title: attrs.remove("title").unwrap_or_default(),
                kind: SectionKind::from_plex_type(attrs.get("type").map_or("", String::as_str)),
            })
        })
        .collect())
}

/// 解析媒體庫搜尋結果中的項目鍵值
pub fn parse_item_keys(xml: &str) -> Result<Vec<String>> {
    Ok(collect_elements(xml, b"Video")?
        .into_iter()
        .filter_map(|mut attrs| attrs.remove("key"))
        .collect())
}

/// 解析 `<item>/tree`，沒有雜湊值的檔案不需要產生預覽圖
pub fn parse_media_parts(item_key: &str, xml: &str) -> Result<Vec<MediaItem>> {
    Ok(collect_elements(xml, b"MediaPart")?
        .into_iter()
        .filter_map(|mut attrs| {
            let hash = attrs.remove("hash").filter(|h| !h.is_empty())?;
            let file = attrs.remove("file")?;
            let duration_seconds = attrs
                .get("duration")
                .and_then(|d| d.parse::<f64>().ok())
                .map(|ms| ms / 1000.0);

            Some(MediaItem {
                item_key: item_key.to_string(),
                file,
                hash,
                duration_seconds,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sections() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<MediaContainer size="3">
  <Directory key="1" type="movie" title="Movies"><Location id="1" path="/data/movies"/></Directory>
  <Directory key="2" type="show" title="TV Shows"/>
  <Directory key="3" type="artist" title="Music"/>
</MediaContainer>"#;
        let sections = parse_sections(xml).unwrap();
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].kind, SectionKind::Movie);
        assert_eq!(sections[1].title, "TV Shows");
        assert_eq!(sections[1].kind, SectionKind::Show);
        assert_eq!(sections[2].kind, SectionKind::Unsupported);
    }

    #[test]
    fn test_parse_item_keys() {
        let xml = r#"<MediaContainer>
  <Video ratingKey="10" key="/library/metadata/10" type="episode" title="Pilot"><Media/></Video>
  <Video ratingKey="11" key="/library/metadata/11" type="episode" title="Two"/>
</MediaContainer>"#;
        let keys = parse_item_keys(xml).unwrap();
        assert_eq!(keys, vec!["/library/metadata/10", "/library/metadata/11"]);
    }

    #[test]
    fn test_parse_media_parts_skips_missing_hash() {
        let xml = r#"<MediaContainer>
  <MetadataItem id="10">
    <MediaItem id="20">
      <MediaPart id="30" hash="0a1b2c3d" file="/data/Movies/A &amp; B.mkv" duration="7200000"/>
      <MediaPart id="31" file="/data/Movies/nohash.mkv"/>
    </MediaItem>
  </MetadataItem>
</MediaContainer>"#;
        let parts = parse_media_parts("/library/metadata/10", xml).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].hash, "0a1b2c3d");
        assert_eq!(parts[0].file, "/data/Movies/A & B.mkv");
        assert_eq!(parts[0].duration_seconds, Some(7200.0));
        assert_eq!(parts[0].item_key, "/library/metadata/10");
    }

    #[test]
    fn test_parse_malformed_xml() {
        assert!(parse_item_keys("<MediaContainer><Video key=\"1\"></Other>").is_err());
    }
}
