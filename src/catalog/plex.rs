use super::xml::{parse_item_keys, parse_media_parts, parse_sections};
use super::{LibrarySection, MediaCatalog, MediaItem, SectionKind};
use anyhow::{Context, Result, bail};
use log::debug;
use reqwest::blocking::Client;
use std::time::Duration;

/// Plex 的 episode 類型代碼
const EPISODE_TYPE: &str = "4";

pub struct PlexCatalog {
    client: Client,
    base_url: String,
    token: String,
}

impl PlexCatalog {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        // 自架伺服器常使用自簽憑證
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .build()
            .context("無法建立 HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Plex 請求: {url}");

        let response = self
            .client
            .get(&url)
            .query(query)
            .header("X-Plex-Token", &self.token)
            .header("Accept", "application/xml")
            .send()
            .with_context(|| format!("Plex 請求失敗: {url}"))?
            .error_for_status()
            .with_context(|| format!("Plex 回傳錯誤: {url}"))?;

        response
            .text()
            .with_context(|| format!("無法讀取 Plex 回應: {url}"))
    }
}

impl MediaCatalog for PlexCatalog {
    fn sections(&self) -> Result<Vec<LibrarySection>> {
        parse_sections(&self.get("/library/sections", &[])?)
    }

    fn item_keys(&self, section: &LibrarySection) -> Result<Vec<String>> {
        let path = format!("/library/sections/{}/all", section.key);
        let xml = match section.kind {
            SectionKind::Movie => self.get(&path, &[])?,
            SectionKind::Show => self.get(&path, &[("type", EPISODE_TYPE)])?,
            SectionKind::Unsupported => bail!("不支援的媒體庫類型: {}", section.title),
        };
        parse_item_keys(&xml)
    }

    fn media_parts(&self, item_key: &str) -> Result<Vec<MediaItem>> {
        let xml = self.get(&format!("{item_key}/tree"), &[])?;
        parse_media_parts(item_key, &xml)
    }
}
