use anyhow::{Context, Result, bail};
use log::warn;
use std::fs;
use std::path::Path;

pub fn validate_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("路徑不存在: {}", path.display());
    }
    if !path.is_dir() {
        bail!("路徑不是資料夾: {}", path.display());
    }
    Ok(())
}

/// 清空並重建暫存根目錄
pub fn reset_directory(path: &Path) -> Result<()> {
    remove_directory_if_exists(path)?;
    fs::create_dir_all(path).with_context(|| format!("無法建立資料夾: {}", path.display()))
}

pub fn remove_directory_if_exists(path: &Path) -> Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)
            .with_context(|| format!("無法刪除資料夾: {}", path.display()))?;
    }
    Ok(())
}

/// 於 Drop 時清除暫存根目錄，確保程式結束時不留殘檔
pub struct TempRootGuard<'a> {
    path: &'a Path,
}

impl<'a> TempRootGuard<'a> {
    pub fn acquire(path: &'a Path) -> Result<Self> {
        reset_directory(path)?;
        Ok(Self { path })
    }
}

impl Drop for TempRootGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = remove_directory_if_exists(self.path) {
            warn!("無法清除暫存資料夾 {}: {e}", self.path.display());
        }
    }
}
