use crate::config::types::{BundlePaths, Settings};
use crate::tools::validate_directory_exists;
use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use std::time::Duration;

const LOCALHOST_DIR: &str = "localhost";

/// 設定缺少或無效時的結束碼
pub const CONFIG_ERROR_EXIT_CODE: i32 = 1;

/// 命令列或環境變數解析失敗時的結束碼
///
/// `--help`/`--version` 維持 0，其餘（包含超出範圍或無法解析的值）一律視為設定錯誤。
#[must_use]
pub fn parse_error_exit_code(err: &clap::Error) -> i32 {
    if err.exit_code() == 0 {
        0
    } else {
        CONFIG_ERROR_EXIT_CODE
    }
}

impl Settings {
    /// 檢查必要設定，任何錯誤都會使程式以代碼 1 結束
    pub fn validate(&self) -> Result<()> {
        validate_directory_exists(&self.local_media_path).with_context(|| {
            format!(
                "{} does not exist, please edit PLEX_LOCAL_MEDIA_PATH environment variable",
                self.local_media_path.display()
            )
        })?;

        if !self.local_media_path.join(LOCALHOST_DIR).is_dir() {
            bail!(
                "You set PLEX_LOCAL_MEDIA_PATH to \"{}\". There should be a folder called \"localhost\" \
                 in that directory but it does not exist which suggests you haven't mapped it correctly.",
                self.local_media_path.display()
            );
        }

        if self.plex_url.trim().is_empty() {
            bail!("Please set the PLEX_URL environment variable");
        }

        if self.plex_token.trim().is_empty() {
            bail!("Please set the PLEX_TOKEN environment variable");
        }

        if self.worker_count() == 0 {
            bail!("GPU_THREADS and CPU_THREADS cannot both be 0");
        }

        Ok(())
    }

    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.gpu_threads + self.cpu_threads
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.plex_timeout)
    }

    /// 依內容雜湊計算 bundle 路徑：`localhost/<hash[0]>/<hash[1..]>.bundle`
    #[must_use]
    pub fn bundle_paths(&self, hash: &str) -> Option<BundlePaths> {
        let first = hash.chars().next()?;
        let rest = &hash[first.len_utf8()..];

        let bundle_dir = self
            .local_media_path
            .join(LOCALHOST_DIR)
            .join(first.to_string())
            .join(format!("{rest}.bundle"));
        let indexes_dir = bundle_dir.join("Contents").join("Indexes");
        let index_bif = indexes_dir.join("index-sd.bif");

        Some(BundlePaths {
            bundle_dir,
            indexes_dir,
            index_bif,
        })
    }

    /// 每個工作各自擁有的暫存資料夾
    #[must_use]
    pub fn job_tmp_dir(&self, hash: &str) -> PathBuf {
        self.tmp_folder.join(hash)
    }

    /// 將 Plex 記錄的路徑轉換為本機路徑
    #[must_use]
    pub fn map_source_path(&self, file: &str) -> PathBuf {
        let remote = self.videos_path_mapping.as_str();
        let local = self.local_videos_path_mapping.as_str();

        if remote.is_empty() || remote == local {
            return PathBuf::from(file);
        }

        match file.strip_prefix(remote) {
            Some(rest) => PathBuf::from(format!("{local}{rest}")),
            None => PathBuf::from(file),
        }
    }

    /// 影片路徑是否符合命令列給定的過濾字串
    #[must_use]
    pub fn matches_filter(&self, file: &str) -> bool {
        self.path_filter
            .as_deref()
            .is_none_or(|filter| file.contains(filter))
    }
}
