use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_LOCAL_MEDIA_PATH: &str =
    "/path_to/plex/Library/Application Support/Plex Media Server/Media";
pub const DEFAULT_TMP_FOLDER: &str = "/dev/shm/plex_generate_previews";

/// 執行設定
///
/// 每個選項都可以透過命令列或同名環境變數指定
#[derive(Debug, Clone, Parser)]
#[command(name = "plex-preview-generator")]
#[command(version, about = "Generate BIF scrub-bar preview thumbnails for a Plex media library")]
pub struct Settings {
    /// Plex 伺服器位址，例如 http://localhost:32400
    #[arg(long, env = "PLEX_URL", default_value = "")]
    pub plex_url: String,

    /// Plex 認證 token
    #[arg(long, env = "PLEX_TOKEN", default_value = "", hide_env_values = true)]
    pub plex_token: String,

    /// 預覽圖之間的間隔（秒）
    #[arg(long, env = "PLEX_BIF_FRAME_INTERVAL", default_value_t = 5,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub frame_interval: u32,

    /// 預覽圖品質（2-6，數字越小品質越高）
    #[arg(long, env = "THUMBNAIL_QUALITY", default_value_t = 4,
          value_parser = clap::value_parser!(u8).range(2..=6))]
    pub thumbnail_quality: u8,

    /// 本機 Plex Media 資料夾
    #[arg(long, env = "PLEX_LOCAL_MEDIA_PATH", default_value = DEFAULT_LOCAL_MEDIA_PATH)]
    pub local_media_path: PathBuf,

    /// 預覽圖生成用的暫存資料夾，啟動與結束時都會清空
    #[arg(long, env = "TMP_FOLDER", default_value = DEFAULT_TMP_FOLDER)]
    pub tmp_folder: PathBuf,

    /// Plex API 請求逾時（秒）
    #[arg(long, env = "PLEX_TIMEOUT", default_value_t = 60)]
    pub plex_timeout: u64,

    /// 本機看到的影片路徑前綴
    #[arg(long, env = "PLEX_LOCAL_VIDEOS_PATH_MAPPING", default_value = "")]
    pub local_videos_path_mapping: String,

    /// Plex 伺服器記錄的影片路徑前綴
    #[arg(long, env = "PLEX_VIDEOS_PATH_MAPPING", default_value = "")]
    pub videos_path_mapping: String,

    /// GPU 工作者數量
    #[arg(long, env = "GPU_THREADS", default_value_t = 4)]
    pub gpu_threads: usize,

    /// CPU 工作者數量
    #[arg(long, env = "CPU_THREADS", default_value_t = 4)]
    pub cpu_threads: usize,

    /// 只處理路徑包含此字串的影片
    pub path_filter: Option<String>,
}

/// 單一影片在 Plex bundle 中的路徑
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundlePaths {
    pub bundle_dir: PathBuf,
    pub indexes_dir: PathBuf,
    pub index_bif: PathBuf,
}
