use crate::component::frame_catalog::FRAME_PREFIX;
use crate::component::resource_allocator::Accelerator;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// 預覽圖最大尺寸
pub const PREVIEW_WIDTH: u32 = 320;
pub const PREVIEW_HEIGHT: u32 = 240;

/// HDR 轉 SDR：線性化、hable tone-mapping（不降飽和）、再量化回 BT.709
const HDR_TONEMAP_FILTERS: &str = "zscale=t=linear:npl=100,\
format=gbrpf32le,\
zscale=p=bt709,\
tonemap=tonemap=hable:desat=0,\
zscale=t=bt709:m=bt709:r=tv,\
format=yuv420p";

pub struct FfmpegCommand {
    ffmpeg_path: PathBuf,
    source_path: PathBuf,
    output_dir: PathBuf,
    interval_secs: u32,
    quality: u8,
    hdr: bool,
    hardware: Option<Accelerator>,
}

impl FfmpegCommand {
    #[must_use]
    pub fn new(
        ffmpeg_path: &Path,
        source_path: &Path,
        output_dir: &Path,
        interval_secs: u32,
        quality: u8,
    ) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.to_path_buf(),
            source_path: source_path.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            interval_secs,
            quality,
            hdr: false,
            hardware: None,
        }
    }

    #[must_use]
    pub const fn with_hdr(mut self, hdr: bool) -> Self {
        self.hdr = hdr;
        self
    }

    /// 通過准入檢查時帶入加速裝置
    #[must_use]
    pub fn with_hardware(mut self, accelerator: Option<&Accelerator>) -> Self {
        self.hardware = accelerator.cloned();
        self
    }

    #[must_use]
    pub fn output_pattern(&self) -> PathBuf {
        self.output_dir.join(format!("{FRAME_PREFIX}%06d.jpg"))
    }

    /// 取樣頻率 1/interval，四捨五入到小數點後六位
    fn fps(&self) -> f64 {
        let fps = 1.0 / f64::from(self.interval_secs);
        (fps * 1_000_000.0).round() / 1_000_000.0
    }

    fn scale_filter(&self) -> String {
        let size = format!("w={PREVIEW_WIDTH}:h={PREVIEW_HEIGHT}:force_original_aspect_ratio=decrease");
        match self.hardware {
            Some(Accelerator::Vaapi { .. }) => format!("format=nv12|vaapi,hwupload,scale_vaapi={size}"),
            Some(Accelerator::Nvidia) | None => format!("scale={size}"),
        }
    }

    #[must_use]
    pub fn filter_chain(&self) -> String {
        let sample = format!("fps=fps={}:round=up", self.fps());
        if self.hdr {
            format!("{sample},{HDR_TONEMAP_FILTERS},{}", self.scale_filter())
        } else {
            format!("{sample},{}", self.scale_filter())
        }
    }

    fn hardware_args(&self) -> Vec<OsString> {
        match &self.hardware {
            Some(Accelerator::Nvidia) => vec!["-hwaccel".into(), "cuda".into()],
            Some(Accelerator::Vaapi { device }) => vec![
                "-hwaccel".into(),
                "vaapi".into(),
                "-vaapi_device".into(),
                device.clone().into_os_string(),
            ],
            None => Vec::new(),
        }
    }

    #[must_use]
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-loglevel".into(),
            "info".into(),
            "-skip_frame:v".into(),
            "nokey".into(),
        ];
        args.extend(self.hardware_args());
        args.extend([
            "-threads:0".into(),
            "1".into(),
            "-i".into(),
            self.source_path.clone().into_os_string(),
            "-an".into(),
            "-sn".into(),
            "-dn".into(),
            "-q:v".into(),
            self.quality.to_string().into(),
            "-vf".into(),
            self.filter_chain().into(),
            self.output_pattern().into_os_string(),
        ]);
        args
    }

    /// ffmpeg 放在自己的程序群組，終端機的 Ctrl-C 只送給本程式，執行中的抽取會跑完
    #[must_use]
    pub fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.args(self.args());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        cmd
    }
}
