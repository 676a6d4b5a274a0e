use super::probe::{Accelerator, AcceleratorProbe, is_ffmpeg_process};
use anyhow::{Context, Result, bail};
use std::process::Command;

const NVIDIA_SMI: &str = "nvidia-smi";

/// 透過 nvidia-smi 偵測 NVIDIA GPU
#[derive(Debug, Default)]
pub struct NvidiaProbe;

impl NvidiaProbe {
    fn run(args: &[&str]) -> Result<String> {
        let output = Command::new(NVIDIA_SMI)
            .args(args)
            .output()
            .with_context(|| format!("無法執行 {NVIDIA_SMI}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{NVIDIA_SMI} 執行失敗: {}", stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// `nvidia-smi --list-gpus` 輸出中的 GPU 數量
fn count_gpus(list_output: &str) -> usize {
    list_output
        .lines()
        .filter(|line| line.trim_start().starts_with("GPU "))
        .count()
}

/// `--query-compute-apps=process_name` 輸出中的 ffmpeg 數量
fn count_ffmpeg_apps(query_output: &str) -> usize {
    query_output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| is_ffmpeg_process(line))
        .count()
}

impl AcceleratorProbe for NvidiaProbe {
    fn vendor(&self) -> &'static str {
        "NVIDIA"
    }

    fn detect(&self) -> Result<Option<Accelerator>> {
        let output = Self::run(&["--list-gpus"])?;
        if count_gpus(&output) > 0 {
            Ok(Some(Accelerator::Nvidia))
        } else {
            Ok(None)
        }
    }

    fn active_transcoders(&self, _accelerator: &Accelerator) -> Result<usize> {
        let output = Self::run(&["--query-compute-apps=process_name", "--format=csv,noheader"])?;
        Ok(count_ffmpeg_apps(&output))
    }
}
