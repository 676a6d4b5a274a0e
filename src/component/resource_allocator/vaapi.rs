use super::probe::{Accelerator, AcceleratorProbe, is_ffmpeg_process};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

const AMD_VENDOR_ID: &str = "0x1002";

/// 透過 sysfs 偵測 AMD GPU，並以 VAAPI render node 作為裝置
pub struct VaapiProbe {
    drm_class_dir: PathBuf,
    dri_dir: PathBuf,
}

impl Default for VaapiProbe {
    fn default() -> Self {
        Self::new("/sys/class/drm", "/dev/dri")
    }
}

impl VaapiProbe {
    #[must_use]
    pub fn new(drm_class_dir: impl Into<PathBuf>, dri_dir: impl Into<PathBuf>) -> Self {
        Self {
            drm_class_dir: drm_class_dir.into(),
            dri_dir: dri_dir.into(),
        }
    }

    fn has_amd_card(&self) -> Result<bool> {
        let entries = fs::read_dir(&self.drm_class_dir)
            .with_context(|| format!("無法讀取 {}", self.drm_class_dir.display()))?;

        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            // card0-HDMI-A-1 之類是顯示輸出，不是 GPU
            if !name.starts_with("card") || name.contains('-') {
                continue;
            }
            let vendor = fs::read_to_string(entry.path().join("device").join("vendor"))
                .unwrap_or_default();
            if vendor.trim().eq_ignore_ascii_case(AMD_VENDOR_ID) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn first_render_node(&self) -> Option<PathBuf> {
        let mut nodes: Vec<PathBuf> = fs::read_dir(&self.dri_dir)
            .ok()?
            .flatten()
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("renderD"))
            .map(|entry| entry.path())
            .collect();
        nodes.sort();
        nodes.into_iter().next()
    }
}

/// 計算使用指定 render node 的 ffmpeg 程序
fn count_device_users(
    processes: impl Iterator<Item = (String, Vec<String>)>,
    device: &Path,
) -> usize {
    let device = device.to_string_lossy();
    processes
        .filter(|(name, cmd)| {
            is_ffmpeg_process(name) && cmd.iter().any(|arg| arg.contains(device.as_ref()))
        })
        .count()
}

impl AcceleratorProbe for VaapiProbe {
    fn vendor(&self) -> &'static str {
        "AMD"
    }

    fn detect(&self) -> Result<Option<Accelerator>> {
        if !self.has_amd_card()? {
            return Ok(None);
        }
        Ok(self
            .first_render_node()
            .map(|device| Accelerator::Vaapi { device }))
    }

    fn active_transcoders(&self, accelerator: &Accelerator) -> Result<usize> {
        let Accelerator::Vaapi { device } = accelerator else {
            return Ok(0);
        };

        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
        );

        let processes = system.processes().values().map(|process| {
            (
                process.name().to_string_lossy().to_string(),
                process
                    .cmd()
                    .iter()
                    .map(|arg| arg.to_string_lossy().to_string())
                    .collect(),
            )
        });
        Ok(count_device_users(processes, device))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_sysfs(vendor: &str) -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        let card = root.path().join("drm").join("card0").join("device");
        fs::create_dir_all(&card).unwrap();
        fs::write(card.join("vendor"), format!("{vendor}\n")).unwrap();
        fs::create_dir_all(root.path().join("drm").join("card0-HDMI-A-1")).unwrap();

        let dri = root.path().join("dri");
        fs::create_dir_all(&dri).unwrap();
        fs::write(dri.join("card0"), "").unwrap();
        fs::write(dri.join("renderD129"), "").unwrap();
        fs::write(dri.join("renderD128"), "").unwrap();
        root
    }

    #[test]
    fn test_detect_amd_render_node() {
        let root = fake_sysfs("0x1002");
        let probe = VaapiProbe::new(root.path().join("drm"), root.path().join("dri"));
        assert_eq!(
            probe.detect().unwrap(),
            Some(Accelerator::Vaapi { device: root.path().join("dri").join("renderD128") })
        );
    }

    #[test]
    fn test_detect_ignores_other_vendors() {
        let root = fake_sysfs("0x10de");
        let probe = VaapiProbe::new(root.path().join("drm"), root.path().join("dri"));
        assert_eq!(probe.detect().unwrap(), None);
    }

    #[test]
    fn test_detect_missing_sysfs_is_error() {
        let root = tempfile::tempdir().unwrap();
        let probe = VaapiProbe::new(root.path().join("missing"), root.path().join("dri"));
        assert!(probe.detect().is_err());
    }

    #[test]
    fn test_count_device_users() {
        let device = Path::new("/dev/dri/renderD128");
        let processes: Vec<(String, Vec<String>)> = vec![
            (
                "ffmpeg".to_string(),
                vec!["ffmpeg".into(), "-vaapi_device".into(), "/dev/dri/renderD128".into()],
            ),
            ("ffmpeg".to_string(), vec!["ffmpeg".into(), "-i".into(), "a.mkv".into()]),
            ("vainfo".to_string(), vec!["vainfo".into(), "/dev/dri/renderD128".into()]),
        ];
        assert_eq!(count_device_users(processes.into_iter(), device), 1);
    }
}
