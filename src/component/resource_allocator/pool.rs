use super::nvidia::NvidiaProbe;
use super::probe::{Accelerator, AcceleratorProbe, detect_accelerator};
use super::vaapi::VaapiProbe;
use log::{debug, warn};

/// 硬體加速資源池
///
/// 啟動時建立一次，之後唯讀。`admit` 只觀察目前使用 GPU 的 ffmpeg 數量，
/// 不做任何保留：兩個工作可能同時通過檢查而短暫超過上限。
pub struct ResourcePool {
    device: Option<(Accelerator, Box<dyn AcceleratorProbe>)>,
    gpu_workers: usize,
    cpu_workers: usize,
}

impl ResourcePool {
    /// `device` 為偵測到的裝置與負責查詢它的偵測器，`None` 表示只有 CPU
    #[must_use]
    pub fn new(
        device: Option<(Accelerator, Box<dyn AcceleratorProbe>)>,
        gpu_workers: usize,
        cpu_workers: usize,
    ) -> Self {
        Self {
            device,
            gpu_workers,
            cpu_workers,
        }
    }

    /// 依序偵測 NVIDIA 與 AMD GPU
    #[must_use]
    pub fn detect(gpu_workers: usize, cpu_workers: usize) -> Self {
        let probes: Vec<Box<dyn AcceleratorProbe>> =
            vec![Box::new(NvidiaProbe), Box::new(VaapiProbe::default())];
        Self::new(detect_accelerator(probes), gpu_workers, cpu_workers)
    }

    #[must_use]
    pub fn cpu_only(gpu_workers: usize, cpu_workers: usize) -> Self {
        Self::new(None, gpu_workers, cpu_workers)
    }

    #[must_use]
    pub fn accelerator(&self) -> Option<&Accelerator> {
        self.device.as_ref().map(|(accelerator, _)| accelerator)
    }

    /// 觀察式准入檢查：通過時回傳此工作要使用的加速裝置
    ///
    /// CPU 工作者設為 0 時一律使用 GPU；查詢失敗時退回軟體解碼。
    #[must_use]
    pub fn admit(&self) -> Option<&Accelerator> {
        let (accelerator, probe) = self.device.as_ref()?;
        if self.cpu_workers == 0 {
            return Some(accelerator);
        }

        match probe.active_transcoders(accelerator) {
            Ok(active) => {
                debug!("GPU 上的 ffmpeg 數量: {active}/{}", self.gpu_workers);
                (active < self.gpu_workers).then_some(accelerator)
            }
            Err(e) => {
                warn!("無法查詢 {} GPU 使用狀況，改用 CPU: {e:#}", probe.vendor());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, bail};

    struct CountingProbe {
        active: Option<usize>,
    }

    impl AcceleratorProbe for CountingProbe {
        fn vendor(&self) -> &'static str {
            "TEST"
        }

        fn detect(&self) -> Result<Option<Accelerator>> {
            Ok(Some(Accelerator::Nvidia))
        }

        fn active_transcoders(&self, _: &Accelerator) -> Result<usize> {
            match self.active {
                Some(n) => Ok(n),
                None => bail!("query failed"),
            }
        }
    }

    fn pool(active: Option<usize>, gpu: usize, cpu: usize) -> ResourcePool {
        let probe: Box<dyn AcceleratorProbe> = Box::new(CountingProbe { active });
        ResourcePool::new(Some((Accelerator::Nvidia, probe)), gpu, cpu)
    }

    #[test]
    fn test_admit_below_limit() {
        assert_eq!(pool(Some(3), 4, 4).admit(), Some(&Accelerator::Nvidia));
    }

    #[test]
    fn test_deny_at_or_above_limit() {
        assert!(pool(Some(4), 4, 4).admit().is_none());
        assert!(pool(Some(9), 4, 1).admit().is_none());
    }

    #[test]
    fn test_admit_when_no_cpu_workers() {
        assert_eq!(pool(Some(9), 4, 0).admit(), Some(&Accelerator::Nvidia));
    }

    #[test]
    fn test_deny_when_query_fails() {
        assert!(pool(None, 4, 4).admit().is_none());
    }

    #[test]
    fn test_cpu_only_never_admits() {
        let pool = ResourcePool::cpu_only(4, 0);
        assert!(pool.admit().is_none());
        assert!(pool.accelerator().is_none());
    }
}
