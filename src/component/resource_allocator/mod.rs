//! GPU 資源分配
//!
//! 啟動時偵測一次可用的硬體加速裝置，之後每個工作開始前透過
//! `ResourcePool::admit` 決定是否走硬體解碼路徑。

mod nvidia;
mod pool;
mod probe;
mod vaapi;

pub use nvidia::NvidiaProbe;
pub use pool::ResourcePool;
pub use probe::{Accelerator, AcceleratorProbe, detect_accelerator};
pub use vaapi::VaapiProbe;
