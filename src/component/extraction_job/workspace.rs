use log::{debug, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// 單一工作的暫存資料夾與輸出檔
///
/// 建立時清空並建立暫存資料夾；離開作用域時一律刪除暫存資料夾。
/// 若已開始寫入輸出檔但未呼叫 `commit`，輸出檔也會被刪除，
/// 不會留下寫到一半的 BIF。
pub struct JobWorkspace {
    tmp_dir: PathBuf,
    target: PathBuf,
    target_claimed: bool,
    committed: bool,
}

impl JobWorkspace {
    pub fn acquire(tmp_dir: &Path, target: &Path) -> io::Result<Self> {
        if tmp_dir.exists() {
            fs::remove_dir_all(tmp_dir)?;
        }
        fs::create_dir_all(tmp_dir)?;

        Ok(Self {
            tmp_dir: tmp_dir.to_path_buf(),
            target: target.to_path_buf(),
            target_claimed: false,
            committed: false,
        })
    }

    #[must_use]
    pub fn tmp_dir(&self) -> &Path {
        &self.tmp_dir
    }

    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// 即將寫入輸出檔，失敗時要負責刪除
    pub fn claim_target(&mut self) {
        self.target_claimed = true;
    }

    /// 輸出檔不是本工作寫的（例如已被其他程序建立），不可刪除
    pub fn release_target(&mut self) {
        self.target_claimed = false;
    }

    /// 輸出檔已完整寫入
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for JobWorkspace {
    fn drop(&mut self) {
        if self.target_claimed && !self.committed {
            match fs::remove_file(&self.target) {
                Ok(()) => debug!("已刪除未完成的輸出檔 {}", self.target.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("無法刪除未完成的輸出檔 {}: {e}", self.target.display()),
            }
        }

        match fs::remove_dir_all(&self.tmp_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("無法刪除暫存資料夾 {}: {e}", self.tmp_dir.display()),
        }
    }
}
