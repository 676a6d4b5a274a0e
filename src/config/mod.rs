pub mod load;
pub mod types;

pub use load::{CONFIG_ERROR_EXIT_CODE, parse_error_exit_code};
pub use types::{BundlePaths, DEFAULT_LOCAL_MEDIA_PATH, DEFAULT_TMP_FOLDER, Settings};
