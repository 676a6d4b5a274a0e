mod ffprobe_info;
mod format;
mod path_validator;
mod tool_check;

pub use ffprobe_info::{VideoInfo, get_video_info};
pub use format::{format_time, human_readable_size};
pub use path_validator::{
    TempRootGuard, remove_directory_if_exists, reset_directory,
    validate_directory_exists,
};
pub use tool_check::{REQUIRED_TOOLS, check_required_tools};
