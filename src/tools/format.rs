const SIZE_UNITS: [&str; 9] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB", "ZiB", "YiB"];

/// 將位元組數轉為易讀格式（1024 進位，保留兩位小數）
#[must_use]
pub fn human_readable_size(size_bytes: u64) -> String {
    if size_bytes == 0 {
        return "0 B".to_string();
    }

    let mut exponent = 0;
    let mut remaining = size_bytes;
    while remaining >= 1024 && exponent < SIZE_UNITS.len() - 1 {
        remaining /= 1024;
        exponent += 1;
    }
    let scaled = size_bytes as f64 / 1024f64.powi(exponent as i32);
    let rounded = (scaled * 100.0).round() / 100.0;
    format!("{rounded} {}", SIZE_UNITS[exponent])
}

/// 秒數轉為 H:MM:SS
#[must_use]
pub fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    format!("{h}:{m:02}:{s:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_readable_size() {
        assert_eq!(human_readable_size(0), "0 B");
        assert_eq!(human_readable_size(512), "512 B");
        assert_eq!(human_readable_size(1536), "1.5 KiB");
        assert_eq!(human_readable_size(3 * 1024 * 1024 * 1024), "3 GiB");
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00:00");
        assert_eq!(format_time(59.9), "0:00:59");
        assert_eq!(format_time(3725.0), "1:02:05");
        assert_eq!(format_time(-3.0), "0:00:00");
    }
}
