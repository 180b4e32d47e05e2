pub mod data_url;
pub mod normalize;

pub use data_url::{is_data_url, DataImage};
pub use normalize::{clean_url, file_extension, generate_filename};

use std::time::{SystemTime, UNIX_EPOCH};

/// Longest base name kept in a generated filename
pub const MAX_BASENAME_LEN: usize = 50;

/// Get current Unix timestamp in milliseconds
pub fn get_timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Replace everything outside `[A-Za-z0-9._-]` with `_` and cap the length
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '_' | '-' => c,
            _ => '_',
        })
        .take(MAX_BASENAME_LEN)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp() {
        let ts = get_timestamp_millis();
        assert!(ts > 1_700_000_000_000); // Sanity check
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("test/file name"), "test_file_name");
        assert_eq!(sanitize_filename("normal-name.v2"), "normal-name.v2");
        assert_eq!(sanitize_filename("caf%C3%A9"), "caf_C3_A9");
        assert_eq!(sanitize_filename("élan"), "_lan");
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "a".repeat(80);
        assert_eq!(sanitize_filename(&long).len(), MAX_BASENAME_LEN);
    }
}
