use serde::{Deserialize, Serialize};

/// An image as seen at the trigger site (page drag or context menu).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDescriptor {
    pub src: String,
    #[serde(default)]
    pub alt: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

impl ImageDescriptor {
    pub fn from_src(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            ..Default::default()
        }
    }
}

/// One entry of the persisted `recentDownloads` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub url: String,
    pub filename: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Downloading,
    Success,
    Error,
}

impl DownloadStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, DownloadStatus::Success | DownloadStatus::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub status: DownloadStatus,
    pub message: String,
    #[serde(default)]
    pub url: String,
}

impl StatusEvent {
    pub fn new(status: DownloadStatus, message: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            url: url.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn descriptor_fills_missing_fields() {
        let desc: ImageDescriptor =
            serde_json::from_value(json!({ "src": "https://x.com/a.png" })).unwrap();
        assert_eq!(desc, ImageDescriptor::from_src("https://x.com/a.png"));
    }

    #[test]
    fn status_uses_lowercase_names() {
        let event = StatusEvent::new(DownloadStatus::Success, "Download completed", "u");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["status"], "success");
        assert!(DownloadStatus::Error.is_terminal());
        assert!(!DownloadStatus::Downloading.is_terminal());
    }
}
