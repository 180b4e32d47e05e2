use serde::{Deserialize, Serialize};

use crate::domain::{ImageDescriptor, StatusEvent};

/// Messages exchanged between the page agent, the background coordinator and
/// the status popup. Serialized as JSON objects tagged by `action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    DownloadImages {
        #[serde(default)]
        images: Vec<ImageDescriptor>,
    },
    Ping,
    /// Fire-and-forget broadcast, never answered
    DownloadStatus(StatusEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            message: None,
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            message: None,
        }
    }
}

/// Configuration for the HTTP fetch client
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("image-downloader/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
