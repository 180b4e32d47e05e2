use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::api::{Request, Response};
use crate::application::DownloadCoordinator;
use crate::domain::ImageDescriptor;

/// Failure reported by the host messaging layer itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The host delivered an error instead of a response
    #[error("{0}")]
    Runtime(String),

    /// The send call could not even be issued
    #[error("{0}")]
    Dispatch(String),
}

/// Page-side view of the extension runtime.
#[async_trait]
pub trait RuntimeMessenger: Send + Sync {
    /// False once the extension has been reloaded or removed under the page
    fn is_context_valid(&self) -> bool;

    async fn send_message(&self, request: Request) -> Result<Option<Response>, SendError>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Extension context invalidated - please reload the page")]
    ContextInvalidated,

    #[error("Extension context lost - please reload the extension and refresh this page")]
    ContextLost,

    #[error("Message timeout - background script not responding")]
    Timeout,

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Message sending failed: {0}")]
    Dispatch(String),

    #[error("No response from background script - extension may need to be reloaded")]
    NoResponse,

    #[error("{0}")]
    Rejected(String),
}

fn classify_runtime_error(message: &str) -> TransportError {
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("receiving end does not exist")
        || lowered.contains("extension context invalidated")
    {
        TransportError::ContextLost
    } else {
        TransportError::Runtime(message.to_string())
    }
}

/// Ask the background side to download one image, waiting at most `timeout`.
///
/// A timeout only fails the wait; a download the host already accepted keeps going.
pub async fn request_download(
    messenger: &dyn RuntimeMessenger,
    image: ImageDescriptor,
    timeout: Duration,
) -> Result<(), TransportError> {
    if !messenger.is_context_valid() {
        return Err(TransportError::ContextInvalidated);
    }

    let request = Request::DownloadImages {
        images: vec![image],
    };
    let response = match tokio::time::timeout(timeout, messenger.send_message(request)).await {
        Err(_) => return Err(TransportError::Timeout),
        Ok(Err(SendError::Runtime(message))) => return Err(classify_runtime_error(&message)),
        Ok(Err(SendError::Dispatch(message))) => return Err(TransportError::Dispatch(message)),
        Ok(Ok(None)) => return Err(TransportError::NoResponse),
        Ok(Ok(Some(response))) => response,
    };

    if response.success {
        Ok(())
    } else {
        Err(TransportError::Rejected(
            response
                .error
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| "Download failed".to_string()),
        ))
    }
}

/// Delivers page messages straight to an in-process coordinator.
pub struct CoordinatorMessenger {
    coordinator: DownloadCoordinator,
    valid: AtomicBool,
}

impl CoordinatorMessenger {
    pub fn new(coordinator: DownloadCoordinator) -> Self {
        Self {
            coordinator,
            valid: AtomicBool::new(true),
        }
    }

    /// Simulates the extension being reloaded under a live page.
    pub fn invalidate(&self) {
        self.valid.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl RuntimeMessenger for CoordinatorMessenger {
    fn is_context_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }

    async fn send_message(&self, request: Request) -> Result<Option<Response>, SendError> {
        if !self.is_context_valid() {
            return Err(SendError::Runtime(
                "Could not establish connection. Receiving end does not exist.".to_string(),
            ));
        }
        Ok(self.coordinator.handle_message(request).await)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{Script, ScriptedMessenger};
    use super::*;
    use crate::application::CoordinatorSettings;
    use crate::host::memory::{MemoryBlobRegistry, MemoryStore, MenuRegistry};
    use crate::host::{DownloadId, DownloadRequest, HostDownloader, HostError};
    use std::sync::Arc;

    async fn run(valid: bool, script: Script) -> Result<(), TransportError> {
        let messenger = ScriptedMessenger::new(valid, script);
        request_download(
            &messenger,
            ImageDescriptor::from_src("https://x.com/a.png"),
            Duration::from_secs(5),
        )
        .await
    }

    #[tokio::test]
    async fn maps_responses() {
        assert_eq!(run(true, Script::Reply(Some(Response::ok()))).await, Ok(()));
        assert_eq!(
            run(true, Script::Reply(None)).await,
            Err(TransportError::NoResponse)
        );
        assert_eq!(
            run(true, Script::Reply(Some(Response::failure("Image 1 failed")))).await,
            Err(TransportError::Rejected("Image 1 failed".into()))
        );
        let bare = Response {
            success: false,
            error: None,
            message: None,
        };
        assert_eq!(
            run(true, Script::Reply(Some(bare))).await.unwrap_err().to_string(),
            "Download failed"
        );
    }

    #[tokio::test]
    async fn maps_runtime_failures() {
        let lost = run(
            true,
            Script::Fail(SendError::Runtime(
                "Could not establish connection. Receiving end does not exist.".into(),
            )),
        )
        .await;
        assert_eq!(lost, Err(TransportError::ContextLost));

        let other = run(true, Script::Fail(SendError::Runtime("quota".into()))).await;
        assert_eq!(other.unwrap_err().to_string(), "Runtime error: quota");

        let dispatch = run(true, Script::Fail(SendError::Dispatch("boom".into()))).await;
        assert_eq!(
            dispatch.unwrap_err().to_string(),
            "Message sending failed: boom"
        );

        assert_eq!(
            run(false, Script::Reply(Some(Response::ok()))).await,
            Err(TransportError::ContextInvalidated)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_timeout() {
        let started = tokio::time::Instant::now();
        let result = run(true, Script::Hang).await;
        assert_eq!(result, Err(TransportError::Timeout));
        assert!(started.elapsed() >= Duration::from_secs(5));
        assert!(started.elapsed() < Duration::from_secs(6));
    }

    struct Accepting;

    #[async_trait]
    impl HostDownloader for Accepting {
        async fn download(&self, _request: DownloadRequest) -> crate::host::Result<DownloadId> {
            Ok(1)
        }
    }

    struct Refusing;

    #[async_trait]
    impl HostDownloader for Refusing {
        async fn download(&self, _request: DownloadRequest) -> crate::host::Result<DownloadId> {
            Err(HostError::Rejected("disk full".into()))
        }
    }

    fn coordinator(downloader: Arc<dyn HostDownloader>) -> DownloadCoordinator {
        DownloadCoordinator::new(
            downloader,
            Arc::new(MemoryBlobRegistry::new()),
            Arc::new(MenuRegistry::new()),
            Arc::new(MemoryStore::new()),
            CoordinatorSettings::default(),
        )
    }

    #[tokio::test]
    async fn reaches_the_coordinator_in_process() {
        let coordinator = coordinator(Arc::new(Accepting));
        let messenger = CoordinatorMessenger::new(coordinator.clone());
        let image = ImageDescriptor::from_src("https://x.com/a.png?w=10");

        request_download(&messenger, image.clone(), Duration::from_secs(5))
            .await
            .unwrap();
        let history = coordinator.history().load().await.unwrap();
        assert_eq!(history[0].url, "https://x.com/a.png");

        messenger.invalidate();
        assert_eq!(
            request_download(&messenger, image, Duration::from_secs(5)).await,
            Err(TransportError::ContextInvalidated)
        );
    }

    #[tokio::test]
    async fn surfaces_coordinator_errors() {
        let messenger = CoordinatorMessenger::new(coordinator(Arc::new(Refusing)));
        let err = request_download(
            &messenger,
            ImageDescriptor::from_src("https://x.com/a.png"),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Image 1 failed: Download rejected: disk full"
        );
    }
}
