use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::broadcast;

use crate::domain::{DownloadStatus, StatusEvent};

const CHANNEL_CAPACITY: usize = 32;

/// Best-effort broadcast of download status. Publishing never blocks and
/// succeeds even when nobody is listening; slow subscribers skip events.
#[derive(Clone)]
pub struct StatusBus {
    sender: broadcast::Sender<StatusEvent>,
}

impl Default for StatusBus {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, status: DownloadStatus, message: impl Into<String>, url: &str) {
        let event = StatusEvent::new(status, message, url);
        if self.sender.send(event).is_err() {
            tracing::trace!("No status listeners");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.sender.subscribe()
    }

    /// Subscribe as a stream that ends only when the bus is dropped.
    pub fn stream(&self) -> BoxStream<'static, StatusEvent> {
        stream::unfold(self.subscribe(), |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => return Some((event, receiver)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!("Status listener skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }
}
