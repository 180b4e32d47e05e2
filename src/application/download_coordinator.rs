use std::sync::Arc;
use std::time::Duration;

use crate::{
    api::{Request, Response},
    domain::{AppError, DownloadRecord, DownloadStatus, ImageDescriptor},
    host::{
        BlobRegistry, ContextMenus, DownloadId, DownloadRequest, HostDownloader, KeyValueStore,
        MenuItem,
    },
    utils::{clean_url, generate_filename, get_timestamp_millis, is_data_url, DataImage},
};

use super::{history::HistoryStore, status::StatusBus};

pub const MENU_ITEM_ID: &str = "downloadImage";
pub const MENU_ITEM_TITLE: &str = "Download with Image Downloader";
pub const PING_MESSAGE: &str = "Extension is working";

#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    /// Directory (relative to the download root) that receives every image
    pub download_subdir: String,
    /// How long a transient blob URL stays valid after submission
    pub blob_release_delay: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            download_subdir: "Image_Downloader".to_string(),
            blob_release_delay: Duration::from_secs(10),
        }
    }
}

/// Background side of the extension: turns descriptors into host downloads,
/// one at a time, and reports progress on the status bus.
#[derive(Clone)]
pub struct DownloadCoordinator {
    downloader: Arc<dyn HostDownloader>,
    blobs: Arc<dyn BlobRegistry>,
    menus: Arc<dyn ContextMenus>,
    history: HistoryStore,
    status: StatusBus,
    settings: CoordinatorSettings,
}

impl DownloadCoordinator {
    pub fn new(
        downloader: Arc<dyn HostDownloader>,
        blobs: Arc<dyn BlobRegistry>,
        menus: Arc<dyn ContextMenus>,
        store: Arc<dyn KeyValueStore>,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            downloader,
            blobs,
            menus,
            history: HistoryStore::new(store),
            status: StatusBus::new(),
            settings,
        }
    }

    pub fn status(&self) -> &StatusBus {
        &self.status
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Answer a runtime message. Broadcasts get no answer.
    pub async fn handle_message(&self, request: Request) -> Option<Response> {
        match request {
            Request::DownloadImages { images } => Some(match self.download_all(&images).await {
                Ok(()) => Response::ok(),
                Err(e) => {
                    tracing::error!("Download error: {}", e);
                    Response::failure(e.to_string())
                }
            }),
            Request::Ping => Some(Response::with_message(PING_MESSAGE)),
            Request::DownloadStatus(_) => None,
        }
    }

    pub async fn on_installed(&self, reason: &str) {
        tracing::info!("Extension installed/updated: {}", reason);
        self.create_context_menu().await;
    }

    pub async fn on_startup(&self) {
        tracing::info!("Extension startup, creating context menu");
        self.create_context_menu().await;
    }

    async fn create_context_menu(&self) {
        let item = MenuItem {
            id: MENU_ITEM_ID.to_string(),
            title: MENU_ITEM_TITLE.to_string(),
            contexts: vec!["image".to_string()],
            document_url_patterns: vec!["http://*/*".to_string(), "https://*/*".to_string()],
        };

        let result = match self.menus.remove_all().await {
            Ok(()) => self.menus.create(item).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => tracing::info!("Context menu created successfully"),
            Err(e) => tracing::error!("Context menu creation error: {}", e),
        }
    }

    pub async fn on_context_menu_click(&self, menu_item_id: &str, src_url: &str) {
        if menu_item_id != MENU_ITEM_ID {
            return;
        }

        self.status
            .publish(DownloadStatus::Downloading, "Starting download", src_url);

        let image = ImageDescriptor {
            src: src_url.to_string(),
            alt: "Context Menu Image".to_string(),
            title: "Downloaded via context menu".to_string(),
            width: 0,
            height: 0,
        };

        match self.download_all(std::slice::from_ref(&image)).await {
            Ok(()) => self
                .status
                .publish(DownloadStatus::Success, "Download completed", src_url),
            // the failing item already went out on the status bus
            Err(e) => tracing::error!("Context menu download error: {}", e),
        }
    }

    /// Download `images` in order, stopping at the first failure.
    pub async fn download_all(&self, images: &[ImageDescriptor]) -> Result<(), AppError> {
        if images.is_empty() {
            return Err(AppError::NoImages);
        }

        let total = images.len();
        for (i, image) in images.iter().enumerate() {
            let index = i + 1;
            self.status.publish(
                DownloadStatus::Downloading,
                format!("Downloading image {} of {}", index, total),
                &image.src,
            );

            match self.download_image(image, index).await {
                Ok(filename) => self.status.publish(
                    DownloadStatus::Success,
                    format!("Saved {}", filename),
                    &image.src,
                ),
                Err(e) => {
                    tracing::error!("Error downloading image {}: {}", index, e);
                    self.status.publish(
                        DownloadStatus::Error,
                        format!("Download failed for image {}: {}", index, e),
                        &image.src,
                    );
                    return Err(AppError::ItemFailed {
                        index,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    async fn download_image(&self, image: &ImageDescriptor, index: usize) -> Result<String, AppError> {
        let cleaned_url = clean_url(&image.src);
        let filename = generate_filename(&cleaned_url, index);
        let request = DownloadRequest {
            url: cleaned_url.clone(),
            filename: self.target_path(&filename),
            save_as: false,
        };

        let download_id = match self.downloader.download(request.clone()).await {
            Ok(id) => id,
            Err(e) if is_data_url(&cleaned_url) => {
                tracing::debug!("Direct submission of inline image rejected ({}), using blob", e);
                self.download_as_blob(&cleaned_url, request).await?
            }
            Err(e) => return Err(e.into()),
        };
        tracing::debug!("Image {} submitted as download {}", index, download_id);

        let record = DownloadRecord {
            url: cleaned_url,
            filename: filename.clone(),
            timestamp: get_timestamp_millis(),
        };
        if let Err(e) = self.history.record(record).await {
            tracing::warn!("Error storing recent download: {}", e);
        }

        Ok(filename)
    }

    async fn download_as_blob(
        &self,
        src: &str,
        request: DownloadRequest,
    ) -> Result<DownloadId, AppError> {
        let image = DataImage::parse(src)
            .ok_or_else(|| AppError::Decode("not an inline image".to_string()))?;
        let data = image.decode()?;
        let blob_url = self.blobs.create_object_url(data, &image.mime_type())?;

        let result = self
            .downloader
            .download(DownloadRequest {
                url: blob_url.clone(),
                ..request
            })
            .await;

        match result {
            Ok(id) => {
                self.schedule_release(blob_url);
                Ok(id)
            }
            Err(e) => {
                self.blobs.revoke_object_url(&blob_url);
                Err(e.into())
            }
        }
    }

    /// The host reads the blob asynchronously, so it must outlive the submit call.
    fn schedule_release(&self, blob_url: String) {
        let blobs = self.blobs.clone();
        let delay = self.settings.blob_release_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            blobs.revoke_object_url(&blob_url);
            tracing::debug!("Released {}", blob_url);
        });
    }

    fn target_path(&self, filename: &str) -> String {
        let subdir = self.settings.download_subdir.trim_matches('/');
        if subdir.is_empty() {
            filename.to_string()
        } else {
            format!("{}/{}", subdir, filename)
        }
    }
}
