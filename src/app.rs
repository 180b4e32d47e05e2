use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use iced::Task;

use crate::api::{FetchClient, FetchConfig};
use crate::application::{DownloadCoordinator, MENU_ITEM_ID};
use crate::config::{self, AppConfig};
use crate::domain::{DownloadRecord, StatusEvent};
use crate::host::memory::{MemoryBlobRegistry, MemoryStore, MenuRegistry};
use crate::host::native::{JsonFileStore, NativeDownloader};
use crate::host::KeyValueStore;
use crate::ui::{StatusMessage, StatusView};

/// Desktop shell: plays the popup and the context-menu trigger on top of an
/// in-process coordinator.
pub struct ImageDownloaderApp {
    view: StatusView,
    coordinator: DownloadCoordinator,
    downloader: Arc<NativeDownloader>,
    menus: Arc<MenuRegistry>,
    status_revert: Duration,
    recent_display: usize,
}

#[derive(Debug, Clone)]
pub enum Message {
    UiMessage(StatusMessage),
    /// Broadcast from the coordinator
    StatusReceived(StatusEvent),
    /// Terminal status display time is over
    RevertStatus(u64),
    RecentLoaded(Result<Vec<DownloadRecord>, String>),
    MenuReady,
    FolderSelected(Option<PathBuf>),
}

impl ImageDownloaderApp {
    pub fn new(config: AppConfig) -> Self {
        let store: Arc<dyn KeyValueStore> = match config::storage_path() {
            Ok(path) => Arc::new(JsonFileStore::new(path)),
            Err(e) => {
                tracing::warn!("No persistent storage ({}), history kept in memory", e);
                Arc::new(MemoryStore::new())
            }
        };

        let blobs = Arc::new(MemoryBlobRegistry::new());
        let downloader = Arc::new(NativeDownloader::new(
            FetchClient::new(FetchConfig::default()),
            blobs.clone(),
            config.resolved_download_dir(),
        ));
        let menus = Arc::new(MenuRegistry::new());
        let coordinator = DownloadCoordinator::new(
            downloader.clone(),
            blobs,
            menus.clone(),
            store,
            config.coordinator_settings(),
        );

        let view = StatusView {
            download_dir: downloader.download_dir().display().to_string(),
            ..StatusView::default()
        };

        Self {
            view,
            coordinator,
            downloader,
            menus,
            status_revert: config.status_revert(),
            recent_display: config.recent_display,
        }
    }

    pub fn boot() -> (Self, Task<Message>) {
        let config = AppConfig::load().unwrap_or_else(|e| {
            tracing::warn!("Using default configuration: {}", e);
            AppConfig::default()
        });
        let app = Self::new(config);

        let status = Task::stream(
            app.coordinator
                .status()
                .stream()
                .map(Message::StatusReceived),
        );
        let coordinator = app.coordinator.clone();
        let menu = Task::perform(
            async move { coordinator.on_startup().await },
            |_| Message::MenuReady,
        );
        let recent = app.load_recent();

        (app, Task::batch([status, menu, recent]))
    }

    fn load_recent(&self) -> Task<Message> {
        let history = self.coordinator.history().clone();
        let limit = self.recent_display;
        Task::perform(
            async move { history.recent(limit).await.map_err(|e| e.to_string()) },
            Message::RecentLoaded,
        )
    }
}

pub fn update(app: &mut ImageDownloaderApp, message: Message) -> Task<Message> {
    match message {
        Message::UiMessage(ui_msg) => {
            app.view.update(ui_msg.clone());

            match ui_msg {
                StatusMessage::DownloadPressed => {
                    let source = app.view.source.trim().to_string();
                    if source.is_empty() {
                        return Task::none();
                    }
                    app.view.source.clear();

                    let coordinator = app.coordinator.clone();
                    let limit = app.recent_display;
                    // Same path as a right-click on an image
                    return Task::perform(
                        async move {
                            coordinator.on_context_menu_click(MENU_ITEM_ID, &source).await;
                            coordinator
                                .history()
                                .recent(limit)
                                .await
                                .map_err(|e| e.to_string())
                        },
                        Message::RecentLoaded,
                    );
                }
                StatusMessage::ChooseFolderPressed => {
                    let current = app.downloader.download_dir();
                    return Task::perform(
                        async move {
                            rfd::AsyncFileDialog::new()
                                .set_directory(&current)
                                .pick_folder()
                                .await
                                .map(|handle| handle.path().to_path_buf())
                        },
                        Message::FolderSelected,
                    );
                }
                StatusMessage::SourceChanged(_) => {}
            }
        }
        Message::StatusReceived(event) => {
            if let Some(generation) = app.view.apply_status(&event) {
                let delay = app.status_revert;
                return Task::perform(tokio::time::sleep(delay), move |_| {
                    Message::RevertStatus(generation)
                });
            }
        }
        Message::RevertStatus(generation) => {
            app.view.revert_to_idle(generation);
        }
        Message::RecentLoaded(result) => match result {
            Ok(records) => app.view.set_recent(records, app.recent_display),
            Err(e) => tracing::error!("Error loading recent downloads: {}", e),
        },
        Message::MenuReady => {
            if let Some(item) = app.menus.find(MENU_ITEM_ID) {
                app.view.download_label = item.title;
            }
        }
        Message::FolderSelected(selected) => {
            if let Some(dir) = selected {
                app.view.download_dir = dir.display().to_string();
                app.downloader.set_download_dir(dir);
            }
        }
    }
    Task::none()
}

pub fn view(app: &ImageDownloaderApp) -> iced::Element<'_, Message> {
    app.view.view().map(Message::UiMessage)
}
