pub mod icon;

use iced::{
    widget::{button, column, row, text, text_input, Column, Space},
    Element, Length,
};

use crate::domain::{DownloadRecord, DownloadStatus, StatusEvent};
use crate::utils::get_timestamp_millis;

pub const IDLE_MESSAGE: &str = "Ready to download images";

const URL_MAX_LEN: usize = 30;
const URL_EDGE_LEN: usize = 12;

/// Keep short URLs whole, otherwise show the first and last 12 characters.
pub fn truncate_url(url: &str, max_len: usize) -> String {
    let len = url.chars().count();
    // Nothing to elide while the two edges overlap
    if len <= max_len || len <= 2 * URL_EDGE_LEN {
        return url.to_string();
    }
    let start: String = url.chars().take(URL_EDGE_LEN).collect();
    let end: String = url.chars().skip(len.saturating_sub(URL_EDGE_LEN)).collect();
    format!("{}...{}", start, end)
}

pub fn format_elapsed(now_ms: u64, timestamp_ms: u64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minutes = diff / 60_000;
    let hours = diff / 3_600_000;

    if hours > 0 {
        format!("{}h ago", hours)
    } else if minutes > 0 {
        format!("{}m ago", minutes)
    } else {
        "Just now".to_string()
    }
}

pub fn format_status(event: &StatusEvent) -> String {
    if event.url.is_empty() {
        event.message.clone()
    } else {
        format!("{}: {}", event.message, truncate_url(&event.url, URL_MAX_LEN))
    }
}

/// Popup state: latest status line plus the recent downloads list
pub struct StatusView {
    pub source: String,
    pub status_text: String,
    pub status: Option<DownloadStatus>,
    pub recent: Vec<DownloadRecord>,
    pub download_label: String,
    pub download_dir: String,
    pub(crate) revert_generation: u64,
}

impl Default for StatusView {
    fn default() -> Self {
        Self {
            source: String::new(),
            status_text: IDLE_MESSAGE.to_string(),
            status: None,
            recent: Vec::new(),
            download_label: "Download".to_string(),
            download_dir: String::new(),
            revert_generation: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub enum StatusMessage {
    SourceChanged(String),
    DownloadPressed,
    ChooseFolderPressed,
}

impl StatusView {
    pub fn update(&mut self, message: StatusMessage) {
        match message {
            StatusMessage::SourceChanged(source) => {
                self.source = source;
            }
            StatusMessage::DownloadPressed | StatusMessage::ChooseFolderPressed => {
                // Will be handled by the app
            }
        }
    }

    /// Show `event`. Terminal statuses return the token to pass to
    /// [`StatusView::revert_to_idle`] once the display delay is over.
    pub fn apply_status(&mut self, event: &StatusEvent) -> Option<u64> {
        self.status = Some(event.status);
        self.status_text = format_status(event);
        self.revert_generation += 1;
        event.status.is_terminal().then_some(self.revert_generation)
    }

    /// Returns false when a newer status arrived in the meantime.
    pub fn revert_to_idle(&mut self, generation: u64) -> bool {
        if generation != self.revert_generation {
            return false;
        }
        self.status = None;
        self.status_text = IDLE_MESSAGE.to_string();
        true
    }

    pub fn set_recent(&mut self, mut records: Vec<DownloadRecord>, limit: usize) {
        records.truncate(limit);
        self.recent = records;
    }

    pub fn view(&self) -> Element<'_, StatusMessage> {
        let now = get_timestamp_millis();

        let mut content = column![
            text("Image Downloader").size(28),
            Space::new().height(Length::Fixed(10.0)),
            text(&self.status_text).size(14),
            Space::new().height(Length::Fixed(10.0)),
            text("Image address:").size(16),
            text_input("Paste an image URL or data: URL...", &self.source)
                .on_input(StatusMessage::SourceChanged)
                .on_submit(StatusMessage::DownloadPressed)
                .padding(10),
            row![
                button(text(&self.download_label))
                    .on_press(StatusMessage::DownloadPressed)
                    .padding([10, 20]),
                button("Choose folder")
                    .on_press(StatusMessage::ChooseFolderPressed)
                    .padding([10, 20]),
            ]
            .spacing(10),
            text(format!("Saving to {}", self.download_dir)).size(12),
        ]
        .padding(20)
        .spacing(10);

        if !self.recent.is_empty() {
            let rows = Column::with_children(
                self.recent
                    .iter()
                    .map(|record| recent_row(record, now)),
            )
            .spacing(4);
            content = content
                .push(Space::new().height(Length::Fixed(10.0)))
                .push(text("Recent Downloads").size(16))
                .push(rows);
        }

        content.into()
    }
}

fn recent_row(record: &DownloadRecord, now: u64) -> Element<'_, StatusMessage> {
    row![
        text(&record.filename).size(13),
        Space::new().width(Length::Fill),
        text(format_elapsed(now, record.timestamp)).size(12),
    ]
    .spacing(10)
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_url() {
        assert_eq!(truncate_url("https://x.com/a.png", 30), "https://x.com/a.png");
        assert_eq!(
            truncate_url("https://example.com/some/long/path/picture.png", 30),
            "https://exam.../picture.png"
        );
        let exact = "a".repeat(30);
        assert_eq!(truncate_url(&exact, 30), exact);
    }

    #[test]
    fn test_truncate_url_tiny_limit() {
        assert_eq!(truncate_url("abcdefgh", 5), "abcdefgh");
        assert_eq!(truncate_url("abcdefgh", 0), "abcdefgh");
        let long = format!("{}{}", "a".repeat(12), "b".repeat(13));
        assert_eq!(truncate_url(&long, 5), format!("{}...{}", "a".repeat(12), "b".repeat(12)));
    }

    #[test]
    fn test_format_elapsed() {
        let now: u64 = 100_000_000;
        assert_eq!(format_elapsed(now, now - 5_000), "Just now");
        assert_eq!(format_elapsed(now, now - 2 * 60_000 - 1), "2m ago");
        assert_eq!(format_elapsed(now, now - 3 * 3_600_000), "3h ago");
        assert_eq!(format_elapsed(now, now + 60_000), "Just now");
    }

    #[test]
    fn status_line_includes_short_url() {
        let mut view = StatusView::default();
        let event = StatusEvent::new(
            DownloadStatus::Downloading,
            "Starting download",
            "https://example.com/some/long/path/picture.png",
        );
        assert_eq!(view.apply_status(&event), None);
        assert_eq!(
            view.status_text,
            "Starting download: https://exam.../picture.png"
        );

        let bare = StatusEvent::new(DownloadStatus::Downloading, "Working", "");
        view.apply_status(&bare);
        assert_eq!(view.status_text, "Working");
    }

    #[test]
    fn terminal_status_reverts_unless_superseded() {
        let mut view = StatusView::default();
        let done = StatusEvent::new(DownloadStatus::Success, "Download completed", "u");
        let first = view.apply_status(&done).unwrap();
        let second = view.apply_status(&done).unwrap();

        assert!(!view.revert_to_idle(first));
        assert_eq!(view.status_text, "Download completed: u");
        assert!(view.revert_to_idle(second));
        assert_eq!(view.status_text, IDLE_MESSAGE);
        assert_eq!(view.status, None);
    }

    #[test]
    fn recent_list_is_limited() {
        let mut view = StatusView::default();
        let records = (0..5)
            .map(|n| DownloadRecord {
                url: format!("u{}", n),
                filename: format!("f{}.png", n),
                timestamp: n,
            })
            .collect();
        view.set_recent(records, 3);
        assert_eq!(view.recent.len(), 3);
        assert_eq!(view.recent[0].filename, "f0.png");
    }

    #[test]
    fn source_edits_are_kept() {
        let mut view = StatusView::default();
        view.update(StatusMessage::SourceChanged("https://x.com/a.png".into()));
        view.update(StatusMessage::DownloadPressed);
        assert_eq!(view.source, "https://x.com/a.png");
    }
}
