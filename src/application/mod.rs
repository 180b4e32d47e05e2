pub mod download_coordinator;
pub mod history;
pub mod status;

pub use download_coordinator::{CoordinatorSettings, DownloadCoordinator, MENU_ITEM_ID};
pub use history::{HistoryStore, HISTORY_CAP};
pub use status::StatusBus;
