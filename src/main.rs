use iced::window;
use image_downloader::{app, logging, ui};

fn main() -> iced::Result {
    if let Err(e) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("File logging unavailable, using stderr: {}", e);
    }

    iced::application(
        app::ImageDownloaderApp::boot,
        app::update,
        app::view,
    )
    .title("Image Downloader")
    .window(window::Settings {
        icon: ui::icon::window_icon(),
        ..Default::default()
    })
    .run()
}
