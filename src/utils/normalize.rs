use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use super::data_url::{is_data_url, DataImage};
use super::{get_timestamp_millis, sanitize_filename};

pub const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "gif", "webp", "bmp", "svg"];

/// Query parameters that only track the visitor or bust caches.
const TRACKING_PARAMS: &[&str] = &[
    // analytics
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "msclkid",
    "ref",
    "referrer",
    "source",
    "_ga",
    "_gl",
    "mc_cid",
    "mc_eid",
    "yclid",
    "igshid",
    // sharing
    "share",
    "shared",
    "sharesource",
    "sharevia",
    // CDN resizing
    "auto",
    "format",
    "fit",
    "w",
    "h",
    "dpr",
    "q",
    // cache busting
    "v",
    "version",
    "cache",
    "cb",
    "t",
];

const DEFAULT_EXTENSION: &str = "jpg";

static IMAGE_PATH: OnceLock<Option<Regex>> = OnceLock::new();

fn has_image_extension(path: &str) -> bool {
    // Matches the extension at the very end of the path, case-insensitively
    IMAGE_PATH
        .get_or_init(|| Regex::new(r"(?i)\.(jpg|jpeg|png|gif|webp|bmp|svg)$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(path))
}

/// Canonical download URL for an image source.
///
/// Inline images come back untouched. Paths ending in a known image extension
/// lose their whole query string; anything else only loses the tracking and
/// cache-busting parameters. Credentials and the fragment are always dropped.
/// Unparseable input is returned as-is.
pub fn clean_url(src: &str) -> String {
    if is_data_url(src) {
        return src.to_string();
    }

    let mut url = match Url::parse(src) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Error cleaning URL, using original: {}", e);
            return src.to_string();
        }
    };

    // Only fails for URLs that cannot carry credentials in the first place
    let _ = url.set_username("");
    let _ = url.set_password(None);

    if has_image_extension(url.path()) {
        url.set_query(None);
    } else {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.as_ref()))
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept.iter());
        }
    }
    url.set_fragment(None);

    url.into()
}

/// Lowercased extension of `filename` if it is a recognized image type.
pub fn file_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() => stem,
        _ => name,
    }
}

/// Filesystem-safe, collision-resistant filename for the `index`-th image.
pub fn generate_filename(src: &str, index: usize) -> String {
    let timestamp = get_timestamp_millis();
    build_filename(src, index, timestamp).unwrap_or_else(|| {
        tracing::warn!("Error generating filename for {}, using fallback", src);
        format!("image_{}_{}.{}", index, timestamp, DEFAULT_EXTENSION)
    })
}

fn build_filename(src: &str, index: usize, timestamp: u64) -> Option<String> {
    if is_data_url(src) {
        let image = DataImage::parse(src)?;
        return Some(format!(
            "{}_{}_{}.{}",
            image.filename_prefix(),
            index,
            timestamp,
            image.extension()
        ));
    }

    let url = Url::parse(src).ok()?;
    let original_name = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    let extension =
        file_extension(original_name).unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

    let mut basename = sanitize_filename(strip_extension(original_name));
    if basename.is_empty() {
        basename = "image".to_string();
    }

    Some(format!("{}_{}_{}.{}", basename, index, timestamp, extension))
}
