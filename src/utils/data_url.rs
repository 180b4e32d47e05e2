//! Inline `data:image/...` sources.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;

use crate::domain::AppError;

const DATA_SCHEME: &str = "data:";

/// True when `src` is an inline `data:` reference rather than a fetchable URL.
pub fn is_data_url(src: &str) -> bool {
    src.get(..DATA_SCHEME.len())
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case(DATA_SCHEME))
}

/// A parsed `data:image/<subtype>[;param]*[;base64],<payload>` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataImage<'a> {
    pub subtype: String,
    pub is_base64: bool,
    payload: &'a str,
}

impl<'a> DataImage<'a> {
    /// Returns `None` for anything that is not an inline image.
    pub fn parse(src: &'a str) -> Option<Self> {
        if !is_data_url(src) {
            return None;
        }
        let (header, payload) = src[DATA_SCHEME.len()..].split_once(',')?;
        let mut parts = header.split(';');
        let media_type = parts.next()?.trim().to_ascii_lowercase();
        let subtype = media_type.strip_prefix("image/")?.to_string();
        if subtype.is_empty() {
            return None;
        }
        let is_base64 = parts.any(|p| p.trim().eq_ignore_ascii_case("base64"));

        Some(Self {
            subtype,
            is_base64,
            payload,
        })
    }

    pub fn mime_type(&self) -> String {
        format!("image/{}", self.subtype)
    }

    pub fn extension(&self) -> &str {
        match self.subtype.as_str() {
            "jpeg" | "jpg" | "pjpeg" => "jpg",
            "svg+xml" | "svg" => "svg",
            "x-icon" | "vnd.microsoft.icon" => "ico",
            other
                if (3..=4).contains(&other.len())
                    && other
                        .chars()
                        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()) =>
            {
                other
            }
            _ => "png",
        }
    }

    pub fn filename_prefix(&self) -> &'static str {
        if self.is_base64 {
            "base64_image"
        } else {
            "data_image"
        }
    }

    /// Decode the payload into the raw image bytes.
    pub fn decode(&self) -> Result<Bytes, AppError> {
        if self.payload.is_empty() {
            return Err(AppError::Decode("empty payload".to_string()));
        }

        if self.is_base64 {
            let compact: String = self
                .payload
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .collect();
            STANDARD
                .decode(compact.as_bytes())
                .map(Bytes::from)
                .map_err(|e| AppError::Decode(e.to_string()))
        } else {
            percent_decode(self.payload).map(Bytes::from)
        }
    }
}

fn percent_decode(input: &str) -> Result<Vec<u8>, AppError> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input
                .get(i + 1..i + 3)
                .filter(|h| h.bytes().all(|b| b.is_ascii_hexdigit()))
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| AppError::Decode(format!("bad escape at offset {}", i)))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_base64_png() {
        let image = DataImage::parse("data:image/png;base64,AAAA").unwrap();
        assert_eq!(image.subtype, "png");
        assert!(image.is_base64);
        assert_eq!(image.extension(), "png");
        assert_eq!(image.filename_prefix(), "base64_image");
        assert_eq!(image.decode().unwrap().as_ref(), &[0u8, 0, 0]);
    }

    #[test]
    fn maps_subtypes_to_extensions() {
        let jpeg = DataImage::parse("data:image/jpeg;base64,AAAA").unwrap();
        assert_eq!(jpeg.extension(), "jpg");
        let svg = DataImage::parse("data:image/svg+xml;charset=utf-8,%3Csvg%3E").unwrap();
        assert_eq!(svg.extension(), "svg");
        assert_eq!(svg.filename_prefix(), "data_image");
        assert_eq!(svg.mime_type(), "image/svg+xml");
        let jp2 = DataImage::parse("data:image/jp2;base64,AAAA").unwrap();
        assert_eq!(jp2.extension(), "jp2");
        let odd = DataImage::parse("data:image/x-portable-pixmap,abc").unwrap();
        assert_eq!(odd.extension(), "png");
    }

    #[test]
    fn decodes_percent_encoded_payload() {
        let svg = DataImage::parse("data:image/svg+xml,%3Csvg%2F%3E").unwrap();
        assert_eq!(svg.decode().unwrap().as_ref(), b"<svg/>");
    }

    #[test]
    fn rejects_signed_or_short_escapes() {
        for payload in ["%+1", "%-1", "%4", "%zz"] {
            let src = format!("data:image/svg+xml,{}", payload);
            let image = DataImage::parse(&src).unwrap();
            assert!(
                matches!(image.decode(), Err(AppError::Decode(_))),
                "accepted {}",
                payload
            );
        }
    }

    #[test]
    fn rejects_non_images_and_malformed_payloads() {
        assert!(DataImage::parse("data:text/plain,hello").is_none());
        assert!(DataImage::parse("https://x.com/a.png").is_none());
        assert!(DataImage::parse("data:image/png;base64").is_none());

        let broken = DataImage::parse("data:image/png;base64,@@@").unwrap();
        assert!(matches!(broken.decode(), Err(AppError::Decode(_))));
        let empty = DataImage::parse("data:image/png;base64,").unwrap();
        assert!(matches!(empty.decode(), Err(AppError::Decode(_))));
    }

    #[test]
    fn scheme_check_is_case_insensitive() {
        assert!(is_data_url("DATA:image/png;base64,AAAA"));
        assert!(!is_data_url("dat"));
    }
}
