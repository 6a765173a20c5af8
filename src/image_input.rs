//! Image input boundary.
//!
//! A leaf photo reaches the detector either embedded (a base64 data URL,
//! built from a picked/dropped file) or as a remote http(s) URL. Remote
//! images are fetched and embedded before inference, so providers only
//! ever see [`InlineImage`].

use crate::http::{self, RetryPolicy};
use crate::{Error, Result};
use base64::Engine;
use image::ImageFormat;
use reqwest::Url;
use std::fmt;
use std::io::Cursor;
use std::path::Path;

/// Largest image accepted for inline upload (provider inline-data limit).
pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// Image bytes validated and encoded for an inference request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    mime_type: String,
    data: String,
    width: u32,
    height: u32,
}

impl InlineImage {
    /// Validate raw bytes (format sniff + header dimensions) and encode them.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (format, width, height) = inspect(bytes)?;
        Ok(Self {
            mime_type: format.to_mime_type().to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            width,
            height,
        })
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Base64 payload (standard alphabet, padded).
    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

fn inspect(bytes: &[u8]) -> Result<(ImageFormat, u32, u32)> {
    if bytes.is_empty() {
        return Err(Error::InvalidImage("image is empty".to_string()));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(Error::InvalidImage(format!(
            "image is {} bytes, limit is {}",
            bytes.len(),
            MAX_IMAGE_BYTES
        )));
    }
    let format = image::guess_format(bytes)
        .map_err(|e| Error::InvalidImage(format!("unrecognized image data: {}", e)))?;
    if !matches!(
        format,
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP | ImageFormat::Gif
    ) {
        return Err(Error::InvalidImage(format!(
            "unsupported image format: {:?}",
            format
        )));
    }
    let (width, height) = image::ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .map_err(|e| Error::InvalidImage(format!("corrupt {:?} image: {}", format, e)))?;
    if width == 0 || height == 0 {
        return Err(Error::InvalidImage("image has no pixels".to_string()));
    }
    Ok((format, width, height))
}

/// Where the leaf photo comes from.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ImageReference {
    Embedded(InlineImage),
    Remote(Url),
}

impl ImageReference {
    /// Parse a data URL or an http(s) URL.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::InvalidImage("no image reference given".to_string()));
        }
        if let Some(rest) = input.strip_prefix("data:") {
            return parse_data_url(rest).map(ImageReference::Embedded);
        }
        let url = Url::parse(input)
            .map_err(|e| Error::InvalidImage(format!("not a data URL or URL: {}", e)))?;
        match url.scheme() {
            "http" | "https" => Ok(ImageReference::Remote(url)),
            other => Err(Error::InvalidImage(format!(
                "unsupported URL scheme: {}",
                other
            ))),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        InlineImage::from_bytes(bytes).map(ImageReference::Embedded)
    }

    /// Read a local file (picker, drag-drop, or CLI path).
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            Error::InvalidImage(format!("cannot read {}: {}", path.display(), e))
        })?;
        let image = InlineImage::from_bytes(&bytes)?;
        let (w, h) = image.dimensions();
        log::info!(
            "[IMAGE] Loaded {} ({}, {}x{}, {} bytes)",
            path.display(),
            image.mime_type(),
            w,
            h,
            bytes.len()
        );
        Ok(ImageReference::Embedded(image))
    }

    /// Parse a path-or-URL argument: data URLs and http(s) URLs are taken
    /// as-is, anything else is read from disk.
    pub async fn from_arg(arg: &str) -> Result<Self> {
        let trimmed = arg.trim();
        if trimmed.starts_with("data:")
            || trimmed.starts_with("http://")
            || trimmed.starts_with("https://")
        {
            Self::parse(trimmed)
        } else {
            Self::from_path(Path::new(trimmed)).await
        }
    }

    /// Produce embeddable image data, fetching a remote URL if needed.
    pub async fn resolve(&self, client: &reqwest::Client, policy: &RetryPolicy) -> Result<InlineImage> {
        match self {
            ImageReference::Embedded(image) => Ok(image.clone()),
            ImageReference::Remote(url) => {
                let start = std::time::Instant::now();
                let resp = http::send_with_retry("IMAGE", policy, || client.get(url.clone())).await?;
                let bytes = read_capped(resp).await?;
                let image = InlineImage::from_bytes(&bytes)?;
                log::info!(
                    "[IMAGE] Fetched {} ({} bytes) in {}ms",
                    url,
                    bytes.len(),
                    start.elapsed().as_millis()
                );
                Ok(image)
            }
        }
    }
}

/// Read a response body, giving up as soon as it exceeds [`MAX_IMAGE_BYTES`].
async fn read_capped(mut resp: reqwest::Response) -> Result<Vec<u8>> {
    let too_large = |len: u64| {
        Error::InvalidImage(format!(
            "remote image is at least {} bytes, limit is {}",
            len, MAX_IMAGE_BYTES
        ))
    };
    if let Some(len) = resp.content_length() {
        if len > MAX_IMAGE_BYTES as u64 {
            return Err(too_large(len));
        }
    }
    let mut bytes = Vec::with_capacity(resp.content_length().unwrap_or(0) as usize);
    while let Some(chunk) = resp.chunk().await? {
        if bytes.len() + chunk.len() > MAX_IMAGE_BYTES {
            return Err(too_large((bytes.len() + chunk.len()) as u64));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

fn parse_data_url(rest: &str) -> Result<InlineImage> {
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::InvalidImage("data URL has no payload".to_string()))?;
    let mut parts = meta.split(';');
    let declared = parts.next().unwrap_or_default().to_string();
    if !parts.any(|p| p.eq_ignore_ascii_case("base64")) {
        return Err(Error::InvalidImage(
            "data URL must be base64-encoded".to_string(),
        ));
    }
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| Error::InvalidImage(format!("bad base64 payload: {}", e)))?;
    let image = InlineImage::from_bytes(&bytes)?;
    if !declared.is_empty() && !declared.eq_ignore_ascii_case(image.mime_type()) {
        log::warn!(
            "[IMAGE] Data URL declares {} but content is {}",
            declared,
            image.mime_type()
        );
    }
    Ok(image)
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageReference::Embedded(image) => f.write_str(&image.to_data_url()),
            ImageReference::Remote(url) => f.write_str(url.as_str()),
        }
    }
}

impl From<ImageReference> for String {
    fn from(reference: ImageReference) -> Self {
        reference.to_string()
    }
}

impl TryFrom<String> for ImageReference {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        ImageReference::parse(&value)
    }
}
