//! Image validation and fetching utilities.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, ImageReader, Rgb, RgbImage};

use crate::http::HttpClient;

/// Allowed image formats for generated recipe images.
pub const ALLOWED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

/// Maximum file size for images (20MB).
pub const MAX_FILE_SIZE: usize = 20 * 1024 * 1024;

/// Result of successfully fetching and validating an image.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    /// The raw image bytes.
    pub data: Vec<u8>,
    /// The detected content type (e.g., "image/jpeg").
    pub content_type: String,
    /// File extension matching the detected format, without the dot.
    pub extension: &'static str,
}

/// Validate image data: check format is allowed and detect it.
pub fn validate_image(data: &[u8]) -> Result<ImageFormat, String> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| format!("Failed to read image: {}", e))?;

    let format = reader
        .format()
        .ok_or_else(|| "Could not detect image format".to_string())?;

    if !ALLOWED_FORMATS.contains(&format) {
        return Err(format!(
            "Unsupported image format: {:?}. Allowed: JPEG, PNG, GIF, WebP",
            format
        ));
    }

    Ok(format)
}

/// Fetch an image from a URL and validate it.
pub async fn fetch_and_validate_image(
    client: &dyn HttpClient,
    url: &str,
) -> Result<FetchedImage, String> {
    let data = client
        .fetch_bytes(url)
        .await
        .map_err(|e| format!("Failed to fetch image: {}", e))?;

    if data.len() > MAX_FILE_SIZE {
        return Err(format!(
            "Image too large: {} bytes (max {})",
            data.len(),
            MAX_FILE_SIZE
        ));
    }

    let format = validate_image(&data)?;
    let extension = format.extensions_str().first().copied().unwrap_or("img");

    Ok(FetchedImage {
        data,
        content_type: format.to_mime_type().to_string(),
        extension,
    })
}

/// A small solid-colour PNG used in place of a generated image when running offline.
pub fn placeholder_png() -> Result<Vec<u8>, String> {
    let pixels = RgbImage::from_pixel(8, 8, Rgb([0xE8, 0xD5, 0xB7]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(pixels)
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| format!("Failed to encode placeholder image: {}", e))?;
    Ok(out.into_inner())
}
