// src/services/image_encoder.rs
use crate::errors::CabinetError;
use crate::models::EncodedImage;
use base64::{Engine as _, engine::general_purpose};
use image::io::{Limits, Reader as ImageReader};
use image::ImageFormat as ImgFormat;
use log::debug;
use std::io::Cursor;

/// Largest source edge accepted before decoding.
pub const MAX_SOURCE_DIMENSION: u32 = 8192;

pub fn is_image_content_type(content_type: &str) -> bool {
    content_type.trim().to_ascii_lowercase().starts_with("image/")
}

fn mime_for(format: ImgFormat) -> Option<&'static str> {
    match format {
        ImgFormat::Png => Some("image/png"),
        ImgFormat::Jpeg => Some("image/jpeg"),
        ImgFormat::WebP => Some("image/webp"),
        ImgFormat::Gif => Some("image/gif"),
        ImgFormat::Bmp => Some("image/bmp"),
        ImgFormat::Tiff => Some("image/tiff"),
        _ => None,
    }
}

/// Converts uploaded files into the base64 payload the remote service expects.
pub struct ImageEncoder {
    max_dimension: u32,
    max_upload_bytes: usize,
}

impl ImageEncoder {
    pub fn new(max_dimension: u32) -> Self {
        Self {
            max_dimension,
            max_upload_bytes: crate::config::DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    pub async fn encode(
        &self,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<EncodedImage, CabinetError> {
        if !is_image_content_type(content_type) {
            return Err(CabinetError::InvalidInput(format!(
                "Unsupported content type: {}",
                content_type
            )));
        }
        if data.is_empty() {
            return Err(CabinetError::InvalidInput("Uploaded file is empty".to_string()));
        }
        if data.len() > self.max_upload_bytes {
            return Err(CabinetError::InvalidInput(format!(
                "Uploaded file exceeds {} bytes",
                self.max_upload_bytes
            )));
        }

        let max_dimension = self.max_dimension;
        tokio::task::spawn_blocking(move || encode_blocking(&data, max_dimension))
            .await
            .map_err(|e| CabinetError::Service(format!("Image encoding task failed: {}", e)))?
    }
}

fn encode_blocking(data: &[u8], max_dimension: u32) -> Result<EncodedImage, CabinetError> {
    let format = image::guess_format(data)
        .map_err(|e| CabinetError::InvalidInput(format!("Invalid image format: {}", e)))?;
    let mime_type = mime_for(format).ok_or_else(|| {
        CabinetError::InvalidInput(format!("Unsupported image format: {:?}", format))
    })?;

    let (bytes, mime_type) = resize_if_needed(data, max_dimension)?
        .map(|resized| (resized, "image/png"))
        .unwrap_or_else(|| (data.to_vec(), mime_type));

    Ok(EncodedImage {
        mime_type: mime_type.to_string(),
        data: general_purpose::STANDARD.encode(bytes),
    })
}

/// Returns a PNG re-encoding when the image exceeds `max_size` on its longest edge.
fn resize_if_needed(data: &[u8], max_size: u32) -> Result<Option<Vec<u8>>, CabinetError> {
    let reader = || {
        ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| CabinetError::InvalidInput(format!("Failed to read image: {}", e)))
    };

    let (width, height) = reader()?
        .into_dimensions()
        .map_err(|e| CabinetError::InvalidInput(format!("Failed to read image header: {}", e)))?;
    if width > MAX_SOURCE_DIMENSION || height > MAX_SOURCE_DIMENSION {
        return Err(CabinetError::InvalidInput(format!(
            "Image dimensions {}x{} exceed {}x{}",
            width, height, MAX_SOURCE_DIMENSION, MAX_SOURCE_DIMENSION
        )));
    }

    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_SOURCE_DIMENSION);
    limits.max_image_height = Some(MAX_SOURCE_DIMENSION);
    let mut decoder = reader()?;
    decoder.limits(limits);
    let img = decoder
        .decode()
        .map_err(|e| CabinetError::InvalidInput(format!("Failed to load image: {}", e)))?;

    if width <= max_size && height <= max_size {
        return Ok(None);
    }

    let ratio = (max_size as f32 / width.max(height) as f32).min(1.0);
    let new_width = ((width as f32 * ratio) as u32).max(1);
    let new_height = ((height as f32 * ratio) as u32).max(1);
    debug!(
        "Downscaling upload from {}x{} to {}x{}",
        width, height, new_width, new_height
    );

    let resized = img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3);

    let mut output = Vec::new();
    resized
        .write_to(&mut Cursor::new(&mut output), ImgFormat::Png)
        .map_err(|e| CabinetError::Service(format!("Failed to encode resized image: {}", e)))?;

    Ok(Some(output))
}
