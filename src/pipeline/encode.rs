//! Image encoding: page images → base64 `ImageData` attachments.
//!
//! Rendered PDF pages are PNG-encoded. Photos of paper records are already
//! JPEG or PNG and are forwarded untouched. Every attachment is sent with
//! `detail: "high"`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised page as a base64 PNG.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(encode_bytes(&buf, "image/png"))
}

/// Wrap already-encoded image bytes (a JPEG or PNG input file).
pub fn encode_bytes(bytes: &[u8], mime_type: &str) -> ImageData {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} image → {} bytes base64", mime_type, b64.len());
    ImageData::new(b64, mime_type).with_detail("high")
}
