//! PDF rasterisation: render the first pages of a record to `DynamicImage`.
//!
//! pdfium is a C++ library with thread-local state, so all work runs inside
//! `tokio::task::spawn_blocking`. The longest edge of each page is capped at
//! `max_rendered_pixels` regardless of the physical page size.
//!
//! The library is located in this order:
//! 1. `PDFIUM_LIB_PATH` (a library file, or a directory containing it)
//! 2. the platform library name in the working directory
//! 3. the system library search path

use crate::error::HandoverError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Rasterise at most `max_pages` pages of a PDF.
pub async fn render_pages(
    pdf_path: &Path,
    max_pixels: u32,
    max_pages: usize,
) -> Result<Vec<DynamicImage>, HandoverError> {
    let path = pdf_path.to_path_buf();

    tokio::task::spawn_blocking(move || render_pages_blocking(&path, max_pixels, max_pages))
        .await
        .map_err(|e| HandoverError::Internal(format!("Render task panicked: {}", e)))?
}

fn render_pages_blocking(
    pdf_path: &Path,
    max_pixels: u32,
    max_pages: usize,
) -> Result<Vec<DynamicImage>, HandoverError> {
    let pdfium = bind_pdfium()?;

    let document =
        pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| HandoverError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: format!("{:?}", e),
            })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);
    if total_pages > max_pages {
        warn!(
            "Only the first {} of {} pages are sent for extraction",
            max_pages, total_pages
        );
    }

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let count = total_pages.min(max_pages);
    let mut images = Vec::with_capacity(count);

    for idx in 0..count {
        let page = pages
            .get(idx as u16)
            .map_err(|e| HandoverError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?;

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            HandoverError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        images.push(image);
    }

    Ok(images)
}

/// Bind to a pdfium shared library.
fn bind_pdfium() -> Result<Pdfium, HandoverError> {
    if let Some(path) = library_from_env() {
        return Pdfium::bind_to_library(&path)
            .map(Pdfium::new)
            .map_err(|e| {
                HandoverError::PdfiumBindingFailed(format!("{}: {}", path.display(), e))
            });
    }

    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| HandoverError::PdfiumBindingFailed(e.to_string()))
}

fn library_from_env() -> Option<PathBuf> {
    let raw = std::env::var("PDFIUM_LIB_PATH").ok()?;
    let path = PathBuf::from(raw.trim());
    if path.as_os_str().is_empty() {
        return None;
    }
    if path.is_dir() {
        Some(PathBuf::from(Pdfium::pdfium_platform_library_name_at_path(
            &path,
        )))
    } else {
        Some(path)
    }
}
