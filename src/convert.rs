//! Top-level entry points.
//!
//! ```text
//! extract      file ──▶ pages ──▶ model (with fallback) ──▶ ExtractedRecord
//! consolidate  ExtractedRecord ──▶ grouped devices + file name
//! convert      extract + consolidate
//! convert_to_file  convert + fill the Word template + atomic write
//! ```
//!
//! Only `extract` touches the network. `consolidate` is pure, so callers that
//! obtain the model answer some other way can still reuse grouping and naming.

use crate::config::HandoverConfig;
use crate::error::HandoverError;
use crate::naming::{synthesize_file_name, DOCUMENT_EXTENSION};
use crate::output::{Extraction, ExtractionStats, HandoverOutput, WrittenDocument};
use crate::pipeline::input::InputKind;
use crate::pipeline::{encode, group, input, llm, render, template};
use chrono::NaiveDate;
use edgequake_llm::ImageData;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Upper bound on `_N` suffixes tried when the document name is taken.
const MAX_NAME_SUFFIX: usize = 999;

/// Read a handover record and ask the model for its structured content.
///
/// # Errors
/// - File not found, unreadable, or not a PDF / JPEG / PNG
/// - PDF cannot be rasterised
/// - No provider could be built, or every model in the list failed
pub async fn extract(
    input_path: impl AsRef<Path>,
    config: &HandoverConfig,
) -> Result<Extraction, HandoverError> {
    let total_start = Instant::now();
    let resolved = input::resolve_input(input_path.as_ref())?;
    let source = resolved.source_name();
    info!("Starting extraction: {}", resolved.path.display());

    // ── Step 1: Page images ──────────────────────────────────────────────
    let render_start = Instant::now();
    let images = load_images(&resolved, config).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    let pages = images.len();
    debug!("{}: {} page image(s) ready in {}ms", source, pages, render_duration_ms);

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_start(&source, pages);
    }

    // ── Step 2: Model call with fallback ─────────────────────────────────
    let llm_start = Instant::now();
    let outcome = llm::extract_record(images, &source, config).await?;
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    let record = outcome.answer.record;
    let stats = ExtractionStats {
        pages,
        models_tried: outcome.attempts,
        failed_attempts: outcome.failed_attempts,
        raw_rows: record.devices.len(),
        discarded_entries: record.discarded_entries,
        input_tokens: outcome.answer.input_tokens,
        output_tokens: outcome.answer.output_tokens,
        render_duration_ms,
        llm_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "{}: {} device rows from {} in {}ms",
        source, stats.raw_rows, outcome.model, stats.total_duration_ms
    );

    Ok(Extraction {
        source,
        record,
        model_used: outcome.model,
        stats,
    })
}

/// Group the extracted rows and name the output document.
///
/// # Errors
/// [`HandoverError::NoDevices`] when no usable device row remains.
pub fn consolidate(extraction: Extraction) -> Result<HandoverOutput, HandoverError> {
    let devices = group::consolidate(&extraction.record.devices);
    if devices.is_empty() {
        return Err(HandoverError::NoDevices {
            source_name: extraction.source,
        });
    }

    let identity = extraction.record.identity;
    let file_name = format!(
        "{}.{}",
        synthesize_file_name(&identity, &devices),
        DOCUMENT_EXTENSION
    );
    info!("{}: output file name {}", extraction.source, file_name);

    Ok(HandoverOutput {
        source: extraction.source,
        identity,
        devices,
        file_name,
        model_used: extraction.model_used,
        stats: extraction.stats,
    })
}

/// Extract and consolidate a handover record.
pub async fn convert(
    input_path: impl AsRef<Path>,
    config: &HandoverConfig,
) -> Result<HandoverOutput, HandoverError> {
    consolidate(extract(input_path, config).await?)
}

/// Convert a record and write the filled template into `output_dir`.
///
/// The date line is filled with today's local date.
pub async fn convert_to_file(
    input_path: impl AsRef<Path>,
    template_path: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &HandoverConfig,
) -> Result<WrittenDocument, HandoverError> {
    let template = load_template(template_path.as_ref())?;
    let mut output = convert(input_path, config).await?;
    let today = chrono::Local::now().date_naive();
    let path = write_document(&output, &template, output_dir.as_ref(), today)?;
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        output.file_name = name.to_string();
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_document_written(&output.source, &path);
    }
    Ok(WrittenDocument { path, output })
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_path: impl AsRef<Path>,
    config: &HandoverConfig,
) -> Result<HandoverOutput, HandoverError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| HandoverError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_path, config))
}

/// Read a `.docx` template from disk.
pub fn load_template(path: &Path) -> Result<Vec<u8>, HandoverError> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => HandoverError::TemplateNotFound {
            path: path.to_path_buf(),
        },
        _ => HandoverError::TemplateInvalid {
            detail: format!("{}: {}", path.display(), e),
        },
    })
}

/// Render `output` into `template` and write it to `output_dir/output.file_name`.
///
/// Uses atomic write (temp file in the same directory + rename) so a crash
/// never leaves a half-written document behind. An existing document is never
/// replaced: the name gets a `_2`, `_3`, … suffix instead. Returns the path
/// actually written.
pub fn write_document(
    output: &HandoverOutput,
    template: &[u8],
    output_dir: &Path,
    date: NaiveDate,
) -> Result<PathBuf, HandoverError> {
    let bytes = template::render_docx(template, &output.identity, &output.devices, date)?;
    let path = output_dir.join(&output.file_name);
    let write_err = |path: &Path, source: std::io::Error| HandoverError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(output_dir).map_err(|e| write_err(&path, e))?;
    let mut tmp = tempfile::NamedTempFile::new_in(output_dir).map_err(|e| write_err(&path, e))?;
    tmp.write_all(&bytes).map_err(|e| write_err(&path, e))?;

    for n in 1..=MAX_NAME_SUFFIX {
        let candidate = match n {
            1 => path.clone(),
            _ => output_dir.join(numbered_name(&output.file_name, n)),
        };
        match tmp.persist_noclobber(&candidate) {
            Ok(_) => {
                info!("Wrote {} ({} bytes)", candidate.display(), bytes.len());
                return Ok(candidate);
            }
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                debug!("{} exists", candidate.display());
                tmp = e.file;
            }
            Err(e) => return Err(write_err(&candidate, e.error)),
        }
    }
    Err(write_err(
        &path,
        std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("{} candidate names are taken", MAX_NAME_SUFFIX),
        ),
    ))
}

/// `"a_b.docx"` → `"a_b_2.docx"`.
fn numbered_name(file_name: &str, n: usize) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}_{}.{}", stem, n, ext),
        _ => format!("{}_{}", file_name, n),
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Page images for the model: rasterised PDF pages, or the image file itself.
async fn load_images(
    resolved: &input::ResolvedInput,
    config: &HandoverConfig,
) -> Result<Vec<ImageData>, HandoverError> {
    match resolved.kind {
        InputKind::Pdf => {
            let rendered = render::render_pages(
                &resolved.path,
                config.max_rendered_pixels,
                config.max_pages,
            )
            .await?;
            rendered
                .iter()
                .enumerate()
                .map(|(idx, img)| {
                    encode::encode_page(img).map_err(|e| HandoverError::RasterisationFailed {
                        page: idx + 1,
                        detail: format!("Image encoding failed: {}", e),
                    })
                })
                .collect()
        }
        InputKind::Jpeg | InputKind::Png => {
            let bytes = tokio::fs::read(&resolved.path).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::PermissionDenied {
                    HandoverError::PermissionDenied {
                        path: resolved.path.clone(),
                    }
                } else {
                    HandoverError::Internal(format!("Failed to read image: {}", e))
                }
            })?;
            Ok(vec![encode::encode_bytes(&bytes, resolved.kind.mime_type())])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ExtractedRecord;
    use serde_json::json;

    fn extraction(value: serde_json::Value) -> Extraction {
        Extraction {
            source: "bbgn.pdf".into(),
            record: ExtractedRecord::from_json(&value),
            model_used: "gemini-2.5-flash".into(),
            stats: ExtractionStats::default(),
        }
    }

    #[test]
    fn consolidate_names_the_document() {
        let output = consolidate(extraction(json!({
            "shd": "45-HD/2024",
            "shd_type": "Hợp đồng",
            "cty": "CÔNG TY TNHH THƯƠNG MẠI ABC",
            "ds": [
                {"ttb": "Máy chiếu", "sl": "1"},
                {"ttb": "Máy chiếu", "sl": "1"}
            ]
        })))
        .unwrap();

        assert_eq!(output.devices.len(), 1);
        assert_eq!(output.file_name, "02_Máy_chiếu_ABC_45.docx");
        assert_eq!(output.model_used, "gemini-2.5-flash");
    }

    #[test]
    fn numbered_names_keep_the_extension() {
        assert_eq!(numbered_name("01_Loa_ABC_1.docx", 2), "01_Loa_ABC_1_2.docx");
        assert_eq!(numbered_name("a.b.docx", 3), "a.b_3.docx");
        assert_eq!(numbered_name("plain", 2), "plain_2");
        assert_eq!(numbered_name(".docx", 2), ".docx_2");
    }

    #[test]
    fn consolidate_without_devices_fails() {
        let err = consolidate(extraction(json!({"shd": "1", "ds": ["x"]}))).unwrap_err();
        assert!(matches!(err, HandoverError::NoDevices { .. }));
    }

    #[test]
    fn missing_template() {
        let err = load_template(Path::new("/no/such/bbbg.docx")).unwrap_err();
        assert!(matches!(err, HandoverError::TemplateNotFound { .. }));
    }
}
