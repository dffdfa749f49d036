//! Error types for the handover-docx library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`HandoverError`] is **fatal**: the run cannot produce a document at all
//!   (unreadable input, no provider configured, every model failed, template
//!   broken). Returned as `Err(HandoverError)` from the top-level entry points.
//!
//! * [`AttemptError`] is **non-fatal**: one model in the priority list failed
//!   (transient API error, timeout, non-JSON answer) and the next model is
//!   tried. Collected in [`crate::output::ExtractionStats`] so callers can see
//!   which models were skipped and why.
//!
//! The deterministic core (normalisation, grouping, naming) has no error type:
//! malformed values degrade to safe defaults instead.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the handover-docx library.
#[derive(Debug, Error)]
pub enum HandoverError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but is neither a PDF nor a JPEG/PNG image.
    #[error("Unsupported input '{path}': expected a PDF, JPEG or PNG file\nFirst bytes: {magic:?}")]
    UnsupportedInput { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' could not be opened: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium (or its directory), or install pdfium system-wide.\n\
Image inputs (JPEG/PNG) do not need pdfium."
    )]
    PdfiumBindingFailed(String),

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The configured provider could not be constructed (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Every model in the priority list failed.
    #[error("All {attempts} model attempts failed to return a usable extraction.\nLast error: {last_error}")]
    AllModelsFailed { attempts: usize, last_error: String },

    /// The extraction succeeded but contained no usable device rows.
    #[error("No devices were extracted from '{source_name}'; nothing to render")]
    NoDevices { source_name: String },

    // ── Template errors ───────────────────────────────────────────────────
    /// The Word template does not exist.
    #[error("Template not found: '{path}'\nPass --template <FILE> or set HANDOVER_TEMPLATE.")]
    TemplateNotFound { path: PathBuf },

    /// The Word template is not a usable .docx (bad zip, no document body, no table).
    #[error("Invalid template: {detail}")]
    TemplateInvalid { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output document.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single model attempt.
///
/// The extraction moves on to the next model in the priority list; only when
/// every model fails is [`HandoverError::AllModelsFailed`] returned.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum AttemptError {
    /// The provider for this model could not be created.
    #[error("{model}: provider unavailable: {detail}")]
    ProviderUnavailable { model: String, detail: String },

    /// The LLM call failed after retries.
    #[error("{model}: LLM call failed after {retries} retries: {detail}")]
    CallFailed {
        model: String,
        retries: u32,
        detail: String,
    },

    /// The LLM call timed out.
    #[error("{model}: LLM call timed out after {secs}s")]
    Timeout { model: String, secs: u64 },

    /// The model answered, but not with a JSON object.
    #[error("{model}: response is not valid JSON: {detail}")]
    InvalidResponse { model: String, detail: String },
}

impl AttemptError {
    /// The model this attempt was made with.
    pub fn model(&self) -> &str {
        match self {
            AttemptError::ProviderUnavailable { model, .. }
            | AttemptError::CallFailed { model, .. }
            | AttemptError::Timeout { model, .. }
            | AttemptError::InvalidResponse { model, .. } => model,
        }
    }
}
