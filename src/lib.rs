//! # handover-docx
//!
//! Turn scanned equipment handover records (*biên bản giao nhận*) into filled
//! internal handover documents (*biên bản bàn giao nội bộ*, `.docx`).
//!
//! A scanned record lists the same device type many times, once per serial
//! number. A vision model reads the pages into JSON; this crate groups the
//! rows into one line per device type, sums quantities, unions serial numbers,
//! fills a Word template and names the file after its contents.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / JPEG / PNG
//!  │
//!  ├─ 1. Input     detect the file type from its magic bytes
//!  ├─ 2. Render    rasterise PDF pages via pdfium (spawn_blocking)
//!  ├─ 3. Encode    PNG / JPEG → base64 ImageData
//!  ├─ 4. Extract   one multimodal call, falling back across models
//!  ├─ 5. Parse     tolerant JSON → ExtractedRecord
//!  ├─ 6. Group     merge rows by normalised device identity
//!  ├─ 7. Name      shortened company + identifier + top devices
//!  └─ 8. Template  fill word/document.xml, atomic write
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use handover_docx::{convert_to_file, HandoverConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Gemini by default; needs GEMINI_API_KEY
//!     let config = HandoverConfig::default();
//!     let written = convert_to_file("bbgn.pdf", "template.docx", "out", &config).await?;
//!     println!("{} ({} device types)", written.path.display(), written.output.devices.len());
//!     Ok(())
//! }
//! ```
//!
//! Grouping and naming are plain functions and need no model:
//!
//! ```rust
//! use handover_docx::{normalize, shorten_company_name};
//!
//! assert_eq!(normalize("  Máy  Chiếu "), "may chieu");
//! assert_eq!(shorten_company_name("CÔNG TY TNHH THƯƠNG MẠI ABC"), "ABC");
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `handover` binary (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod naming;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod record;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{HandoverConfig, HandoverConfigBuilder, DEFAULT_MODELS, MAX_RETRIES};
pub use convert::{
    consolidate, convert, convert_sync, convert_to_file, extract, load_template, write_document,
};
pub use error::{AttemptError, HandoverError};
pub use naming::{shorten_company_name, shorten_company_name_with, synthesize_file_name, CompanyFallback};
pub use normalize::{normalize, strip_diacritics};
pub use output::{Extraction, ExtractionStats, HandoverOutput, WrittenDocument};
pub use pipeline::group::consolidate as group_devices;
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use record::{
    ConsolidatedDevice, DocumentIdentity, ExtractedRecord, FieldValue, IdentifierKind,
    RawDeviceRecord,
};
