//! Result types returned by the top-level entry points.

use crate::error::AttemptError;
use crate::record::{ConsolidatedDevice, DocumentIdentity, ExtractedRecord};
use serde::Serialize;
use std::path::PathBuf;

/// What [`crate::extract`] returns: the model's answer, before grouping.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Input file name, used in logs and progress events.
    pub source: String,
    pub record: ExtractedRecord,
    /// Model that produced `record`.
    pub model_used: String,
    pub stats: ExtractionStats,
}

/// The consolidated handover record, ready to be rendered.
#[derive(Debug, Clone, Serialize)]
pub struct HandoverOutput {
    pub source: String,
    pub identity: DocumentIdentity,
    /// One entry per device type, in first-seen order.
    pub devices: Vec<ConsolidatedDevice>,
    /// Document file name including the extension.
    pub file_name: String,
    pub model_used: String,
    pub stats: ExtractionStats,
}

/// Counters and timings for one extraction.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionStats {
    /// Page images sent to the model.
    pub pages: usize,
    /// Models tried, including the successful one.
    pub models_tried: usize,
    /// Why each skipped model failed, in the order they were tried.
    pub failed_attempts: Vec<AttemptError>,
    /// Device rows in the model's answer.
    pub raw_rows: usize,
    /// Device entries that were not objects and were dropped.
    pub discarded_entries: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub render_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// A document written by [`crate::convert_to_file`].
#[derive(Debug, Clone, Serialize)]
pub struct WrittenDocument {
    pub path: PathBuf,
    pub output: HandoverOutput,
}
