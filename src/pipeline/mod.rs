//! Pipeline stages for handover-record conversion.
//!
//! Each submodule implements one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ llm ──▶ parse ──▶ group ──▶ template
//! (magic)   (pdfium)   (base64)   (VLM)   (JSON)    (merge)   (docx)
//! ```
//!
//! 1. [`input`]: classify the file as PDF, JPEG or PNG
//! 2. [`render`]: rasterise PDF pages in `spawn_blocking`
//! 3. [`encode`]: base64-wrap page images for the multimodal request
//! 4. [`llm`]: model fallback chain with retry/backoff; the only stage
//!    with network I/O
//! 5. [`parse`]: recover the JSON object from the model's answer
//! 6. [`group`]: merge device rows into one line per device type
//! 7. [`template`]: write the header, date line and device table into the
//!    Word template

pub mod encode;
pub mod group;
pub mod input;
pub mod llm;
pub mod parse;
pub mod render;
pub mod template;
