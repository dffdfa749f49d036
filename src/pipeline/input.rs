//! Input resolution: validate the source file and tell PDFs from scans.
//!
//! Handover records arrive either as PDFs (exported or scanned) or as phone
//! photos. The kind is decided by magic bytes, never by extension.

use crate::error::HandoverError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// What the source file contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Pdf,
    Jpeg,
    Png,
}

impl InputKind {
    /// Detect the kind from the first bytes of a file.
    pub fn from_magic(magic: &[u8]) -> Option<Self> {
        if magic.starts_with(b"%PDF") {
            Some(InputKind::Pdf)
        } else if magic.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(InputKind::Jpeg)
        } else if magic.starts_with(&[0x89, b'P', b'N', b'G']) {
            Some(InputKind::Png)
        } else {
            None
        }
    }

    /// MIME type of image inputs; PDFs are rasterised to PNG first.
    pub fn mime_type(self) -> &'static str {
        match self {
            InputKind::Pdf | InputKind::Png => "image/png",
            InputKind::Jpeg => "image/jpeg",
        }
    }
}

/// A validated local input file.
#[derive(Debug, Clone)]
pub struct ResolvedInput {
    pub path: PathBuf,
    pub kind: InputKind,
}

impl ResolvedInput {
    /// File name for logs and error messages.
    pub fn source_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Check that `path` exists, is readable and is a PDF, JPEG or PNG.
pub fn resolve_input(path: &Path) -> Result<ResolvedInput, HandoverError> {
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(HandoverError::FileNotFound { path });
    }

    let mut magic = [0u8; 4];
    match std::fs::File::open(&path) {
        Ok(mut f) => {
            // short files keep zero padding and fail detection below
            let _ = f.read(&mut magic);
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(HandoverError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(HandoverError::FileNotFound { path });
        }
    }

    let kind =
        InputKind::from_magic(&magic).ok_or(HandoverError::UnsupportedInput {
            path: path.clone(),
            magic,
        })?;

    debug!("Resolved {:?} input: {}", kind, path.display());
    Ok(ResolvedInput { path, kind })
}
