//! Error types for the labelsheet library.
//!
//! Every failure in the crate is a [`LabelSheetError`]. Callers at a boundary
//! (a web handler, the CLI) never need to match on individual variants: each
//! one maps to a coarse [`ErrorKind`] tag through [`LabelSheetError::kind`],
//! and [`crate::output::FailureResponse`] turns any error into the uniform
//! `{ success: false, error, kind }` body.
//!
//! The kinds follow the compile path:
//!
//! * `validation`:    the placement list is malformed; nothing was touched.
//! * `missing_asset`: a referenced image is not in the store; the compiler
//!   was never started.
//! * `compilation`:   the compiler failed, timed out, or left no PDF behind.
//! * `io`:            the PDF exists but could not be read back.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the labelsheet library.
#[derive(Debug, Error)]
pub enum LabelSheetError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The placement list does not have the expected shape.
    #[error("{0}")]
    Validation(String),

    /// A placement references an image that is not in the store.
    #[error("Image '{filename}' not found in image storage")]
    MissingAsset { filename: String },

    // ── Compiler errors ───────────────────────────────────────────────────
    /// The compiler exited non-zero or produced no PDF.
    #[error("Failed to compile LaTeX: {diagnostic}")]
    Compilation { diagnostic: String },

    /// The compiler did not finish within the configured bound and was killed.
    #[error("LaTeX compiler '{program}' timed out after {secs}s")]
    RenderTimeout { program: String, secs: u64 },

    /// The compiler program could not be started at all.
    #[error("Could not start LaTeX compiler '{program}': {reason}")]
    CompilerUnavailable { program: String, reason: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Reading the compiled PDF or writing an output file failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Storage errors ────────────────────────────────────────────────────
    /// Upload rejected: extension is not one of png, jpg, jpeg.
    #[error("Invalid file type '{filename}'. Only PNG and JPG allowed.")]
    UnsupportedExtension { filename: String },

    /// Upload rejected: larger than the configured maximum.
    #[error("File size exceeds limit ({size} bytes, max {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    /// Upload rejected: nothing usable left after sanitising the name.
    #[error("Invalid filename '{filename}'")]
    InvalidFilename { filename: String },

    /// Upload rejected: the bytes are not a PNG or JPEG image.
    #[error("'{filename}' is not a PNG or JPEG image")]
    NotAnImage { filename: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LabelSheetError {
    /// Shorthand for an [`LabelSheetError::Io`] with a context message.
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Coarse, machine-readable category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::MissingAsset { .. } => ErrorKind::MissingAsset,
            Self::Compilation { .. }
            | Self::RenderTimeout { .. }
            | Self::CompilerUnavailable { .. } => ErrorKind::Compilation,
            Self::Io { .. } | Self::OutputWriteFailed { .. } => ErrorKind::Io,
            Self::UnsupportedExtension { .. }
            | Self::FileTooLarge { .. }
            | Self::InvalidFilename { .. }
            | Self::NotAnImage { .. }
            | Self::DownloadFailed { .. }
            | Self::DownloadTimeout { .. } => ErrorKind::Storage,
            Self::InvalidConfig(_) => ErrorKind::Config,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Error category attached to failure responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    MissingAsset,
    Compilation,
    Io,
    Storage,
    Config,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::MissingAsset => "missing_asset",
            ErrorKind::Compilation => "compilation",
            ErrorKind::Io => "io",
            ErrorKind::Storage => "storage",
            ErrorKind::Config => "config",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_asset_display() {
        let e = LabelSheetError::MissingAsset {
            filename: "ghost.png".into(),
        };
        assert!(e.to_string().contains("ghost.png"));
        assert_eq!(e.kind(), ErrorKind::MissingAsset);
    }

    #[test]
    fn compilation_display() {
        let e = LabelSheetError::Compilation {
            diagnostic: "! Undefined control sequence.".into(),
        };
        let msg = e.to_string();
        assert!(msg.starts_with("Failed to compile LaTeX"), "got: {msg}");
        assert!(msg.contains("Undefined control sequence"));
    }

    #[test]
    fn timeout_is_a_compilation_failure() {
        let e = LabelSheetError::RenderTimeout {
            program: "pdflatex".into(),
            secs: 60,
        };
        assert_eq!(e.kind(), ErrorKind::Compilation);
        assert!(e.to_string().contains("60s"));
    }

    #[test]
    fn storage_errors_share_a_kind() {
        let too_big = LabelSheetError::FileTooLarge {
            size: 2_000_000,
            max: 1_048_576,
        };
        let bad_ext = LabelSheetError::UnsupportedExtension {
            filename: "notes.txt".into(),
        };
        assert_eq!(too_big.kind(), ErrorKind::Storage);
        assert_eq!(bad_ext.kind(), ErrorKind::Storage);
        assert!(bad_ext.to_string().contains("Only PNG and JPG"));
    }

    #[test]
    fn kind_serialises_snake_case() {
        let json = serde_json::to_string(&ErrorKind::MissingAsset).unwrap();
        assert_eq!(json, "\"missing_asset\"");
        assert_eq!(ErrorKind::MissingAsset.to_string(), "missing_asset");
    }
}
