//! Result and response types.
//!
//! [`CompiledSheet`] is what a successful compile returns. [`FailureResponse`]
//! and [`SuccessResponse`] are the JSON bodies a boundary (HTTP handler, CLI
//! `--json`) emits, so every error reaches the caller in one shape.

use crate::error::{ErrorKind, LabelSheetError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

/// MIME type of the compiled artifact.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// File name offered to the client for download.
pub const PDF_FILENAME: &str = "labels.pdf";

/// A compiled label sheet.
#[derive(Debug, Clone)]
pub struct CompiledSheet {
    /// PDF bytes as produced by the renderer.
    pub pdf: Vec<u8>,
    /// The LaTeX document that was rendered.
    pub latex: String,
    pub stats: CompileStats,
}

impl CompiledSheet {
    pub fn content_type(&self) -> &'static str {
        PDF_CONTENT_TYPE
    }

    /// Value of the `Content-Disposition` header for a download response.
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename={PDF_FILENAME}")
    }
}

/// Timing and size figures for one compile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompileStats {
    /// Placements in the request, duplicates included.
    pub labels: usize,
    /// Cells that appear in the document.
    pub rendered_labels: usize,
    /// Placements laid out but hidden by gap truncation.
    pub hidden_labels: usize,
    /// Distinct images copied into the working area.
    pub assets: usize,
    pub latex_bytes: usize,
    pub pdf_bytes: usize,
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Uniform failure body: `{ "success": false, "error": ..., "kind": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureResponse {
    pub success: bool,
    pub error: String,
    pub kind: ErrorKind,
}

impl From<&LabelSheetError> for FailureResponse {
    fn from(err: &LabelSheetError) -> Self {
        Self {
            success: false,
            error: err.to_string(),
            kind: err.kind(),
        }
    }
}

impl From<LabelSheetError> for FailureResponse {
    fn from(err: LabelSheetError) -> Self {
        Self::from(&err)
    }
}

/// JSON success body carrying the PDF inline, for clients that cannot take a
/// binary download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub filename: String,
    pub content_type: String,
    pub size: usize,
    pub pdf_base64: String,
    pub stats: CompileStats,
}

impl From<&CompiledSheet> for SuccessResponse {
    fn from(sheet: &CompiledSheet) -> Self {
        Self {
            success: true,
            filename: PDF_FILENAME.to_string(),
            content_type: PDF_CONTENT_TYPE.to_string(),
            size: sheet.pdf.len(),
            pdf_base64: STANDARD.encode(&sheet.pdf),
            stats: sheet.stats.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failure_body_shape() {
        let err = LabelSheetError::Validation("Invalid label data format. Expected a list.".into());
        let body = serde_json::to_value(FailureResponse::from(&err)).unwrap();
        assert_eq!(
            body,
            json!({
                "success": false,
                "error": "Invalid label data format. Expected a list.",
                "kind": "validation"
            })
        );
    }

    #[test]
    fn missing_asset_kind_tag() {
        let body = FailureResponse::from(LabelSheetError::MissingAsset {
            filename: "ghost.png".into(),
        });
        assert_eq!(body.kind, ErrorKind::MissingAsset);
        assert!(!body.success);
    }

    #[test]
    fn success_body_encodes_pdf() {
        let sheet = CompiledSheet {
            pdf: b"%PDF-1.5".to_vec(),
            latex: String::new(),
            stats: CompileStats::default(),
        };
        assert_eq!(sheet.content_type(), "application/pdf");
        assert_eq!(sheet.content_disposition(), "attachment; filename=labels.pdf");

        let body = SuccessResponse::from(&sheet);
        assert!(body.success);
        assert_eq!(body.size, 8);
        assert_eq!(STANDARD.decode(&body.pdf_base64).unwrap(), b"%PDF-1.5");
    }
}
