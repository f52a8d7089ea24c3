//! Compile entry points.
//!
//! A compile runs in two phases. The first is pure: validate the placement
//! list, lay it out on the grid and emit LaTeX ([`generate_document`]). The
//! second loads the referenced images from the [`ImageStore`] and hands
//! everything to a [`Renderer`]. A missing image stops the compile before the
//! renderer is ever started.

use crate::config::CompilerConfig;
use crate::error::LabelSheetError;
use crate::output::{CompileStats, CompiledSheet};
use crate::pipeline::latex::generate_latex;
use crate::pipeline::layout::LabelSheet;
use crate::pipeline::render::{summarize_diagnostics, Asset, PdfLatexRenderer, Renderer, JOB_NAME};
use crate::placement::parse_placements;
use crate::progress::ProgressCallback;
use crate::storage::ImageStore;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Validate a placement list and return the LaTeX document for it.
///
/// Touches neither the image store nor the renderer.
pub fn generate_document(labels: &Value) -> Result<String, LabelSheetError> {
    let placements = parse_placements(labels)?;
    Ok(generate_latex(&LabelSheet::from_placements(&placements)))
}

/// Compile a placement list into a PDF.
///
/// # Arguments
/// * `labels`: JSON array of label objects
/// * `store`:  where referenced images are read from
/// * `config`: compiler settings; `config.renderer` overrides the default
///   `pdflatex` renderer
///
/// # Errors
/// - [`LabelSheetError::Validation`] for a malformed list
/// - [`LabelSheetError::MissingAsset`] when an image is not in the store
/// - [`LabelSheetError::Compilation`] / [`LabelSheetError::RenderTimeout`]
///   when the compiler fails, hangs, or leaves no PDF
pub async fn compile(
    labels: &Value,
    store: &ImageStore,
    config: &CompilerConfig,
) -> Result<CompiledSheet, LabelSheetError> {
    let total_start = Instant::now();

    // ── Step 1: Validate and lay out ─────────────────────────────────────
    let placements = match parse_placements(labels) {
        Ok(placements) => placements,
        Err(e) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_compile_error(&e.to_string());
            }
            return Err(e);
        }
    };
    let sheet = LabelSheet::from_placements(&placements);
    let hidden = sheet.hidden_cells();
    if !hidden.is_empty() {
        warn!(
            "{} label(s) sit behind a gap in their row and will not be rendered: {:?}",
            hidden.len(),
            hidden
        );
    }
    info!("Compiling {} label(s)", placements.len());
    if let Some(ref cb) = config.progress_callback {
        cb.on_compile_start(placements.len(), hidden.len());
    }

    let result = render_sheet(&sheet, store, config).await;

    match result {
        Ok((pdf, latex, assets, render_duration_ms)) => {
            let stats = CompileStats {
                labels: placements.len(),
                rendered_labels: sheet.visible_count(),
                hidden_labels: hidden.len(),
                assets,
                latex_bytes: latex.len(),
                pdf_bytes: pdf.len(),
                render_duration_ms,
                total_duration_ms: total_start.elapsed().as_millis() as u64,
            };
            info!(
                "Compile complete: {} bytes of PDF in {}ms",
                stats.pdf_bytes, stats.total_duration_ms
            );
            if let Some(ref cb) = config.progress_callback {
                cb.on_compile_complete(stats.pdf_bytes, stats.total_duration_ms);
            }
            Ok(CompiledSheet { pdf, latex, stats })
        }
        Err(e) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_compile_error(&e.to_string());
            }
            Err(e)
        }
    }
}

/// Emit, load assets, render. Returns `(pdf, latex, asset_count, render_ms)`.
async fn render_sheet(
    sheet: &LabelSheet,
    store: &ImageStore,
    config: &CompilerConfig,
) -> Result<(Vec<u8>, String, usize, u64), LabelSheetError> {
    // ── Step 2: Emit LaTeX ───────────────────────────────────────────────
    let latex = generate_latex(sheet);
    debug!("Generated LaTeX content:\n{}", latex);
    if let Some(ref dir) = config.debug_dir {
        write_debug_copy(dir, &latex).await;
    }

    // ── Step 3: Load every referenced image ──────────────────────────────
    let assets = load_assets(sheet, store, config.progress_callback.as_ref()).await?;

    // ── Step 4: Render ───────────────────────────────────────────────────
    let renderer = resolve_renderer(config);
    if let Some(ref cb) = config.progress_callback {
        cb.on_render_start(renderer.name());
    }
    let render_start = Instant::now();
    let outcome = renderer.render(&latex, &assets).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    // ── Step 5: Judge the outcome ────────────────────────────────────────
    if !outcome.succeeded() {
        warn!(
            "LaTeX compilation failed (exit {:?})\nstdout:\n{}\nstderr:\n{}",
            outcome.exit_code, outcome.stdout, outcome.stderr
        );
        return Err(LabelSheetError::Compilation {
            diagnostic: summarize_diagnostics(&outcome.stdout, &outcome.stderr),
        });
    }
    let pdf = match outcome.artifact {
        Some(pdf) => pdf,
        None => {
            warn!("{} reported success but {}.pdf was not found", renderer.name(), JOB_NAME);
            return Err(LabelSheetError::Compilation {
                diagnostic: "PDF file not found.".to_string(),
            });
        }
    };

    Ok((pdf, latex, assets.len(), render_duration_ms))
}

/// Read each distinct referenced image; the first missing one aborts.
async fn load_assets(
    sheet: &LabelSheet,
    store: &ImageStore,
    progress: Option<&ProgressCallback>,
) -> Result<Vec<Asset>, LabelSheetError> {
    let mut assets = Vec::new();
    for filename in sheet.filenames() {
        let bytes = store.retrieve(&filename).await?;
        if let Some(cb) = progress {
            cb.on_asset_loaded(&filename, bytes.len());
        }
        assets.push(Asset { filename, bytes });
    }
    Ok(assets)
}

/// The configured renderer, or `pdflatex` built from the config fields.
fn resolve_renderer(config: &CompilerConfig) -> Arc<dyn Renderer> {
    match config.renderer {
        Some(ref renderer) => Arc::clone(renderer),
        None => Arc::new(PdfLatexRenderer::new(
            config.program.clone(),
            config.args.clone(),
            Duration::from_secs(config.timeout_secs),
        )),
    }
}

/// Best-effort copy of the generated document for inspection.
async fn write_debug_copy(dir: &Path, latex: &str) {
    let path = dir.join(format!("{JOB_NAME}.tex"));
    let result = async {
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(&path, latex).await
    }
    .await;
    match result {
        Ok(()) => debug!("Saved LaTeX to {}", path.display()),
        Err(e) => warn!("Could not save LaTeX to {}: {}", path.display(), e),
    }
}

/// Compile and write the PDF to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn compile_to_file(
    labels: &Value,
    store: &ImageStore,
    output_path: impl AsRef<Path>,
    config: &CompilerConfig,
) -> Result<CompileStats, LabelSheetError> {
    let sheet = compile(labels, store, config).await?;
    let path = output_path.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| LabelSheetError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    let written = async {
        tokio::fs::write(&tmp_path, &sheet.pdf).await?;
        tokio::fs::rename(&tmp_path, path).await
    }
    .await;
    if let Err(e) = written {
        // The destination is untouched; drop the partial temp file.
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(LabelSheetError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        });
    }
    info!("Wrote {} bytes to {}", sheet.pdf.len(), path.display());

    Ok(sheet.stats)
}

/// Synchronous wrapper around [`compile`].
///
/// Creates a temporary tokio runtime internally.
pub fn compile_sync(
    labels: &Value,
    store: &ImageStore,
    config: &CompilerConfig,
) -> Result<CompiledSheet, LabelSheetError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| LabelSheetError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(compile(labels, store, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn generate_document_validates_first() {
        let err = generate_document(&json!({"image": "a.png"})).unwrap_err();
        assert!(matches!(err, LabelSheetError::Validation(_)));
    }

    #[test]
    fn generate_document_for_empty_list_has_three_empty_rows() {
        let doc = generate_document(&json!([])).unwrap();
        assert_eq!(doc.matches("\\mbox{}").count(), 3);
        assert!(!doc.contains("\\begin{tabular}"));
    }

    #[test]
    fn default_renderer_uses_config_program() {
        let config = CompilerConfig::builder().program("xelatex").build().unwrap();
        assert_eq!(resolve_renderer(&config).name(), "xelatex");
    }

    #[tokio::test]
    async fn debug_copy_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let debug = dir.path().join("debug");
        write_debug_copy(&debug, "\\relax").await;
        assert_eq!(std::fs::read_to_string(debug.join("labels.tex")).unwrap(), "\\relax");
    }
}
