//! Rendering: compile a LaTeX document into PDF bytes.
//!
//! ## Why a trait?
//!
//! The real work happens in an external TeX installation that is not present
//! on every machine. [`Renderer`] is the seam: [`PdfLatexRenderer`] shells out
//! to `pdflatex`, tests inject a fake that records what it was asked to render.
//!
//! ## Working area
//!
//! Every call gets a fresh [`TempDir`] holding `labels.tex` and a copy of each
//! referenced image. The compiler runs with that directory as its working
//! directory and the directory is removed when the call returns, whichever
//! way it returns. Concurrent renders never see each other's files.

use crate::error::LabelSheetError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Base name of the generated document and of the compiled artifact.
pub const JOB_NAME: &str = "labels";

/// One image copied into the working area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// What came out of one compiler run.
#[derive(Debug, Clone, Default)]
pub struct RenderOutcome {
    /// Process exit code; `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Contents of `labels.pdf`, if the compiler left one behind.
    pub artifact: Option<Vec<u8>>,
}

impl RenderOutcome {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Capability that turns LaTeX text plus image assets into a PDF.
///
/// Implementations report the raw outcome; deciding whether it counts as
/// success is left to [`crate::compile::compile`].
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn render(&self, document: &str, assets: &[Asset]) -> Result<RenderOutcome, LabelSheetError>;
}

/// Runs a LaTeX compiler (`pdflatex` by default) in a temporary directory.
#[derive(Debug, Clone)]
pub struct PdfLatexRenderer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl PdfLatexRenderer {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    async fn run_in(&self, workdir: &Path) -> Result<RenderOutcome, LabelSheetError> {
        let tex_name = format!("{JOB_NAME}.tex");
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(&tex_name)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| LabelSheetError::CompilerUnavailable {
            program: self.program.clone(),
            reason: e.to_string(),
        })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| LabelSheetError::io("Failed to wait for LaTeX compiler", e))?,
            Err(_) => {
                warn!(
                    "{} exceeded {}s, killed",
                    self.program,
                    self.timeout.as_secs()
                );
                return Err(LabelSheetError::RenderTimeout {
                    program: self.program.clone(),
                    secs: self.timeout.as_secs(),
                });
            }
        };

        let workdir_str = workdir.to_string_lossy();
        let stdout = String::from_utf8_lossy(&output.stdout).replace(workdir_str.as_ref(), ".");
        let stderr = String::from_utf8_lossy(&output.stderr).replace(workdir_str.as_ref(), ".");

        let pdf_path = workdir.join(format!("{JOB_NAME}.pdf"));
        let artifact = if tokio::fs::try_exists(&pdf_path).await.unwrap_or(false) {
            let bytes = tokio::fs::read(&pdf_path)
                .await
                .map_err(|e| LabelSheetError::io("Error reading PDF file", e))?;
            debug!("PDF file size: {} bytes", bytes.len());
            Some(bytes)
        } else {
            None
        };

        Ok(RenderOutcome {
            exit_code: output.status.code(),
            stdout,
            stderr,
            artifact,
        })
    }
}

impl Default for PdfLatexRenderer {
    fn default() -> Self {
        let config = crate::config::CompilerConfig::default();
        Self::new(config.program, config.args, Duration::from_secs(config.timeout_secs))
    }
}

#[async_trait]
impl Renderer for PdfLatexRenderer {
    fn name(&self) -> &str {
        &self.program
    }

    async fn render(&self, document: &str, assets: &[Asset]) -> Result<RenderOutcome, LabelSheetError> {
        let start = Instant::now();
        let workdir = TempDir::new().map_err(|e| LabelSheetError::io("Failed to create working directory", e))?;

        tokio::fs::write(workdir.path().join(format!("{JOB_NAME}.tex")), document)
            .await
            .map_err(|e| LabelSheetError::io("Failed to write LaTeX document", e))?;

        for asset in assets {
            tokio::fs::write(workdir.path().join(&asset.filename), &asset.bytes)
                .await
                .map_err(|e| LabelSheetError::io(format!("Failed to copy image '{}'", asset.filename), e))?;
        }
        debug!("Working area holds {} and {} image(s)", JOB_NAME, assets.len());

        let outcome = self.run_in(workdir.path()).await?;
        info!(
            "{} exited with {:?} in {}ms",
            self.program,
            outcome.exit_code,
            start.elapsed().as_millis()
        );
        Ok(outcome)
    }
}

// ── Diagnostics ─────────────────────────────────────────────────────────────

static RE_ABSOLUTE_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:/[^\s/()\[\]{}<>`]+){2,}").unwrap());

/// Maximum lines kept when no LaTeX error marker is found.
const TAIL_LINES: usize = 20;

/// Condense compiler output into a message safe to hand back to a caller.
///
/// Keeps stderr plus the `! ...` error lines of stdout (and the `l.N` line
/// that locates each one), falling back to the last lines of stdout. Absolute
/// paths (two or more components) are reduced to their final component.
pub fn summarize_diagnostics(stdout: &str, stderr: &str) -> String {
    let mut lines: Vec<&str> = stderr.lines().map(str::trim_end).filter(|l| !l.is_empty()).collect();

    let stdout_lines: Vec<&str> = stdout.lines().collect();
    let mut errors: Vec<&str> = Vec::new();
    for (i, line) in stdout_lines.iter().enumerate() {
        if line.starts_with('!') {
            errors.push(line.trim_end());
            if let Some(loc) = stdout_lines[i + 1..].iter().take(4).find(|l| l.starts_with("l.")) {
                errors.push(loc.trim_end());
            }
        }
    }
    if errors.is_empty() {
        let skip = stdout_lines.len().saturating_sub(TAIL_LINES);
        errors.extend(stdout_lines[skip..].iter().map(|l| l.trim_end()).filter(|l| !l.is_empty()));
    }
    lines.extend(errors);

    let joined = lines.join("\n");
    let scrubbed = RE_ABSOLUTE_PATH.replace_all(&joined, |caps: &regex::Captures| {
        let path = &caps[0];
        path.rsplit('/').next().unwrap_or_default().to_string()
    });

    if scrubbed.trim().is_empty() {
        "compiler produced no output".to_string()
    } else {
        scrubbed.into_owned()
    }
}
