//! Configuration types for label sheet compilation and image storage.
//!
//! Compilation behaviour is controlled through [`CompilerConfig`] and the image
//! store through [`StorageConfig`], each built via its builder. Both are plain
//! values: construct them once at startup and pass them to every call.

use crate::error::LabelSheetError;
use crate::pipeline::render::Renderer;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default compiler program, looked up on `PATH`.
pub const DEFAULT_COMPILER: &str = "pdflatex";

/// Default upper bound on a single compiler run.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Largest accepted upload (1 MiB).
pub const MAX_FILE_SIZE: usize = 1024 * 1024;

/// Extensions accepted by the image store, lower-case.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Configuration for compiling a label sheet.
///
/// Built via [`CompilerConfig::builder()`] or using
/// [`CompilerConfig::default()`].
///
/// # Example
/// ```rust
/// use labelsheet::CompilerConfig;
///
/// let config = CompilerConfig::builder()
///     .program("lualatex")
///     .timeout_secs(30)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct CompilerConfig {
    /// LaTeX compiler executable. Default: `pdflatex`.
    pub program: String,

    /// Arguments placed before the `.tex` file name.
    ///
    /// Default: `-interaction=nonstopmode -no-shell-escape -halt-on-error`.
    pub args: Vec<String>,

    /// Upper bound on one compiler run in seconds. Default: 60.
    ///
    /// The child process is killed when the bound expires.
    pub timeout_secs: u64,

    /// When set, a copy of each generated `labels.tex` is written here
    /// before rendering.
    pub debug_dir: Option<PathBuf>,

    /// Pre-constructed renderer. Takes precedence over `program`/`args`.
    pub renderer: Option<Arc<dyn Renderer>>,

    /// Optional observer notified as the compile moves through its stages.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_COMPILER.to_string(),
            args: default_compiler_args(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            debug_dir: None,
            renderer: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for CompilerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilerConfig")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("timeout_secs", &self.timeout_secs)
            .field("debug_dir", &self.debug_dir)
            .field("renderer", &self.renderer.as_ref().map(|r| r.name().to_string()))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn CompileProgressCallback>"),
            )
            .finish()
    }
}

impl CompilerConfig {
    /// Create a new builder for `CompilerConfig`.
    pub fn builder() -> CompilerConfigBuilder {
        CompilerConfigBuilder {
            config: Self::default(),
        }
    }
}

fn default_compiler_args() -> Vec<String> {
    ["-interaction=nonstopmode", "-no-shell-escape", "-halt-on-error"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Builder for [`CompilerConfig`].
#[derive(Debug)]
pub struct CompilerConfigBuilder {
    config: CompilerConfig,
}

impl CompilerConfigBuilder {
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.config.program = program.into();
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    pub fn debug_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.debug_dir = Some(dir.into());
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.config.renderer = Some(renderer);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CompilerConfig, LabelSheetError> {
        let c = &self.config;
        if c.renderer.is_none() && c.program.trim().is_empty() {
            return Err(LabelSheetError::InvalidConfig(
                "Compiler program must not be empty".into(),
            ));
        }
        if c.timeout_secs == 0 {
            return Err(LabelSheetError::InvalidConfig(
                "Compiler timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Configuration for the on-disk image store.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory holding uploaded images. Default: `static/images`.
    pub images_dir: PathBuf,

    /// Directory of bundled images copied in by
    /// [`crate::storage::ImageStore::reset_to_defaults`].
    /// Default: `static/defaultimages`.
    pub defaults_dir: PathBuf,

    /// Maximum upload size in bytes. Default: 1 MiB.
    pub max_file_size: usize,

    /// Download timeout for URL imports in seconds. Default: 30.
    pub download_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from("static").join("images"),
            defaults_dir: PathBuf::from("static").join("defaultimages"),
            max_file_size: MAX_FILE_SIZE,
            download_timeout_secs: 30,
        }
    }
}

impl StorageConfig {
    /// Create a new builder for `StorageConfig`.
    pub fn builder() -> StorageConfigBuilder {
        StorageConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`StorageConfig`].
#[derive(Debug)]
pub struct StorageConfigBuilder {
    config: StorageConfig,
}

impl StorageConfigBuilder {
    pub fn images_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.images_dir = dir.into();
        self
    }

    pub fn defaults_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.defaults_dir = dir.into();
        self
    }

    pub fn max_file_size(mut self, bytes: usize) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<StorageConfig, LabelSheetError> {
        let c = &self.config;
        if c.images_dir.as_os_str().is_empty() {
            return Err(LabelSheetError::InvalidConfig(
                "Images directory must not be empty".into(),
            ));
        }
        if c.max_file_size == 0 {
            return Err(LabelSheetError::InvalidConfig(
                "Maximum file size must be ≥ 1 byte".into(),
            ));
        }
        if c.images_dir == c.defaults_dir {
            return Err(LabelSheetError::InvalidConfig(format!(
                "Images directory and defaults directory must differ (both '{}')",
                c.images_dir.display()
            )));
        }
        Ok(self.config)
    }
}
