//! # labelsheet
//!
//! Lay captioned images out on a fixed 3 × 13 grid and compile the result
//! into a printable PDF of labels with LaTeX.
//!
//! ## Pipeline Overview
//!
//! ```text
//! JSON labels
//!  │
//!  ├─ 1. Validate  shape, keys, row 1–3, position 1–13, width > 0
//!  ├─ 2. Layout    sparse 3×13 sheet, last placement per cell wins
//!  ├─ 3. Emit      landscape A4 LaTeX, one tabular per row
//!  ├─ 4. Assets    read every referenced image from the ImageStore
//!  └─ 5. Render    pdflatex in a throwaway directory, bounded by a timeout
//! ```
//!
//! Steps 1–3 are pure ([`generate_document`]); steps 4–5 need an
//! [`ImageStore`] and a [`Renderer`] ([`compile`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use labelsheet::{compile, CompilerConfig, ImageStore, StorageConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = ImageStore::new(StorageConfig::default());
//!     store.reset_to_defaults().await?;
//!
//!     let labels = json!([
//!         {"image": "http://localhost:5000/static/images/a.png",
//!          "row": 1, "position": 1, "width": 30, "caption": "A"}
//!     ]);
//!     let sheet = compile(&labels, &store, &CompilerConfig::default()).await?;
//!     std::fs::write("labels.pdf", &sheet.pdf)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `labelsheet` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod compile;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod placement;
pub mod progress;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use compile::{compile, compile_sync, compile_to_file, generate_document};
pub use config::{CompilerConfig, CompilerConfigBuilder, StorageConfig, StorageConfigBuilder};
pub use error::{ErrorKind, LabelSheetError};
pub use output::{CompileStats, CompiledSheet, FailureResponse, SuccessResponse, PDF_FILENAME};
pub use pipeline::latex::generate_latex;
pub use pipeline::layout::{Cell, LabelSheet, GRID_COLUMNS, GRID_ROWS};
pub use pipeline::render::{Asset, PdfLatexRenderer, RenderOutcome, Renderer};
pub use placement::{parse_placements, LabelPlacement};
pub use progress::{CompileProgressCallback, NoopProgressCallback, ProgressCallback};
pub use storage::ImageStore;
