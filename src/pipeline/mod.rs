//! Pipeline stages for label sheet compilation.
//!
//! Each submodule implements exactly one step.
//!
//! ## Data Flow
//!
//! ```text
//! placements ──▶ layout ──▶ latex ──▶ render
//!   (JSON)       (3×13)    (text)    (pdflatex in a temp dir)
//! ```
//!
//! 1. [`layout`]: place validated labels on the fixed grid
//! 2. [`latex`]:  emit the document; pure and deterministic
//! 3. [`render`]: the [`render::Renderer`] seam and the `pdflatex` runner
//!
//! [`input`] sits beside the pipeline and feeds the image store.

pub mod input;
pub mod latex;
pub mod layout;
pub mod render;
