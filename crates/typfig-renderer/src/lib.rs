//! Markdown rendering with pluggable code block processors.
//!
//! This crate provides a [`MarkdownRenderer`] built on `pulldown-cmark` that
//! makes one forward pass over the parsed event stream, hands fenced code
//! blocks to registered [`CodeBlockProcessor`] implementations, and delegates
//! everything else to pulldown-cmark's own HTML pass. Blocks no processor
//! claims are re-emitted untouched, so they render byte-identically to the
//! default output (escaped content, `language-*` class).
//!
//! # Architecture
//!
//! - [`CodeBlockProcessor`]: the extension seam. Processors are checked in
//!   registration order; the first returning a non-`PassThrough` result wins.
//! - [`MarkdownRenderer`]: event-stream rewriting plus placeholder
//!   post-processing and warning collection.
//!
//! # Example
//!
//! ```
//! use typfig_renderer::MarkdownRenderer;
//!
//! let mut renderer = MarkdownRenderer::new();
//! let result = renderer.render_markdown("# Hello\n\n**Bold** text").unwrap();
//! assert!(result.html.contains("<strong>Bold</strong>"));
//! ```

mod code_block;
mod escape;
mod renderer;

pub use code_block::{CodeBlockProcessor, ExtractedCodeBlock, ProcessError, ProcessResult};
pub use escape::escape_html;
pub use renderer::{MarkdownRenderer, RenderResult};
