//! Typst code fences compiled to inline SVG.
//!
//! This crate plugs into [`typfig_renderer`]'s code block seam: fenced blocks
//! whose language matches a configured identifier (default `typst`) are
//! compiled by the Typst compiler and embedded in the rendered HTML as a
//! wrapped SVG document. Every other block renders exactly as it would
//! without the plugin.
//!
//! # Architecture
//!
//! - [`TypstProcessor`]: configuration (identifiers, wrapper functions,
//!   failure policy) and the `CodeBlockProcessor` implementation.
//! - [`TypstEngine`]: the long-lived compilation handle. Loads fonts and the
//!   standard library once, compiles each snippet as a single in-memory main
//!   file, and bounds its memoization cache between snippets.
//!
//! # Example
//!
//! ```no_run
//! use typfig::TypstProcessor;
//! use typfig_renderer::MarkdownRenderer;
//!
//! let markdown = "```typst\n$e ^ (i pi) + 1 = 0$\n```";
//! let mut renderer = MarkdownRenderer::new().with_processor(TypstProcessor::new());
//! let result = renderer.render_markdown(markdown).unwrap();
//! assert!(result.html.contains("<svg"));
//! ```

mod consts;
mod engine;
mod error;
mod processor;
mod world;

pub use consts::{DEFAULT_CACHE_BOUND, DEFAULT_IDENTIFIER};
pub use engine::{Compiled, TypstEngine};
pub use error::{CompileError, CompileErrorKind};
pub use processor::{FailureMode, TypstProcessor, default_source_wrapper, default_svg_wrapper};
