//! Code block processor trait for extensible code block handling.
//!
//! Processors are registered with the renderer and consulted in order when a
//! code block is encountered; the first returning a non-`PassThrough` result
//! wins. Processing is fallible: a processor that cannot render a block may
//! either substitute fallback HTML itself or return a [`ProcessError`], which
//! aborts the enclosing document render and carries the structured cause for
//! the host to inspect.

use std::collections::HashMap;
use std::error::Error;

/// Result of processing a code block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessResult {
    /// Replace the block with a placeholder for deferred substitution.
    ///
    /// The processor's [`post_process`](CodeBlockProcessor::post_process) is
    /// responsible for replacing the placeholder after rendering.
    Placeholder(String),

    /// Replace the block with raw HTML immediately.
    Inline(String),

    /// Not handled by this processor; render as a regular code block.
    PassThrough,
}

/// Metadata recorded for a code block handled via placeholder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedCodeBlock {
    /// Zero-based index of this code block in the document.
    pub index: usize,
    /// Language identifier from the fence info string.
    pub language: String,
    /// Raw source content of the block.
    pub source: String,
    /// `key=value` attributes parsed from the fence info string.
    pub attrs: HashMap<String, String>,
}

/// A code block processor failed and the document render must abort.
///
/// The boxed source error is the processor's own structured error type;
/// hosts that need to branch on the failure kind can downcast it.
#[derive(Debug, thiserror::Error)]
#[error("code block {index} ({language}): {source}")]
pub struct ProcessError {
    /// Zero-based index of the failing block.
    pub index: usize,
    /// Language identifier of the failing block.
    pub language: String,
    /// Underlying processor error.
    pub source: Box<dyn Error + Send + Sync>,
}

impl ProcessError {
    pub fn new(
        index: usize,
        language: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            index,
            language: language.into(),
            source: Box::new(source),
        }
    }
}

/// Trait for processing special code blocks.
///
/// Implementations claim one or more fence languages and transform matching
/// blocks into raw HTML (immediately or via placeholder). Blocks they do not
/// claim must come back as [`ProcessResult::PassThrough`] so the host renders
/// them exactly as it would without the processor.
pub trait CodeBlockProcessor {
    /// Process a code block.
    ///
    /// # Arguments
    ///
    /// * `language` - Language identifier from the fence info string
    /// * `attrs` - Attributes parsed from the fence (`key=value` pairs)
    /// * `source` - Raw content of the code block
    /// * `index` - Zero-based index of the block in the document
    fn process(
        &mut self,
        language: &str,
        attrs: &HashMap<String, String>,
        source: &str,
        index: usize,
    ) -> Result<ProcessResult, ProcessError>;

    /// Replace placeholders in the rendered HTML.
    ///
    /// Called once after rendering completes. Default is a no-op.
    fn post_process(&mut self, _html: &mut String) {}

    /// Blocks recorded for deferred substitution.
    fn extracted(&self) -> &[ExtractedCodeBlock] {
        &[]
    }

    /// Warnings accumulated during processing.
    fn warnings(&self) -> &[String] {
        &[]
    }
}

/// Parse a fence info string into language and attributes.
///
/// Format: `language [key=value ...]`
#[must_use]
pub(crate) fn parse_fence_info(info: &str) -> (String, HashMap<String, String>) {
    let mut parts = info.split_whitespace();
    let language = parts.next().unwrap_or("").to_owned();

    let mut attrs = HashMap::new();
    for part in parts {
        if let Some((key, value)) = part.split_once('=') {
            let value = value.trim_matches('"').trim_matches('\'');
            attrs.insert(key.to_owned(), value.to_owned());
        }
    }

    (language, attrs)
}
