//! Code block processor for Typst snippets.

use std::collections::HashMap;

use typfig_renderer::{CodeBlockProcessor, ProcessError, ProcessResult, escape_html};

use crate::consts::{DEFAULT_CACHE_BOUND, DEFAULT_IDENTIFIER, SOURCE_PRELUDE};
use crate::engine::TypstEngine;
use crate::error::CompileError;

/// Transformation applied to snippet source or compiled SVG.
type Wrapper = Box<dyn Fn(&str) -> String + Send>;

/// Default source wrapper: auto-sized page and 18pt text before the snippet.
#[must_use]
pub fn default_source_wrapper(code: &str) -> String {
    format!("{SOURCE_PRELUDE}{code}")
}

/// Default SVG wrapper: a `div.typst` container around the document.
#[must_use]
pub fn default_svg_wrapper(svg: &str) -> String {
    format!("<div class=\"typst\">\n{svg}\n</div>")
}

/// What to do when a snippet fails to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// Propagate the failure and abort the document render.
    #[default]
    Abort,
    /// Replace the block with an escaped error figure and keep rendering.
    Embed,
}

/// Configuration for Typst block processing (immutable after setup).
struct ProcessorConfig {
    /// Fence languages selected for compilation.
    identifiers: Vec<String>,
    /// Transforms raw block content before compilation.
    source_wrapper: Wrapper,
    /// Transforms the compiled SVG before embedding.
    svg_wrapper: Wrapper,
    /// Failure handling policy.
    failure_mode: FailureMode,
    /// Compilation cache entries retained between snippets.
    cache_bound: usize,
}

/// Code block processor that compiles Typst fences to inline SVG.
///
/// Matching blocks are replaced with
/// `svg_wrapper(compile(source_wrapper(content)))` plus a trailing newline;
/// everything else passes through untouched. Blocks are compiled strictly in
/// document order, each compilation completing before the next block is
/// looked at.
///
/// The [`TypstEngine`] handle is created at most once, lazily on the first
/// matching block, and reused for every block after that. A pre-built engine
/// can be injected with [`with_engine`](Self::with_engine). The processor is
/// deliberately not `Sync`; a host rendering documents concurrently must give
/// each render its own processor or serialize externally.
///
/// # Example
///
/// ```no_run
/// use typfig::TypstProcessor;
/// use typfig_renderer::MarkdownRenderer;
///
/// let markdown = "```typst\nHello,\nworld!\n```";
/// let mut renderer = MarkdownRenderer::new().with_processor(TypstProcessor::new());
/// let result = renderer.render_markdown(markdown).unwrap();
/// assert!(result.html.contains("<div class=\"typst\">"));
/// ```
pub struct TypstProcessor {
    /// Configuration (immutable after setup).
    config: ProcessorConfig,
    /// Created on the first matching block, reused afterwards.
    engine: Option<TypstEngine>,
    /// Warnings (accumulated during processing).
    warnings: Vec<String>,
}

impl TypstProcessor {
    /// Create a processor with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ProcessorConfig {
                identifiers: vec![DEFAULT_IDENTIFIER.to_owned()],
                source_wrapper: Box::new(default_source_wrapper),
                svg_wrapper: Box::new(default_svg_wrapper),
                failure_mode: FailureMode::default(),
                cache_bound: DEFAULT_CACHE_BOUND,
            },
            engine: None,
            warnings: Vec::new(),
        }
    }

    /// Match a single fence language instead of the default `typst`.
    #[must_use]
    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.config.identifiers = vec![identifier.into()];
        self
    }

    /// Match any of the given fence languages.
    #[must_use]
    pub fn identifiers<I>(mut self, identifiers: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.config.identifiers = identifiers.into_iter().map(Into::into).collect();
        self
    }

    /// Set the transformation applied to block content before compilation.
    #[must_use]
    pub fn source_wrapper<F>(mut self, wrapper: F) -> Self
    where
        F: Fn(&str) -> String + Send + 'static,
    {
        self.config.source_wrapper = Box::new(wrapper);
        self
    }

    /// Set the transformation applied to the compiled SVG before embedding.
    #[must_use]
    pub fn svg_wrapper<F>(mut self, wrapper: F) -> Self
    where
        F: Fn(&str) -> String + Send + 'static,
    {
        self.config.svg_wrapper = Box::new(wrapper);
        self
    }

    /// Set the failure handling policy.
    ///
    /// [`FailureMode::Abort`] (the default) fails the whole document render
    /// on the first bad snippet; [`FailureMode::Embed`] swaps each bad
    /// snippet for an escaped error figure instead.
    #[must_use]
    pub fn failure_mode(mut self, mode: FailureMode) -> Self {
        self.config.failure_mode = mode;
        self
    }

    /// Set how many compilation cache entries survive between snippets.
    ///
    /// Only takes effect if the engine has not been created yet.
    #[must_use]
    pub fn cache_bound(mut self, bound: usize) -> Self {
        self.config.cache_bound = bound;
        self
    }

    /// Use a pre-built engine instead of creating one lazily.
    #[must_use]
    pub fn with_engine(mut self, engine: TypstEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    fn engine_mut(&mut self) -> Result<&mut TypstEngine, CompileError> {
        match &mut self.engine {
            Some(engine) => Ok(engine),
            slot @ None => Ok(slot.insert(TypstEngine::with_cache_bound(self.config.cache_bound)?)),
        }
    }
}

impl Default for TypstProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeBlockProcessor for TypstProcessor {
    fn process(
        &mut self,
        language: &str,
        attrs: &HashMap<String, String>,
        source: &str,
        index: usize,
    ) -> Result<ProcessResult, ProcessError> {
        if !self.config.identifiers.iter().any(|id| id == language) {
            return Ok(ProcessResult::PassThrough);
        }

        for key in attrs.keys() {
            self.warnings
                .push(format!("typst block {index}: unknown attribute '{key}' ignored"));
        }

        let wrapped = (self.config.source_wrapper)(source);
        let result = self
            .engine_mut()
            .and_then(|engine| engine.compile(&wrapped));

        match result {
            Ok(compiled) => {
                self.warnings.extend(
                    compiled
                        .warnings
                        .into_iter()
                        .map(|warning| format!("typst block {index}: {warning}")),
                );
                let html = (self.config.svg_wrapper)(&compiled.svg);
                Ok(ProcessResult::Inline(format!("{html}\n")))
            }
            Err(error) => match self.config.failure_mode {
                FailureMode::Abort => Err(ProcessError::new(index, language, error)),
                FailureMode::Embed => {
                    tracing::warn!(index, error = %error, "typst block failed to compile");
                    Ok(ProcessResult::Inline(format!(
                        "<div class=\"typst typst-error\"><pre>{}</pre></div>\n",
                        escape_html(&error.to_string())
                    )))
                }
            },
        }
    }

    fn warnings(&self) -> &[String] {
        &self.warnings
    }
}
