//! Markdown renderer that rewrites code block events.

use std::collections::HashMap;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd, html};

use crate::code_block::{
    CodeBlockProcessor, ExtractedCodeBlock, ProcessError, ProcessResult, parse_fence_info,
};

/// Result of rendering markdown.
#[derive(Clone, Debug)]
pub struct RenderResult {
    /// Rendered HTML content.
    pub html: String,
    /// Warnings collected from all processors.
    pub warnings: Vec<String>,
}

/// Markdown renderer with pluggable code block processors.
///
/// Makes a single forward pass over the parsed event stream. Code blocks are
/// buffered and offered to the registered processors; claimed blocks are
/// replaced with raw HTML events, unclaimed blocks are re-emitted verbatim.
/// The rewritten stream is then rendered by `pulldown_cmark::html`, so
/// everything the processors leave alone comes out exactly as the default
/// HTML pass produces it.
pub struct MarkdownRenderer {
    processors: Vec<Box<dyn CodeBlockProcessor>>,
    code_block_index: usize,
    gfm: bool,
}

impl MarkdownRenderer {
    /// Create a new renderer with GFM enabled by default.
    #[must_use]
    pub fn new() -> Self {
        Self {
            processors: Vec::new(),
            code_block_index: 0,
            gfm: true,
        }
    }

    /// Add a code block processor.
    ///
    /// Processors are checked in registration order when a code block is
    /// encountered. The first returning a non-`PassThrough` result wins.
    #[must_use]
    pub fn with_processor<P: CodeBlockProcessor + 'static>(mut self, processor: P) -> Self {
        self.processors.push(Box::new(processor));
        self
    }

    /// Enable or disable GitHub Flavored Markdown features.
    ///
    /// GFM is enabled by default (tables, strikethrough, task lists).
    #[must_use]
    pub fn with_gfm(mut self, enabled: bool) -> Self {
        self.gfm = enabled;
        self
    }

    /// Get parser options based on GFM configuration.
    #[must_use]
    pub fn parser_options(&self) -> Options {
        if self.gfm {
            Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_GFM
        } else {
            Options::empty()
        }
    }

    /// Create a configured parser for the given markdown text.
    #[must_use]
    pub fn create_parser<'a>(&self, markdown: &'a str) -> Parser<'a> {
        Parser::new_ext(markdown, self.parser_options())
    }

    /// Render markdown text directly using the configured parser options.
    pub fn render_markdown(&mut self, markdown: &str) -> Result<RenderResult, ProcessError> {
        self.render(self.create_parser(markdown))
    }

    /// Blocks recorded by processors for deferred substitution.
    pub fn extracted_code_blocks(&self) -> impl Iterator<Item = ExtractedCodeBlock> + '_ {
        self.processors.iter().flat_map(|p| p.extracted()).cloned()
    }

    /// Warnings accumulated across all processors.
    pub fn processor_warnings(&self) -> impl Iterator<Item = String> + '_ {
        self.processors.iter().flat_map(|p| p.warnings()).cloned()
    }

    /// Render markdown events and return the result.
    ///
    /// Runs exactly one rewriting pass over the event stream, then calls
    /// `post_process` on every registered processor. A processor error aborts
    /// the render; no partial output is returned.
    pub fn render<'a, I>(&mut self, events: I) -> Result<RenderResult, ProcessError>
    where
        I: Iterator<Item = Event<'a>>,
    {
        let mut rewritten: Vec<Event<'a>> = Vec::new();
        let mut block: Option<(CodeBlockKind<'a>, String)> = None;

        for event in events {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    block = Some((kind, String::new()));
                }
                Event::Text(text) => match &mut block {
                    Some((_, content)) => content.push_str(&text),
                    None => rewritten.push(Event::Text(text)),
                },
                Event::End(TagEnd::CodeBlock) => {
                    let Some((kind, content)) = block.take() else {
                        rewritten.push(Event::End(TagEnd::CodeBlock));
                        continue;
                    };
                    let index = self.code_block_index;
                    self.code_block_index += 1;

                    match self.dispatch(&kind, &content, index)? {
                        Some(replacement) => rewritten.push(Event::Html(replacement.into())),
                        None => {
                            rewritten.push(Event::Start(Tag::CodeBlock(kind)));
                            if !content.is_empty() {
                                rewritten.push(Event::Text(content.into()));
                            }
                            rewritten.push(Event::End(TagEnd::CodeBlock));
                        }
                    }
                }
                other => rewritten.push(other),
            }
        }

        let mut output = String::new();
        html::push_html(&mut output, rewritten.into_iter());

        for processor in &mut self.processors {
            processor.post_process(&mut output);
        }

        Ok(RenderResult {
            html: output,
            warnings: self.processor_warnings().collect(),
        })
    }

    /// Offer a buffered code block to the processors.
    ///
    /// Returns the replacement HTML if a processor claimed the block.
    fn dispatch(
        &mut self,
        kind: &CodeBlockKind<'_>,
        content: &str,
        index: usize,
    ) -> Result<Option<String>, ProcessError> {
        let (language, attrs) = match kind {
            CodeBlockKind::Fenced(info) if !info.is_empty() => {
                let (language, attrs) = parse_fence_info(info);
                ((!language.is_empty()).then_some(language), attrs)
            }
            _ => (None, HashMap::new()),
        };

        let Some(language) = language else {
            return Ok(None);
        };

        for processor in &mut self.processors {
            match processor.process(&language, &attrs, content, index)? {
                ProcessResult::Placeholder(placeholder) => return Ok(Some(placeholder)),
                ProcessResult::Inline(inline) => return Ok(Some(inline)),
                ProcessResult::PassThrough => {}
            }
        }

        Ok(None)
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct PlaceholderProcessor {
        extracted: Vec<ExtractedCodeBlock>,
    }

    impl PlaceholderProcessor {
        fn new() -> Self {
            Self {
                extracted: Vec::new(),
            }
        }
    }

    impl CodeBlockProcessor for PlaceholderProcessor {
        fn process(
            &mut self,
            language: &str,
            attrs: &HashMap<String, String>,
            source: &str,
            index: usize,
        ) -> Result<ProcessResult, ProcessError> {
            if language == "diagram" {
                self.extracted.push(ExtractedCodeBlock {
                    index,
                    language: language.to_owned(),
                    source: source.to_owned(),
                    attrs: attrs.clone(),
                });
                Ok(ProcessResult::Placeholder(format!("{{{{FIG_{index}}}}}")))
            } else {
                Ok(ProcessResult::PassThrough)
            }
        }

        fn post_process(&mut self, html: &mut String) {
            for block in &self.extracted {
                let placeholder = format!("{{{{FIG_{}}}}}", block.index);
                *html = html.replace(&placeholder, "<svg>figure</svg>");
            }
        }

        fn extracted(&self) -> &[ExtractedCodeBlock] {
            &self.extracted
        }
    }

    struct InlineProcessor;

    impl CodeBlockProcessor for InlineProcessor {
        fn process(
            &mut self,
            language: &str,
            _attrs: &HashMap<String, String>,
            source: &str,
            _index: usize,
        ) -> Result<ProcessResult, ProcessError> {
            if language == "inline-test" {
                Ok(ProcessResult::Inline(format!(
                    "<div class=\"inline\">{source}</div>"
                )))
            } else {
                Ok(ProcessResult::PassThrough)
            }
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("deliberate failure")]
    struct FailingError;

    struct FailingProcessor;

    impl CodeBlockProcessor for FailingProcessor {
        fn process(
            &mut self,
            language: &str,
            _attrs: &HashMap<String, String>,
            _source: &str,
            index: usize,
        ) -> Result<ProcessResult, ProcessError> {
            if language == "fail" {
                Err(ProcessError::new(index, language, FailingError))
            } else {
                Ok(ProcessResult::PassThrough)
            }
        }
    }

    struct WarningProcessor {
        warnings: Vec<String>,
    }

    impl CodeBlockProcessor for WarningProcessor {
        fn process(
            &mut self,
            _language: &str,
            _attrs: &HashMap<String, String>,
            _source: &str,
            _index: usize,
        ) -> Result<ProcessResult, ProcessError> {
            Ok(ProcessResult::PassThrough)
        }

        fn warnings(&self) -> &[String] {
            &self.warnings
        }
    }

    #[test]
    fn test_basic_paragraph() {
        let mut renderer = MarkdownRenderer::new();
        let result = renderer.render_markdown("Hello, world!").unwrap();
        assert_eq!(result.html, "<p>Hello, world!</p>\n");
    }

    #[test]
    fn test_emphasis() {
        let mut renderer = MarkdownRenderer::new();
        let result = renderer.render_markdown("*italic* and **bold**").unwrap();
        assert!(result.html.contains("<em>italic</em>"));
        assert!(result.html.contains("<strong>bold</strong>"));
    }

    #[test]
    fn test_code_block_default_rendering() {
        let mut renderer = MarkdownRenderer::new();
        let result = renderer
            .render_markdown("```rust\nfn main() {}\n```")
            .unwrap();
        assert!(result.html.contains(r#"class="language-rust""#));
        assert!(result.html.contains("fn main() {}"));
    }

    #[test]
    fn test_passthrough_matches_default_rendering() {
        let markdown = "# Title\n\n```js\nconsole.log('Hello!');\n```\n\nSome *text*.\n";

        let mut renderer = MarkdownRenderer::new().with_processor(PlaceholderProcessor::new());
        let result = renderer.render_markdown(markdown).unwrap();

        let mut expected = String::new();
        html::push_html(
            &mut expected,
            Parser::new_ext(markdown, renderer.parser_options()),
        );

        assert_eq!(result.html, expected);
    }

    #[test]
    fn test_bare_fence_matches_default_rendering() {
        let markdown = "```\nplain text\n```";

        let mut renderer = MarkdownRenderer::new().with_processor(PlaceholderProcessor::new());
        let result = renderer.render_markdown(markdown).unwrap();

        let mut expected = String::new();
        html::push_html(
            &mut expected,
            Parser::new_ext(markdown, renderer.parser_options()),
        );

        assert_eq!(result.html, expected);
        assert!(result.html.contains("<pre><code>"));
    }

    #[test]
    fn test_indented_block_not_dispatched() {
        let markdown = "    indented code\n";
        let mut renderer = MarkdownRenderer::new().with_processor(InlineProcessor);
        let result = renderer.render_markdown(markdown).unwrap();
        assert!(result.html.contains("<pre><code>indented code"));
    }

    #[test]
    fn test_processor_placeholder_and_post_process() {
        let markdown = "```diagram\nA -> B\n```";
        let mut renderer = MarkdownRenderer::new().with_processor(PlaceholderProcessor::new());
        let result = renderer.render_markdown(markdown).unwrap();

        assert!(result.html.contains("<svg>figure</svg>"));
        assert!(!result.html.contains("{{FIG_0}}"));
        assert!(!result.html.contains("<pre>"));

        let extracted: Vec<_> = renderer.extracted_code_blocks().collect();
        assert_eq!(extracted.len(), 1);
        assert_eq!(extracted[0].language, "diagram");
        assert_eq!(extracted[0].source, "A -> B\n");
        assert_eq!(extracted[0].index, 0);
    }

    #[test]
    fn test_processor_inline() {
        let markdown = "```inline-test\ncontent\n```";
        let mut renderer = MarkdownRenderer::new().with_processor(InlineProcessor);
        let result = renderer.render_markdown(markdown).unwrap();

        assert!(result.html.contains(r#"<div class="inline">content"#));
        assert!(!result.html.contains("<pre>"));
    }

    #[test]
    fn test_processor_with_attrs() {
        let markdown = "```diagram format=png theme=dark\nA -> B\n```";
        let mut renderer = MarkdownRenderer::new().with_processor(PlaceholderProcessor::new());
        renderer.render_markdown(markdown).unwrap();

        let extracted: Vec<_> = renderer.extracted_code_blocks().collect();
        assert_eq!(extracted.len(), 1);
        assert_eq!(extracted[0].attrs.get("format"), Some(&"png".to_owned()));
        assert_eq!(extracted[0].attrs.get("theme"), Some(&"dark".to_owned()));
    }

    #[test]
    fn test_multiple_processors_checked_in_order() {
        let markdown =
            "```diagram\nA -> B\n```\n\n```inline-test\nhello\n```\n\n```rust\nfn main() {}\n```";
        let mut renderer = MarkdownRenderer::new()
            .with_processor(PlaceholderProcessor::new())
            .with_processor(InlineProcessor);
        let result = renderer.render_markdown(markdown).unwrap();

        assert!(result.html.contains("<svg>figure</svg>"));
        assert!(result.html.contains(r#"<div class="inline">hello"#));
        assert!(result.html.contains(r#"class="language-rust""#));
    }

    #[test]
    fn test_block_indices_increment() {
        let markdown = "```diagram\nA\n```\n\n```rust\nx\n```\n\n```diagram\nB\n```";
        let mut renderer = MarkdownRenderer::new().with_processor(PlaceholderProcessor::new());
        renderer.render_markdown(markdown).unwrap();

        let extracted: Vec<_> = renderer.extracted_code_blocks().collect();
        assert_eq!(extracted.len(), 2);
        assert_eq!(extracted[0].index, 0);
        assert_eq!(extracted[1].index, 2);
    }

    #[test]
    fn test_processor_error_aborts_render() {
        let markdown = "before\n\n```fail\nx\n```\n\nafter";
        let mut renderer = MarkdownRenderer::new().with_processor(FailingProcessor);
        let error = renderer.render_markdown(markdown).unwrap_err();

        assert_eq!(error.index, 0);
        assert_eq!(error.language, "fail");
        assert!(error.source.downcast_ref::<FailingError>().is_some());
    }

    #[test]
    fn test_warnings_surface_in_result() {
        let mut renderer = MarkdownRenderer::new().with_processor(WarningProcessor {
            warnings: vec!["warning 1".to_owned(), "warning 2".to_owned()],
        });
        let result = renderer.render_markdown("Hello").unwrap();

        assert_eq!(result.warnings, vec!["warning 1", "warning 2"]);
    }

    #[test]
    fn test_gfm_enabled_by_default() {
        let mut renderer = MarkdownRenderer::new();
        let result = renderer
            .render_markdown("| A | B |\n|---|---|\n| 1 | 2 |")
            .unwrap();
        assert!(result.html.contains("<table>"));
    }

    #[test]
    fn test_gfm_disabled() {
        let mut renderer = MarkdownRenderer::new().with_gfm(false);
        let result = renderer
            .render_markdown("| A | B |\n|---|---|\n| 1 | 2 |")
            .unwrap();
        assert!(!result.html.contains("<table>"));
    }

    #[test]
    fn test_parser_options_with_gfm() {
        let renderer = MarkdownRenderer::new();
        let options = renderer.parser_options();
        assert!(options.contains(Options::ENABLE_TABLES));
        assert!(options.contains(Options::ENABLE_GFM));
    }

    #[test]
    fn test_default_renderer() {
        let mut renderer = MarkdownRenderer::default();
        let result = renderer.render_markdown("Hello").unwrap();
        assert_eq!(result.html, "<p>Hello</p>\n");
    }
}
