//! Long-lived Typst compilation engine.

use std::sync::Arc;

use typst::diag::SourceDiagnostic;
use typst::foundations::Bytes;
use typst::layout::{Abs, PagedDocument};
use typst::text::{Font, FontBook};
use typst::utils::LazyHash;
use typst::{Library, LibraryExt};

use crate::consts::DEFAULT_CACHE_BOUND;
use crate::error::CompileError;
use crate::world::SnippetWorld;

/// Output of a single compilation.
#[derive(Debug)]
pub struct Compiled {
    /// Merged SVG document covering all pages.
    pub svg: String,
    /// Formatted warning diagnostics emitted during compilation.
    pub warnings: Vec<String>,
}

/// Compiles Typst snippets to SVG.
///
/// The engine is the long-lived half of the pipeline: it loads the standard
/// library and fonts once at construction and is meant to be reused for every
/// snippet in a process. Each compilation after the first evicts memoized
/// state down to the configured bound before compiling, so memory stays flat
/// across long runs.
///
/// Not `Sync`; callers that share an engine across threads must serialize
/// access themselves.
pub struct TypstEngine {
    library: LazyHash<Library>,
    book: LazyHash<FontBook>,
    fonts: Vec<Font>,
    cache_bound: usize,
    compilations: u64,
}

impl TypstEngine {
    /// Create an engine with the default cache bound.
    pub fn new() -> Result<Self, CompileError> {
        Self::with_cache_bound(DEFAULT_CACHE_BOUND)
    }

    /// Create an engine retaining `cache_bound` memoized entries between
    /// compilations.
    pub fn with_cache_bound(cache_bound: usize) -> Result<Self, CompileError> {
        let fonts = load_fonts();
        if fonts.is_empty() {
            return Err(CompileError::engine_fault(
                "no usable fonts (embedded set and system lookup both empty)",
            ));
        }
        let book = FontBook::from_fonts(fonts.iter());
        tracing::debug!(fonts = fonts.len(), "typst engine initialized");

        Ok(Self {
            library: LazyHash::new(Library::default()),
            book: LazyHash::new(book),
            fonts,
            cache_bound,
            compilations: 0,
        })
    }

    /// Compile a Typst snippet to a merged SVG document.
    ///
    /// The snippet is the sole main file of the compilation; imports of other
    /// files are not resolved. Compilation is synchronous and blocking, with
    /// no timeout.
    pub fn compile(&mut self, source: &str) -> Result<Compiled, CompileError> {
        if self.compilations > 0 {
            comemo::evict(self.cache_bound);
        }
        self.compilations += 1;

        let world = SnippetWorld::new(self, source);
        let result = typst::compile::<PagedDocument>(&world);
        let warnings = result.warnings.iter().map(format_diagnostic).collect();
        let document = result.output.map_err(|errors| {
            CompileError::invalid_source(errors.iter().map(format_diagnostic).collect())
        })?;

        let svg = typst_svg::svg_merged(&document, Abs::zero());
        tracing::debug!(
            pages = document.pages.len(),
            bytes = svg.len(),
            "compiled typst snippet"
        );

        Ok(Compiled { svg, warnings })
    }

    /// Number of fonts available to compilations.
    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }

    pub(crate) fn library(&self) -> &LazyHash<Library> {
        &self.library
    }

    pub(crate) fn book(&self) -> &LazyHash<FontBook> {
        &self.book
    }

    pub(crate) fn font(&self, index: usize) -> Option<Font> {
        self.fonts.get(index).cloned()
    }
}

/// Format a diagnostic into a single warning/error line.
fn format_diagnostic(diagnostic: &SourceDiagnostic) -> String {
    let mut message = diagnostic.message.to_string();
    for hint in &diagnostic.hints {
        message.push_str("; hint: ");
        message.push_str(hint.as_str());
    }
    message
}

/// Load the embedded font set, then any system fonts fontdb can find.
///
/// Embedded fonts come first so font indices (and therefore output) stay
/// stable on machines with no system fonts at all. Unreadable or unparsable
/// faces are skipped.
fn load_fonts() -> Vec<Font> {
    let mut fonts: Vec<Font> = Vec::new();

    for data in typst_assets::fonts() {
        if let Some(font) = Font::new(Bytes::new(data), 0) {
            fonts.push(font);
        }
    }
    let embedded = fonts.len();

    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    for face in db.faces() {
        let fontdb::Source::File(path) = &face.source else {
            continue;
        };
        let Ok(data) = std::fs::read(path) else {
            continue;
        };
        let bytes = Bytes::new(Arc::<[u8]>::from(data));
        if let Some(font) = Font::new(bytes, face.index) {
            fonts.push(font);
        }
    }

    tracing::debug!(
        embedded,
        system = fonts.len() - embedded,
        "loaded typst fonts"
    );
    fonts
}
