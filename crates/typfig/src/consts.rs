//! Internal constants for Typst block rendering.

/// Fence language identifier matched by default.
pub const DEFAULT_IDENTIFIER: &str = "typst";

/// Compilation cache entries retained between snippets.
pub const DEFAULT_CACHE_BOUND: usize = 10;

/// Directives prepended to every snippet by the default source wrapper.
///
/// Auto-sized page with a small margin, so the SVG hugs the content instead
/// of rendering a full document page.
pub(crate) const SOURCE_PRELUDE: &str =
    "#set page(width: auto, height: auto, margin: 5pt)\n#set text(size: 18pt)\n";
