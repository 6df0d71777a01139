//! Single-file Typst `World` backed by the engine's shared resources.

use std::path::PathBuf;

use typst::Library;
use typst::diag::{FileError, FileResult};
use typst::foundations::{Bytes, Datetime};
use typst::syntax::{FileId, Source, VirtualPath};
use typst::text::{Font, FontBook};
use typst::utils::LazyHash;

use crate::engine::TypstEngine;

/// Compilation world for a single in-memory snippet.
///
/// Borrows the standard library and fonts from the owning [`TypstEngine`].
/// The only readable file is the virtual main file holding the wrapped
/// snippet; everything else answers not-found, so snippets cannot touch the
/// file system.
pub(crate) struct SnippetWorld<'e> {
    engine: &'e TypstEngine,
    main: FileId,
    source: Source,
}

impl<'e> SnippetWorld<'e> {
    pub(crate) fn new(engine: &'e TypstEngine, text: &str) -> Self {
        let main = FileId::new(None, VirtualPath::new("/main.typ"));
        Self {
            engine,
            main,
            source: Source::new(main, text.to_owned()),
        }
    }
}

impl typst::World for SnippetWorld<'_> {
    fn library(&self) -> &LazyHash<Library> {
        self.engine.library()
    }

    fn book(&self) -> &LazyHash<FontBook> {
        self.engine.book()
    }

    fn main(&self) -> FileId {
        self.main
    }

    fn source(&self, id: FileId) -> FileResult<Source> {
        if id == self.main {
            Ok(self.source.clone())
        } else {
            Err(FileError::NotFound(PathBuf::from("<snippet>")))
        }
    }

    fn file(&self, _id: FileId) -> FileResult<Bytes> {
        Err(FileError::NotFound(PathBuf::from("<snippet>")))
    }

    fn font(&self, index: usize) -> Option<Font> {
        self.engine.font(index)
    }

    fn today(&self, _offset: Option<i64>) -> Option<Datetime> {
        // Deterministic output: snippets have no notion of "now".
        None
    }
}
