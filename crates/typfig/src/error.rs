//! Compilation error types.

use thiserror::Error;

/// A Typst compilation failed.
#[derive(Debug, Error)]
#[error("typst compilation failed: {kind}")]
pub struct CompileError {
    /// What went wrong.
    pub kind: CompileErrorKind,
}

/// Kind of compilation failure.
#[derive(Debug, Error)]
pub enum CompileErrorKind {
    /// The snippet is not valid Typst source.
    #[error("invalid source: {}", .diagnostics.join("; "))]
    InvalidSource {
        /// Formatted error diagnostics, one per source error.
        diagnostics: Vec<String>,
    },

    /// The compilation engine itself failed (e.g. no usable fonts).
    #[error("engine fault: {0}")]
    EngineFault(String),
}

impl CompileError {
    pub(crate) fn invalid_source(diagnostics: Vec<String>) -> Self {
        Self {
            kind: CompileErrorKind::InvalidSource { diagnostics },
        }
    }

    pub(crate) fn engine_fault(message: impl Into<String>) -> Self {
        Self {
            kind: CompileErrorKind::EngineFault(message.into()),
        }
    }
}
