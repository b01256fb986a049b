//! Error taxonomy for the style engine.
//!
//! Every problem found while parsing or resolving styles is
//! recoverable: one bad rule, declaration or color reference never
//! aborts a whole style sheet. Recoverable problems are routed to an
//! [`ErrorSink`] injected by the caller. Only the resource-loading
//! entry points return hard errors, as [`LoadError`], and those leave
//! any previously loaded rules untouched.

use std::path::PathBuf;

use thiserror::Error;

use crate::tokenizer::SourceLocation;

/// A recoverable problem in a style sheet or at resolve time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StyleError {
    /// An unexpected token while parsing a rule, selector or
    /// declaration. The parser recovers by skipping to the next `}`.
    #[error("{location}: {message}")]
    Syntax {
        /// Where the problem was found.
        location: SourceLocation,
        /// What went wrong.
        message: String,
    },

    /// A property value string could not be parsed for its declared
    /// kind. The declaration is dropped, parsing continues.
    #[error("invalid value for '{property}': {message}")]
    UnknownValue {
        /// The property whose value failed to parse.
        property: String,
        /// Why the value was rejected.
        message: String,
    },

    /// Non-fatal notice about a construct kept for compatibility.
    #[error("deprecated: {0}")]
    Deprecated(String),

    /// A symbolic color or widget type name could not be resolved.
    /// Resolution may succeed later once more sources or types are
    /// registered, so this never escalates beyond the sink.
    #[error("unresolved reference '{0}'")]
    UnresolvedReference(String),
}

/// A hard failure from one of the `load_*` entry points.
///
/// Loading has replace-or-fail semantics: on error the provider keeps
/// whatever rule set it had before the call.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read '{path}': {source}")]
    Io {
        /// The path that failed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// No style sheet was found for the named theme in any search
    /// directory.
    #[error("no style sheet found for theme '{0}'")]
    ThemeNotFound(String),
}

/// Receiver for recoverable style errors.
///
/// Injected into parsing and resolving entry points so the embedding
/// application decides how problems are surfaced.
pub trait ErrorSink {
    /// Record one recoverable error.
    fn report(&mut self, error: StyleError);
}

/// Collects errors into a `Vec`, mainly for tests and tooling.
impl ErrorSink for Vec<StyleError> {
    fn report(&mut self, error: StyleError) {
        self.push(error);
    }
}

/// Sink that prints each distinct error once as a terminal warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct WarnSink;

impl ErrorSink for WarnSink {
    fn report(&mut self, error: StyleError) {
        tessera_common::warning::warn_once("Style", &error.to_string());
    }
}
