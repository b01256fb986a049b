//! Style cascade engine for the Tessera UI toolkit.
//!
//! # Scope
//!
//! This crate implements:
//! - **Tokenizer** — a lazy, location-tracking lexer over a CSS-like
//!   grammar, total over arbitrary input.
//! - **Typed values** — a closed [`value::Value`] union with a
//!   parse/print registry keyed by [`value::ValueKind`], including
//!   symbolic colors resolved at cascade time.
//! - **Selectors** — compilation of selector lists into matchable
//!   chains and root-relative matching against an element path, with a
//!   specificity score as the tie-break metric.
//! - **Properties** — the append-only [`property::StyleRegistry`] of
//!   named, typed, defaultable properties with shorthand pack/unpack.
//! - **Providers** — prioritized rule sources loaded from text, files
//!   or a named theme directory search.
//! - **Cascade** — the [`cascade::StyleContext`] that merges every
//!   source's matching rules into a cached
//!   [`cascade::ResolvedStyle`] per element signature.
//! - **Animation** — a scheduler-agnostic driver for timed state
//!   transitions between two resolved styles.
//!
//! The widget layer stays outside: it supplies the
//! [`path::ElementPath`] to match against and consumes resolved
//! values; the engine never walks a widget tree itself.
//!
//! # Errors
//!
//! Parsing and resolution never abort: problems are reported to an
//! injected [`error::ErrorSink`] and recovered from. Only the `load_*`
//! entry points return hard [`error::LoadError`]s.

/// Timed state-transition animation.
pub mod animation;
/// Merging prioritized sources into cached resolved styles.
pub mod cascade;
/// The recoverable error taxonomy and sink.
pub mod error;
/// The style sheet rule parser.
pub mod parser;
/// Element paths, state flags and the widget type hierarchy.
pub mod path;
/// The style property registry.
pub mod property;
/// Style sources: text, file and named-theme providers.
pub mod provider;
/// Selector compilation and matching.
pub mod selector;
/// The style sheet tokenizer.
pub mod tokenizer;
/// Typed property values and conversions.
pub mod value;

pub use animation::{
    ProgressCurve, Rect, RedrawRequest, StateAnimator, TimelineDirection, TransitionDescription,
};
pub use cascade::{
    PRIORITY_APPLICATION, PRIORITY_FALLBACK, PRIORITY_SETTINGS, PRIORITY_THEME, PRIORITY_USER,
    ResolvedStyle, StyleContext,
};
pub use error::{ErrorSink, LoadError, StyleError, WarnSink};
pub use parser::{Declaration, DeclarationBlock, StyleRule, StyleSheet, parse_stylesheet};
pub use path::{ElementPath, JunctionSides, PathElement, RegionFlags, StateFlags, TypeRegistry};
pub use property::{Shorthand, StyleProperty, StyleRegistry};
pub use provider::{RuleMatch, StyleSource, TextSourceProvider, ThemeProvider};
pub use selector::{
    Combinator, SelectorElement, SelectorElementKind, SelectorPath, parse_selector,
    parse_selector_list,
};
pub use tokenizer::{SourceLocation, Token, TokenKind, Tokenizer};
pub use value::{
    Border, ColorLookup, FontDescription, Gradient, Rgba, SymbolicColor, Value, ValueKind,
    ValueRegistry,
};
