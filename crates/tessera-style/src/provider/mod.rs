//! Style sources: where rules come from.
//!
//! A [`StyleSource`] answers rule queries for an element path and
//! exposes its named colors. The closed set of implementations is
//! [`TextSourceProvider`] (rules loaded from text or a file) and
//! [`ThemeProvider`] (a text source found through the named-theme
//! directory search). Sources carry a serial number bumped on every
//! successful load, so style contexts can notice rule changes and drop
//! their caches.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::{ErrorSink, LoadError};
use crate::parser::{DeclarationBlock, StyleSheet, parse_stylesheet};
use crate::path::{ElementPath, StateFlags, TypeRegistry};
use crate::property::StyleRegistry;
use crate::value::SymbolicColor;

/// One rule a source matched against a path.
#[derive(Debug, Clone)]
pub struct RuleMatch {
    /// The selector's specificity score. Always non-zero.
    pub score: u64,
    /// The state flags the rule applies under.
    pub state: StateFlags,
    /// The rule's declarations.
    pub declarations: Rc<DeclarationBlock>,
}

/// A prioritized source of style rules and named colors.
pub trait StyleSource {
    /// Every rule matching `path`, with its score. Only rules whose
    /// state requirement is a subset of the path's leaf state match.
    fn query(&self, path: &ElementPath, types: &TypeRegistry) -> Vec<RuleMatch>;

    /// A copy of the source's `@name` color declarations.
    fn color_map(&self) -> HashMap<String, SymbolicColor>;

    /// The color declared under `name`, if any.
    fn lookup_color(&self, name: &str) -> Option<SymbolicColor> {
        self.color_map().remove(name)
    }

    /// Bumped on every successful (re)load of the source's rules.
    fn serial(&self) -> u64;
}

/// A style source loaded from text or a file.
///
/// Loading has replace-or-fail semantics: a failed
/// [`TextSourceProvider::load_from_path`] leaves the previously loaded
/// rules untouched. Parse problems inside the text are recoverable and
/// never fail the load; they go to the error sink.
#[derive(Debug)]
pub struct TextSourceProvider {
    registry: Rc<StyleRegistry>,
    sheet: RefCell<StyleSheet>,
    serial: Cell<u64>,
}

impl TextSourceProvider {
    /// An empty provider parsing against `registry`.
    #[must_use]
    pub fn new(registry: Rc<StyleRegistry>) -> Self {
        Self {
            registry,
            sheet: RefCell::new(StyleSheet::default()),
            serial: Cell::new(0),
        }
    }

    /// Replace the provider's rules with the ones parsed from `text`.
    pub fn load_from_text(&self, text: &str, sink: &mut dyn ErrorSink) {
        let sheet = parse_stylesheet(text, &self.registry, sink);
        *self.sheet.borrow_mut() = sheet;
        self.serial.set(self.serial.get() + 1);
    }

    /// Replace the provider's rules with the ones parsed from the file
    /// at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Io`] if the file cannot be read, leaving
    /// the previously loaded rules in place.
    pub fn load_from_path(&self, path: &Path, sink: &mut dyn ErrorSink) -> Result<(), LoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_from_text(&text, sink);
        Ok(())
    }

    /// The number of rules currently loaded.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.sheet.borrow().rules.len()
    }
}

impl StyleSource for TextSourceProvider {
    fn query(&self, path: &ElementPath, types: &TypeRegistry) -> Vec<RuleMatch> {
        let sheet = self.sheet.borrow();
        let mut matches = Vec::new();
        for rule in &sheet.rules {
            let score = rule.selector.match_path(path, types);
            if score > 0 {
                matches.push(RuleMatch {
                    score,
                    state: rule.selector.state,
                    declarations: Rc::clone(&rule.declarations),
                });
            }
        }
        matches
    }

    fn color_map(&self) -> HashMap<String, SymbolicColor> {
        self.sheet.borrow().colors.clone()
    }

    fn lookup_color(&self, name: &str) -> Option<SymbolicColor> {
        self.sheet.borrow().colors.get(name).cloned()
    }

    fn serial(&self) -> u64 {
        self.serial.get()
    }
}

/// File name of a theme's style sheet below its theme directory.
const THEME_SHEET: &str = "tessera/style.css";

/// A style source found by theme name.
///
/// The search order is the user's theme directory
/// (`$HOME/.themes/<name>/tessera/style.css`) followed by the system
/// directory (`/usr/share/themes/<name>/tessera/style.css`); the first
/// existing sheet wins.
#[derive(Debug)]
pub struct ThemeProvider {
    inner: TextSourceProvider,
    theme: String,
    path: PathBuf,
}

impl ThemeProvider {
    /// Load the named theme's style sheet.
    ///
    /// # Errors
    ///
    /// [`LoadError::ThemeNotFound`] if no search directory has a sheet
    /// for `theme`, or [`LoadError::Io`] if the sheet exists but cannot
    /// be read.
    pub fn load_named(
        registry: Rc<StyleRegistry>,
        theme: &str,
        sink: &mut dyn ErrorSink,
    ) -> Result<Self, LoadError> {
        let path = theme_search_paths(theme)
            .into_iter()
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| LoadError::ThemeNotFound(theme.to_string()))?;

        let inner = TextSourceProvider::new(registry);
        inner.load_from_path(&path, sink)?;
        Ok(Self {
            inner,
            theme: theme.to_string(),
            path,
        })
    }

    /// The theme name this provider was loaded for.
    #[must_use]
    pub fn theme(&self) -> &str {
        &self.theme
    }

    /// The style sheet the search found.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the sheet from disk, keeping the current rules if the
    /// read fails.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Io`] if the sheet cannot be read.
    pub fn reload(&self, sink: &mut dyn ErrorSink) -> Result<(), LoadError> {
        self.inner.load_from_path(&self.path, sink)
    }
}

impl StyleSource for ThemeProvider {
    fn query(&self, path: &ElementPath, types: &TypeRegistry) -> Vec<RuleMatch> {
        self.inner.query(path, types)
    }

    fn color_map(&self) -> HashMap<String, SymbolicColor> {
        self.inner.color_map()
    }

    fn lookup_color(&self, name: &str) -> Option<SymbolicColor> {
        self.inner.lookup_color(name)
    }

    fn serial(&self) -> u64 {
        self.inner.serial()
    }
}

/// Candidate sheet locations for a theme, in search order.
fn theme_search_paths(theme: &str) -> Vec<PathBuf> {
    let mut paths = Vec::with_capacity(2);
    if let Some(home) = std::env::var_os("HOME") {
        paths.push(
            PathBuf::from(home)
                .join(".themes")
                .join(theme)
                .join(THEME_SHEET),
        );
    }
    paths.push(
        PathBuf::from("/usr/share/themes")
            .join(theme)
            .join(THEME_SHEET),
    );
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathElement;

    fn provider(css: &str) -> TextSourceProvider {
        let provider = TextSourceProvider::new(Rc::new(StyleRegistry::new()));
        let mut errors = Vec::new();
        provider.load_from_text(css, &mut errors);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        provider
    }

    #[test]
    fn test_query_returns_only_matching_rules() {
        let provider = provider("Button { margin: 2; } Entry { margin: 4; }");
        let types = TypeRegistry::new();
        let path = ElementPath::new().then(PathElement::new("Button"));

        let matches = provider.query(&path, &types);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].declarations.declarations[0].name, "margin");
    }

    #[test]
    fn test_state_gated_rule_needs_the_state() {
        let provider = provider("Button:hover { border-radius: 4; }");
        let types = TypeRegistry::new();

        let plain = ElementPath::new().then(PathElement::new("Button"));
        assert!(provider.query(&plain, &types).is_empty());

        let hovered = plain.clone().with_state(StateFlags::HOVER);
        let matches = provider.query(&hovered, &types);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].state, StateFlags::HOVER);
    }

    #[test]
    fn test_serial_bumps_per_load() {
        let provider = provider("Button { margin: 2; }");
        let before = provider.serial();
        let mut errors = Vec::new();
        provider.load_from_text("Entry { margin: 4; }", &mut errors);
        assert!(provider.serial() > before);
    }

    #[test]
    fn test_failed_file_load_keeps_previous_rules() {
        let provider = provider("Button { margin: 2; }");
        let serial = provider.serial();

        let mut errors = Vec::new();
        let result =
            provider.load_from_path(Path::new("/nonexistent/style.css"), &mut errors);
        assert!(matches!(result, Err(LoadError::Io { .. })));
        assert_eq!(provider.rule_count(), 1);
        assert_eq!(provider.serial(), serial);
    }

    #[test]
    fn test_unknown_theme_is_not_found() {
        let mut errors = Vec::new();
        let result = ThemeProvider::load_named(
            Rc::new(StyleRegistry::new()),
            "surely-no-theme-has-this-name",
            &mut errors,
        );
        assert!(matches!(result, Err(LoadError::ThemeNotFound(_))));
    }
}
