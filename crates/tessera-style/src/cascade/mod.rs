//! The cascade: merging prioritized sources into resolved styles.
//!
//! A [`StyleContext`] holds the registered style sources, each with a
//! priority, and resolves an element path to one [`ResolvedStyle`]:
//! every source is queried, the matches are sorted ascending by
//! (priority, specificity score) and their declarations merged so that
//! later entries overwrite earlier ones per property. Shorthands are
//! expanded to their longhands during the merge and symbolic colors
//! are resolved against the union of the sources' color maps.
//!
//! Resolved styles are cached by the path's canonical signature. The
//! whole cache is dropped when any source's rules change, a source is
//! added or removed, or the property registry grows.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::ErrorSink;
use crate::path::ElementPath;
use crate::property::StyleRegistry;
use crate::provider::{RuleMatch, StyleSource};
use crate::value::{ColorLookup, Rgba, SymbolicColor, Value};

/// Priority of built-in fallback styles.
pub const PRIORITY_FALLBACK: u16 = 1;
/// Priority of styles loaded from a theme.
pub const PRIORITY_THEME: u16 = 200;
/// Priority of styles derived from toolkit settings.
pub const PRIORITY_SETTINGS: u16 = 400;
/// Priority of styles installed by the application.
pub const PRIORITY_APPLICATION: u16 = 600;
/// Priority of user overrides; wins over everything else.
pub const PRIORITY_USER: u16 = 800;

/// An immutable resolved property set for one element signature.
///
/// Built once per cache miss and shared behind `Rc`; an unchanged
/// context hands out the same allocation for the same path again.
pub struct ResolvedStyle {
    registry: Rc<StyleRegistry>,
    values: HashMap<String, Value>,
}

impl ResolvedStyle {
    /// The value of `name`, falling back to the property's registered
    /// default when no rule set it.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.values.get(name) {
            return Some(value.clone());
        }
        self.registry.property(name)?.default.clone()
    }

    /// The value of `name` as set by the cascade, without the default
    /// fallback.
    #[must_use]
    pub fn declared(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// The names of all properties the cascade set.
    pub fn declared_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// The canonical cache key of one element path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StyleSignature {
    elements: Vec<ElementSignature>,
    state: u16,
    junction: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ElementSignature {
    type_name: String,
    instance_name: Option<String>,
    classes: Vec<String>,
    regions: Vec<(String, u16)>,
    position: u16,
}

impl StyleSignature {
    /// Class and region sets are kept sorted by the path itself, so
    /// the signature is canonical by construction.
    fn of(path: &ElementPath) -> Self {
        let elements = path
            .elements
            .iter()
            .map(|element| ElementSignature {
                type_name: element.type_name.clone(),
                instance_name: element.instance_name.clone(),
                classes: element.classes.iter().cloned().collect(),
                regions: element
                    .regions
                    .iter()
                    .map(|(name, flags)| (name.clone(), flags.bits()))
                    .collect(),
                position: element.position.bits(),
            })
            .collect();
        Self {
            elements,
            state: path.state.bits(),
            junction: path.junction.bits(),
        }
    }
}

/// The union of every source's color declarations, higher priority
/// last so it wins.
#[derive(Default)]
struct ColorMap(HashMap<String, SymbolicColor>);

impl ColorLookup for ColorMap {
    fn lookup_color(&self, name: &str) -> Option<&SymbolicColor> {
        self.0.get(name)
    }
}

/// Everything the cache's validity depends on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Epoch {
    /// Bumped locally on provider add/remove.
    membership: u64,
    /// The providers' serials, in provider order.
    serials: Vec<u64>,
    /// The registry generation.
    generation: u64,
}

struct ProviderEntry {
    priority: u16,
    source: Rc<dyn StyleSource>,
}

/// Resolves element paths against prioritized style sources, with a
/// per-signature cache.
pub struct StyleContext {
    registry: Rc<StyleRegistry>,
    providers: Vec<ProviderEntry>,
    membership: u64,
    cache: RefCell<HashMap<StyleSignature, Rc<ResolvedStyle>>>,
    colors: RefCell<ColorMap>,
    epoch: RefCell<Epoch>,
}

impl StyleContext {
    /// A context with no style sources.
    #[must_use]
    pub fn new(registry: Rc<StyleRegistry>) -> Self {
        Self {
            registry,
            providers: Vec::new(),
            membership: 0,
            cache: RefCell::new(HashMap::new()),
            colors: RefCell::new(ColorMap::default()),
            epoch: RefCell::new(Epoch::default()),
        }
    }

    /// The registry this context parses and resolves against.
    #[must_use]
    pub fn registry(&self) -> &Rc<StyleRegistry> {
        &self.registry
    }

    /// Add a style source at the given priority.
    ///
    /// Among sources with equal priority, the one added later wins.
    pub fn add_provider(&mut self, priority: u16, source: Rc<dyn StyleSource>) {
        self.providers.push(ProviderEntry { priority, source });
        self.providers.sort_by_key(|entry| entry.priority);
        self.membership += 1;
    }

    /// Remove a previously added source. Returns false if the source
    /// was not registered.
    pub fn remove_provider(&mut self, source: &Rc<dyn StyleSource>) -> bool {
        let before = self.providers.len();
        self.providers
            .retain(|entry| !Rc::ptr_eq(&entry.source, source));
        let removed = self.providers.len() != before;
        if removed {
            self.membership += 1;
        }
        removed
    }

    /// Resolve the style for `path`.
    ///
    /// Returns the cached entry when nothing changed since it was
    /// built; otherwise builds exactly one new entry for the path's
    /// signature. Unresolvable color references fall back to
    /// transparent and are reported to `sink`.
    pub fn resolve(&self, path: &ElementPath, sink: &mut dyn ErrorSink) -> Rc<ResolvedStyle> {
        self.synchronize();

        let signature = StyleSignature::of(path);
        if let Some(hit) = self.cache.borrow().get(&signature) {
            return Rc::clone(hit);
        }

        let built = Rc::new(self.build(path, sink));
        let mut cache = self.cache.borrow_mut();
        Rc::clone(cache.entry(signature).or_insert(built))
    }

    /// Resolve a named color against the merged color map.
    #[must_use]
    pub fn lookup_color(&self, name: &str) -> Option<Rgba> {
        self.synchronize();
        let colors = self.colors.borrow();
        let symbolic = colors.0.get(name)?.clone();
        symbolic.resolve(&*colors, None).ok()
    }

    /// Drop every cached resolution and rebuild the merged color map
    /// if any source, the provider set, or the registry changed.
    fn synchronize(&self) {
        let current = Epoch {
            membership: self.membership,
            serials: self
                .providers
                .iter()
                .map(|entry| entry.source.serial())
                .collect(),
            generation: self.registry.generation(),
        };
        if *self.epoch.borrow() == current {
            return;
        }

        self.cache.borrow_mut().clear();
        let mut merged = HashMap::new();
        for entry in &self.providers {
            // Ascending priority: later inserts overwrite, so higher
            // priority sources own contested names.
            merged.extend(entry.source.color_map());
        }
        *self.colors.borrow_mut() = ColorMap(merged);
        *self.epoch.borrow_mut() = current;
    }

    fn build(&self, path: &ElementPath, sink: &mut dyn ErrorSink) -> ResolvedStyle {
        let mut matches: Vec<(u16, RuleMatch)> = Vec::new();
        for entry in &self.providers {
            for rule_match in entry.source.query(path, self.registry.types()) {
                matches.push((entry.priority, rule_match));
            }
        }
        // Stable: sources at equal (priority, score) keep their
        // registration order, selectors within a source their sheet
        // order.
        matches.sort_by_key(|(priority, rule_match)| (*priority, rule_match.score));

        let mut values: HashMap<String, Value> = HashMap::new();
        for (_, rule_match) in &matches {
            for declaration in &rule_match.declarations.declarations {
                self.merge_declaration(&mut values, &declaration.name, &declaration.value);
            }
        }

        let colors = self.colors.borrow();
        // The element's own color first, so everything else can refer
        // to it as currentColor.
        let current = match values.get_mut("color") {
            Some(value) => {
                resolve_value_colors(value, &*colors, None, sink);
                match value {
                    Value::Rgba(rgba) => Some(*rgba),
                    _ => None,
                }
            }
            None => None,
        };
        for (name, value) in &mut values {
            if name != "color" {
                resolve_value_colors(value, &*colors, current, sink);
            }
        }

        ResolvedStyle {
            registry: Rc::clone(&self.registry),
            values,
        }
    }

    /// Apply one declaration to the merged map, expanding shorthands
    /// into their longhands.
    fn merge_declaration(&self, values: &mut HashMap<String, Value>, name: &str, value: &Value) {
        if let Some(property) = self.registry.property(name) {
            if let Some(shorthand) = &property.shorthand {
                if let Some(parts) = (shorthand.unpack)(value) {
                    for (longhand, part) in shorthand.longhands.iter().zip(parts) {
                        let _ = values.insert((*longhand).to_string(), part);
                    }
                    return;
                }
            }
        }
        let _ = values.insert(name.to_string(), value.clone());
    }
}

/// Replace symbolic colors in `value` with concrete ones.
///
/// Unresolvable references become transparent and are reported; they
/// may resolve on a later build once more sources are registered.
fn resolve_value_colors(
    value: &mut Value,
    colors: &dyn ColorLookup,
    current: Option<Rgba>,
    sink: &mut dyn ErrorSink,
) {
    match value {
        Value::Color(symbolic) => {
            let resolved = symbolic.resolve(colors, current).unwrap_or_else(|error| {
                sink.report(error);
                Rgba::TRANSPARENT
            });
            *value = Value::Rgba(resolved);
        }
        Value::Gradient(gradient) => {
            for stop in &mut gradient.stops {
                let resolved = stop.color.resolve(colors, current).unwrap_or_else(|error| {
                    sink.report(error);
                    Rgba::TRANSPARENT
                });
                stop.color = SymbolicColor::Literal(resolved);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StyleError;
    use crate::path::PathElement;
    use crate::provider::TextSourceProvider;

    fn context_with(css: &str) -> StyleContext {
        let registry = Rc::new(StyleRegistry::new());
        let provider = Rc::new(TextSourceProvider::new(Rc::clone(&registry)));
        let mut errors = Vec::new();
        provider.load_from_text(css, &mut errors);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");

        let mut context = StyleContext::new(registry);
        context.add_provider(PRIORITY_APPLICATION, provider);
        context
    }

    #[test]
    fn test_get_falls_back_to_the_default() {
        let context = context_with("Button { border-radius: 3; }");
        let path = ElementPath::new().then(PathElement::new("Button"));
        let mut errors = Vec::new();

        let style = context.resolve(&path, &mut errors);
        assert_eq!(style.get("border-radius"), Some(Value::Integer(3)));
        // Never declared, but registered with a default.
        assert_eq!(style.get("margin-top"), Some(Value::Integer(0)));
        assert_eq!(style.declared("margin-top"), None);
    }

    #[test]
    fn test_equal_priority_later_provider_wins() {
        let registry = Rc::new(StyleRegistry::new());
        let mut errors = Vec::new();

        let first = Rc::new(TextSourceProvider::new(Rc::clone(&registry)));
        first.load_from_text("Button { border-radius: 1; }", &mut errors);
        let second = Rc::new(TextSourceProvider::new(Rc::clone(&registry)));
        second.load_from_text("Button { border-radius: 2; }", &mut errors);

        let mut context = StyleContext::new(registry);
        context.add_provider(PRIORITY_APPLICATION, first);
        context.add_provider(PRIORITY_APPLICATION, second);

        let path = ElementPath::new().then(PathElement::new("Button"));
        let style = context.resolve(&path, &mut errors);
        assert_eq!(style.get("border-radius"), Some(Value::Integer(2)));
    }

    #[test]
    fn test_current_color_follows_the_color_property() {
        let context = context_with("Button { color: #204060; border-color: currentColor; }");
        let path = ElementPath::new().then(PathElement::new("Button"));
        let mut errors = Vec::new();

        let style = context.resolve(&path, &mut errors);
        assert_eq!(
            style.get("border-color"),
            Some(Value::Rgba(Rgba::opaque(0x20, 0x40, 0x60)))
        );
    }

    #[test]
    fn test_unresolved_color_is_transparent_and_reported() {
        let context = context_with("Button { background-color: @missing; }");
        let path = ElementPath::new().then(PathElement::new("Button"));
        let mut errors = Vec::new();

        let style = context.resolve(&path, &mut errors);
        assert_eq!(
            style.get("background-color"),
            Some(Value::Rgba(Rgba::TRANSPARENT))
        );
        assert!(matches!(errors[0], StyleError::UnresolvedReference(_)));
    }

    #[test]
    fn test_remove_provider_invalidates() {
        let registry = Rc::new(StyleRegistry::new());
        let provider = Rc::new(TextSourceProvider::new(Rc::clone(&registry)));
        let mut errors = Vec::new();
        provider.load_from_text("Button { border-radius: 9; }", &mut errors);

        let mut context = StyleContext::new(registry);
        let source: Rc<dyn StyleSource> = provider;
        context.add_provider(PRIORITY_THEME, Rc::clone(&source));

        let path = ElementPath::new().then(PathElement::new("Button"));
        let style = context.resolve(&path, &mut errors);
        assert_eq!(style.get("border-radius"), Some(Value::Integer(9)));

        assert!(context.remove_provider(&source));
        let style = context.resolve(&path, &mut errors);
        assert_eq!(style.declared("border-radius"), None);
    }
}
