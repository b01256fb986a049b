//! The style property registry.
//!
//! Properties must be registered before declarations naming them can
//! be parsed. The registry is an explicit, process-scoped object: it
//! is constructed once (with the built-in property set), handed by
//! reference to providers and contexts, and only ever appended to.
//! A generation counter lets caches notice when the registered set
//! grows.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::path::TypeRegistry;
use crate::value::{
    Border, BORDER_STYLE, ParseFn, PrintFn, Rgba, Value, ValueKind, ValueParseError,
    ValueRegistry,
};

/// How a shorthand property expands to and from its longhands.
///
/// `pack(unpack(v))` must equal `v` for every representable value.
#[derive(Debug, Clone, Copy)]
pub struct Shorthand {
    /// The longhand property names, in the order `unpack` and `pack`
    /// use.
    pub longhands: &'static [&'static str],
    /// Split one shorthand value into longhand values, aligned with
    /// `longhands`. None if the value has the wrong shape.
    pub unpack: fn(&Value) -> Option<Vec<Value>>,
    /// Combine current longhand values (in `longhands` order) back
    /// into one shorthand value.
    pub pack: fn(&[Value]) -> Option<Value>,
}

/// A registered style property.
#[derive(Debug)]
pub struct StyleProperty {
    /// The property name as written in style sheets.
    pub name: String,
    /// The kind of value it holds.
    pub kind: ValueKind,
    /// Value used when no rule sets the property.
    pub default: Option<Value>,
    /// Parse override; falls back to the value registry's conversion
    /// for `kind`.
    pub parse: Option<ParseFn>,
    /// Print override, likewise.
    pub print: Option<PrintFn>,
    /// Present on shorthand properties.
    pub shorthand: Option<Shorthand>,
}

impl StyleProperty {
    /// A property of the given name and kind, no default, no
    /// overrides.
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            parse: None,
            print: None,
            shorthand: None,
        }
    }

    /// Set the default value.
    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Set a custom parse function.
    #[must_use]
    pub fn with_parse(mut self, parse: ParseFn) -> Self {
        self.parse = Some(parse);
        self
    }

    /// Set a custom print function.
    #[must_use]
    pub fn with_print(mut self, print: PrintFn) -> Self {
        self.print = Some(print);
        self
    }

    /// Mark the property as a shorthand.
    #[must_use]
    pub const fn with_shorthand(mut self, shorthand: Shorthand) -> Self {
        self.shorthand = Some(shorthand);
        self
    }
}

/// The process-wide registry: properties, value conversions and the
/// widget type hierarchy, bundled so consumers take one reference.
#[derive(Debug)]
pub struct StyleRegistry {
    properties: RefCell<PropertyTable>,
    values: ValueRegistry,
    types: TypeRegistry,
    generation: Cell<u64>,
}

#[derive(Default)]
#[derive(Debug)]
struct PropertyTable {
    by_name: HashMap<String, Rc<StyleProperty>>,
}

impl StyleRegistry {
    /// A registry populated with the built-in property set.
    #[must_use]
    pub fn new() -> Self {
        let registry = Self {
            properties: RefCell::new(PropertyTable::default()),
            values: ValueRegistry::with_defaults(),
            types: TypeRegistry::new(),
            generation: Cell::new(0),
        };
        registry.register_builtins();
        registry
    }

    /// Register a property. Returns false (and changes nothing) if the
    /// name is already taken; the first registration wins.
    pub fn register_property(&self, property: StyleProperty) -> bool {
        let mut table = self.properties.borrow_mut();
        if table.by_name.contains_key(&property.name) {
            return false;
        }
        let _ = table
            .by_name
            .insert(property.name.clone(), Rc::new(property));
        self.bump();
        true
    }

    /// Register a widget type with an optional parent, for selector
    /// scoring.
    pub fn register_type(&self, name: &str, parent: Option<&str>) -> bool {
        let registered = self.types.register(name, parent);
        if registered {
            self.bump();
        }
        registered
    }

    /// Look up a property by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<Rc<StyleProperty>> {
        self.properties.borrow().by_name.get(name).map(Rc::clone)
    }

    /// The value conversion table.
    #[must_use]
    pub const fn values(&self) -> &ValueRegistry {
        &self.values
    }

    /// The widget type hierarchy.
    #[must_use]
    pub const fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Bumped on every registration; caches compare it to notice that
    /// the registered set changed.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    /// Parse declaration text for a property, honoring its parse
    /// override.
    pub fn parse_value(
        &self,
        property: &StyleProperty,
        text: &str,
    ) -> Result<Value, ValueParseError> {
        match property.parse {
            Some(parse) => parse(text),
            None => self.values.parse(property.kind, text),
        }
    }

    /// Print a property's value back to declaration text, honoring its
    /// print override.
    #[must_use]
    pub fn print_value(&self, property: &StyleProperty, value: &Value) -> String {
        match property.print {
            Some(print) => print(value),
            None => self.values.print(property.kind, value),
        }
    }

    fn bump(&self) {
        self.generation.set(self.generation.get() + 1);
    }

    /// The built-in property set every context understands.
    fn register_builtins(&self) {
        let sides_shorthand = |longhands| Shorthand {
            longhands,
            unpack: unpack_sides,
            pack: pack_sides,
        };

        let builtins = [
            StyleProperty::new("color", ValueKind::Color)
                .with_default(Value::Rgba(Rgba::BLACK)),
            StyleProperty::new("background-color", ValueKind::Color)
                .with_default(Value::Rgba(Rgba::TRANSPARENT)),
            StyleProperty::new("border-color", ValueKind::Color)
                .with_default(Value::Rgba(Rgba::TRANSPARENT)),
            StyleProperty::new("font", ValueKind::Font),
            StyleProperty::new("border-style", ValueKind::Enum(&BORDER_STYLE))
                .with_default(Value::Enum {
                    table: &BORDER_STYLE,
                    value: 0,
                }),
            StyleProperty::new("border-radius", ValueKind::Integer)
                .with_default(Value::Integer(0)),
            StyleProperty::new("background-image", ValueKind::Gradient),
            StyleProperty::new("transition", ValueKind::Transition),
            StyleProperty::new("engine", ValueKind::Engine),
            StyleProperty::new("margin", ValueKind::Border).with_shorthand(sides_shorthand(
                MARGIN_SIDES,
            )),
            StyleProperty::new("padding", ValueKind::Border).with_shorthand(sides_shorthand(
                PADDING_SIDES,
            )),
            StyleProperty::new("border-width", ValueKind::Border).with_shorthand(
                sides_shorthand(BORDER_WIDTH_SIDES),
            ),
        ];
        for property in builtins {
            let _ = self.register_property(property);
        }

        for longhand in MARGIN_SIDES
            .iter()
            .chain(PADDING_SIDES)
            .chain(BORDER_WIDTH_SIDES)
        {
            let _ = self.register_property(
                StyleProperty::new(*longhand, ValueKind::Integer)
                    .with_default(Value::Integer(0)),
            );
        }
    }
}

impl Default for StyleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Longhands of the `margin` shorthand.
pub const MARGIN_SIDES: &[&str] = &["margin-top", "margin-right", "margin-bottom", "margin-left"];
/// Longhands of the `padding` shorthand.
pub const PADDING_SIDES: &[&str] = &[
    "padding-top",
    "padding-right",
    "padding-bottom",
    "padding-left",
];
/// Longhands of the `border-width` shorthand.
pub const BORDER_WIDTH_SIDES: &[&str] = &[
    "border-top-width",
    "border-right-width",
    "border-bottom-width",
    "border-left-width",
];

/// One Border value into four Integer longhands (top, right, bottom,
/// left).
fn unpack_sides(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Border(border) => Some(vec![
            Value::Integer(i64::from(border.top)),
            Value::Integer(i64::from(border.right)),
            Value::Integer(i64::from(border.bottom)),
            Value::Integer(i64::from(border.left)),
        ]),
        _ => None,
    }
}

/// Four Integer longhands back into one Border value.
fn pack_sides(values: &[Value]) -> Option<Value> {
    let side = |value: &Value| match value {
        Value::Integer(n) => i16::try_from(*n).ok(),
        _ => None,
    };
    match values {
        [top, right, bottom, left] => Some(Value::Border(Border {
            top: side(top)?,
            right: side(right)?,
            bottom: side(bottom)?,
            left: side(left)?,
        })),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_registered() {
        let registry = StyleRegistry::new();
        assert!(registry.property("color").is_some());
        assert!(registry.property("margin-left").is_some());
        assert!(registry.property("nonsense").is_none());
    }

    #[test]
    fn test_registration_is_first_wins_and_bumps_generation() {
        let registry = StyleRegistry::new();
        let before = registry.generation();

        assert!(registry.register_property(StyleProperty::new("-app-glow", ValueKind::Number)));
        assert!(registry.generation() > before);
        assert!(!registry.register_property(StyleProperty::new("-app-glow", ValueKind::Text)));
    }

    #[test]
    fn test_shorthand_round_trips() {
        let registry = StyleRegistry::new();
        let margin = registry.property("margin").unwrap();
        let shorthand = margin.shorthand.unwrap();

        let value = Value::Border(Border {
            top: 4,
            right: 8,
            bottom: 4,
            left: 8,
        });
        let longhands = (shorthand.unpack)(&value).unwrap();
        assert_eq!(longhands.len(), 4);
        assert_eq!((shorthand.pack)(&longhands).unwrap(), value);
    }

    #[test]
    fn test_parse_value_honors_override() {
        fn always_seven(_: &str) -> Result<Value, ValueParseError> {
            Ok(Value::Integer(7))
        }

        let registry = StyleRegistry::new();
        assert!(registry.register_property(
            StyleProperty::new("-app-columns", ValueKind::Integer).with_parse(always_seven)
        ));

        let property = registry.property("-app-columns").unwrap();
        assert_eq!(
            registry.parse_value(&property, "whatever").unwrap(),
            Value::Integer(7)
        );
    }
}
