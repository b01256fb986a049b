//! Typed property values and the parse/print registry.
//!
//! Every style property declares a [`ValueKind`]; the [`ValueRegistry`]
//! maps kinds to string↔value conversion functions, so providers can
//! turn declaration text into typed [`Value`]s at load time and
//! serialize them back. Kinds without an exact registration fall back
//! to their fundamental category: any enum-like kind is handled by a
//! generic symbolic-name parser over its [`SymbolTable`], flags-like
//! kinds by the matching whitespace-separated variant.

/// Border values (also used by margin/padding shorthands).
pub mod border;
/// Concrete and symbolic color values.
pub mod color;
/// Font description values.
pub mod font;
/// Gradient values.
pub mod gradient;

use std::cell::RefCell;
use std::collections::HashMap;

use thiserror::Error;

use crate::animation::TransitionDescription;

pub use border::Border;
pub use color::{ColorLookup, Rgba, SymbolicColor};
pub use font::{FontDescription, FontStyle, FontWeight};
pub use gradient::{Gradient, GradientShape, GradientStop};

/// Why a value string was rejected by a parse function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValueParseError(String);

impl ValueParseError {
    /// Create an error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A name ↔ number table backing an enum- or flags-valued kind.
///
/// Tables are `'static`: they describe closed keyword sets known at
/// compile time, e.g. border styles.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SymbolTable {
    /// The table's name, for diagnostics.
    pub name: &'static str,
    /// (keyword, numeric value) pairs.
    pub entries: &'static [(&'static str, i32)],
}

impl SymbolTable {
    /// The numeric value registered for `keyword`, if any.
    #[must_use]
    pub fn value_of(&self, keyword: &str) -> Option<i32> {
        self.entries
            .iter()
            .find(|(name, _)| keyword.eq_ignore_ascii_case(name))
            .map(|(_, value)| *value)
    }

    /// The keyword registered for `value`, if any.
    #[must_use]
    pub fn name_of(&self, value: i32) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(name, _)| *name)
    }
}

/// Keywords for the `border-style` property.
pub static BORDER_STYLE: SymbolTable = SymbolTable {
    name: "BorderStyle",
    entries: &[("none", 0), ("solid", 1), ("inset", 2), ("outset", 3)],
};

/// The kind of value a property holds, the registry's lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// A concrete color, no symbolic references allowed.
    Rgba,
    /// A color expression, resolved at cascade time.
    Color,
    /// A floating point number.
    Number,
    /// An integer.
    Integer,
    /// A boolean.
    Boolean,
    /// A string.
    Text,
    /// Four per-side widths.
    Border,
    /// A font description.
    Font,
    /// A gradient.
    Gradient,
    /// A state-transition description.
    Transition,
    /// A theming engine, referenced by name.
    Engine,
    /// One keyword out of a closed set.
    Enum(&'static SymbolTable),
    /// A combination of keywords out of a closed set.
    Flags(&'static SymbolTable),
}

/// A typed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A concrete color.
    Rgba(Rgba),
    /// A color expression, resolved at cascade time.
    Color(SymbolicColor),
    /// A floating point number.
    Number(f64),
    /// An integer.
    Integer(i64),
    /// A boolean.
    Boolean(bool),
    /// A string.
    Text(String),
    /// Four per-side widths.
    Border(Border),
    /// A font description.
    Font(FontDescription),
    /// A gradient.
    Gradient(Gradient),
    /// A state-transition description.
    Transition(TransitionDescription),
    /// A keyword from the table, stored by numeric value.
    Enum {
        /// The keyword set this value belongs to.
        table: &'static SymbolTable,
        /// The numeric value of the chosen keyword.
        value: i32,
    },
    /// A keyword combination from the table, stored as OR-ed bits.
    Flags {
        /// The keyword set this value belongs to.
        table: &'static SymbolTable,
        /// The OR of the chosen keywords' values.
        bits: u32,
    },
    /// A theming engine, referenced by name.
    Engine(String),
    /// Unparsed text of a custom (engine-specific) property.
    Raw(String),
}

impl Value {
    /// Serialize to declaration text. For every built-in kind this is
    /// the inverse of the registered parse function.
    #[must_use]
    pub fn to_css_string(&self) -> String {
        match self {
            Self::Rgba(color) => color.to_hex(),
            Self::Color(color) => color.to_css_string(),
            Self::Number(n) => n.to_string(),
            Self::Integer(n) => n.to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Text(text) => quote(text),
            Self::Border(border) => border.to_css_string(),
            Self::Font(font) => font.to_css_string(),
            Self::Gradient(gradient) => gradient.to_css_string(),
            Self::Transition(transition) => transition.to_css_string(),
            Self::Enum { table, value } => table
                .name_of(*value)
                .map_or_else(|| value.to_string(), ToString::to_string),
            Self::Flags { table, bits } => {
                let names: Vec<&str> = table
                    .entries
                    .iter()
                    .filter(|(_, value)| {
                        let bit = u32_bits(*value);
                        bit != 0 && bits & bit == bit
                    })
                    .map(|(name, _)| *name)
                    .collect();
                names.join(" ")
            }
            Self::Engine(name) | Self::Raw(name) => name.clone(),
        }
    }

    /// Interpolate between two values of the same variant.
    ///
    /// Supports the variants a state transition can blend: numbers,
    /// integers, concrete colors and borders. Everything else (and
    /// mismatched variants) returns None, meaning the consumer should
    /// snap at the transition midpoint instead.
    #[must_use]
    pub fn interpolate(&self, other: &Self, t: f64) -> Option<Self> {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => Some(Self::Number(a + (b - a) * t)),
            (Self::Integer(a), Self::Integer(b)) => Some(Self::Integer(lerp_i64(*a, *b, t))),
            (Self::Rgba(a), Self::Rgba(b)) => Some(Self::Rgba(a.mix(*b, t))),
            (Self::Border(a), Self::Border(b)) => Some(Self::Border(Border {
                top: lerp_i16(a.top, b.top, t),
                right: lerp_i16(a.right, b.right, t),
                bottom: lerp_i16(a.bottom, b.bottom, t),
                left: lerp_i16(a.left, b.left, t),
            })),
            _ => None,
        }
    }
}

fn u32_bits(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn lerp_i64(a: i64, b: i64, t: f64) -> i64 {
    ((a as f64) + ((b as f64) - (a as f64)) * t).round() as i64
}

#[allow(clippy::cast_possible_truncation)]
fn lerp_i16(a: i16, b: i16, t: f64) -> i16 {
    (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as i16
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

fn unquote(text: &str) -> Option<String> {
    let mut chars = text.chars();
    let quote = chars.next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let mut out = String::new();
    loop {
        match chars.next() {
            Some('\\') => out.push(chars.next()?),
            Some(c) if c == quote => {
                // The quote must end the text.
                return chars.next().is_none().then_some(out);
            }
            Some(c) => out.push(c),
            None => return None,
        }
    }
}

/// Parse function: declaration text to a typed value.
pub type ParseFn = fn(&str) -> Result<Value, ValueParseError>;
/// Print function: typed value back to declaration text.
pub type PrintFn = fn(&Value) -> String;

#[derive(Debug, Clone, Copy)]
struct Conversion {
    parse: ParseFn,
    print: PrintFn,
}

/// The kind → conversion function table.
///
/// Constructed once with the built-in conversions and passed by
/// reference to everything that parses or prints values. Registration
/// is append-only (first registration of a kind wins) and goes through
/// interior mutability so the registry can be shared; the engine is
/// single-threaded by design.
#[derive(Debug)]
pub struct ValueRegistry {
    conversions: RefCell<HashMap<ValueKind, Conversion>>,
}

impl ValueRegistry {
    /// A registry with conversions for every built-in kind.
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self {
            conversions: RefCell::new(HashMap::new()),
        };

        let defaults: &[(ValueKind, ParseFn)] = &[
            (ValueKind::Rgba, parse_rgba),
            (ValueKind::Color, parse_color),
            (ValueKind::Number, parse_number),
            (ValueKind::Integer, parse_integer),
            (ValueKind::Boolean, parse_boolean),
            (ValueKind::Text, parse_text),
            (ValueKind::Border, parse_border),
            (ValueKind::Font, parse_font),
            (ValueKind::Gradient, parse_gradient),
            (ValueKind::Transition, parse_transition),
            (ValueKind::Engine, parse_engine),
        ];
        for (kind, parse) in defaults {
            let _ = registry.register(*kind, *parse, print_default);
        }

        registry
    }

    /// Register a conversion for `kind`.
    ///
    /// Returns false if the kind already has one; the first
    /// registration wins.
    pub fn register(&self, kind: ValueKind, parse: ParseFn, print: PrintFn) -> bool {
        let mut conversions = self.conversions.borrow_mut();
        if conversions.contains_key(&kind) {
            return false;
        }
        let _ = conversions.insert(kind, Conversion { parse, print });
        true
    }

    /// Parse declaration text for `kind`.
    ///
    /// Falls back to the generic enum/flags parser for enum-like kinds
    /// without an exact registration.
    pub fn parse(&self, kind: ValueKind, text: &str) -> Result<Value, ValueParseError> {
        let registered = self.conversions.borrow().get(&kind).map(|c| c.parse);
        if let Some(parse) = registered {
            return parse(text);
        }
        match kind {
            ValueKind::Enum(table) => parse_enum(table, text),
            ValueKind::Flags(table) => parse_flags(table, text),
            other => Err(ValueParseError::new(format!(
                "no parser registered for {other:?}"
            ))),
        }
    }

    /// Print a value of `kind` back to declaration text.
    #[must_use]
    pub fn print(&self, kind: ValueKind, value: &Value) -> String {
        let registered = self.conversions.borrow().get(&kind).map(|c| c.print);
        registered.map_or_else(|| value.to_css_string(), |print| print(value))
    }
}

fn print_default(value: &Value) -> String {
    value.to_css_string()
}

/// A concrete color: any symbolic expression over literals, resolved
/// immediately. Named references are rejected for this kind.
fn parse_rgba(text: &str) -> Result<Value, ValueParseError> {
    let symbolic = SymbolicColor::parse(text)?;
    symbolic
        .resolve(&(), None)
        .map(Value::Rgba)
        .map_err(|_| ValueParseError::new(format!("'{}' is not a concrete color", text.trim())))
}

fn parse_color(text: &str) -> Result<Value, ValueParseError> {
    SymbolicColor::parse(text).map(Value::Color)
}

fn parse_number(text: &str) -> Result<Value, ValueParseError> {
    text.trim()
        .parse()
        .map(Value::Number)
        .map_err(|_| ValueParseError::new(format!("invalid number '{}'", text.trim())))
}

fn parse_integer(text: &str) -> Result<Value, ValueParseError> {
    text.trim()
        .parse()
        .map(Value::Integer)
        .map_err(|_| ValueParseError::new(format!("invalid integer '{}'", text.trim())))
}

fn parse_boolean(text: &str) -> Result<Value, ValueParseError> {
    match text.trim() {
        "true" | "1" => Ok(Value::Boolean(true)),
        "false" | "0" => Ok(Value::Boolean(false)),
        other => Err(ValueParseError::new(format!("invalid boolean '{other}'"))),
    }
}

fn parse_text(text: &str) -> Result<Value, ValueParseError> {
    let trimmed = text.trim();
    Ok(Value::Text(
        unquote(trimmed).unwrap_or_else(|| trimmed.to_string()),
    ))
}

fn parse_border(text: &str) -> Result<Value, ValueParseError> {
    Border::parse(text).map(Value::Border)
}

fn parse_font(text: &str) -> Result<Value, ValueParseError> {
    let trimmed = text.trim();
    let unquoted = unquote(trimmed).unwrap_or_else(|| trimmed.to_string());
    FontDescription::parse(&unquoted).map(Value::Font)
}

fn parse_gradient(text: &str) -> Result<Value, ValueParseError> {
    Gradient::parse(text).map(Value::Gradient)
}

fn parse_transition(text: &str) -> Result<Value, ValueParseError> {
    TransitionDescription::parse(text).map(Value::Transition)
}

fn parse_engine(text: &str) -> Result<Value, ValueParseError> {
    let name = text.trim();
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
        return Err(ValueParseError::new(format!("invalid engine name '{name}'")));
    }
    Ok(Value::Engine(name.to_string()))
}

/// Generic fallback for enum-like kinds: one keyword from the table.
fn parse_enum(table: &'static SymbolTable, text: &str) -> Result<Value, ValueParseError> {
    let keyword = text.trim();
    table
        .value_of(keyword)
        .map(|value| Value::Enum { table, value })
        .ok_or_else(|| {
            ValueParseError::new(format!("'{keyword}' is not a {} value", table.name))
        })
}

/// Generic fallback for flags-like kinds: whitespace-separated
/// keywords, OR-ed together.
fn parse_flags(table: &'static SymbolTable, text: &str) -> Result<Value, ValueParseError> {
    let mut bits = 0_u32;
    for keyword in text.split_whitespace() {
        let value = table.value_of(keyword).ok_or_else(|| {
            ValueParseError::new(format!("'{keyword}' is not a {} value", table.name))
        })?;
        bits |= u32_bits(value);
    }
    Ok(Value::Flags { table, bits })
}

#[cfg(test)]
mod tests {
    use super::*;

    static TEST_FLAGS: SymbolTable = SymbolTable {
        name: "TestFlags",
        entries: &[("alpha", 1), ("beta", 2), ("gamma", 4)],
    };

    #[test]
    fn test_enum_fallback_parses_keywords() {
        let registry = ValueRegistry::with_defaults();
        let value = registry
            .parse(ValueKind::Enum(&BORDER_STYLE), "solid")
            .unwrap();
        assert_eq!(
            value,
            Value::Enum {
                table: &BORDER_STYLE,
                value: 1
            }
        );
        assert!(registry.parse(ValueKind::Enum(&BORDER_STYLE), "wavy").is_err());
    }

    #[test]
    fn test_flags_fallback_ors_keywords() {
        let registry = ValueRegistry::with_defaults();
        let value = registry
            .parse(ValueKind::Flags(&TEST_FLAGS), "alpha gamma")
            .unwrap();
        assert_eq!(
            value,
            Value::Flags {
                table: &TEST_FLAGS,
                bits: 5
            }
        );
        assert_eq!(registry.print(ValueKind::Flags(&TEST_FLAGS), &value), "alpha gamma");
    }

    #[test]
    fn test_registration_is_first_wins() {
        let registry = ValueRegistry::with_defaults();
        assert!(!registry.register(ValueKind::Number, parse_number, print_default));
    }

    #[test]
    fn test_rgba_kind_rejects_named_references() {
        let registry = ValueRegistry::with_defaults();
        assert!(registry.parse(ValueKind::Rgba, "shade(#804020, 0.7)").is_ok());
        assert!(registry.parse(ValueKind::Rgba, "@theme_bg").is_err());
    }

    #[test]
    fn test_text_round_trip_with_escapes() {
        let registry = ValueRegistry::with_defaults();
        let value = Value::Text("say \"hi\"".to_string());
        let printed = registry.print(ValueKind::Text, &value);
        assert_eq!(registry.parse(ValueKind::Text, &printed).unwrap(), value);
    }

    #[test]
    fn test_interpolate_numbers_and_colors() {
        let a = Value::Number(0.0);
        let b = Value::Number(10.0);
        assert_eq!(a.interpolate(&b, 0.25), Some(Value::Number(2.5)));

        let a = Value::Rgba(Rgba::BLACK);
        let b = Value::Rgba(Rgba::WHITE);
        assert_eq!(
            a.interpolate(&b, 0.5),
            Some(Value::Rgba(Rgba::opaque(128, 128, 128)))
        );

        assert_eq!(a.interpolate(&Value::Number(1.0), 0.5), None);
    }
}
