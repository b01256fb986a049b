//! Color values: concrete RGBA colors and symbolic color expressions.
//!
//! Style sheets rarely spell out every color. They name a handful of
//! palette colors (`@theme_bg: #ededed;`) and derive the rest with
//! `shade()`, `mix()`, `alpha()`, `lighter()` and `darker()`. A parsed
//! color is therefore a [`SymbolicColor`] expression, resolved against
//! a color map at cascade time rather than parse time, so forward
//! references and cross-source references work.

use serde::Serialize;

use crate::error::StyleError;

use super::ValueParseError;

/// An sRGB color with alpha, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgba {
    /// Red channel (0-255).
    pub r: u8,
    /// Green channel (0-255).
    pub g: u8,
    /// Blue channel (0-255).
    pub b: u8,
    /// Alpha channel (0-255, 255 = fully opaque).
    pub a: u8,
}

impl Rgba {
    /// Opaque black.
    pub const BLACK: Self = Self::opaque(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::opaque(255, 255, 255);
    /// Fully transparent black, the fallback for unresolved colors.
    pub const TRANSPARENT: Self = Self { r: 0, g: 0, b: 0, a: 0 };

    /// An opaque color from its three channels.
    #[must_use]
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse hex notation: `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`.
    ///
    /// Three- and four-digit forms expand by replicating digits, not by
    /// adding zeros.
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |from: usize, to: usize| u8::from_str_radix(&hex[from..to], 16).ok();
        let doubled = |at: usize| u8::from_str_radix(&hex[at..=at].repeat(2), 16).ok();
        match hex.len() {
            3 => Some(Self {
                r: doubled(0)?,
                g: doubled(1)?,
                b: doubled(2)?,
                a: 255,
            }),
            4 => Some(Self {
                r: doubled(0)?,
                g: doubled(1)?,
                b: doubled(2)?,
                a: doubled(3)?,
            }),
            6 => Some(Self {
                r: channel(0, 2)?,
                g: channel(2, 4)?,
                b: channel(4, 6)?,
                a: 255,
            }),
            8 => Some(Self {
                r: channel(0, 2)?,
                g: channel(2, 4)?,
                b: channel(4, 6)?,
                a: channel(6, 8)?,
            }),
            _ => None,
        }
    }

    /// Look up one of the basic named colors.
    #[must_use]
    pub fn from_named(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "black" => Some(Self::opaque(0, 0, 0)),
            "white" => Some(Self::opaque(255, 255, 255)),
            "red" => Some(Self::opaque(255, 0, 0)),
            "green" => Some(Self::opaque(0, 128, 0)),
            "blue" => Some(Self::opaque(0, 0, 255)),
            "yellow" => Some(Self::opaque(255, 255, 0)),
            "orange" => Some(Self::opaque(255, 165, 0)),
            "purple" => Some(Self::opaque(128, 0, 128)),
            "fuchsia" | "magenta" => Some(Self::opaque(255, 0, 255)),
            "aqua" | "cyan" => Some(Self::opaque(0, 255, 255)),
            "lime" => Some(Self::opaque(0, 255, 0)),
            "maroon" => Some(Self::opaque(128, 0, 0)),
            "navy" => Some(Self::opaque(0, 0, 128)),
            "olive" => Some(Self::opaque(128, 128, 0)),
            "teal" => Some(Self::opaque(0, 128, 128)),
            "silver" => Some(Self::opaque(192, 192, 192)),
            "gray" | "grey" => Some(Self::opaque(128, 128, 128)),
            "transparent" => Some(Self::TRANSPARENT),
            _ => None,
        }
    }

    /// Hex serialization: `#rrggbb`, or `#rrggbbaa` when not opaque.
    #[must_use]
    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// Multiply lightness and saturation by `factor` in HLS space.
    ///
    /// A factor below 1.0 darkens, above 1.0 lightens. Alpha is kept.
    #[must_use]
    pub fn shade(self, factor: f64) -> Self {
        let (h, mut l, mut s) = rgb_to_hls(
            f64::from(self.r) / 255.0,
            f64::from(self.g) / 255.0,
            f64::from(self.b) / 255.0,
        );

        l = (l * factor).clamp(0.0, 1.0);
        s = (s * factor).clamp(0.0, 1.0);

        let (r, g, b) = hls_to_rgb(h, l, s);
        Self {
            r: to_channel(r),
            g: to_channel(g),
            b: to_channel(b),
            a: self.a,
        }
    }

    /// Per-channel linear interpolation toward `other`.
    ///
    /// A factor of 0 yields `self`, a factor of 1 yields `other`.
    #[must_use]
    pub fn mix(self, other: Self, factor: f64) -> Self {
        let lerp = |a: u8, b: u8| {
            let a = f64::from(a);
            let b = f64::from(b);
            to_channel(((a + (b - a) * factor) / 255.0).clamp(0.0, 1.0))
        };
        Self {
            r: lerp(self.r, other.r),
            g: lerp(self.g, other.g),
            b: lerp(self.b, other.b),
            a: lerp(self.a, other.a),
        }
    }

    /// Multiply the alpha channel by `factor`, clamped.
    #[must_use]
    pub fn with_alpha_factor(self, factor: f64) -> Self {
        Self {
            a: to_channel((f64::from(self.a) / 255.0 * factor).clamp(0.0, 1.0)),
            ..self
        }
    }
}

// Range checked before casting.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_channel(unit: f64) -> u8 {
    let scaled = (unit * 255.0).round();
    if scaled <= 0.0 {
        0
    } else if scaled >= 255.0 {
        255
    } else {
        scaled as u8
    }
}

/// RGB (0..1 each) to hue (degrees), lightness, saturation.
fn rgb_to_hls(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);

    let l = (max + min) / 2.0;
    if (max - min).abs() < f64::EPSILON {
        return (0.0, l, 0.0);
    }

    let delta = max - min;
    let s = if l <= 0.5 {
        delta / (max + min)
    } else {
        delta / (2.0 - max - min)
    };

    let mut h = if (r - max).abs() < f64::EPSILON {
        (g - b) / delta
    } else if (g - max).abs() < f64::EPSILON {
        2.0 + (b - r) / delta
    } else {
        4.0 + (r - g) / delta
    };
    h *= 60.0;
    if h < 0.0 {
        h += 360.0;
    }

    (h, l, s)
}

/// Hue (degrees), lightness, saturation back to RGB (0..1 each).
fn hls_to_rgb(h: f64, l: f64, s: f64) -> (f64, f64, f64) {
    if s == 0.0 {
        return (l, l, l);
    }

    let m2 = if l <= 0.5 {
        l * (1.0 + s)
    } else {
        l + s - l * s
    };
    let m1 = 2.0 * l - m2;

    let channel = |offset: f64| {
        let mut hue = h + offset;
        while hue > 360.0 {
            hue -= 360.0;
        }
        while hue < 0.0 {
            hue += 360.0;
        }

        if hue < 60.0 {
            m1 + (m2 - m1) * hue / 60.0
        } else if hue < 180.0 {
            m2
        } else if hue < 240.0 {
            m1 + (m2 - m1) * (240.0 - hue) / 60.0
        } else {
            m1
        }
    };

    (channel(120.0), channel(0.0), channel(-120.0))
}

/// Source of named palette colors during resolution.
///
/// The cascade implements this over the color maps of every style
/// source; `()` implements it as the empty map for contexts where
/// named colors are not available.
pub trait ColorLookup {
    /// The symbolic color registered under `name`, if any.
    fn lookup_color(&self, name: &str) -> Option<&SymbolicColor>;
}

/// The empty color map.
impl ColorLookup for () {
    fn lookup_color(&self, _name: &str) -> Option<&SymbolicColor> {
        None
    }
}

/// A color expression, resolved against a [`ColorLookup`] at cascade
/// time.
///
/// `lighter(c)` and `darker(c)` are parsed as shades with the factors
/// 1.3 and 0.7.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SymbolicColor {
    /// A concrete color.
    Literal(Rgba),
    /// A `@name` reference into the color map.
    Named(String),
    /// `shade(color, factor)`: scale lightness and saturation.
    Shade {
        /// The color to shade.
        color: Box<SymbolicColor>,
        /// Multiplier for lightness and saturation.
        factor: f64,
    },
    /// `alpha(color, factor)`: scale the alpha channel.
    Alpha {
        /// The color to adjust.
        color: Box<SymbolicColor>,
        /// Multiplier for the alpha channel.
        factor: f64,
    },
    /// `mix(a, b, factor)`: interpolate between two colors.
    Mix {
        /// Mix source at factor 0.
        a: Box<SymbolicColor>,
        /// Mix source at factor 1.
        b: Box<SymbolicColor>,
        /// Interpolation position.
        factor: f64,
    },
    /// The value of the element's own `color` property.
    CurrentColor,
}

impl SymbolicColor {
    /// Parse a color expression.
    ///
    /// Accepted forms: hex notation, basic named colors,
    /// `rgb(r, g, b)` / `rgba(r, g, b, a)`, `@name` references,
    /// `currentColor`, and the derivation functions `shade`, `alpha`,
    /// `mix`, `lighter`, `darker` with arbitrary nesting.
    pub fn parse(text: &str) -> Result<Self, ValueParseError> {
        let s = text.trim();
        if s.is_empty() {
            return Err(ValueParseError::new("empty color"));
        }

        if let Some(name) = s.strip_prefix('@') {
            if name.is_empty() {
                return Err(ValueParseError::new("'@' without a color name"));
            }
            return Ok(Self::Named(name.trim().to_string()));
        }

        if s.starts_with('#') {
            return Rgba::from_hex(s)
                .map(Self::Literal)
                .ok_or_else(|| ValueParseError::new(format!("invalid hex color '{s}'")));
        }

        if s.eq_ignore_ascii_case("currentcolor") {
            return Ok(Self::CurrentColor);
        }

        if let Some(args) = call_arguments(s, "shade") {
            let [color, factor] = two_arguments(&args, "shade")?;
            return Ok(Self::Shade {
                color: Box::new(Self::parse(color)?),
                factor: parse_factor(factor)?,
            });
        }

        if let Some(args) = call_arguments(s, "alpha") {
            let [color, factor] = two_arguments(&args, "alpha")?;
            return Ok(Self::Alpha {
                color: Box::new(Self::parse(color)?),
                factor: parse_factor(factor)?,
            });
        }

        if let Some(args) = call_arguments(s, "mix") {
            if args.len() != 3 {
                return Err(ValueParseError::new("mix() takes three arguments"));
            }
            return Ok(Self::Mix {
                a: Box::new(Self::parse(args[0])?),
                b: Box::new(Self::parse(args[1])?),
                factor: parse_factor(args[2])?,
            });
        }

        if let Some(args) = call_arguments(s, "lighter") {
            let [color] = one_argument(&args, "lighter")?;
            return Ok(Self::Shade {
                color: Box::new(Self::parse(color)?),
                factor: 1.3,
            });
        }

        if let Some(args) = call_arguments(s, "darker") {
            let [color] = one_argument(&args, "darker")?;
            return Ok(Self::Shade {
                color: Box::new(Self::parse(color)?),
                factor: 0.7,
            });
        }

        if let Some(args) = call_arguments(s, "rgb") {
            if args.len() != 3 {
                return Err(ValueParseError::new("rgb() takes three arguments"));
            }
            return Ok(Self::Literal(Rgba {
                r: parse_rgb_channel(args[0])?,
                g: parse_rgb_channel(args[1])?,
                b: parse_rgb_channel(args[2])?,
                a: 255,
            }));
        }

        if let Some(args) = call_arguments(s, "rgba") {
            if args.len() != 4 {
                return Err(ValueParseError::new("rgba() takes four arguments"));
            }
            return Ok(Self::Literal(Rgba {
                r: parse_rgb_channel(args[0])?,
                g: parse_rgb_channel(args[1])?,
                b: parse_rgb_channel(args[2])?,
                a: to_channel(parse_factor(args[3])?.clamp(0.0, 1.0)),
            }));
        }

        Rgba::from_named(s)
            .map(Self::Literal)
            .ok_or_else(|| ValueParseError::new(format!("unknown color '{s}'")))
    }

    /// Resolve the expression to a concrete color.
    ///
    /// `current` supplies the value `currentColor` refers to. Named
    /// references go through `lookup` and may themselves be symbolic,
    /// so resolution recurses; reference cycles are detected and
    /// reported as unresolved rather than looping.
    pub fn resolve(
        &self,
        lookup: &dyn ColorLookup,
        current: Option<Rgba>,
    ) -> Result<Rgba, StyleError> {
        let mut visiting = Vec::new();
        self.resolve_inner(lookup, current, &mut visiting)
    }

    fn resolve_inner(
        &self,
        lookup: &dyn ColorLookup,
        current: Option<Rgba>,
        visiting: &mut Vec<String>,
    ) -> Result<Rgba, StyleError> {
        match self {
            Self::Literal(rgba) => Ok(*rgba),

            Self::Named(name) => {
                if visiting.iter().any(|n| n == name) {
                    return Err(StyleError::UnresolvedReference(format!(
                        "@{name} (reference cycle)"
                    )));
                }
                let Some(target) = lookup.lookup_color(name) else {
                    return Err(StyleError::UnresolvedReference(format!("@{name}")));
                };
                visiting.push(name.clone());
                let resolved = target.resolve_inner(lookup, current, visiting);
                let _ = visiting.pop();
                resolved
            }

            Self::Shade { color, factor } => Ok(color
                .resolve_inner(lookup, current, visiting)?
                .shade(*factor)),

            Self::Alpha { color, factor } => Ok(color
                .resolve_inner(lookup, current, visiting)?
                .with_alpha_factor(*factor)),

            Self::Mix { a, b, factor } => {
                let a = a.resolve_inner(lookup, current, visiting)?;
                let b = b.resolve_inner(lookup, current, visiting)?;
                Ok(a.mix(b, *factor))
            }

            Self::CurrentColor => current.ok_or_else(|| {
                StyleError::UnresolvedReference("currentColor outside a cascade".to_string())
            }),
        }
    }

    /// Serialize back to source form. Inverse of [`SymbolicColor::parse`].
    #[must_use]
    pub fn to_css_string(&self) -> String {
        match self {
            Self::Literal(rgba) => rgba.to_hex(),
            Self::Named(name) => format!("@{name}"),
            Self::Shade { color, factor } => {
                format!("shade({}, {factor})", color.to_css_string())
            }
            Self::Alpha { color, factor } => {
                format!("alpha({}, {factor})", color.to_css_string())
            }
            Self::Mix { a, b, factor } => format!(
                "mix({}, {}, {factor})",
                a.to_css_string(),
                b.to_css_string()
            ),
            Self::CurrentColor => "currentColor".to_string(),
        }
    }
}

/// If `s` is `name(...)`, return the top-level comma-separated
/// argument slices, otherwise None.
pub(crate) fn call_arguments<'s>(s: &'s str, name: &str) -> Option<Vec<&'s str>> {
    let rest = s
        .get(..name.len())
        .filter(|head| head.eq_ignore_ascii_case(name))
        .map(|_| &s[name.len()..])?;
    let rest = rest.trim_start();
    let inner = rest.strip_prefix('(')?.strip_suffix(')')?;

    let mut args = Vec::new();
    let mut depth = 0_u32;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                args.push(inner[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    args.push(inner[start..].trim());
    Some(args)
}

fn one_argument<'s>(args: &[&'s str], name: &str) -> Result<[&'s str; 1], ValueParseError> {
    match args {
        [only] => Ok([only]),
        _ => Err(ValueParseError::new(format!("{name}() takes one argument"))),
    }
}

fn two_arguments<'s>(args: &[&'s str], name: &str) -> Result<[&'s str; 2], ValueParseError> {
    match args {
        [first, second] => Ok([first, second]),
        _ => Err(ValueParseError::new(format!(
            "{name}() takes two arguments"
        ))),
    }
}

pub(crate) fn parse_factor(text: &str) -> Result<f64, ValueParseError> {
    text.trim()
        .parse()
        .map_err(|_| ValueParseError::new(format!("invalid factor '{text}'")))
}

fn parse_rgb_channel(text: &str) -> Result<u8, ValueParseError> {
    text.trim()
        .parse()
        .map_err(|_| ValueParseError::new(format!("invalid color channel '{text}'")))
}
