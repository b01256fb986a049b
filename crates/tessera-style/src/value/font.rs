//! Font description values.
//!
//! The text form follows the familiar "Family [Style] [Weight] [Size]"
//! convention, e.g. `Sans Bold 10` or `Monospace Italic 9.5`.

use std::str::FromStr;

use serde::Serialize;
use strum_macros::{Display, EnumString};

use super::ValueParseError;

/// Slant of a font.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum FontStyle {
    /// Upright glyphs.
    #[default]
    Normal,
    /// Italic glyphs.
    Italic,
    /// Slanted upright glyphs.
    Oblique,
}

/// Weight of a font.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum FontWeight {
    /// Lighter than normal.
    Light,
    /// The regular weight.
    #[default]
    Normal,
    /// Heavier than normal.
    Bold,
}

/// A font request: family plus optional slant, weight and size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FontDescription {
    /// The family name, possibly several words.
    pub family: String,
    /// Slant, `Normal` if unspecified.
    pub style: FontStyle,
    /// Weight, `Normal` if unspecified.
    pub weight: FontWeight,
    /// Size in points, if specified.
    pub size: Option<f64>,
}

impl FontDescription {
    /// Parse the "Family [Style] [Weight] [Size]" text form.
    ///
    /// The trailing number, if any, is the size; style and weight
    /// keywords may appear in either order before it; everything
    /// before them is the family.
    pub fn parse(text: &str) -> Result<Self, ValueParseError> {
        let mut words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return Err(ValueParseError::new("empty font description"));
        }

        let size = match words.last().and_then(|w| w.parse::<f64>().ok()) {
            Some(size) if size > 0.0 => {
                let _ = words.pop();
                Some(size)
            }
            Some(_) => return Err(ValueParseError::new("font size must be positive")),
            None => None,
        };

        let mut style = FontStyle::Normal;
        let mut weight = FontWeight::Normal;
        while let Some(word) = words.last() {
            if let Ok(parsed) = FontStyle::from_str(word) {
                style = parsed;
            } else if let Ok(parsed) = FontWeight::from_str(word) {
                weight = parsed;
            } else {
                break;
            }
            let _ = words.pop();
        }

        if words.is_empty() {
            return Err(ValueParseError::new("font description has no family"));
        }

        Ok(Self {
            family: words.join(" "),
            style,
            weight,
            size,
        })
    }

    /// Serialize back to the text form. Inverse of
    /// [`FontDescription::parse`]; `Normal` style and weight are
    /// omitted.
    #[must_use]
    pub fn to_css_string(&self) -> String {
        let mut out = self.family.clone();
        if self.style != FontStyle::Normal {
            out.push(' ');
            out.push_str(&self.style.to_string());
        }
        if self.weight != FontWeight::Normal {
            out.push(' ');
            out.push_str(&self.weight.to_string());
        }
        if let Some(size) = self.size {
            out.push(' ');
            out.push_str(&size.to_string());
        }
        out
    }
}
