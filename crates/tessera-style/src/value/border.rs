//! Border values: four per-side integer widths.
//!
//! Used by the `margin`, `padding` and `border-width` shorthands. The
//! text form is 1-4 non-negative integers with an optional `px` unit,
//! expanded the way CSS margins are: one value for all sides, two for
//! vertical/horizontal, three for top/horizontal/bottom, four for
//! top/right/bottom/left.

use serde::Serialize;

use super::ValueParseError;

/// Per-side widths in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Border {
    /// Width of the top side.
    pub top: i16,
    /// Width of the right side.
    pub right: i16,
    /// Width of the bottom side.
    pub bottom: i16,
    /// Width of the left side.
    pub left: i16,
}

impl Border {
    /// The same width on every side.
    #[must_use]
    pub const fn uniform(width: i16) -> Self {
        Self {
            top: width,
            right: width,
            bottom: width,
            left: width,
        }
    }

    /// Parse the 1-4 value text form.
    pub fn parse(text: &str) -> Result<Self, ValueParseError> {
        let mut sides = Vec::with_capacity(4);
        for part in text.split_whitespace() {
            sides.push(parse_side(part)?);
        }

        match sides.as_slice() {
            [all] => Ok(Self::uniform(*all)),
            [vertical, horizontal] => Ok(Self {
                top: *vertical,
                right: *horizontal,
                bottom: *vertical,
                left: *horizontal,
            }),
            [top, horizontal, bottom] => Ok(Self {
                top: *top,
                right: *horizontal,
                bottom: *bottom,
                left: *horizontal,
            }),
            [top, right, bottom, left] => Ok(Self {
                top: *top,
                right: *right,
                bottom: *bottom,
                left: *left,
            }),
            [] => Err(ValueParseError::new("no number given for border value")),
            _ => Err(ValueParseError::new("too many values for border")),
        }
    }

    /// Serialize to the shortest text form that parses back equal.
    #[must_use]
    pub fn to_css_string(self) -> String {
        if self.left != self.right {
            format!("{} {} {} {}", self.top, self.right, self.bottom, self.left)
        } else if self.top != self.bottom {
            format!("{} {} {}", self.top, self.right, self.bottom)
        } else if self.top != self.left {
            format!("{} {}", self.top, self.right)
        } else {
            format!("{}", self.top)
        }
    }
}

/// One side: a non-negative integer, `px` allowed and ignored.
fn parse_side(part: &str) -> Result<i16, ValueParseError> {
    let digits = part.strip_suffix("px").unwrap_or(part);
    let value: i64 = digits
        .parse()
        .map_err(|_| ValueParseError::new(format!("invalid border value '{part}'")))?;
    i16::try_from(value)
        .ok()
        .filter(|side| *side >= 0)
        .ok_or_else(|| ValueParseError::new("number out of range for border"))
}
