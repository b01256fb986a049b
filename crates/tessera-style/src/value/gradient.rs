//! Gradient values.
//!
//! Gradients use the toolkit-prefixed function form
//! `-tessera-gradient(linear, x0 y0, x1 y1, stop(offset, color), ...)`
//! or `-tessera-gradient(radial, x0 y0 r0, x1 y1 r1, stop(...), ...)`.
//! Coordinates are fractions of the painted area; the keywords `left`,
//! `right`, `top`, `bottom` and `center` are accepted on the matching
//! axis. Stop colors are symbolic, so a gradient resolves against the
//! color map like any other color.

use serde::Serialize;

use crate::error::StyleError;

use super::color::{ColorLookup, Rgba, SymbolicColor, call_arguments, parse_factor};
use super::ValueParseError;

/// One color stop along a gradient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradientStop {
    /// Position along the gradient, 0..1.
    pub offset: f64,
    /// The stop color, resolved at cascade time.
    pub color: SymbolicColor,
}

/// The geometry of a gradient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GradientShape {
    /// A linear ramp between two points.
    Linear {
        /// Start point, as fractions of the painted area.
        start: (f64, f64),
        /// End point, as fractions of the painted area.
        end: (f64, f64),
    },
    /// A radial ramp between two circles.
    Radial {
        /// Center of the start circle.
        start: (f64, f64),
        /// Radius of the start circle.
        start_radius: f64,
        /// Center of the end circle.
        end: (f64, f64),
        /// Radius of the end circle.
        end_radius: f64,
    },
}

/// A gradient: a shape plus ordered color stops.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gradient {
    /// The gradient geometry.
    pub shape: GradientShape,
    /// Color stops in source order.
    pub stops: Vec<GradientStop>,
}

impl Gradient {
    /// Parse the `-tessera-gradient(...)` text form.
    pub fn parse(text: &str) -> Result<Self, ValueParseError> {
        let args = call_arguments(text.trim(), "-tessera-gradient")
            .ok_or_else(|| ValueParseError::new("expected -tessera-gradient(...)"))?;

        let (&kind, rest) = args
            .split_first()
            .ok_or_else(|| ValueParseError::new("empty gradient"))?;

        let (shape, stop_args) = match kind {
            "linear" => {
                let [start, end] = rest
                    .get(..2)
                    .and_then(|coords| <[&str; 2]>::try_from(coords).ok())
                    .ok_or_else(|| ValueParseError::new("linear gradient needs two points"))?;
                (
                    GradientShape::Linear {
                        start: parse_point(start)?,
                        end: parse_point(end)?,
                    },
                    &rest[2..],
                )
            }
            "radial" => {
                let [start, end] = rest
                    .get(..2)
                    .and_then(|coords| <[&str; 2]>::try_from(coords).ok())
                    .ok_or_else(|| ValueParseError::new("radial gradient needs two circles"))?;
                let (start, start_radius) = parse_circle(start)?;
                let (end, end_radius) = parse_circle(end)?;
                (
                    GradientShape::Radial {
                        start,
                        start_radius,
                        end,
                        end_radius,
                    },
                    &rest[2..],
                )
            }
            other => {
                return Err(ValueParseError::new(format!(
                    "gradient type must be 'linear' or 'radial', not '{other}'"
                )));
            }
        };

        let mut stops = Vec::with_capacity(stop_args.len());
        for stop in stop_args {
            stops.push(parse_stop(stop)?);
        }

        Ok(Self { shape, stops })
    }

    /// Serialize back to source form. Inverse of [`Gradient::parse`]
    /// with coordinates always written as numbers.
    #[must_use]
    pub fn to_css_string(&self) -> String {
        let mut out = String::from("-tessera-gradient(");
        match &self.shape {
            GradientShape::Linear { start, end } => {
                out.push_str(&format!(
                    "linear, {} {}, {} {}",
                    start.0, start.1, end.0, end.1
                ));
            }
            GradientShape::Radial {
                start,
                start_radius,
                end,
                end_radius,
            } => {
                out.push_str(&format!(
                    "radial, {} {} {start_radius}, {} {} {end_radius}",
                    start.0, start.1, end.0, end.1
                ));
            }
        }
        for stop in &self.stops {
            out.push_str(&format!(
                ", stop({}, {})",
                stop.offset,
                stop.color.to_css_string()
            ));
        }
        out.push(')');
        out
    }

    /// Resolve every stop color to a concrete [`Rgba`].
    ///
    /// Fails with the first unresolved stop, like any other symbolic
    /// color.
    pub fn resolve(
        &self,
        lookup: &dyn ColorLookup,
        current: Option<Rgba>,
    ) -> Result<Self, StyleError> {
        let mut stops = Vec::with_capacity(self.stops.len());
        for stop in &self.stops {
            stops.push(GradientStop {
                offset: stop.offset,
                color: SymbolicColor::Literal(stop.color.resolve(lookup, current)?),
            });
        }
        Ok(Self {
            shape: self.shape.clone(),
            stops,
        })
    }
}

fn parse_stop(text: &str) -> Result<GradientStop, ValueParseError> {
    let args = call_arguments(text, "stop")
        .ok_or_else(|| ValueParseError::new(format!("expected stop(...), got '{text}'")))?;
    match args.as_slice() {
        [offset, color] => Ok(GradientStop {
            offset: parse_factor(offset)?,
            color: SymbolicColor::parse(color)?,
        }),
        _ => Err(ValueParseError::new("stop() takes offset and color")),
    }
}

/// `x y`, each a number or an axis keyword.
fn parse_point(text: &str) -> Result<(f64, f64), ValueParseError> {
    let mut words = text.split_whitespace();
    let x = words
        .next()
        .ok_or_else(|| ValueParseError::new("missing point"))?;
    let y = words
        .next()
        .ok_or_else(|| ValueParseError::new("point needs two coordinates"))?;
    if words.next().is_some() {
        return Err(ValueParseError::new("junk after point"));
    }
    Ok((parse_coord(x, "left", "right")?, parse_coord(y, "top", "bottom")?))
}

/// `x y radius` for radial gradients.
fn parse_circle(text: &str) -> Result<((f64, f64), f64), ValueParseError> {
    let words: Vec<&str> = text.split_whitespace().collect();
    match words.as_slice() {
        [x, y, radius] => Ok((
            (parse_coord(x, "left", "right")?, parse_coord(y, "top", "bottom")?),
            parse_factor(radius)?,
        )),
        _ => Err(ValueParseError::new("circle needs x, y and radius")),
    }
}

fn parse_coord(text: &str, low: &str, high: &str) -> Result<f64, ValueParseError> {
    if text.eq_ignore_ascii_case(low) {
        return Ok(0.0);
    }
    if text.eq_ignore_ascii_case(high) {
        return Ok(1.0);
    }
    if text.eq_ignore_ascii_case("center") {
        return Ok(0.5);
    }
    parse_factor(text)
}
