//! State-transition animation.
//!
//! When a widget's state flips (say `:hover` becomes true), the theme
//! may declare a `transition` for it. The [`StateAnimator`] owns one
//! timeline per (region, state) pair on one element and turns an
//! external per-frame clock into eased 0..1 progress values plus
//! redraw requests. It is scheduler-agnostic: the host event loop
//! calls [`StateAnimator::tick`] with its own notion of now, once per
//! frame; there are no threads and no callbacks held here.
//!
//! The progress value is what consumers use to blend between the
//! resolved style for the old state and the resolved style for the
//! new one (see [`crate::value::Value::interpolate`]).

use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::Serialize;
use strum_macros::{Display, EnumString};

use crate::path::StateFlags;
use crate::value::ValueParseError;

/// Mapping from linear time to visual progress.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Display, EnumString,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum ProgressCurve {
    /// Constant speed.
    #[default]
    Linear,
    /// Slow start and end, fastest in the middle (sinusoidal).
    Ease,
    /// Slow start (cubic).
    EaseIn,
    /// Slow end (cubic).
    EaseOut,
    /// Slow start and end (cubic).
    EaseInOut,
}

impl ProgressCurve {
    /// Apply the curve to a linear position in 0..1.
    #[must_use]
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::Ease => (((t - 0.5) * std::f64::consts::PI).sin() + 1.0) / 2.0,
            Self::EaseIn => t * t * t,
            Self::EaseOut => (t - 1.0).powi(3) + 1.0,
            Self::EaseInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 + 4.0 * (t - 1.0).powi(3)
                }
            }
        }
    }
}

/// A parsed `transition` property value.
///
/// Text form: a duration (`150ms`, `2s` or a bare millisecond count),
/// an optional curve keyword, and an optional `loop` flag, e.g.
/// `transition: 150ms ease-in-out loop;`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionDescription {
    /// How long one run of the timeline takes.
    pub duration: Duration,
    /// The progress curve.
    pub curve: ProgressCurve,
    /// Whether the timeline restarts when it completes.
    pub looping: bool,
}

impl TransitionDescription {
    /// Parse the text form.
    pub fn parse(text: &str) -> Result<Self, ValueParseError> {
        let mut words = text.split_whitespace();
        let duration_word = words
            .next()
            .ok_or_else(|| ValueParseError::new("empty transition"))?;
        let duration = parse_duration(duration_word)?;

        let mut curve = ProgressCurve::Linear;
        let mut looping = false;
        for word in words {
            if word.eq_ignore_ascii_case("loop") {
                looping = true;
            } else if let Ok(parsed) = ProgressCurve::from_str(word) {
                curve = parsed;
            } else {
                return Err(ValueParseError::new(format!(
                    "unexpected '{word}' in transition"
                )));
            }
        }

        Ok(Self {
            duration,
            curve,
            looping,
        })
    }

    /// Serialize back to the text form. Inverse of
    /// [`TransitionDescription::parse`].
    #[must_use]
    pub fn to_css_string(&self) -> String {
        let mut out = format!("{}ms {}", self.duration.as_millis(), self.curve);
        if self.looping {
            out.push_str(" loop");
        }
        out
    }
}

fn parse_duration(word: &str) -> Result<Duration, ValueParseError> {
    let (digits, scale) = if let Some(digits) = word.strip_suffix("ms") {
        (digits, 1.0)
    } else if let Some(digits) = word.strip_suffix('s') {
        (digits, 1000.0)
    } else {
        (word, 1.0)
    };
    let value: f64 = digits
        .parse()
        .map_err(|_| ValueParseError::new(format!("invalid duration '{word}'")))?;
    if value < 0.0 {
        return Err(ValueParseError::new("duration must not be negative"));
    }
    Ok(Duration::from_secs_f64(value * scale / 1000.0))
}

/// Which way a timeline is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineDirection {
    /// Playing from 0 toward 1.
    Forward,
    /// Playing from 1 toward 0.
    Backward,
}

/// A single running timeline: linear position plus curve and loop
/// bookkeeping.
#[derive(Debug, Clone)]
struct Timeline {
    duration: Duration,
    curve: ProgressCurve,
    looping: bool,
    direction: TimelineDirection,
    /// Raw linear position in 0..1.
    position: f64,
    last_tick: Option<Instant>,
    finished: bool,
}

impl Timeline {
    fn new(description: &TransitionDescription) -> Self {
        Self {
            duration: description.duration,
            curve: description.curve,
            looping: description.looping,
            direction: TimelineDirection::Forward,
            position: 0.0,
            last_tick: None,
            finished: false,
        }
    }

    /// Move the position to the start relative to the direction:
    /// 0 when playing forward, 1 when playing backward.
    fn rewind(&mut self) {
        self.position = match self.direction {
            TimelineDirection::Forward => 0.0,
            TimelineDirection::Backward => 1.0,
        };
        self.finished = false;
    }

    fn reverse(&mut self) {
        self.direction = match self.direction {
            TimelineDirection::Forward => TimelineDirection::Backward,
            TimelineDirection::Backward => TimelineDirection::Forward,
        };
        self.finished = false;
    }

    /// Advance to `now`. The first tick only anchors the clock.
    fn advance(&mut self, now: Instant) {
        let Some(last) = self.last_tick else {
            self.last_tick = Some(now);
            return;
        };
        self.last_tick = Some(now);
        if self.finished || self.duration.is_zero() {
            self.finish();
            return;
        }

        let delta = now.saturating_duration_since(last).as_secs_f64()
            / self.duration.as_secs_f64();
        match self.direction {
            TimelineDirection::Forward => self.position += delta,
            TimelineDirection::Backward => self.position -= delta,
        }

        if self.looping {
            // Wrap and replay in the same direction.
            while self.position > 1.0 {
                self.position -= 1.0;
            }
            while self.position < 0.0 {
                self.position += 1.0;
            }
        } else if !(0.0..=1.0).contains(&self.position) {
            self.finish();
        }
    }

    fn finish(&mut self) {
        self.position = match self.direction {
            TimelineDirection::Forward => 1.0,
            TimelineDirection::Backward => 0.0,
        };
        self.finished = true;
    }

    fn progress(&self) -> f64 {
        self.curve.apply(self.position)
    }
}

/// An axis-aligned rectangle in element coordinates, used to narrow
/// redraws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

/// What one animation wants redrawn after a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct RedrawRequest {
    /// The region the animation belongs to, None for the element
    /// itself.
    pub region: Option<String>,
    /// The state bit being animated.
    pub state: StateFlags,
    /// Eased progress in 0..1. 1 means the state's look is fully
    /// applied.
    pub progress: f64,
    /// Areas recorded since the previous tick. Empty means the whole
    /// element must be invalidated.
    pub areas: Vec<Rect>,
    /// True on the animation's final tick; it has been removed.
    pub finished: bool,
}

/// One running state transition.
#[derive(Debug, Clone)]
struct AnimationInfo {
    region: Option<String>,
    state: StateFlags,
    timeline: Timeline,
    target_on: bool,
    areas: Vec<Rect>,
}

/// Drives all state-transition animations of one element.
///
/// At most one timeline exists per (region, state) pair. Dropping the
/// animator (when the element goes away) cancels everything.
#[derive(Debug, Default)]
pub struct StateAnimator {
    animations: Vec<AnimationInfo>,
}

impl StateAnimator {
    /// Create an animator with no running animations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no animation is running.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.animations.is_empty()
    }

    /// React to a state flip for `state` on `region` (None for the
    /// element itself).
    ///
    /// If a timeline for the pair is already running toward the
    /// opposite target, its direction is flipped instead of starting a
    /// second timeline; if that timeline loops, looping is disabled
    /// and it proceeds to its natural end. A fresh non-looping
    /// animation for a state turning off starts reversed and rewound,
    /// fading the state's look back out.
    pub fn state_change(
        &mut self,
        region: Option<&str>,
        state: StateFlags,
        description: &TransitionDescription,
        turning_on: bool,
    ) {
        if let Some(info) = self.find_mut(region, state) {
            if info.target_on != turning_on {
                if info.timeline.looping {
                    info.timeline.looping = false;
                } else {
                    info.timeline.reverse();
                }
                info.target_on = turning_on;
            }
            return;
        }

        let mut timeline = Timeline::new(description);
        if !description.looping && !turning_on {
            timeline.direction = TimelineDirection::Backward;
            timeline.rewind();
        }

        self.animations.push(AnimationInfo {
            region: region.map(ToString::to_string),
            state,
            timeline,
            target_on: turning_on,
            areas: Vec::new(),
        });
    }

    /// Record an area that the animation for (`region`, any state)
    /// should invalidate on its next tick instead of the whole
    /// element.
    pub fn record_invalidation(&mut self, region: Option<&str>, area: Rect) {
        for info in &mut self.animations {
            if info.region.as_deref() == region {
                info.areas.push(area);
            }
        }
    }

    /// Advance every animation to `now` and collect redraw requests.
    ///
    /// Finished non-looping animations emit one final request (with
    /// progress clamped to their end) and are removed.
    pub fn tick(&mut self, now: Instant) -> Vec<RedrawRequest> {
        let mut requests = Vec::with_capacity(self.animations.len());

        for info in &mut self.animations {
            info.timeline.advance(now);
            requests.push(RedrawRequest {
                region: info.region.clone(),
                state: info.state,
                progress: info.timeline.progress(),
                areas: std::mem::take(&mut info.areas),
                finished: info.timeline.finished,
            });
        }

        self.animations.retain(|info| !info.timeline.finished);
        requests
    }

    /// The eased progress of the animation for (`region`, `state`),
    /// if one is running.
    #[must_use]
    pub fn progress(&self, region: Option<&str>, state: StateFlags) -> Option<f64> {
        self.animations
            .iter()
            .find(|info| info.region.as_deref() == region && info.state == state)
            .map(|info| info.timeline.progress())
    }

    /// Stop animations. `None` cancels everything; `Some(region)`
    /// cancels only that region's animations. No redraw is issued
    /// beyond whatever previous ticks already requested.
    pub fn cancel(&mut self, region: Option<&str>) {
        match region {
            None => self.animations.clear(),
            Some(region) => self
                .animations
                .retain(|info| info.region.as_deref() != Some(region)),
        }
    }

    fn find_mut(&mut self, region: Option<&str>, state: StateFlags) -> Option<&mut AnimationInfo> {
        self.animations
            .iter_mut()
            .find(|info| info.region.as_deref() == region && info.state == state)
    }
}
