//! Unit-aware graphic and time values.
//!
//! Both value kinds carry a sentinel variant (`Auto` for graphics, `Fit` for
//! time) that has no numeric meaning. Arithmetic is only defined between
//! concrete operands of the same unit; anything else collapses to the
//! sentinel so that an unknown dimension stays unknown.

use std::fmt;
use std::ops::Add;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::context::Resolution;

/// Error raised when a declared value does not match its grammar.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueParseError {
    #[error("invalid graphic value `{0}`")]
    Graphic(String),

    #[error("invalid time value `{0}`")]
    Time(String),

    #[error("invalid color `{0}`")]
    Color(String),

    #[error("invalid value `{value}` for `{property}`")]
    Property { property: String, value: String },
}

impl ValueParseError {
    pub fn property(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Property {
            property: property.into(),
            value: value.into(),
        }
    }
}

/// A spatial length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "value", rename_all = "snake_case")]
pub enum GraphicValue {
    #[default]
    Auto,
    Pixel(i64),
    Percent(f64),
    ResolutionWidth(f64),
    ResolutionHeight(f64),
    ResolutionMin(f64),
    ResolutionMax(f64),
}

impl GraphicValue {
    pub const ZERO: GraphicValue = GraphicValue::Pixel(0);

    pub fn is_auto(&self) -> bool {
        matches!(self, GraphicValue::Auto)
    }

    /// Concrete pixel count, if resolved.
    pub fn pixels(&self) -> Option<i64> {
        match self {
            GraphicValue::Pixel(px) => Some(*px),
            _ => None,
        }
    }

    /// Concrete pixel count, or `default` for anything unresolved.
    pub fn pixels_or(&self, default: i64) -> i64 {
        self.pixels().unwrap_or(default)
    }

    /// Resolve against a parent length, a natural source length, and the
    /// root output resolution.
    ///
    /// Percentages use the parent when it is concrete, otherwise fall back
    /// to the source length, otherwise stay unresolved (`Auto`).
    /// Resolution-relative units always measure the root resolution.
    pub fn resolve(self, parent: Option<i64>, source: Option<i64>, root: Resolution) -> Self {
        match self {
            GraphicValue::Auto | GraphicValue::Pixel(_) => self,
            GraphicValue::Percent(pct) => match (parent, source) {
                (Some(parent), _) => GraphicValue::Pixel(scale(parent as f64, pct)),
                (None, Some(source)) => GraphicValue::Pixel(source),
                (None, None) => GraphicValue::Auto,
            },
            GraphicValue::ResolutionWidth(pct) => {
                GraphicValue::Pixel(scale(root.width as f64, pct))
            }
            GraphicValue::ResolutionHeight(pct) => {
                GraphicValue::Pixel(scale(root.height as f64, pct))
            }
            GraphicValue::ResolutionMin(pct) => GraphicValue::Pixel(scale(root.min() as f64, pct)),
            GraphicValue::ResolutionMax(pct) => GraphicValue::Pixel(scale(root.max() as f64, pct)),
        }
    }

    pub fn max(self, other: Self) -> Self {
        match (self, other) {
            (GraphicValue::Pixel(a), GraphicValue::Pixel(b)) => GraphicValue::Pixel(a.max(b)),
            _ => GraphicValue::Auto,
        }
    }

    pub fn min(self, other: Self) -> Self {
        match (self, other) {
            (GraphicValue::Pixel(a), GraphicValue::Pixel(b)) => GraphicValue::Pixel(a.min(b)),
            _ => GraphicValue::Auto,
        }
    }
}

fn scale(base: f64, pct: f64) -> i64 {
    (base * pct / 100.0).round() as i64
}

impl Add for GraphicValue {
    type Output = GraphicValue;

    fn add(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (GraphicValue::Pixel(a), GraphicValue::Pixel(b)) => GraphicValue::Pixel(a + b),
            _ => GraphicValue::Auto,
        }
    }
}

impl FromStr for GraphicValue {
    type Err = ValueParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let err = || ValueParseError::Graphic(s.to_string());
        if text.eq_ignore_ascii_case("auto") {
            return Ok(GraphicValue::Auto);
        }
        // Longer suffixes first so `rmin` is not read as a malformed `px`.
        let parsed = if let Some(n) = text.strip_suffix("rmin") {
            parse_number(n).map(GraphicValue::ResolutionMin)
        } else if let Some(n) = text.strip_suffix("rmax") {
            parse_number(n).map(GraphicValue::ResolutionMax)
        } else if let Some(n) = text.strip_suffix("rw") {
            parse_number(n).map(GraphicValue::ResolutionWidth)
        } else if let Some(n) = text.strip_suffix("rh") {
            parse_number(n).map(GraphicValue::ResolutionHeight)
        } else if let Some(n) = text.strip_suffix("px") {
            parse_number(n).map(|v| GraphicValue::Pixel(v.round() as i64))
        } else if let Some(n) = text.strip_suffix('%') {
            parse_number(n).map(GraphicValue::Percent)
        } else {
            None
        };
        parsed.ok_or_else(err)
    }
}

impl fmt::Display for GraphicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphicValue::Auto => write!(f, "auto"),
            GraphicValue::Pixel(v) => write!(f, "{v}px"),
            GraphicValue::Percent(v) => write!(f, "{v}%"),
            GraphicValue::ResolutionWidth(v) => write!(f, "{v}rw"),
            GraphicValue::ResolutionHeight(v) => write!(f, "{v}rh"),
            GraphicValue::ResolutionMin(v) => write!(f, "{v}rmin"),
            GraphicValue::ResolutionMax(v) => write!(f, "{v}rmax"),
        }
    }
}

/// A duration on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "value", rename_all = "snake_case")]
pub enum TimeValue {
    Seconds(f64),
    Frames(f64),
    Percent(f64),
    /// Elastic length, settled by the surrounding timeline.
    Fit,
    /// Natural duration of the underlying media.
    Source,
}

impl TimeValue {
    pub const ZERO: TimeValue = TimeValue::Seconds(0.0);

    pub fn is_fit(&self) -> bool {
        matches!(self, TimeValue::Fit)
    }

    pub fn is_source(&self) -> bool {
        matches!(self, TimeValue::Source)
    }

    /// Concrete length in seconds. Frames count as concrete once an fps
    /// is known; see [`TimeValue::to_seconds`].
    pub fn seconds(&self) -> Option<f64> {
        match self {
            TimeValue::Seconds(secs) => Some(*secs),
            _ => None,
        }
    }

    /// Concrete seconds, or zero for anything unresolved.
    pub fn seconds_or_zero(&self) -> f64 {
        self.seconds().unwrap_or(0.0)
    }

    pub fn to_seconds(&self, fps: f64) -> Option<f64> {
        match self {
            TimeValue::Seconds(secs) => Some(*secs),
            TimeValue::Frames(frames) if fps > 0.0 => Some(frames / fps),
            _ => None,
        }
    }

    /// Whether this value is a concrete, strictly positive length.
    pub fn is_positive(&self) -> bool {
        self.seconds().map(|s| s > 0.0).unwrap_or(false)
    }

    /// Resolve against the parent's concrete length and the probed source
    /// duration, normalizing frames to seconds.
    pub fn resolve(self, parent: Option<f64>, source: Option<f64>, fps: f64) -> Self {
        match self {
            TimeValue::Seconds(_) | TimeValue::Fit => self,
            TimeValue::Frames(_) => self.to_seconds(fps).map(TimeValue::Seconds).unwrap_or(self),
            TimeValue::Percent(pct) => match (parent, source) {
                (Some(parent), _) => TimeValue::Seconds(parent * pct / 100.0),
                (None, Some(source)) => TimeValue::Seconds(source),
                (None, None) => TimeValue::Fit,
            },
            TimeValue::Source => source.map(TimeValue::Seconds).unwrap_or(TimeValue::Fit),
        }
    }

    pub fn max(self, other: Self) -> Self {
        combine(self, other, f64::max)
    }

    pub fn min(self, other: Self) -> Self {
        combine(self, other, f64::min)
    }
}

fn combine(a: TimeValue, b: TimeValue, op: fn(f64, f64) -> f64) -> TimeValue {
    match (a, b) {
        (TimeValue::Seconds(x), TimeValue::Seconds(y)) => TimeValue::Seconds(op(x, y)),
        (TimeValue::Frames(x), TimeValue::Frames(y)) => TimeValue::Frames(op(x, y)),
        (TimeValue::Fit, _) | (_, TimeValue::Fit) => TimeValue::Fit,
        (TimeValue::Source, _) | (_, TimeValue::Source) => TimeValue::Source,
        _ => TimeValue::Fit,
    }
}

impl Default for TimeValue {
    fn default() -> Self {
        TimeValue::ZERO
    }
}

impl Add for TimeValue {
    type Output = TimeValue;

    fn add(self, rhs: Self) -> Self::Output {
        combine(self, rhs, |x, y| x + y)
    }
}

impl FromStr for TimeValue {
    type Err = ValueParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let err = || ValueParseError::Time(s.to_string());
        if text.eq_ignore_ascii_case("fit") {
            return Ok(TimeValue::Fit);
        }
        if text.eq_ignore_ascii_case("source") {
            return Ok(TimeValue::Source);
        }
        let parsed = if let Some(n) = text.strip_suffix('s') {
            parse_number(n).map(TimeValue::Seconds)
        } else if let Some(n) = text.strip_suffix('f') {
            parse_number(n).map(TimeValue::Frames)
        } else if let Some(n) = text.strip_suffix('%') {
            parse_number(n).map(TimeValue::Percent)
        } else {
            None
        };
        parsed.ok_or_else(err)
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeValue::Seconds(v) => write!(f, "{v}s"),
            TimeValue::Frames(v) => write!(f, "{v}f"),
            TimeValue::Percent(v) => write!(f, "{v}%"),
            TimeValue::Fit => write!(f, "fit"),
            TimeValue::Source => write!(f, "source"),
        }
    }
}

/// Parse a plain real number, rejecting empty strings, embedded whitespace
/// and non-finite values.
fn parse_number(text: &str) -> Option<f64> {
    if text.is_empty() || text.chars().any(char::is_whitespace) {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}
