//! The resolved style record attached to every content node.

use std::str::FromStr;

use serde::Serialize;

use crate::color::Color;
use crate::value::{GraphicValue, TimeValue, ValueParseError};

/// How children share the timeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    #[default]
    Sequence,
    Parallel,
}

/// Whether parallel children share one layer (laid out side by side) or
/// stack on independent layers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerMode {
    Single,
    #[default]
    Multi,
}

/// Flow direction for single-layer layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    #[default]
    Row,
    Column,
    RowReverse,
    ColumnReverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioSystem {
    Monaural,
    Stereo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    Normal,
    Italic,
}

/// A box axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Direction {
    pub fn is_row(&self) -> bool {
        matches!(self, Direction::Row | Direction::RowReverse)
    }

    /// Axis along which children flow.
    pub fn axis(&self) -> Axis {
        if self.is_row() {
            Axis::Horizontal
        } else {
            Axis::Vertical
        }
    }

    pub fn is_reverse(&self) -> bool {
        matches!(self, Direction::RowReverse | Direction::ColumnReverse)
    }
}

impl AudioSystem {
    /// Map an ffprobe channel layout / channel count to an audio system.
    pub fn from_channel_layout(layout: Option<&str>, channels: Option<u32>) -> Option<Self> {
        match layout {
            Some("mono") | Some("monaural") => Some(AudioSystem::Monaural),
            Some("stereo") => Some(AudioSystem::Stereo),
            _ => match channels {
                Some(1) => Some(AudioSystem::Monaural),
                Some(2) => Some(AudioSystem::Stereo),
                _ => None,
            },
        }
    }
}

macro_rules! keyword_enum {
    ($ty:ty, $property:literal, { $($text:literal => $variant:expr),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = ValueParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($variant),)+
                    _ => Err(ValueParseError::property($property, s)),
                }
            }
        }
    };
}

keyword_enum!(Order, "order", {
    "sequence" => Order::Sequence,
    "parallel" => Order::Parallel,
});

keyword_enum!(LayerMode, "layer-mode", {
    "single" => LayerMode::Single,
    "multi" => LayerMode::Multi,
});

keyword_enum!(Direction, "direction", {
    "row" => Direction::Row,
    "column" => Direction::Column,
    "row-reverse" => Direction::RowReverse,
    "column-reverse" => Direction::ColumnReverse,
});

keyword_enum!(AudioSystem, "audio-system", {
    "monaural" => AudioSystem::Monaural,
    "stereo" => AudioSystem::Stereo,
});

keyword_enum!(FontWeight, "font-weight", {
    "normal" => FontWeight::Normal,
    "bold" => FontWeight::Bold,
});

keyword_enum!(FontStyle, "font-style", {
    "normal" => FontStyle::Normal,
    "italic" => FontStyle::Italic,
});

/// Four box edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Edges {
    pub top: GraphicValue,
    pub right: GraphicValue,
    pub bottom: GraphicValue,
    pub left: GraphicValue,
}

impl Edges {
    pub const ZERO: Edges = Edges::uniform(GraphicValue::ZERO);

    pub const fn uniform(value: GraphicValue) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    /// CSS shorthand expansion: 1 to 4 values in top/right/bottom/left
    /// order.
    pub fn from_shorthand(values: &[GraphicValue]) -> Option<Self> {
        match *values {
            [all] => Some(Self::uniform(all)),
            [vertical, horizontal] => Some(Self {
                top: vertical,
                right: horizontal,
                bottom: vertical,
                left: horizontal,
            }),
            [top, horizontal, bottom] => Some(Self {
                top,
                right: horizontal,
                bottom,
                left: horizontal,
            }),
            [top, right, bottom, left] => Some(Self {
                top,
                right,
                bottom,
                left,
            }),
            _ => None,
        }
    }

    /// Left plus right, in pixels; unresolved edges count as zero.
    pub fn horizontal_px(&self) -> i64 {
        self.left.pixels_or(0) + self.right.pixels_or(0)
    }

    /// Top plus bottom, in pixels; unresolved edges count as zero.
    pub fn vertical_px(&self) -> i64 {
        self.top.pixels_or(0) + self.bottom.pixels_or(0)
    }

    pub fn is_zero(&self) -> bool {
        [self.top, self.right, self.bottom, self.left]
            .iter()
            .all(|edge| edge.pixels_or(0) == 0)
    }

    pub fn map(self, f: impl Fn(GraphicValue) -> GraphicValue) -> Self {
        Self {
            top: f(self.top),
            right: f(self.right),
            bottom: f(self.bottom),
            left: f(self.left),
        }
    }
}

impl Default for Edges {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Axis {
    pub fn cross(self) -> Axis {
        match self {
            Axis::Horizontal => Axis::Vertical,
            Axis::Vertical => Axis::Horizontal,
        }
    }

    /// Width or height of `style`.
    pub fn extent(self, style: &Style) -> GraphicValue {
        match self {
            Axis::Horizontal => style.width,
            Axis::Vertical => style.height,
        }
    }

    /// Leading and trailing edges along this axis, in pixels. Reversed
    /// flow leads with the right or bottom edge.
    pub fn edges_px(self, edges: &Edges, reverse: bool) -> (i64, i64) {
        let (start, end) = match self {
            Axis::Horizontal => (edges.left, edges.right),
            Axis::Vertical => (edges.top, edges.bottom),
        };
        let (start, end) = (start.pixels_or(0), end.pixels_or(0));
        if reverse {
            (end, start)
        } else {
            (start, end)
        }
    }
}

/// Facts about the underlying media, filled by probing or text measurement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SourceMetadata {
    pub duration_secs: Option<f64>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    /// The media carries an audio stream.
    pub has_audio: bool,
    pub audio_system: Option<AudioSystem>,
}

/// Fully resolved style of one content node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Style {
    // timeline
    pub object_length: TimeValue,
    pub time_margin_start: TimeValue,
    pub time_margin_end: TimeValue,
    pub time_padding_start: TimeValue,
    pub time_padding_end: TimeValue,
    pub order: Order,

    // box
    pub width: GraphicValue,
    pub height: GraphicValue,
    pub layer_mode: LayerMode,
    pub direction: Direction,
    pub margin: Edges,
    pub padding: Edges,
    pub background_color: Option<Color>,

    // audio
    pub audio_volume: f64,
    pub audio_system: Option<AudioSystem>,

    // text
    pub font_family: Option<String>,
    pub font_size: Option<GraphicValue>,
    pub font_color: Option<Color>,
    pub font_border_color: Option<Color>,
    pub font_border_width: Option<i64>,
    pub font_weight: Option<FontWeight>,
    pub font_style: Option<FontStyle>,

    pub source: SourceMetadata,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            object_length: TimeValue::Fit,
            time_margin_start: TimeValue::ZERO,
            time_margin_end: TimeValue::ZERO,
            time_padding_start: TimeValue::ZERO,
            time_padding_end: TimeValue::ZERO,
            order: Order::Sequence,
            width: GraphicValue::Auto,
            height: GraphicValue::Auto,
            layer_mode: LayerMode::Multi,
            direction: Direction::Row,
            margin: Edges::ZERO,
            padding: Edges::ZERO,
            background_color: None,
            audio_volume: 100.0,
            audio_system: None,
            font_family: None,
            font_size: None,
            font_color: None,
            font_border_color: None,
            font_border_width: None,
            font_weight: None,
            font_style: None,
            source: SourceMetadata::default(),
        }
    }
}

impl Style {
    /// Object length plus time padding on both ends.
    pub fn object_length_with_padding(&self) -> TimeValue {
        self.object_length + self.time_padding_start + self.time_padding_end
    }

    /// Full timeline footprint: margins, paddings and object length.
    pub fn object_length_with_margin(&self) -> TimeValue {
        self.time_margin_start + self.object_length_with_padding() + self.time_margin_end
    }

    pub fn width_with_padding(&self) -> GraphicValue {
        self.width + self.padding.left + self.padding.right
    }

    pub fn height_with_padding(&self) -> GraphicValue {
        self.height + self.padding.top + self.padding.bottom
    }

    /// Whether the natural source box differs from the declared box.
    pub fn needs_resize(&self) -> bool {
        let differs = |declared: GraphicValue, natural: Option<i64>| match declared.pixels() {
            Some(px) => natural != Some(px),
            None => false,
        };
        differs(self.width, self.source.width) || differs(self.height, self.source.height)
    }
}
