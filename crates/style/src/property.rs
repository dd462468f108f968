//! Per-property value grammars.
//!
//! Each declaration is validated on its own; a value that fails its grammar
//! leaves the style untouched.

use clipweave_model::{
    AudioSystem, Color, Direction, Edges, FontStyle, FontWeight, GraphicValue, LayerMode, Order,
    Style, TimeValue, ValueParseError,
};

use crate::stylesheet::Declaration;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PropertyError {
    #[error("unsupported property `{0}`")]
    Unsupported(String),

    #[error(transparent)]
    Value(#[from] ValueParseError),
}

/// Apply one declaration to `style`.
pub fn apply_declaration(style: &mut Style, declaration: &Declaration) -> Result<(), PropertyError> {
    let property = declaration.property.as_str();
    let value = declaration.value.trim();
    let invalid = || ValueParseError::property(property, value);

    match property {
        "object-length" => style.object_length = value.parse()?,
        "time-margin" => {
            let (start, end) = parse_time_pair(value).ok_or_else(invalid)?;
            style.time_margin_start = start;
            style.time_margin_end = end;
        }
        "time-margin-start" => style.time_margin_start = parse_time_span(value)?,
        "time-margin-end" => style.time_margin_end = parse_time_span(value)?,
        "time-padding" => {
            let (start, end) = parse_time_pair(value).ok_or_else(invalid)?;
            style.time_padding_start = start;
            style.time_padding_end = end;
        }
        "time-padding-start" => style.time_padding_start = parse_time_span(value)?,
        "time-padding-end" => style.time_padding_end = parse_time_span(value)?,
        "order" => style.order = value.parse::<Order>()?,
        "layer-mode" | "layer" => style.layer_mode = value.parse::<LayerMode>()?,
        "direction" => style.direction = value.parse::<Direction>()?,
        "width" => style.width = value.parse()?,
        "height" => style.height = value.parse()?,
        "margin" => style.margin = parse_edges(value).ok_or_else(invalid)?,
        "margin-top" => style.margin.top = value.parse()?,
        "margin-right" => style.margin.right = value.parse()?,
        "margin-bottom" => style.margin.bottom = value.parse()?,
        "margin-left" => style.margin.left = value.parse()?,
        "padding" => style.padding = parse_edges(value).ok_or_else(invalid)?,
        "padding-top" => style.padding.top = value.parse()?,
        "padding-right" => style.padding.right = value.parse()?,
        "padding-bottom" => style.padding.bottom = value.parse()?,
        "padding-left" => style.padding.left = value.parse()?,
        "background-color" => style.background_color = Some(value.parse::<Color>()?),
        "audio-volume" => style.audio_volume = parse_percentage(value).ok_or_else(invalid)?,
        "audio-system" => style.audio_system = Some(value.parse::<AudioSystem>()?),
        "font-color" => style.font_color = Some(value.parse::<Color>()?),
        "font-border" => {
            let (color, width) = parse_color_and_pixel(value).ok_or_else(invalid)?;
            style.font_border_color = Some(color);
            style.font_border_width = Some(width);
        }
        "font-border-color" => style.font_border_color = Some(value.parse::<Color>()?),
        "font-border-width" => {
            style.font_border_width = Some(parse_pixel(value).ok_or_else(invalid)?)
        }
        "font-family" => style.font_family = Some(value.to_string()),
        "font-size" => style.font_size = Some(value.parse::<GraphicValue>()?),
        "font-weight" => style.font_weight = Some(value.parse::<FontWeight>()?),
        "font-style" => style.font_style = Some(value.parse::<FontStyle>()?),
        _ => return Err(PropertyError::Unsupported(property.to_string())),
    }
    Ok(())
}

/// Time margins and paddings take a concrete time unit only.
fn parse_time_span(value: &str) -> Result<TimeValue, ValueParseError> {
    match value.parse::<TimeValue>()? {
        TimeValue::Fit | TimeValue::Source => Err(ValueParseError::Time(value.to_string())),
        span => Ok(span),
    }
}

fn parse_time_pair(value: &str) -> Option<(TimeValue, TimeValue)> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    match parts.as_slice() {
        [both] => {
            let span = parse_time_span(both).ok()?;
            Some((span, span))
        }
        [start, end] => Some((parse_time_span(start).ok()?, parse_time_span(end).ok()?)),
        _ => None,
    }
}

fn parse_edges(value: &str) -> Option<Edges> {
    let values = value
        .split_whitespace()
        .map(|part| part.parse::<GraphicValue>().ok())
        .collect::<Option<Vec<_>>>()?;
    Edges::from_shorthand(&values)
}

fn parse_percentage(value: &str) -> Option<f64> {
    value
        .strip_suffix('%')?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

fn parse_pixel(value: &str) -> Option<i64> {
    match value.parse::<GraphicValue>().ok()? {
        GraphicValue::Pixel(px) => Some(px),
        _ => None,
    }
}

/// `<color> <n>px` or `<n>px <color>`.
fn parse_color_and_pixel(value: &str) -> Option<(Color, i64)> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    let [first, second] = parts.as_slice() else {
        return None;
    };
    if let Some(px) = parse_pixel(first) {
        return Some((second.parse().ok()?, px));
    }
    Some((first.parse().ok()?, parse_pixel(second)?))
}
