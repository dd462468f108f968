//! Builders for the ffmpeg filters the compiler emits.

use clipweave_model::{Color, FontStyle, FontWeight, Style};

use crate::graph::{number, Filter};

/// Loop length used when a video must be extended indefinitely.
const VIDEO_LOOP_FRAMES: i64 = 32767;
/// Loop length used when audio must be extended indefinitely.
const AUDIO_LOOP_SAMPLES: i64 = 2_147_483_647;

/// Solid-color RGBA generator.
pub fn color_source(width: i64, height: i64, color: Color, fps: f64) -> Filter {
    Filter::new("color")
        .arg("c", color.ffmpeg_code())
        .arg("s", format!("{width}x{height}"))
        .arg("r", number(fps))
}

/// Silent stereo generator.
pub fn silence(sample_rate: u32) -> Filter {
    Filter::new("anullsrc")
        .arg("channel_layout", "stereo")
        .arg("sample_rate", sample_rate)
}

pub fn rgba() -> Filter {
    Filter::new("format").arg("pix_fmts", "rgba")
}

/// Scale to `width`x`height`; `None` keeps the aspect ratio on that axis.
pub fn scale(width: Option<i64>, height: Option<i64>) -> Filter {
    Filter::new("scale")
        .positional(width.unwrap_or(-1))
        .positional(height.unwrap_or(-1))
}

pub fn square_pixels() -> Filter {
    Filter::new("setsar").positional(1)
}

pub fn frame_rate(fps: f64) -> Filter {
    Filter::new("fps").positional(number(fps))
}

/// Composite the second input over the first at (`x`, `y`).
pub fn overlay(x: i64, y: i64) -> Filter {
    Filter::new("overlay")
        .arg("x", x)
        .arg("y", y)
        .arg("format", "rgb")
}

/// Overlay that ends with the base, for placing content on a canvas.
pub fn overlay_shortest(x: i64, y: i64) -> Filter {
    overlay(x, y).arg("shortest", 1)
}

/// Overlay that keeps the base running after the top input ends.
pub fn overlay_pass(x: i64, y: i64) -> Filter {
    overlay(x, y).arg("eof_action", "pass")
}

pub fn trim_video(end: f64) -> Filter {
    Filter::new("trim").arg("end", number(end))
}

pub fn trim_audio(end: f64) -> Filter {
    Filter::new("atrim").arg("end", number(end))
}

/// Drop everything before `start` and rebase timestamps.
pub fn seek_video(start: f64) -> Filter {
    Filter::new("trim").arg("start", number(start))
}

pub fn reset_timestamps() -> Filter {
    Filter::new("setpts").positional("PTS-STARTPTS")
}

pub fn loop_video() -> Filter {
    Filter::new("loop")
        .arg("loop", -1)
        .arg("size", VIDEO_LOOP_FRAMES)
        .arg("start", 0)
}

pub fn loop_audio() -> Filter {
    Filter::new("aloop")
        .arg("loop", -1)
        .arg("size", AUDIO_LOOP_SAMPLES)
        .arg("start", 0)
}

/// Hold `seconds` of `color` before the first frame.
pub fn pad_video_start(seconds: f64, color: Option<Color>) -> Filter {
    Filter::new("tpad")
        .arg("start_duration", number(seconds))
        .arg("color", Color::code_or_transparent(color))
}

/// Hold `seconds` of `color` after the last frame.
pub fn pad_video_end(seconds: f64, color: Option<Color>) -> Filter {
    Filter::new("tpad")
        .arg("stop_duration", number(seconds))
        .arg("color", Color::code_or_transparent(color))
}

/// Repeat the last frame forever.
pub fn extend_video() -> Filter {
    Filter::new("tpad").arg("stop", -1).arg("stop_mode", "clone")
}

/// Delay every channel by `seconds`.
pub fn delay_audio(seconds: f64) -> Filter {
    let millis = (seconds * 1000.0).round() as i64;
    Filter::new("adelay").arg("delays", millis).arg("all", 1)
}

/// Append `seconds` of silence.
pub fn pad_audio_end(seconds: f64) -> Filter {
    Filter::new("apad").arg("pad_dur", number(seconds))
}

/// Pad with silence up to a total of `seconds`.
pub fn pad_audio_whole(seconds: f64) -> Filter {
    Filter::new("apad").arg("whole_dur", number(seconds))
}

/// Pad with silence forever.
pub fn extend_audio() -> Filter {
    Filter::new("apad")
}

pub fn concat_video(segments: usize) -> Filter {
    Filter::new("concat")
        .arg("n", segments)
        .arg("v", 1)
        .arg("a", 0)
}

pub fn concat_audio(segments: usize) -> Filter {
    Filter::new("concat")
        .arg("n", segments)
        .arg("v", 0)
        .arg("a", 1)
}

/// Sum audio tracks without level normalization.
pub fn mix(inputs: usize) -> Filter {
    Filter::new("amix")
        .arg("inputs", inputs)
        .arg("duration", "longest")
        .arg("normalize", 0)
}

/// Interleave two mono pads into one stereo pad.
pub fn merge_channels() -> Filter {
    Filter::new("amerge").arg("inputs", 2)
}

/// Average a stereo pad down to mono.
pub fn downmix() -> Filter {
    Filter::new("pan").positional("mono|c0=0.5*c0+0.5*c1")
}

/// Common sample layout so concat and amix accept every track.
pub fn normalize_audio(sample_rate: u32) -> Filter {
    Filter::new("aformat")
        .arg("sample_fmts", "fltp")
        .arg("sample_rates", sample_rate)
        .arg("channel_layouts", "stereo")
}

/// Gain in decibels for a volume percentage.
pub fn volume_db(percent: f64) -> f64 {
    20.0 * (percent / 100.0).log10()
}

/// Volume filter for a percentage, or `None` at 100%.
pub fn volume(percent: f64) -> Option<Filter> {
    if (percent - 100.0).abs() < f64::EPSILON {
        return None;
    }
    let db = if percent <= 0.0 {
        "-inf".to_string()
    } else {
        number(volume_db(percent))
    };
    Some(Filter::new("volume").arg("volume", format!("{db}dB")))
}

/// fontconfig pattern for the font properties of `style`, if any are set.
fn font_pattern(style: &Style) -> Option<String> {
    if style.font_family.is_none() && style.font_weight.is_none() && style.font_style.is_none() {
        return None;
    }
    let mut pattern = style.font_family.clone().unwrap_or_else(|| "Sans".to_string());
    if style.font_weight == Some(FontWeight::Bold) {
        pattern.push_str(":weight=bold");
    }
    if style.font_style == Some(FontStyle::Italic) {
        pattern.push_str(":slant=italic");
    }
    Some(pattern)
}

/// Draw `text` at (`x`, `y`) with the font properties of `style`.
pub fn draw_text(text: &str, x: i64, y: i64, style: &Style) -> Filter {
    let mut filter = Filter::new("drawtext")
        .arg("expansion", "none")
        .arg("text", text)
        .arg("x", x)
        .arg("y", y);
    if let Some(font) = font_pattern(style) {
        filter = filter.arg("font", font);
    }
    if let Some(size) = style.font_size.and_then(|size| size.pixels()) {
        filter = filter.arg("fontsize", size);
    }
    filter = filter.arg(
        "fontcolor",
        style.font_color.unwrap_or(Color::WHITE).ffmpeg_code(),
    );
    if let Some(border) = style.font_border_color {
        filter = filter.arg("bordercolor", border.ffmpeg_code());
    }
    if let Some(width) = style.font_border_width {
        filter = filter.arg("borderw", width);
    }
    filter
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipweave_model::GraphicValue;

    #[test]
    fn test_volume_half_is_minus_six_db() {
        assert!((volume_db(50.0) + 6.0206).abs() < 1e-3);
        let filter = volume(50.0).unwrap();
        assert_eq!(filter.get("volume"), Some("-6.0206dB"));
    }

    #[test]
    fn test_full_volume_emits_nothing() {
        assert!(volume(100.0).is_none());
        assert_eq!(volume(0.0).unwrap().get("volume"), Some("-infdB"));
    }

    #[test]
    fn test_color_source() {
        let filter = color_source(320, 240, Color::rgba(255, 0, 0, 128), 30.0);
        assert_eq!(filter.to_string(), "color=c=0xFF000080:s=320x240:r=30");
    }

    #[test]
    fn test_delay_in_milliseconds() {
        assert_eq!(delay_audio(1.25).to_string(), "adelay=delays=1250:all=1");
    }

    #[test]
    fn test_draw_text_font_pattern() {
        let style = Style {
            font_family: Some("DejaVu Serif".to_string()),
            font_weight: Some(FontWeight::Bold),
            font_size: Some(GraphicValue::Pixel(24)),
            font_border_color: Some(Color::BLACK),
            font_border_width: Some(2),
            ..Style::default()
        };
        let filter = draw_text("hi", 4, 8, &style);
        assert_eq!(filter.get("font"), Some("DejaVu Serif:weight=bold"));
        assert_eq!(filter.get("fontsize"), Some("24"));
        assert_eq!(filter.get("fontcolor"), Some("0xFFFFFFFF"));
        assert_eq!(filter.get("borderw"), Some("2"));
        assert!(filter.to_string().contains("DejaVu Serif\\\\:weight=bold"));
    }
}
