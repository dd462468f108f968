//! Leaf compilation: media inputs and drawn text.

use clipweave_common::error::{ClipweaveError, ClipweaveResult};
use clipweave_model::{AudioSystem, SourceContent, SourceKind, Style, Tag, TimeValue};

use super::Process;
use crate::context::CompileContext;
use crate::filters;
use crate::graph::{AudioStream, VideoStream};

pub(super) fn compile<'a>(
    ctx: &mut CompileContext,
    leaf: &'a SourceContent,
) -> ClipweaveResult<Process<'a>> {
    let style = &leaf.style;
    let mut process = Process::new(leaf.tag, style);

    match leaf.kind {
        SourceKind::Text => {
            let text = leaf.text().unwrap_or_default();
            process.video = Some(text_video(ctx, leaf.tag, text, style)?);
        }
        kind => {
            let path = leaf.path().ok_or_else(|| {
                ClipweaveError::schema(format!("<{}> has no media path", leaf.tag))
            })?;
            let want_audio = kind.has_audio() && style.source.has_audio;
            let (video, audio) = ctx.source(path, kind, kind.has_video(), want_audio);
            process.video = match video {
                Some(video) => Some(media_video(ctx, leaf.tag, video, style)?),
                None => None,
            };
            process.audio = match audio {
                Some(audio) => Some(media_audio(ctx, audio, style)),
                None if kind == SourceKind::Video => {
                    let silence = filters::silence(ctx.sample_rate());
                    Some(ctx.graph().audio_source(silence))
                }
                None => None,
            };
        }
    }

    let process = apply_length(ctx, process, leaf.kind, style);
    let background = style.background_color;
    let process = process.delay(ctx, style.time_padding_start.seconds_or_zero(), background);
    let process = if style.object_length.is_fit() {
        process
    } else {
        process.append(ctx, style.time_padding_end.seconds_or_zero(), background)
    };
    tracing::trace!(tag = %leaf.tag, length = %style.object_length, "Compiled leaf");
    Ok(process)
}

/// Resize, square the pixels, fix the frame rate and add the padding
/// canvas.
pub(crate) fn media_video(
    ctx: &mut CompileContext,
    tag: Tag,
    mut video: VideoStream,
    style: &Style,
) -> ClipweaveResult<VideoStream> {
    if style.needs_resize() {
        video = ctx.graph().video(
            video,
            filters::scale(style.width.pixels(), style.height.pixels()),
        );
    }
    video = ctx.graph().video(video, filters::square_pixels());
    let fps = ctx.fps();
    video = ctx.graph().video(video, filters::frame_rate(fps));

    if style.padding.is_zero() {
        return Ok(video);
    }
    let canvas = ctx.canvas(
        style.width_with_padding(),
        style.height_with_padding(),
        style.background_color,
        tag,
    )?;
    Ok(ctx.graph().video_join(
        vec![canvas, video],
        filters::overlay_shortest(
            style.padding.left.pixels_or(0),
            style.padding.top.pixels_or(0),
        ),
    ))
}

/// Text drawn onto a padded background canvas.
pub(crate) fn text_video(
    ctx: &mut CompileContext,
    tag: Tag,
    text: &str,
    style: &Style,
) -> ClipweaveResult<VideoStream> {
    let canvas = ctx.canvas(
        style.width_with_padding(),
        style.height_with_padding(),
        style.background_color,
        tag,
    )?;
    Ok(ctx.graph().video(
        canvas,
        filters::draw_text(
            text,
            style.padding.left.pixels_or(0),
            style.padding.top.pixels_or(0),
            style,
        ),
    ))
}

/// Channel conversion, volume, and a common sample layout.
fn media_audio(ctx: &mut CompileContext, mut audio: AudioStream, style: &Style) -> AudioStream {
    let graph = ctx.graph();
    match (style.source.audio_system, style.audio_system) {
        (Some(AudioSystem::Monaural), _) => {
            let (left, right) = graph.split_audio(audio);
            audio = graph.audio_join(vec![left, right], filters::merge_channels());
        }
        (Some(AudioSystem::Stereo), Some(AudioSystem::Monaural)) => {
            let mono = graph.audio(audio, filters::downmix());
            let (left, right) = graph.split_audio(mono);
            audio = graph.audio_join(vec![left, right], filters::merge_channels());
        }
        _ => {}
    }
    if let Some(volume) = filters::volume(style.audio_volume) {
        audio = graph.audio(audio, volume);
    }
    let sample_rate = ctx.sample_rate();
    ctx.graph().audio(audio, filters::normalize_audio(sample_rate))
}

/// Cut to the object length, first extending media that runs out early.
/// An elastic media leaf loops; images and text already run forever.
fn apply_length<'a>(
    ctx: &mut CompileContext,
    mut process: Process<'a>,
    kind: SourceKind,
    style: &Style,
) -> Process<'a> {
    let media = matches!(kind, SourceKind::Video | SourceKind::Audio);
    match style.object_length {
        TimeValue::Seconds(length) => {
            let runs_short = media
                && style
                    .source
                    .duration_secs
                    .map(|duration| duration + 1e-6 < length)
                    .unwrap_or(false);
            if runs_short {
                process = process.extend(ctx);
            }
            process.video = process
                .video
                .map(|v| ctx.graph().video(v, filters::trim_video(length)));
            process.audio = process
                .audio
                .map(|a| ctx.graph().audio(a, filters::trim_audio(length)));
            process
        }
        TimeValue::Fit if media => {
            process.video = process
                .video
                .map(|v| ctx.graph().video(v, filters::loop_video()));
            process.audio = process
                .audio
                .map(|a| ctx.graph().audio(a, filters::loop_audio()));
            process
        }
        _ => process,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipweave_model::{
        Color, Edges, GraphicValue, RenderContext, Resolution, SourceLocator, SourceMetadata,
    };
    use std::path::PathBuf;

    fn ctx() -> CompileContext {
        CompileContext::new(RenderContext::new(Resolution::new(640, 360), 30.0), 48_000)
    }

    fn media(tag: Tag, source: SourceMetadata, style: Style) -> SourceContent {
        SourceContent {
            tag,
            kind: tag.source_kind().unwrap(),
            locator: SourceLocator::Path(PathBuf::from("media")),
            style: Style { source, ..style },
        }
    }

    fn clip(audio_system: Option<AudioSystem>, has_audio: bool) -> SourceMetadata {
        SourceMetadata {
            duration_secs: Some(4.0),
            width: Some(640),
            height: Some(360),
            has_audio,
            audio_system,
        }
    }

    fn compile_text(leaf: &SourceContent) -> String {
        let mut ctx = ctx();
        let process = compile(&mut ctx, leaf).unwrap();
        drop((process.video, process.audio));
        ctx.finish().to_filter_complex()
    }

    fn sized(length: f64) -> Style {
        Style {
            object_length: TimeValue::Seconds(length),
            width: GraphicValue::Pixel(640),
            height: GraphicValue::Pixel(360),
            ..Style::default()
        }
    }

    #[test]
    fn test_natural_size_is_not_scaled() {
        let leaf = media(Tag::Vid, clip(Some(AudioSystem::Stereo), true), sized(4.0));
        let text = compile_text(&leaf);
        assert!(!text.contains("scale="));
        assert!(text.contains("trim=end=4"));
        assert!(text.contains("atrim=end=4"));
        assert!(!text.contains("volume="));
    }

    #[test]
    fn test_declared_box_scales() {
        let mut style = sized(4.0);
        style.width = GraphicValue::Pixel(320);
        style.height = GraphicValue::Pixel(180);
        let leaf = media(Tag::Vid, clip(Some(AudioSystem::Stereo), true), style);
        assert!(compile_text(&leaf).contains("scale=320:180"));
    }

    #[test]
    fn test_mono_source_is_duplicated() {
        let leaf = media(Tag::Aud, clip(Some(AudioSystem::Monaural), true), sized(4.0));
        let text = compile_text(&leaf);
        assert!(text.contains("amerge=inputs=2"));
        assert!(!text.contains("pan="));
    }

    #[test]
    fn test_stereo_declared_mono_is_downmixed_then_duplicated() {
        let mut style = sized(4.0);
        style.audio_system = Some(AudioSystem::Monaural);
        let leaf = media(Tag::Aud, clip(Some(AudioSystem::Stereo), true), style);
        let text = compile_text(&leaf);
        let pan = text.find("pan=").unwrap();
        let merge = text.find("amerge").unwrap();
        assert!(pan < merge);
    }

    #[test]
    fn test_volume_in_decibels() {
        let mut style = sized(4.0);
        style.audio_volume = 50.0;
        let leaf = media(Tag::Aud, clip(Some(AudioSystem::Stereo), true), style);
        assert!(compile_text(&leaf).contains("volume=volume=-6.0206dB"));
    }

    #[test]
    fn test_silent_video_gets_generated_audio() {
        let leaf = media(Tag::Vid, clip(None, false), sized(4.0));
        let mut ctx = ctx();
        let process = compile(&mut ctx, &leaf).unwrap();
        assert!(process.audio.is_some());
        drop((process.video, process.audio));
        let text = ctx.finish().to_filter_complex();
        assert!(text.contains("anullsrc"));
        assert!(!text.contains("0:a:0"));
    }

    #[test]
    fn test_short_media_is_extended_before_trim() {
        let leaf = media(Tag::Vid, clip(Some(AudioSystem::Stereo), true), sized(6.0));
        let text = compile_text(&leaf);
        let extend = text.find("tpad=stop=-1").unwrap();
        let trim = text.find("trim=end=6").unwrap();
        assert!(extend < trim);
    }

    #[test]
    fn test_padding_uses_background_canvas() {
        let mut style = sized(2.0);
        style.padding = Edges::uniform(GraphicValue::Pixel(10));
        style.background_color = Some(Color::rgba(0, 0, 255, 255));
        let leaf = media(Tag::Img, clip(None, false), style);
        let text = compile_text(&leaf);
        assert!(text.contains("color=c=0x0000FFFF:s=660x380"));
        assert!(text.contains("overlay=x=10:y=10"));
    }

    #[test]
    fn test_time_padding_wraps_object() {
        let mut style = sized(2.0);
        style.time_padding_start = TimeValue::Seconds(1.0);
        style.time_padding_end = TimeValue::Seconds(0.5);
        let leaf = media(Tag::Img, clip(None, false), style);
        let text = compile_text(&leaf);
        assert!(text.contains("tpad=start_duration=1:color=0x00000000"));
        assert!(text.contains("tpad=stop_duration=0.5"));
    }

    #[test]
    fn test_text_is_drawn_on_canvas() {
        let leaf = SourceContent {
            tag: Tag::Txt,
            kind: SourceKind::Text,
            locator: SourceLocator::Text("Hello, world".to_string()),
            style: Style {
                object_length: TimeValue::Seconds(1.0),
                width: GraphicValue::Pixel(120),
                height: GraphicValue::Pixel(20),
                font_size: Some(GraphicValue::Pixel(20)),
                ..Style::default()
            },
        };
        let text = compile_text(&leaf);
        assert!(text.contains("s=120x20"));
        assert!(text.contains("drawtext=expansion=none:text=Hello\\, world"));
    }
}
