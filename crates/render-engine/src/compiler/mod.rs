//! Content tree to filter graph compilation.
//!
//! Every node compiles to a [`Process`]: at most one video and one audio
//! pad plus the node's style. Leaves read media or draw text, containers
//! concatenate ([`sequence`]) or layer ([`parallel`]) their children, and
//! [`compile_document`] finishes the root onto the output canvas.

pub mod layout;
mod parallel;
mod sequence;
pub(crate) mod source;

use clipweave_common::error::{ClipweaveError, ClipweaveResult};
use clipweave_model::{Color, Content, GraphicValue, Order, RenderContext, Style, Tag, WrapContent};

use crate::context::CompileContext;
use crate::filters;
use crate::graph::{AudioStream, FilterGraph, VideoStream};

/// Compiled form of one content node.
#[derive(Debug)]
pub struct Process<'a> {
    pub tag: Tag,
    pub style: &'a Style,
    pub video: Option<VideoStream>,
    pub audio: Option<AudioStream>,
}

impl<'a> Process<'a> {
    pub fn new(tag: Tag, style: &'a Style) -> Self {
        Self {
            tag,
            style,
            video: None,
            audio: None,
        }
    }

    /// Hold `seconds` of `color` and silence before the content.
    pub(crate) fn delay(mut self, ctx: &mut CompileContext, seconds: f64, color: Option<Color>) -> Self {
        if seconds <= 0.0 {
            return self;
        }
        self.video = self
            .video
            .map(|v| ctx.graph().video(v, filters::pad_video_start(seconds, color)));
        self.audio = self
            .audio
            .map(|a| ctx.graph().audio(a, filters::delay_audio(seconds)));
        self
    }

    /// Append `seconds` of `color` and silence after the content.
    pub(crate) fn append(mut self, ctx: &mut CompileContext, seconds: f64, color: Option<Color>) -> Self {
        if seconds <= 0.0 {
            return self;
        }
        self.video = self
            .video
            .map(|v| ctx.graph().video(v, filters::pad_video_end(seconds, color)));
        self.audio = self
            .audio
            .map(|a| ctx.graph().audio(a, filters::pad_audio_end(seconds)));
        self
    }

    /// Make both streams exactly `seconds` long, padding short content with
    /// `color` and silence.
    pub(crate) fn conform(mut self, ctx: &mut CompileContext, seconds: f64, color: Option<Color>) -> Self {
        self.video = self.video.map(|v| {
            let padded = ctx.graph().video(v, filters::pad_video_end(seconds, color));
            ctx.graph().video(padded, filters::trim_video(seconds))
        });
        self.audio = self.audio.map(|a| {
            let padded = ctx.graph().audio(a, filters::pad_audio_whole(seconds));
            ctx.graph().audio(padded, filters::trim_audio(seconds))
        });
        self
    }

    /// Repeat the last frame and pad silence forever.
    pub(crate) fn extend(mut self, ctx: &mut CompileContext) -> Self {
        self.video = self.video.map(|v| ctx.graph().video(v, filters::extend_video()));
        self.audio = self.audio.map(|a| ctx.graph().audio(a, filters::extend_audio()));
        self
    }
}

/// Compile any node.
pub fn compile_content<'a>(
    ctx: &mut CompileContext,
    content: &'a Content,
) -> ClipweaveResult<Process<'a>> {
    match content {
        Content::Source(leaf) => source::compile(ctx, leaf),
        Content::Wrap(wrap) => compile_wrap(ctx, wrap),
    }
}

fn compile_wrap<'a>(ctx: &mut CompileContext, wrap: &'a WrapContent) -> ClipweaveResult<Process<'a>> {
    let process = match wrap.style.order {
        Order::Sequence => sequence::compile(ctx, wrap)?,
        Order::Parallel => parallel::compile(ctx, wrap)?,
    };
    let style = &wrap.style;
    let background = style.background_color;
    let process = process.delay(ctx, style.time_padding_start.seconds_or_zero(), background);
    Ok(if style.object_length.is_fit() {
        process
    } else {
        process.append(ctx, style.time_padding_end.seconds_or_zero(), background)
    })
}

/// A finished graph with the pads to map into the output file.
#[derive(Debug)]
pub struct CompiledDocument {
    pub graph: FilterGraph,
    pub video: Option<VideoStream>,
    pub audio: Option<AudioStream>,
    pub context: RenderContext,
    /// Total output length, root margins included.
    pub duration_secs: f64,
}

impl CompiledDocument {
    pub fn total_frames(&self) -> u64 {
        (self.duration_secs * self.context.fps).ceil().max(0.0) as u64
    }
}

/// Compile the root node and finish it onto a canvas of the output
/// resolution.
pub fn compile_document(
    root: &Content,
    render: RenderContext,
    sample_rate: u32,
) -> ClipweaveResult<CompiledDocument> {
    let style = root.style();
    if style.object_length.is_fit() {
        return Err(ClipweaveError::unresolved(root.tag().as_str(), "object-length"));
    }
    let duration_secs = style.object_length_with_margin().seconds_or_zero();

    let mut ctx = CompileContext::new(render, sample_rate);
    let mut process = compile_content(&mut ctx, root)?;

    if let Some(video) = process.video.take() {
        let resolution = render.resolution;
        let canvas = ctx.canvas(
            GraphicValue::Pixel(i64::from(resolution.width)),
            GraphicValue::Pixel(i64::from(resolution.height)),
            style.background_color,
            root.tag(),
        )?;
        let x = style.margin.left.pixels_or(0);
        let y = style.margin.top.pixels_or(0);
        process.video = Some(
            ctx.graph()
                .video_join(vec![canvas, video], filters::overlay_shortest(x, y)),
        );
    }
    let background = style.background_color;
    let process = process
        .delay(&mut ctx, style.time_margin_start.seconds_or_zero(), background)
        .append(&mut ctx, style.time_margin_end.seconds_or_zero(), background);

    let (video, audio) = match (process.video, process.audio) {
        (Some(video), Some(audio)) => {
            let (video, audio) = ctx.graph().mux(video, audio);
            (Some(video), Some(audio))
        }
        (None, None) => return Err(ClipweaveError::EmptyOutput),
        streams => streams,
    };

    let graph = ctx.finish();
    tracing::info!(
        inputs = graph.inputs().len(),
        filters = graph.node_count(),
        duration_secs,
        video = video.is_some(),
        audio = audio.is_some(),
        "Document compiled"
    );
    Ok(CompiledDocument {
        graph,
        video,
        audio,
        context: render,
        duration_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipweave_model::{
        AudioSystem, Edges, Resolution, SourceContent, SourceKind, SourceLocator, SourceMetadata,
        TimeValue,
    };
    use std::path::PathBuf;

    fn render() -> RenderContext {
        RenderContext::new(Resolution::new(320, 240), 30.0)
    }

    fn video_leaf(path: &str, length: f64) -> Content {
        Content::Source(SourceContent {
            tag: Tag::Vid,
            kind: SourceKind::Video,
            locator: SourceLocator::Path(PathBuf::from(path)),
            style: Style {
                object_length: TimeValue::Seconds(length),
                width: GraphicValue::Pixel(160),
                height: GraphicValue::Pixel(120),
                source: SourceMetadata {
                    duration_secs: Some(length),
                    width: Some(160),
                    height: Some(120),
                    has_audio: true,
                    audio_system: Some(AudioSystem::Stereo),
                },
                ..Style::default()
            },
        })
    }

    fn audio_leaf(length: f64) -> Content {
        Content::Source(SourceContent {
            tag: Tag::Aud,
            kind: SourceKind::Audio,
            locator: SourceLocator::Path(PathBuf::from("music.wav")),
            style: Style {
                object_length: TimeValue::Seconds(length),
                source: SourceMetadata {
                    duration_secs: Some(length),
                    has_audio: true,
                    audio_system: Some(AudioSystem::Stereo),
                    ..Default::default()
                },
                ..Style::default()
            },
        })
    }

    fn root(items: Vec<Content>, length: TimeValue) -> Content {
        let mut wrap = WrapContent::new(
            Tag::Cont,
            Style {
                object_length: length,
                width: GraphicValue::Pixel(160),
                height: GraphicValue::Pixel(120),
                ..Style::default()
            },
        );
        for item in items {
            wrap.push(item);
        }
        Content::Wrap(wrap)
    }

    #[test]
    fn test_sequence_document_muxes_both_streams() {
        let doc = root(
            vec![video_leaf("a.mp4", 1.0), video_leaf("b.mp4", 2.0)],
            TimeValue::Seconds(3.0),
        );
        let compiled = compile_document(&doc, render(), 48_000).unwrap();
        assert_eq!(compiled.duration_secs, 3.0);
        assert_eq!(compiled.total_frames(), 90);
        assert_eq!(compiled.graph.inputs().len(), 2);
        let text = compiled.graph.to_filter_complex();
        assert!(text.contains("concat=n=2:v=1:a=0"));
        assert!(text.contains("concat=n=2:v=0:a=1"));
        assert!(text.contains("concat=n=1:v=1:a=1"));
        assert!(compiled.video.is_some() && compiled.audio.is_some());
    }

    #[test]
    fn test_fit_root_is_rejected() {
        let doc = root(vec![video_leaf("a.mp4", 1.0)], TimeValue::Fit);
        let err = compile_document(&doc, render(), 48_000).unwrap_err();
        assert!(matches!(err, ClipweaveError::UnresolvedDimension { .. }));
    }

    #[test]
    fn test_empty_document_has_no_output() {
        let doc = root(Vec::new(), TimeValue::Seconds(1.0));
        let err = compile_document(&doc, render(), 48_000).unwrap_err();
        assert!(matches!(err, ClipweaveError::EmptyOutput));
    }

    #[test]
    fn test_audio_only_document_passes_audio_through() {
        let mut doc = root(vec![audio_leaf(2.0)], TimeValue::Seconds(2.0));
        if let Content::Wrap(wrap) = &mut doc {
            wrap.style.width = GraphicValue::Auto;
            wrap.style.height = GraphicValue::Auto;
        }
        let compiled = compile_document(&doc, render(), 48_000).unwrap();
        assert!(compiled.video.is_none());
        assert!(compiled.audio.is_some());
        assert!(!compiled.graph.to_filter_complex().contains("concat=n=1"));
    }

    #[test]
    fn test_root_margins_extend_output() {
        let mut doc = root(vec![video_leaf("a.mp4", 1.0)], TimeValue::Seconds(1.0));
        if let Content::Wrap(wrap) = &mut doc {
            wrap.style.time_margin_start = TimeValue::Seconds(0.5);
            wrap.style.time_margin_end = TimeValue::Seconds(0.25);
            wrap.style.margin = Edges {
                left: GraphicValue::Pixel(8),
                ..Edges::ZERO
            };
        }
        let compiled = compile_document(&doc, render(), 48_000).unwrap();
        assert_eq!(compiled.duration_secs, 1.75);
        let text = compiled.graph.to_filter_complex();
        assert!(text.contains("tpad=start_duration=0.5"));
        assert!(text.contains("adelay=delays=500:all=1"));
        assert!(text.contains("tpad=stop_duration=0.25"));
        assert!(text.contains("overlay=x=8:y=0"));
    }
}
