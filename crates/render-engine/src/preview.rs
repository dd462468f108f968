//! Single-frame previews.
//!
//! [`pick_frame`] prunes the content tree down to what is visible at one
//! instant, recording how far into each media leaf the frame falls.
//! [`compile_preview`] turns that pruned view into a video-only graph
//! that ffmpeg renders to a still image.

use clipweave_common::error::{ClipweaveError, ClipweaveResult};
use clipweave_model::{
    Content, GraphicValue, LayerMode, Order, RenderContext, SourceContent, SourceKind, Style,
    WrapContent,
};

use crate::compiler::layout::{layered_offset, FlowCursor};
use crate::compiler::source::{media_video, text_video};
use crate::context::CompileContext;
use crate::filters;
use crate::graph::{FilterGraph, VideoStream};

/// The visible part of a node at one instant.
#[derive(Debug, Clone, PartialEq)]
pub enum FramePick<'a> {
    Wrap {
        wrap: &'a WrapContent,
        /// Visible children with their index in `wrap.items`.
        items: Vec<(usize, FramePick<'a>)>,
    },
    Source {
        leaf: &'a SourceContent,
        /// Seconds into the media, or `None` while the leaf shows only its
        /// time padding.
        offset: Option<f64>,
    },
}

/// Whether `second`, measured from the start of the object, falls inside
/// its object length.
fn within_object(style: &Style, second: f64) -> bool {
    second >= 0.0
        && style
            .object_length
            .seconds()
            .map(|length| second < length)
            .unwrap_or(true)
}

/// Prune `content` to what is visible `second` seconds after its object
/// starts. Nodes without video are never visible.
pub fn pick_frame(content: &Content, second: f64) -> Option<FramePick<'_>> {
    if !content.exist_video() {
        return None;
    }
    match content {
        Content::Source(leaf) => Some(FramePick::Source {
            leaf,
            offset: within_object(&leaf.style, second).then_some(second),
        }),
        Content::Wrap(wrap) => {
            let items = if within_object(&wrap.style, second) {
                match wrap.style.order {
                    Order::Sequence => pick_sequence(wrap, second),
                    Order::Parallel => pick_parallel(wrap, second),
                }
            } else {
                Vec::new()
            };
            Some(FramePick::Wrap { wrap, items })
        }
    }
}

/// The single child active at `second`, following the same margin
/// collapsing as compilation.
fn pick_sequence(wrap: &WrapContent, second: f64) -> Vec<(usize, FramePick<'_>)> {
    let mut start = 0.0;
    let mut pending_margin = 0.0f64;
    for (index, item) in wrap.items.iter().enumerate() {
        let style = item.style();
        let item_start = start + style.time_margin_start.seconds_or_zero().max(pending_margin);
        if second < item_start {
            return Vec::new();
        }
        let content_start = item_start + style.time_padding_start.seconds_or_zero();
        let end = match style.object_length_with_padding().seconds() {
            Some(length) => item_start + length,
            None => f64::INFINITY,
        };
        if second < end {
            return pick_frame(item, second - content_start)
                .map(|pick| vec![(index, pick)])
                .unwrap_or_default();
        }
        start = end;
        pending_margin = style.time_margin_end.seconds_or_zero();
    }
    Vec::new()
}

/// Every child whose footprint covers `second`.
fn pick_parallel(wrap: &WrapContent, second: f64) -> Vec<(usize, FramePick<'_>)> {
    wrap.items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let style = item.style();
            let start = style.time_margin_start.seconds_or_zero();
            let active = second >= start
                && style
                    .object_length_with_padding()
                    .seconds()
                    .map(|length| second < start + length)
                    .unwrap_or(true);
            if !active {
                return None;
            }
            let local = second - start - style.time_padding_start.seconds_or_zero();
            pick_frame(item, local).map(|pick| (index, pick))
        })
        .collect()
}

/// A still-frame graph with its single output pad.
#[derive(Debug)]
pub struct CompiledPreview {
    pub graph: FilterGraph,
    pub video: VideoStream,
    pub frame: u64,
    pub second: f64,
}

// Unused by video-only graphs; any valid rate will do.
const PREVIEW_SAMPLE_RATE: u32 = 48_000;

/// Compile the frame at index `frame` of the document rooted at `root`.
pub fn compile_preview(
    root: &Content,
    render: RenderContext,
    frame: u64,
) -> ClipweaveResult<CompiledPreview> {
    let style = root.style();
    let second = frame as f64 / render.fps;
    if let Some(total) = style.object_length_with_margin().seconds() {
        if second > total {
            return Err(ClipweaveError::render(format!(
                "frame {frame} ({second:.3}s) is past the end of the document ({total:.3}s)"
            )));
        }
    }

    let margin_start = style.time_margin_start.seconds_or_zero();
    let pick = if second < margin_start {
        None
    } else {
        let local = second - margin_start - style.time_padding_start.seconds_or_zero();
        pick_frame(root, local)
    };

    let mut ctx = CompileContext::new(render, PREVIEW_SAMPLE_RATE);
    let content = match pick {
        Some(pick) => Some(compile_pick(&mut ctx, pick)?),
        None => None,
    };
    let canvas = ctx.canvas(
        GraphicValue::Pixel(i64::from(render.resolution.width)),
        GraphicValue::Pixel(i64::from(render.resolution.height)),
        style.background_color,
        root.tag(),
    )?;
    let video = match content {
        Some(content) => ctx.graph().video_join(
            vec![canvas, content],
            filters::overlay_pass(style.margin.left.pixels_or(0), style.margin.top.pixels_or(0)),
        ),
        None => canvas,
    };

    let graph = ctx.finish();
    tracing::info!(frame, second, filters = graph.node_count(), "Preview compiled");
    Ok(CompiledPreview {
        graph,
        video,
        frame,
        second,
    })
}

fn compile_pick(ctx: &mut CompileContext, pick: FramePick<'_>) -> ClipweaveResult<VideoStream> {
    match pick {
        FramePick::Source { leaf, offset } => compile_leaf(ctx, leaf, offset),
        FramePick::Wrap { wrap, items } => compile_wrap(ctx, wrap, items),
    }
}

fn compile_leaf(
    ctx: &mut CompileContext,
    leaf: &SourceContent,
    offset: Option<f64>,
) -> ClipweaveResult<VideoStream> {
    let style = &leaf.style;
    let Some(offset) = offset else {
        return ctx.canvas(
            style.width_with_padding(),
            style.height_with_padding(),
            style.background_color,
            leaf.tag,
        );
    };
    match (leaf.kind, leaf.path()) {
        (SourceKind::Text, _) => text_video(ctx, leaf.tag, leaf.text().unwrap_or_default(), style),
        (kind, Some(path)) => {
            let (video, _) = ctx.source(path, kind, true, false);
            let video = video.ok_or_else(|| {
                ClipweaveError::render(format!("<{}> has no video to preview", leaf.tag))
            })?;
            let video = if kind == SourceKind::Video {
                let seeked = ctx.graph().video(video, filters::seek_video(offset));
                ctx.graph().video(seeked, filters::reset_timestamps())
            } else {
                video
            };
            media_video(ctx, leaf.tag, video, style)
        }
        (_, None) => Err(ClipweaveError::schema(format!(
            "<{}> has no media path",
            leaf.tag
        ))),
    }
}

fn compile_wrap(
    ctx: &mut CompileContext,
    wrap: &WrapContent,
    items: Vec<(usize, FramePick<'_>)>,
) -> ClipweaveResult<VideoStream> {
    let style = &wrap.style;
    let mut base = ctx.canvas(
        style.width_with_padding(),
        style.height_with_padding(),
        style.background_color,
        wrap.tag,
    )?;

    // Single-layer positions depend on every video sibling, visible or not.
    let mut positions = Vec::with_capacity(wrap.items.len());
    let mut cursor = FlowCursor::new(style);
    for item in &wrap.items {
        let position = if style.order == Order::Parallel && style.layer_mode == LayerMode::Single {
            item.exist_video().then(|| cursor.place(item.style()))
        } else {
            Some(layered_offset(style, item.style()))
        };
        positions.push(position);
    }

    for (index, pick) in items {
        let Some((x, y)) = positions.get(index).copied().flatten() else {
            continue;
        };
        let layer = compile_pick(ctx, pick)?;
        base = ctx
            .graph()
            .video_join(vec![base, layer], filters::overlay_pass(x, y));
    }
    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipweave_model::{Resolution, SourceLocator, SourceMetadata, Tag, TimeValue};
    use std::path::PathBuf;

    fn clip(path: &str, length: f64) -> Content {
        Content::Source(SourceContent {
            tag: Tag::Vid,
            kind: SourceKind::Video,
            locator: SourceLocator::Path(PathBuf::from(path)),
            style: Style {
                object_length: TimeValue::Seconds(length),
                width: GraphicValue::Pixel(100),
                height: GraphicValue::Pixel(100),
                source: SourceMetadata {
                    duration_secs: Some(length),
                    width: Some(100),
                    height: Some(100),
                    has_audio: false,
                    audio_system: None,
                },
                ..Style::default()
            },
        })
    }

    fn container(order: Order, items: Vec<Content>, length: f64) -> Content {
        let mut wrap = WrapContent::new(
            Tag::Cont,
            Style {
                order,
                object_length: TimeValue::Seconds(length),
                width: GraphicValue::Pixel(100),
                height: GraphicValue::Pixel(100),
                ..Style::default()
            },
        );
        for item in items {
            wrap.push(item);
        }
        Content::Wrap(wrap)
    }

    fn picked_offsets(pick: &FramePick<'_>) -> Vec<(usize, Option<f64>)> {
        match pick {
            FramePick::Wrap { items, .. } => items
                .iter()
                .map(|(index, item)| match item {
                    FramePick::Source { offset, .. } => (*index, *offset),
                    FramePick::Wrap { .. } => (*index, None),
                })
                .collect(),
            FramePick::Source { .. } => Vec::new(),
        }
    }

    #[test]
    fn test_sequence_picks_active_child() {
        let root = container(Order::Sequence, vec![clip("a.mp4", 1.0), clip("b.mp4", 2.0)], 3.0);
        let pick = pick_frame(&root, 1.5).unwrap();
        assert_eq!(picked_offsets(&pick), vec![(1, Some(0.5))]);
        let pick = pick_frame(&root, 0.25).unwrap();
        assert_eq!(picked_offsets(&pick), vec![(0, Some(0.25))]);
    }

    #[test]
    fn test_sequence_margin_shows_nothing() {
        let mut second = clip("b.mp4", 1.0);
        if let Content::Source(leaf) = &mut second {
            leaf.style.time_margin_start = TimeValue::Seconds(1.0);
        }
        let root = container(Order::Sequence, vec![clip("a.mp4", 1.0), second], 3.0);
        let pick = pick_frame(&root, 1.5).unwrap();
        assert!(picked_offsets(&pick).is_empty());
        let pick = pick_frame(&root, 2.5).unwrap();
        assert_eq!(picked_offsets(&pick), vec![(1, Some(0.5))]);
    }

    #[test]
    fn test_parallel_picks_every_active_child() {
        let root = container(Order::Parallel, vec![clip("a.mp4", 1.0), clip("b.mp4", 3.0)], 3.0);
        let pick = pick_frame(&root, 0.5).unwrap();
        assert_eq!(picked_offsets(&pick), vec![(0, Some(0.5)), (1, Some(0.5))]);
        let pick = pick_frame(&root, 2.0).unwrap();
        assert_eq!(picked_offsets(&pick), vec![(1, Some(2.0))]);
    }

    #[test]
    fn test_preview_seeks_into_video() {
        let root = container(Order::Sequence, vec![clip("a.mp4", 1.0), clip("b.mp4", 2.0)], 3.0);
        let render = RenderContext::new(Resolution::new(100, 100), 10.0);
        let preview = compile_preview(&root, render, 15).unwrap();
        assert_eq!(preview.second, 1.5);
        assert_eq!(preview.graph.inputs().len(), 1);
        assert_eq!(preview.graph.inputs()[0].path, PathBuf::from("b.mp4"));
        assert!(preview.graph.to_filter_complex().contains("trim=start=0.5"));
    }

    #[test]
    fn test_preview_past_end_fails() {
        let root = container(Order::Sequence, vec![clip("a.mp4", 1.0)], 1.0);
        let render = RenderContext::new(Resolution::new(100, 100), 10.0);
        assert!(compile_preview(&root, render, 11).is_err());
        assert!(compile_preview(&root, render, 10).is_ok());
    }
}
