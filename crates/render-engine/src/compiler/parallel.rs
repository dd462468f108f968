//! Parallel containers: children play at the same time, layered over a
//! background canvas.

use clipweave_common::error::ClipweaveResult;
use clipweave_model::{LayerMode, WrapContent};

use super::layout::{layered_offset, FlowCursor};
use super::{compile_content, Process};
use crate::context::CompileContext;
use crate::filters;

pub(super) fn compile<'a>(
    ctx: &mut CompileContext,
    wrap: &'a WrapContent,
) -> ClipweaveResult<Process<'a>> {
    let style = &wrap.style;
    let length = style.object_length.seconds();

    let mut video = if wrap.exist_video {
        let canvas = ctx.canvas(
            style.width_with_padding(),
            style.height_with_padding(),
            style.background_color,
            wrap.tag,
        )?;
        Some(match length {
            Some(length) => ctx.graph().video(canvas, filters::trim_video(length)),
            None => canvas,
        })
    } else {
        None
    };

    let mut cursor = FlowCursor::new(style);
    let mut tracks = Vec::new();
    for item in &wrap.items {
        let item_style = item.style();
        let child = compile_content(ctx, item)?.delay(
            ctx,
            item_style.time_margin_start.seconds_or_zero(),
            None,
        );
        let child = if item_style.object_length.is_fit() {
            child
        } else {
            child.append(ctx, item_style.time_margin_end.seconds_or_zero(), None)
        };

        if let Some(layer) = child.video {
            let (x, y) = match style.layer_mode {
                LayerMode::Single => cursor.place(item_style),
                LayerMode::Multi => layered_offset(style, item_style),
            };
            video = Some(match video.take() {
                Some(base) => ctx
                    .graph()
                    .video_join(vec![base, layer], filters::overlay_pass(x, y)),
                None => layer,
            });
        }
        if let Some(track) = child.audio {
            tracks.push(track);
        }
    }

    let mut process = Process::new(wrap.tag, style);
    process.video = video;
    process.audio = match tracks.len() {
        0 => None,
        1 => tracks.pop(),
        n => Some(ctx.graph().audio_join(tracks, filters::mix(n))),
    };
    process.audio = process.audio.map(|audio| match length {
        Some(length) => {
            let padded = ctx.graph().audio(audio, filters::pad_audio_whole(length));
            ctx.graph().audio(padded, filters::trim_audio(length))
        }
        None => ctx.graph().audio(audio, filters::extend_audio()),
    });
    Ok(process)
}
