//! Sequential containers: children play one after another.

use clipweave_common::error::ClipweaveResult;
use clipweave_model::WrapContent;

use super::layout::layered_offset;
use super::{compile_content, Process};
use crate::context::CompileContext;
use crate::filters;
use crate::graph::{AudioStream, VideoStream};

pub(super) fn compile<'a>(
    ctx: &mut CompileContext,
    wrap: &'a WrapContent,
) -> ClipweaveResult<Process<'a>> {
    let style = &wrap.style;
    let background = style.background_color;

    let mut videos: Vec<VideoStream> = Vec::new();
    let mut audios: Vec<AudioStream> = Vec::new();
    // Time a stream has been absent since its last segment.
    let mut video_gap = 0.0;
    let mut audio_gap = 0.0;
    let mut pending_margin = 0.0f64;
    let mut elastic = false;

    for (index, item) in wrap.items.iter().enumerate() {
        let item_style = item.style();
        let lead = item_style.time_margin_start.seconds_or_zero().max(pending_margin);
        pending_margin = item_style.time_margin_end.seconds_or_zero();
        let footprint = lead + item_style.object_length_with_padding().seconds_or_zero();

        let child = compile_content(ctx, item)?;
        match child.video {
            Some(video) => {
                let canvas = ctx.canvas(
                    style.width_with_padding(),
                    style.height_with_padding(),
                    background,
                    wrap.tag,
                )?;
                let (x, y) = layered_offset(style, item_style);
                let placed = ctx
                    .graph()
                    .video_join(vec![canvas, video], filters::overlay_shortest(x, y));
                let gap = video_gap + lead;
                videos.push(if gap > 0.0 {
                    ctx.graph().video(placed, filters::pad_video_start(gap, background))
                } else {
                    placed
                });
                video_gap = 0.0;
            }
            None => video_gap += footprint,
        }
        match child.audio {
            Some(audio) => {
                let gap = audio_gap + lead;
                audios.push(if gap > 0.0 {
                    ctx.graph().audio(audio, filters::delay_audio(gap))
                } else {
                    audio
                });
                audio_gap = 0.0;
            }
            None => audio_gap += footprint,
        }

        if item_style.object_length.is_fit() {
            let discarded = wrap.items.len() - index - 1;
            if discarded > 0 {
                tracing::debug!(
                    tag = %wrap.tag,
                    discarded,
                    "Elastic child ends the sequence; later siblings are dropped"
                );
            }
            elastic = true;
            break;
        }
    }

    let mut process = Process::new(wrap.tag, style);
    process.video = match videos.len() {
        0 => None,
        1 => videos.pop(),
        n => Some(ctx.graph().video_join(videos, filters::concat_video(n))),
    };
    process.audio = match audios.len() {
        0 => None,
        1 => audios.pop(),
        n => Some(ctx.graph().audio_join(audios, filters::concat_audio(n))),
    };

    if elastic {
        process = process.extend(ctx);
    } else {
        let trailing_video = video_gap + pending_margin;
        if trailing_video > 0.0 {
            process.video = process
                .video
                .map(|v| ctx.graph().video(v, filters::pad_video_end(trailing_video, background)));
        }
        let trailing_audio = audio_gap + pending_margin;
        if trailing_audio > 0.0 {
            process.audio = process
                .audio
                .map(|a| ctx.graph().audio(a, filters::pad_audio_end(trailing_audio)));
        }
    }

    // An elastic tail still ends at the container's own declared length.
    Ok(match style.object_length.seconds() {
        Some(length) => process.conform(ctx, length, background),
        None => process,
    })
}
