//! Per-compile state: the filter graph plus the canvas and source caches.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clipweave_common::error::{ClipweaveError, ClipweaveResult};
use clipweave_model::{Color, GraphicValue, RenderContext, SourceKind, Tag};

use crate::filters;
use crate::graph::{AudioStream, FilterGraph, VideoStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CanvasKey {
    width: i64,
    height: i64,
    color: Color,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SourceKey {
    path: PathBuf,
    kind: SourceKind,
}

/// Unused halves of previous splits, handed out on the next request.
#[derive(Debug, Default)]
struct SourceSpares {
    video: Option<VideoStream>,
    audio: Option<AudioStream>,
}

/// Owns everything one compile writes to. Reused canvases and sources are
/// split from a single generator or input; whatever is left over is sunk
/// by [`CompileContext::finish`].
#[derive(Debug)]
pub struct CompileContext {
    graph: FilterGraph,
    render: RenderContext,
    sample_rate: u32,
    canvases: HashMap<CanvasKey, VideoStream>,
    sources: HashMap<SourceKey, SourceSpares>,
}

impl CompileContext {
    pub fn new(render: RenderContext, sample_rate: u32) -> Self {
        Self {
            graph: FilterGraph::new(),
            render,
            sample_rate,
            canvases: HashMap::new(),
            sources: HashMap::new(),
        }
    }

    pub fn graph(&mut self) -> &mut FilterGraph {
        &mut self.graph
    }

    pub fn render(&self) -> &RenderContext {
        &self.render
    }

    pub fn fps(&self) -> f64 {
        self.render.fps
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// A solid canvas of the given box. Fails when either side is
    /// unresolved or not positive.
    pub fn canvas(
        &mut self,
        width: GraphicValue,
        height: GraphicValue,
        color: Option<Color>,
        tag: Tag,
    ) -> ClipweaveResult<VideoStream> {
        let width = width
            .pixels()
            .ok_or_else(|| ClipweaveError::unresolved(tag.as_str(), "width"))?;
        let height = height
            .pixels()
            .ok_or_else(|| ClipweaveError::unresolved(tag.as_str(), "height"))?;
        if width <= 0 || height <= 0 {
            return Err(ClipweaveError::render(format!(
                "<{tag}> needs a canvas of {width}x{height}, which is empty"
            )));
        }

        let key = CanvasKey {
            width,
            height,
            color: color.unwrap_or(Color::TRANSPARENT),
        };
        let stream = match self.canvases.remove(&key) {
            Some(spare) => spare,
            None => {
                let source = filters::color_source(width, height, key.color, self.render.fps);
                let generated = self.graph.video_source(source);
                self.graph.video(generated, filters::rgba())
            }
        };
        let (canvas, spare) = self.graph.split_video(stream);
        self.canvases.insert(key, spare);
        Ok(canvas)
    }

    /// Streams of a media file. The file is added as an input once; later
    /// requests split from the spare left by the previous one.
    pub fn source(
        &mut self,
        path: &Path,
        kind: SourceKind,
        want_video: bool,
        want_audio: bool,
    ) -> (Option<VideoStream>, Option<AudioStream>) {
        let key = SourceKey {
            path: path.to_path_buf(),
            kind,
        };
        let mut spares = match self.sources.remove(&key) {
            Some(spares) => spares,
            None => {
                let options = match kind {
                    SourceKind::Image => vec![
                        "-loop".to_string(),
                        "1".to_string(),
                        "-framerate".to_string(),
                        crate::graph::number(self.render.fps),
                    ],
                    _ => Vec::new(),
                };
                tracing::debug!(path = %path.display(), ?kind, "Adding input");
                let index = self.graph.add_input(options, path);
                SourceSpares {
                    video: kind.has_video().then(|| self.graph.input_video(index)),
                    audio: want_audio.then(|| self.graph.input_audio(index)),
                }
            }
        };

        let video = match (want_video, spares.video.take()) {
            (true, Some(stream)) => {
                let (taken, spare) = self.graph.split_video(stream);
                spares.video = Some(spare);
                Some(taken)
            }
            (_, stream) => {
                spares.video = stream;
                None
            }
        };
        let audio = match (want_audio, spares.audio.take()) {
            (true, Some(stream)) => {
                let (taken, spare) = self.graph.split_audio(stream);
                spares.audio = Some(spare);
                Some(taken)
            }
            (_, stream) => {
                spares.audio = stream;
                None
            }
        };
        self.sources.insert(key, spares);
        (video, audio)
    }

    /// Sink every spare pad and hand back the finished graph. Spares are
    /// sunk in label order so the graph text is stable.
    pub fn finish(mut self) -> FilterGraph {
        let mut videos: Vec<VideoStream> = self.canvases.drain().map(|(_, spare)| spare).collect();
        let mut audios = Vec::new();
        for (_, spares) in self.sources.drain() {
            videos.extend(spares.video);
            audios.extend(spares.audio);
        }
        videos.sort_by(|a, b| a.label().cmp(b.label()));
        audios.sort_by(|a: &AudioStream, b| a.label().cmp(b.label()));

        let spare_count = videos.len() + audios.len();
        for video in videos {
            self.graph.sink_video(video);
        }
        for audio in audios {
            self.graph.sink_audio(audio);
        }
        tracing::debug!(spares = spare_count, "Sank unused pads");
        self.graph
    }
}
