//! Filter graph intermediate representation.
//!
//! A [`FilterGraph`] collects ffmpeg inputs and filter nodes. Stream handles
//! ([`VideoStream`], [`AudioStream`]) name one output pad each and are
//! consumed by every operation that reads them, so a pad can only ever
//! feed one filter. Fan-out goes through [`FilterGraph::split_video`] and
//! [`FilterGraph::split_audio`].

use std::fmt;
use std::path::{Path, PathBuf};

/// A labelled video pad.
#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub struct VideoStream {
    label: String,
}

/// A labelled audio pad.
#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub struct AudioStream {
    label: String,
}

impl VideoStream {
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl AudioStream {
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// One ffmpeg filter invocation: a name plus positional and named options.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    name: String,
    args: Vec<(Option<String>, String)>,
}

impl Filter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Named option `key=value`.
    pub fn arg(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.args.push((Some(key.into()), value.to_string()));
        self
    }

    /// Positional option.
    pub fn positional(mut self, value: impl fmt::Display) -> Self {
        self.args.push((None, value.to_string()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of the named option `key`, if set.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(k, _)| k.as_deref() == Some(key))
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (i, (key, value)) in self.args.iter().enumerate() {
            f.write_str(if i == 0 { "=" } else { ":" })?;
            if let Some(key) = key {
                write!(f, "{key}=")?;
            }
            f.write_str(&escape_value(value))?;
        }
        Ok(())
    }
}

/// Escape an option value for both the option parser and the graph parser.
pub fn escape_value(value: &str) -> String {
    let mut option_level = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '\'' | ':') {
            option_level.push('\\');
        }
        option_level.push(c);
    }
    let mut graph_level = String::with_capacity(option_level.len());
    for c in option_level.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            graph_level.push('\\');
        }
        graph_level.push(c);
    }
    graph_level
}

/// Format seconds (or any real-valued option) without float noise.
pub fn number(value: f64) -> String {
    let text = format!("{value:.6}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text.is_empty() || text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// One `-i` input and the options that precede it.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSpec {
    pub options: Vec<String>,
    pub path: PathBuf,
}

impl InputSpec {
    /// Command-line arguments for this input.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = self.options.clone();
        args.push("-i".to_string());
        args.push(self.path.display().to_string());
        args
    }
}

#[derive(Debug, Clone, PartialEq)]
struct FilterNode {
    inputs: Vec<String>,
    filter: Filter,
    outputs: Vec<String>,
}

impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for input in &self.inputs {
            write!(f, "[{input}]")?;
        }
        write!(f, "{}", self.filter)?;
        for output in &self.outputs {
            write!(f, "[{output}]")?;
        }
        Ok(())
    }
}

/// Inputs plus an acyclic list of filter nodes.
#[derive(Debug, Default)]
pub struct FilterGraph {
    inputs: Vec<InputSpec>,
    nodes: Vec<FilterNode>,
    next_label: usize,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an input file; returns its input index.
    pub fn add_input(&mut self, options: Vec<String>, path: &Path) -> usize {
        self.inputs.push(InputSpec {
            options,
            path: path.to_path_buf(),
        });
        self.inputs.len() - 1
    }

    pub fn inputs(&self) -> &[InputSpec] {
        &self.inputs
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// First video stream of input `index`.
    pub fn input_video(&self, index: usize) -> VideoStream {
        VideoStream {
            label: format!("{index}:v:0"),
        }
    }

    /// First audio stream of input `index`.
    pub fn input_audio(&self, index: usize) -> AudioStream {
        AudioStream {
            label: format!("{index}:a:0"),
        }
    }

    fn fresh(&mut self, prefix: char) -> String {
        let label = format!("{prefix}{}", self.next_label);
        self.next_label += 1;
        label
    }

    fn push(&mut self, inputs: Vec<String>, filter: Filter, outputs: Vec<String>) {
        self.nodes.push(FilterNode {
            inputs,
            filter,
            outputs,
        });
    }

    /// A generator filter with no inputs, such as `color`.
    pub fn video_source(&mut self, filter: Filter) -> VideoStream {
        let label = self.fresh('v');
        self.push(Vec::new(), filter, vec![label.clone()]);
        VideoStream { label }
    }

    /// A generator filter with no inputs, such as `anullsrc`.
    pub fn audio_source(&mut self, filter: Filter) -> AudioStream {
        let label = self.fresh('a');
        self.push(Vec::new(), filter, vec![label.clone()]);
        AudioStream { label }
    }

    pub fn video(&mut self, input: VideoStream, filter: Filter) -> VideoStream {
        self.video_join(vec![input], filter)
    }

    pub fn audio(&mut self, input: AudioStream, filter: Filter) -> AudioStream {
        self.audio_join(vec![input], filter)
    }

    /// A filter reading several video pads into one, such as `overlay` or
    /// `concat`.
    pub fn video_join(&mut self, inputs: Vec<VideoStream>, filter: Filter) -> VideoStream {
        let label = self.fresh('v');
        let inputs = inputs.into_iter().map(|s| s.label).collect();
        self.push(inputs, filter, vec![label.clone()]);
        VideoStream { label }
    }

    /// A filter reading several audio pads into one, such as `amix`.
    pub fn audio_join(&mut self, inputs: Vec<AudioStream>, filter: Filter) -> AudioStream {
        let label = self.fresh('a');
        let inputs = inputs.into_iter().map(|s| s.label).collect();
        self.push(inputs, filter, vec![label.clone()]);
        AudioStream { label }
    }

    /// Join one video and one audio pad into a single synchronized pair.
    pub fn mux(&mut self, video: VideoStream, audio: AudioStream) -> (VideoStream, AudioStream) {
        let v = self.fresh('v');
        let a = self.fresh('a');
        self.push(
            vec![video.label, audio.label],
            Filter::new("concat").arg("n", 1).arg("v", 1).arg("a", 1),
            vec![v.clone(), a.clone()],
        );
        (VideoStream { label: v }, AudioStream { label: a })
    }

    pub fn split_video(&mut self, input: VideoStream) -> (VideoStream, VideoStream) {
        let first = self.fresh('v');
        let second = self.fresh('v');
        self.push(
            vec![input.label],
            Filter::new("split"),
            vec![first.clone(), second.clone()],
        );
        (VideoStream { label: first }, VideoStream { label: second })
    }

    pub fn split_audio(&mut self, input: AudioStream) -> (AudioStream, AudioStream) {
        let first = self.fresh('a');
        let second = self.fresh('a');
        self.push(
            vec![input.label],
            Filter::new("asplit"),
            vec![first.clone(), second.clone()],
        );
        (AudioStream { label: first }, AudioStream { label: second })
    }

    /// Terminate a video pad nobody reads.
    pub fn sink_video(&mut self, input: VideoStream) {
        self.push(vec![input.label], Filter::new("nullsink"), Vec::new());
    }

    /// Terminate an audio pad nobody reads.
    pub fn sink_audio(&mut self, input: AudioStream) {
        self.push(vec![input.label], Filter::new("anullsink"), Vec::new());
    }

    /// The `-filter_complex` argument.
    pub fn to_filter_complex(&self) -> String {
        self.nodes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(";")
    }

    /// One node per line, for debug reports.
    pub fn to_pretty(&self) -> String {
        self.nodes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(";\n")
    }
}

/// `-map` argument for a pad: filter outputs are bracketed, raw input
/// streams are not.
pub fn map_label(label: &str) -> String {
    if label.contains(':') {
        label.to_string()
    } else {
        format!("[{label}]")
    }
}
