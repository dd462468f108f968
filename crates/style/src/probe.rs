//! Media metadata probing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use clipweave_common::error::{ClipweaveError, ClipweaveResult};
use clipweave_model::{AudioSystem, SourceKind, SourceMetadata};
use serde::{Deserialize, Serialize};

/// What the probe reports about one media file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MediaInfo {
    pub duration_secs: Option<f64>,
    pub video: Option<VideoStreamInfo>,
    pub audio: Option<AudioStreamInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VideoStreamInfo {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AudioStreamInfo {
    pub channel_layout: Option<String>,
    pub channels: Option<u32>,
}

impl MediaInfo {
    /// Check the streams a leaf of `kind` requires and convert to the
    /// source fields of its style.
    pub fn source_metadata(&self, kind: SourceKind, path: &Path) -> ClipweaveResult<SourceMetadata> {
        let missing = |what: &str| {
            ClipweaveError::source_probe(path, format!("no {what} found for <{kind:?}> source"))
        };
        match kind {
            SourceKind::Video => {
                self.duration_secs.ok_or_else(|| missing("duration"))?;
                self.video.ok_or_else(|| missing("video stream"))?;
            }
            SourceKind::Audio => {
                self.duration_secs.ok_or_else(|| missing("duration"))?;
                self.audio.as_ref().ok_or_else(|| missing("audio stream"))?;
            }
            SourceKind::Image => {
                self.video.ok_or_else(|| missing("video stream"))?;
            }
            SourceKind::Text => {}
        }

        let audio_system = self.audio.as_ref().and_then(|audio| {
            AudioSystem::from_channel_layout(audio.channel_layout.as_deref(), audio.channels)
        });
        Ok(SourceMetadata {
            duration_secs: match kind {
                SourceKind::Video | SourceKind::Audio => self.duration_secs,
                SourceKind::Image | SourceKind::Text => None,
            },
            width: self.video.map(|v| i64::from(v.width)),
            height: self.video.map(|v| i64::from(v.height)),
            has_audio: self.audio.is_some(),
            audio_system,
        })
    }
}

/// Source of media metadata.
pub trait MediaProbe {
    fn probe(&self, path: &Path) -> ClipweaveResult<MediaInfo>;

    fn name(&self) -> &str;
}

/// Probe backed by the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    binary: String,
}

impl FfprobeProbe {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl MediaProbe for FfprobeProbe {
    fn probe(&self, path: &Path) -> ClipweaveResult<MediaInfo> {
        if !path.exists() {
            return Err(ClipweaveError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let output = Command::new(&self.binary)
            .args(["-v", "error", "-show_format", "-show_streams", "-of", "json"])
            .arg(path)
            .output()
            .map_err(|e| {
                ClipweaveError::source_probe(path, format!("failed to start {}: {e}", self.binary))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ClipweaveError::source_probe(
                path,
                format!("{} exited with {}: {}", self.binary, output.status, stderr.trim()),
            ));
        }

        let raw = String::from_utf8_lossy(&output.stdout);
        parse_ffprobe_json(&raw).map_err(|e| ClipweaveError::source_probe(path, e.to_string()))
    }

    fn name(&self) -> &str {
        "ffprobe"
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    channel_layout: Option<String>,
    channels: Option<u32>,
}

/// Parse `ffprobe -show_format -show_streams -of json` output. The first
/// stream of each type wins.
pub fn parse_ffprobe_json(raw: &str) -> Result<MediaInfo, serde_json::Error> {
    let parsed: FfprobeOutput = serde_json::from_str(raw)?;

    let duration_secs = parsed
        .format
        .duration
        .as_deref()
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0);

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .and_then(|s| match (s.width, s.height) {
            (Some(width), Some(height)) if width > 0 && height > 0 => {
                Some(VideoStreamInfo { width, height })
            }
            _ => None,
        });

    let audio = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .map(|s| AudioStreamInfo {
            channel_layout: s.channel_layout.clone(),
            channels: s.channels,
        });

    Ok(MediaInfo {
        duration_secs,
        video,
        audio,
    })
}

/// Memoizes probe results per source path for one build.
pub struct ProbeCache {
    probe: Box<dyn MediaProbe>,
    entries: HashMap<PathBuf, MediaInfo>,
}

impl ProbeCache {
    pub fn new(probe: Box<dyn MediaProbe>) -> Self {
        Self {
            probe,
            entries: HashMap::new(),
        }
    }

    pub fn get(&mut self, path: &Path) -> ClipweaveResult<MediaInfo> {
        if let Some(info) = self.entries.get(path) {
            return Ok(info.clone());
        }
        tracing::debug!(path = %path.display(), probe = self.probe.name(), "Probing media");
        let info = self.probe.probe(path)?;
        self.entries.insert(path.to_path_buf(), info.clone());
        Ok(info)
    }

    /// Number of distinct paths probed so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
