//! The resolved content tree.
//!
//! Containers ([`WrapContent`]) order their children in time; leaves
//! ([`SourceContent`]) reference media or carry literal text. Every node owns
//! its resolved [`Style`].

use std::path::PathBuf;

use serde::Serialize;

use crate::style::Style;
use crate::tag::{SourceKind, Tag};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "lowercase")]
pub enum Content {
    Wrap(WrapContent),
    Source(SourceContent),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WrapContent {
    pub tag: Tag,
    pub style: Style,
    pub items: Vec<Content>,
    /// Any child carries a video stream.
    pub exist_video: bool,
    /// Any child carries an audio stream.
    pub exist_audio: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceContent {
    pub tag: Tag,
    pub kind: SourceKind,
    pub locator: SourceLocator,
    pub style: Style,
}

/// Where a leaf's media comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceLocator {
    Path(PathBuf),
    Text(String),
}

impl Content {
    pub fn tag(&self) -> Tag {
        match self {
            Content::Wrap(wrap) => wrap.tag,
            Content::Source(source) => source.tag,
        }
    }

    pub fn style(&self) -> &Style {
        match self {
            Content::Wrap(wrap) => &wrap.style,
            Content::Source(source) => &source.style,
        }
    }

    pub fn exist_video(&self) -> bool {
        match self {
            Content::Wrap(wrap) => wrap.exist_video,
            Content::Source(source) => source.kind.has_video(),
        }
    }

    pub fn exist_audio(&self) -> bool {
        match self {
            Content::Wrap(wrap) => wrap.exist_audio,
            Content::Source(source) => source.kind.has_audio(),
        }
    }

    /// Number of nodes in this subtree, including itself.
    pub fn node_count(&self) -> usize {
        match self {
            Content::Wrap(wrap) => 1 + wrap.items.iter().map(Content::node_count).sum::<usize>(),
            Content::Source(_) => 1,
        }
    }
}

impl WrapContent {
    pub fn new(tag: Tag, style: Style) -> Self {
        Self {
            tag,
            style,
            items: Vec::new(),
            exist_video: false,
            exist_audio: false,
        }
    }

    /// Append a child, folding its stream flags into this container.
    pub fn push(&mut self, child: Content) {
        self.exist_video |= child.exist_video();
        self.exist_audio |= child.exist_audio();
        self.items.push(child);
    }
}

impl SourceContent {
    pub fn path(&self) -> Option<&std::path::Path> {
        match &self.locator {
            SourceLocator::Path(path) => Some(path),
            SourceLocator::Text(_) => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.locator {
            SourceLocator::Text(text) => Some(text),
            SourceLocator::Path(_) => None,
        }
    }
}
