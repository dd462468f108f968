//! The closed set of content elements.

use std::fmt;

use serde::Serialize;

/// Element tags that may appear inside the content root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    Cont,
    Wrp,
    Seq,
    Rect,
    Prl,
    Layer,
    Vid,
    Aud,
    Img,
    Txt,
}

/// Kind of leaf media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Video,
    Audio,
    Image,
    Text,
}

impl Tag {
    pub const ALL: [Tag; 10] = [
        Tag::Cont,
        Tag::Wrp,
        Tag::Seq,
        Tag::Rect,
        Tag::Prl,
        Tag::Layer,
        Tag::Vid,
        Tag::Aud,
        Tag::Img,
        Tag::Txt,
    ];

    pub fn from_name(name: &str) -> Option<Tag> {
        Tag::ALL.into_iter().find(|tag| tag.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Cont => "cont",
            Tag::Wrp => "wrp",
            Tag::Seq => "seq",
            Tag::Rect => "rect",
            Tag::Prl => "prl",
            Tag::Layer => "layer",
            Tag::Vid => "vid",
            Tag::Aud => "aud",
            Tag::Img => "img",
            Tag::Txt => "txt",
        }
    }

    /// Leaf kind for source tags, `None` for containers.
    pub fn source_kind(&self) -> Option<SourceKind> {
        match self {
            Tag::Vid => Some(SourceKind::Video),
            Tag::Aud => Some(SourceKind::Audio),
            Tag::Img => Some(SourceKind::Image),
            Tag::Txt => Some(SourceKind::Text),
            _ => None,
        }
    }

    pub fn is_wrap(&self) -> bool {
        self.source_kind().is_none()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SourceKind {
    pub fn has_video(&self) -> bool {
        !matches!(self, SourceKind::Audio)
    }

    pub fn has_audio(&self) -> bool {
        matches!(self, SourceKind::Video | SourceKind::Audio)
    }
}
