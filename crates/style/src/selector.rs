//! Selector matching against the ancestor chain.
//!
//! A selector is a whitespace-separated chain of segments (`tag`, `.class`,
//! `#id`). The rightmost segment must match the node itself; the remaining
//! segments must match strict ancestors in order, not necessarily
//! contiguous.

use std::fmt;
use std::str::FromStr;

use clipweave_model::{MarkupNode, Tag};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Tag(String),
    Class(String),
    Id(String),
}

impl Segment {
    fn parse(text: &str) -> Option<Segment> {
        let valid = |name: &str| {
            !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        };
        if let Some(name) = text.strip_prefix('.') {
            valid(name).then(|| Segment::Class(name.to_string()))
        } else if let Some(name) = text.strip_prefix('#') {
            valid(name).then(|| Segment::Id(name.to_string()))
        } else {
            valid(text).then(|| Segment::Tag(text.to_string()))
        }
    }

    pub fn matches(&self, info: &TagInfo<'_>) -> bool {
        match self {
            Segment::Tag(name) => info.tag.as_str() == name,
            Segment::Class(name) => info.classes.iter().any(|class| class == name),
            Segment::Id(name) => info.id == Some(name.as_str()),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Tag(name) => write!(f, "{name}"),
            Segment::Class(name) => write!(f, ".{name}"),
            Segment::Id(name) => write!(f, "#{name}"),
        }
    }
}

/// One selector of a comma-separated selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// Segments from outermost ancestor to the subject.
    segments: Vec<Segment>,
}

impl Selector {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn matches(&self, info: &TagInfo<'_>) -> bool {
        let Some((subject, ancestors)) = self.segments.split_last() else {
            return false;
        };
        if !subject.matches(info) {
            return false;
        }

        let mut remaining = ancestors.len();
        let mut current = info.parent;
        while remaining > 0 {
            let Some(ancestor) = current else {
                break;
            };
            if ancestors[remaining - 1].matches(ancestor) {
                remaining -= 1;
            }
            current = ancestor.parent;
        }
        remaining == 0
    }
}

impl FromStr for Selector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments = s
            .split_whitespace()
            .map(|part| Segment::parse(part).ok_or_else(|| format!("invalid selector `{s}`")))
            .collect::<Result<Vec<_>, _>>()?;
        if segments.is_empty() {
            return Err("empty selector".to_string());
        }
        Ok(Self { segments })
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.segments.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(" "))
    }
}

/// Identity of one element on the path from the root, used only for
/// selector matching.
#[derive(Debug, Clone)]
pub struct TagInfo<'a> {
    pub tag: Tag,
    pub classes: Vec<&'a str>,
    pub id: Option<&'a str>,
    pub parent: Option<&'a TagInfo<'a>>,
}

impl<'a> TagInfo<'a> {
    pub fn new(node: &'a MarkupNode, parent: Option<&'a TagInfo<'a>>) -> Self {
        Self {
            tag: node.tag,
            classes: node.classes(),
            id: node.id(),
            parent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info<'a>(
        tag: Tag,
        classes: &[&'a str],
        id: Option<&'a str>,
        parent: Option<&'a TagInfo<'a>>,
    ) -> TagInfo<'a> {
        TagInfo {
            tag,
            classes: classes.to_vec(),
            id,
            parent,
        }
    }

    #[test]
    fn test_subject_segments() {
        let node = info(Tag::Vid, &["intro"], Some("hero"), None);
        assert!("vid".parse::<Selector>().unwrap().matches(&node));
        assert!(".intro".parse::<Selector>().unwrap().matches(&node));
        assert!("#hero".parse::<Selector>().unwrap().matches(&node));
        assert!(!"aud".parse::<Selector>().unwrap().matches(&node));
        assert!(!".outro".parse::<Selector>().unwrap().matches(&node));
    }

    #[test]
    fn test_descendant_matches_non_contiguous_ancestors() {
        let root = info(Tag::Cont, &[], None, None);
        let scene = info(Tag::Prl, &["scene"], None, Some(&root));
        let group = info(Tag::Seq, &[], None, Some(&scene));
        let leaf = info(Tag::Txt, &[], None, Some(&group));

        assert!("cont txt".parse::<Selector>().unwrap().matches(&leaf));
        assert!("cont .scene txt".parse::<Selector>().unwrap().matches(&leaf));
        assert!(!".scene cont txt".parse::<Selector>().unwrap().matches(&leaf));
    }

    #[test]
    fn test_ancestor_segments_do_not_match_the_subject() {
        let root = info(Tag::Cont, &[], None, None);
        let leaf = info(Tag::Txt, &["title"], None, Some(&root));
        // `.title` names the subject itself, not an ancestor.
        assert!(!".title txt".parse::<Selector>().unwrap().matches(&leaf));
    }

    #[test]
    fn test_invalid_selectors() {
        assert!("".parse::<Selector>().is_err());
        assert!(". vid".parse::<Selector>().is_err());
        assert!("vid>aud".parse::<Selector>().is_err());
    }
}
