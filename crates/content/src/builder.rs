//! Content tree construction.

use std::path::PathBuf;

use clipweave_common::error::ClipweaveResult;
use clipweave_model::{
    Content, MarkupNode, SourceContent, SourceKind, SourceLocator, Style, WrapContent,
};
use clipweave_style::{MediaProbe, ProbeCache, StyleResolver, TagInfo};

use crate::aggregate::{aggregate_container, fix_up_leaf};
use crate::markup_reader::Document;

/// Builds the resolved content tree in a single recursive walk.
pub struct ContentBuilder {
    resolver: StyleResolver,
    base_dir: PathBuf,
}

impl ContentBuilder {
    pub fn new(resolver: StyleResolver, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            resolver,
            base_dir: base_dir.into(),
        }
    }

    pub fn build(&mut self, root: &MarkupNode) -> ClipweaveResult<Content> {
        let content = self.build_node(root, None, None)?;
        tracing::info!(
            nodes = content.node_count(),
            probed_sources = self.resolver.probes().len(),
            object_length = %content.style().object_length,
            width = %content.style().width,
            height = %content.style().height,
            "Content tree built"
        );
        Ok(content)
    }

    fn build_node<'a>(
        &mut self,
        node: &'a MarkupNode,
        parent_info: Option<&'a TagInfo<'a>>,
        parent_style: Option<&Style>,
    ) -> ClipweaveResult<Content> {
        let info = TagInfo::new(node, parent_info);
        let kind = node.tag.source_kind();
        let source_path = match kind {
            Some(SourceKind::Text) | None => None,
            Some(_) => node.attr("src").map(|src| self.base_dir.join(src)),
        };
        let mut style = self
            .resolver
            .resolve(node, &info, parent_style, source_path.as_deref())?;

        let Some(kind) = kind else {
            let children = node
                .children
                .iter()
                .map(|child| self.build_node(child, Some(&info), Some(&style)))
                .collect::<ClipweaveResult<Vec<_>>>()?;
            let mut wrap = WrapContent::new(node.tag, style);
            for child in children {
                wrap.push(child);
            }
            aggregate_container(&mut wrap);
            return Ok(Content::Wrap(wrap));
        };

        fix_up_leaf(&mut style);
        let locator = match source_path {
            Some(path) => SourceLocator::Path(path),
            None => SourceLocator::Text(node.text.clone().unwrap_or_default()),
        };
        Ok(Content::Source(SourceContent {
            tag: node.tag,
            kind,
            locator,
            style,
        }))
    }
}

/// Build the content tree of a parsed document.
pub fn build_document(document: &Document, probe: Box<dyn MediaProbe>) -> ClipweaveResult<Content> {
    let resolver = StyleResolver::new(
        document.stylesheet.clone(),
        document.context,
        ProbeCache::new(probe),
    );
    ContentBuilder::new(resolver, &document.base_dir).build(&document.root)
}
