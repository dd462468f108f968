//! The style cascade.
//!
//! For one node, in order: inheritable fields are copied from the parent,
//! tag defaults are applied, probed source metadata is injected, matching
//! stylesheet declarations are applied in insertion order, inline
//! declarations follow, tag-specific attributes come last, and the result
//! is resolved against the parent and the render context.

use std::path::Path;

use clipweave_common::error::{ClipweaveError, ClipweaveResult};
use clipweave_model::{
    Color, Direction, Edges, GraphicValue, LayerMode, MarkupNode, Order, RenderContext,
    SourceKind, SourceMetadata, Style, Tag, TimeValue,
};

use crate::probe::ProbeCache;
use crate::property::apply_declaration;
use crate::selector::TagInfo;
use crate::stylesheet::{parse_inline, Declaration, Stylesheet};

const DEFAULT_FONT_SIZE_PX: i64 = 30;

/// Mutable style record scoped to a single node's resolution.
#[derive(Debug, Clone)]
pub struct StyleBuilder {
    tag: Tag,
    style: Style,
    text: Option<String>,
}

impl StyleBuilder {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            style: Style::default(),
            text: None,
        }
    }

    /// Copy the inheritable audio and font fields from the parent.
    pub fn inherit(&mut self, parent: &Style) -> &mut Self {
        let style = &mut self.style;
        style.audio_volume = parent.audio_volume;
        style.audio_system = parent.audio_system.or(style.audio_system);
        style.font_family = parent.font_family.clone().or(style.font_family.take());
        style.font_size = parent.font_size.or(style.font_size);
        style.font_color = parent.font_color.or(style.font_color);
        style.font_border_color = parent.font_border_color.or(style.font_border_color);
        style.font_border_width = parent.font_border_width.or(style.font_border_width);
        style.font_weight = parent.font_weight.or(style.font_weight);
        style.font_style = parent.font_style.or(style.font_style);
        self
    }

    pub fn apply_tag_defaults(&mut self) -> &mut Self {
        let style = &mut self.style;
        let (order, layer_mode) = match self.tag {
            Tag::Cont | Tag::Wrp | Tag::Seq | Tag::Rect => (Order::Sequence, LayerMode::Multi),
            Tag::Prl => (Order::Parallel, LayerMode::Multi),
            Tag::Layer => (Order::Parallel, LayerMode::Single),
            Tag::Vid | Tag::Aud | Tag::Img | Tag::Txt => (Order::Sequence, LayerMode::Multi),
        };
        style.order = order;
        style.layer_mode = layer_mode;
        style.direction = Direction::Row;

        match self.tag {
            Tag::Vid | Tag::Aud => style.object_length = TimeValue::Source,
            Tag::Txt => {
                style.font_color.get_or_insert(Color::WHITE);
                style
                    .font_size
                    .get_or_insert(GraphicValue::Pixel(DEFAULT_FONT_SIZE_PX));
            }
            _ => {}
        }
        self
    }

    pub fn with_source(&mut self, source: SourceMetadata) -> &mut Self {
        self.style.source = source;
        self
    }

    /// Apply one declaration. A value failing its grammar is dropped and
    /// the field keeps its previous value.
    pub fn declare(&mut self, declaration: &Declaration) -> &mut Self {
        if let Err(err) = apply_declaration(&mut self.style, declaration) {
            tracing::debug!(
                tag = %self.tag,
                property = %declaration.property,
                value = %declaration.value,
                error = %err,
                "Dropping style declaration"
            );
        }
        self
    }

    /// Tag-specific attributes: `rect color` and the text body of `txt`.
    pub fn apply_attributes(&mut self, node: &MarkupNode) -> &mut Self {
        match self.tag {
            Tag::Rect => {
                if let Some(raw) = node.attr("color") {
                    match raw.parse::<Color>() {
                        Ok(color) => self.style.background_color = Some(color),
                        Err(err) => tracing::debug!(
                            value = raw,
                            error = %err,
                            "Dropping rect color attribute"
                        ),
                    }
                }
            }
            Tag::Txt => self.text = Some(node.text.clone().unwrap_or_default()),
            _ => {}
        }
        self
    }

    /// Resolve every unit against the parent and the render context.
    ///
    /// The root resolves its box against the output resolution. Time
    /// margins and paddings and box margins and paddings that cannot be
    /// resolved count as zero.
    pub fn freeze(self, parent: Option<&Style>, context: &RenderContext) -> Style {
        let StyleBuilder { tag, mut style, text } = self;
        let root = context.resolution;
        let fps = context.fps;

        let parent_length = parent.and_then(|p| p.object_length.seconds());
        let (parent_width, parent_height) = match parent {
            Some(p) => (p.width.pixels(), p.height.pixels()),
            None => (Some(i64::from(root.width)), Some(i64::from(root.height))),
        };

        let span = |value: TimeValue| match value.resolve(parent_length, None, fps) {
            resolved @ TimeValue::Seconds(_) => resolved,
            _ => TimeValue::ZERO,
        };
        style.object_length = style
            .object_length
            .resolve(parent_length, style.source.duration_secs, fps);
        style.time_margin_start = span(style.time_margin_start);
        style.time_margin_end = span(style.time_margin_end);
        style.time_padding_start = span(style.time_padding_start);
        style.time_padding_end = span(style.time_padding_end);

        style.font_size = style
            .font_size
            .map(|size| size.resolve(parent_height, None, root));
        if let (Tag::Txt, Some(text)) = (tag, text.as_deref()) {
            if let Some((width, height)) = measure_text(text, &style) {
                style.source.width = Some(width);
                style.source.height = Some(height);
            }
        }

        style.width = style.width.resolve(parent_width, style.source.width, root);
        style.height = style
            .height
            .resolve(parent_height, style.source.height, root);
        style.margin = resolve_edges(style.margin, parent_width, parent_height, context);
        style.padding = resolve_edges(style.padding, parent_width, parent_height, context);
        style
    }
}

fn resolve_edges(
    edges: Edges,
    parent_width: Option<i64>,
    parent_height: Option<i64>,
    context: &RenderContext,
) -> Edges {
    let resolve = |value: GraphicValue, parent: Option<i64>| {
        match value.resolve(parent, None, context.resolution) {
            resolved @ GraphicValue::Pixel(_) => resolved,
            _ => GraphicValue::ZERO,
        }
    };
    Edges {
        top: resolve(edges.top, parent_height),
        right: resolve(edges.right, parent_width),
        bottom: resolve(edges.bottom, parent_height),
        left: resolve(edges.left, parent_width),
    }
}

/// Natural box of a text body: the widest line and the line count, each
/// times the font size, plus the border on both sides.
fn measure_text(text: &str, style: &Style) -> Option<(i64, i64)> {
    let font_px = style.font_size?.pixels()?;
    let border = style.font_border_width.unwrap_or(0).max(0) * 2;
    let lines: Vec<&str> = text.split('\n').collect();
    let widest = lines.iter().map(|line| line.chars().count()).max().unwrap_or(0) as i64;
    Some((
        widest * font_px + border,
        lines.len() as i64 * font_px + border,
    ))
}

/// Resolves one [`Style`] per node for a whole document.
pub struct StyleResolver {
    stylesheet: Stylesheet,
    context: RenderContext,
    probes: ProbeCache,
}

impl StyleResolver {
    pub fn new(stylesheet: Stylesheet, context: RenderContext, probes: ProbeCache) -> Self {
        Self {
            stylesheet,
            context,
            probes,
        }
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    pub fn stylesheet(&self) -> &Stylesheet {
        &self.stylesheet
    }

    pub fn probes(&self) -> &ProbeCache {
        &self.probes
    }

    /// Resolve the style of `node`. `source_path` is the already-located
    /// media file of a `vid`, `aud` or `img` leaf.
    pub fn resolve(
        &mut self,
        node: &MarkupNode,
        info: &TagInfo<'_>,
        parent: Option<&Style>,
        source_path: Option<&Path>,
    ) -> ClipweaveResult<Style> {
        let mut builder = StyleBuilder::new(node.tag);
        if let Some(parent) = parent {
            builder.inherit(parent);
        }
        builder.apply_tag_defaults();

        match (node.tag.source_kind(), source_path) {
            (Some(SourceKind::Text), _) | (None, _) => {}
            (Some(kind), Some(path)) => {
                let media = self.probes.get(path)?;
                builder.with_source(media.source_metadata(kind, path)?);
            }
            (Some(_), None) => {
                return Err(ClipweaveError::schema(format!(
                    "<{}> requires a `src` attribute",
                    node.tag
                )));
            }
        }

        for declaration in self.stylesheet.matching_declarations(info) {
            builder.declare(declaration);
        }
        if let Some(inline) = node.attr("style") {
            for declaration in parse_inline(inline) {
                builder.declare(&declaration);
            }
        }
        builder.apply_attributes(node);

        Ok(builder.freeze(parent, &self.context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{AudioStreamInfo, MediaInfo, MediaProbe, VideoStreamInfo};
    use clipweave_model::{AudioSystem, Resolution};
    use std::collections::HashMap;
    use std::path::PathBuf;

    struct StaticProbe(HashMap<PathBuf, MediaInfo>);

    impl MediaProbe for StaticProbe {
        fn probe(&self, path: &Path) -> ClipweaveResult<MediaInfo> {
            self.0.get(path).cloned().ok_or_else(|| {
                ClipweaveError::source_probe(path, "unknown test media")
            })
        }

        fn name(&self) -> &str {
            "static"
        }
    }

    fn resolver(sheet: &str) -> StyleResolver {
        let mut media = HashMap::new();
        media.insert(
            PathBuf::from("clip.mp4"),
            MediaInfo {
                duration_secs: Some(4.0),
                video: Some(VideoStreamInfo {
                    width: 640,
                    height: 360,
                }),
                audio: Some(AudioStreamInfo {
                    channel_layout: Some("mono".to_string()),
                    channels: Some(1),
                }),
            },
        );
        StyleResolver::new(
            Stylesheet::parse(sheet).unwrap(),
            RenderContext::new(Resolution::new(1920, 1080), 30.0),
            ProbeCache::new(Box::new(StaticProbe(media))),
        )
    }

    fn resolve(
        resolver: &mut StyleResolver,
        node: &MarkupNode,
        parent: Option<(&TagInfo<'_>, &Style)>,
    ) -> Style {
        let info = TagInfo::new(node, parent.map(|(info, _)| info));
        let path = node.attr("src").map(Path::new);
        resolver
            .resolve(node, &info, parent.map(|(_, style)| style), path)
            .unwrap()
    }

    #[test]
    fn test_insertion_order_beats_specificity() {
        let mut r = resolver("seq { width: 100px } .c { width: 200px }");
        let node = MarkupNode::new(Tag::Seq).with_attr("class", "c");
        assert_eq!(resolve(&mut r, &node, None).width, GraphicValue::Pixel(200));

        let mut r = resolver(".c { width: 200px } seq { width: 100px }");
        assert_eq!(resolve(&mut r, &node, None).width, GraphicValue::Pixel(100));
    }

    #[test]
    fn test_inline_wins_last() {
        let mut r = resolver("#x { width: 100px }");
        let node = MarkupNode::new(Tag::Seq)
            .with_attr("id", "x")
            .with_attr("style", "width: 50px");
        assert_eq!(resolve(&mut r, &node, None).width, GraphicValue::Pixel(50));
    }

    #[test]
    fn test_invalid_declaration_keeps_default() {
        let mut r = resolver("seq { order: sideways; direction: column }");
        let style = resolve(&mut r, &MarkupNode::new(Tag::Seq), None);
        assert_eq!(style.order, Order::Sequence);
        assert_eq!(style.direction, Direction::Column);
    }

    #[test]
    fn test_audio_system_inherits_and_grandchild_overrides() {
        let mut r = resolver(".mono { audio-system: monaural }");
        let root_node = MarkupNode::new(Tag::Cont).with_attr("style", "audio-system: stereo");
        let child_node = MarkupNode::new(Tag::Seq);
        let grandchild_node = MarkupNode::new(Tag::Prl).with_attr("class", "mono");
        let leaf_node = MarkupNode::new(Tag::Seq);

        let root_info = TagInfo::new(&root_node, None);
        let root = resolve(&mut r, &root_node, None);
        assert_eq!(root.audio_system, Some(AudioSystem::Stereo));

        let child_info = TagInfo::new(&child_node, Some(&root_info));
        let child = resolve(&mut r, &child_node, Some((&root_info, &root)));
        assert_eq!(child.audio_system, Some(AudioSystem::Stereo));

        let grandchild_info = TagInfo::new(&grandchild_node, Some(&child_info));
        let grandchild = resolve(&mut r, &grandchild_node, Some((&child_info, &child)));
        assert_eq!(grandchild.audio_system, Some(AudioSystem::Monaural));

        let leaf = resolve(&mut r, &leaf_node, Some((&grandchild_info, &grandchild)));
        assert_eq!(leaf.audio_system, Some(AudioSystem::Monaural));
    }

    #[test]
    fn test_non_inheritable_fields_reset() {
        let mut r = resolver("");
        let parent = Style {
            width: GraphicValue::Pixel(300),
            background_color: Some(Color::BLACK),
            order: Order::Parallel,
            ..Style::default()
        };
        let node = MarkupNode::new(Tag::Seq);
        let info = TagInfo::new(&node, None);
        let style = r.resolve(&node, &info, Some(&parent), None).unwrap();
        assert_eq!(style.width, GraphicValue::Auto);
        assert_eq!(style.background_color, None);
        assert_eq!(style.order, Order::Sequence);
    }

    #[test]
    fn test_tag_defaults() {
        let mut r = resolver("");
        let layer = resolve(&mut r, &MarkupNode::new(Tag::Layer), None);
        assert_eq!(
            (layer.order, layer.layer_mode),
            (Order::Parallel, LayerMode::Single)
        );
        let prl = resolve(&mut r, &MarkupNode::new(Tag::Prl), None);
        assert_eq!((prl.order, prl.layer_mode), (Order::Parallel, LayerMode::Multi));
        let txt = resolve(&mut r, &MarkupNode::new(Tag::Txt).with_text("hi"), None);
        assert_eq!(txt.font_color, Some(Color::WHITE));
        assert_eq!(txt.font_size, Some(GraphicValue::Pixel(30)));
    }

    #[test]
    fn test_probe_injection_and_source_length() {
        let mut r = resolver("");
        let node = MarkupNode::new(Tag::Vid).with_attr("src", "clip.mp4");
        let style = resolve(&mut r, &node, None);
        assert_eq!(style.object_length, TimeValue::Seconds(4.0));
        assert_eq!(style.source.width, Some(640));
        assert_eq!(style.source.audio_system, Some(AudioSystem::Monaural));
    }

    #[test]
    fn test_missing_media_is_fatal() {
        let mut r = resolver("");
        let node = MarkupNode::new(Tag::Aud).with_attr("src", "missing.wav");
        let info = TagInfo::new(&node, None);
        assert!(r
            .resolve(&node, &info, None, Some(Path::new("missing.wav")))
            .is_err());
    }

    #[test]
    fn test_percent_against_parent_and_root() {
        let mut r = resolver("seq { width: 50%; height: 10rh; margin: 10% }");
        let parent = Style {
            width: GraphicValue::Pixel(301),
            height: GraphicValue::Auto,
            object_length: TimeValue::Seconds(10.0),
            ..Style::default()
        };
        let node = MarkupNode::new(Tag::Seq).with_attr("style", "time-margin-start: 20%");
        let info = TagInfo::new(&node, None);
        let style = r.resolve(&node, &info, Some(&parent), None).unwrap();
        assert_eq!(style.width, GraphicValue::Pixel(151));
        assert_eq!(style.height, GraphicValue::Pixel(108));
        assert_eq!(style.margin.left, GraphicValue::Pixel(30));
        assert_eq!(style.margin.top, GraphicValue::ZERO);
        assert_eq!(style.time_margin_start, TimeValue::Seconds(2.0));

        let root = resolve(&mut r, &MarkupNode::new(Tag::Seq), None);
        assert_eq!(root.width, GraphicValue::Pixel(960));
    }

    #[test]
    fn test_frames_normalized_to_seconds() {
        let mut r = resolver("seq { object-length: 45f; time-padding: 15f }");
        let style = resolve(&mut r, &MarkupNode::new(Tag::Seq), None);
        assert_eq!(style.object_length, TimeValue::Seconds(1.5));
        assert_eq!(style.time_padding_end, TimeValue::Seconds(0.5));
    }

    #[test]
    fn test_text_measurement() {
        let mut r = resolver("txt { font-size: 20px; font-border: black 2px }");
        let node = MarkupNode::new(Tag::Txt).with_text("hello\nhi");
        let style = resolve(&mut r, &node, None);
        assert_eq!(style.source.width, Some(5 * 20 + 4));
        assert_eq!(style.source.height, Some(2 * 20 + 4));
    }

    #[test]
    fn test_rect_color_attribute() {
        let mut r = resolver("rect { background-color: red }");
        let node = MarkupNode::new(Tag::Rect).with_attr("color", "#00f");
        let style = resolve(&mut r, &node, None);
        assert_eq!(style.background_color, Some(Color::rgba(0, 0, 255, 255)));
    }
}
