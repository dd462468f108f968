//! Post-order aggregation of container length and box size.
//!
//! A container's length is derived from its children only while it is
//! `Fit`, and each box axis only while it is `Auto`.

use clipweave_model::{
    Axis, Content, GraphicValue, LayerMode, Order, Style, TimeValue, WrapContent,
};

/// Fill in the open length and box of `wrap` from its children.
pub fn aggregate_container(wrap: &mut WrapContent) {
    if wrap.style.object_length.is_fit() {
        wrap.style.object_length = match wrap.style.order {
            Order::Sequence => sequence_length(&wrap.items),
            Order::Parallel => parallel_length(&wrap.items),
        };
    }

    if !wrap.exist_video {
        return;
    }
    let flow_axis = catenation_axis(&wrap.style);
    for axis in [Axis::Horizontal, Axis::Vertical] {
        if !axis.extent(&wrap.style).is_auto() {
            continue;
        }
        let size = if flow_axis == Some(axis) {
            catenate(&wrap.items, axis, wrap.style.direction.is_reverse())
        } else {
            pile(&wrap.items, axis)
        };
        match axis {
            Axis::Horizontal => wrap.style.width = size,
            Axis::Vertical => wrap.style.height = size,
        }
    }
}

/// The axis along which children are laid end to end, if any.
pub fn catenation_axis(style: &Style) -> Option<Axis> {
    (style.order == Order::Parallel && style.layer_mode == LayerMode::Single)
        .then(|| style.direction.axis())
}

/// Sum of child footprints with collapsing margins. Any `Fit` child makes
/// the total `Fit`; an empty sequence is `Fit` as well.
pub fn sequence_length(items: &[Content]) -> TimeValue {
    if items.is_empty() {
        return TimeValue::Fit;
    }
    let mut total = 0.0;
    let mut pending_margin = 0.0f64;
    for item in items {
        let style = item.style();
        let Some(length) = style.object_length.seconds() else {
            return TimeValue::Fit;
        };
        total += style.time_margin_start.seconds_or_zero().max(pending_margin)
            + style.time_padding_start.seconds_or_zero()
            + length
            + style.time_padding_end.seconds_or_zero();
        pending_margin = style.time_margin_end.seconds_or_zero();
    }
    TimeValue::Seconds(total + pending_margin)
}

/// Longest child footprint. `Fit` only when every child is `Fit`.
pub fn parallel_length(items: &[Content]) -> TimeValue {
    let all_fit = items
        .iter()
        .all(|item| item.style().object_length.seconds().is_none());
    if all_fit {
        return TimeValue::Fit;
    }
    let longest = items
        .iter()
        .map(|item| {
            let style = item.style();
            style.time_margin_start.seconds_or_zero()
                + style.time_padding_start.seconds_or_zero()
                + style.object_length.seconds_or_zero()
                + style.time_padding_end.seconds_or_zero()
                + style.time_margin_end.seconds_or_zero()
        })
        .fold(0.0, f64::max);
    TimeValue::Seconds(longest)
}

/// Padded extent of a child along `axis`; unresolved sizes count as zero.
fn padded_extent(style: &Style, axis: Axis) -> i64 {
    let (lead, trail) = axis.edges_px(&style.padding, false);
    lead + axis.extent(style).pixels_or(0) + trail
}

/// Lay video children end to end along `axis`, collapsing adjacent
/// margins.
pub fn catenate(items: &[Content], axis: Axis, reverse: bool) -> GraphicValue {
    let mut total = 0;
    let mut pending_margin = 0;
    for item in items.iter().filter(|item| item.exist_video()) {
        let style = item.style();
        let (lead, trail) = axis.edges_px(&style.margin, reverse);
        total += lead.max(pending_margin) + padded_extent(style, axis);
        pending_margin = trail;
    }
    GraphicValue::Pixel(total + pending_margin)
}

/// Stack video children; the largest footprint along `axis` wins.
pub fn pile(items: &[Content], axis: Axis) -> GraphicValue {
    let largest = items
        .iter()
        .filter(|item| item.exist_video())
        .map(|item| {
            let style = item.style();
            let (lead, trail) = axis.edges_px(&style.margin, false);
            lead + padded_extent(style, axis) + trail
        })
        .max()
        .unwrap_or(0);
    GraphicValue::Pixel(largest)
}

/// Give an `Auto` leaf axis its natural size. When only one axis is
/// declared the other keeps the source aspect ratio.
pub fn fix_up_leaf(style: &mut Style) {
    let (Some(source_w), Some(source_h)) = (style.source.width, style.source.height) else {
        return;
    };
    match (style.width.pixels(), style.height.pixels()) {
        (Some(_), Some(_)) => {}
        (Some(w), None) if source_w > 0 => {
            style.height = GraphicValue::Pixel((w * source_h + source_w / 2) / source_w);
        }
        (None, Some(h)) if source_h > 0 => {
            style.width = GraphicValue::Pixel((h * source_w + source_h / 2) / source_h);
        }
        _ => {
            if style.width.is_auto() {
                style.width = GraphicValue::Pixel(source_w);
            }
            if style.height.is_auto() {
                style.height = GraphicValue::Pixel(source_h);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipweave_model::{Direction, Edges, SourceContent, SourceLocator, Tag};
    use proptest::prelude::*;
    use std::path::PathBuf;

    fn leaf(tag: Tag, length: TimeValue) -> Content {
        Content::Source(SourceContent {
            tag,
            kind: tag.source_kind().unwrap(),
            locator: SourceLocator::Path(PathBuf::from("media")),
            style: Style {
                object_length: length,
                ..Style::default()
            },
        })
    }

    fn boxed(width: i64, height: i64, margin: Edges) -> Content {
        Content::Source(SourceContent {
            tag: Tag::Img,
            kind: clipweave_model::SourceKind::Image,
            locator: SourceLocator::Path(PathBuf::from("img.png")),
            style: Style {
                width: GraphicValue::Pixel(width),
                height: GraphicValue::Pixel(height),
                margin,
                ..Style::default()
            },
        })
    }

    fn secs(values: &[f64]) -> Vec<Content> {
        values
            .iter()
            .map(|v| leaf(Tag::Vid, TimeValue::Seconds(*v)))
            .collect()
    }

    #[test]
    fn test_sequence_sums_lengths() {
        assert_eq!(
            sequence_length(&secs(&[2.0, 3.0, 1.0])),
            TimeValue::Seconds(6.0)
        );
    }

    #[test]
    fn test_sequence_with_fit_child_is_fit() {
        let items = vec![
            leaf(Tag::Vid, TimeValue::Seconds(2.0)),
            leaf(Tag::Img, TimeValue::Fit),
            leaf(Tag::Vid, TimeValue::Seconds(1.0)),
        ];
        assert_eq!(sequence_length(&items), TimeValue::Fit);
        assert_eq!(sequence_length(&[]), TimeValue::Fit);
    }

    #[test]
    fn test_parallel_takes_longest() {
        assert_eq!(
            parallel_length(&secs(&[2.0, 5.0, 3.0])),
            TimeValue::Seconds(5.0)
        );
        let items = vec![leaf(Tag::Img, TimeValue::Fit), leaf(Tag::Vid, TimeValue::Seconds(2.0))];
        assert_eq!(parallel_length(&items), TimeValue::Seconds(2.0));
        let all_fit = vec![leaf(Tag::Img, TimeValue::Fit), leaf(Tag::Txt, TimeValue::Fit)];
        assert_eq!(parallel_length(&all_fit), TimeValue::Fit);
    }

    #[test]
    fn test_margins_collapse() {
        let mut items = secs(&[1.0, 1.0]);
        if let Content::Source(first) = &mut items[0] {
            first.style.time_margin_end = TimeValue::Seconds(2.0);
        }
        if let Content::Source(second) = &mut items[1] {
            second.style.time_margin_start = TimeValue::Seconds(3.0);
            second.style.time_margin_end = TimeValue::Seconds(0.5);
        }
        // 1 + max(2, 3) + 1 + trailing 0.5
        assert_eq!(sequence_length(&items), TimeValue::Seconds(5.5));
    }

    #[test]
    fn test_single_layer_catenates_along_flow() {
        let px = GraphicValue::Pixel;
        let margin = Edges {
            top: px(0),
            right: px(10),
            bottom: px(0),
            left: px(4),
        };
        let mut wrap = WrapContent::new(
            Tag::Layer,
            Style {
                order: Order::Parallel,
                layer_mode: LayerMode::Single,
                direction: Direction::Row,
                object_length: TimeValue::Seconds(1.0),
                ..Style::default()
            },
        );
        wrap.push(boxed(100, 50, margin));
        wrap.push(boxed(200, 80, margin));
        aggregate_container(&mut wrap);
        // 4 + 100 + max(10, 4) + 200 + 10
        assert_eq!(wrap.style.width, px(324));
        assert_eq!(wrap.style.height, px(80));
    }

    #[test]
    fn test_multi_layer_piles() {
        let mut wrap = WrapContent::new(
            Tag::Prl,
            Style {
                order: Order::Parallel,
                ..Style::default()
            },
        );
        wrap.push(boxed(100, 50, Edges::ZERO));
        wrap.push(boxed(80, 90, Edges::ZERO));
        wrap.push(leaf(Tag::Aud, TimeValue::Seconds(9.0)));
        aggregate_container(&mut wrap);
        assert_eq!(wrap.style.width, GraphicValue::Pixel(100));
        assert_eq!(wrap.style.height, GraphicValue::Pixel(90));
        assert_eq!(wrap.style.object_length, TimeValue::Seconds(9.0));
    }

    #[test]
    fn test_declared_dimensions_are_kept() {
        let mut wrap = WrapContent::new(
            Tag::Seq,
            Style {
                object_length: TimeValue::Seconds(10.0),
                width: GraphicValue::Pixel(640),
                ..Style::default()
            },
        );
        wrap.push(boxed(100, 50, Edges::ZERO));
        wrap.push(leaf(Tag::Vid, TimeValue::Seconds(3.0)));
        aggregate_container(&mut wrap);
        assert_eq!(wrap.style.object_length, TimeValue::Seconds(10.0));
        assert_eq!(wrap.style.width, GraphicValue::Pixel(640));
        assert_eq!(wrap.style.height, GraphicValue::Pixel(50));
    }

    #[test]
    fn test_audio_only_container_keeps_auto_box() {
        let mut wrap = WrapContent::new(Tag::Seq, Style::default());
        wrap.push(leaf(Tag::Aud, TimeValue::Seconds(3.0)));
        aggregate_container(&mut wrap);
        assert!(wrap.style.width.is_auto());
        assert_eq!(wrap.style.object_length, TimeValue::Seconds(3.0));
    }

    #[test]
    fn test_leaf_fix_up_keeps_aspect() {
        let mut style = Style::default();
        style.source.width = Some(1920);
        style.source.height = Some(1080);
        style.width = GraphicValue::Pixel(640);
        fix_up_leaf(&mut style);
        assert_eq!(style.height, GraphicValue::Pixel(360));

        let mut natural = Style::default();
        natural.source.width = Some(300);
        natural.source.height = Some(200);
        fix_up_leaf(&mut natural);
        assert_eq!(
            (natural.width, natural.height),
            (GraphicValue::Pixel(300), GraphicValue::Pixel(200))
        );
    }

    proptest! {
        #[test]
        fn prop_parallel_never_exceeds_sequence(lengths in prop::collection::vec(0.0f64..100.0, 1..8)) {
            let items = secs(&lengths);
            let seq = sequence_length(&items).seconds().unwrap();
            let prl = parallel_length(&items).seconds().unwrap();
            prop_assert!(prl <= seq + 1e-9);
        }

        #[test]
        fn prop_catenation_at_least_pile(widths in prop::collection::vec(1i64..500, 1..6)) {
            let items: Vec<Content> = widths.iter().map(|w| boxed(*w, 10, Edges::ZERO)).collect();
            let sum = catenate(&items, Axis::Horizontal, false).pixels().unwrap();
            let max = pile(&items, Axis::Horizontal).pixels().unwrap();
            prop_assert_eq!(sum, widths.iter().sum::<i64>());
            prop_assert!(sum >= max);
        }
    }
}
