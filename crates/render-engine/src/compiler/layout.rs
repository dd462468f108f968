//! Placement of children inside a container box.

use clipweave_model::{Axis, Style};

/// Offset of a child on its own layer: container padding plus the child's
/// leading margins.
pub fn layered_offset(container: &Style, child: &Style) -> (i64, i64) {
    (
        container.padding.left.pixels_or(0) + child.margin.left.pixels_or(0),
        container.padding.top.pixels_or(0) + child.margin.top.pixels_or(0),
    )
}

/// Cursor that lays single-layer children end to end along the flow axis,
/// collapsing adjacent margins. Reversed flow starts at the far edge and
/// walks back.
#[derive(Debug, Clone)]
pub struct FlowCursor {
    axis: Axis,
    reverse: bool,
    position: i64,
    pending_margin: i64,
    cross_padding: i64,
}

impl FlowCursor {
    pub fn new(container: &Style) -> Self {
        let axis = container.direction.axis();
        let reverse = container.direction.is_reverse();
        let (padding_start, _) = axis.edges_px(&container.padding, false);
        let position = if reverse {
            padding_start + axis.extent(container).pixels_or(0)
        } else {
            padding_start
        };
        let (cross_padding, _) = axis.cross().edges_px(&container.padding, false);
        Self {
            axis,
            reverse,
            position,
            pending_margin: 0,
            cross_padding,
        }
    }

    /// Top-left corner of the next child's padded box.
    pub fn place(&mut self, child: &Style) -> (i64, i64) {
        let (lead, trail) = self.axis.edges_px(&child.margin, self.reverse);
        let gap = lead.max(self.pending_margin);
        let (padding_start, padding_end) = self.axis.edges_px(&child.padding, false);
        let size = padding_start + self.axis.extent(child).pixels_or(0) + padding_end;

        let main = if self.reverse {
            self.position -= gap + size;
            self.position
        } else {
            self.position += gap;
            let at = self.position;
            self.position += size;
            at
        };
        self.pending_margin = trail;

        let (cross_margin, _) = self.axis.cross().edges_px(&child.margin, false);
        let cross = self.cross_padding + cross_margin;
        match self.axis {
            Axis::Horizontal => (main, cross),
            Axis::Vertical => (cross, main),
        }
    }
}
