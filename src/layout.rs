//! Front page geometry: which story goes where, and how far the page shrinks.

use std::ops::Range;

use crate::api::Article;

/// Smallest scale factor handed out for degenerate viewport widths.
pub const MIN_SCALE: f64 = 0.01;

/// Named regions of the front page, in layout order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    CenterSpread,
    LeftSidebar,
    SidebarSpread,
    Bottom,
    Mini,
    Mini2,
    Mini3,
}

impl Slot {
    pub const ALL: [Slot; 7] = [
        Slot::CenterSpread,
        Slot::LeftSidebar,
        Slot::SidebarSpread,
        Slot::Bottom,
        Slot::Mini,
        Slot::Mini2,
        Slot::Mini3,
    ];

    /// Story indices owned by this slot.
    pub const fn range(self) -> Range<usize> {
        match self {
            Slot::CenterSpread => 0..2,
            Slot::LeftSidebar => 2..6,
            Slot::SidebarSpread => 6..9,
            Slot::Bottom => 9..12,
            Slot::Mini => 12..16,
            Slot::Mini2 => 16..21,
            Slot::Mini3 => 21..25,
        }
    }

    pub const fn capacity(self) -> usize {
        let range = self.range();
        range.end - range.start
    }

    pub const fn name(self) -> &'static str {
        match self {
            Slot::CenterSpread => "center-spread",
            Slot::LeftSidebar => "left-sidebar",
            Slot::SidebarSpread => "sidebar-spread",
            Slot::Bottom => "bottom",
            Slot::Mini => "mini",
            Slot::Mini2 => "mini2",
            Slot::Mini3 => "mini3",
        }
    }
}

/// Total number of story positions on the page.
pub const PAGE_CAPACITY: usize = Slot::Mini3.range().end;

/// Stories split into slots. Borrowed from the story list it was built from.
#[derive(Debug, Clone, Copy)]
pub struct SlotAssignment<'a> {
    stories: &'a [Article],
}

/// Split `stories` into the fixed page slots by position.
///
/// Stories past the last slot are dropped; a short list leaves trailing
/// positions empty.
pub fn partition(stories: &[Article]) -> SlotAssignment<'_> {
    let covered = stories.len().min(PAGE_CAPACITY);
    SlotAssignment {
        stories: &stories[..covered],
    }
}

impl<'a> SlotAssignment<'a> {
    /// Populated stories of a slot.
    pub fn get(&self, slot: Slot) -> &'a [Article] {
        let range = slot.range();
        let start = range.start.min(self.stories.len());
        let end = range.end.min(self.stories.len());
        &self.stories[start..end]
    }

    /// Every position of a slot, `None` where no story reached it.
    pub fn positions(&self, slot: Slot) -> impl Iterator<Item = Option<&'a Article>> + 'a {
        let stories = self.stories;
        slot.range().map(move |i| stories.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Slot, &'a [Article])> + '_ {
        Slot::ALL.into_iter().map(move |slot| (slot, self.get(slot)))
    }

    /// Number of stories placed on the page.
    pub fn len(&self) -> usize {
        self.stories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }
}

/// Uniform shrink factor that keeps the fixed-width page inside the viewport.
///
/// Never exceeds 1; `margin` leaves a symmetric gutter below the design width.
pub fn compute_scale(viewport_width: f64, base_width: f64, margin: f64) -> f64 {
    let factor = viewport_width / base_width * margin;
    if factor.is_nan() || factor <= 0.0 {
        return MIN_SCALE;
    }
    factor.clamp(MIN_SCALE, 1.0)
}

/// `compute_scale` bound to a configured design width and margin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaler {
    pub base_width: f64,
    pub margin: f64,
}

impl Default for Scaler {
    fn default() -> Self {
        Self {
            base_width: 1200.0,
            margin: 0.96,
        }
    }
}

impl Scaler {
    pub fn scale(&self, viewport_width: f64) -> f64 {
        compute_scale(viewport_width, self.base_width, self.margin)
    }
}
