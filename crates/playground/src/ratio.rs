//! Split ratio engine
//!
//! Owns the percentage of the container given to the editor pane and turns
//! divider drags into ratio updates. Pointer moves are coalesced to one
//! update per frame; candidates outside the allowed band are dropped and
//! the previous ratio stays.

use crate::frame::{FrameSlot, FrameToken};
use ratatui::layout::Rect;
use std::fmt;
use tracing::{debug, trace};

/// Candidates must lie strictly between these bounds
pub const MIN_RATIO: f64 = 20.0;
pub const MAX_RATIO: f64 = 80.0;
pub const MIDPOINT: f64 = 50.0;

/// Editor share of the container's primary axis, in percent
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct SplitRatio(f64);

impl SplitRatio {
    /// `None` unless `MIN_RATIO < percent < MAX_RATIO`
    pub fn new(percent: f64) -> Option<Self> {
        (percent > MIN_RATIO && percent < MAX_RATIO).then_some(SplitRatio(percent))
    }

    pub const fn midpoint() -> Self {
        SplitRatio(MIDPOINT)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Cells of `extent` allotted to the editor
    pub fn share_of(self, extent: u16) -> u16 {
        (f64::from(extent) * self.0 / 100.0).floor() as u16
    }
}

impl Default for SplitRatio {
    fn default() -> Self {
        Self::midpoint()
    }
}

impl fmt::Display for SplitRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0}%", self.0)
    }
}

/// Which way the panes are split
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Side by side; the ratio follows the pointer's column
    Horizontal,
    /// Stacked; the ratio follows the pointer's row
    Vertical,
}

impl Orientation {
    /// Wide terminals split side by side, narrow ones stack
    pub fn for_viewport(width: u16, breakpoint: u16) -> Self {
        if width > breakpoint {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        }
    }

    /// Offset of `pointer` from the container origin along this axis
    pub fn project(self, pointer: PointerSample, container: Rect) -> f64 {
        match self {
            Orientation::Horizontal => f64::from(pointer.column) - f64::from(container.x),
            Orientation::Vertical => f64::from(pointer.row) - f64::from(container.y),
        }
    }

    pub fn extent(self, container: Rect) -> u16 {
        match self {
            Orientation::Horizontal => container.width,
            Orientation::Vertical => container.height,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Orientation::Horizontal => "side-by-side",
            Orientation::Vertical => "stacked",
        }
    }
}

/// A pointer position in terminal cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerSample {
    pub column: u16,
    pub row: u16,
}

impl PointerSample {
    pub fn new(column: u16, row: u16) -> Self {
        Self { column, row }
    }
}

/// Ratio the pointer would produce, or `None` for an empty container
pub fn candidate_ratio(pointer: PointerSample, container: Rect, orientation: Orientation) -> Option<f64> {
    let extent = orientation.extent(container);
    if extent == 0 {
        return None;
    }
    Some(orientation.project(pointer, container) / f64::from(extent) * 100.0)
}

/// Global pointer routing the host must start or stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerCapture {
    Acquire,
    Release,
}

/// Result of a frame that accepted a new ratio
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioUpdate {
    pub previous: SplitRatio,
    pub ratio: SplitRatio,
}

#[derive(Debug, Clone, Copy)]
struct PendingMove {
    pointer: PointerSample,
    container: Rect,
    orientation: Orientation,
}

/// An in-progress divider drag
#[derive(Debug, Default)]
pub struct DragSession {
    pending: FrameSlot<PendingMove>,
}

impl DragSession {
    pub fn pending_token(&self) -> Option<FrameToken> {
        self.pending.pending_token()
    }

    /// Moves that were superseded before their frame fired
    pub fn coalesced_moves(&self) -> u64 {
        self.pending.cancelled_count()
    }
}

#[derive(Debug, Default)]
pub struct LayoutEngine {
    ratio: SplitRatio,
    session: Option<DragSession>,
}

impl LayoutEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ratio(&self) -> SplitRatio {
        self.ratio
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn has_pending_frame(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.pending.is_pending())
    }

    /// Start a drag. A drag already in progress is kept.
    pub fn begin_drag(&mut self) -> PointerCapture {
        if self.session.is_none() {
            debug!(ratio = self.ratio.value(), "divider drag started");
            self.session = Some(DragSession::default());
        }
        PointerCapture::Acquire
    }

    /// Queue a ratio update for the next frame. Ignored outside a drag.
    pub fn on_pointer_move(
        &mut self,
        pointer: PointerSample,
        container: Rect,
        orientation: Orientation,
    ) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        session.pending.schedule(PendingMove {
            pointer,
            container,
            orientation,
        });
        true
    }

    /// Apply the pending move, if any
    pub fn run_frame(&mut self) -> Option<RatioUpdate> {
        let pending = self.session.as_mut()?.pending.take()?;
        let candidate = candidate_ratio(pending.pointer, pending.container, pending.orientation)?;
        match SplitRatio::new(candidate) {
            Some(ratio) => {
                let previous = std::mem::replace(&mut self.ratio, ratio);
                trace!(ratio = ratio.value(), "split ratio updated");
                Some(RatioUpdate { previous, ratio })
            }
            None => {
                trace!(candidate, "split ratio candidate out of range");
                None
            }
        }
    }

    /// Finish the drag, dropping any move that has not been applied
    pub fn end_drag(&mut self) -> Option<PointerCapture> {
        let session = self.session.take()?;
        debug!(
            ratio = self.ratio.value(),
            coalesced = session.coalesced_moves(),
            "divider drag ended"
        );
        Some(PointerCapture::Release)
    }

    pub fn reset_to_midpoint(&mut self) -> SplitRatio {
        self.ratio = SplitRatio::midpoint();
        debug!("split ratio reset");
        self.ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDE: Rect = Rect {
        x: 0,
        y: 0,
        width: 100,
        height: 40,
    };

    fn drag_to(engine: &mut LayoutEngine, column: u16) -> Option<RatioUpdate> {
        engine.on_pointer_move(PointerSample::new(column, 5), WIDE, Orientation::Horizontal);
        engine.run_frame()
    }

    #[test]
    fn test_ratio_band_is_exclusive() {
        assert!(SplitRatio::new(20.0).is_none());
        assert!(SplitRatio::new(80.0).is_none());
        assert!(SplitRatio::new(20.01).is_some());
        assert!(SplitRatio::new(79.99).is_some());
        assert!(SplitRatio::new(f64::NAN).is_none());
    }

    #[test]
    fn test_orientation_breakpoint() {
        assert_eq!(Orientation::for_viewport(81, 80), Orientation::Horizontal);
        assert_eq!(Orientation::for_viewport(80, 80), Orientation::Vertical);
        assert_eq!(Orientation::for_viewport(40, 80), Orientation::Vertical);
    }

    #[test]
    fn test_candidate_uses_container_origin() {
        let container = Rect::new(10, 4, 50, 20);
        let pointer = PointerSample::new(35, 14);
        assert_eq!(
            candidate_ratio(pointer, container, Orientation::Horizontal),
            Some(50.0)
        );
        assert_eq!(
            candidate_ratio(pointer, container, Orientation::Vertical),
            Some(50.0)
        );
        assert_eq!(
            candidate_ratio(pointer, Rect::new(0, 0, 0, 10), Orientation::Horizontal),
            None
        );
    }

    #[test]
    fn test_move_without_drag_ignored() {
        let mut engine = LayoutEngine::new();
        assert!(!engine.on_pointer_move(PointerSample::new(30, 0), WIDE, Orientation::Horizontal));
        assert_eq!(engine.run_frame(), None);
        assert_eq!(engine.ratio(), SplitRatio::midpoint());
    }

    #[test]
    fn test_in_band_drag_applies() {
        let mut engine = LayoutEngine::new();
        assert_eq!(engine.begin_drag(), PointerCapture::Acquire);
        let update = drag_to(&mut engine, 30);
        assert_eq!(
            update,
            Some(RatioUpdate {
                previous: SplitRatio::midpoint(),
                ratio: SplitRatio(30.0),
            })
        );
        assert_eq!(engine.ratio().value(), 30.0);
    }

    #[test]
    fn test_out_of_band_keeps_previous() {
        let mut engine = LayoutEngine::new();
        engine.begin_drag();
        drag_to(&mut engine, 60);
        assert_eq!(drag_to(&mut engine, 20), None);
        assert_eq!(drag_to(&mut engine, 80), None);
        assert_eq!(drag_to(&mut engine, 95), None);
        assert_eq!(engine.ratio().value(), 60.0);
    }

    #[test]
    fn test_moves_coalesce_to_latest() {
        let mut engine = LayoutEngine::new();
        engine.begin_drag();
        for column in [25, 35, 45, 70] {
            engine.on_pointer_move(PointerSample::new(column, 0), WIDE, Orientation::Horizontal);
        }
        assert_eq!(engine.session().map(DragSession::coalesced_moves), Some(3));
        assert_eq!(engine.run_frame().map(|u| u.ratio.value()), Some(70.0));
        assert_eq!(engine.run_frame(), None);
    }

    #[test]
    fn test_end_drag_cancels_pending() {
        let mut engine = LayoutEngine::new();
        engine.begin_drag();
        engine.on_pointer_move(PointerSample::new(30, 0), WIDE, Orientation::Horizontal);
        assert!(engine.has_pending_frame());
        assert_eq!(engine.end_drag(), Some(PointerCapture::Release));
        assert!(!engine.has_pending_frame());
        assert_eq!(engine.run_frame(), None);
        assert_eq!(engine.ratio(), SplitRatio::midpoint());
        assert_eq!(engine.end_drag(), None);
    }

    #[test]
    fn test_reset_ignores_drag_state() {
        let mut engine = LayoutEngine::new();
        engine.begin_drag();
        drag_to(&mut engine, 70);
        assert_eq!(engine.reset_to_midpoint().value(), 50.0);
        assert!(engine.is_dragging());
        engine.end_drag();
        assert_eq!(engine.reset_to_midpoint().value(), 50.0);
    }

    #[test]
    fn test_share_floors() {
        assert_eq!(SplitRatio(33.3).share_of(100), 33);
        assert_eq!(SplitRatio::midpoint().share_of(41), 20);
    }
}
