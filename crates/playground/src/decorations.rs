//! End-of-buffer marker
//!
//! Keeps exactly one "line-marker" decoration on the editor, anchored where
//! the next character of the last line would go. Buffer edits schedule a
//! recomputation for the next frame; several edits inside one frame
//! collapse into a single recomputation against the latest content.

use crate::editor::{Anchor, BufferSnapshot, Decoration, DecorationId, EditorSurface};
use crate::frame::FrameSlot;
use tracing::trace;

pub const MARKER_CLASS: &str = "line-marker";

/// Where the marker goes for `snapshot`.
///
/// A blank (empty or whitespace-only) last line anchors at column 1;
/// otherwise one column past its last character.
pub fn marker_position(snapshot: &BufferSnapshot) -> Anchor {
    let line = snapshot.lines().len().max(1);
    let last = snapshot.last_line().unwrap_or("");
    if last.trim().is_empty() {
        Anchor::new(line, 1)
    } else {
        Anchor::new(line, last.chars().count() + 1)
    }
}

#[derive(Debug, Default)]
pub struct DecorationSync {
    pending: FrameSlot<()>,
    current: Vec<DecorationId>,
    anchor: Option<Anchor>,
    recomputations: u64,
}

impl DecorationSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the marker once when the editor appears
    pub fn on_mount(&mut self, surface: &mut impl EditorSurface) -> Option<Anchor> {
        self.recompute_marker(surface)
    }

    /// Note a content change; the marker follows on the next frame
    pub fn on_buffer_changed(&mut self) {
        self.pending.schedule(());
    }

    /// Fire the pending recomputation, if any
    pub fn run_frame(&mut self, surface: &mut impl EditorSurface) -> Option<Anchor> {
        self.pending.take()?;
        self.recompute_marker(surface)
    }

    /// Replace the marker from the current content. Does nothing while the
    /// surface has no model.
    pub fn recompute_marker(&mut self, surface: &mut impl EditorSurface) -> Option<Anchor> {
        let Some(snapshot) = surface.snapshot() else {
            trace!("marker skipped: no buffer attached");
            return None;
        };
        let anchor = marker_position(&snapshot);
        let marker = Decoration {
            anchor,
            class: MARKER_CLASS.to_string(),
        };
        self.current = surface.replace_decorations(&self.current, vec![marker]);
        self.anchor = Some(anchor);
        self.recomputations += 1;
        trace!(line = anchor.line, column = anchor.column, "marker moved");
        Some(anchor)
    }

    /// Drop a pending recomputation
    pub fn cancel(&mut self) -> bool {
        self.pending.cancel()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_pending()
    }

    pub fn anchor(&self) -> Option<Anchor> {
        self.anchor
    }

    pub fn marker_ids(&self) -> &[DecorationId] {
        &self.current
    }

    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{EditCommand, EditorBuffer};

    fn position(text: &str) -> Anchor {
        marker_position(&BufferSnapshot::from_text(text))
    }

    #[test]
    fn test_marker_position_rules() {
        assert_eq!(position(""), Anchor::new(1, 1));
        assert_eq!(position("abc"), Anchor::new(1, 4));
        assert_eq!(position("one\n   "), Anchor::new(2, 1));
        assert_eq!(position("one\n\t"), Anchor::new(2, 1));
        assert_eq!(position("x\n  yz"), Anchor::new(2, 5));
        assert_eq!(position("naïve"), Anchor::new(1, 6));
        assert_eq!(position("abc\n"), Anchor::new(2, 1));
    }

    #[test]
    fn test_mount_places_single_marker() {
        let mut buffer = EditorBuffer::with_text("// Start coding here...", 4);
        let mut sync = DecorationSync::new();
        assert_eq!(sync.on_mount(&mut buffer), Some(Anchor::new(1, 24)));
        assert_eq!(buffer.decoration_count(), 1);
    }

    #[test]
    fn test_recompute_keeps_exactly_one_marker() -> Result<(), String> {
        let mut buffer = EditorBuffer::with_text("a", 4);
        let mut sync = DecorationSync::new();
        for _ in 0..10 {
            sync.recompute_marker(&mut buffer);
        }
        assert_eq!(buffer.decoration_count(), 1);
        assert_eq!(sync.marker_ids().len(), 1);
        let (id, decoration) = buffer.decorations().next().ok_or("marker missing")?;
        assert_eq!(Some(id), sync.marker_ids().first());
        assert_eq!(decoration.class, MARKER_CLASS);
        Ok(())
    }

    #[test]
    fn test_edits_in_one_frame_coalesce() {
        let mut buffer = EditorBuffer::with_text("", 4);
        let mut sync = DecorationSync::new();
        sync.on_mount(&mut buffer);

        for c in "hello".chars() {
            if buffer.apply(EditCommand::Insert(c)) {
                sync.on_buffer_changed();
            }
        }
        assert_eq!(sync.recomputations(), 1);
        assert_eq!(sync.run_frame(&mut buffer), Some(Anchor::new(1, 6)));
        assert_eq!(sync.recomputations(), 2);
        assert_eq!(sync.run_frame(&mut buffer), None);
        assert_eq!(sync.recomputations(), 2);
    }

    #[test]
    fn test_detached_surface_is_noop() {
        let mut buffer = EditorBuffer::detached(4);
        let mut sync = DecorationSync::new();
        assert_eq!(sync.on_mount(&mut buffer), None);
        sync.on_buffer_changed();
        assert_eq!(sync.run_frame(&mut buffer), None);
        assert_eq!(buffer.decoration_count(), 0);
        assert_eq!(sync.recomputations(), 0);
    }

    #[test]
    fn test_cancel_drops_pending() {
        let mut buffer = EditorBuffer::with_text("x", 4);
        let mut sync = DecorationSync::new();
        sync.on_buffer_changed();
        assert!(sync.cancel());
        assert_eq!(sync.run_frame(&mut buffer), None);
    }
}
