//! Double-click detection
//!
//! Terminals report only presses and releases, so a double-click is two
//! presses of the same button on the same cell within the click window.

use crate::ratio::PointerSample;
use crossterm::event::MouseButton;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Click {
    Single,
    Double,
}

#[derive(Debug, Clone, Copy)]
struct LastPress {
    at: PointerSample,
    button: MouseButton,
    time: Instant,
}

#[derive(Debug, Clone)]
pub struct ClickTracker {
    window: Duration,
    last: Option<LastPress>,
}

impl ClickTracker {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Classify a press. A double-click consumes both presses, so a third
    /// press starts over as a single click.
    pub fn on_press(&mut self, at: PointerSample, button: MouseButton, now: Instant) -> Click {
        let is_double = self.last.is_some_and(|last| {
            last.button == button
                && last.at == at
                && now.saturating_duration_since(last.time) <= self.window
        });

        if is_double {
            self.last = None;
            Click::Double
        } else {
            self.last = Some(LastPress {
                at,
                button,
                time: now,
            });
            Click::Single
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(300);

    #[test]
    fn test_double_click_within_window() {
        let mut tracker = ClickTracker::new(WINDOW);
        let t0 = Instant::now();
        let at = PointerSample::new(40, 10);
        assert_eq!(tracker.on_press(at, MouseButton::Left, t0), Click::Single);
        assert_eq!(
            tracker.on_press(at, MouseButton::Left, t0 + Duration::from_millis(200)),
            Click::Double
        );
        assert_eq!(
            tracker.on_press(at, MouseButton::Left, t0 + Duration::from_millis(250)),
            Click::Single
        );
    }

    #[test]
    fn test_timeout_resets() {
        let mut tracker = ClickTracker::new(WINDOW);
        let t0 = Instant::now();
        let at = PointerSample::new(40, 10);
        tracker.on_press(at, MouseButton::Left, t0);
        assert_eq!(
            tracker.on_press(at, MouseButton::Left, t0 + Duration::from_millis(301)),
            Click::Single
        );
    }

    #[test]
    fn test_different_cell_or_button() {
        let mut tracker = ClickTracker::new(WINDOW);
        let t0 = Instant::now();
        tracker.on_press(PointerSample::new(40, 10), MouseButton::Left, t0);
        assert_eq!(
            tracker.on_press(PointerSample::new(40, 11), MouseButton::Left, t0),
            Click::Single
        );
        assert_eq!(
            tracker.on_press(PointerSample::new(40, 11), MouseButton::Right, t0),
            Click::Single
        );
    }
}
