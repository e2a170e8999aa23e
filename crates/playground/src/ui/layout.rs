//! Layout Manager
//!
//! Splits the terminal into the editor pane, the one-cell divider, the
//! console pane and the status bar. The split follows the current ratio
//! along the orientation's axis.

use crate::ratio::{Orientation, SplitRatio};
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};

pub const STATUS_BAR_HEIGHT: u16 = 1;
pub const DIVIDER_SIZE: u16 = 1;

/// The computed layout areas
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComputedLayout {
    /// Everything above the status bar; pointer ratios are measured here
    pub container: Rect,
    pub editor: Rect,
    pub divider: Rect,
    pub console: Rect,
    pub status: Rect,
}

impl ComputedLayout {
    pub fn compute(area: Rect, ratio: SplitRatio, orientation: Orientation) -> Self {
        let vertical_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(0),
                Constraint::Length(STATUS_BAR_HEIGHT),
            ])
            .split(area);

        let container = vertical_chunks[0];
        let status = vertical_chunks[1];

        let extent = orientation.extent(container);
        // Too small to split: the editor takes everything
        if extent < DIVIDER_SIZE + 2 {
            return Self {
                container,
                editor: container,
                status,
                ..Self::default()
            };
        }

        let editor_extent = ratio.share_of(extent).clamp(1, extent - DIVIDER_SIZE - 1);
        let console_extent = extent - editor_extent - DIVIDER_SIZE;

        let direction = match orientation {
            Orientation::Horizontal => Direction::Horizontal,
            Orientation::Vertical => Direction::Vertical,
        };
        let chunks = Layout::default()
            .direction(direction)
            .constraints([
                Constraint::Length(editor_extent),
                Constraint::Length(DIVIDER_SIZE),
                Constraint::Length(console_extent),
            ])
            .split(container);

        Self {
            container,
            editor: chunks[0],
            divider: chunks[1],
            console: chunks[2],
            status,
        }
    }

    pub fn console_visible(&self) -> bool {
        self.console.width > 0 && self.console.height > 0
    }

    pub fn on_divider(&self, column: u16, row: u16) -> bool {
        self.divider.contains(Position::new(column, row))
    }
}

/// Status bar content
#[derive(Debug, Clone, Default)]
pub struct StatusContent {
    pub name: String,
    /// Shown in the middle; key hints are used when there is no message
    pub message: Option<String>,
    pub orientation: String,
    pub ratio: String,
    pub state: String,
}

impl StatusContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation.name().to_string();
        self
    }

    pub fn ratio(mut self, ratio: SplitRatio) -> Self {
        self.ratio = ratio.to_string();
        self
    }

    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = state.into();
        self
    }

    /// Format for display
    pub fn format(&self, width: u16) -> String {
        let left = format!(" {} ", self.name);
        let middle = match &self.message {
            Some(msg) => msg.clone(),
            None => "^R run  F1 help  ^Q quit".to_string(),
        };
        let right = format!(" {} {} | {} ", self.orientation, self.ratio, self.state);

        let used = left.chars().count() + middle.chars().count() + right.chars().count();
        let padding_needed = (width as usize).saturating_sub(used);
        let left_pad = padding_needed / 2;
        let right_pad = padding_needed - left_pad;

        format!(
            "{}{}{}{}{}",
            left,
            " ".repeat(left_pad),
            middle,
            " ".repeat(right_pad),
            right
        )
    }
}
