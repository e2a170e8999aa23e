//! Editor Pane Widget
//!
//! Draws the visible window of the editor buffer with syntax highlighting,
//! the end-of-buffer marker and a block cursor.

use crate::decorations::MARKER_CLASS;
use crate::editor::{Anchor, EditorBuffer};
use crate::ui::highlight::{TokenKind, tokenize};
use ratatui::{
    buffer::Buffer,
    layout::{Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

pub const MARKER_GLYPH: &str = "↵";

pub struct EditorPane<'a> {
    buffer: &'a EditorBuffer,
    show_cursor: bool,
}

impl<'a> EditorPane<'a> {
    pub fn new(buffer: &'a EditorBuffer) -> Self {
        Self {
            buffer,
            show_cursor: true,
        }
    }

    pub fn show_cursor(mut self, show: bool) -> Self {
        self.show_cursor = show;
        self
    }

    fn highlight_line(line: &str) -> Line<'static> {
        let spans: Vec<Span> = tokenize(line)
            .into_iter()
            .map(|token| {
                let style = match token.kind {
                    TokenKind::Keyword => Style::default()
                        .fg(Color::Magenta)
                        .add_modifier(Modifier::BOLD),
                    TokenKind::Builtin => Style::default().fg(Color::Cyan),
                    TokenKind::Number => Style::default().fg(Color::Blue),
                    TokenKind::Literal => Style::default().fg(Color::Magenta),
                    TokenKind::String => Style::default().fg(Color::Green),
                    TokenKind::Comment => Style::default().fg(Color::DarkGray),
                    TokenKind::Operator => Style::default().fg(Color::Yellow),
                    TokenKind::Punctuation => Style::default().fg(Color::Gray),
                    TokenKind::Identifier => Style::default().fg(Color::White),
                    TokenKind::Whitespace => Style::default(),
                    TokenKind::Unknown => Style::default().fg(Color::Red),
                };
                Span::styled(token.text, style)
            })
            .collect();
        Line::from(spans)
    }

    /// Screen cell for a 1-based anchor, if it is in view
    fn cell_for(&self, anchor: Anchor, area: Rect) -> Option<Position> {
        let (top, left) = self.buffer.scroll();
        let row = anchor.line.checked_sub(1)?.checked_sub(top)?;
        let column = anchor.column.checked_sub(1)?.checked_sub(left)?;
        if row >= usize::from(area.height) || column >= usize::from(area.width) {
            return None;
        }
        Some(Position::new(area.x + column as u16, area.y + row as u16))
    }
}

impl Widget for &EditorPane<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.is_empty() {
            return;
        }

        if !self.buffer.is_attached() {
            Paragraph::new(Line::from(Span::styled(
                "(no buffer)",
                Style::default().fg(Color::DarkGray),
            )))
            .render(area, buf);
            return;
        }

        let (top, left) = self.buffer.scroll();
        let lines: Vec<Line> = self
            .buffer
            .lines()
            .iter()
            .skip(top)
            .take(usize::from(area.height))
            .map(|line| EditorPane::highlight_line(line))
            .collect();
        Paragraph::new(lines)
            .scroll((0, left.min(usize::from(u16::MAX)) as u16))
            .render(area, buf);

        for (_, decoration) in self.buffer.decorations() {
            if decoration.class != MARKER_CLASS {
                continue;
            }
            if let Some(position) = self.cell_for(decoration.anchor, area)
                && let Some(cell) = buf.cell_mut(position)
                && cell.symbol().trim().is_empty()
            {
                cell.set_symbol(MARKER_GLYPH)
                    .set_style(Style::default().fg(Color::DarkGray));
            }
        }

        if self.show_cursor {
            let cursor = self.buffer.cursor();
            if let Some(position) = self.cell_for(Anchor::new(cursor.line + 1, cursor.column + 1), area)
                && let Some(cell) = buf.cell_mut(position)
            {
                cell.set_style(Style::default().bg(Color::White).fg(Color::Black));
            }
        }
    }
}
