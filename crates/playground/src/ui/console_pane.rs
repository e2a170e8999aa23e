//! Console Pane Widget
//!
//! Shows the output log of the last run. Entries are preformatted: line
//! breaks inside an entry are kept and long lines wrap. The view sticks to
//! the newest output.

use crate::sandbox::{EntryKind, OutputLog};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

pub struct ConsolePane<'a> {
    log: &'a OutputLog,
    placeholder: &'a str,
    title: &'a str,
}

impl<'a> ConsolePane<'a> {
    pub fn new(log: &'a OutputLog, placeholder: &'a str) -> Self {
        Self {
            log,
            placeholder,
            title: "Console",
        }
    }

    pub fn title(mut self, title: &'a str) -> Self {
        self.title = title;
        self
    }

    fn build_lines(&self) -> Vec<Line<'a>> {
        if self.log.is_empty() {
            return vec![Line::from(Span::styled(
                self.placeholder,
                Style::default().fg(Color::DarkGray),
            ))];
        }

        self.log
            .entries()
            .iter()
            .flat_map(|entry| {
                let style = match entry.kind {
                    EntryKind::Output => Style::default().fg(Color::White),
                    EntryKind::Fault => Style::default().fg(Color::Red),
                };
                entry
                    .text
                    .split('\n')
                    .map(move |line| Line::from(Span::styled(line, style)))
            })
            .collect()
    }
}

impl Widget for &ConsolePane<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(format!(" {} ", self.title))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray));

        let inner = block.inner(area);
        block.render(area, buf);

        let lines = self.build_lines();
        let width = inner.width.max(1) as usize;
        let wrapped_height: u16 = lines
            .iter()
            .map(|line| {
                let line_width: usize = line.spans.iter().map(|s| s.content.chars().count()).sum();
                line_width.max(1).div_ceil(width) as u16
            })
            .sum();
        let scroll = wrapped_height.saturating_sub(inner.height);

        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0))
            .render(inner, buf);
    }
}
