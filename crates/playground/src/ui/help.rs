//! Help overlay

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};

const BINDINGS: &[(&str, &str)] = &[
    ("Ctrl-R / F5", "run the buffer"),
    ("Ctrl-Q / Ctrl-C", "quit"),
    ("F1 / Esc", "close this help"),
    ("drag divider", "resize panes"),
    ("double-click divider", "reset to 50/50"),
];

pub struct HelpOverlay;

impl HelpOverlay {
    /// Centered area for the overlay inside `area`
    pub fn area(area: Rect) -> Rect {
        let width = area.width.min(46);
        let height = (BINDINGS.len() as u16 + 2).min(area.height);
        Rect::new(
            area.x + (area.width - width) / 2,
            area.y + (area.height - height) / 2,
            width,
            height,
        )
    }
}

impl Widget for &HelpOverlay {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let area = HelpOverlay::area(area);
        Clear.render(area, buf);

        let lines: Vec<Line> = BINDINGS
            .iter()
            .map(|(keys, what)| {
                Line::from(vec![
                    Span::styled(
                        format!("{:>20} ", keys),
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(*what),
                ])
            })
            .collect();

        Paragraph::new(lines)
            .block(
                Block::default()
                    .title(" Help ")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .render(area, buf);
    }
}
