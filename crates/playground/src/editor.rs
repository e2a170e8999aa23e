//! Editor buffer
//!
//! The text model behind the editor pane. The model may be detached (no
//! buffer loaded yet), in which case reads return nothing and edits do
//! nothing. Edits report whether they changed the content so the caller
//! can schedule marker work only for real changes.

use std::collections::BTreeMap;

/// A 1-based (line, column) position. Columns count characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Anchor {
    pub line: usize,
    pub column: usize,
}

impl Anchor {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DecorationId(u64);

/// A zero-width decoration anchored at a position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    pub anchor: Anchor,
    pub class: String,
}

/// The buffer's lines at one point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferSnapshot {
    lines: Vec<String>,
}

impl BufferSnapshot {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn from_text(text: &str) -> Self {
        Self::new(split_lines(text))
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn last_line(&self) -> Option<&str> {
        self.lines.last().map(String::as_str)
    }

    /// Lines joined with `\n`
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// What the rest of the playground needs from an editor
pub trait EditorSurface {
    /// Current content, or `None` while no model is attached
    fn snapshot(&self) -> Option<BufferSnapshot>;

    /// Remove the decorations named in `previous`, add `next`, and return
    /// the identities of the added decorations
    fn replace_decorations(
        &mut self,
        previous: &[DecorationId],
        next: Vec<Decoration>,
    ) -> Vec<DecorationId>;

    /// Ask for the editor to be laid out again at the next render
    fn request_layout(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditCommand {
    Insert(char),
    Newline,
    Backspace,
    Delete,
    Tab,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
}

/// 0-based cursor: line index and character column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug)]
pub struct EditorBuffer {
    model: Option<Vec<String>>,
    cursor: Cursor,
    /// Column to return to when moving vertically through shorter lines
    goal_column: Option<usize>,
    tab_width: usize,
    decorations: BTreeMap<DecorationId, Decoration>,
    next_decoration: u64,
    /// First visible row and column
    scroll: (usize, usize),
    /// Visible (width, height) from the last layout
    viewport: (u16, u16),
    layout_pending: bool,
    layout_requests: u64,
}

impl EditorBuffer {
    /// A buffer with no model attached
    pub fn detached(tab_width: usize) -> Self {
        Self {
            model: None,
            cursor: Cursor::default(),
            goal_column: None,
            tab_width: tab_width.max(1),
            decorations: BTreeMap::new(),
            next_decoration: 0,
            scroll: (0, 0),
            viewport: (0, 0),
            layout_pending: false,
            layout_requests: 0,
        }
    }

    pub fn with_text(text: &str, tab_width: usize) -> Self {
        let mut buffer = Self::detached(tab_width);
        buffer.attach(text);
        buffer
    }

    /// Load `text` as the model, cursor at the end
    pub fn attach(&mut self, text: &str) {
        let lines = split_lines(text);
        let line = lines.len() - 1;
        let column = char_len(&lines[line]);
        self.model = Some(lines);
        self.cursor = Cursor { line, column };
        self.goal_column = None;
        self.scroll_into_view();
    }

    pub fn detach(&mut self) {
        self.model = None;
        self.cursor = Cursor::default();
        self.scroll = (0, 0);
    }

    pub fn is_attached(&self) -> bool {
        self.model.is_some()
    }

    pub fn lines(&self) -> &[String] {
        self.model.as_deref().unwrap_or_default()
    }

    pub fn text(&self) -> Option<String> {
        self.model.as_ref().map(|lines| lines.join("\n"))
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn scroll(&self) -> (usize, usize) {
        self.scroll
    }

    pub fn decorations(&self) -> impl Iterator<Item = (&DecorationId, &Decoration)> {
        self.decorations.iter()
    }

    pub fn decoration_count(&self) -> usize {
        self.decorations.len()
    }

    pub fn layout_requests(&self) -> u64 {
        self.layout_requests
    }

    /// Consume a pending layout request
    pub fn take_layout_request(&mut self) -> bool {
        std::mem::take(&mut self.layout_pending)
    }

    /// Record the visible size and bring the cursor back into view
    pub fn relayout(&mut self, width: u16, height: u16) {
        self.viewport = (width, height);
        self.scroll_into_view();
    }

    /// Apply one edit. Returns whether the content changed.
    pub fn apply(&mut self, command: EditCommand) -> bool {
        let Some(lines) = self.model.as_mut() else {
            return false;
        };
        let cursor = &mut self.cursor;
        let page = usize::from(self.viewport.1.max(1));

        let changed = match command {
            EditCommand::Insert(c) => {
                let line = &mut lines[cursor.line];
                line.insert(byte_index(line, cursor.column), c);
                cursor.column += 1;
                true
            }
            EditCommand::Tab => {
                let spaces = self.tab_width - cursor.column % self.tab_width;
                let line = &mut lines[cursor.line];
                line.insert_str(byte_index(line, cursor.column), &" ".repeat(spaces));
                cursor.column += spaces;
                true
            }
            EditCommand::Newline => {
                let line = &mut lines[cursor.line];
                let rest = line.split_off(byte_index(line, cursor.column));
                let indent: String = line.chars().take_while(|c| *c == ' ' || *c == '\t').collect();
                cursor.column = char_len(&indent);
                cursor.line += 1;
                lines.insert(cursor.line, indent + &rest);
                true
            }
            EditCommand::Backspace => {
                if cursor.column > 0 {
                    let line = &mut lines[cursor.line];
                    line.remove(byte_index(line, cursor.column - 1));
                    cursor.column -= 1;
                    true
                } else if cursor.line > 0 {
                    let current = lines.remove(cursor.line);
                    cursor.line -= 1;
                    cursor.column = char_len(&lines[cursor.line]);
                    lines[cursor.line].push_str(&current);
                    true
                } else {
                    false
                }
            }
            EditCommand::Delete => {
                let len = char_len(&lines[cursor.line]);
                if cursor.column < len {
                    let line = &mut lines[cursor.line];
                    line.remove(byte_index(line, cursor.column));
                    true
                } else if cursor.line + 1 < lines.len() {
                    let next = lines.remove(cursor.line + 1);
                    lines[cursor.line].push_str(&next);
                    true
                } else {
                    false
                }
            }
            EditCommand::Left => {
                if cursor.column > 0 {
                    cursor.column -= 1;
                } else if cursor.line > 0 {
                    cursor.line -= 1;
                    cursor.column = char_len(&lines[cursor.line]);
                }
                false
            }
            EditCommand::Right => {
                if cursor.column < char_len(&lines[cursor.line]) {
                    cursor.column += 1;
                } else if cursor.line + 1 < lines.len() {
                    cursor.line += 1;
                    cursor.column = 0;
                }
                false
            }
            EditCommand::Home => {
                cursor.column = 0;
                false
            }
            EditCommand::End => {
                cursor.column = char_len(&lines[cursor.line]);
                false
            }
            EditCommand::Up | EditCommand::Down | EditCommand::PageUp | EditCommand::PageDown => {
                let goal = *self.goal_column.get_or_insert(cursor.column);
                let last = lines.len() - 1;
                cursor.line = match command {
                    EditCommand::Up => cursor.line.saturating_sub(1),
                    EditCommand::Down => (cursor.line + 1).min(last),
                    EditCommand::PageUp => cursor.line.saturating_sub(page),
                    _ => (cursor.line + page).min(last),
                };
                cursor.column = goal.min(char_len(&lines[cursor.line]));
                self.scroll_into_view();
                return false;
            }
        };

        self.goal_column = None;
        self.scroll_into_view();
        changed
    }

    fn scroll_into_view(&mut self) {
        let (width, height) = (usize::from(self.viewport.0), usize::from(self.viewport.1));
        let (mut top, mut left) = self.scroll;
        if height > 0 {
            if self.cursor.line < top {
                top = self.cursor.line;
            } else if self.cursor.line >= top + height {
                top = self.cursor.line + 1 - height;
            }
        }
        if width > 0 {
            // One spare cell so the cursor can sit past the last character
            if self.cursor.column < left {
                left = self.cursor.column;
            } else if self.cursor.column >= left + width {
                left = self.cursor.column + 1 - width;
            }
        }
        self.scroll = (top, left);
    }
}

impl EditorSurface for EditorBuffer {
    fn snapshot(&self) -> Option<BufferSnapshot> {
        self.model.clone().map(BufferSnapshot::new)
    }

    fn replace_decorations(
        &mut self,
        previous: &[DecorationId],
        next: Vec<Decoration>,
    ) -> Vec<DecorationId> {
        for id in previous {
            self.decorations.remove(id);
        }
        next.into_iter()
            .map(|decoration| {
                let id = DecorationId(self.next_decoration);
                self.next_decoration += 1;
                self.decorations.insert(id, decoration);
                id
            })
            .collect()
    }

    fn request_layout(&mut self) {
        self.layout_pending = true;
        self.layout_requests += 1;
    }
}

/// Split on `\n`, dropping a trailing `\r` from each line. Always yields at
/// least one line.
fn split_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}

fn char_len(line: &str) -> usize {
    line.chars().count()
}

fn byte_index(line: &str, column: usize) -> usize {
    line.char_indices()
        .nth(column)
        .map_or(line.len(), |(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(buffer: &mut EditorBuffer, text: &str) {
        for c in text.chars() {
            let command = if c == '\n' {
                EditCommand::Newline
            } else {
                EditCommand::Insert(c)
            };
            buffer.apply(command);
        }
    }

    #[test]
    fn test_detached_buffer_is_inert() {
        let mut buffer = EditorBuffer::detached(4);
        assert!(!buffer.is_attached());
        assert_eq!(buffer.snapshot(), None);
        assert!(!buffer.apply(EditCommand::Insert('x')));
        assert!(buffer.lines().is_empty());
    }

    #[test]
    fn test_attach_places_cursor_at_end() {
        let buffer = EditorBuffer::with_text("ab\ncdé", 4);
        assert_eq!(buffer.cursor(), Cursor { line: 1, column: 3 });
    }

    #[test]
    fn test_insert_and_backspace_join() {
        let mut buffer = EditorBuffer::with_text("", 4);
        typed(&mut buffer, "let x\n");
        assert_eq!(buffer.lines(), ["let x", ""]);
        assert!(buffer.apply(EditCommand::Backspace));
        assert_eq!(buffer.lines(), ["let x"]);
        assert_eq!(buffer.cursor(), Cursor { line: 0, column: 5 });

        let mut start = EditorBuffer::with_text("", 4);
        assert!(!start.apply(EditCommand::Backspace));
    }

    #[test]
    fn test_newline_keeps_indent() {
        let mut buffer = EditorBuffer::with_text("if (x) {\n    foo()", 4);
        buffer.apply(EditCommand::Newline);
        assert_eq!(buffer.lines()[2], "    ");
        assert_eq!(buffer.cursor(), Cursor { line: 2, column: 4 });
    }

    #[test]
    fn test_tab_to_next_stop() {
        let mut buffer = EditorBuffer::with_text("ab", 4);
        buffer.apply(EditCommand::Tab);
        assert_eq!(buffer.lines()[0], "ab  ");
        buffer.apply(EditCommand::Tab);
        assert_eq!(buffer.lines()[0], "ab      ");
    }

    #[test]
    fn test_delete_joins_next_line() {
        let mut buffer = EditorBuffer::with_text("a\nb", 4);
        buffer.apply(EditCommand::Up);
        buffer.apply(EditCommand::End);
        assert!(buffer.apply(EditCommand::Delete));
        assert_eq!(buffer.lines(), ["ab"]);
        buffer.apply(EditCommand::End);
        assert!(!buffer.apply(EditCommand::Delete));
    }

    #[test]
    fn test_movement_does_not_change_content() {
        let mut buffer = EditorBuffer::with_text("one\ntwo", 4);
        for command in [
            EditCommand::Left,
            EditCommand::Up,
            EditCommand::Home,
            EditCommand::End,
            EditCommand::Down,
            EditCommand::Right,
            EditCommand::PageUp,
            EditCommand::PageDown,
        ] {
            assert!(!buffer.apply(command));
        }
        assert_eq!(buffer.lines(), ["one", "two"]);
    }

    #[test]
    fn test_vertical_moves_remember_column() {
        let mut buffer = EditorBuffer::with_text("long line\nx\nanother line", 4);
        buffer.apply(EditCommand::Up);
        assert_eq!(buffer.cursor(), Cursor { line: 1, column: 1 });
        buffer.apply(EditCommand::Up);
        assert_eq!(buffer.cursor(), Cursor { line: 0, column: 9 });
    }

    #[test]
    fn test_multibyte_editing() {
        let mut buffer = EditorBuffer::with_text("héllo", 4);
        buffer.apply(EditCommand::Home);
        buffer.apply(EditCommand::Right);
        buffer.apply(EditCommand::Delete);
        assert_eq!(buffer.lines(), ["hllo"]);
    }

    #[test]
    fn test_replace_decorations() {
        let mut buffer = EditorBuffer::with_text("x", 4);
        let marker = Decoration {
            anchor: Anchor::new(1, 2),
            class: "m".to_string(),
        };
        let first = buffer.replace_decorations(&[], vec![marker.clone()]);
        let second = buffer.replace_decorations(&first, vec![marker]);
        assert_eq!(buffer.decoration_count(), 1);
        assert_ne!(first, second);
    }

    #[test]
    fn test_scroll_follows_cursor() {
        let text = (0..20).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        let mut buffer = EditorBuffer::with_text(&text, 4);
        buffer.relayout(10, 5);
        assert_eq!(buffer.scroll(), (15, 0));
        buffer.apply(EditCommand::PageUp);
        assert_eq!(buffer.cursor().line, 14);
        assert_eq!(buffer.scroll(), (14, 0));
    }

    #[test]
    fn test_layout_requests() {
        let mut buffer = EditorBuffer::with_text("", 4);
        assert!(!buffer.take_layout_request());
        buffer.request_layout();
        buffer.request_layout();
        assert_eq!(buffer.layout_requests(), 2);
        assert!(buffer.take_layout_request());
        assert!(!buffer.take_layout_request());
    }
}
