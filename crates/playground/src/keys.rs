//! Key bindings: crossterm key events to playground actions.

use crate::editor::EditCommand;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Edit(EditCommand),
    Run,
    Quit,
    ToggleHelp,
    /// Esc: close the help overlay if it is open
    Dismiss,
}

/// Map a key press to an action. Unbound keys yield `None`.
pub fn action_for(event: KeyEvent) -> Option<Action> {
    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
    let alt = event.modifiers.contains(KeyModifiers::ALT);

    if ctrl {
        return match event.code {
            KeyCode::Char('r') => Some(Action::Run),
            KeyCode::Char('q') | KeyCode::Char('c') => Some(Action::Quit),
            _ => None,
        };
    }

    let command = match event.code {
        KeyCode::F(5) => return Some(Action::Run),
        KeyCode::F(1) => return Some(Action::ToggleHelp),
        KeyCode::Esc => return Some(Action::Dismiss),
        KeyCode::Char(_) if alt => return None,
        KeyCode::Char(c) => EditCommand::Insert(c),
        KeyCode::Enter => EditCommand::Newline,
        KeyCode::Backspace => EditCommand::Backspace,
        KeyCode::Delete => EditCommand::Delete,
        KeyCode::Tab => EditCommand::Tab,
        KeyCode::Left => EditCommand::Left,
        KeyCode::Right => EditCommand::Right,
        KeyCode::Up => EditCommand::Up,
        KeyCode::Down => EditCommand::Down,
        KeyCode::Home => EditCommand::Home,
        KeyCode::End => EditCommand::End,
        KeyCode::PageUp => EditCommand::PageUp,
        KeyCode::PageDown => EditCommand::PageDown,
        _ => return None,
    };
    Some(Action::Edit(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn test_run_and_quit_bindings() {
        assert_eq!(action_for(ctrl('r')), Some(Action::Run));
        assert_eq!(action_for(KeyEvent::from(KeyCode::F(5))), Some(Action::Run));
        assert_eq!(action_for(ctrl('q')), Some(Action::Quit));
        assert_eq!(action_for(ctrl('c')), Some(Action::Quit));
        assert_eq!(action_for(ctrl('x')), None);
    }

    #[test]
    fn test_typing() {
        assert_eq!(
            action_for(KeyEvent::from(KeyCode::Char('a'))),
            Some(Action::Edit(EditCommand::Insert('a')))
        );
        assert_eq!(
            action_for(KeyEvent::new(KeyCode::Char('A'), KeyModifiers::SHIFT)),
            Some(Action::Edit(EditCommand::Insert('A')))
        );
        assert_eq!(
            action_for(KeyEvent::from(KeyCode::Enter)),
            Some(Action::Edit(EditCommand::Newline))
        );
        assert_eq!(
            action_for(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::ALT)),
            None
        );
    }

    #[test]
    fn test_help_keys() {
        assert_eq!(
            action_for(KeyEvent::from(KeyCode::F(1))),
            Some(Action::ToggleHelp)
        );
        assert_eq!(action_for(KeyEvent::from(KeyCode::Esc)), Some(Action::Dismiss));
        assert_eq!(action_for(KeyEvent::from(KeyCode::Insert)), None);
    }
}
