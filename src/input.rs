//! Key bindings: menu shortcuts and lane taps (dfjk or 1234).

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Start from the menu, or Replay from the game-over screen.
    Confirm,
    Instructions,
    Back,
    Quit,
    /// Tap the lowest tile in lane 0..4.
    Lane(usize),
    None,
}

/// Map key event to an action.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if modifiers == KeyModifiers::CONTROL {
        return match code {
            KeyCode::Char('c') => Action::Quit,
            _ => Action::None,
        };
    }
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod {
        return Action::None;
    }
    match code {
        KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('s') | KeyCode::Char('r') => {
            Action::Confirm
        }
        KeyCode::Char('i') | KeyCode::Char('?') => Action::Instructions,
        KeyCode::Esc | KeyCode::Char('b') | KeyCode::Backspace => Action::Back,
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Char('d') | KeyCode::Char('1') => Action::Lane(0),
        KeyCode::Char('f') | KeyCode::Char('2') => Action::Lane(1),
        KeyCode::Char('j') | KeyCode::Char('3') => Action::Lane(2),
        KeyCode::Char('k') | KeyCode::Char('4') => Action::Lane(3),
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_lane_keys() {
        assert_eq!(key_to_action(key(KeyCode::Char('d'), KeyModifiers::NONE)), Action::Lane(0));
        assert_eq!(key_to_action(key(KeyCode::Char('4'), KeyModifiers::NONE)), Action::Lane(3));
    }

    #[test]
    fn test_ctrl_c_quits() {
        assert_eq!(key_to_action(key(KeyCode::Char('c'), KeyModifiers::CONTROL)), Action::Quit);
        assert_eq!(key_to_action(key(KeyCode::Char('q'), KeyModifiers::CONTROL)), Action::None);
    }

    #[test]
    fn test_menu_keys() {
        assert_eq!(key_to_action(key(KeyCode::Enter, KeyModifiers::NONE)), Action::Confirm);
        assert_eq!(key_to_action(key(KeyCode::Esc, KeyModifiers::NONE)), Action::Back);
        assert_eq!(key_to_action(key(KeyCode::Char('I'), KeyModifiers::SHIFT)), Action::None);
        assert_eq!(key_to_action(key(KeyCode::Char('i'), KeyModifiers::NONE)), Action::Instructions);
    }
}
