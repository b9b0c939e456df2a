use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy)]
pub enum Action {
    Quit,
    Up,
    Down,
    Enter,
    ToggleReveal,
    /// Recall quality 0-5, mapped straight from the digit keys
    Grade(u8),
    Skip,
    None,
}

pub fn map_event(ev: Event) -> Action {
    if let Event::Key(KeyEvent {
        code, modifiers, ..
    }) = ev
    {
        match (code, modifiers) {
            (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => Action::Quit,
            (KeyCode::Up, _) | (KeyCode::Char('k'), _) => Action::Up,
            (KeyCode::Down, _) | (KeyCode::Char('j'), _) => Action::Down,
            (KeyCode::Enter, _) => Action::Enter,
            (KeyCode::Char(' '), _) => Action::ToggleReveal,
            (KeyCode::Char(c), _) if c.is_ascii_digit() && c <= '5' => {
                Action::Grade(c as u8 - b'0')
            }
            (KeyCode::Char('s'), KeyModifiers::NONE) => Action::Skip,
            _ => Action::None,
        }
    } else {
        Action::None
    }
}
