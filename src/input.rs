//! Key bindings: arrows or vim keys to steer, a/s/d/w for bombs.

use crate::game::{Command, Phase};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// What a key asks the host to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Game(Command),
    Quit,
    None,
}

/// True for keys that start fast fall while held.
pub fn is_fast_fall_key(code: KeyCode) -> bool {
    matches!(code, KeyCode::Down | KeyCode::Char('j'))
}

/// Map a key event to an action. Space depends on the phase: it cycles the bomb
/// target while playing and starts (or retries) everywhere else.
pub fn key_to_action(key: KeyEvent, phase: Phase) -> Action {
    let KeyEvent { code, modifiers, kind, .. } = key;

    if kind == KeyEventKind::Release {
        return if is_fast_fall_key(code) {
            Action::Game(Command::NormalFall)
        } else {
            Action::None
        };
    }

    if modifiers == KeyModifiers::CONTROL {
        return match code {
            KeyCode::Char('c') => Action::Quit,
            _ => Action::None,
        };
    }
    if !(modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) {
        return Action::None;
    }

    let command = match code {
        KeyCode::Char('q') => return Action::Quit,
        KeyCode::Esc | KeyCode::Char('p') => Command::TogglePause,
        KeyCode::Left | KeyCode::Char('h') => Command::MoveLeft,
        KeyCode::Right | KeyCode::Char('l') => Command::MoveRight,
        KeyCode::Up | KeyCode::Char('k') => Command::Rotate,
        c if is_fast_fall_key(c) => Command::FastFall,
        KeyCode::Char('a') => Command::BombTarget(0),
        KeyCode::Char('s') => Command::BombTarget(1),
        KeyCode::Char('d') => Command::BombTarget(2),
        KeyCode::Char('w') => Command::BombTarget(3),
        KeyCode::Char(' ') if phase == Phase::Playing => Command::CycleBombTarget,
        KeyCode::Char(' ') | KeyCode::Enter => Command::StartOrRetry,
        _ => return Action::None,
    };
    Action::Game(command)
}
