//! Keyboard event handling.
//!
//! This module manages keyboard input with Vim-style navigation:
//! - `h` / `l`: scroll left / right
//! - `j` / `k`: select next / previous sequence
//! - `+` / `-`: zoom in / out
//! - `f`: fit the whole sequence
//! - `0` or `Home`: go to the left end
//! - `$` or `End`: go to the right end
//! - `L`, `R`, `T`, `C`: align left, right, on the TSS, centred
//! - `r`: flip orientation
//! - `s`: toggle scroll lock
//! - `e`: toggle expanded layout
//! - `?`: show help
//! - `:`: enter command mode
//!   - `:q` or `:quit`: quit the application
//!   - `:zoom 250%`, `:goto 1000-2000`, `:1000-2000`
//!   - `:align left|right|tss|none`, `:expand`, `:contract`
//!   - `:labels`, `:lock`, `:flip`, `:seq <name>`, `:w`

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use std::time::Duration;

use crate::model::{AppMode, AppState};
use crate::viewport::Alignment;

/// Actions that can be triggered by keyboard input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// No action (key not recognized)
    None,
    /// Quit the application
    Quit,
    /// Scroll towards the left of the screen
    MoveLeft,
    /// Scroll towards the right of the screen
    MoveRight,
    /// Select the previous sequence
    SelectPrevious,
    /// Select the next sequence
    SelectNext,
    ZoomIn,
    ZoomOut,
    ZoomToFit,
    /// Go to the end of the sequence drawn on the left (0 or Home)
    GotoLeftEnd,
    /// Go to the end of the sequence drawn on the right ($ or End)
    GotoRightEnd,
    Align(Alignment),
    FlipOrientation,
    ToggleScrollLock,
    ToggleExpanded,
    /// Enter command mode
    EnterCommandMode,
    /// Add character to command buffer
    CommandChar(char),
    /// Execute current command
    ExecuteCommand,
    /// Cancel command mode
    CancelCommand,
    /// Backspace in command mode
    CommandBackspace,
    /// Resize event (terminal resized)
    Resize(u16, u16),
    ShowHelp,
    /// Dismiss the help overlay
    DismissHelp,
}

/// Polls for keyboard events with a timeout.
///
/// Returns `None` if no event occurred within the timeout.
pub fn poll_event(timeout: Duration) -> Option<Event> {
    if event::poll(timeout).ok()? {
        event::read().ok()
    } else {
        None
    }
}

/// Converts a crossterm event to an Action based on current app mode.
pub fn handle_event(event: Event, mode: &AppMode, show_help: bool) -> Action {
    match event {
        Event::Key(key_event) => handle_key_event(key_event, mode, show_help),
        Event::Resize(width, height) => Action::Resize(width, height),
        _ => Action::None,
    }
}

/// Handles a key event based on the current application mode.
fn handle_key_event(key: KeyEvent, mode: &AppMode, show_help: bool) -> Action {
    // If help is shown, any key dismisses it
    if show_help {
        return Action::DismissHelp;
    }

    match mode {
        AppMode::Normal => handle_normal_mode(key),
        AppMode::Command(_) => handle_command_mode(key),
    }
}

/// Handles key events in normal mode.
fn handle_normal_mode(key: KeyEvent) -> Action {
    // Handle Ctrl+C for emergency quit
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Action::Quit;
    }

    match key.code {
        KeyCode::Char('h') | KeyCode::Left => Action::MoveLeft,
        KeyCode::Char('l') | KeyCode::Right => Action::MoveRight,
        KeyCode::Char('k') | KeyCode::Up => Action::SelectPrevious,
        KeyCode::Char('j') | KeyCode::Down => Action::SelectNext,

        KeyCode::Char('+') | KeyCode::Char('=') => Action::ZoomIn,
        KeyCode::Char('-') | KeyCode::Char('_') => Action::ZoomOut,
        KeyCode::Char('f') => Action::ZoomToFit,

        KeyCode::Char('0') | KeyCode::Home => Action::GotoLeftEnd,
        KeyCode::Char('$') | KeyCode::End => Action::GotoRightEnd,

        KeyCode::Char('L') => Action::Align(Alignment::Left),
        KeyCode::Char('R') => Action::Align(Alignment::Right),
        KeyCode::Char('T') => Action::Align(Alignment::Tss),
        KeyCode::Char('C') => Action::Align(Alignment::None),

        KeyCode::Char('r') => Action::FlipOrientation,
        KeyCode::Char('s') => Action::ToggleScrollLock,
        KeyCode::Char('e') => Action::ToggleExpanded,

        KeyCode::Char(':') => Action::EnterCommandMode,
        KeyCode::Char('?') => Action::ShowHelp,

        _ => Action::None,
    }
}

/// Handles key events in command mode.
fn handle_command_mode(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Enter => Action::ExecuteCommand,
        KeyCode::Esc => Action::CancelCommand,
        KeyCode::Backspace => Action::CommandBackspace,
        KeyCode::Char(c) => Action::CommandChar(c),
        _ => Action::None,
    }
}

/// Applies an action to the application state.
///
/// Returns `true` if the application should continue, `false` if it should quit.
pub fn apply_action(state: &mut AppState, action: Action) -> bool {
    match action {
        Action::None => {}
        Action::Quit => {
            state.should_quit = true;
        }
        Action::MoveLeft => state.move_left(),
        Action::MoveRight => state.move_right(),
        Action::SelectPrevious => state.select_previous(),
        Action::SelectNext => state.select_next(),
        Action::ZoomIn => state.zoom_in(),
        Action::ZoomOut => state.zoom_out(),
        Action::ZoomToFit => state.zoom_to_fit(),
        Action::GotoLeftEnd => state.goto_left_end(),
        Action::GotoRightEnd => state.goto_right_end(),
        Action::Align(alignment) => state.align(alignment),
        Action::FlipOrientation => state.flip_orientation(),
        Action::ToggleScrollLock => state.toggle_scroll_lock(),
        Action::ToggleExpanded => state.toggle_expanded(),
        Action::EnterCommandMode => state.enter_command_mode(),
        Action::CommandChar(c) => state.command_input(c),
        Action::ExecuteCommand => state.execute_command(),
        Action::CancelCommand => state.cancel_command(),
        Action::CommandBackspace => state.command_backspace(),
        Action::Resize(_, _) => {
            // Resize is handled in the main loop with actual terminal dimensions
        }
        Action::ShowHelp => {
            state.show_help = true;
        }
        Action::DismissHelp => state.dismiss_help(),
    }

    !state.should_quit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataStore, Sequence};
    use crate::settings::Settings;
    use crate::view::TrackView;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_normal_mode_navigation() {
        let mode = AppMode::Normal;
        assert_eq!(handle_key_event(key(KeyCode::Char('h')), &mode, false), Action::MoveLeft);
        assert_eq!(handle_key_event(key(KeyCode::Char('l')), &mode, false), Action::MoveRight);
        assert_eq!(handle_key_event(key(KeyCode::Char('j')), &mode, false), Action::SelectNext);
        assert_eq!(handle_key_event(key(KeyCode::Char('k')), &mode, false), Action::SelectPrevious);
        assert_eq!(handle_key_event(key(KeyCode::Left), &mode, false), Action::MoveLeft);
    }

    #[test]
    fn test_zoom_and_jump_keys() {
        let mode = AppMode::Normal;
        assert_eq!(handle_key_event(key(KeyCode::Char('+')), &mode, false), Action::ZoomIn);
        assert_eq!(handle_key_event(key(KeyCode::Char('-')), &mode, false), Action::ZoomOut);
        assert_eq!(handle_key_event(key(KeyCode::Char('f')), &mode, false), Action::ZoomToFit);
        assert_eq!(handle_key_event(key(KeyCode::Char('0')), &mode, false), Action::GotoLeftEnd);
        assert_eq!(handle_key_event(key(KeyCode::End), &mode, false), Action::GotoRightEnd);
        assert_eq!(
            handle_key_event(key(KeyCode::Char('T')), &mode, false),
            Action::Align(Alignment::Tss)
        );
    }

    #[test]
    fn test_enter_command_mode() {
        let mode = AppMode::Normal;
        assert_eq!(handle_key_event(key(KeyCode::Char(':')), &mode, false), Action::EnterCommandMode);
    }

    #[test]
    fn test_command_mode_input() {
        let mode = AppMode::Command(String::new());
        assert_eq!(handle_key_event(key(KeyCode::Char('q')), &mode, false), Action::CommandChar('q'));
        assert_eq!(handle_key_event(key(KeyCode::Enter), &mode, false), Action::ExecuteCommand);
        assert_eq!(handle_key_event(key(KeyCode::Esc), &mode, false), Action::CancelCommand);
        assert_eq!(handle_key_event(key(KeyCode::Backspace), &mode, false), Action::CommandBackspace);
    }

    #[test]
    fn test_ctrl_c_quit() {
        let mode = AppMode::Normal;
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key_event(ctrl_c, &mode, false), Action::Quit);
    }

    #[test]
    fn test_dismiss_help() {
        let mode = AppMode::Normal;
        // Any key when help is shown should dismiss help
        assert_eq!(handle_key_event(key(KeyCode::Char('x')), &mode, true), Action::DismissHelp);
        assert_eq!(handle_key_event(key(KeyCode::Esc), &mode, true), Action::DismissHelp);
    }

    #[test]
    fn test_resize_event() {
        let mode = AppMode::Normal;
        assert_eq!(handle_event(Event::Resize(80, 24), &mode, false), Action::Resize(80, 24));
    }

    #[test]
    fn test_apply_action() {
        let mut store = DataStore::new();
        store.add_sequence(Sequence::new("seq1", 0, 999));
        let mut state = AppState::new(TrackView::new(store, Settings::default(), 100.0));

        assert!(apply_action(&mut state, Action::ZoomIn));
        let level = state.view.zoom_level("seq1").unwrap();
        assert!((level - 20.0).abs() < 1e-9);
        apply_action(&mut state, Action::GotoRightEnd);
        assert_eq!(state.view.viewport("seq1").unwrap().end, 999);
        apply_action(&mut state, Action::ShowHelp);
        assert!(state.show_help);
        assert!(!apply_action(&mut state, Action::Quit));
    }
}
