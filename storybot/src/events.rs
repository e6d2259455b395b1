//! Event handling for the Storybot TUI

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use storybot_core::{modes::mode_for_hotkey, SessionState};

use crate::app::{App, InputMode, Overlay, Screen};
use crate::requests::Request;

/// Result of handling an event
#[derive(Debug, Clone, PartialEq)]
pub enum EventResult {
    Continue,
    Quit,
    NeedsRedraw,
    /// Hand a request to the store.
    Dispatch(Request),
}

impl From<Option<Request>> for EventResult {
    fn from(request: Option<Request>) -> Self {
        match request {
            Some(request) => EventResult::Dispatch(request),
            None => EventResult::NeedsRedraw,
        }
    }
}

/// Handle a terminal event
pub fn handle_event(app: &mut App, state: &SessionState, event: Event) -> EventResult {
    match event {
        Event::Key(key) => handle_key_event(app, state, key),
        Event::Mouse(mouse) => handle_mouse_event(app, mouse),
        Event::Resize(_, _) => EventResult::NeedsRedraw,
        _ => EventResult::Continue,
    }
}

/// Handle a mouse event
fn handle_mouse_event(app: &mut App, mouse: MouseEvent) -> EventResult {
    match mouse.kind {
        MouseEventKind::ScrollUp => {
            app.scroll_up(3);
            EventResult::NeedsRedraw
        }
        MouseEventKind::ScrollDown => {
            app.scroll_down(3);
            EventResult::NeedsRedraw
        }
        _ => EventResult::Continue,
    }
}

/// Handle a key event
fn handle_key_event(app: &mut App, state: &SessionState, key: KeyEvent) -> EventResult {
    if let (KeyCode::Char('c'), KeyModifiers::CONTROL) = (key.code, key.modifiers) {
        return EventResult::Quit;
    }

    if app.has_overlay() {
        return handle_overlay_key(app, state, key);
    }

    match app.input_mode {
        InputMode::Normal => match Screen::of(state) {
            Screen::Home => handle_home_keys(app, state, key),
            Screen::Story | Screen::Tutor => handle_normal_mode(app, state, key),
        },
        InputMode::Insert => handle_insert_mode(app, state, key),
        InputMode::Command => handle_command_mode(app, key),
    }
}

/// Keys shared by every normal-mode screen. Returns `None` when unhandled.
fn handle_common_keys(app: &mut App, key: KeyEvent) -> Option<EventResult> {
    let result = match key.code {
        KeyCode::Char(':') => {
            app.enter_command_mode();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('?') | KeyCode::F(1) => {
            app.toggle_help();
            EventResult::NeedsRedraw
        }
        KeyCode::Char(',') => {
            app.open_settings();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('q') => EventResult::Quit,
        _ => return None,
    };
    Some(result)
}

/// Mode selection screen
fn handle_home_keys(app: &mut App, state: &SessionState, key: KeyEvent) -> EventResult {
    if let Some(result) = handle_common_keys(app, key) {
        return result;
    }

    match key.code {
        KeyCode::Char('j') | KeyCode::Down | KeyCode::Tab => {
            app.move_home_selection(true);
            EventResult::NeedsRedraw
        }
        KeyCode::Char('k') | KeyCode::Up | KeyCode::BackTab => {
            app.move_home_selection(false);
            EventResult::NeedsRedraw
        }
        KeyCode::Enter => EventResult::Dispatch(app.choose_highlighted_mode()),
        KeyCode::Char('e') if state.error.is_some() => EventResult::Dispatch(Request::ClearError),
        KeyCode::Char(c) => match mode_for_hotkey(c) {
            Some(mode) => EventResult::Dispatch(app.choose_mode(mode)),
            None => EventResult::Continue,
        },
        _ => EventResult::Continue,
    }
}

/// Handle keys in NORMAL mode on a conversation screen
fn handle_normal_mode(app: &mut App, state: &SessionState, key: KeyEvent) -> EventResult {
    if let Some(result) = handle_common_keys(app, key) {
        return result;
    }

    match key.code {
        KeyCode::Char('i') | KeyCode::Enter => {
            app.input_mode = InputMode::Insert;
            EventResult::NeedsRedraw
        }
        KeyCode::Char('a') => {
            app.input_mode = InputMode::Insert;
            app.cursor_end();
            EventResult::NeedsRedraw
        }

        // Navigation
        KeyCode::Char('j') | KeyCode::Down => {
            app.scroll_down(1);
            EventResult::NeedsRedraw
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.scroll_up(1);
            EventResult::NeedsRedraw
        }
        KeyCode::Char('G') | KeyCode::End => {
            app.scroll_to_bottom();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('g') | KeyCode::Home => {
            app.scroll_to_top();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_up(10);
            EventResult::NeedsRedraw
        }
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_down(10);
            EventResult::NeedsRedraw
        }
        KeyCode::PageUp => {
            app.scroll_up(10);
            EventResult::NeedsRedraw
        }
        KeyCode::PageDown => {
            app.scroll_down(10);
            EventResult::NeedsRedraw
        }

        // Session
        KeyCode::Char('n') => EventResult::Dispatch(app.new_session()),
        KeyCode::Char('m') => {
            let other = match state.mode {
                Some(storybot_api::Mode::Story) => storybot_api::Mode::Tutor,
                _ => storybot_api::Mode::Story,
            };
            EventResult::Dispatch(app.choose_mode(other))
        }
        KeyCode::Char('r') => EventResult::Dispatch(Request::RefreshSessionInfo),
        KeyCode::Char('e') if state.error.is_some() => EventResult::Dispatch(Request::ClearError),

        // Suggested replies
        KeyCode::Char(c @ '1'..='9') => {
            let n = c as usize - '0' as usize;
            app.pick_suggestion(state, n).into()
        }

        _ => EventResult::Continue,
    }
}

/// Handle keys in INSERT mode (free text input)
fn handle_insert_mode(app: &mut App, state: &SessionState, key: KeyEvent) -> EventResult {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
            EventResult::NeedsRedraw
        }
        KeyCode::Enter => app.submit(state).into(),

        // Input editing
        KeyCode::Left => {
            app.cursor_left();
            EventResult::NeedsRedraw
        }
        KeyCode::Right => {
            app.cursor_right();
            EventResult::NeedsRedraw
        }
        KeyCode::Home => {
            app.cursor_home();
            EventResult::NeedsRedraw
        }
        KeyCode::End => {
            app.cursor_end();
            EventResult::NeedsRedraw
        }
        KeyCode::Backspace => {
            app.backspace();
            EventResult::NeedsRedraw
        }
        KeyCode::Delete => {
            app.delete();
            EventResult::NeedsRedraw
        }
        KeyCode::Up => {
            app.history_prev();
            EventResult::NeedsRedraw
        }
        KeyCode::Down => {
            app.history_next();
            EventResult::NeedsRedraw
        }
        KeyCode::PageUp => {
            app.scroll_up(10);
            EventResult::NeedsRedraw
        }
        KeyCode::PageDown => {
            app.scroll_down(10);
            EventResult::NeedsRedraw
        }

        KeyCode::Char(c) => {
            app.type_char(c);
            EventResult::NeedsRedraw
        }

        _ => EventResult::Continue,
    }
}

/// Handle keys in COMMAND mode (: commands)
fn handle_command_mode(app: &mut App, key: KeyEvent) -> EventResult {
    match key.code {
        KeyCode::Esc => {
            app.enter_normal_mode();
            EventResult::NeedsRedraw
        }
        KeyCode::Enter => {
            let request = app.run_command();
            if app.should_quit {
                EventResult::Quit
            } else {
                request.into()
            }
        }

        KeyCode::Left => {
            if app.cursor_position() > 1 {
                app.cursor_left();
            }
            EventResult::NeedsRedraw
        }
        KeyCode::Right => {
            app.cursor_right();
            EventResult::NeedsRedraw
        }
        KeyCode::Backspace => {
            if app.cursor_position() > 1 {
                app.backspace();
            } else {
                // Backspace on just ":" exits command mode
                app.enter_normal_mode();
            }
            EventResult::NeedsRedraw
        }

        KeyCode::Char(c) => {
            app.type_char(c);
            EventResult::NeedsRedraw
        }

        _ => EventResult::Continue,
    }
}

/// Handle key when overlay is open
fn handle_overlay_key(app: &mut App, state: &SessionState, key: KeyEvent) -> EventResult {
    match app.overlay() {
        Some(Overlay::Settings { .. }) => match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char(',') | KeyCode::Enter => {
                app.close_settings(state).into()
            }
            KeyCode::Char('j') | KeyCode::Down | KeyCode::Tab => {
                app.move_settings_field(true);
                EventResult::NeedsRedraw
            }
            KeyCode::Char('k') | KeyCode::Up | KeyCode::BackTab => {
                app.move_settings_field(false);
                EventResult::NeedsRedraw
            }
            KeyCode::Char('l') | KeyCode::Right | KeyCode::Char(' ') => {
                app.cycle_setting(state, true).into()
            }
            KeyCode::Char('h') | KeyCode::Left => app.cycle_setting(state, false).into(),
            _ => EventResult::Continue,
        },
        _ => match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') | KeyCode::Enter => {
                app.close_overlay();
                EventResult::NeedsRedraw
            }
            _ => EventResult::Continue,
        },
    }
}
