//! Main application state and logic

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use storybot_api::{AgeGroup, ContentFilter, Mode, StoryLength};
use storybot_core::validation::{validate_character_name, validate_subject};
use storybot_core::{PreferencesPatch, SessionState, MODES};

use crate::requests::{route_input, InputRejected, Request};
use crate::ui::theme::StoryTheme;

const HISTORY_LIMIT: usize = 100;

/// Vim-style input modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Normal mode - navigation and hotkeys (default)
    #[default]
    Normal,
    /// Insert mode - free text input
    Insert,
    /// Command mode - entering : commands
    Command,
}

/// Which screen the state calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Story,
    Tutor,
}

impl Screen {
    pub fn of(state: &SessionState) -> Self {
        match state.mode {
            _ if state.show_mode_selection => Screen::Home,
            Some(Mode::Story) => Screen::Story,
            Some(Mode::Tutor) => Screen::Tutor,
            None => Screen::Home,
        }
    }
}

/// One row of the settings overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettingsField {
    #[default]
    ContentFilter,
    AgeGroup,
    StoryLength,
}

impl SettingsField {
    pub const ALL: [SettingsField; 3] = [
        SettingsField::ContentFilter,
        SettingsField::AgeGroup,
        SettingsField::StoryLength,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SettingsField::ContentFilter => "Content filter",
            SettingsField::AgeGroup => "Age group",
            SettingsField::StoryLength => "Story length",
        }
    }

    fn step(&self, down: bool) -> Self {
        cycle(&Self::ALL, *self, down)
    }
}

/// Overlay types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    Help,
    Settings {
        field: SettingsField,
        /// Preferences changed while the overlay was open.
        dirty: bool,
    },
}

fn cycle<T: Copy + PartialEq>(all: &[T], current: T, forward: bool) -> T {
    let len = all.len();
    let i = all.iter().position(|v| *v == current).unwrap_or(0);
    let next = if forward { (i + 1) % len } else { (i + len - 1) % len };
    all[next]
}

/// Main application state
pub struct App {
    pub theme: StoryTheme,
    overlay: Option<Overlay>,

    // Transcript display
    pub transcript_scroll: usize,
    pub scroll_locked_to_bottom: bool,
    max_scroll: usize,
    seen_entries: usize,

    // Input state
    pub input_mode: InputMode,
    input_buffer: String,
    cursor_position: usize,
    pub input_history: VecDeque<String>,
    pub history_index: Option<usize>,
    pub saved_input: Option<String>,

    // Home screen
    pub home_selection: usize,
    /// Tutor subject sent with the next start or question.
    pub subject: Option<String>,

    // Status
    status_message: Option<String>,
    pub should_quit: bool,

    // Animation
    pub animation_frame: u8,

    /// Generation requests spawned but not yet finished.
    pending: Arc<AtomicUsize>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            theme: StoryTheme::default(),
            overlay: None,
            transcript_scroll: 0,
            scroll_locked_to_bottom: true,
            max_scroll: 0,
            seen_entries: 0,
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            cursor_position: 0,
            input_history: VecDeque::with_capacity(HISTORY_LIMIT),
            history_index: None,
            saved_input: None,
            home_selection: 0,
            subject: None,
            status_message: None,
            should_quit: false,
            animation_frame: 0,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counter shared with spawned generation tasks.
    pub fn pending_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.pending)
    }

    pub fn is_waiting(&self, state: &SessionState) -> bool {
        state.is_generating || self.pending.load(Ordering::SeqCst) > 0
    }

    /// Follow the transcript as it grows, unless the reader scrolled away.
    pub fn observe(&mut self, state: &SessionState) {
        let entries = state.story.content.len()
            + state.story.user_inputs.len()
            + state.tutor.answers.len()
            + state.tutor.questions.len();
        if entries != self.seen_entries {
            if entries < self.seen_entries || self.scroll_locked_to_bottom {
                self.scroll_to_bottom();
            }
            self.seen_entries = entries;
        }
        if Screen::of(state) == Screen::Home && self.input_mode == InputMode::Insert {
            self.input_mode = InputMode::Normal;
        }
    }

    // =========================================================================
    // Mode and session
    // =========================================================================

    /// Pick a mode from the home screen and start typing.
    pub fn choose_mode(&mut self, mode: Mode) -> Request {
        self.clear_input();
        self.clear_status();
        self.input_mode = InputMode::Insert;
        Request::SelectMode(mode)
    }

    pub fn choose_highlighted_mode(&mut self) -> Request {
        let mode = MODES[self.home_selection % MODES.len()].mode;
        self.choose_mode(mode)
    }

    pub fn move_home_selection(&mut self, down: bool) {
        let len = MODES.len();
        self.home_selection = if down {
            (self.home_selection + 1) % len
        } else {
            (self.home_selection + len - 1) % len
        };
    }

    pub fn new_session(&mut self) -> Request {
        self.clear_input();
        self.clear_status();
        self.input_mode = InputMode::Normal;
        Request::Reset
    }

    /// Send the input buffer, if the state allows it.
    ///
    /// Rejected input stays in the buffer so it can be fixed.
    pub fn submit(&mut self, state: &SessionState) -> Option<Request> {
        if self.is_waiting(state) {
            self.set_status(InputRejected::Busy.to_string());
            return None;
        }

        match route_input(state, &self.input_buffer, self.subject.as_deref()) {
            Ok(request) => {
                let input = std::mem::take(&mut self.input_buffer);
                self.cursor_position = 0;
                if !input.trim().is_empty() {
                    self.input_history.push_front(input);
                    if self.input_history.len() > HISTORY_LIMIT {
                        self.input_history.pop_back();
                    }
                }
                self.history_index = None;
                self.saved_input = None;
                self.clear_status();
                self.scroll_to_bottom();
                Some(request)
            }
            Err(rejected) => {
                self.set_status(rejected.to_string());
                None
            }
        }
    }

    /// Send story choice or follow-up suggestion `n` (1-based).
    pub fn pick_suggestion(&mut self, state: &SessionState, n: usize) -> Option<Request> {
        let suggestions = match Screen::of(state) {
            Screen::Story => &state.story.choices,
            Screen::Tutor => &state.tutor.follow_ups,
            Screen::Home => return None,
        };
        let text = suggestions.get(n.checked_sub(1)?)?.clone();
        self.set_input(text);
        self.submit(state)
    }

    // =========================================================================
    // Settings overlay
    // =========================================================================

    pub fn open_settings(&mut self) {
        self.overlay = Some(Overlay::Settings {
            field: SettingsField::default(),
            dirty: false,
        });
    }

    pub fn move_settings_field(&mut self, down: bool) {
        if let Some(Overlay::Settings { field, .. }) = &mut self.overlay {
            *field = field.step(down);
        }
    }

    /// Cycle the highlighted preference.
    pub fn cycle_setting(&mut self, state: &SessionState, forward: bool) -> Option<Request> {
        let Some(Overlay::Settings { field, dirty }) = &mut self.overlay else {
            return None;
        };
        let prefs = &state.preferences;
        let patch = match field {
            SettingsField::ContentFilter => PreferencesPatch::default()
                .content_filter(cycle(&ContentFilter::ALL, prefs.content_filter, forward)),
            SettingsField::AgeGroup => PreferencesPatch::default()
                .age_group(cycle(&AgeGroup::ALL, prefs.age_group, forward)),
            SettingsField::StoryLength => PreferencesPatch::default()
                .story_length(cycle(&StoryLength::ALL, prefs.story_length, forward)),
        };
        *dirty = true;
        Some(Request::UpdatePreferences(patch))
    }

    /// Close the settings overlay, pushing changes to a running session.
    pub fn close_settings(&mut self, state: &SessionState) -> Option<Request> {
        let dirty = matches!(self.overlay, Some(Overlay::Settings { dirty: true, .. }));
        self.overlay = None;
        if dirty && state.session_id.is_some() {
            self.set_status("Settings sent to the current session");
            return Some(Request::SyncConfig);
        }
        None
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Enter command mode (starts with :)
    pub fn enter_command_mode(&mut self) {
        self.input_mode = InputMode::Command;
        self.input_buffer.clear();
        self.input_buffer.push(':');
        self.cursor_position = 1;
    }

    /// Exit to normal mode
    pub fn enter_normal_mode(&mut self) {
        self.input_mode = InputMode::Normal;
        if self.input_buffer.starts_with(':') {
            self.clear_input();
        }
    }

    /// Run the command in the buffer and return to normal mode.
    pub fn run_command(&mut self) -> Option<Request> {
        let command = std::mem::take(&mut self.input_buffer);
        self.cursor_position = 0;
        self.input_mode = InputMode::Normal;
        self.process_command(&command)
    }

    /// Process a colon command
    pub fn process_command(&mut self, command: &str) -> Option<Request> {
        let cmd = command.trim().trim_start_matches(':');
        let (name, arg) = match cmd.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (cmd, ""),
        };

        match name {
            "" => None,
            "q" | "quit" | "exit" => {
                self.should_quit = true;
                None
            }
            "new" | "reset" => Some(self.new_session()),
            "mode" => match arg.parse::<Mode>() {
                Ok(mode) => Some(self.choose_mode(mode)),
                Err(e) => {
                    self.set_status(format!("{e} (try :mode story or :mode tutor)"));
                    None
                }
            },
            "filter" => self.patch_from(arg, |f: ContentFilter| {
                PreferencesPatch::default().content_filter(f)
            }),
            "age" => self.patch_from(arg, |a: AgeGroup| PreferencesPatch::default().age_group(a)),
            "length" => self.patch_from(arg, |l: StoryLength| {
                PreferencesPatch::default().story_length(l)
            }),
            "name" => match validate_character_name(arg) {
                Ok(name) => {
                    self.set_status(match &name {
                        Some(name) => format!("Hero name set to {name}"),
                        None => "Hero name cleared".to_string(),
                    });
                    Some(Request::UpdatePreferences(
                        PreferencesPatch::default().character_name(name),
                    ))
                }
                Err(e) => {
                    self.set_status(e.to_string());
                    None
                }
            },
            "subject" => {
                match validate_subject(arg) {
                    Ok(subject) => {
                        self.set_status(match &subject {
                            Some(subject) => format!("Subject set to {subject}"),
                            None => "Subject cleared".to_string(),
                        });
                        self.subject = subject;
                    }
                    Err(e) => self.set_status(e.to_string()),
                }
                None
            }
            "settings" | "set" => {
                self.open_settings();
                None
            }
            "sync" => Some(Request::SyncConfig),
            "info" => Some(Request::RefreshSessionInfo),
            "health" => Some(Request::CheckHealth),
            "help" | "h" => {
                self.toggle_help();
                None
            }
            other => {
                self.set_status(format!("Unknown command: {other}"));
                None
            }
        }
    }

    fn patch_from<T>(&mut self, arg: &str, patch: impl FnOnce(T) -> PreferencesPatch) -> Option<Request>
    where
        T: std::str::FromStr + std::fmt::Display,
        T::Err: std::fmt::Display,
    {
        match arg.parse::<T>() {
            Ok(value) => {
                self.set_status(format!("Set to {value}"));
                Some(Request::UpdatePreferences(patch(value)))
            }
            Err(e) => {
                self.set_status(e.to_string());
                None
            }
        }
    }

    // =========================================================================
    // Scrolling
    // =========================================================================

    /// Scroll transcript to bottom and lock to bottom
    pub fn scroll_to_bottom(&mut self) {
        self.transcript_scroll = self.max_scroll;
        self.scroll_locked_to_bottom = true;
    }

    pub fn scroll_to_top(&mut self) {
        self.transcript_scroll = 0;
        self.scroll_locked_to_bottom = false;
    }

    /// Scroll up (unlocks from bottom)
    pub fn scroll_up(&mut self, lines: usize) {
        self.transcript_scroll = self.transcript_scroll.saturating_sub(lines);
        self.scroll_locked_to_bottom = false;
    }

    /// Scroll down, locking to the bottom once it is reached
    pub fn scroll_down(&mut self, lines: usize) {
        self.transcript_scroll = self.transcript_scroll.saturating_add(lines).min(self.max_scroll);
        if self.transcript_scroll >= self.max_scroll {
            self.scroll_locked_to_bottom = true;
        }
    }

    /// Record how far the transcript can scroll at the current size.
    pub fn set_max_scroll(&mut self, max_scroll: usize) {
        self.max_scroll = max_scroll;
        if self.scroll_locked_to_bottom {
            self.transcript_scroll = max_scroll;
        } else {
            self.transcript_scroll = self.transcript_scroll.min(max_scroll);
        }
    }

    // =========================================================================
    // Input editing
    // =========================================================================

    /// Handle a typed character (unicode-safe)
    pub fn type_char(&mut self, c: char) {
        let byte_pos = self.byte_index(self.cursor_position);
        self.input_buffer.insert(byte_pos, c);
        self.cursor_position += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
            self.remove_at_cursor();
        }
    }

    pub fn delete(&mut self) {
        self.remove_at_cursor();
    }

    fn remove_at_cursor(&mut self) {
        if let Some((byte_pos, ch)) = self.input_buffer.char_indices().nth(self.cursor_position) {
            self.input_buffer
                .replace_range(byte_pos..byte_pos + ch.len_utf8(), "");
        }
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.input_buffer
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.input_buffer.len())
    }

    pub fn cursor_left(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.input_buffer.chars().count();
        self.cursor_position = (self.cursor_position + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.cursor_position = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor_position = self.input_buffer.chars().count();
    }

    /// Navigate to previous input in history
    pub fn history_prev(&mut self) {
        if self.input_history.is_empty() {
            return;
        }

        if self.history_index.is_none() && !self.input_buffer.is_empty() {
            self.saved_input = Some(self.input_buffer.clone());
        }

        let idx = match self.history_index {
            None => 0,
            Some(i) => (i + 1).min(self.input_history.len() - 1),
        };
        if let Some(entry) = self.input_history.get(idx).cloned() {
            self.set_input(entry);
            self.history_index = Some(idx);
        }
    }

    /// Navigate to next input in history
    pub fn history_next(&mut self) {
        match self.history_index {
            None => {}
            Some(0) => {
                let saved = self.saved_input.take().unwrap_or_default();
                self.set_input(saved);
                self.history_index = None;
            }
            Some(i) => {
                if let Some(entry) = self.input_history.get(i - 1).cloned() {
                    self.set_input(entry);
                    self.history_index = Some(i - 1);
                }
            }
        }
    }

    /// Set input buffer content and move cursor to end (unicode-safe)
    pub fn set_input(&mut self, content: impl Into<String>) {
        self.input_buffer = content.into();
        self.cursor_position = self.input_buffer.chars().count();
    }

    pub fn clear_input(&mut self) {
        self.input_buffer.clear();
        self.cursor_position = 0;
    }

    // =========================================================================
    // Overlays, status, animation
    // =========================================================================

    pub fn toggle_help(&mut self) {
        if matches!(self.overlay, Some(Overlay::Help)) {
            self.overlay = None;
        } else {
            self.overlay = Some(Overlay::Help);
        }
    }

    pub fn close_overlay(&mut self) {
        self.overlay = None;
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    pub fn has_overlay(&self) -> bool {
        self.overlay.is_some()
    }

    pub fn tick(&mut self) {
        self.animation_frame = self.animation_frame.wrapping_add(1);
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn input_buffer(&self) -> &str {
        &self.input_buffer
    }

    pub fn cursor_position(&self) -> usize {
        self.cursor_position
    }
}
