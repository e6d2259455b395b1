//! Status bar widget

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use storybot_api::{HealthStatus, Mode};
use storybot_core::{ModeExt, SessionState};

use crate::app::{InputMode, Screen};
use crate::ui::theme::StoryTheme;

/// Status bar widget showing mode, preferences and connection
pub struct StatusBarWidget<'a> {
    state: &'a SessionState,
    input_mode: InputMode,
    theme: &'a StoryTheme,
    message: Option<&'a str>,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(state: &'a SessionState, input_mode: InputMode, theme: &'a StoryTheme) -> Self {
        Self {
            state,
            input_mode,
            theme,
            message: None,
        }
    }

    pub fn message(mut self, message: Option<&'a str>) -> Self {
        self.message = message;
        self
    }
}

impl Widget for StatusBarWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (input_mode_text, input_mode_style) = match self.input_mode {
            InputMode::Normal => ("NORMAL", Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD)),
            InputMode::Insert => ("INSERT", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            InputMode::Command => ("COMMAND", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        };

        let mode_text = match self.state.mode {
            Some(mode) if !self.state.show_mode_selection => mode.info().title,
            _ => "Choose a mode",
        };

        let prefs = &self.state.preferences;
        let (health_text, health_style) = match self.state.health.as_ref().map(|h| h.status) {
            Some(HealthStatus::Healthy) => ("● online", Style::default().fg(Color::Green)),
            Some(HealthStatus::Unhealthy) => ("● unhealthy", Style::default().fg(Color::Red)),
            None => ("○ offline?", self.theme.system_style()),
        };

        let mut spans = vec![
            Span::styled(format!("-- {input_mode_text} --"), input_mode_style),
            Span::raw(" | "),
            Span::styled(mode_text, self.theme.title_style(self.state.mode)),
            Span::raw(" | "),
            Span::styled(
                format!("ages {} · {}", prefs.age_group, prefs.content_filter.label()),
                self.theme.system_style(),
            ),
            Span::raw(" | "),
            Span::styled(health_text, health_style),
        ];

        if let Some(msg) = self.message {
            spans.push(Span::raw(" | "));
            spans.push(Span::styled(msg, Style::default().add_modifier(Modifier::DIM)));
        }

        Paragraph::new(Line::from(spans)).render(area, buf);
    }
}

/// Hotkey bar widget
pub struct HotkeyBarWidget<'a> {
    screen: Screen,
    input_mode: InputMode,
    has_suggestions: bool,
    has_error: bool,
    theme: &'a StoryTheme,
}

impl<'a> HotkeyBarWidget<'a> {
    pub fn new(state: &SessionState, input_mode: InputMode, theme: &'a StoryTheme) -> Self {
        let has_suggestions = match state.mode {
            Some(Mode::Story) => !state.story.choices.is_empty(),
            Some(Mode::Tutor) => !state.tutor.follow_ups.is_empty(),
            None => false,
        };
        Self {
            screen: Screen::of(state),
            input_mode,
            has_suggestions,
            has_error: state.error.is_some(),
            theme,
        }
    }

    fn hotkeys(&self) -> Vec<(&'static str, bool)> {
        let mut hotkeys = match (self.input_mode, self.screen) {
            (InputMode::Normal, Screen::Home) => vec![
                ("s:story", true),
                ("t:tutor", true),
                ("j/k:move", false),
                (",:settings", false),
                ("?:help", false),
                ("q:quit", false),
            ],
            (InputMode::Normal, _) => {
                let mut keys = vec![("i:type", true)];
                if self.has_suggestions {
                    keys.push(("1-9:pick", true));
                }
                keys.extend([
                    ("n:new", true),
                    ("m:switch", false),
                    ("j/k:scroll", false),
                    (",:settings", false),
                    ("?:help", false),
                ]);
                keys
            }
            (InputMode::Insert, _) => vec![
                ("Esc:normal", true),
                ("Enter:send", true),
                ("↑↓:history", false),
            ],
            (InputMode::Command, _) => vec![
                ("Esc:cancel", true),
                ("Enter:run", true),
                (":new", false),
                (":age 9-12", false),
                (":help", false),
            ],
        };
        if self.has_error && self.input_mode == InputMode::Normal {
            hotkeys.insert(0, ("e:dismiss error", true));
        }
        hotkeys
    }
}

impl Widget for HotkeyBarWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let spans: Vec<Span> = self
            .hotkeys()
            .into_iter()
            .flat_map(|(text, primary)| {
                let style = if primary {
                    Style::default()
                } else {
                    self.theme.system_style()
                };
                [Span::styled(text, style), Span::raw("  ")]
            })
            .collect();

        Paragraph::new(Line::from(spans)).render(area, buf);
    }
}
