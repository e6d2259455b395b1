//! Color theme and styling for the Storybot TUI

use ratatui::style::{Color, Modifier, Style};
use storybot_api::Mode;

/// UI color theme
#[derive(Debug, Clone)]
pub struct StoryTheme {
    // Base colors
    pub foreground: Color,
    pub border: Color,
    pub border_focused: Color,

    // Mode accents
    pub story_accent: Color,
    pub tutor_accent: Color,

    // Text colors
    pub child_text: Color,
    pub story_text: Color,
    pub tutor_text: Color,
    pub suggestion_text: Color,
    pub system_text: Color,
    pub error_text: Color,
}

impl Default for StoryTheme {
    fn default() -> Self {
        Self {
            foreground: Color::White,
            border: Color::DarkGray,
            border_focused: Color::Cyan,

            story_accent: Color::Magenta,
            tutor_accent: Color::LightBlue,

            child_text: Color::Cyan,
            story_text: Color::White,
            tutor_text: Color::LightGreen,
            suggestion_text: Color::Yellow,
            system_text: Color::DarkGray,
            error_text: Color::LightRed,
        }
    }
}

impl StoryTheme {
    pub fn accent(&self, mode: Option<Mode>) -> Color {
        match mode {
            Some(Mode::Story) => self.story_accent,
            Some(Mode::Tutor) => self.tutor_accent,
            None => self.border_focused,
        }
    }

    /// Style for what the child typed
    pub fn child_style(&self) -> Style {
        Style::default()
            .fg(self.child_text)
            .add_modifier(Modifier::ITALIC)
    }

    pub fn story_style(&self) -> Style {
        Style::default().fg(self.story_text)
    }

    pub fn tutor_style(&self) -> Style {
        Style::default().fg(self.tutor_text)
    }

    pub fn suggestion_style(&self) -> Style {
        Style::default().fg(self.suggestion_text)
    }

    /// Get style for system messages
    pub fn system_style(&self) -> Style {
        Style::default()
            .fg(self.system_text)
            .add_modifier(Modifier::DIM)
    }

    pub fn error_style(&self) -> Style {
        Style::default()
            .fg(self.error_text)
            .add_modifier(Modifier::BOLD)
    }

    /// Get border style
    pub fn border_style(&self, focused: bool) -> Style {
        Style::default().fg(if focused {
            self.border_focused
        } else {
            self.border
        })
    }

    /// Title in the mode's accent color
    pub fn title_style(&self, mode: Option<Mode>) -> Style {
        Style::default()
            .fg(self.accent(mode))
            .add_modifier(Modifier::BOLD)
    }

    pub fn highlight_style(&self, mode: Option<Mode>) -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(self.accent(mode))
            .add_modifier(Modifier::BOLD)
    }
}
