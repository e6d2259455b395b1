//! Sidebar with session details and preferences

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use storybot_api::Mode;
use storybot_core::SessionState;

use crate::ui::theme::StoryTheme;

/// Session details, preferences and tutor subject
pub struct SessionPanelWidget<'a> {
    state: &'a SessionState,
    subject: Option<&'a str>,
    theme: &'a StoryTheme,
}

impl<'a> SessionPanelWidget<'a> {
    pub fn new(state: &'a SessionState, theme: &'a StoryTheme) -> Self {
        Self {
            state,
            subject: None,
            theme,
        }
    }

    pub fn subject(mut self, subject: Option<&'a str>) -> Self {
        self.subject = subject;
        self
    }

    fn row(&self, label: &'a str, value: String) -> Line<'a> {
        Line::from(vec![
            Span::styled(format!("{label:<9}"), self.theme.system_style()),
            Span::styled(value, Style::default().fg(self.theme.foreground)),
        ])
    }

    fn heading(&self, text: &'a str) -> Line<'a> {
        Line::from(Span::styled(
            text,
            Style::default().add_modifier(Modifier::UNDERLINED),
        ))
    }
}

impl Widget for SessionPanelWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let state = self.state;
        let prefs = &state.preferences;
        let mut lines = vec![self.heading("Session")];

        match &state.session_id {
            Some(id) => {
                let short: String = id.chars().take(8).collect();
                lines.push(self.row("Id", short));
                lines.push(self.row("Messages", state.message_count.to_string()));
            }
            None => lines.push(Line::from(Span::styled("not started", self.theme.system_style()))),
        }
        if state.mode == Some(Mode::Story) && state.session_id.is_some() {
            lines.push(self.row(
                "Words",
                format!("{} / {}", state.story.word_count, prefs.story_length.word_budget()),
            ));
        }
        if state.mode == Some(Mode::Tutor) {
            if let Some(subject) = &state.tutor.current_subject {
                lines.push(self.row("Topic", subject.clone()));
            }
            if let Some(level) = &state.tutor.educational_level {
                lines.push(self.row("Level", level.clone()));
            }
        }
        if let Some(info) = &state.session_info {
            lines.push(self.row("Active", info.last_accessed.format("%H:%M").to_string()));
            if info.is_expired {
                lines.push(Line::from(Span::styled("expired", self.theme.error_style())));
            }
        }

        lines.push(Line::from(""));
        lines.push(self.heading("Preferences"));
        lines.push(self.row("Ages", prefs.age_group.to_string()));
        lines.push(self.row("Filter", prefs.content_filter.label().to_string()));
        if state.mode != Some(Mode::Tutor) {
            lines.push(self.row("Length", prefs.story_length.to_string()));
            lines.push(self.row(
                "Hero",
                prefs.character_name.clone().unwrap_or_else(|| "-".to_string()),
            ));
        } else {
            lines.push(self.row("Subject", self.subject.unwrap_or("any").to_string()));
        }

        if let Some(description) = state
            .available_filters
            .as_ref()
            .and_then(|f| f.descriptions.get(prefs.content_filter.as_str()))
        {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(description.clone(), self.theme.system_style())));
        }

        let block = Block::default()
            .title(" Session ")
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(false));

        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: true })
            .render(area, buf);
    }
}
