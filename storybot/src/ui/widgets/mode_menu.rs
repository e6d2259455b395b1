//! Mode selection menu shown on the home screen

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use storybot_api::HealthStatus;
use storybot_core::{SessionState, MODES};

use crate::ui::theme::StoryTheme;

pub struct ModeMenuWidget<'a> {
    state: &'a SessionState,
    selected: usize,
    theme: &'a StoryTheme,
}

impl<'a> ModeMenuWidget<'a> {
    pub fn new(state: &'a SessionState, selected: usize, theme: &'a StoryTheme) -> Self {
        Self {
            state,
            selected,
            theme,
        }
    }
}

impl Widget for ModeMenuWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                "What would you like to do today?",
                self.theme.title_style(None),
            )),
            Line::from(""),
        ];

        for (i, info) in MODES.iter().enumerate() {
            let selected = i == self.selected % MODES.len();
            let label = format!(" [{}] {} ", info.hotkey, info.title);
            let style = if selected {
                self.theme.highlight_style(Some(info.mode))
            } else {
                self.theme.title_style(Some(info.mode))
            };
            lines.push(Line::from(Span::styled(label, style)));
            lines.push(Line::from(Span::styled(info.tagline, self.theme.system_style())));
            lines.push(Line::from(""));
        }

        if let Some(health) = &self.state.health {
            if health.status == HealthStatus::Unhealthy {
                lines.push(Line::from(Span::styled(
                    "The story server is having trouble right now.",
                    self.theme.error_style(),
                )));
            }
        }
        if let Some(error) = &self.state.error {
            lines.push(Line::from(Span::styled(
                format!("Oops! {error}"),
                self.theme.error_style(),
            )));
        }
        if self.state.is_loading() {
            lines.push(Line::from(Span::styled(
                "Loading...",
                self.theme.system_style().add_modifier(Modifier::ITALIC),
            )));
        }

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(true));

        Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(area, buf);
    }
}
