//! Input field widget

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::ui::theme::StoryTheme;

/// Split `content` into the text before the cursor, the character under it
/// (a space past the end) and the rest. Counts characters, not bytes.
pub fn split_at_cursor(content: &str, cursor: usize) -> (String, String, String) {
    let before: String = content.chars().take(cursor).collect();
    let at = content
        .chars()
        .nth(cursor)
        .map(|c| c.to_string())
        .unwrap_or_else(|| " ".to_string());
    let after: String = content.chars().skip(cursor + 1).collect();
    (before, at, after)
}

/// Input field widget
pub struct InputWidget<'a> {
    content: &'a str,
    cursor_position: usize,
    theme: &'a StoryTheme,
    label: &'a str,
    placeholder: &'a str,
    limit: Option<usize>,
    is_active: bool,
    is_command_mode: bool,
}

impl<'a> InputWidget<'a> {
    pub fn new(content: &'a str, theme: &'a StoryTheme) -> Self {
        Self {
            content,
            cursor_position: content.chars().count(),
            theme,
            label: "",
            placeholder: "",
            limit: None,
            is_active: true,
            is_command_mode: false,
        }
    }

    pub fn cursor_position(mut self, pos: usize) -> Self {
        self.cursor_position = pos;
        self
    }

    /// Title shown on the input border.
    pub fn label(mut self, label: &'a str) -> Self {
        self.label = label;
        self
    }

    pub fn placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = placeholder;
        self
    }

    /// Show a character counter against this limit.
    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    pub fn command_mode(mut self, is_command: bool) -> Self {
        self.is_command_mode = is_command;
        self
    }
}

impl Widget for InputWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(self.is_active));
        if !self.label.is_empty() && !self.is_command_mode {
            block = block.title(format!(" {} ", self.label));
        }
        if let (Some(limit), false) = (self.limit, self.is_command_mode) {
            let count = self.content.trim().chars().count();
            let style = if count > limit {
                self.theme.error_style()
            } else {
                self.theme.system_style()
            };
            block = block.title_bottom(
                Line::from(Span::styled(format!(" {count}/{limit} "), style)).right_aligned(),
            );
        }

        let inner = block.inner(area);
        block.render(area, buf);

        let line = if self.content.is_empty() && !self.is_command_mode {
            Line::from(vec![
                Span::styled("> ", self.theme.child_style()),
                Span::styled(
                    self.placeholder,
                    Style::default().add_modifier(Modifier::DIM),
                ),
            ])
        } else {
            let prefix = if self.is_command_mode { ":" } else { "> " };
            let (display_content, cursor) = match self.content.strip_prefix(':') {
                Some(rest) if self.is_command_mode => (rest, self.cursor_position.saturating_sub(1)),
                _ => (self.content, self.cursor_position),
            };
            let (before, at, after) = split_at_cursor(display_content, cursor);

            let mut spans = vec![Span::styled(prefix, self.theme.child_style()), Span::raw(before)];
            if self.is_active {
                spans.push(Span::styled(
                    at,
                    Style::default()
                        .add_modifier(Modifier::UNDERLINED | Modifier::BOLD)
                        .fg(self.theme.child_text),
                ));
            } else {
                spans.push(Span::raw(at));
            }
            spans.push(Span::raw(after));
            Line::from(spans)
        };

        Paragraph::new(line).render(inner, buf);
    }
}
