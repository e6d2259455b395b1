//! Conversation transcript widget

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    symbols::scrollbar,
    text::{Line, Span},
    widgets::{
        Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState,
        StatefulWidget, Widget, Wrap,
    },
};

use storybot_api::Mode;
use storybot_core::{ModeExt, SessionState};

use crate::ui::theme::StoryTheme;

const SPINNER: [char; 8] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧'];

/// Widget for the story or tutoring transcript
pub struct TranscriptWidget<'a> {
    state: &'a SessionState,
    theme: &'a StoryTheme,
    scroll: usize,
    waiting: bool,
    frame: u8,
}

impl<'a> TranscriptWidget<'a> {
    pub fn new(state: &'a SessionState, theme: &'a StoryTheme) -> Self {
        Self {
            state,
            theme,
            scroll: 0,
            waiting: false,
            frame: 0,
        }
    }

    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }

    /// Show a spinner at the end while a reply is being generated.
    pub fn waiting(mut self, waiting: bool, frame: u8) -> Self {
        self.waiting = waiting;
        self.frame = frame;
        self
    }

    fn block(&self) -> Block<'a> {
        let title = match self.state.mode {
            Some(mode) => format!(" {} ", mode.info().title),
            None => " Storybot ".to_string(),
        };
        Block::default()
            .title(Span::styled(title, self.theme.title_style(self.state.mode)))
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(false))
    }

    /// How far the transcript can scroll when drawn into `area`.
    pub fn max_scroll(&self, area: Rect) -> usize {
        let inner = self.block().inner(area);
        let lines = self.lines();
        wrapped_height(&lines, inner.width).saturating_sub(inner.height as usize)
    }

    pub fn lines(&self) -> Vec<Line<'a>> {
        let spinner = self
            .waiting
            .then(|| SPINNER[self.frame as usize % SPINNER.len()]);
        transcript_lines(self.state, self.theme, spinner)
    }
}

/// Rows the lines occupy once wrapped to `width` columns.
fn wrapped_height(lines: &[Line<'_>], width: u16) -> usize {
    let width = width.max(1) as usize;
    lines
        .iter()
        .map(|line| line.width().max(1).div_ceil(width))
        .sum()
}

fn push_paragraphs<'a>(lines: &mut Vec<Line<'a>>, text: &'a str, style: Style) {
    for line in text.lines() {
        lines.push(Line::from(Span::styled(line, style)));
    }
}

fn push_suggestions<'a>(lines: &mut Vec<Line<'a>>, heading: &'a str, items: &'a [String], theme: &StoryTheme) {
    if items.is_empty() {
        return;
    }
    lines.push(Line::from(Span::styled(heading, theme.system_style())));
    for (i, item) in items.iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(format!("  [{}] ", i + 1), theme.suggestion_style().add_modifier(Modifier::BOLD)),
            Span::styled(item.as_str(), theme.suggestion_style()),
        ]));
    }
    lines.push(Line::from(""));
}

/// Build the transcript lines for the current mode.
pub fn transcript_lines<'a>(
    state: &'a SessionState,
    theme: &StoryTheme,
    spinner: Option<char>,
) -> Vec<Line<'a>> {
    let mut lines: Vec<Line<'a>> = Vec::new();

    match state.mode {
        None => {}
        Some(mode) if state.session_id.is_none() && !state.is_generating => {
            let info = mode.info();
            lines.push(Line::from(Span::styled(info.tagline, theme.system_style())));
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                match mode {
                    Mode::Story => "Type an idea for a story and press Enter to begin.",
                    Mode::Tutor => "Ask a question, or press Enter on an empty line to say hello.",
                },
                theme.system_style(),
            )));
            if let (Mode::Tutor, Some(subjects)) = (mode, &state.available_subjects) {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    format!("Subjects: {}", subjects.available_subjects.join(", ")),
                    theme.system_style(),
                )));
                let examples = subjects.example_questions.values().flatten().take(3);
                for example in examples {
                    lines.push(Line::from(Span::styled(
                        format!("  e.g. {example}"),
                        theme.suggestion_style(),
                    )));
                }
            }
            lines.push(Line::from(""));
        }
        Some(Mode::Story) => {
            for (input, segment) in state.story.turns() {
                if let Some(input) = input {
                    lines.push(Line::from(vec![
                        Span::styled("You: ", theme.child_style().add_modifier(Modifier::BOLD)),
                        Span::styled(input, theme.child_style()),
                    ]));
                    lines.push(Line::from(""));
                }
                push_paragraphs(&mut lines, segment, theme.story_style());
                lines.push(Line::from(""));
            }
            if state.story.is_complete {
                lines.push(Line::from(Span::styled(
                    format!("~ The End ~  ({} words)", state.story.word_count),
                    theme.title_style(Some(Mode::Story)),
                )));
                lines.push(Line::from(""));
            } else {
                push_suggestions(&mut lines, "What happens next?", &state.story.choices, theme);
            }
        }
        Some(Mode::Tutor) => {
            for (question, answer) in state.tutor.exchanges() {
                if let Some(question) = question {
                    lines.push(Line::from(vec![
                        Span::styled("You asked: ", theme.child_style().add_modifier(Modifier::BOLD)),
                        Span::styled(question, theme.child_style()),
                    ]));
                    lines.push(Line::from(""));
                }
                push_paragraphs(&mut lines, answer, theme.tutor_style());
                lines.push(Line::from(""));
            }
            if !state.tutor.is_appropriate {
                lines.push(Line::from(Span::styled(
                    "Let's try a different question!",
                    theme.suggestion_style().add_modifier(Modifier::ITALIC),
                )));
                lines.push(Line::from(""));
            }
            push_suggestions(&mut lines, "You could also ask:", &state.tutor.follow_ups, theme);
        }
    }

    if let Some(spin) = spinner {
        let who = match state.mode {
            Some(Mode::Tutor) => "The tutor is thinking",
            _ => "The storyteller is thinking",
        };
        lines.push(Line::from(Span::styled(
            format!("{spin} {who}..."),
            theme.system_style(),
        )));
    }

    if let Some(error) = &state.error {
        lines.push(Line::from(vec![
            Span::styled(format!("Oops! {error}"), theme.error_style()),
            Span::styled("  (e to dismiss)", theme.system_style()),
        ]));
    }

    lines
}

impl Widget for TranscriptWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = self.block();
        let inner = block.inner(area);
        block.render(area, buf);

        let lines = self.lines();
        let visible_height = inner.height as usize;
        let total_lines = wrapped_height(&lines, inner.width);
        let max_scroll = total_lines.saturating_sub(visible_height);
        let scroll = self.scroll.min(max_scroll);

        Paragraph::new(lines)
            .scroll((scroll.min(u16::MAX as usize) as u16, 0))
            .wrap(Wrap { trim: false })
            .render(inner, buf);

        if total_lines > visible_height {
            let scrollbar_area = Rect {
                x: inner.x + inner.width.saturating_sub(1),
                y: inner.y,
                width: 1,
                height: inner.height,
            };

            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .symbols(scrollbar::VERTICAL)
                .thumb_style(Style::default().fg(Color::DarkGray))
                .track_style(Style::default().fg(Color::Black))
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"));

            let mut scrollbar_state = ScrollbarState::new(max_scroll).position(scroll);
            scrollbar.render(scrollbar_area, buf, &mut scrollbar_state);

            // Hint at the bottom while there is more below
            if scroll < max_scroll {
                let hint = format!(" ↓{} more ", max_scroll - scroll);
                let hint_y = inner.y + inner.height.saturating_sub(1);
                let hint_style = Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM);
                for (i, ch) in hint.chars().enumerate() {
                    let x = inner.x + i as u16;
                    if x < inner.x + inner.width.saturating_sub(2) {
                        buf[(x, hint_y)].set_char(ch).set_style(hint_style);
                    }
                }
            }
        }
    }
}
