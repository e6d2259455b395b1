//! Render orchestration for the Storybot TUI

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use storybot_api::{AgeGroup, ContentFilter, Mode, StoryLength};
use storybot_core::validation::{MAX_PROMPT_CHARS, MAX_QUESTION_CHARS, MAX_STORY_INPUT_CHARS};
use storybot_core::{ModeExt, SessionState};

use crate::app::{App, InputMode, Overlay, Screen, SettingsField};
use crate::ui::layout::{centered_rect_fixed, AppLayout, HomeLayout};
use crate::ui::widgets::{
    HotkeyBarWidget, InputWidget, ModeMenuWidget, SessionPanelWidget, StatusBarWidget,
    TranscriptWidget,
};

/// Main render function
pub fn render(frame: &mut Frame, app: &mut App, state: &SessionState) {
    let area = frame.area();

    match Screen::of(state) {
        Screen::Home => render_home(frame, app, state, area),
        Screen::Story | Screen::Tutor => render_conversation(frame, app, state, area),
    }

    if let Some(overlay) = app.overlay() {
        render_overlay(frame, app, state, overlay, area);
    }
}

fn render_home(frame: &mut Frame, app: &App, state: &SessionState, area: Rect) {
    let layout = HomeLayout::calculate(area);

    render_title_bar(frame, app, state, layout.title_area);
    frame.render_widget(
        ModeMenuWidget::new(state, app.home_selection, &app.theme),
        layout.menu_area,
    );
    render_status_bar(frame, app, state, layout.status_bar);
    frame.render_widget(
        HotkeyBarWidget::new(state, app.input_mode, &app.theme),
        layout.hotkey_bar,
    );

    // Command line borrows the status bar row on the home screen
    if app.input_mode == InputMode::Command {
        let line = Line::from(Span::raw(app.input_buffer()));
        frame.render_widget(Clear, layout.status_bar);
        frame.render_widget(Paragraph::new(line), layout.status_bar);
    }
}

fn render_conversation(frame: &mut Frame, app: &mut App, state: &SessionState, area: Rect) {
    let layout = AppLayout::calculate(area);

    render_title_bar(frame, app, state, layout.title_area);

    let waiting = app.is_waiting(state);
    let max_scroll = TranscriptWidget::new(state, &app.theme)
        .waiting(waiting, app.animation_frame)
        .max_scroll(layout.transcript_area);
    app.set_max_scroll(max_scroll);

    let transcript = TranscriptWidget::new(state, &app.theme)
        .scroll(app.transcript_scroll)
        .waiting(waiting, app.animation_frame);
    frame.render_widget(transcript, layout.transcript_area);

    if let Some(sidebar) = layout.sidebar_area {
        let panel = SessionPanelWidget::new(state, &app.theme).subject(app.subject.as_deref());
        frame.render_widget(panel, sidebar);
    }

    render_status_bar(frame, app, state, layout.status_bar);
    frame.render_widget(
        HotkeyBarWidget::new(state, app.input_mode, &app.theme),
        layout.hotkey_bar,
    );
    render_input(frame, app, state, layout.input_area);
}

/// Render the title bar
fn render_title_bar(frame: &mut Frame, app: &App, state: &SessionState, area: Rect) {
    let title = match state.mode {
        Some(mode) if !state.show_mode_selection => {
            let mut title = format!(" Storybot · {} ", mode.info().title);
            if let (Mode::Story, Some(name)) = (mode, &state.preferences.character_name) {
                title.push_str(&format!("· starring {name} "));
            }
            title
        }
        _ => " Storybot ".to_string(),
    };

    let line = Line::from(Span::styled(title, app.theme.title_style(state.mode)));
    frame.render_widget(Paragraph::new(line), area);
}

/// Render the status bar
fn render_status_bar(frame: &mut Frame, app: &App, state: &SessionState, area: Rect) {
    let status_widget =
        StatusBarWidget::new(state, app.input_mode, &app.theme).message(app.status_message());
    frame.render_widget(status_widget, area);
}

/// Render the input area
fn render_input(frame: &mut Frame, app: &App, state: &SessionState, area: Rect) {
    let is_active = matches!(app.input_mode, InputMode::Insert | InputMode::Command);
    let is_command = matches!(app.input_mode, InputMode::Command);
    let has_session = state.session_id.is_some();

    let (label, placeholder, limit) = match state.mode {
        Some(mode) => {
            let info = mode.info();
            let label = if has_session { info.reply_label } else { info.start_label };
            let limit = match (mode, has_session) {
                (Mode::Story, false) => MAX_PROMPT_CHARS,
                (Mode::Story, true) => MAX_STORY_INPUT_CHARS,
                (Mode::Tutor, _) => MAX_QUESTION_CHARS,
            };
            (label, info.placeholder, Some(limit))
        }
        None => ("", "", None),
    };

    let placeholder = if app.is_waiting(state) {
        "Thinking..."
    } else if state.story.is_complete && state.mode == Some(Mode::Story) {
        "The End! Press n for a new story"
    } else if app.input_mode == InputMode::Normal {
        "Press i to start typing"
    } else {
        placeholder
    };

    let input_widget = InputWidget::new(app.input_buffer(), &app.theme)
        .cursor_position(app.cursor_position())
        .label(label)
        .placeholder(placeholder)
        .limit(limit)
        .active(is_active)
        .command_mode(is_command);

    frame.render_widget(input_widget, area);
}

/// Render overlay
fn render_overlay(frame: &mut Frame, app: &App, state: &SessionState, overlay: &Overlay, area: Rect) {
    match overlay {
        Overlay::Help => render_help_overlay(frame, app, area),
        Overlay::Settings { field, .. } => render_settings_overlay(frame, app, state, *field, area),
    }
}

fn section(title: &str) -> Line<'_> {
    Line::from(Span::styled(
        title,
        Style::default().add_modifier(Modifier::UNDERLINED),
    ))
}

/// Render help overlay
fn render_help_overlay(frame: &mut Frame, app: &App, area: Rect) {
    let popup_area = centered_rect_fixed(58, 30, area);
    frame.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(Span::styled(
            " Storybot - Help ",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        section("Modes:"),
        Line::from("  s / t       Story time / Ask the tutor (home screen)"),
        Line::from("  m           Switch to the other mode"),
        Line::from("  n           New session (back to the home screen)"),
        Line::from(""),
        section("Typing:"),
        Line::from("  i or Enter  Start typing, Enter sends"),
        Line::from("  Esc         Stop typing"),
        Line::from("  1-9         Pick a story choice or follow-up"),
        Line::from(""),
        section("Reading:"),
        Line::from("  j/k, ↑/↓    Scroll"),
        Line::from("  PgUp/PgDn   Scroll by page"),
        Line::from("  g/G         Jump to top/bottom"),
        Line::from(""),
        section("Commands:"),
        Line::from("  :age 3-5|6-8|9-12      :filter moral|educational|fun"),
        Line::from("  :length short|medium|long  :name [hero]"),
        Line::from("  :subject [topic]       :sync  :info  :health"),
        Line::from("  :mode story|tutor      :new   :q"),
        Line::from(""),
        Line::from("  ,           Settings"),
        Line::from("  e           Dismiss an error"),
        Line::from("  q           Quit"),
        Line::from(""),
        Line::from(Span::styled(
            "Press Esc or q to close",
            Style::default().add_modifier(Modifier::DIM),
        )),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(app.theme.border_style(true));

    let paragraph = Paragraph::new(help_text)
        .block(block)
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, popup_area);
}

fn setting_value(state: &SessionState, field: SettingsField) -> String {
    let prefs = &state.preferences;
    match field {
        SettingsField::ContentFilter => prefs.content_filter.label().to_string(),
        SettingsField::AgeGroup => format!("ages {}", prefs.age_group),
        SettingsField::StoryLength => {
            format!("{} (~{} words)", prefs.story_length, prefs.story_length.word_budget())
        }
    }
}

fn setting_choices(field: SettingsField) -> String {
    match field {
        SettingsField::ContentFilter => ContentFilter::ALL.map(|f| f.label()).join(" / "),
        SettingsField::AgeGroup => AgeGroup::ALL.map(|a| a.as_str()).join(" / "),
        SettingsField::StoryLength => StoryLength::ALL.map(|l| l.as_str()).join(" / "),
    }
}

/// Render preferences overlay
fn render_settings_overlay(
    frame: &mut Frame,
    app: &App,
    state: &SessionState,
    selected: SettingsField,
    area: Rect,
) {
    let popup_area = centered_rect_fixed(56, 14, area);
    frame.render_widget(Clear, popup_area);

    let mut lines = vec![Line::from("")];
    for field in SettingsField::ALL {
        let is_selected = field == selected;
        let marker = if is_selected { "▶ " } else { "  " };
        let value_style = if is_selected {
            app.theme.highlight_style(state.mode)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::raw(marker),
            Span::styled(format!("{:<16}", field.label()), Style::default()),
            Span::styled(format!(" ◀ {} ▶ ", setting_value(state, field)), value_style),
        ]));
        if is_selected {
            lines.push(Line::from(Span::styled(
                format!("    {}", setting_choices(field)),
                app.theme.system_style(),
            )));
        }
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "j/k choose · h/l change · Esc done",
        app.theme.system_style(),
    )));
    if state.session_id.is_some() {
        lines.push(Line::from(Span::styled(
            "Changes are sent to the current session when you close this.",
            app.theme.system_style(),
        )));
    }

    let block = Block::default()
        .title(" Settings ")
        .borders(Borders::ALL)
        .border_style(app.theme.border_style(true));

    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        popup_area,
    );
}
