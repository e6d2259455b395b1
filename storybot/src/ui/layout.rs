//! Layout calculations for the Storybot TUI

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Below this width the session panel is hidden.
const SIDEBAR_MIN_WIDTH: u16 = 80;

/// Main layout areas of a conversation screen
pub struct AppLayout {
    pub title_area: Rect,
    pub transcript_area: Rect,
    pub sidebar_area: Option<Rect>,
    pub status_bar: Rect,
    pub hotkey_bar: Rect,
    pub input_area: Rect,
}

impl AppLayout {
    /// Calculate layout based on terminal size
    pub fn calculate(area: Rect) -> Self {
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Title bar
                Constraint::Min(8),    // Transcript (+ sidebar)
                Constraint::Length(1), // Status bar
                Constraint::Length(1), // Hotkey bar
                Constraint::Length(3), // Input area
            ])
            .split(area);

        let (transcript_area, sidebar_area) = if area.width >= SIDEBAR_MIN_WIDTH {
            let content_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
                .split(main_chunks[1]);
            (content_chunks[0], Some(content_chunks[1]))
        } else {
            (main_chunks[1], None)
        };

        Self {
            title_area: main_chunks[0],
            transcript_area,
            sidebar_area,
            status_bar: main_chunks[2],
            hotkey_bar: main_chunks[3],
            input_area: main_chunks[4],
        }
    }
}

/// Layout of the mode selection screen
pub struct HomeLayout {
    pub title_area: Rect,
    pub menu_area: Rect,
    pub status_bar: Rect,
    pub hotkey_bar: Rect,
}

impl HomeLayout {
    pub fn calculate(area: Rect) -> Self {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(10),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(area);

        Self {
            title_area: chunks[0],
            menu_area: chunks[1],
            status_bar: chunks[2],
            hotkey_bar: chunks[3],
        }
    }
}

/// Calculate fixed-size centered popup
pub fn centered_rect_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;

    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
