//! TUI widgets for Storybot

pub mod input;
pub mod mode_menu;
pub mod session_panel;
pub mod status_bar;
pub mod transcript;

pub use input::InputWidget;
pub use mode_menu::ModeMenuWidget;
pub use session_panel::SessionPanelWidget;
pub use status_bar::{HotkeyBarWidget, StatusBarWidget};
pub use transcript::TranscriptWidget;
