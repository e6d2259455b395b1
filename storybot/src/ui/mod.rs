//! UI module for the Storybot TUI

pub mod layout;
pub mod render;
pub mod theme;
pub mod widgets;
