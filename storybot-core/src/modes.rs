//! Static descriptors for the two conversation modes.

use storybot_api::Mode;

/// Presentation text for a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeInfo {
    pub mode: Mode,
    pub title: &'static str,
    pub tagline: &'static str,
    pub hotkey: char,
    /// Label above the input box before a session exists.
    pub start_label: &'static str,
    /// Label above the input box once a session is running.
    pub reply_label: &'static str,
    pub placeholder: &'static str,
}

pub const MODES: [ModeInfo; 2] = [
    ModeInfo {
        mode: Mode::Story,
        title: "Story Time",
        tagline: "Make up a story together, one turn at a time.",
        hotkey: 's',
        start_label: "What should the story be about?",
        reply_label: "What happens next?",
        placeholder: "A brave little rabbit who wants to fly...",
    },
    ModeInfo {
        mode: Mode::Tutor,
        title: "Ask the Tutor",
        tagline: "Ask questions about science, math, nature and more.",
        hotkey: 't',
        start_label: "Ask your first question (or leave empty to say hello)",
        reply_label: "Ask another question",
        placeholder: "Why is the sky blue?",
    },
];

/// Descriptor lookup for [`Mode`].
pub trait ModeExt {
    fn info(&self) -> &'static ModeInfo;
}

impl ModeExt for Mode {
    fn info(&self) -> &'static ModeInfo {
        match self {
            Mode::Story => &MODES[0],
            Mode::Tutor => &MODES[1],
        }
    }
}

/// Find a mode by its selection hotkey.
pub fn mode_for_hotkey(key: char) -> Option<Mode> {
    let key = key.to_ascii_lowercase();
    MODES.iter().find(|info| info.hotkey == key).map(|info| info.mode)
}
