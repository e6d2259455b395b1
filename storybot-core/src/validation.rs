//! Input checks the views run before dispatching an intent.
//!
//! Limits mirror what the backend accepts, so a rejected input never costs a
//! round trip. All lengths are counted in characters after trimming.

use thiserror::Error;

pub const MAX_PROMPT_CHARS: usize = 500;
pub const MAX_STORY_INPUT_CHARS: usize = 500;
pub const MAX_QUESTION_CHARS: usize = 500;
pub const MAX_CHARACTER_NAME_CHARS: usize = 50;
pub const MAX_SUBJECT_CHARS: usize = 100;
pub const MAX_SUBJECT_HINT_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    #[error("{field} is too long ({len} characters, at most {max})")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
}

fn required(field: &'static str, text: &str, max: usize) -> Result<String, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    within_limit(field, trimmed, max)
}

fn optional(field: &'static str, text: &str, max: usize) -> Result<Option<String>, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    within_limit(field, trimmed, max).map(Some)
}

fn within_limit(field: &'static str, text: &str, max: usize) -> Result<String, ValidationError> {
    let len = text.chars().count();
    if len > max {
        return Err(ValidationError::TooLong { field, len, max });
    }
    Ok(text.to_string())
}

/// Opening prompt for a new story.
pub fn validate_prompt(prompt: &str) -> Result<String, ValidationError> {
    required("Story idea", prompt, MAX_PROMPT_CHARS)
}

/// A reply in a running story.
pub fn validate_story_input(input: &str) -> Result<String, ValidationError> {
    required("Your idea", input, MAX_STORY_INPUT_CHARS)
}

pub fn validate_question(question: &str) -> Result<String, ValidationError> {
    required("Question", question, MAX_QUESTION_CHARS)
}

/// Empty input clears the name.
pub fn validate_character_name(name: &str) -> Result<Option<String>, ValidationError> {
    optional("Character name", name, MAX_CHARACTER_NAME_CHARS)
}

/// Subject for a tutor start. Empty means none.
pub fn validate_subject(subject: &str) -> Result<Option<String>, ValidationError> {
    optional("Subject", subject, MAX_SUBJECT_CHARS)
}

/// Subject hint sent along with a question. Tighter than a start subject.
pub fn validate_subject_hint(hint: &str) -> Result<Option<String>, ValidationError> {
    optional("Subject hint", hint, MAX_SUBJECT_HINT_CHARS)
}
