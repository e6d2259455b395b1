//! What the views ask the store to do.
//!
//! Both front ends turn keystrokes or lines into a [`Request`], then hand it
//! to [`execute`]. Routing free text depends on the current mode and on
//! whether a session exists yet, so it lives here rather than in each view.

use storybot_api::Mode;
use storybot_core::validation::{
    validate_prompt, validate_question, validate_story_input, validate_subject_hint,
    ValidationError,
};
use storybot_core::{Backend, PreferencesPatch, SessionState, SessionStore, StoreError};

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    SelectMode(Mode),
    StartStory(String),
    ContinueStory(String),
    StartTutor {
        question: Option<String>,
        subject: Option<String>,
    },
    AskQuestion {
        question: String,
        subject_hint: Option<String>,
    },
    UpdatePreferences(PreferencesPatch),
    SyncConfig,
    RefreshSessionInfo,
    CheckHealth,
    LoadFilters,
    LoadSubjects,
    Reset,
    ClearError,
}

impl Request {
    /// True for requests that wait on story or answer generation.
    pub fn generates(&self) -> bool {
        matches!(
            self,
            Request::StartStory(_)
                | Request::ContinueStory(_)
                | Request::StartTutor { .. }
                | Request::AskQuestion { .. }
        )
    }
}

/// Why free text could not be turned into a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputRejected {
    NoMode,
    Busy,
    StoryFinished,
    Invalid(ValidationError),
}

impl std::fmt::Display for InputRejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputRejected::NoMode => f.write_str("Pick story or tutor mode first"),
            InputRejected::Busy => f.write_str("Still thinking, please wait..."),
            InputRejected::StoryFinished => {
                f.write_str("The story is finished! Start a new one to keep going")
            }
            InputRejected::Invalid(e) => write!(f, "{e}"),
        }
    }
}

/// Decide what typed text means in the current state.
///
/// A story without a session treats the text as the opening prompt; a tutor
/// without a session starts with it as the first question, and empty text
/// just says hello.
pub fn route_input(
    state: &SessionState,
    text: &str,
    subject: Option<&str>,
) -> Result<Request, InputRejected> {
    if state.is_generating {
        return Err(InputRejected::Busy);
    }
    let subject = subject.map(str::to_string);

    match state.mode {
        None => Err(InputRejected::NoMode),
        Some(Mode::Story) if state.session_id.is_none() => validate_prompt(text)
            .map(Request::StartStory)
            .map_err(InputRejected::Invalid),
        Some(Mode::Story) if state.story.is_complete => Err(InputRejected::StoryFinished),
        Some(Mode::Story) => validate_story_input(text)
            .map(Request::ContinueStory)
            .map_err(InputRejected::Invalid),
        Some(Mode::Tutor) if state.session_id.is_none() => {
            let question = if text.trim().is_empty() {
                None
            } else {
                Some(validate_question(text).map_err(InputRejected::Invalid)?)
            };
            Ok(Request::StartTutor { question, subject })
        }
        Some(Mode::Tutor) => {
            let question = validate_question(text).map_err(InputRejected::Invalid)?;
            let subject_hint = match subject {
                Some(subject) => validate_subject_hint(&subject).map_err(InputRejected::Invalid)?,
                None => None,
            };
            Ok(Request::AskQuestion {
                question,
                subject_hint,
            })
        }
    }
}

/// Apply requests that never touch the network, in order, right away.
/// Anything else is handed back.
pub fn apply_local<B: Backend>(store: &SessionStore<B>, request: Request) -> Option<Request> {
    match request {
        Request::SelectMode(mode) => store.set_mode(mode),
        Request::UpdatePreferences(patch) => store.set_config(patch),
        Request::Reset => store.reset_session(),
        Request::ClearError => store.clear_error(),
        other => return Some(other),
    }
    None
}

/// Run a request against the store.
pub async fn execute<B: Backend>(
    store: &SessionStore<B>,
    request: Request,
) -> Result<(), StoreError> {
    let Some(request) = apply_local(store, request) else {
        return Ok(());
    };

    tracing::debug!(?request, "executing request");
    match request {
        Request::StartStory(prompt) => store.start_story(prompt).await?,
        Request::ContinueStory(input) => store.continue_story(input).await?,
        Request::StartTutor { question, subject } => store.start_tutor(question, subject).await?,
        Request::AskQuestion {
            question,
            subject_hint,
        } => store.ask_question(question, subject_hint).await?,
        Request::SyncConfig => store.sync_config().await?,
        Request::RefreshSessionInfo => store.refresh_session_info().await?,
        Request::CheckHealth => store.check_health().await?,
        Request::LoadFilters => store.load_filters().await?,
        Request::LoadSubjects => store.load_subjects().await?,
        Request::SelectMode(_)
        | Request::UpdatePreferences(_)
        | Request::Reset
        | Request::ClearError => {}
    }
    Ok(())
}
