//! The session store: one observable state container shared by every view.
//!
//! State lives inside a [`tokio::sync::watch`] channel. Intents run the
//! reducer through `send_modify`, so subscribers are woken after every
//! change and no borrow is ever held across an `.await`.
//!
//! Requests capture the state's epoch when they are issued. Starting a new
//! session, switching mode and resetting all bump the epoch, and a response
//! that comes back under an older epoch is dropped instead of applied. A
//! dropped metadata response still releases its loading slot.

use std::sync::Arc;

use storybot_api::{
    ConfigRequest, Mode, StoryContinueRequest, StoryStartRequest, TutorAskRequest,
    TutorStartRequest,
};
use thiserror::Error;
use tokio::sync::watch;

use crate::backend::Backend;
use crate::state::{Action, Preferences, PreferencesPatch, SessionState};

/// Errors returned by store intents.
///
/// Whatever the variant, the store has already recorded the user-facing
/// message in [`SessionState::error`] (except for [`StoreError::Superseded`],
/// whose outcome is dropped entirely).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No active {mode} session. Start one first.")]
    NoActiveSession { mode: Mode },

    #[error("{}", .0.user_message())]
    Api(#[from] storybot_api::Error),

    #[error("the session changed before the response arrived")]
    Superseded,
}

/// What a request needs to know about the state it was issued under.
#[derive(Debug, Default)]
struct Ticket {
    epoch: u64,
    preferences: Preferences,
}

impl Ticket {
    fn of(state: &SessionState) -> Self {
        Self {
            epoch: state.epoch,
            preferences: state.preferences.clone(),
        }
    }
}

/// Which busy flag a request holds until it settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hold {
    Generating,
    Loading,
}

/// Whether a response should be checked against the issuing epoch.
#[derive(Debug, Clone, Copy)]
enum Fence {
    Epoch(u64),
    /// Option catalogues and health are not tied to a session.
    None,
}

/// Shared session store. Cloning is cheap and every clone sees the same state.
pub struct SessionStore<B> {
    backend: Arc<B>,
    state: Arc<watch::Sender<SessionState>>,
}

impl<B> Clone for SessionStore<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            state: Arc::clone(&self.state),
        }
    }
}

impl<B: Backend> SessionStore<B> {
    pub fn new(backend: B) -> Self {
        Self::with_preferences(backend, Preferences::default())
    }

    /// Create a store whose configuration starts from `preferences`.
    pub fn with_preferences(backend: B, preferences: Preferences) -> Self {
        let (sender, _) = watch::channel(SessionState::with_preferences(preferences));
        Self {
            backend: Arc::new(backend),
            state: Arc::new(sender),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver that is notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    // ------------------------------------------------------------------------
    // Local intents
    // ------------------------------------------------------------------------

    /// Switch conversation kind. Drops the current conversation but keeps
    /// preferences and option caches.
    pub fn set_mode(&self, mode: Mode) {
        self.dispatch(Action::SetMode(mode));
    }

    /// Discard the session and go back to mode selection.
    pub fn reset_session(&self) {
        self.dispatch(Action::Reset);
    }

    /// Merge `patch` into the preferences. Takes effect on the next request.
    pub fn set_config(&self, patch: PreferencesPatch) {
        if patch.is_empty() {
            return;
        }
        self.dispatch(Action::UpdatePreferences(patch));
    }

    pub fn clear_error(&self) {
        if self.state.borrow().error.is_some() {
            self.dispatch(Action::ClearError);
        }
    }

    // ------------------------------------------------------------------------
    // Story
    // ------------------------------------------------------------------------

    /// Start a new story from `prompt` using the current preferences.
    pub async fn start_story(&self, prompt: impl Into<String>) -> Result<(), StoreError> {
        let ticket = self.begin(Action::SessionRequested);
        let prefs = ticket.preferences;
        let request = StoryStartRequest {
            prompt: prompt.into(),
            character_name: prefs.character_name,
            age_group: Some(prefs.age_group),
            story_length: Some(prefs.story_length),
            content_filter: Some(prefs.content_filter),
        };

        let result = self.backend.start_story(&request).await;
        self.settle(Fence::Epoch(ticket.epoch), Hold::Generating, result, Action::StoryStarted)
    }

    /// Add `user_input` to the running story and append the next segment.
    pub async fn continue_story(&self, user_input: impl Into<String>) -> Result<(), StoreError> {
        let (ticket, session_id) =
            self.begin_in_session(Mode::Story, Action::SetGenerating(true))?;
        let request = StoryContinueRequest {
            session_id,
            user_input: user_input.into(),
            choice: None,
        };

        let result = self.backend.continue_story(&request).await;
        let user_input = request.user_input;
        self.settle(Fence::Epoch(ticket.epoch), Hold::Generating, result, |response| {
            Action::StoryContinued {
                user_input,
                response,
            }
        })
    }

    // ------------------------------------------------------------------------
    // Tutor
    // ------------------------------------------------------------------------

    /// Start a tutoring session, optionally with a first question and a subject.
    pub async fn start_tutor(
        &self,
        initial_question: Option<String>,
        subject: Option<String>,
    ) -> Result<(), StoreError> {
        let ticket = self.begin(Action::SessionRequested);
        let prefs = ticket.preferences;
        let request = TutorStartRequest {
            subject,
            age_group: Some(prefs.age_group),
            content_filter: Some(prefs.content_filter),
            initial_question,
        };

        let result = self.backend.start_tutor(&request).await;
        let question = request.initial_question;
        self.settle(Fence::Epoch(ticket.epoch), Hold::Generating, result, |response| {
            Action::TutorStarted { question, response }
        })
    }

    pub async fn ask_question(
        &self,
        question: impl Into<String>,
        subject_hint: Option<String>,
    ) -> Result<(), StoreError> {
        let (ticket, session_id) =
            self.begin_in_session(Mode::Tutor, Action::SetGenerating(true))?;
        let request = TutorAskRequest {
            session_id,
            question: question.into(),
            subject_hint,
        };

        let result = self.backend.ask_question(&request).await;
        let question = request.question;
        self.settle(Fence::Epoch(ticket.epoch), Hold::Generating, result, |response| {
            Action::QuestionAnswered { question, response }
        })
    }

    // ------------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------------

    /// Fetch and cache the content filter catalogue.
    pub async fn load_filters(&self) -> Result<(), StoreError> {
        self.dispatch(Action::LoadStarted);
        let result = self.backend.story_filters().await;
        self.settle(Fence::None, Hold::Loading, result, Action::FiltersLoaded)
    }

    /// Fetch and cache the tutor subject catalogue.
    pub async fn load_subjects(&self) -> Result<(), StoreError> {
        self.dispatch(Action::LoadStarted);
        let result = self.backend.tutor_subjects().await;
        self.settle(Fence::None, Hold::Loading, result, Action::SubjectsLoaded)
    }

    pub async fn check_health(&self) -> Result<(), StoreError> {
        self.dispatch(Action::LoadStarted);
        let result = self.backend.health().await;
        self.settle(Fence::None, Hold::Loading, result, Action::HealthChecked)
    }

    /// Fetch server-side metadata for the current session.
    pub async fn refresh_session_info(&self) -> Result<(), StoreError> {
        let mode = self.state.borrow().mode.unwrap_or(Mode::Story);
        let (ticket, session_id) = self.begin_in_session(mode, Action::LoadStarted)?;

        let result = self.backend.session_info(mode, &session_id).await;
        self.settle(
            Fence::Epoch(ticket.epoch),
            Hold::Loading,
            result,
            Action::SessionInfoLoaded,
        )
    }

    /// Push the current preferences to the running session.
    pub async fn sync_config(&self) -> Result<(), StoreError> {
        let mode = self.state.borrow().mode.unwrap_or(Mode::Story);
        let (ticket, session_id) = self.begin_in_session(mode, Action::LoadStarted)?;
        let prefs = ticket.preferences;

        let additional_settings = (mode == Mode::Story).then(|| {
            let mut settings = serde_json::Map::new();
            settings.insert(
                "max_story_length".to_string(),
                prefs.story_length.word_budget().into(),
            );
            settings
        });
        let request = ConfigRequest {
            session_id,
            content_filter: Some(prefs.content_filter),
            age_group: Some(prefs.age_group),
            additional_settings,
        };

        let result = self.backend.update_session_config(&request).await;
        self.settle(Fence::Epoch(ticket.epoch), Hold::Loading, result, |_| {
            Action::ConfigSynced
        })
    }

    // ------------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------------

    fn dispatch(&self, action: Action) {
        tracing::debug!(action = action.name(), "dispatch");
        self.state.send_modify(|state| state.reduce(action));
    }

    /// Dispatch `action` and capture what the request needs from the result.
    fn begin(&self, action: Action) -> Ticket {
        tracing::debug!(action = action.name(), "dispatch");
        let mut ticket = Ticket::default();
        self.state.send_modify(|state| {
            state.reduce(action);
            ticket = Ticket::of(state);
        });
        ticket
    }

    /// Like [`Self::begin`], but only when a session of `mode` exists.
    /// Otherwise the error is recorded and nothing else changes.
    fn begin_in_session(&self, mode: Mode, action: Action) -> Result<(Ticket, String), StoreError> {
        let mut started = None;
        self.state.send_modify(|state| {
            match state.session_id.clone() {
                Some(session_id) if state.mode == Some(mode) => {
                    tracing::debug!(action = action.name(), %session_id, "dispatch");
                    state.reduce(action);
                    started = Some((Ticket::of(state), session_id));
                }
                _ => {
                    let err = StoreError::NoActiveSession { mode };
                    tracing::debug!(%mode, "no active session");
                    state.reduce(Action::SetError(err.to_string()));
                }
            }
        });
        started.ok_or(StoreError::NoActiveSession { mode })
    }

    /// Reduce the outcome of a request, unless the session moved on.
    ///
    /// A dropped generation leaves `is_generating` to whatever superseded
    /// it. A dropped load still gives its slot back.
    fn settle<T>(
        &self,
        fence: Fence,
        hold: Hold,
        result: Result<T, storybot_api::Error>,
        on_success: impl FnOnce(T) -> Action,
    ) -> Result<(), StoreError> {
        let (action, outcome) = match result {
            Ok(value) => (on_success(value), Ok(())),
            Err(err) => {
                let message = err.user_message();
                let action = match hold {
                    Hold::Generating => Action::RequestFailed(message),
                    Hold::Loading => Action::LoadFailed(message),
                };
                (action, Err(StoreError::Api(err)))
            }
        };

        if let Err(superseded) = self.apply_fenced(fence, action) {
            if hold == Hold::Loading {
                self.dispatch(Action::LoadReleased);
            }
            return Err(superseded);
        }
        outcome
    }

    fn apply_fenced(&self, fence: Fence, action: Action) -> Result<(), StoreError> {
        let name = action.name();
        let applied = self.state.send_if_modified(|state| match fence {
            Fence::Epoch(epoch) if epoch != state.epoch => false,
            _ => {
                state.reduce(action);
                true
            }
        });

        if applied {
            tracing::debug!(action = name, "dispatch");
            Ok(())
        } else {
            tracing::debug!(action = name, "discarding response from a superseded session");
            Err(StoreError::Superseded)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_story, MockBackend};

    #[tokio::test]
    async fn test_clone_shares_state() {
        let store = SessionStore::new(MockBackend::new());
        let other = store.clone();
        other.set_mode(Mode::Tutor);
        assert_eq!(store.snapshot().mode, Some(Mode::Tutor));
    }

    #[tokio::test]
    async fn test_subscribers_are_notified() {
        let store = SessionStore::new(MockBackend::new().with_story(sample_story("s-1", "Hello")));
        let mut rx = store.subscribe();
        rx.borrow_and_update();

        store.start_story("A cat").await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().session_id.as_deref(), Some("s-1"));
    }

    #[tokio::test]
    async fn test_empty_patch_does_not_notify() {
        let store = SessionStore::new(MockBackend::new());
        let mut rx = store.subscribe();
        rx.borrow_and_update();

        store.set_config(PreferencesPatch::default());
        store.clear_error();
        assert!(!rx.has_changed().unwrap());
    }
}
