//! Session state and the reducer that evolves it.
//!
//! Every change to a session goes through [`SessionState::reduce`]. The
//! reducer is synchronous and does no I/O, so the store can run it inside
//! the watch channel and tests can drive it directly.

use serde::{Deserialize, Serialize};
use storybot_api::{
    AgeGroup, ContentFilter, FiltersInfo, HealthResponse, Mode, SessionInfo, StoryLength,
    StoryResponse, SubjectsInfo, TutorResponse,
};

/// Shown when the server reports the current session as expired.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please start a new one.";

/// How generated content should be shaped. Survives resets and mode switches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub content_filter: ContentFilter,
    pub age_group: AgeGroup,
    pub story_length: StoryLength,
    pub character_name: Option<String>,
}

impl Preferences {
    /// Shallow merge: every field set in the patch replaces the current value.
    pub fn apply(&mut self, patch: PreferencesPatch) {
        if let Some(filter) = patch.content_filter {
            self.content_filter = filter;
        }
        if let Some(age_group) = patch.age_group {
            self.age_group = age_group;
        }
        if let Some(length) = patch.story_length {
            self.story_length = length;
        }
        if let Some(name) = patch.character_name {
            self.character_name = name;
        }
    }
}

/// A partial update to [`Preferences`].
///
/// `character_name` is doubly optional: `None` leaves the name alone,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferencesPatch {
    pub content_filter: Option<ContentFilter>,
    pub age_group: Option<AgeGroup>,
    pub story_length: Option<StoryLength>,
    pub character_name: Option<Option<String>>,
}

impl PreferencesPatch {
    pub fn content_filter(mut self, filter: ContentFilter) -> Self {
        self.content_filter = Some(filter);
        self
    }

    pub fn age_group(mut self, age_group: AgeGroup) -> Self {
        self.age_group = Some(age_group);
        self
    }

    pub fn story_length(mut self, length: StoryLength) -> Self {
        self.story_length = Some(length);
        self
    }

    pub fn character_name(mut self, name: Option<String>) -> Self {
        self.character_name = Some(name);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Accumulated story transcript.
///
/// While a story session exists, `content` holds exactly one more segment
/// than `user_inputs`: the opening segment plus one reply per input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoryState {
    pub content: Vec<String>,
    pub user_inputs: Vec<String>,
    pub is_complete: bool,
    /// Word count of the latest segment, as reported by the server.
    pub word_count: u32,
    pub choices: Vec<String>,
}

impl StoryState {
    /// Story segments interleaved with the inputs that prompted them.
    pub fn turns(&self) -> impl Iterator<Item = (Option<&str>, &str)> {
        self.content.iter().enumerate().map(|(i, segment)| {
            let input = i
                .checked_sub(1)
                .and_then(|j| self.user_inputs.get(j))
                .map(String::as_str);
            (input, segment.as_str())
        })
    }
}

/// Accumulated tutoring transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorState {
    pub answers: Vec<String>,
    /// Questions paired with `answers`. A start without an initial question
    /// leaves the welcome answer unpaired, so this can be one shorter.
    pub questions: Vec<String>,
    /// Suggestions from the most recent answer only.
    pub follow_ups: Vec<String>,
    pub current_subject: Option<String>,
    pub educational_level: Option<String>,
    pub is_appropriate: bool,
}

impl Default for TutorState {
    fn default() -> Self {
        Self {
            answers: Vec::new(),
            questions: Vec::new(),
            follow_ups: Vec::new(),
            current_subject: None,
            educational_level: None,
            is_appropriate: true,
        }
    }
}

impl TutorState {
    /// Answers with the question that prompted each one, oldest first.
    pub fn exchanges(&self) -> impl Iterator<Item = (Option<&str>, &str)> {
        let unpaired = self.answers.len().saturating_sub(self.questions.len());
        self.answers.iter().enumerate().map(move |(i, answer)| {
            let question = i
                .checked_sub(unpaired)
                .and_then(|j| self.questions.get(j))
                .map(String::as_str);
            (question, answer.as_str())
        })
    }
}

/// Everything the views render from.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub mode: Option<Mode>,
    pub show_mode_selection: bool,
    pub session_id: Option<String>,
    pub message_count: u32,

    pub story: StoryState,
    pub tutor: TutorState,

    pub preferences: Preferences,

    pub available_filters: Option<FiltersInfo>,
    pub available_subjects: Option<SubjectsInfo>,
    pub session_info: Option<SessionInfo>,
    pub health: Option<HealthResponse>,

    /// Metadata requests still in flight. Each one releases its own slot,
    /// so concurrent fetches keep the state loading until the last returns.
    pub pending_loads: u32,
    pub is_generating: bool,
    pub error: Option<String>,

    /// Bumped whenever the conversation is replaced. Responses to requests
    /// issued under an older epoch are dropped by the store.
    pub epoch: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::with_preferences(Preferences::default())
    }
}

/// A state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Switch conversation kind, discarding the current conversation.
    SetMode(Mode),
    /// Discard the session and return to mode selection.
    Reset,
    /// A metadata request went out.
    LoadStarted,
    /// A metadata request was dropped without landing; gives back its slot.
    LoadReleased,
    SetGenerating(bool),
    /// A new session is being requested. Starts generating and supersedes
    /// anything still in flight.
    SessionRequested,
    /// A generation request failed; records the message and stops generating.
    RequestFailed(String),
    /// A metadata request failed; records the message and releases its slot.
    LoadFailed(String),
    /// Records an error without touching the flags.
    SetError(String),
    ClearError,
    StoryStarted(StoryResponse),
    StoryContinued {
        user_input: String,
        response: StoryResponse,
    },
    TutorStarted {
        question: Option<String>,
        response: TutorResponse,
    },
    QuestionAnswered {
        question: String,
        response: TutorResponse,
    },
    UpdatePreferences(PreferencesPatch),
    FiltersLoaded(FiltersInfo),
    SubjectsLoaded(SubjectsInfo),
    SessionInfoLoaded(SessionInfo),
    HealthChecked(HealthResponse),
    ConfigSynced,
}

impl Action {
    /// Short name for logs; payloads can be whole story segments.
    pub fn name(&self) -> &'static str {
        match self {
            Action::SetMode(_) => "set_mode",
            Action::Reset => "reset",
            Action::LoadStarted => "load_started",
            Action::LoadReleased => "load_released",
            Action::SetGenerating(_) => "set_generating",
            Action::SessionRequested => "session_requested",
            Action::RequestFailed(_) => "request_failed",
            Action::LoadFailed(_) => "load_failed",
            Action::SetError(_) => "set_error",
            Action::ClearError => "clear_error",
            Action::StoryStarted(_) => "story_started",
            Action::StoryContinued { .. } => "story_continued",
            Action::TutorStarted { .. } => "tutor_started",
            Action::QuestionAnswered { .. } => "question_answered",
            Action::UpdatePreferences(_) => "update_preferences",
            Action::FiltersLoaded(_) => "filters_loaded",
            Action::SubjectsLoaded(_) => "subjects_loaded",
            Action::SessionInfoLoaded(_) => "session_info_loaded",
            Action::HealthChecked(_) => "health_checked",
            Action::ConfigSynced => "config_synced",
        }
    }
}

impl SessionState {
    /// Fresh state carrying the given preferences.
    pub fn with_preferences(preferences: Preferences) -> Self {
        Self {
            mode: None,
            show_mode_selection: true,
            session_id: None,
            message_count: 0,
            story: StoryState::default(),
            tutor: TutorState::default(),
            preferences,
            available_filters: None,
            available_subjects: None,
            session_info: None,
            health: None,
            pending_loads: 0,
            is_generating: false,
            error: None,
            epoch: 0,
        }
    }

    pub fn has_story_session(&self) -> bool {
        self.session_id.is_some() && self.mode == Some(Mode::Story)
    }

    pub fn has_tutor_session(&self) -> bool {
        self.session_id.is_some() && self.mode == Some(Mode::Tutor)
    }

    /// True while any metadata request is outstanding.
    pub fn is_loading(&self) -> bool {
        self.pending_loads > 0
    }

    pub fn reduce(&mut self, action: Action) {
        match action {
            Action::SetMode(mode) => {
                self.clear_conversation();
                self.mode = Some(mode);
                self.show_mode_selection = false;
            }
            Action::Reset => {
                self.clear_conversation();
                self.mode = None;
                self.show_mode_selection = true;
            }
            Action::LoadStarted => self.pending_loads += 1,
            Action::LoadReleased => self.finish_load(),
            Action::SetGenerating(generating) => self.is_generating = generating,
            Action::SessionRequested => {
                self.epoch += 1;
                self.is_generating = true;
            }
            Action::RequestFailed(message) => {
                self.error = Some(message);
                self.is_generating = false;
            }
            Action::LoadFailed(message) => {
                self.error = Some(message);
                self.finish_load();
            }
            Action::SetError(message) => self.error = Some(message),
            Action::ClearError => self.error = None,

            Action::StoryStarted(response) => {
                self.mode = Some(Mode::Story);
                self.show_mode_selection = false;
                self.session_id = Some(response.session_id);
                self.message_count = response.message_count;
                self.session_info = None;
                self.story = StoryState {
                    content: vec![response.story_content],
                    user_inputs: Vec::new(),
                    is_complete: response.is_complete,
                    word_count: response.word_count,
                    choices: response.choices.unwrap_or_default(),
                };
                self.finish_request();
            }
            Action::StoryContinued {
                user_input,
                response,
            } => {
                self.story.content.push(response.story_content);
                self.story.user_inputs.push(user_input);
                self.story.is_complete = response.is_complete;
                self.story.word_count = response.word_count;
                self.story.choices = response.choices.unwrap_or_default();
                self.message_count = self.message_count.max(response.message_count);
                self.finish_request();
            }
            Action::TutorStarted { question, response } => {
                self.mode = Some(Mode::Tutor);
                self.show_mode_selection = false;
                self.session_id = Some(response.session_id);
                self.message_count = response.message_count;
                self.session_info = None;
                self.tutor = TutorState {
                    answers: vec![response.answer],
                    questions: question.into_iter().collect(),
                    follow_ups: response.follow_up_suggestions.unwrap_or_default(),
                    current_subject: response.subject_detected,
                    educational_level: Some(response.educational_level),
                    is_appropriate: response.is_appropriate,
                };
                self.finish_request();
            }
            Action::QuestionAnswered { question, response } => {
                self.tutor.questions.push(question);
                self.tutor.answers.push(response.answer);
                self.tutor.follow_ups = response.follow_up_suggestions.unwrap_or_default();
                if let Some(subject) = response.subject_detected {
                    self.tutor.current_subject = Some(subject);
                }
                self.tutor.educational_level = Some(response.educational_level);
                self.tutor.is_appropriate = response.is_appropriate;
                self.message_count = self.message_count.max(response.message_count);
                self.finish_request();
            }

            Action::UpdatePreferences(patch) => self.preferences.apply(patch),
            Action::FiltersLoaded(filters) => {
                self.available_filters = Some(filters);
                self.finish_load();
            }
            Action::SubjectsLoaded(subjects) => {
                self.available_subjects = Some(subjects);
                self.finish_load();
            }
            Action::SessionInfoLoaded(info) => {
                self.finish_load();
                self.message_count = self.message_count.max(info.message_count);
                if info.is_expired {
                    self.error = Some(SESSION_EXPIRED_MESSAGE.to_string());
                } else {
                    self.error = None;
                }
                self.session_info = Some(info);
            }
            Action::HealthChecked(health) => {
                self.health = Some(health);
                self.finish_load();
            }
            Action::ConfigSynced => {
                self.finish_load();
                self.error = None;
            }
        }
    }

    /// Drop the conversation but keep preferences and the option caches.
    fn clear_conversation(&mut self) {
        *self = Self {
            preferences: std::mem::take(&mut self.preferences),
            available_filters: self.available_filters.take(),
            available_subjects: self.available_subjects.take(),
            health: self.health.take(),
            pending_loads: self.pending_loads,
            epoch: self.epoch + 1,
            ..Self::default()
        };
    }

    fn finish_load(&mut self) {
        self.pending_loads = self.pending_loads.saturating_sub(1);
    }

    fn finish_request(&mut self) {
        self.is_generating = false;
        self.error = None;
    }
}
