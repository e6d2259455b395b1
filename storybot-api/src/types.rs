//! Request and response shapes shared by the client and the session store.
//!
//! Field names follow the backend's JSON exactly; optional request fields are
//! omitted from the payload when unset so the server applies its defaults.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Enumerations
// ============================================================================

/// Conversation kind. A session belongs to exactly one mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Story,
    Tutor,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Story => "story",
            Mode::Tutor => "tutor",
        }
    }
}

/// Server-side tone and safety policy applied to generated content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFilter {
    MoralValues,
    #[default]
    Educational,
    FunOnly,
}

impl ContentFilter {
    pub const ALL: [ContentFilter; 3] = [
        ContentFilter::MoralValues,
        ContentFilter::Educational,
        ContentFilter::FunOnly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentFilter::MoralValues => "moral_values",
            ContentFilter::Educational => "educational",
            ContentFilter::FunOnly => "fun_only",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ContentFilter::MoralValues => "Moral values",
            ContentFilter::Educational => "Educational",
            ContentFilter::FunOnly => "Just for fun",
        }
    }
}

/// Target audience for generated content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "3-5")]
    Preschool,
    #[default]
    #[serde(rename = "6-8")]
    EarlyReader,
    #[serde(rename = "9-12")]
    Preteen,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 3] = [AgeGroup::Preschool, AgeGroup::EarlyReader, AgeGroup::Preteen];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeGroup::Preschool => "3-5",
            AgeGroup::EarlyReader => "6-8",
            AgeGroup::Preteen => "9-12",
        }
    }
}

/// Desired length of each story segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl StoryLength {
    pub const ALL: [StoryLength; 3] = [StoryLength::Short, StoryLength::Medium, StoryLength::Long];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoryLength::Short => "short",
            StoryLength::Medium => "medium",
            StoryLength::Long => "long",
        }
    }

    /// Total story words the backend allows (`max_story_length`) before it
    /// asks the model to wrap up. Medium matches the server default.
    pub fn word_budget(&self) -> u32 {
        match self {
            StoryLength::Short => 500,
            StoryLength::Medium => 1000,
            StoryLength::Long => 2000,
        }
    }
}

/// Error returned when parsing one of the enumerations from text fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! display_and_parse {
    ($ty:ty, $kind:literal, [$($variant:expr),+ $(,)?], $aliases:expr) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let needle = s.trim().to_lowercase();
                for candidate in [$($variant),+] {
                    if candidate.as_str() == needle {
                        return Ok(candidate);
                    }
                }
                let aliases: &[(&str, $ty)] = $aliases;
                aliases
                    .iter()
                    .find(|(alias, _)| *alias == needle)
                    .map(|(_, value)| *value)
                    .ok_or_else(|| ParseEnumError {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

display_and_parse!(Mode, "mode", [Mode::Story, Mode::Tutor], &[]);
display_and_parse!(
    ContentFilter,
    "content filter",
    [ContentFilter::MoralValues, ContentFilter::Educational, ContentFilter::FunOnly],
    &[
        ("moral-values", ContentFilter::MoralValues),
        ("moral", ContentFilter::MoralValues),
        ("fun-only", ContentFilter::FunOnly),
        ("fun", ContentFilter::FunOnly),
    ]
);
display_and_parse!(
    AgeGroup,
    "age group",
    [AgeGroup::Preschool, AgeGroup::EarlyReader, AgeGroup::Preteen],
    &[]
);
display_and_parse!(
    StoryLength,
    "story length",
    [StoryLength::Short, StoryLength::Medium, StoryLength::Long],
    &[]
);

// ============================================================================
// Health and service info
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub llm_provider: String,
    pub session_backend: String,
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// `GET /`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub endpoints: BTreeMap<String, String>,
}

// ============================================================================
// Story mode
// ============================================================================

/// `POST /story/start`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryStartRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_group: Option<AgeGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_length: Option<StoryLength>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_filter: Option<ContentFilter>,
}

impl StoryStartRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }
}

/// `POST /story/continue`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryContinueRequest {
    pub session_id: String,
    pub user_input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choice: Option<String>,
}

/// `PUT /story/config`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryConfigRequest {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_filter: Option<ContentFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_story_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_style: Option<String>,
}

/// Response to both story start and continue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryResponse {
    pub session_id: String,
    pub story_content: String,
    #[serde(default)]
    pub choices: Option<Vec<String>>,
    #[serde(default)]
    pub is_complete: bool,
    pub word_count: u32,
    pub content_filter_applied: String,
    pub message_count: u32,
}

/// `PUT /story/config` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryConfigResponse {
    pub session_id: String,
    pub config: serde_json::Map<String, serde_json::Value>,
    pub message: String,
}

/// Session metadata, returned by both `/story/session/{id}` and `/tutor/session/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub created_at: NaiveDateTime,
    pub last_accessed: NaiveDateTime,
    pub message_count: u32,
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub is_expired: bool,
}

/// Content filter catalogue from `/story/filters` or `/config/filters`.
///
/// The `/config/filters` variant also reports which modes the filters apply
/// to and how each filter shapes each mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FiltersInfo {
    pub available_filters: Vec<String>,
    #[serde(default)]
    pub descriptions: BTreeMap<String, String>,
    pub default_filter: String,
    #[serde(default)]
    pub applies_to_modes: Vec<String>,
    #[serde(default)]
    pub filter_effects: BTreeMap<String, BTreeMap<String, String>>,
}

impl FiltersInfo {
    pub fn description(&self, filter: ContentFilter) -> Option<&str> {
        self.descriptions.get(filter.as_str()).map(String::as_str)
    }
}

// ============================================================================
// Tutor mode
// ============================================================================

/// `POST /tutor/start`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TutorStartRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_group: Option<AgeGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_filter: Option<ContentFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_question: Option<String>,
}

impl TutorStartRequest {
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_initial_question(mut self, question: impl Into<String>) -> Self {
        self.initial_question = Some(question.into());
        self
    }
}

/// `POST /tutor/ask`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorAskRequest {
    pub session_id: String,
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_hint: Option<String>,
}

/// Response to both tutor start and ask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorResponse {
    pub session_id: String,
    pub answer: String,
    #[serde(default)]
    pub subject_detected: Option<String>,
    #[serde(default)]
    pub follow_up_suggestions: Option<Vec<String>>,
    pub educational_level: String,
    pub content_filter_applied: String,
    pub message_count: u32,
    #[serde(default = "default_true")]
    pub is_appropriate: bool,
}

fn default_true() -> bool {
    true
}

/// `GET /tutor/subjects`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectsInfo {
    pub available_subjects: Vec<String>,
    #[serde(default)]
    pub subject_descriptions: BTreeMap<String, String>,
    #[serde(default)]
    pub example_questions: BTreeMap<String, Vec<String>>,
}

impl SubjectsInfo {
    pub fn examples_for(&self, subject: &str) -> &[String] {
        self.example_questions
            .get(subject)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

// ============================================================================
// Shared configuration
// ============================================================================

/// `PUT /config/session` and `PUT /tutor/config`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigRequest {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_filter: Option<ContentFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_group: Option<AgeGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_settings: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub session_id: String,
    pub mode: Mode,
    pub config: serde_json::Map<String, serde_json::Value>,
    pub message: String,
}
