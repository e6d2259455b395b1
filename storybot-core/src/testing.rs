//! Testing utilities for the session store.
//!
//! This module provides:
//! - `MockBackend` for deterministic tests without a running server
//! - Fixture builders for the response types
//! - A `Gate` that holds backend calls until released, for ordering tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use storybot_api::{
    ConfigRequest, ConfigResponse, Error, FiltersInfo, HealthResponse, HealthStatus, Mode,
    SessionInfo, StoryContinueRequest, StoryResponse, StoryStartRequest, SubjectsInfo,
    TutorAskRequest, TutorResponse, TutorStartRequest,
};
use tokio::sync::Semaphore;

use crate::backend::Backend;

/// A backend call recorded by [`MockBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Health,
    StoryFilters,
    TutorSubjects,
    StartStory(StoryStartRequest),
    ContinueStory(StoryContinueRequest),
    StartTutor(TutorStartRequest),
    AskQuestion(TutorAskRequest),
    SessionInfo { mode: Mode, session_id: String },
    UpdateSessionConfig(ConfigRequest),
}

/// Holds every backend call until [`Gate::release`] is called.
#[derive(Debug, Clone)]
pub struct Gate {
    permits: Arc<Semaphore>,
}

impl Gate {
    fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(0)),
        }
    }

    /// Let `n` waiting (or future) calls through.
    pub fn release(&self, n: usize) {
        self.permits.add_permits(n);
    }

    async fn pass(&self) {
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
    }
}

#[derive(Debug, Default)]
struct Script {
    stories: VecDeque<Result<StoryResponse, Error>>,
    tutors: VecDeque<Result<TutorResponse, Error>>,
    filters: Option<Result<FiltersInfo, Error>>,
    subjects: Option<Result<SubjectsInfo, Error>>,
    health: Option<Result<HealthResponse, Error>>,
    session_info: Option<Result<SessionInfo, Error>>,
    config: Option<Result<ConfigResponse, Error>>,
}

/// A backend that returns scripted responses and records every call.
///
/// Story responses (start and continue) are served in order from one queue,
/// tutor responses (start and ask) from another. Catalogue, health and
/// session lookups return the same configured value every time. Anything
/// not scripted fails with a transport error.
#[derive(Debug, Default)]
pub struct MockBackend {
    script: Mutex<Script>,
    calls: Mutex<Vec<Call>>,
    gate: Option<Gate>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold calls at the gate until the test releases them.
    pub fn gated(mut self) -> (Self, Gate) {
        let gate = Gate::new();
        self.gate = Some(gate.clone());
        (self, gate)
    }

    pub fn with_story(self, response: StoryResponse) -> Self {
        self.queue_story(Ok(response));
        self
    }

    pub fn with_story_error(self, error: Error) -> Self {
        self.queue_story(Err(error));
        self
    }

    pub fn with_tutor(self, response: TutorResponse) -> Self {
        self.queue_tutor(Ok(response));
        self
    }

    pub fn with_tutor_error(self, error: Error) -> Self {
        self.queue_tutor(Err(error));
        self
    }

    pub fn with_filters(self, result: Result<FiltersInfo, Error>) -> Self {
        self.script().filters = Some(result);
        self
    }

    pub fn with_subjects(self, result: Result<SubjectsInfo, Error>) -> Self {
        self.script().subjects = Some(result);
        self
    }

    pub fn with_health(self, result: Result<HealthResponse, Error>) -> Self {
        self.script().health = Some(result);
        self
    }

    pub fn with_session_info(self, result: Result<SessionInfo, Error>) -> Self {
        self.script().session_info = Some(result);
        self
    }

    pub fn with_config(self, result: Result<ConfigResponse, Error>) -> Self {
        self.script().config = Some(result);
        self
    }

    /// Add a story response to the queue after construction.
    pub fn queue_story(&self, response: Result<StoryResponse, Error>) {
        self.script().stories.push_back(response);
    }

    pub fn queue_tutor(&self, response: Result<TutorResponse, Error>) {
        self.script().tutors.push_back(response);
    }

    /// Every call made so far, oldest first.
    pub fn calls(&self) -> Vec<Call> {
        self.lock_calls().clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock_calls().len()
    }

    pub fn last_call(&self) -> Option<Call> {
        self.lock_calls().last().cloned()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_calls(&self) -> MutexGuard<'_, Vec<Call>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn record(&self, call: Call) {
        self.lock_calls().push(call);
        if let Some(gate) = &self.gate {
            gate.pass().await;
        }
    }
}

fn unscripted<T>(what: &str) -> Result<T, Error> {
    Err(Error::transport(format!("no scripted {what} response")))
}

#[async_trait]
impl Backend for MockBackend {
    async fn health(&self) -> Result<HealthResponse, Error> {
        self.record(Call::Health).await;
        self.script().health.clone().unwrap_or_else(|| unscripted("health"))
    }

    async fn story_filters(&self) -> Result<FiltersInfo, Error> {
        self.record(Call::StoryFilters).await;
        self.script().filters.clone().unwrap_or_else(|| unscripted("filters"))
    }

    async fn tutor_subjects(&self) -> Result<SubjectsInfo, Error> {
        self.record(Call::TutorSubjects).await;
        self.script().subjects.clone().unwrap_or_else(|| unscripted("subjects"))
    }

    async fn start_story(&self, request: &StoryStartRequest) -> Result<StoryResponse, Error> {
        self.record(Call::StartStory(request.clone())).await;
        self.script().stories.pop_front().unwrap_or_else(|| unscripted("story"))
    }

    async fn continue_story(&self, request: &StoryContinueRequest) -> Result<StoryResponse, Error> {
        self.record(Call::ContinueStory(request.clone())).await;
        self.script().stories.pop_front().unwrap_or_else(|| unscripted("story"))
    }

    async fn start_tutor(&self, request: &TutorStartRequest) -> Result<TutorResponse, Error> {
        self.record(Call::StartTutor(request.clone())).await;
        self.script().tutors.pop_front().unwrap_or_else(|| unscripted("tutor"))
    }

    async fn ask_question(&self, request: &TutorAskRequest) -> Result<TutorResponse, Error> {
        self.record(Call::AskQuestion(request.clone())).await;
        self.script().tutors.pop_front().unwrap_or_else(|| unscripted("tutor"))
    }

    async fn session_info(&self, mode: Mode, session_id: &str) -> Result<SessionInfo, Error> {
        self.record(Call::SessionInfo {
            mode,
            session_id: session_id.to_string(),
        })
        .await;
        self.script()
            .session_info
            .clone()
            .unwrap_or_else(|| unscripted("session info"))
    }

    async fn update_session_config(
        &self,
        request: &ConfigRequest,
    ) -> Result<ConfigResponse, Error> {
        self.record(Call::UpdateSessionConfig(request.clone())).await;
        self.script().config.clone().unwrap_or_else(|| unscripted("config"))
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// A story segment response with message count 2 (one exchange).
pub fn sample_story(session_id: &str, content: &str) -> StoryResponse {
    StoryResponse {
        session_id: session_id.to_string(),
        story_content: content.to_string(),
        choices: None,
        is_complete: false,
        word_count: content.split_whitespace().count() as u32,
        content_filter_applied: "educational".to_string(),
        message_count: 2,
    }
}

pub fn sample_tutor(session_id: &str, answer: &str, subject: Option<&str>) -> TutorResponse {
    TutorResponse {
        session_id: session_id.to_string(),
        answer: answer.to_string(),
        subject_detected: subject.map(str::to_string),
        follow_up_suggestions: None,
        educational_level: "6-8".to_string(),
        content_filter_applied: "educational".to_string(),
        message_count: 2,
        is_appropriate: true,
    }
}

pub fn sample_filters() -> FiltersInfo {
    FiltersInfo {
        available_filters: vec![
            "moral_values".to_string(),
            "educational".to_string(),
            "fun_only".to_string(),
        ],
        descriptions: [
            ("moral_values", "Stories that teach kindness and honesty"),
            ("educational", "Stories with facts woven in"),
            ("fun_only", "Silly, fun, and exciting"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect(),
        default_filter: "educational".to_string(),
        ..Default::default()
    }
}

pub fn sample_subjects() -> SubjectsInfo {
    SubjectsInfo {
        available_subjects: vec!["science".to_string(), "math".to_string()],
        subject_descriptions: [("science".to_string(), "How the world works".to_string())]
            .into_iter()
            .collect(),
        example_questions: [(
            "science".to_string(),
            vec!["Why is the sky blue?".to_string()],
        )]
        .into_iter()
        .collect(),
    }
}

pub fn sample_health() -> HealthResponse {
    HealthResponse {
        status: HealthStatus::Healthy,
        version: "1.0.0".to_string(),
        llm_provider: "mock".to_string(),
        session_backend: "memory".to_string(),
        timestamp: Some(Utc::now().naive_utc()),
    }
}

pub fn sample_session_info(session_id: &str, message_count: u32, is_expired: bool) -> SessionInfo {
    let now = Utc::now().naive_utc();
    SessionInfo {
        session_id: session_id.to_string(),
        created_at: now,
        last_accessed: now,
        message_count,
        config: serde_json::Map::new(),
        is_expired,
    }
}

pub fn sample_config_response(session_id: &str, mode: Mode) -> ConfigResponse {
    ConfigResponse {
        session_id: session_id.to_string(),
        mode,
        config: serde_json::Map::new(),
        message: "Session configuration updated successfully".to_string(),
    }
}
