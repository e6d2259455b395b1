//! The seam between the store and the network.

use async_trait::async_trait;
use storybot_api::{
    ConfigRequest, ConfigResponse, Error, FiltersInfo, HealthResponse, Mode, SessionInfo,
    StoryContinueRequest, StoryResponse, StoryStartRequest, StorybotClient, SubjectsInfo,
    TutorAskRequest, TutorResponse, TutorStartRequest,
};

/// The backend calls the session store needs.
///
/// [`StorybotClient`] is the production implementation; tests use
/// [`crate::testing::MockBackend`].
#[async_trait]
pub trait Backend: Send + Sync {
    async fn health(&self) -> Result<HealthResponse, Error>;

    async fn story_filters(&self) -> Result<FiltersInfo, Error>;

    async fn tutor_subjects(&self) -> Result<SubjectsInfo, Error>;

    async fn start_story(&self, request: &StoryStartRequest) -> Result<StoryResponse, Error>;

    async fn continue_story(&self, request: &StoryContinueRequest) -> Result<StoryResponse, Error>;

    async fn start_tutor(&self, request: &TutorStartRequest) -> Result<TutorResponse, Error>;

    async fn ask_question(&self, request: &TutorAskRequest) -> Result<TutorResponse, Error>;

    /// Metadata for a session of the given mode.
    async fn session_info(&self, mode: Mode, session_id: &str) -> Result<SessionInfo, Error>;

    async fn update_session_config(&self, request: &ConfigRequest)
        -> Result<ConfigResponse, Error>;
}

#[async_trait]
impl Backend for StorybotClient {
    async fn health(&self) -> Result<HealthResponse, Error> {
        StorybotClient::health(self).await
    }

    async fn story_filters(&self) -> Result<FiltersInfo, Error> {
        StorybotClient::story_filters(self).await
    }

    async fn tutor_subjects(&self) -> Result<SubjectsInfo, Error> {
        StorybotClient::tutor_subjects(self).await
    }

    async fn start_story(&self, request: &StoryStartRequest) -> Result<StoryResponse, Error> {
        StorybotClient::start_story(self, request).await
    }

    async fn continue_story(&self, request: &StoryContinueRequest) -> Result<StoryResponse, Error> {
        StorybotClient::continue_story(self, request).await
    }

    async fn start_tutor(&self, request: &TutorStartRequest) -> Result<TutorResponse, Error> {
        StorybotClient::start_tutor(self, request).await
    }

    async fn ask_question(&self, request: &TutorAskRequest) -> Result<TutorResponse, Error> {
        StorybotClient::ask_question(self, request).await
    }

    async fn session_info(&self, mode: Mode, session_id: &str) -> Result<SessionInfo, Error> {
        match mode {
            Mode::Story => self.story_session(session_id).await,
            Mode::Tutor => self.tutor_session(session_id).await,
        }
    }

    async fn update_session_config(
        &self,
        request: &ConfigRequest,
    ) -> Result<ConfigResponse, Error> {
        StorybotClient::update_session_config(self, request).await
    }
}
