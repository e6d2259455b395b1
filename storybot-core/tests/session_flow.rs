//! Store behaviour against a scripted backend.
//!
//! Run with: `cargo test -p storybot-core --test session_flow`

use storybot_api::{
    AgeGroup, ContentFilter, Error, Mode, StoryLength, StoryResponse, TutorResponse,
};
use storybot_core::state::SESSION_EXPIRED_MESSAGE;
use storybot_core::testing::{
    sample_config_response, sample_filters, sample_health, sample_session_info, sample_story,
    sample_subjects, sample_tutor, Call, MockBackend,
};
use storybot_core::{PreferencesPatch, SessionStore, StoreError};

fn server_error() -> Error {
    Error::from_response(500, r#"{"detail":"Error generating story: upstream timeout"}"#)
}

/// Let spawned tasks run until the backend has seen `n` calls.
async fn wait_for_calls(store: &SessionStore<MockBackend>, n: usize) {
    for _ in 0..1000 {
        if store.backend().call_count() >= n {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("backend never saw {n} calls");
}

// =============================================================================
// STORY MODE
// =============================================================================

#[tokio::test]
async fn test_brave_little_rabbit() {
    let backend = MockBackend::new().with_story(StoryResponse {
        session_id: "abc".to_string(),
        story_content: "Once upon a time...".to_string(),
        choices: None,
        is_complete: false,
        word_count: 5,
        content_filter_applied: "educational".to_string(),
        message_count: 1,
    });
    let store = SessionStore::new(backend);

    store.start_story("A brave little rabbit").await.unwrap();

    let state = store.snapshot();
    assert_eq!(state.story.content, vec!["Once upon a time..."]);
    assert_eq!(state.session_id.as_deref(), Some("abc"));
    assert_eq!(state.mode, Some(Mode::Story));
    assert!(!state.is_generating);
    assert!(state.error.is_none());
    assert_eq!(state.story.word_count, 5);
    assert_eq!(state.message_count, 1);
}

#[tokio::test]
async fn test_turn_count_invariant_across_continues() {
    let backend = MockBackend::new().with_story(sample_story("s-1", "Pip the rabbit woke up."));
    for i in 0..4 {
        backend.queue_story(Ok(StoryResponse {
            message_count: 4 + i * 2,
            ..sample_story("s-1", "Then something wonderful happened.")
        }));
    }
    let store = SessionStore::new(backend);

    store.start_story("A rabbit").await.unwrap();
    for i in 0..4 {
        store.continue_story(format!("Pip hops {i} times")).await.unwrap();
        let state = store.snapshot();
        assert_eq!(state.story.content.len(), state.story.user_inputs.len() + 1);
    }

    let state = store.snapshot();
    assert_eq!(state.story.user_inputs.last().map(String::as_str), Some("Pip hops 3 times"));
    assert_eq!(state.message_count, 10);

    match store.backend().last_call() {
        Some(Call::ContinueStory(request)) => {
            assert_eq!(request.session_id, "s-1");
            assert_eq!(request.user_input, "Pip hops 3 times");
        }
        other => panic!("unexpected last call: {other:?}"),
    }
}

#[tokio::test]
async fn test_continue_without_session_is_a_precondition_error() {
    let store = SessionStore::new(MockBackend::new());

    let err = store.continue_story("and then?").await.unwrap_err();
    assert!(matches!(err, StoreError::NoActiveSession { mode: Mode::Story }));
    assert_eq!(store.backend().call_count(), 0);

    let state = store.snapshot();
    assert!(state.error.is_some());
    assert!(!state.is_generating);
}

#[tokio::test]
async fn test_ask_without_session_is_a_precondition_error() {
    let store = SessionStore::new(MockBackend::new());

    let err = store.ask_question("Why?", None).await.unwrap_err();
    assert!(matches!(err, StoreError::NoActiveSession { mode: Mode::Tutor }));
    assert_eq!(store.backend().call_count(), 0);
    assert!(store.snapshot().error.is_some());
}

#[tokio::test]
async fn test_continue_in_tutor_session_is_rejected() {
    let store = SessionStore::new(MockBackend::new().with_tutor(sample_tutor("t-1", "Hi!", None)));
    store.start_tutor(None, None).await.unwrap();

    let err = store.continue_story("once more").await.unwrap_err();
    assert!(matches!(err, StoreError::NoActiveSession { .. }));
    assert_eq!(store.backend().call_count(), 1);
}

#[tokio::test]
async fn test_start_payload_carries_preferences() {
    let store = SessionStore::new(MockBackend::new().with_story(sample_story("s-1", "Hello")));
    store.set_config(
        PreferencesPatch::default()
            .age_group(AgeGroup::Preteen)
            .story_length(StoryLength::Short)
            .content_filter(ContentFilter::FunOnly)
            .character_name(Some("Pip".to_string())),
    );

    store.start_story("A rabbit").await.unwrap();

    match store.backend().last_call() {
        Some(Call::StartStory(request)) => {
            assert_eq!(request.prompt, "A rabbit");
            assert_eq!(request.age_group, Some(AgeGroup::Preteen));
            assert_eq!(request.story_length, Some(StoryLength::Short));
            assert_eq!(request.content_filter, Some(ContentFilter::FunOnly));
            assert_eq!(request.character_name.as_deref(), Some("Pip"));

            let payload = serde_json::to_value(&request).unwrap();
            assert_eq!(payload["age_group"], "9-12");
        }
        other => panic!("unexpected call: {other:?}"),
    }
}

#[tokio::test]
async fn test_failed_start_leaves_no_session() {
    let store = SessionStore::new(MockBackend::new().with_story_error(server_error()));

    let err = store.start_story("A rabbit").await.unwrap_err();
    assert!(matches!(err, StoreError::Api(ref e) if e.status == 500));

    let state = store.snapshot();
    assert!(state.session_id.is_none());
    assert!(!state.is_generating);
    let message = state.error.unwrap();
    assert!(!message.is_empty());
    assert_eq!(message, err.to_string());
}

#[tokio::test]
async fn test_failed_continue_keeps_transcript() {
    let backend = MockBackend::new()
        .with_story(sample_story("s-1", "Once upon a time."))
        .with_story_error(Error::from_response(404, r#"{"detail":"Session not found or expired"}"#));
    let store = SessionStore::new(backend);
    store.start_story("A rabbit").await.unwrap();

    assert!(store.continue_story("Pip jumps").await.is_err());

    let state = store.snapshot();
    assert_eq!(state.story.content.len(), 1);
    assert!(state.story.user_inputs.is_empty());
    assert_eq!(state.error.as_deref(), Some(SESSION_EXPIRED_MESSAGE));
    assert_eq!(state.session_id.as_deref(), Some("s-1"));
}

#[tokio::test]
async fn test_success_clears_previous_error() {
    let backend = MockBackend::new()
        .with_story_error(Error::transport("Could not connect to server"))
        .with_story(sample_story("s-1", "Once upon a time."));
    let store = SessionStore::new(backend);

    assert!(store.start_story("A rabbit").await.is_err());
    assert!(store.snapshot().error.unwrap().contains("connection"));

    store.start_story("A rabbit").await.unwrap();
    assert!(store.snapshot().error.is_none());
}

// =============================================================================
// TUTOR MODE
// =============================================================================

#[tokio::test]
async fn test_tutor_flow() {
    let backend = MockBackend::new()
        .with_tutor(sample_tutor("t-1", "Hello! What would you like to learn?", Some("general")))
        .with_tutor(answer_with_follow_up("Plants drink water through roots.", "science"))
        .with_tutor(sample_tutor("t-1", "Leaves make food from sunlight.", None));
    let store = SessionStore::new(backend);

    store.start_tutor(None, Some("science".to_string())).await.unwrap();
    let state = store.snapshot();
    assert_eq!(state.tutor.answers.len(), 1);
    assert!(state.tutor.questions.is_empty());
    assert_eq!(state.mode, Some(Mode::Tutor));

    store
        .ask_question("How do plants drink?", Some("science".to_string()))
        .await
        .unwrap();
    store.ask_question("What do leaves do?", None).await.unwrap();

    let state = store.snapshot();
    assert_eq!(state.tutor.questions.len(), 2);
    assert_eq!(state.tutor.answers.len(), 3);
    assert_eq!(state.tutor.current_subject.as_deref(), Some("science"));
    assert!(state.tutor.follow_ups.is_empty());

    let calls = store.backend().calls();
    match &calls[0] {
        Call::StartTutor(request) => {
            assert_eq!(request.subject.as_deref(), Some("science"));
            assert_eq!(request.age_group, Some(AgeGroup::EarlyReader));
            assert!(request.initial_question.is_none());
        }
        other => panic!("unexpected call: {other:?}"),
    }
    match &calls[1] {
        Call::AskQuestion(request) => {
            assert_eq!(request.session_id, "t-1");
            assert_eq!(request.subject_hint.as_deref(), Some("science"));
        }
        other => panic!("unexpected call: {other:?}"),
    }
}

#[tokio::test]
async fn test_tutor_start_with_question_pairs_it() {
    let store = SessionStore::new(
        MockBackend::new().with_tutor(sample_tutor("t-2", "Bees flap very fast!", Some("science"))),
    );

    store
        .start_tutor(Some("How do bees fly?".to_string()), None)
        .await
        .unwrap();

    let state = store.snapshot();
    assert_eq!(state.tutor.questions, vec!["How do bees fly?"]);
    assert_eq!(state.tutor.answers, vec!["Bees flap very fast!"]);
}

fn answer_with_follow_up(answer: &str, subject: &str) -> TutorResponse {
    TutorResponse {
        follow_up_suggestions: Some(vec!["Why are leaves green?".to_string()]),
        message_count: 4,
        ..sample_tutor("t-1", answer, Some(subject))
    }
}

// =============================================================================
// RESET, MODE SWITCH AND CONFIGURATION
// =============================================================================

#[tokio::test]
async fn test_reset_preserves_preferences() {
    let backend = MockBackend::new()
        .with_story(sample_story("s-1", "Once upon a time."))
        .with_story_error(server_error());
    let store = SessionStore::new(backend);
    store.set_config(
        PreferencesPatch::default()
            .content_filter(ContentFilter::MoralValues)
            .age_group(AgeGroup::Preschool)
            .story_length(StoryLength::Long)
            .character_name(Some("Pip".to_string())),
    );
    store.start_story("A rabbit").await.unwrap();
    let _ = store.continue_story("Pip jumps").await;
    assert!(store.snapshot().error.is_some());

    store.reset_session();

    let state = store.snapshot();
    assert!(state.session_id.is_none());
    assert!(state.story.content.is_empty());
    assert!(state.story.user_inputs.is_empty());
    assert!(state.tutor.answers.is_empty());
    assert!(state.error.is_none());
    assert!(state.show_mode_selection);
    assert!(state.mode.is_none());
    assert_eq!(state.preferences.content_filter, ContentFilter::MoralValues);
    assert_eq!(state.preferences.age_group, AgeGroup::Preschool);
    assert_eq!(state.preferences.story_length, StoryLength::Long);
    assert_eq!(state.preferences.character_name.as_deref(), Some("Pip"));
}

#[tokio::test]
async fn test_set_mode_keeps_cached_metadata() {
    let backend = MockBackend::new()
        .with_story(sample_story("s-1", "Once upon a time."))
        .with_filters(Ok(sample_filters()))
        .with_subjects(Ok(sample_subjects()));
    let store = SessionStore::new(backend);
    store.load_filters().await.unwrap();
    store.load_subjects().await.unwrap();
    store.start_story("A rabbit").await.unwrap();

    store.set_mode(Mode::Tutor);

    let state = store.snapshot();
    assert_eq!(state.mode, Some(Mode::Tutor));
    assert!(state.story.content.is_empty());
    assert!(state.story.user_inputs.is_empty());
    assert!(state.session_id.is_none());
    assert_eq!(state.available_filters, Some(sample_filters()));
    assert_eq!(state.available_subjects, Some(sample_subjects()));
}

#[tokio::test]
async fn test_set_config_makes_no_network_call() {
    let store = SessionStore::new(MockBackend::new());
    store.set_config(PreferencesPatch::default().story_length(StoryLength::Long));
    store.set_mode(Mode::Story);
    store.clear_error();

    assert_eq!(store.backend().call_count(), 0);
    assert_eq!(store.snapshot().preferences.story_length, StoryLength::Long);
}

// =============================================================================
// METADATA
// =============================================================================

#[tokio::test]
async fn test_failed_catalogue_load_blocks_nothing() {
    let backend = MockBackend::new()
        .with_filters(Err(Error::transport("Could not connect to server")))
        .with_story(sample_story("s-1", "Once upon a time."));
    let store = SessionStore::new(backend);

    assert!(store.load_filters().await.is_err());
    let state = store.snapshot();
    assert!(state.error.is_some());
    assert!(!state.is_loading());
    assert!(state.available_filters.is_none());

    store.start_story("A rabbit").await.unwrap();
    assert!(store.snapshot().error.is_none());
}

#[tokio::test]
async fn test_health_is_cached() {
    let store = SessionStore::new(MockBackend::new().with_health(Ok(sample_health())));
    store.check_health().await.unwrap();

    let state = store.snapshot();
    assert!(state.health.as_ref().unwrap().is_healthy());
    assert!(!state.is_loading());
}

#[tokio::test]
async fn test_session_info_follows_mode() {
    let backend = MockBackend::new()
        .with_tutor(sample_tutor("t-9", "Hi!", None))
        .with_session_info(Ok(sample_session_info("t-9", 6, false)));
    let store = SessionStore::new(backend);

    assert!(matches!(
        store.refresh_session_info().await,
        Err(StoreError::NoActiveSession { .. })
    ));
    store.clear_error();

    store.start_tutor(None, None).await.unwrap();
    store.refresh_session_info().await.unwrap();

    assert_eq!(
        store.backend().last_call(),
        Some(Call::SessionInfo {
            mode: Mode::Tutor,
            session_id: "t-9".to_string()
        })
    );
    let state = store.snapshot();
    assert_eq!(state.session_info.unwrap().message_count, 6);
    assert_eq!(state.message_count, 6);
    assert!(state.error.is_none());
}

#[tokio::test]
async fn test_expired_session_info_sets_error() {
    let backend = MockBackend::new()
        .with_story(sample_story("s-1", "Once."))
        .with_session_info(Ok(sample_session_info("s-1", 2, true)));
    let store = SessionStore::new(backend);
    store.start_story("A rabbit").await.unwrap();

    store.refresh_session_info().await.unwrap();
    assert_eq!(store.snapshot().error.as_deref(), Some(SESSION_EXPIRED_MESSAGE));
}

#[tokio::test]
async fn test_sync_config_pushes_preferences() {
    let backend = MockBackend::new()
        .with_story(sample_story("s-1", "Once."))
        .with_config(Ok(sample_config_response("s-1", Mode::Story)));
    let store = SessionStore::new(backend);
    store.start_story("A rabbit").await.unwrap();
    store.set_config(
        PreferencesPatch::default()
            .content_filter(ContentFilter::FunOnly)
            .story_length(StoryLength::Long),
    );

    store.sync_config().await.unwrap();

    match store.backend().last_call() {
        Some(Call::UpdateSessionConfig(request)) => {
            assert_eq!(request.session_id, "s-1");
            assert_eq!(request.content_filter, Some(ContentFilter::FunOnly));
            assert_eq!(request.age_group, Some(AgeGroup::EarlyReader));
            let settings = request.additional_settings.unwrap();
            assert_eq!(settings["max_story_length"], 2000);
        }
        other => panic!("unexpected call: {other:?}"),
    }
    assert!(!store.snapshot().is_loading());
}

// =============================================================================
// STALE RESPONSES
// =============================================================================

#[tokio::test]
async fn test_response_after_reset_is_discarded() {
    let (backend, gate) = MockBackend::new()
        .with_story(sample_story("old", "A story nobody wants anymore."))
        .gated();
    let store = SessionStore::new(backend);

    let task = tokio::spawn({
        let store = store.clone();
        async move { store.start_story("A rabbit").await }
    });
    wait_for_calls(&store, 1).await;
    assert!(store.snapshot().is_generating);

    store.reset_session();
    gate.release(1);

    let result = task.await.unwrap();
    assert!(matches!(result, Err(StoreError::Superseded)));

    let state = store.snapshot();
    assert!(state.session_id.is_none());
    assert!(state.story.content.is_empty());
    assert!(state.show_mode_selection);
    assert!(!state.is_generating);
}

#[tokio::test]
async fn test_newer_start_wins_over_older() {
    let (backend, gate) = MockBackend::new()
        .with_story(sample_story("first", "The first story."))
        .with_story(sample_story("second", "The second story."))
        .gated();
    let store = SessionStore::new(backend);

    let first = tokio::spawn({
        let store = store.clone();
        async move { store.start_story("first").await }
    });
    wait_for_calls(&store, 1).await;
    let second = tokio::spawn({
        let store = store.clone();
        async move { store.start_story("second").await }
    });
    wait_for_calls(&store, 2).await;

    gate.release(2);
    let first = first.await.unwrap();
    let second = second.await.unwrap();

    // Only the epoch decides which response lands, whatever order the
    // gated calls resume in.
    assert!(matches!(first, Err(StoreError::Superseded)));
    assert!(second.is_ok());
    let state = store.snapshot();
    assert_eq!(state.story.content.len(), 1);
    assert!(state.session_id.is_some());
    assert!(!state.is_generating);
}

#[tokio::test]
async fn test_new_start_during_config_sync_stops_loading() {
    let (backend, gate) = MockBackend::new()
        .with_story(sample_story("s-1", "The first story."))
        .with_story(sample_story("s-2", "A fox story."))
        .with_config(Ok(sample_config_response("s-1", Mode::Story)))
        .gated();
    let store = SessionStore::new(backend);
    gate.release(1);
    store.start_story("A rabbit").await.unwrap();

    let sync = tokio::spawn({
        let store = store.clone();
        async move { store.sync_config().await }
    });
    wait_for_calls(&store, 2).await;
    assert!(store.snapshot().is_loading());

    let start = tokio::spawn({
        let store = store.clone();
        async move { store.start_story("A fox").await }
    });
    wait_for_calls(&store, 3).await;
    gate.release(2);

    assert!(matches!(sync.await.unwrap(), Err(StoreError::Superseded)));
    assert!(start.await.unwrap().is_ok());

    let state = store.snapshot();
    assert_eq!(state.session_id.as_deref(), Some("s-2"));
    assert!(!state.is_loading());
    assert!(!state.is_generating);
}

#[tokio::test]
async fn test_new_start_during_session_info_stops_loading() {
    let (backend, gate) = MockBackend::new()
        .with_tutor(sample_tutor("t-1", "Hi!", None))
        .with_tutor(sample_tutor("t-2", "Hello again!", None))
        .with_session_info(Err(server_error()))
        .gated();
    let store = SessionStore::new(backend);
    gate.release(1);
    store.start_tutor(None, None).await.unwrap();

    let info = tokio::spawn({
        let store = store.clone();
        async move { store.refresh_session_info().await }
    });
    wait_for_calls(&store, 2).await;
    let start = tokio::spawn({
        let store = store.clone();
        async move { store.start_tutor(None, None).await }
    });
    wait_for_calls(&store, 3).await;
    gate.release(2);

    // The failure belongs to the old session, so it leaves no error behind.
    assert!(matches!(info.await.unwrap(), Err(StoreError::Superseded)));
    assert!(start.await.unwrap().is_ok());

    let state = store.snapshot();
    assert_eq!(state.session_id.as_deref(), Some("t-2"));
    assert!(state.error.is_none());
    assert!(!state.is_loading());
}

#[tokio::test]
async fn test_concurrent_catalogue_loads_finish_together() {
    let (backend, gate) = MockBackend::new()
        .with_filters(Ok(sample_filters()))
        .with_subjects(Ok(sample_subjects()))
        .with_health(Ok(sample_health()))
        .gated();
    let store = SessionStore::new(backend);

    let tasks: Vec<_> = (0..3)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                match i {
                    0 => store.load_filters().await,
                    1 => store.load_subjects().await,
                    _ => store.check_health().await,
                }
            })
        })
        .collect();
    wait_for_calls(&store, 3).await;
    assert_eq!(store.snapshot().pending_loads, 3);

    gate.release(1);
    for _ in 0..100 {
        if store.snapshot().pending_loads < 3 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(store.snapshot().pending_loads, 2);
    assert!(store.snapshot().is_loading());

    gate.release(2);
    for task in tasks {
        task.await.unwrap().unwrap();
    }
    let state = store.snapshot();
    assert!(!state.is_loading());
    assert!(state.available_filters.is_some());
    assert!(state.available_subjects.is_some());
    assert!(state.health.is_some());
}

#[tokio::test]
async fn test_failure_after_mode_switch_is_discarded() {
    let (backend, gate) = MockBackend::new()
        .with_story(sample_story("s-1", "Once."))
        .with_story_error(server_error())
        .gated();
    let store = SessionStore::new(backend);
    gate.release(1);
    store.start_story("A rabbit").await.unwrap();

    let task = tokio::spawn({
        let store = store.clone();
        async move { store.continue_story("Pip jumps").await }
    });
    wait_for_calls(&store, 2).await;
    store.set_mode(Mode::Tutor);
    gate.release(1);

    assert!(matches!(task.await.unwrap(), Err(StoreError::Superseded)));
    let state = store.snapshot();
    assert!(state.error.is_none());
    assert_eq!(state.mode, Some(Mode::Tutor));
}
