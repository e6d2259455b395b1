//! Client tests against an in-process HTTP server.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storybot_api::{
    AgeGroup, ClientConfig, ConfigRequest, ContentFilter, Mode, StoryConfigRequest,
    StoryContinueRequest, StoryLength, StoryStartRequest, StorybotClient, TutorAskRequest,
    TutorStartRequest, API_KEY_HEADER,
};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct Captured {
    bodies: Arc<Mutex<Vec<Value>>>,
    api_keys: Arc<Mutex<Vec<Option<String>>>>,
}

impl Captured {
    fn record(&self, headers: &HeaderMap, body: Value) {
        self.bodies.lock().unwrap().push(body);
        self.api_keys.lock().unwrap().push(
            headers
                .get(API_KEY_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        );
    }

    fn last_body(&self) -> Value {
        self.bodies.lock().unwrap().last().cloned().unwrap_or(Value::Null)
    }
}

fn story_payload(session_id: &str, content: &str, message_count: u32) -> Value {
    json!({
        "session_id": session_id,
        "story_content": content,
        "choices": null,
        "is_complete": false,
        "word_count": content.split_whitespace().count(),
        "content_filter_applied": "educational",
        "message_count": message_count
    })
}

async fn start_story(
    State(captured): State<Captured>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    captured.record(&headers, body);
    (
        StatusCode::CREATED,
        Json(story_payload("abc", "Once upon a time...", 3)),
    )
}

async fn continue_story(
    State(captured): State<Captured>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let session_id = body["session_id"].as_str().unwrap_or_default().to_string();
    captured.record(&headers, body);
    if session_id != "abc" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Session not found or expired" })),
        );
    }
    (
        StatusCode::OK,
        Json(story_payload("abc", "The rabbit hopped into the forest.", 5)),
    )
}

async fn tutor_start(
    State(captured): State<Captured>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    captured.record(&headers, body);
    (
        StatusCode::CREATED,
        Json(json!({
            "session_id": "tutor-1",
            "answer": "Hi! What would you like to learn today?",
            "subject_detected": "general",
            "follow_up_suggestions": ["Why is the sky blue?"],
            "educational_level": "6-8",
            "content_filter_applied": "educational",
            "message_count": 2,
            "is_appropriate": true
        })),
    )
}

async fn tutor_ask(
    State(captured): State<Captured>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    captured.record(&headers, body);
    Json(json!({
        "session_id": "tutor-1",
        "answer": "Sunlight scatters off the air, and blue scatters the most!",
        "subject_detected": "science",
        "follow_up_suggestions": ["What makes a rainbow?", "Why are sunsets orange?"],
        "educational_level": "6-8",
        "content_filter_applied": "educational",
        "message_count": 4,
        "is_appropriate": true
    }))
}

async fn update_session_config(
    State(captured): State<Captured>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let session_id = body["session_id"].clone();
    let filter = body["content_filter"].clone();
    captured.record(&headers, body);
    Json(json!({
        "session_id": session_id,
        "mode": "story",
        "config": { "content_filter": filter, "max_story_length": 1000 },
        "message": "Configuration updated successfully"
    }))
}

async fn update_story_config(
    State(captured): State<Captured>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let session_id = body["session_id"].clone();
    let mut config = serde_json::Map::new();
    for key in ["content_filter", "max_story_length", "story_style"] {
        if !body[key].is_null() {
            config.insert(key.to_string(), body[key].clone());
        }
    }
    captured.record(&headers, body);
    Json(json!({
        "session_id": session_id,
        "config": config,
        "message": "Configuration updated successfully"
    }))
}

async fn update_tutor_config(
    State(captured): State<Captured>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let session_id = body["session_id"].as_str().unwrap_or_default().to_string();
    let age_group = body["age_group"].clone();
    captured.record(&headers, body);
    if session_id != "tutor-1" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Session not found or expired" })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "session_id": session_id,
            "mode": "tutor",
            "config": { "age_group": age_group, "content_filter": "educational" },
            "message": "Tutor configuration updated successfully"
        })),
    )
}

async fn tutor_session(Path(id): Path<String>) -> Json<Value> {
    // Success status, but not a session document.
    Json(json!({ "id": id, "messages": "many" }))
}

async fn session_info(Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    if id != "abc" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Session not found or expired" })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "session_id": id,
            "created_at": "2024-05-01T10:15:30.123456",
            "last_accessed": "2024-05-01T10:20:00.000001",
            "message_count": 5,
            "config": { "content_filter": "educational", "max_story_length": 1000 },
            "is_expired": false
        })),
    )
}

async fn spawn_server() -> (String, Captured) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    let captured = Captured::default();

    let app = Router::new()
        .route(
            "/health",
            get(|| async {
                Json(json!({
                    "status": "healthy",
                    "version": "1.0.0",
                    "llm_provider": "openai",
                    "session_backend": "memory",
                    "timestamp": "2024-05-01T10:00:00.000000"
                }))
            }),
        )
        .route(
            "/",
            get(|| async {
                Json(json!({
                    "name": "Kids Storytelling Bot",
                    "version": "1.0.0",
                    "description": "Create engaging, safe stories for children",
                    "endpoints": { "health": "/health", "story_start": "/story/start" }
                }))
            }),
        )
        .route(
            "/story/filters",
            get(|| async {
                Json(json!({
                    "available_filters": ["moral_values", "educational", "fun_only"],
                    "descriptions": {
                        "moral_values": "Positive values",
                        "educational": "Learning opportunities",
                        "fun_only": "Pure entertainment"
                    },
                    "default_filter": "educational"
                }))
            }),
        )
        .route(
            "/tutor/subjects",
            get(|| async {
                Json(json!({
                    "available_subjects": ["math", "science"],
                    "subject_descriptions": { "math": "Numbers", "science": "Nature" },
                    "example_questions": { "science": ["How do plants grow?"] }
                }))
            }),
        )
        .route("/story/start", post(start_story))
        .route("/story/continue", post(continue_story))
        .route("/story/session/:id", get(session_info))
        .route("/tutor/start", post(tutor_start))
        .route("/tutor/ask", post(tutor_ask))
        .route("/story/config", put(update_story_config))
        .route("/tutor/config", put(update_tutor_config))
        .route("/tutor/session/:id", get(tutor_session))
        .route("/config/session", put(update_session_config))
        .route(
            "/config/filters",
            get(|| async {
                Json(json!({
                    "available_filters": ["moral_values", "educational", "fun_only"],
                    "descriptions": {
                        "moral_values": "Positive values",
                        "educational": "Learning opportunities",
                        "fun_only": "Pure entertainment"
                    },
                    "default_filter": "educational",
                    "applies_to_modes": ["story", "tutor"],
                    "filter_effects": {
                        "fun_only": {
                            "story": "Silly adventures",
                            "tutor": "Playful explanations"
                        }
                    }
                }))
            }),
        )
        .route(
            "/config/system",
            get(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "Internal server error",
                        "detail": "An unexpected error occurred"
                    })),
                )
            }),
        )
        .with_state(captured.clone());

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{addr}"), captured)
}

async fn spawn_slow_server(delay: Duration) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
    let addr = listener.local_addr().expect("local addr");

    let app = Router::new().route(
        "/health",
        get(move || async move {
            tokio::time::sleep(delay).await;
            Json(json!({
                "status": "healthy",
                "version": "1.0.0",
                "llm_provider": "openai",
                "session_backend": "memory"
            }))
        }),
    );

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn health_and_service_info() {
    let (url, _) = spawn_server().await;
    let client = StorybotClient::new(ClientConfig::new(url)).unwrap();

    let health = client.health().await.unwrap();
    assert!(health.is_healthy());
    assert_eq!(health.version, "1.0.0");

    let info = client.service_info().await.unwrap();
    assert_eq!(info.name, "Kids Storytelling Bot");
    assert_eq!(info.endpoints["health"], "/health");
}

#[tokio::test]
async fn start_story_sends_configuration_and_api_key() {
    let (url, captured) = spawn_server().await;
    let client = StorybotClient::new(ClientConfig::new(url).with_api_key("family-key")).unwrap();

    let request = StoryStartRequest {
        prompt: "A brave little rabbit".to_string(),
        character_name: Some("Clover".to_string()),
        age_group: Some(AgeGroup::Preteen),
        story_length: Some(StoryLength::Short),
        content_filter: Some(ContentFilter::MoralValues),
    };
    let response = client.start_story(&request).await.unwrap();

    assert_eq!(response.session_id, "abc");
    assert_eq!(response.story_content, "Once upon a time...");
    assert!(!response.is_complete);

    let body = captured.last_body();
    assert_eq!(body["prompt"], "A brave little rabbit");
    assert_eq!(body["character_name"], "Clover");
    assert_eq!(body["age_group"], "9-12");
    assert_eq!(body["story_length"], "short");
    assert_eq!(body["content_filter"], "moral_values");
    assert_eq!(
        captured.api_keys.lock().unwrap().last().cloned().flatten().as_deref(),
        Some("family-key")
    );
}

#[tokio::test]
async fn api_key_header_absent_when_not_configured() {
    let (url, captured) = spawn_server().await;
    let client = StorybotClient::new(ClientConfig::new(url)).unwrap();

    client
        .start_story(&StoryStartRequest::new("Space pirates"))
        .await
        .unwrap();

    assert_eq!(captured.api_keys.lock().unwrap().last().cloned().flatten(), None);
    assert_eq!(captured.last_body(), json!({ "prompt": "Space pirates" }));
}

#[tokio::test]
async fn continue_story_with_unknown_session_maps_to_404() {
    let (url, _) = spawn_server().await;
    let client = StorybotClient::new(ClientConfig::new(url)).unwrap();

    let err = client
        .continue_story(&StoryContinueRequest {
            session_id: "missing".to_string(),
            user_input: "The rabbit finds a key".to_string(),
            choice: None,
        })
        .await
        .unwrap_err();

    assert_eq!(err.status, 404);
    assert_eq!(err.message, "Session not found or expired");
    assert!(err.user_message().contains("expired"));
}

#[tokio::test]
async fn server_error_body_is_normalized() {
    let (url, _) = spawn_server().await;
    let client = StorybotClient::new(ClientConfig::new(url)).unwrap();

    let err = client.system_config().await.unwrap_err();
    assert_eq!(err.status, 500);
    assert_eq!(err.message, "Internal server error");
    assert_eq!(err.detail.as_deref(), Some("An unexpected error occurred"));
    assert!(err.user_message().contains("try again later"));
}

#[tokio::test]
async fn tutor_flow() {
    let (url, captured) = spawn_server().await;
    let client = StorybotClient::new(ClientConfig::new(url)).unwrap();

    let start = client
        .start_tutor(&TutorStartRequest {
            age_group: Some(AgeGroup::EarlyReader),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(start.session_id, "tutor-1");
    assert_eq!(captured.last_body(), json!({ "age_group": "6-8" }));

    let answer = client
        .ask_question(&TutorAskRequest {
            session_id: start.session_id.clone(),
            question: "Why is the sky blue?".to_string(),
            subject_hint: Some("science".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(answer.subject_detected.as_deref(), Some("science"));
    assert_eq!(answer.follow_up_suggestions.unwrap().len(), 2);
    assert_eq!(captured.last_body()["subject_hint"], "science");
}

#[tokio::test]
async fn option_catalogues_and_session_info() {
    let (url, _) = spawn_server().await;
    let client = StorybotClient::new(ClientConfig::new(url)).unwrap();

    let filters = client.story_filters().await.unwrap();
    assert_eq!(filters.available_filters.len(), 3);
    assert_eq!(filters.default_filter, "educational");

    let subjects = client.tutor_subjects().await.unwrap();
    assert_eq!(subjects.examples_for("science"), ["How do plants grow?".to_string()]);
    assert!(subjects.examples_for("math").is_empty());

    let info = client.story_session("abc").await.unwrap();
    assert_eq!(info.message_count, 5);
    assert!(!info.is_expired);

    let err = client.story_session("nope").await.unwrap_err();
    assert_eq!(err.status, 404);
}

#[tokio::test]
async fn shared_config_update_echoes_mode() {
    let (url, captured) = spawn_server().await;
    let client = StorybotClient::new(ClientConfig::new(url)).unwrap();

    let response = client
        .update_session_config(&ConfigRequest {
            session_id: "abc".to_string(),
            content_filter: Some(ContentFilter::FunOnly),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(response.mode, Mode::Story);
    assert_eq!(response.config["content_filter"], "fun_only");
    assert_eq!(
        captured.last_body(),
        json!({ "session_id": "abc", "content_filter": "fun_only" })
    );
}

#[tokio::test]
async fn story_config_update_sends_only_set_fields() {
    let (url, captured) = spawn_server().await;
    let client = StorybotClient::new(ClientConfig::new(url)).unwrap();

    let response = client
        .update_story_config(&StoryConfigRequest {
            session_id: "abc".to_string(),
            content_filter: Some(ContentFilter::MoralValues),
            max_story_length: Some(300),
            story_style: None,
        })
        .await
        .unwrap();

    assert_eq!(response.session_id, "abc");
    assert_eq!(response.config["content_filter"], "moral_values");
    assert_eq!(response.config["max_story_length"], 300);
    assert!(!response.config.contains_key("story_style"));
    assert_eq!(response.message, "Configuration updated successfully");
    assert_eq!(
        captured.last_body(),
        json!({ "session_id": "abc", "content_filter": "moral_values", "max_story_length": 300 })
    );
}

#[tokio::test]
async fn tutor_config_update() {
    let (url, captured) = spawn_server().await;
    let client = StorybotClient::new(ClientConfig::new(url).with_api_key("family-key")).unwrap();

    let response = client
        .update_tutor_config(&ConfigRequest {
            session_id: "tutor-1".to_string(),
            age_group: Some(AgeGroup::Preschool),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(response.mode, Mode::Tutor);
    assert_eq!(response.config["age_group"], "3-5");
    assert_eq!(
        captured.last_body(),
        json!({ "session_id": "tutor-1", "age_group": "3-5" })
    );
    assert_eq!(
        captured.api_keys.lock().unwrap().last().cloned().flatten().as_deref(),
        Some("family-key")
    );

    let err = client
        .update_tutor_config(&ConfigRequest {
            session_id: "gone".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.status, 404);
}

#[tokio::test]
async fn config_filters_include_mode_effects() {
    let (url, _) = spawn_server().await;
    let client = StorybotClient::new(ClientConfig::new(url)).unwrap();

    let filters = client.config_filters().await.unwrap();
    assert_eq!(filters.available_filters.len(), 3);
    assert_eq!(filters.default_filter, "educational");
    assert_eq!(filters.applies_to_modes, ["story", "tutor"]);
    assert_eq!(filters.filter_effects["fun_only"]["tutor"], "Playful explanations");
    assert_eq!(
        filters.description(ContentFilter::Educational),
        Some("Learning opportunities")
    );

    // The story catalogue has no per-mode section.
    let story_filters = client.story_filters().await.unwrap();
    assert!(story_filters.applies_to_modes.is_empty());
    assert!(story_filters.filter_effects.is_empty());
}

#[tokio::test]
async fn undecodable_success_body_keeps_its_status() {
    let (url, _) = spawn_server().await;
    let client = StorybotClient::new(ClientConfig::new(url)).unwrap();

    let err = client.tutor_session("tutor-1").await.unwrap_err();
    assert_eq!(err.status, 200);
    assert!(!err.is_transport());
    assert!(err.is_invalid_response());
    assert!(!err.user_message().contains("reach"));
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    // Bind then drop a listener so the port is very likely closed.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = StorybotClient::new(ClientConfig::new(format!("http://{addr}"))).unwrap();
    let err = client.health().await.unwrap_err();

    assert_eq!(err.status, 0);
    assert!(err.is_transport());
    assert!(err.user_message().contains("connection"));
}

#[tokio::test]
async fn slow_responses_time_out() {
    let url = spawn_slow_server(Duration::from_secs(5)).await;
    let client = StorybotClient::new(
        ClientConfig::new(url).with_timeout(Duration::from_millis(200)),
    )
    .unwrap();

    let err = client.health().await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(err.message, "Request timed out");
}
