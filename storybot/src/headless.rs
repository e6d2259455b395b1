//! Headless mode for Storybot.
//!
//! A line-oriented interface for running sessions without a TUI, used for
//! scripted testing and piping transcripts around.
//!
//! - Lines starting with `#` are commands (`#help` lists them)
//! - Any other line is sent as story input or a tutor question
//! - Output lines are tagged: `[STORY]`, `[TUTOR]`, `[CHOICES]`, `[ERROR]`...

use storybot_api::{AgeGroup, ContentFilter, Mode, StoryLength};
use storybot_core::validation::{validate_character_name, validate_subject};
use storybot_core::{Backend, PreferencesPatch, SessionState, SessionStore};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::requests::{execute, route_input, Request};

/// A parsed `#` command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Quit,
    Help,
    Status,
    Mode(Mode),
    New,
    Preferences(PreferencesPatch),
    Subject(Option<String>),
    /// Start a tutor session with just a greeting.
    Start,
    Filters,
    Subjects,
    Health,
    Info,
    Sync,
}

/// One line of headless input.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Blank,
    Text(String),
    Command(Command),
    Invalid(String),
}

const HELP: &[&str] = &[
    "  #mode story|tutor   - Pick a mode",
    "  #new                - Forget the session and pick a mode again",
    "  #filter <name>      - moral_values, educational or fun_only",
    "  #age <group>        - 3-5, 6-8 or 9-12",
    "  #length <len>       - short, medium or long",
    "  #name [name]        - Set or clear the hero's name",
    "  #subject [subject]  - Set or clear the tutor subject",
    "  #start              - Start a tutor session without a question",
    "  #sync               - Send preferences to the current session",
    "  #filters, #subjects - Show what the server offers",
    "  #health, #info      - Server health, current session details",
    "  #status             - Show local state",
    "  #quit               - Exit",
    "  (anything else is sent as story input or a question)",
];

/// Parse a line of input.
pub fn parse_line(line: &str) -> Line {
    let line = line.trim();
    if line.is_empty() {
        return Line::Blank;
    }
    let Some(rest) = line.strip_prefix('#') else {
        return Line::Text(line.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "quit" | "exit" => Ok(Command::Quit),
        "help" => Ok(Command::Help),
        "status" => Ok(Command::Status),
        "mode" => arg.parse().map(Command::Mode).map_err(|e| e.to_string()),
        "new" | "reset" => Ok(Command::New),
        "filter" => arg
            .parse::<ContentFilter>()
            .map(|f| Command::Preferences(PreferencesPatch::default().content_filter(f)))
            .map_err(|e| e.to_string()),
        "age" => arg
            .parse::<AgeGroup>()
            .map(|a| Command::Preferences(PreferencesPatch::default().age_group(a)))
            .map_err(|e| e.to_string()),
        "length" => arg
            .parse::<StoryLength>()
            .map(|l| Command::Preferences(PreferencesPatch::default().story_length(l)))
            .map_err(|e| e.to_string()),
        "name" => validate_character_name(arg)
            .map(|n| Command::Preferences(PreferencesPatch::default().character_name(n)))
            .map_err(|e| e.to_string()),
        "subject" => validate_subject(arg)
            .map(Command::Subject)
            .map_err(|e| e.to_string()),
        "start" => Ok(Command::Start),
        "filters" => Ok(Command::Filters),
        "subjects" => Ok(Command::Subjects),
        "health" => Ok(Command::Health),
        "info" => Ok(Command::Info),
        "sync" => Ok(Command::Sync),
        other => Err(format!("Unknown command #{other}. Type #help for help.")),
    };

    match command {
        Ok(command) => Line::Command(command),
        Err(message) => Line::Invalid(message),
    }
}

/// Describe what changed between two snapshots as tagged output lines.
pub fn describe_update(before: &SessionState, after: &SessionState) -> Vec<String> {
    let mut out = Vec::new();

    if after.story.content.len() > before.story.content.len() {
        for segment in &after.story.content[before.story.content.len()..] {
            out.push("[STORY]".to_string());
            out.extend(segment.split("\n\n").map(str::to_string));
        }
        if !after.story.choices.is_empty() {
            out.push("[CHOICES]".to_string());
            out.extend(numbered(&after.story.choices));
        }
        if after.story.is_complete {
            out.push(format!("[THE END] {} words", after.story.word_count));
        }
    }

    if after.tutor.answers.len() > before.tutor.answers.len() {
        for answer in &after.tutor.answers[before.tutor.answers.len()..] {
            out.push("[TUTOR]".to_string());
            out.extend(answer.split("\n\n").map(str::to_string));
        }
        if !after.tutor.is_appropriate {
            out.push("[NOTE] That question was gently redirected.".to_string());
        }
        if !after.tutor.follow_ups.is_empty() {
            out.push("[FOLLOW-UPS]".to_string());
            out.extend(numbered(&after.tutor.follow_ups));
        }
    }

    if after.error != before.error {
        if let Some(error) = &after.error {
            out.push(format!("[ERROR] {error}"));
        }
    }

    out
}

fn numbered(items: &[String]) -> impl Iterator<Item = String> + '_ {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("  {}. {item}", i + 1))
}

/// Local state summary for `#status`.
pub fn describe_status(state: &SessionState, subject: Option<&str>) -> Vec<String> {
    let prefs = &state.preferences;
    let mut out = vec![
        "[STATUS]".to_string(),
        format!(
            "  Mode: {}",
            state.mode.map(|m| m.to_string()).unwrap_or_else(|| "none".to_string())
        ),
        format!("  Session: {}", state.session_id.as_deref().unwrap_or("none")),
        format!("  Messages: {}", state.message_count),
        format!("  Filter: {}", prefs.content_filter),
        format!("  Age group: {}", prefs.age_group),
        format!("  Length: {}", prefs.story_length),
    ];
    if let Some(name) = &prefs.character_name {
        out.push(format!("  Hero: {name}"));
    }
    if let Some(subject) = subject {
        out.push(format!("  Subject: {subject}"));
    }
    if state.mode == Some(Mode::Story) && state.session_id.is_some() {
        out.push(format!("  Words so far: {}", state.story.word_count));
    }
    out
}

fn describe_catalogues(state: &SessionState, command: &Command) -> Vec<String> {
    let mut out = Vec::new();
    match command {
        Command::Filters => {
            if let Some(filters) = &state.available_filters {
                out.push("[FILTERS]".to_string());
                for name in &filters.available_filters {
                    let marker = if *name == filters.default_filter { " (default)" } else { "" };
                    match filters.descriptions.get(name) {
                        Some(description) => out.push(format!("  {name}{marker}: {description}")),
                        None => out.push(format!("  {name}{marker}")),
                    }
                }
            }
        }
        Command::Subjects => {
            if let Some(subjects) = &state.available_subjects {
                out.push("[SUBJECTS]".to_string());
                for name in &subjects.available_subjects {
                    match subjects.subject_descriptions.get(name) {
                        Some(description) => out.push(format!("  {name}: {description}")),
                        None => out.push(format!("  {name}")),
                    }
                    if let Some(example) = subjects
                        .example_questions
                        .get(name)
                        .and_then(|questions| questions.first())
                    {
                        out.push(format!("    e.g. {example}"));
                    }
                }
            }
        }
        Command::Health => {
            if let Some(health) = &state.health {
                out.push(format!(
                    "[HEALTH] {:?} (v{}, provider {}, sessions in {})",
                    health.status, health.version, health.llm_provider, health.session_backend
                ));
            }
        }
        Command::Info => {
            if let Some(info) = &state.session_info {
                out.push(format!(
                    "[INFO] Session {}: {} messages, last active {}{}",
                    info.session_id,
                    info.message_count,
                    info.last_accessed.format("%Y-%m-%d %H:%M"),
                    if info.is_expired { " (expired)" } else { "" }
                ));
            }
        }
        _ => {}
    }
    out
}

fn print_lines(lines: impl IntoIterator<Item = String>) {
    for line in lines {
        println!("{line}");
    }
}

/// Run a session in headless mode until `#quit` or end of input.
pub async fn run_headless<B: Backend + 'static>(
    store: SessionStore<B>,
    mode: Option<Mode>,
) -> anyhow::Result<()> {
    println!("=== Storybot Headless Mode ===");
    if let Some(mode) = mode {
        store.set_mode(mode);
        println!("Mode: {mode}");
    } else {
        println!("Pick a mode with #mode story or #mode tutor.");
    }
    println!("Type #help for commands.");
    println!();

    let mut subject: Option<String> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let request = match parse_line(&line) {
            Line::Blank => continue,
            Line::Invalid(message) => {
                println!("[ERROR] {message}");
                continue;
            }
            Line::Text(text) => {
                match route_input(&store.snapshot(), &text, subject.as_deref()) {
                    Ok(request) => request,
                    Err(rejected) => {
                        println!("[ERROR] {rejected}");
                        continue;
                    }
                }
            }
            Line::Command(command) => match command {
                Command::Quit => {
                    println!("Goodbye!");
                    break;
                }
                Command::Help => {
                    println!("[HELP]");
                    print_lines(HELP.iter().map(|l| l.to_string()));
                    continue;
                }
                Command::Status => {
                    print_lines(describe_status(&store.snapshot(), subject.as_deref()));
                    continue;
                }
                Command::Subject(new_subject) => {
                    subject = new_subject;
                    println!("[OK] Subject: {}", subject.as_deref().unwrap_or("none"));
                    continue;
                }
                Command::Start => Request::StartTutor {
                    question: None,
                    subject: subject.clone(),
                },
                Command::Mode(mode) => Request::SelectMode(mode),
                Command::New => Request::Reset,
                Command::Preferences(patch) => Request::UpdatePreferences(patch),
                Command::Sync => Request::SyncConfig,
                ref catalogue => {
                    let request = match catalogue {
                        Command::Filters => Request::LoadFilters,
                        Command::Subjects => Request::LoadSubjects,
                        Command::Health => Request::CheckHealth,
                        _ => Request::RefreshSessionInfo,
                    };
                    let before = store.snapshot();
                    match execute(&store, request).await {
                        Ok(()) => print_lines(describe_catalogues(&store.snapshot(), catalogue)),
                        Err(e) => println!("[ERROR] {e}"),
                    }
                    print_lines(
                        describe_update(&before, &store.snapshot())
                            .into_iter()
                            .filter(|l| !l.starts_with("[ERROR]")),
                    );
                    continue;
                }
            },
        };

        if matches!(request, Request::StartTutor { .. }) && store.snapshot().mode != Some(Mode::Tutor) {
            println!("[ERROR] #start only works in tutor mode");
            continue;
        }

        let before = store.snapshot();
        let result = execute(&store, request.clone()).await;
        let after = store.snapshot();

        match result {
            Ok(()) => {
                print_lines(describe_update(&before, &after));
                match request {
                    Request::SelectMode(mode) => println!("[OK] Mode: {mode}"),
                    Request::Reset => println!("[OK] Session cleared"),
                    Request::UpdatePreferences(_) => println!("[OK] Preferences updated"),
                    Request::SyncConfig => println!("[OK] Preferences sent to the session"),
                    _ => {}
                }
            }
            // The store already recorded the message when it has one.
            Err(e) if after.error.is_some() && after.error != before.error => {
                tracing::debug!(error = %e, "request failed");
                print_lines(describe_update(&before, &after));
            }
            Err(e) => println!("[ERROR] {e}"),
        }
        println!();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use storybot_core::testing::{sample_story, sample_tutor};
    use storybot_core::Action;

    #[test]
    fn test_parse_text_and_blank() {
        assert_eq!(parse_line("   "), Line::Blank);
        assert_eq!(
            parse_line("  A dragon who loves tea "),
            Line::Text("A dragon who loves tea".to_string())
        );
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_line("#quit"), Line::Command(Command::Quit));
        assert_eq!(parse_line("#mode tutor"), Line::Command(Command::Mode(Mode::Tutor)));
        assert_eq!(
            parse_line("#age 3-5"),
            Line::Command(Command::Preferences(
                PreferencesPatch::default().age_group(AgeGroup::Preschool)
            ))
        );
        assert_eq!(
            parse_line("#name"),
            Line::Command(Command::Preferences(
                PreferencesPatch::default().character_name(None)
            ))
        );
        assert_eq!(
            parse_line("#subject  math "),
            Line::Command(Command::Subject(Some("math".to_string())))
        );
    }

    #[test]
    fn test_parse_rejects_bad_arguments() {
        assert_eq!(
            parse_line("#length epic"),
            Line::Invalid("unknown story length 'epic'".to_string())
        );
        assert!(matches!(parse_line("#mode"), Line::Invalid(_)));
        assert!(matches!(parse_line("#dance"), Line::Invalid(m) if m.contains("#dance")));
    }

    #[test]
    fn test_describe_story_update() {
        let mut before = SessionState::default();
        before.reduce(Action::SetMode(Mode::Story));
        let mut after = before.clone();
        let mut response = sample_story("s-1", "Once upon a time.\n\nThe end?");
        response.choices = Some(vec!["Yes".to_string(), "No".to_string()]);
        after.reduce(Action::StoryStarted(response));

        assert_eq!(
            describe_update(&before, &after),
            vec![
                "[STORY]",
                "Once upon a time.",
                "The end?",
                "[CHOICES]",
                "  1. Yes",
                "  2. No",
            ]
        );
    }

    #[test]
    fn test_describe_tutor_update_and_error() {
        let mut before = SessionState::default();
        before.reduce(Action::SetMode(Mode::Tutor));
        let mut after = before.clone();
        after.reduce(Action::TutorStarted {
            question: Some("What is 2+2?".to_string()),
            response: sample_tutor("t-1", "Four!", Some("math")),
        });
        let lines = describe_update(&before, &after);
        assert_eq!(lines[0], "[TUTOR]");
        assert_eq!(lines[1], "Four!");

        let mut failed = after.clone();
        failed.reduce(Action::RequestFailed("Server error".to_string()));
        assert_eq!(describe_update(&after, &failed), vec!["[ERROR] Server error"]);
    }

    #[test]
    fn test_status_lists_preferences() {
        let mut state = SessionState::default();
        state.reduce(Action::SetMode(Mode::Story));
        let lines = describe_status(&state, Some("science"));
        assert!(lines.contains(&"  Mode: story".to_string()));
        assert!(lines.contains(&"  Age group: 6-8".to_string()));
        assert!(lines.contains(&"  Subject: science".to_string()));
    }
}
