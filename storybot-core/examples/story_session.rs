//! Quick end-to-end check against a running Storybot backend.
//!
//! Run with: `cargo run -p storybot-core --example story_session`

use storybot_api::{AgeGroup, StorybotClient};
use storybot_core::{PreferencesPatch, SessionStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    println!("=== Storybot session check ===\n");

    let client = StorybotClient::from_env()?;
    println!("1. Backend: {}", client.base_url());
    let store = SessionStore::new(client);

    store.check_health().await?;
    if let Some(health) = &store.snapshot().health {
        println!("   {:?}, version {}", health.status, health.version);
    }

    println!("\n2. Starting a story...");
    store.set_config(PreferencesPatch::default().age_group(AgeGroup::Preschool));
    store.start_story("A brave little rabbit").await?;
    let state = store.snapshot();
    println!(
        "   Session {} ({} messages)",
        state.session_id.as_deref().unwrap_or("?"),
        state.message_count
    );

    println!("\n3. Continuing...");
    store.continue_story("The rabbit finds a carrot").await?;

    println!("\n4. Story so far:");
    println!("   ---");
    for (input, segment) in store.snapshot().story.turns() {
        if let Some(input) = input {
            println!("   > {input}");
        }
        for line in segment.lines() {
            println!("   {line}");
        }
    }
    println!("   ---");

    println!("\n=== Done ===");
    Ok(())
}
