//! Session state container for the Storybot client.
//!
//! This crate provides:
//! - A reducer-based session state covering story and tutor conversations
//! - `SessionStore`, an observable store that talks to the backend
//! - Input validation the views run before dispatching
//! - Mode descriptors and test doubles
//!
//! # Quick Start
//!
//! ```ignore
//! use storybot_api::StorybotClient;
//! use storybot_core::SessionStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SessionStore::new(StorybotClient::from_env()?);
//!
//!     store.start_story("A brave little rabbit").await?;
//!     store.continue_story("The rabbit finds a carrot").await?;
//!
//!     for segment in &store.snapshot().story.content {
//!         println!("{segment}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod modes;
pub mod state;
pub mod store;
pub mod testing;
pub mod validation;

pub use backend::Backend;
pub use modes::{ModeExt, ModeInfo, MODES};
pub use state::{Action, Preferences, PreferencesPatch, SessionState, StoryState, TutorState};
pub use store::{SessionStore, StoreError};
pub use testing::MockBackend;
pub use validation::ValidationError;
