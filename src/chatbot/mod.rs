pub mod engine;
pub mod messages;
pub mod session_store;
pub mod state;

pub use engine::{DialogueEngine, ValidationError};
pub use session_store::{InMemorySessionStore, SessionError, SessionStore};
pub use state::{ConversationState, Reply, Stage};
