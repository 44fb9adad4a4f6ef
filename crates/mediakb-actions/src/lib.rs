//! mediakb-actions
//!
//! Custom action server for the assistant: the Rasa webhook protocol types,
//! the knowledge-base query action and the axum router serving them.
pub mod dispatcher;
pub mod events;
pub mod executor;
pub mod mention;
pub mod query_action;
pub mod server;
pub mod tracker;

pub use dispatcher::{BotMessage, CollectingDispatcher};
pub use events::Event;
pub use executor::{Action, ActionCall, ActionExecutor, ActionResponse, ExecutorError};
pub use query_action::{ActionQueryKnowledgeBase, Outcome};
pub use server::router;
pub use tracker::Tracker;
