pub mod conversation;
pub mod error;
pub mod service;

pub use conversation::ConversationId;
pub use error::ChatError;
pub use service::{AdLookup, AdSummary, ChatService, UserDisplay, UserLookup};
