use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fallback shown for users who never uploaded a profile picture.
pub const DEFAULT_AVATAR_URL: &str = "/images/default-avatar.png";

/// Fallback shown for ads with no photos.
pub const DEFAULT_AD_IMAGE_URL: &str = "/images/no-image.png";

// -- JWT Claims --

/// JWT claims shared across agora-api (REST middleware) and agora-gateway
/// (WebSocket Identify handshake). Canonical definition lives here in
/// agora-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id of the authenticated caller.
    pub sub: String,
    /// Display name, carried so the gateway can greet without a DB read.
    pub name: String,
    pub exp: usize,
}

// -- Inbox --

/// Which side of the market an inbox view covers. Selling restricts to
/// messages on ads the caller owns, buying to everyone else's ads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InboxMode {
    #[default]
    Buying,
    Selling,
}

/// One inbox row: the latest message exchanged with a single counterparty
/// about a single ad.
#[derive(Debug, Clone, Serialize)]
pub struct InboxEntry {
    pub ad_id: i64,
    pub ad_title: String,
    pub other_user_id: String,
    pub other_user_name: String,
    pub other_user_avatar_url: String,
    pub last_message: String,
    pub last_message_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InboxView {
    pub mode: InboxMode,
    pub chats: Vec<InboxEntry>,
}

// -- Chat --

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessageView {
    pub sender_id: String,
    pub sender_name: String,
    pub sender_avatar_url: String,
    pub content: String,
    pub image_urls: Vec<String>,
    pub sent_on: DateTime<Utc>,
}

/// Full state for one open conversation: ad header, counterparty display
/// attributes, and the time-ordered transcript.
#[derive(Debug, Clone, Serialize)]
pub struct ChatView {
    pub ad_id: i64,
    pub chat_id: String,
    pub ad_title: String,
    pub ad_image_url: String,
    pub other_user_id: String,
    pub other_user_name: String,
    pub other_user_avatar_url: String,
    pub current_user_id: String,
    pub messages: Vec<ChatMessageView>,
}
