use serde::{Deserialize, Serialize};

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: String, display_name: String },

    /// A message in one of the client's joined chats was persisted.
    /// Delivered to every room member, the sender's own connections
    /// included, so multi-tab sessions stay in sync.
    ReceiveMessage {
        sender_id: String,
        content: String,
        image_urls: Vec<String>,
        /// ISO 8601 UTC timestamp assigned at persistence time.
        sent_on: String,
    },

    /// A SendMessage command failed validation. Sent only to the
    /// connection that issued the command, never broadcast.
    SendRejected { reason: String },
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Join the broadcast group for one conversation. Membership is
    /// advisory fan-out state; the authoritative participant check
    /// happens at send time.
    JoinChat { chat_id: String },

    /// Send a message into a conversation. The authenticated caller is
    /// the implicit sender.
    SendMessage {
        ad_id: i64,
        chat_id: String,
        receiver_id: String,
        #[serde(default)]
        content: Option<String>,
        #[serde(default)]
        image_urls: Vec<String>,
    },
}
