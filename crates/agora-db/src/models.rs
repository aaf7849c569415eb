/// Database row types — these map directly to SQLite rows.
/// Distinct from agora-types view models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

pub struct AdRow {
    pub id: i64,
    pub owner_id: String,
    pub title: String,
    pub preview_image_url: Option<String>,
}

/// A persisted message with its attachment URLs in send order.
#[derive(Debug)]
pub struct MessageRow {
    pub id: i64,
    pub ad_id: i64,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub sent_on: String,
    pub image_urls: Vec<String>,
}

/// Transcript row: message plus resolved sender display attributes.
pub struct TranscriptRow {
    pub id: i64,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_avatar_url: Option<String>,
    pub content: String,
    pub sent_on: String,
    pub image_urls: Vec<String>,
}

/// The latest message of one (ad, counterparty) group.
pub struct InboxRow {
    pub ad_id: i64,
    pub ad_title: String,
    pub other_user_id: String,
    pub other_user_name: String,
    pub other_user_avatar_url: Option<String>,
    pub content: String,
    pub sent_on: String,
}
