use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, warn};

use agora_db::Database;
use agora_db::models::MessageRow;
use agora_types::api::{
    ChatMessageView, ChatView, DEFAULT_AD_IMAGE_URL, DEFAULT_AVATAR_URL, InboxEntry, InboxMode,
    InboxView,
};

use crate::conversation::{ConversationId, validate_participants};
use crate::error::ChatError;

/// Content length cap, matching the column limit of the ads platform.
pub const MAX_CONTENT_LEN: usize = 1000;

/// Read-only view of the ads subsystem, as consumed by the messaging core.
pub trait AdLookup: Send + Sync {
    fn owner_and_title(&self, ad_id: i64) -> anyhow::Result<Option<AdSummary>>;
}

/// Read-only view of the identity subsystem.
pub trait UserLookup: Send + Sync {
    fn display(&self, user_id: &str) -> anyhow::Result<Option<UserDisplay>>;
}

#[derive(Debug, Clone)]
pub struct AdSummary {
    pub owner_id: String,
    pub title: String,
    pub preview_image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UserDisplay {
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl AdLookup for Database {
    fn owner_and_title(&self, ad_id: i64) -> anyhow::Result<Option<AdSummary>> {
        Ok(self.get_ad(ad_id)?.map(|ad| AdSummary {
            owner_id: ad.owner_id,
            title: ad.title,
            preview_image_url: ad.preview_image_url,
        }))
    }
}

impl UserLookup for Database {
    fn display(&self, user_id: &str) -> anyhow::Result<Option<UserDisplay>> {
        Ok(self.get_user(user_id)?.map(|user| UserDisplay {
            display_name: user.display_name,
            avatar_url: user.avatar_url,
        }))
    }
}

/// The messaging core: conversation identity, message persistence, transcript
/// reads, and inbox aggregation. The store is the single source of truth; the
/// ad and user lookups are collaborator seams owned by other subsystems.
pub struct ChatService {
    store: Arc<Database>,
    ads: Arc<dyn AdLookup>,
    users: Arc<dyn UserLookup>,
}

impl ChatService {
    pub fn new(store: Arc<Database>, ads: Arc<dyn AdLookup>, users: Arc<dyn UserLookup>) -> Self {
        Self { store, ads, users }
    }

    /// Wires the store as its own ad/user lookup — the common single-process
    /// deployment where all three live in the same SQLite file.
    pub fn with_store(store: Arc<Database>) -> Self {
        let ads: Arc<dyn AdLookup> = store.clone();
        let users: Arc<dyn UserLookup> = store.clone();
        Self { store, ads, users }
    }

    /// Derives the conversation identity for (ad, current, other) after
    /// checking the seller/buyer rule. Read-only beyond the ad lookup.
    pub fn derive_conversation_id(
        &self,
        ad_id: i64,
        current_user_id: &str,
        other_user_id: &str,
    ) -> Result<ConversationId, ChatError> {
        let ad = self
            .ads
            .owner_and_title(ad_id)?
            .ok_or(ChatError::AdNotFound)?;
        let participants = validate_participants(&ad.owner_id, current_user_id, other_user_id)?;
        Ok(ConversationId::new(ad_id, &participants.buyer_id))
    }

    /// Persists a message with its attachments. The id and sent_on timestamp
    /// are assigned here; the row and its image rows commit atomically.
    pub fn save_message(
        &self,
        ad_id: i64,
        sender_id: &str,
        receiver_id: &str,
        content: Option<&str>,
        image_urls: &[String],
    ) -> Result<MessageRow, ChatError> {
        let ad = self
            .ads
            .owner_and_title(ad_id)?
            .ok_or(ChatError::AdNotFound)?;
        validate_participants(&ad.owner_id, sender_id, receiver_id)?;

        let content = content.unwrap_or("");
        if content.trim().is_empty() && image_urls.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if content.chars().count() > MAX_CONTENT_LEN {
            return Err(ChatError::ContentTooLong);
        }

        let sent_on = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let row = self
            .store
            .insert_message(ad_id, sender_id, receiver_id, content, image_urls, &sent_on)?;

        debug!(message_id = row.id, ad_id, "message persisted");
        Ok(row)
    }

    /// Resolves one conversation for rendering: ad header, counterparty
    /// display attributes, and the time-ordered transcript. An empty
    /// transcript is a valid result for a conversation with no history yet.
    pub fn get_chat(
        &self,
        ad_id: i64,
        current_user_id: &str,
        other_user_id: &str,
    ) -> Result<ChatView, ChatError> {
        if other_user_id.trim().is_empty() {
            return Err(ChatError::UserNotFound);
        }

        let ad = self
            .ads
            .owner_and_title(ad_id)?
            .ok_or(ChatError::AdNotFound)?;
        let participants = validate_participants(&ad.owner_id, current_user_id, other_user_id)?;

        let other = self
            .users
            .display(other_user_id)?
            .ok_or(ChatError::UserNotFound)?;

        let transcript = self
            .store
            .get_transcript(ad_id, current_user_id, other_user_id)?;
        let messages = transcript
            .into_iter()
            .map(|row| ChatMessageView {
                sender_id: row.sender_id,
                sender_name: row.sender_name,
                sender_avatar_url: avatar_or_default(row.sender_avatar_url),
                content: row.content,
                image_urls: row.image_urls,
                sent_on: parse_sent_on(&row.sent_on),
            })
            .collect();

        Ok(ChatView {
            ad_id,
            chat_id: ConversationId::new(ad_id, &participants.buyer_id).to_string(),
            ad_title: ad.title,
            ad_image_url: ad
                .preview_image_url
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_AD_IMAGE_URL.to_string()),
            other_user_id: other_user_id.to_string(),
            other_user_name: other.display_name,
            other_user_avatar_url: avatar_or_default(other.avatar_url),
            current_user_id: current_user_id.to_string(),
            messages,
        })
    }

    /// One row per distinct (ad, counterparty) pair showing the most recent
    /// message, newest group first.
    pub fn get_inbox(&self, user_id: &str, mode: InboxMode) -> Result<InboxView, ChatError> {
        let rows = self.store.get_inbox(user_id, mode == InboxMode::Selling)?;

        let chats = rows
            .into_iter()
            .map(|row| InboxEntry {
                ad_id: row.ad_id,
                ad_title: row.ad_title,
                other_user_id: row.other_user_id,
                other_user_name: row.other_user_name,
                other_user_avatar_url: avatar_or_default(row.other_user_avatar_url),
                last_message: row.content,
                last_message_time: parse_sent_on(&row.sent_on),
            })
            .collect();

        Ok(InboxView { mode, chats })
    }
}

fn avatar_or_default(url: Option<String>) -> String {
    url.filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_AVATAR_URL.to_string())
}

fn parse_sent_on(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>().unwrap_or_else(|e| {
        warn!("Corrupt sent_on '{}': {}", raw, e);
        DateTime::default()
    })
}
