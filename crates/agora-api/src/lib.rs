pub mod chats;
pub mod images;
pub mod middleware;

use std::sync::Arc;

use agora_chat::ChatService;

use crate::images::ImageStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub chat: Arc<ChatService>,
    pub images: ImageStore,
}
