use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    Extension, Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::IntoResponse,
};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::warn;
use uuid::Uuid;

use agora_chat::ChatError;

use crate::AppStateInner;
use crate::middleware::Claims;

/// 5 MiB upload limit for chat images
const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

/// MIME type -> stored file extension. Anything else is rejected.
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
];

/// Local-disk image store. Files land under `{root}/chat/{uuid}.{ext}` and
/// are served back at `/uploads/chat/{uuid}.{ext}`.
#[derive(Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validates and persists one image, returning its public URL. All
    /// validation lives here — size cap and MIME allow-list.
    pub async fn store(&self, bytes: &[u8], content_type: &str) -> Result<String, ChatError> {
        if bytes.is_empty() {
            return Err(ChatError::ImageUploadFailed("image is empty".to_string()));
        }
        if bytes.len() > MAX_IMAGE_SIZE {
            return Err(ChatError::ImageUploadFailed(
                "image size exceeds limit".to_string(),
            ));
        }

        let ext = ALLOWED_TYPES
            .iter()
            .find(|(mime, _)| *mime == content_type)
            .map(|(_, ext)| *ext)
            .ok_or_else(|| {
                ChatError::ImageUploadFailed(format!("unsupported image type: {content_type}"))
            })?;

        let dir = self.root.join("chat");
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ChatError::ImageUploadFailed(format!("create upload dir: {e}")))?;

        let file_name = format!("{}.{}", Uuid::new_v4(), ext);
        let path = dir.join(&file_name);
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| ChatError::ImageUploadFailed(format!("create {}: {e}", path.display())))?;
        file.write_all(bytes)
            .await
            .map_err(|e| ChatError::ImageUploadFailed(format!("write {}: {e}", path.display())))?;

        Ok(format!("/uploads/chat/{file_name}"))
    }
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub image_url: String,
}

/// POST /chat/images — accepts raw image bytes with the MIME type in the
/// Content-Type header, returns { image_url } for use in a later send.
pub async fn upload_chat_image(
    State(state): State<Arc<AppStateInner>>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    bytes: Bytes,
) -> Result<impl IntoResponse, StatusCode> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let image_url = state.images.store(&bytes, content_type).await.map_err(|e| {
        warn!("{} chat image upload failed: {}", claims.sub, e);
        StatusCode::BAD_REQUEST
    })?;

    Ok((StatusCode::CREATED, Json(UploadResponse { image_url })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> ImageStore {
        let dir = std::env::temp_dir().join(format!("agora-images-{}", Uuid::new_v4()));
        ImageStore::new(dir)
    }

    #[tokio::test]
    async fn stores_allowed_types_and_returns_public_url() {
        let store = temp_store();
        let url = store.store(b"\xff\xd8\xff fake jpeg", "image/jpeg").await.unwrap();
        assert!(url.starts_with("/uploads/chat/"));
        assert!(url.ends_with(".jpg"));

        let on_disk = store.root().join("chat").join(url.rsplit('/').next().unwrap());
        assert!(on_disk.exists());
    }

    #[tokio::test]
    async fn rejects_empty_oversized_and_unknown_types() {
        let store = temp_store();

        assert!(store.store(b"", "image/png").await.is_err());
        assert!(store.store(b"GIF89a", "image/gif").await.is_err());

        let oversized = vec![0u8; MAX_IMAGE_SIZE + 1];
        assert!(store.store(&oversized, "image/png").await.is_err());
    }
}
