use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, warn};
use uuid::Uuid;

/// Staging area for uploaded article images. Files are written before the
/// referencing record commits; callers delete again on validation failure.
#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Persist an uploaded file and return the public path it is served under.
    async fn stage(&self, stem: &str, ext: &str, body: Bytes) -> anyhow::Result<String>;

    /// Best-effort removal of a staged file. Failures are logged, never
    /// surfaced to the client.
    async fn delete(&self, public_path: &str);
}

/// Local-disk store rooted at the public directory; article images land
/// under `<public>/uploads/articles/` and are served back under the same
/// URL prefix.
pub struct DiskStore {
    root: PathBuf,
}

const ARTICLES_PREFIX: &str = "uploads/articles";

impl DiskStore {
    pub async fn new(public_dir: &Path) -> anyhow::Result<Self> {
        let dir = public_dir.join(ARTICLES_PREFIX);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("create upload directory {}", dir.display()))?;
        Ok(Self {
            root: public_dir.to_path_buf(),
        })
    }

    fn resolve(&self, public_path: &str) -> Option<PathBuf> {
        let rel = public_path.strip_prefix('/')?;
        if rel.contains("..") {
            return None;
        }
        Some(self.root.join(rel))
    }
}

#[async_trait]
impl UploadStore for DiskStore {
    async fn stage(&self, stem: &str, ext: &str, body: Bytes) -> anyhow::Result<String> {
        let name = format!("{}-{}.{}", sanitize_stem(stem), Uuid::new_v4(), ext);
        let path = self.root.join(ARTICLES_PREFIX).join(&name);
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write staged upload {}", path.display()))?;
        debug!(path = %path.display(), bytes = body.len(), "upload staged");
        Ok(format!("/{ARTICLES_PREFIX}/{name}"))
    }

    async fn delete(&self, public_path: &str) {
        let Some(path) = self.resolve(public_path) else {
            return;
        };
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(error = %e, path = %path.display(), "failed to remove staged upload");
            }
        }
    }
}

/// Lowercases the original file stem and replaces anything outside `[a-z0-9]`
/// with `_`, matching the persisted image-path pattern.
fn sanitize_stem(stem: &str) -> String {
    let cleaned: String = stem
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned
    }
}

/// Extension for accepted upload content types.
pub fn ext_from_mime(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("artichat-storage-{}", Uuid::new_v4()))
    }

    #[test]
    fn sanitize_replaces_special_characters() {
        assert_eq!(sanitize_stem("My Photo (1)"), "my_photo__1_");
        assert_eq!(sanitize_stem("cover"), "cover");
        assert_eq!(sanitize_stem(""), "image");
    }

    #[test]
    fn ext_from_mime_accepts_image_types_only() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/gif"), Some("gif"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("application/pdf"), None);
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[tokio::test]
    async fn stage_writes_file_and_returns_public_path() {
        let root = temp_root();
        let store = DiskStore::new(&root).await.expect("create store");

        let path = store
            .stage("cover", "jpg", Bytes::from_static(b"fake image bytes"))
            .await
            .expect("stage upload");

        assert!(path.starts_with("/uploads/articles/cover-"));
        assert!(path.ends_with(".jpg"));

        let on_disk = root.join(path.trim_start_matches('/'));
        let contents = tokio::fs::read(&on_disk).await.expect("staged file exists");
        assert_eq!(contents, b"fake image bytes");

        tokio::fs::remove_dir_all(&root).await.ok();
    }

    #[tokio::test]
    async fn delete_removes_staged_file_and_ignores_missing() {
        let root = temp_root();
        let store = DiskStore::new(&root).await.expect("create store");

        let path = store
            .stage("gone", "png", Bytes::from_static(b"bytes"))
            .await
            .expect("stage upload");
        let on_disk = root.join(path.trim_start_matches('/'));
        assert!(on_disk.exists());

        store.delete(&path).await;
        assert!(!on_disk.exists());

        // A second delete of the same path is a quiet no-op.
        store.delete(&path).await;
        store.delete("/uploads/articles/never-existed.jpg").await;

        tokio::fs::remove_dir_all(&root).await.ok();
    }

    #[tokio::test]
    async fn delete_rejects_traversal_paths() {
        let root = temp_root();
        let store = DiskStore::new(&root).await.expect("create store");

        let outside = root.join("outside.txt");
        tokio::fs::write(&outside, b"keep me").await.expect("write");

        store.delete("/uploads/articles/../../outside.txt").await;
        assert!(outside.exists());

        tokio::fs::remove_dir_all(&root).await.ok();
    }
}
