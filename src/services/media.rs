use std::io::ErrorKind;
use std::path::PathBuf;

use axum::async_trait;
use axum::body::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::models::post::{MediaFile, MediaRef};

/// File storage collaborator. Uploaded files are addressed by an opaque id
/// and served back under `/media/{id}`.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, file: MediaFile) -> anyhow::Result<MediaRef>;
    async fn delete(&self, media: &MediaRef) -> anyhow::Result<()>;
    async fn fetch(&self, id: &str) -> anyhow::Result<Option<MediaFile>>;
}

pub fn media_ref(id: String) -> MediaRef {
    MediaRef {
        url: format!("/media/{id}"),
        id,
    }
}

pub fn new_media_id(file: &MediaFile) -> String {
    format!("{}.{}", Uuid::now_v7(), file.extension())
}

/// Ids are `<uuid>.<ext>`; anything else could escape the media directory.
pub fn is_media_id(id: &str) -> bool {
    match id.split_once('.') {
        Some((stem, ext)) => {
            Uuid::parse_str(stem).is_ok()
                && !ext.is_empty()
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        }
        None => false,
    }
}

#[derive(Clone, Debug)]
pub struct LocalMediaStore {
    root: PathBuf,
}

impl LocalMediaStore {
    pub async fn open(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        info!(root = %root.display(), "Media store ready");
        Ok(Self { root })
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    #[tracing::instrument(skip_all, fields(name = %file.file_name, len = file.bytes.len()))]
    async fn upload(&self, file: MediaFile) -> anyhow::Result<MediaRef> {
        let id = new_media_id(&file);
        tokio::fs::write(self.root.join(&id), &file.bytes).await?;
        Ok(media_ref(id))
    }

    async fn delete(&self, media: &MediaRef) -> anyhow::Result<()> {
        anyhow::ensure!(is_media_id(&media.id), "bad media id {}", media.id);
        match tokio::fs::remove_file(self.root.join(&media.id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn fetch(&self, id: &str) -> anyhow::Result<Option<MediaFile>> {
        if !is_media_id(id) {
            return Ok(None);
        }
        match tokio::fs::read(self.root.join(id)).await {
            Ok(bytes) => Ok(Some(MediaFile::new(id.to_owned(), None, Bytes::from(bytes)))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_ids_are_checked() {
        let id = format!("{}.png", Uuid::now_v7());
        assert!(is_media_id(&id));
        assert!(!is_media_id("../etc/passwd"));
        assert!(!is_media_id("plain"));
        assert!(!is_media_id(&format!("{}./png", Uuid::now_v7())));
    }

    #[tokio::test]
    async fn local_store_upload_fetch_delete() {
        let root = std::env::temp_dir().join(format!("hivelink-media-{}", Uuid::now_v7()));
        let store = LocalMediaStore::open(&root).await.unwrap();

        let file = MediaFile::new(
            "cat.png".into(),
            Some("image/png".into()),
            Bytes::from_static(b"\x89PNG"),
        );
        let media = store.upload(file).await.unwrap();
        assert!(media.id.ends_with(".png"));
        assert_eq!(media.url, format!("/media/{}", media.id));

        let fetched = store.fetch(&media.id).await.unwrap().unwrap();
        assert_eq!(fetched.content_type, "image/png");
        assert_eq!(&fetched.bytes[..], b"\x89PNG");

        store.delete(&media).await.unwrap();
        assert!(store.fetch(&media.id).await.unwrap().is_none());
        // deleting twice is fine
        store.delete(&media).await.unwrap();

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
