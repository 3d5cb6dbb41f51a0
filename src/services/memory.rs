use axum::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::post::{MediaFile, MediaRef, NewPost, Post, PostUpdate};
use crate::models::user::{CreateUser, Session, User};

use super::media::{is_media_id, media_ref, new_media_id, MediaStore};
use super::posts::PostService;
use super::sessions::SessionService;
use super::users::UserService;

/// Process-local backend. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryBackend {
    users: DashMap<Uuid, User>,
    posts: DashMap<Uuid, Post>,
    sessions: DashMap<Uuid, Uuid>,
    media: DashMap<String, MediaFile>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn newest_first(&self, limit: i64, keep: impl Fn(&Post) -> bool) -> Vec<Post> {
        let mut ps: Vec<Post> = self
            .posts
            .iter()
            .filter(|p| keep(p.value()))
            .map(|p| p.value().clone())
            .collect();
        ps.sort_by(|a, b| b.id.cmp(&a.id));
        ps.truncate(usize::try_from(limit).unwrap_or(0));
        ps
    }

    #[cfg(test)]
    pub fn media_count(&self) -> usize {
        self.media.len()
    }
}

#[async_trait]
impl UserService for MemoryBackend {
    async fn get_users(&self, limit: i64) -> anyhow::Result<Vec<User>> {
        let mut us: Vec<User> = self.users.iter().map(|u| u.value().clone()).collect();
        us.sort_by(|a, b| b.id.cmp(&a.id));
        us.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(us)
    }

    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn create_user(&self, u: &CreateUser) -> anyhow::Result<User> {
        let user = User::from_new(u);
        let taken = self
            .users
            .iter()
            .any(|other| other.email == user.email || other.username == user.username);
        anyhow::ensure!(!taken, "email or username already registered");
        self.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl SessionService for MemoryBackend {
    async fn sign_in(&self, email: &str) -> anyhow::Result<Option<Session>> {
        let email = email.trim().to_lowercase();
        let Some(user_id) = self
            .users
            .iter()
            .find(|u| u.email == email)
            .map(|u| u.id)
        else {
            return Ok(None);
        };
        let session = Session::start(user_id);
        self.sessions.insert(session.token, user_id);
        Ok(Some(session))
    }

    async fn current_user(&self, token: Uuid) -> anyhow::Result<Option<User>> {
        let Some(user_id) = self.sessions.get(&token).map(|s| *s.value()) else {
            return Ok(None);
        };
        Ok(self.users.get(&user_id).map(|u| u.value().clone()))
    }

    async fn sign_out(&self, token: Uuid) -> anyhow::Result<()> {
        self.sessions
            .remove(&token)
            .map(|_| ())
            .ok_or_else(|| anyhow::anyhow!("no such session"))
    }
}

#[async_trait]
impl PostService for MemoryBackend {
    async fn create_post(&self, p: NewPost) -> anyhow::Result<Option<Post>> {
        let post = Post::from_new(p);
        self.posts.insert(post.id, post.clone());
        Ok(Some(post))
    }

    async fn update_post(&self, update: PostUpdate) -> anyhow::Result<Option<Post>> {
        let Some(mut post) = self.posts.get_mut(&update.post_id) else {
            return Ok(None);
        };
        post.apply(update.changes());
        Ok(Some(post.clone()))
    }

    async fn get_post(&self, id: Uuid) -> anyhow::Result<Option<Post>> {
        Ok(self.posts.get(&id).map(|p| p.value().clone()))
    }

    async fn recent_posts(&self, limit: i64) -> anyhow::Result<Vec<Post>> {
        Ok(self.newest_first(limit, |_| true))
    }

    async fn posts_with_tag(&self, tag: &str, limit: i64) -> anyhow::Result<Vec<Post>> {
        Ok(self.newest_first(limit, |p| p.tags.iter().any(|t| t == tag)))
    }

    async fn posts_by_creator(&self, user_id: Uuid, limit: i64) -> anyhow::Result<Vec<Post>> {
        Ok(self.newest_first(limit, |p| p.creator_id == user_id))
    }
}

#[async_trait]
impl MediaStore for MemoryBackend {
    async fn upload(&self, file: MediaFile) -> anyhow::Result<MediaRef> {
        let id = new_media_id(&file);
        self.media.insert(id.clone(), file);
        Ok(media_ref(id))
    }

    async fn delete(&self, media: &MediaRef) -> anyhow::Result<()> {
        self.media.remove(&media.id);
        Ok(())
    }

    async fn fetch(&self, id: &str) -> anyhow::Result<Option<MediaFile>> {
        if !is_media_id(id) {
            return Ok(None);
        }
        Ok(self.media.get(id).map(|m| m.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> CreateUser {
        CreateUser {
            name: "Alice".into(),
            username: "alice".into(),
            email: "Alice@Example.com".into(),
            image_url: None,
        }
    }

    #[tokio::test]
    async fn session_lifecycle() {
        let backend = MemoryBackend::new();
        let user = backend.create_user(&alice()).await.unwrap();
        assert_eq!(user.email, "alice@example.com");

        assert!(backend.sign_in("nobody@example.com").await.unwrap().is_none());
        let session = backend.sign_in(" alice@example.com").await.unwrap().unwrap();
        assert_eq!(session.user_id, user.id);

        let current = backend.current_user(session.token).await.unwrap();
        assert_eq!(current, Some(user));

        backend.sign_out(session.token).await.unwrap();
        assert!(backend.current_user(session.token).await.unwrap().is_none());
        assert!(backend.sign_out(session.token).await.is_err());
    }

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let backend = MemoryBackend::new();
        backend.create_user(&alice()).await.unwrap();
        assert!(backend.create_user(&alice()).await.is_err());
    }

    #[tokio::test]
    async fn update_unknown_post_is_empty() {
        let backend = MemoryBackend::new();
        let update = PostUpdate {
            post_id: Uuid::now_v7(),
            caption: "nothing here".into(),
            media: None,
            replaced: None,
            location: None,
            tags: vec![],
        };
        assert!(backend.update_post(update).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn tag_filter() {
        let backend = MemoryBackend::new();
        let creator_id = Uuid::now_v7();
        for tags in [vec!["rust"], vec!["go"], vec!["rust", "web"]] {
            backend
                .create_post(NewPost {
                    creator_id,
                    caption: "tagged post".into(),
                    media: None,
                    location: None,
                    tags: tags.into_iter().map(String::from).collect(),
                })
                .await
                .unwrap();
        }
        assert_eq!(backend.posts_with_tag("rust", 10).await.unwrap().len(), 2);
        assert_eq!(backend.posts_with_tag("rust", 1).await.unwrap().len(), 1);
        assert_eq!(backend.posts_by_creator(creator_id, 10).await.unwrap().len(), 3);
    }
}
