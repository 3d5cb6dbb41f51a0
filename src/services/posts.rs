use axum::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::models::post::{NewPost, Post, PostUpdate};
use crate::schema;

use super::Pool;

/// Document side of the backend. `Ok(None)` is the "nothing came back" answer
/// the submission workflow treats as a soft failure.
#[async_trait]
pub trait PostService: Send + Sync {
    async fn create_post(&self, post: NewPost) -> anyhow::Result<Option<Post>>;
    async fn update_post(&self, update: PostUpdate) -> anyhow::Result<Option<Post>>;
    async fn get_post(&self, id: Uuid) -> anyhow::Result<Option<Post>>;
    async fn recent_posts(&self, limit: i64) -> anyhow::Result<Vec<Post>>;
    async fn posts_with_tag(&self, tag: &str, limit: i64) -> anyhow::Result<Vec<Post>>;
    async fn posts_by_creator(&self, user_id: Uuid, limit: i64) -> anyhow::Result<Vec<Post>>;
}

#[derive(Clone)]
pub struct PostServiceDb {
    db: Pool,
}

impl PostServiceDb {
    pub fn new(db: Pool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PostService for PostServiceDb {
    #[tracing::instrument(skip_all, fields(creator = %p.creator_id))]
    async fn create_post(&self, p: NewPost) -> anyhow::Result<Option<Post>> {
        use schema::posts::dsl::*;

        let mut conn = self.db.get().await?;
        let post = diesel::insert_into(posts)
            .values(Post::from_new(p))
            .returning(Post::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?;
        Ok(post)
    }

    #[tracing::instrument(skip_all, fields(post = %update.post_id))]
    async fn update_post(&self, update: PostUpdate) -> anyhow::Result<Option<Post>> {
        use schema::posts::dsl::*;

        let mut conn = self.db.get().await?;
        let post = diesel::update(posts.find(update.post_id))
            .set(update.changes())
            .returning(Post::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?;
        Ok(post)
    }

    async fn get_post(&self, post_id: Uuid) -> anyhow::Result<Option<Post>> {
        use schema::posts::dsl::*;

        let mut conn = self.db.get().await?;
        let post = posts
            .find(post_id)
            .select(Post::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(post)
    }

    async fn recent_posts(&self, limit: i64) -> anyhow::Result<Vec<Post>> {
        use schema::posts::dsl::*;

        let mut conn = self.db.get().await?;
        // v7 ids sort by creation time
        let ps = posts
            .order(id.desc())
            .limit(limit)
            .select(Post::as_select())
            .load(&mut conn)
            .await?;
        Ok(ps)
    }

    async fn posts_with_tag(&self, tag: &str, limit: i64) -> anyhow::Result<Vec<Post>> {
        use schema::posts::dsl::*;

        let mut conn = self.db.get().await?;
        let ps = posts
            .filter(tags.contains(vec![tag.to_owned()]))
            .order(id.desc())
            .limit(limit)
            .select(Post::as_select())
            .load(&mut conn)
            .await?;
        Ok(ps)
    }

    async fn posts_by_creator(&self, user_id: Uuid, limit: i64) -> anyhow::Result<Vec<Post>> {
        use schema::posts::dsl::*;

        let mut conn = self.db.get().await?;
        let ps = posts
            .filter(creator_id.eq(user_id))
            .order(id.desc())
            .limit(limit)
            .select(Post::as_select())
            .load(&mut conn)
            .await?;
        Ok(ps)
    }
}
