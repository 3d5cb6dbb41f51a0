use axum::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::models::user::*;
use crate::schema;

use super::Pool;

#[async_trait]
pub trait UserService: Send + Sync {
    async fn get_users(&self, limit: i64) -> anyhow::Result<Vec<User>>;
    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn create_user(&self, user: &CreateUser) -> anyhow::Result<User>;
}

#[derive(Clone)]
pub struct UserServiceDb {
    db: Pool,
}

#[async_trait]
impl UserService for UserServiceDb {
    async fn get_users(&self, limit: i64) -> anyhow::Result<Vec<User>> {
        use schema::users::dsl::*;

        let mut conn = self.db.get().await?;
        let us: Vec<User> = users
            .order(id.desc())
            .limit(limit)
            .select(User::as_select())
            .load(&mut conn)
            .await?;
        Ok(us)
    }

    async fn get_user(&self, user_id: Uuid) -> anyhow::Result<Option<User>> {
        use schema::users::dsl::*;

        let mut conn = self.db.get().await?;
        let user = users
            .find(user_id)
            .select(User::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(user)
    }

    async fn create_user(&self, u: &CreateUser) -> anyhow::Result<User> {
        use schema::users::dsl::*;

        let mut conn = self.db.get().await?;

        let user = diesel::insert_into(users)
            .values(User::from_new(u))
            .returning(User::as_returning())
            .get_result(&mut conn)
            .await?;

        Ok(user)
    }
}

impl UserServiceDb {
    pub fn new(db: Pool) -> Self {
        Self { db }
    }
}
