use axum::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::models::user::{Session, User};
use crate::schema;

use super::Pool;

/// Identity side of the backend: who is signed in, and signing out.
#[async_trait]
pub trait SessionService: Send + Sync {
    /// `None` when no account has this email.
    async fn sign_in(&self, email: &str) -> anyhow::Result<Option<Session>>;
    async fn current_user(&self, token: Uuid) -> anyhow::Result<Option<User>>;
    async fn sign_out(&self, token: Uuid) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct SessionServiceDb {
    db: Pool,
}

impl SessionServiceDb {
    pub fn new(db: Pool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionService for SessionServiceDb {
    async fn sign_in(&self, address: &str) -> anyhow::Result<Option<Session>> {
        use schema::users::dsl::*;

        let mut conn = self.db.get().await?;
        let user_id: Option<Uuid> = users
            .filter(email.eq(address.trim().to_lowercase()))
            .select(id)
            .first(&mut conn)
            .await
            .optional()?;
        let Some(user_id) = user_id else {
            return Ok(None);
        };

        let session = diesel::insert_into(schema::sessions::table)
            .values(Session::start(user_id))
            .returning(Session::as_returning())
            .get_result(&mut conn)
            .await?;
        Ok(Some(session))
    }

    async fn current_user(&self, session_token: Uuid) -> anyhow::Result<Option<User>> {
        use schema::sessions::dsl::*;

        let mut conn = self.db.get().await?;
        let user = sessions
            .inner_join(schema::users::table)
            .filter(token.eq(session_token))
            .select(User::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(user)
    }

    async fn sign_out(&self, session_token: Uuid) -> anyhow::Result<()> {
        use schema::sessions::dsl::*;

        let mut conn = self.db.get().await?;
        let deleted = diesel::delete(sessions.filter(token.eq(session_token)))
            .execute(&mut conn)
            .await?;
        anyhow::ensure!(deleted == 1, "no such session");
        Ok(())
    }
}
