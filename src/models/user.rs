use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// the input to our `create_user` handler
#[derive(Deserialize, Validate, Debug, Clone)]
pub struct CreateUser {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 2, max = 50, message = "Username must be 2 to 50 characters"))]
    pub username: String,
    #[validate(email(message = "Not a valid email"))]
    pub email: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub image_url: Option<String>,
}

impl User {
    pub fn from_new(u: &CreateUser) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: u.name.trim().to_owned(),
            username: u.username.trim().to_owned(),
            email: u.email.trim().to_lowercase(),
            image_url: u.image_url.clone().filter(|url| !url.trim().is_empty()),
        }
    }

    pub fn profile_path(&self) -> String {
        format!("/profile/{}", self.id)
    }
}

/// An authenticated browser session.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Session {
    pub token: Uuid,
    pub user_id: Uuid,
}

impl Session {
    pub fn start(user_id: Uuid) -> Self {
        Self {
            token: Uuid::now_v7(),
            user_id,
        }
    }
}

/// What the UI knows about the signed-in user. Passed to components
/// explicitly; `is_loading` holds until the identity has been resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionContext {
    pub user: User,
    pub is_loading: bool,
}

impl SessionContext {
    pub fn loading() -> Self {
        Self {
            user: User::default(),
            is_loading: true,
        }
    }

    pub fn resolved(user: User) -> Self {
        Self {
            user,
            is_loading: false,
        }
    }

    /// Identity is usable once the email is known.
    pub fn is_ready(&self) -> bool {
        !self.is_loading && !self.user.email.is_empty()
    }
}
