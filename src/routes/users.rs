use axum::extract::{Path, State};
use axum::response::{self, Html};
use axum::routing::get;
use axum::{Form, Router};
use maud::{html, Markup};
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

use crate::components::{post_card, user::avatar_url, user_list_component};
use crate::error::AppError;
use crate::models::user::{CreateUser, SessionContext};
use crate::models::FieldErrors;

use super::session::Authenticated;
use super::{page, AppState};

const USER_LIST_LIMIT: i64 = 200;

async fn get_users(State(state): State<AppState>) -> response::Result<Markup> {
    let users = state.users.get_users(USER_LIST_LIMIT).await.map_err(|e| {
        warn!(%e, "could not list users");
        html! { p { "No users" } }
    })?;

    Ok(user_list_component::render(&users))
}

async fn create_user(
    State(state): State<AppState>,
    Form(payload): Form<CreateUser>,
) -> response::Result<Markup> {
    if let Err(errors) = payload.validate() {
        let errors = FieldErrors::from(errors);
        return Err(html! {
            @for field in errors.fields() {
                @for message in errors.get(field) {
                    p.shad-form_message { (message) }
                }
            }
        }
        .into());
    }

    let user = state.users.create_user(&payload).await.map_err(|e| {
        warn!(%e, "could not create user");
        html! { p.shad-form_message { "That username or email is already taken" } }
    })?;

    Ok(html! {
        div hidden hx-get="/users"
            hx-trigger="load"
            hx-target="#user-list-component"
            hx-swap="outerHTML" {}
        p { "User " (user.username) " has been created, you can sign in with " (user.email) }
    })
}

async fn all_users(
    State(state): State<AppState>,
    _: Authenticated,
) -> Result<Html<String>, AppError> {
    let users = state.users.get_users(USER_LIST_LIMIT).await?;
    let content = html! {
        h2.h3-bold { "All Users" }
        (user_list_component::render(&users))
    };
    page(&state, "/all-users", "People", &SessionContext::loading(), content).await
}

async fn profile(
    State(state): State<AppState>,
    _: Authenticated,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, AppError> {
    let user = state
        .users
        .get_user(id)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;
    let posts = state.posts.posts_by_creator(user.id, state.feed_limit).await?;
    let content = html! {
        .profile-header {
            img.rounded-full src=(avatar_url(&user)) alt="profile" width="112" height="112";
            h2.h3-bold { (user.name) }
            p.small-regular.text-muted { "@" (user.username) }
            p { (posts.len()) " posts" }
        }
        (post_card::feed(&posts, None))
    };
    page(&state, &user.profile_path(), &user.name, &SessionContext::loading(), content).await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(get_users).post(create_user))
        .route("/all-users", get(all_users))
        .route("/profile/:id", get(profile))
}
