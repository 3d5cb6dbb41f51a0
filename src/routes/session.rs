use std::sync::Arc;

use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{async_trait, Form, Router};
use axum_extra::headers::Cookie;
use axum_extra::TypedHeader;
use maud::{html, Markup};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::components::{layout, sidebar};
use crate::error::AppError;
use crate::models::user::{SessionContext, User};
use crate::workflow::sign_out::{SignOut, SignOutState};
use crate::workflow::{ClientEffects, HX_REDIRECT};

use super::AppState;

pub const SESSION_COOKIE: &str = "session";
pub const SIGN_IN: &str = "/sign-in";

/// htmx follows plain redirects inside the swap target, so it gets a header instead.
pub fn to_sign_in(headers: &HeaderMap) -> Response {
    if headers.contains_key("hx-request") {
        (
            [(HX_REDIRECT, HeaderValue::from_static(SIGN_IN))],
            StatusCode::UNAUTHORIZED,
        )
            .into_response()
    } else {
        Redirect::to(SIGN_IN).into_response()
    }
}

/// The session cookie, not yet checked against the backend.
pub struct SessionToken(pub Uuid);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for SessionToken {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let cookies = TypedHeader::<Cookie>::from_request_parts(parts, state)
            .await
            .map_err(|_| to_sign_in(&parts.headers))?;
        cookies
            .get(SESSION_COOKIE)
            .and_then(|t| Uuid::parse_str(t).ok())
            .map(SessionToken)
            .ok_or_else(|| to_sign_in(&parts.headers))
    }
}

/// A session the backend knows about. Who it belongs to is left for the
/// sidebar to resolve lazily.
pub struct Authenticated;

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        CurrentUser::from_request_parts(parts, state).await?;
        Ok(Authenticated)
    }
}

/// The signed-in user, resolved through the session service.
pub struct CurrentUser {
    pub user: User,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let SessionToken(token) = SessionToken::from_request_parts(parts, state).await?;
        match state.sessions.current_user(token).await {
            Ok(Some(user)) => Ok(CurrentUser { user }),
            Ok(None) => Err(to_sign_in(&parts.headers)),
            Err(e) => Err(AppError::from(e).into_response()),
        }
    }
}

fn session_cookie(token: Uuid) -> HeaderValue {
    // uuid text is always a valid header value
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax"
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("session=; Path=/"))
}

fn expired_cookie() -> HeaderValue {
    HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

#[derive(Deserialize)]
pub struct SignInForm {
    pub email: String,
}

fn sign_in_form(error: Option<&str>) -> Markup {
    html! {
        form.auth-form #sign-in hx-post=(SIGN_IN) hx-swap="outerHTML" {
            h2 { "Log in to your account" }
            label.shad-form_label for="email" { "Email" }
            input.shad-input #email type="email" name="email" required;
            @if let Some(error) = error {
                p.shad-form_message { (error) }
            }
            button.shad-button_primary type="submit" { "Sign in" }
        }
    }
}

fn sign_up_form() -> Markup {
    html! {
        form.auth-form hx-post="/users" hx-target="#sign-up-result" {
            h2 { "Create a new account" }
            input.shad-input type="text" name="name" placeholder="Name" required;
            input.shad-input type="text" name="username" placeholder="Username" required;
            input.shad-input type="email" name="email" placeholder="Email" required;
            button.shad-button_dark_4 type="submit" { "Sign up" }
            div #sign-up-result {}
        }
    }
}

async fn sign_in_page(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let content = html! {
        .auth {
            (sign_in_form(None))
            (sign_up_form())
        }
    };
    layout::page(&state.templates, "Sign in", None, content).await
}

#[tracing::instrument(skip_all)]
async fn sign_in(
    State(state): State<AppState>,
    Form(f): Form<SignInForm>,
) -> Result<Response, AppError> {
    match state.sessions.sign_in(&f.email).await? {
        Some(session) => {
            info!(user = %session.user_id, "signed in");
            Ok((
                [
                    (header::SET_COOKIE, session_cookie(session.token)),
                    (HX_REDIRECT, HeaderValue::from_static("/")),
                ],
                "",
            )
                .into_response())
        }
        None => Ok(sign_in_form(Some("No account with that email")).into_response()),
    }
}

async fn sign_out(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> Response {
    let effects = ClientEffects::new();
    let mut flow = SignOut::new(Arc::clone(&state.sessions));
    match flow.run(token, &effects).await {
        SignOutState::Succeeded => {
            ([(header::SET_COOKIE, expired_cookie())], effects, "").into_response()
        }
        _ => (effects, "").into_response(),
    }
}

async fn sidebar_profile(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    match state.sessions.current_user(token).await? {
        Some(user) => Ok(sidebar::profile(&SessionContext::resolved(user)).into_response()),
        None => Ok(to_sign_in(&headers)),
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(SIGN_IN, get(sign_in_page).post(sign_in))
        .route("/sign-out", post(sign_out))
        .route("/sidebar/profile", get(sidebar_profile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::*;
    use crate::workflow::HX_REFRESH;

    #[tokio::test]
    async fn sign_in_sets_cookie() {
        let t = TestApp::new();
        let (user, _) = t.signed_in("alice").await;

        let res = t
            .send(form_post(SIGN_IN, None, "email=alice%40example.com"))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[HX_REDIRECT], "/");
        let cookie = res.headers()[header::SET_COOKIE].to_str().unwrap().to_owned();
        assert!(cookie.starts_with("session="));

        let token = cookie.split(';').next().unwrap().to_owned();
        let res = t.send(htmx_get("/sidebar/profile", Some(&token))).await;
        let body = body_string(res).await;
        assert!(body.contains("@alice"));
        assert!(body.contains(&user.profile_path()));
        assert!(!body.contains("loader"));
    }

    #[tokio::test]
    async fn unknown_email_stays_on_form() {
        let t = TestApp::new();
        let res = t
            .send(form_post(SIGN_IN, None, "email=ghost%40example.com"))
            .await;
        assert!(res.headers().get(header::SET_COOKIE).is_none());
        assert!(body_string(res).await.contains("No account with that email"));
    }

    #[tokio::test]
    async fn sign_out_reloads_once() {
        let t = TestApp::new();
        let (_, cookie) = t.signed_in("alice").await;

        let res = t.send(form_post("/sign-out", Some(&cookie), "")).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[HX_REFRESH], "true");
        assert!(res.headers()[header::SET_COOKIE]
            .to_str()
            .unwrap()
            .contains("Max-Age=0"));

        // the session is gone, so nothing happens the second time
        let res = t.send(form_post("/sign-out", Some(&cookie), "")).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().get(HX_REFRESH).is_none());
        assert!(res.headers().get(header::SET_COOKIE).is_none());

        let res = t.send(htmx_get("/sidebar/profile", Some(&cookie))).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
