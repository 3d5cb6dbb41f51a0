use std::fmt::Debug;
use std::fmt::Display;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use maud::html;
use tracing::error;

pub struct AppError {
    pub status: StatusCode,
    pub inner: anyhow::Error,
}

impl AppError {
    pub fn not_found(what: impl Display) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            inner: anyhow::anyhow!("{what} not found"),
        }
    }

    pub fn bad_request(err: impl Into<anyhow::Error>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            inner: err.into(),
        }
    }

    pub fn forbidden(why: impl Display) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            inner: anyhow::anyhow!("{why}"),
        }
    }
}

// Tell axum how to convert `AppError` into a response.
impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        if self.status.is_server_error() {
            error!(error = ?self.inner, "request failed");
        }
        (
            self.status,
            html! {
                p.error { "Something went wrong: " (self.inner) }
            },
        )
            .into_response()
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.inner, f)
    }
}

impl Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.inner, f)
    }
}

// This enables using `?` on functions that return `Result<_, anyhow::Error>` to turn them into
// `Result<_, AppError>`. That way you don't need to do that manually.
impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            inner: err.into(),
        }
    }
}
