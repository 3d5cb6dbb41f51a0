pub mod media;
pub mod posts;
pub mod session;
pub mod users;

use std::path::Path;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::header;
use axum::response::Html;
use axum::Router;
use maud::Markup;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::background::submissions::SubmissionTracker;
use crate::components::{layout, sidebar};
use crate::config::templates::Templates;
use crate::error::AppError;
use crate::middleware::logging::HttpLoggingExt;
use crate::models::nav::SIDEBAR_LINKS;
use crate::models::user::SessionContext;
use crate::services::media::MediaStore;
use crate::services::memory::MemoryBackend;
use crate::services::posts::PostService;
use crate::services::sessions::SessionService;
use crate::services::users::UserService;

/// Collaborators every handler can reach. Cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<dyn PostService>,
    pub users: Arc<dyn UserService>,
    pub sessions: Arc<dyn SessionService>,
    pub media: Arc<dyn MediaStore>,
    pub templates: Templates,
    pub submissions: Arc<SubmissionTracker>,
    pub feed_limit: i64,
}

impl AppState {
    pub fn in_memory(backend: Arc<MemoryBackend>, templates: Templates, feed_limit: i64) -> Self {
        Self {
            posts: backend.clone(),
            users: backend.clone(),
            sessions: backend.clone(),
            media: backend,
            templates,
            submissions: Arc::new(SubmissionTracker::new()),
            feed_limit,
        }
    }
}

/// Full page with the sidebar, `current_path` picks the active link.
pub async fn page(
    state: &AppState,
    current_path: &str,
    title: &str,
    session: &SessionContext,
    content: Markup,
) -> Result<Html<String>, AppError> {
    let nav = sidebar::render(current_path, SIDEBAR_LINKS, session);
    layout::page(&state.templates, title, Some(nav), content).await
}

pub fn app(state: AppState, assets_dir: &Path, max_upload_bytes: usize) -> Router {
    Router::new()
        .nest_service(
            "/assets",
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::CACHE_CONTROL,
                    header::HeaderValue::from_static("max-age=13420"),
                ))
                .layer(CompressionLayer::new())
                .service(ServeDir::new(assets_dir)),
        )
        .merge(posts::router())
        .merge(session::router())
        .merge(users::router())
        .merge(media::router())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
        .with_http_logging()
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, Response};
    use tower::ServiceExt;

    use super::*;
    use crate::config::templates;
    use crate::models::user::{CreateUser, User};

    pub const BOUNDARY: &str = "hivelinkboundary";

    pub struct TestApp {
        pub app: Router,
        pub backend: Arc<MemoryBackend>,
        pub state: AppState,
    }

    impl TestApp {
        pub fn new() -> Self {
            let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src/templates");
            let templates = templates::load(&dir).unwrap();
            let backend = Arc::new(MemoryBackend::new());
            let state = AppState::in_memory(backend.clone(), templates, 50);
            let assets = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("dist/assets");
            Self {
                app: app(state.clone(), &assets, 1024 * 1024),
                backend,
                state,
            }
        }

        pub async fn send(&self, req: Request<Body>) -> Response<Body> {
            self.app.clone().oneshot(req).await.unwrap()
        }

        /// Creates a user and returns it with a `Cookie` header value for its session.
        pub async fn signed_in(&self, username: &str) -> (User, String) {
            let user = self
                .backend
                .create_user(&CreateUser {
                    name: username.to_uppercase(),
                    username: username.to_owned(),
                    email: format!("{username}@example.com"),
                    image_url: None,
                })
                .await
                .unwrap();
            let session = self
                .backend
                .sign_in(&user.email)
                .await
                .unwrap()
                .unwrap();
            (user, format!("session={}", session.token))
        }
    }

    pub async fn body_string(res: Response<Body>) -> String {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    pub fn htmx_get(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut req = Request::builder().uri(uri).header("hx-request", "true");
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        req.body(Body::empty()).unwrap()
    }

    pub fn page_get(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut req = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        req.body(Body::empty()).unwrap()
    }

    pub fn form_post(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
        let mut req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("hx-request", "true")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        req.body(Body::from(body.to_owned())).unwrap()
    }

    pub struct FilePart<'a> {
        pub name: &'a str,
        pub content_type: &'a str,
        pub bytes: &'a [u8],
    }

    pub fn multipart_post(
        uri: &str,
        cookie: &str,
        fields: &[(&str, &str)],
        file: Option<FilePart>,
    ) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some(file) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    file.name, file.content_type
                )
                .as_bytes(),
            );
            body.extend_from_slice(file.bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header("hx-request", "true")
            .header(header::COOKIE, cookie)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }
}
