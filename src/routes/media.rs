use axum::extract::{Path, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::error::AppError;
use crate::services::media::is_media_id;

use super::AppState;

/// Uploaded media never changes under the same id.
const IMMUTABLE: &str = "public, max-age=31536000, immutable";

async fn get_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    if !is_media_id(&id) {
        return Err(AppError::not_found("media"));
    }
    let file = state
        .media
        .fetch(&id)
        .await?
        .ok_or_else(|| AppError::not_found("media"))?;

    let content_type = HeaderValue::from_str(&file.content_type)
        .unwrap_or(HeaderValue::from_static("application/octet-stream"));
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, HeaderValue::from_static(IMMUTABLE)),
        ],
        file.bytes,
    )
        .into_response())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/media/:id", get(get_media))
}

#[cfg(test)]
mod tests {
    use axum::body::Bytes;
    use axum::http::StatusCode;

    use super::*;
    use crate::models::post::MediaFile;
    use crate::routes::test_support::*;
    use crate::services::media::MediaStore;

    #[tokio::test]
    async fn serves_uploaded_media() {
        let t = TestApp::new();
        let media = t
            .backend
            .upload(MediaFile::new(
                "cat.svg".into(),
                None,
                Bytes::from_static(b"<svg/>"),
            ))
            .await
            .unwrap();

        let res = t.send(page_get(&media.url, None)).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "image/svg+xml");
        assert_eq!(res.headers()[header::CACHE_CONTROL], IMMUTABLE);
        assert_eq!(body_string(res).await, "<svg/>");

        let res = t.send(page_get("/media/missing.png", None)).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let res = t.send(page_get("/media/..%2Fsecret", None)).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
