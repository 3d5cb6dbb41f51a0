use std::convert::Infallible;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use axum_macros::debug_handler;
use futures_util::StreamExt;
use maud::{html, Markup};
use serde::Deserialize;
use tokio_stream::wrappers::WatchStream;
use tracing::debug;
use uuid::Uuid;

use crate::components::post_form::{self, submit_button, PostFormView};
use crate::components::post_card;
use crate::error::AppError;
use crate::models::post::{MediaFile, Post, PostAction, PostForm};
use crate::models::user::SessionContext;
use crate::models::FieldErrors;
use crate::workflow::submission::PostSubmission;
use crate::workflow::ClientEffects;

use super::session::{Authenticated, CurrentUser};
use super::{page, AppState};

async fn home(
    State(state): State<AppState>,
    _: Authenticated,
) -> Result<Html<String>, AppError> {
    let posts = state.posts.recent_posts(state.feed_limit).await?;
    let content = html! {
        h2.h3-bold { "Home Feed" }
        (post_card::feed(&posts, None))
    };
    page(&state, "/", "Home", &SessionContext::loading(), content).await
}

#[derive(Deserialize)]
struct ExploreQuery {
    tag: Option<String>,
}

async fn explore(
    State(state): State<AppState>,
    _: Authenticated,
    Query(q): Query<ExploreQuery>,
) -> Result<Html<String>, AppError> {
    let tag = q.tag.as_deref().map(str::trim).filter(|t| !t.is_empty());
    let posts = match tag {
        Some(tag) => state.posts.posts_with_tag(tag, state.feed_limit).await?,
        None => state.posts.recent_posts(state.feed_limit).await?,
    };
    let content = html! {
        h2.h3-bold { "Search Posts" }
        form.explore-search action="/explore" method="get" {
            input.shad-input type="text" name="tag" placeholder="Search by tag" value=(tag.unwrap_or_default());
        }
        @if let Some(tag) = tag {
            h3 { "Posts tagged #" (tag) }
        }
        (post_card::feed(&posts, None))
    };
    page(&state, "/explore", "Explore", &SessionContext::loading(), content).await
}

async fn post_detail(
    State(state): State<AppState>,
    CurrentUser { user }: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, AppError> {
    let post = state
        .posts
        .get_post(id)
        .await?
        .ok_or_else(|| AppError::not_found("post"))?;
    let creator = state.users.get_user(post.creator_id).await?;
    let content = post_card::detail(&post, creator.as_ref(), Some(user.id));
    let path = post.detail_path();
    page(&state, &path, "Post", &SessionContext::resolved(user), content).await
}

/// Renders the form bound to `submission_id` and opens its channel.
/// Abandoned submissions are dropped from the tracker on the way.
fn form_markup(
    state: &AppState,
    action: &PostAction,
    form: &PostForm,
    errors: &FieldErrors,
    submission_id: Uuid,
) -> Markup {
    state.submissions.prune();
    state.submissions.open(submission_id);
    let media_url = match action {
        PostAction::Update { media, .. } => media.as_ref().map(|m| m.url.as_str()),
        PostAction::Create { .. } => None,
    };
    post_form::render(&PostFormView {
        action,
        form,
        errors,
        media_url,
        submission_id,
    })
}

async fn create_post_page(
    State(state): State<AppState>,
    CurrentUser { user }: CurrentUser,
) -> Result<Html<String>, AppError> {
    let action = PostAction::Create { author: user.id };
    let content = html! {
        h2.h3-bold { "Create Post" }
        (form_markup(&state, &action, &PostForm::default(), &FieldErrors::default(), Uuid::now_v7()))
    };
    page(&state, "/create-post", "Create Post", &SessionContext::resolved(user), content).await
}

/// Only the creator may edit a post.
async fn owned_post(state: &AppState, id: Uuid, user_id: Uuid) -> Result<Post, AppError> {
    let post = state
        .posts
        .get_post(id)
        .await?
        .ok_or_else(|| AppError::not_found("post"))?;
    if post.creator_id != user_id {
        return Err(AppError::forbidden("only the creator can edit this post"));
    }
    Ok(post)
}

async fn update_post_page(
    State(state): State<AppState>,
    CurrentUser { user }: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, AppError> {
    let post = owned_post(&state, id, user.id).await?;
    let action = PostAction::update_for(&post);
    let form = PostForm::from_post(&post);
    let content = html! {
        h2.h3-bold { "Edit Post" }
        (form_markup(&state, &action, &form, &FieldErrors::default(), Uuid::now_v7()))
    };
    page(&state, "/update-post", "Edit Post", &SessionContext::resolved(user), content).await
}

async fn read_form(mut multipart: Multipart) -> Result<(PostForm, Option<Uuid>), AppError> {
    let mut form = PostForm::default();
    let mut submission_id = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(AppError::bad_request)?
    {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "caption" => form.caption = field.text().await.map_err(AppError::bad_request)?,
            "location" => {
                let raw = field.text().await.map_err(AppError::bad_request)?;
                form.set_location(&raw);
            }
            "tags" => form.tags = field.text().await.map_err(AppError::bad_request)?,
            "submission_id" => {
                let raw = field.text().await.map_err(AppError::bad_request)?;
                submission_id = Uuid::parse_str(raw.trim()).ok();
            }
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let content_type = field.content_type().map(str::to_owned);
                let bytes = field.bytes().await.map_err(AppError::bad_request)?;
                // an untouched file input still sends an empty part
                if !(file_name.is_empty() && bytes.is_empty()) {
                    form.file.push(MediaFile::new(file_name, content_type, bytes));
                }
            }
            other => debug!(field = other, "ignoring form field"),
        }
    }
    Ok((form, submission_id))
}

/// Runs the submission; on invalid input the form comes back with its errors.
async fn submit(
    state: &AppState,
    action: PostAction,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let (mut form, submission_id) = read_form(multipart).await?;
    let submission_id = submission_id.unwrap_or_else(Uuid::now_v7);

    let submission = PostSubmission::with_state(
        state.posts.clone(),
        state.media.clone(),
        state.submissions.channel(submission_id),
    );
    let effects = ClientEffects::new();
    let result = submission
        .submit(action.clone(), form.clone(), &effects, &effects)
        .await;

    match result {
        Ok(_) => {
            state.submissions.finish(submission_id);
            Ok((effects, "").into_response())
        }
        Err(errors) => {
            form.file.clear();
            Ok(form_markup(state, &action, &form, &errors, submission_id).into_response())
        }
    }
}

#[debug_handler(state = AppState)]
async fn create_post(
    State(state): State<AppState>,
    CurrentUser { user }: CurrentUser,
    multipart: Multipart,
) -> Result<Response, AppError> {
    submit(&state, PostAction::Create { author: user.id }, multipart).await
}

#[debug_handler(state = AppState)]
async fn update_post(
    State(state): State<AppState>,
    CurrentUser { user }: CurrentUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let post = owned_post(&state, id, user.id).await?;
    submit(&state, PostAction::update_for(&post), multipart).await
}

#[derive(Deserialize)]
struct EventsQuery {
    label: Option<String>,
}

/// Streams the submit button as the submission moves through its states.
/// Finished or unknown submissions answer 204, which stops the client from
/// reconnecting.
async fn submission_events(
    State(state): State<AppState>,
    _: Authenticated,
    Path(id): Path<Uuid>,
    Query(q): Query<EventsQuery>,
) -> Response {
    let Some(rx) = state.submissions.subscribe(id) else {
        return StatusCode::NO_CONTENT.into_response();
    };
    let label = match q.label.as_deref() {
        Some("Update") => "Update",
        _ => "Create",
    };
    let stream = WatchStream::new(rx).map(move |s| {
        Ok::<_, Infallible>(
            Event::default()
                .event("state")
                .data(submit_button(label, &s).into_string()),
        )
    });
    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/explore", get(explore))
        .route("/create-post", get(create_post_page))
        .route("/update-post/:id", get(update_post_page))
        .route("/posts", post(create_post))
        .route("/posts/:id", get(post_detail).post(update_post))
        .route("/posts/submissions/:id", get(submission_events))
}

#[cfg(test)]
mod tests {
    use axum::http::header;

    use super::*;
    use crate::models::post::NewPost;
    use crate::routes::test_support::*;
    use crate::services::media::MediaStore;
    use crate::services::posts::PostService;
    use crate::workflow::{HX_REDIRECT, HX_TRIGGER};

    async fn seed_post(t: &TestApp, creator_id: Uuid, tags: &[&str]) -> Post {
        t.backend
            .create_post(NewPost {
                creator_id,
                caption: "morning coffee".into(),
                media: None,
                location: Some("Lisbon".into()),
                tags: tags.iter().map(|t| t.to_string()).collect(),
            })
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn home_renders_feed_with_lazy_profile() {
        let t = TestApp::new();
        let (user, cookie) = t.signed_in("alice").await;
        seed_post(&t, user.id, &["coffee"]).await;

        let res = t.send(page_get("/", Some(&cookie))).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_string(res).await;
        assert!(body.contains("morning coffee"));
        assert!(body.contains(r#"hx-get="/sidebar/profile""#));
        assert!(body.contains(r#"<a href="/" aria-current="page">"#));
        assert_eq!(body.matches(r#"aria-current="page""#).count(), 1);
    }

    #[tokio::test]
    async fn create_then_go_home() {
        let t = TestApp::new();
        let (user, cookie) = t.signed_in("alice").await;

        let res = t
            .send(multipart_post(
                "/posts",
                &cookie,
                &[
                    ("caption", "first post on the hive"),
                    ("location", " Tokyo "),
                    ("tags", "a, b"),
                ],
                Some(FilePart {
                    name: "shot.png",
                    content_type: "image/png",
                    bytes: b"\x89PNG\r\n",
                }),
            ))
            .await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[HX_REDIRECT], "/");
        assert!(res.headers().get(HX_TRIGGER).is_none());

        let posts = t.backend.posts_by_creator(user.id, 10).await.unwrap();
        assert_eq!(posts.len(), 1);
        let post = &posts[0];
        assert_eq!(post.tags, vec!["a", "b"]);
        assert_eq!(post.location.as_deref(), Some("Tokyo"));
        let media = post.media().unwrap();
        assert!(t.backend.fetch(&media.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn submission_stream_ends_with_the_submission() {
        let t = TestApp::new();
        let (_, cookie) = t.signed_in("alice").await;
        let id = Uuid::now_v7();
        let events = format!("/posts/submissions/{id}?label=Create");

        let res = t.send(page_get(&events, Some(&cookie))).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        t.state.submissions.open(id);
        let res = t.send(page_get(&events, Some(&cookie))).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "text/event-stream");
        drop(res);

        let sid = id.to_string();
        let res = t
            .send(multipart_post(
                "/posts",
                &cookie,
                &[("caption", "streamed and done"), ("submission_id", sid.as_str())],
                None,
            ))
            .await;
        assert_eq!(res.headers()[HX_REDIRECT], "/");

        // a reconnect after the redirect must not bring the channel back
        let res = t.send(page_get(&events, Some(&cookie))).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert!(t.state.submissions.subscribe(id).is_none());
    }

    #[tokio::test]
    async fn invalid_submission_returns_form_with_errors() {
        let t = TestApp::new();
        let (user, cookie) = t.signed_in("alice").await;

        let res = t
            .send(multipart_post(
                "/posts",
                &cookie,
                &[("caption", "hey"), ("tags", "")],
                None,
            ))
            .await;

        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().get(HX_REDIRECT).is_none());
        let body = body_string(res).await;
        assert!(body.contains("Caption must be between 5 and 2200 characters"));
        assert!(t.backend.posts_by_creator(user.id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_goes_to_detail() {
        let t = TestApp::new();
        let (user, cookie) = t.signed_in("alice").await;
        let post = seed_post(&t, user.id, &["a", "b"]).await;

        let res = t
            .send(page_get(&format!("/update-post/{}", post.id), Some(&cookie)))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(body_string(res).await.contains(r#"value="a,b""#));

        let res = t
            .send(multipart_post(
                &format!("/posts/{}", post.id),
                &cookie,
                &[("caption", "evening coffee instead"), ("tags", "a,b")],
                None,
            ))
            .await;
        assert_eq!(res.headers()[HX_REDIRECT], format!("/posts/{}", post.id).as_str());

        let saved = t.backend.get_post(post.id).await.unwrap().unwrap();
        assert_eq!(saved.caption, "evening coffee instead");
        assert_eq!(saved.tags, vec!["a", "b"]);
        assert_eq!(saved.location, None);
    }

    #[tokio::test]
    async fn only_creator_can_update() {
        let t = TestApp::new();
        let (alice, _) = t.signed_in("alice").await;
        let (_, bob_cookie) = t.signed_in("bob").await;
        let post = seed_post(&t, alice.id, &[]).await;

        let res = t
            .send(multipart_post(
                &format!("/posts/{}", post.id),
                &bob_cookie,
                &[("caption", "bob was here, sorry")],
                None,
            ))
            .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        let unchanged = t.backend.get_post(post.id).await.unwrap().unwrap();
        assert_eq!(unchanged.caption, "morning coffee");
    }

    #[tokio::test]
    async fn explore_filters_by_tag() {
        let t = TestApp::new();
        let (user, cookie) = t.signed_in("alice").await;
        seed_post(&t, user.id, &["rust"]).await;
        seed_post(&t, user.id, &["go"]).await;

        let res = t.send(page_get("/explore?tag=rust", Some(&cookie))).await;
        let body = body_string(res).await;
        assert!(body.contains("Posts tagged #rust"));
        assert_eq!(body.matches("post-card\"").count(), 1);
    }

    #[tokio::test]
    async fn detail_shows_edit_link_to_creator() {
        let t = TestApp::new();
        let (user, cookie) = t.signed_in("alice").await;
        let post = seed_post(&t, user.id, &[]).await;

        let res = t
            .send(page_get(&format!("/posts/{}", post.id), Some(&cookie)))
            .await;
        let body = body_string(res).await;
        assert!(body.contains(&format!("/update-post/{}", post.id)));
        // the resolved user is shown right away
        assert!(body.contains("@alice"));

        let res = t
            .send(page_get(&format!("/posts/{}", Uuid::now_v7()), Some(&cookie)))
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
