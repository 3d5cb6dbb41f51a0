use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::post::{MediaRef, Post, PostAction, PostForm, SubmitRequest};
use crate::models::FieldErrors;
use crate::services::media::MediaStore;
use crate::services::posts::PostService;

use super::{Navigation, Navigator, Notifier, Toast};

pub const TRY_AGAIN: &str = "Please try again";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SubmissionState {
    #[default]
    Idle,
    Submitting,
    Done {
        post_id: Uuid,
    },
    Failed {
        reason: String,
    },
}

impl SubmissionState {
    pub fn is_busy(&self) -> bool {
        matches!(self, SubmissionState::Submitting)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Saved(Post),
    /// The backend answered without a document.
    Empty,
    /// The backend call returned an error.
    Rejected(String),
}

impl SubmitOutcome {
    fn state(&self) -> SubmissionState {
        match self {
            SubmitOutcome::Saved(p) => SubmissionState::Done { post_id: p.id },
            SubmitOutcome::Empty => SubmissionState::Failed {
                reason: "no document returned".to_owned(),
            },
            SubmitOutcome::Rejected(reason) => SubmissionState::Failed {
                reason: reason.clone(),
            },
        }
    }
}

/// Validate, upload, create-or-update, navigate.
///
/// State transitions are published on a watch channel so a view can follow
/// the submission without owning it. Navigation happens exactly once, after
/// the backend call settles, whatever it returned.
pub struct PostSubmission {
    posts: Arc<dyn PostService>,
    media: Arc<dyn MediaStore>,
    state: Arc<watch::Sender<SubmissionState>>,
}

impl PostSubmission {
    #[cfg(test)]
    pub fn new(posts: Arc<dyn PostService>, media: Arc<dyn MediaStore>) -> Self {
        let (state, _) = watch::channel(SubmissionState::Idle);
        Self::with_state(posts, media, Arc::new(state))
    }

    pub fn with_state(
        posts: Arc<dyn PostService>,
        media: Arc<dyn MediaStore>,
        state: Arc<watch::Sender<SubmissionState>>,
    ) -> Self {
        Self {
            posts,
            media,
            state,
        }
    }

    #[cfg(test)]
    pub fn subscribe(&self) -> watch::Receiver<SubmissionState> {
        self.state.subscribe()
    }

    #[cfg(test)]
    pub fn state(&self) -> SubmissionState {
        self.state.borrow().clone()
    }

    /// Invalid input returns the field errors and touches nothing else.
    #[tracing::instrument(skip_all, fields(action = action.label()))]
    pub async fn submit(
        &self,
        action: PostAction,
        form: PostForm,
        navigator: &dyn Navigator,
        notifier: &dyn Notifier,
    ) -> Result<SubmitOutcome, FieldErrors> {
        form.check()?;

        self.state.send_replace(SubmissionState::Submitting);
        let destination = action.destination();
        let outcome = self.dispatch(action, form).await;

        match &outcome {
            SubmitOutcome::Saved(post) => info!(post = %post.id, "post saved"),
            SubmitOutcome::Empty => warn!("backend returned no post"),
            SubmitOutcome::Rejected(reason) => error!(%reason, "post submission failed"),
        }
        if !matches!(outcome, SubmitOutcome::Saved(_)) {
            notifier.toast(Toast::new(TRY_AGAIN));
        }

        self.state.send_replace(outcome.state());
        navigator.navigate(Navigation::To(destination));
        Ok(outcome)
    }

    async fn dispatch(&self, action: PostAction, mut form: PostForm) -> SubmitOutcome {
        let uploaded = match std::mem::take(&mut form.file).into_iter().next() {
            Some(file) => match self.media.upload(file).await {
                Ok(media) => Some(media),
                Err(e) => return SubmitOutcome::Rejected(format!("upload failed: {e:#}")),
            },
            None => None,
        };

        match action.into_request(form, uploaded.clone()) {
            SubmitRequest::Create(new_post) => {
                let result = self.posts.create_post(new_post).await;
                self.settle(result, uploaded, None).await
            }
            SubmitRequest::Update(update) => {
                let replaced = update.replaced.clone();
                let result = self.posts.update_post(update).await;
                self.settle(result, uploaded, replaced).await
            }
        }
    }

    /// A failed save orphans the fresh upload; a successful replacement
    /// orphans the previous media.
    async fn settle(
        &self,
        result: anyhow::Result<Option<Post>>,
        uploaded: Option<MediaRef>,
        replaced: Option<MediaRef>,
    ) -> SubmitOutcome {
        let (outcome, orphan) = match result {
            Ok(Some(post)) => (SubmitOutcome::Saved(post), replaced),
            Ok(None) => (SubmitOutcome::Empty, uploaded),
            Err(e) => (SubmitOutcome::Rejected(format!("{e:#}")), uploaded),
        };
        if let Some(orphan) = orphan {
            if let Err(e) = self.media.delete(&orphan).await {
                warn!(media = %orphan.id, %e, "could not delete orphaned media");
            }
        }
        outcome
    }
}
