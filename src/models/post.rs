use std::fmt;

use axum::body::Bytes;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::FieldErrors;

pub const ACCEPTED_MEDIA_TYPES: &[&str] = &["image/png", "image/jpeg", "image/svg+xml"];
const MAX_TAGS: usize = 30;
const MAX_TAG_LEN: usize = 40;
const MAX_TAGS_CHARS: usize = 500;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Post {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub caption: String,
    pub image_id: Option<String>,
    pub image_url: Option<String>,
    pub location: Option<String>,
    pub tags: Vec<String>,
}

impl Post {
    pub fn from_new(p: NewPost) -> Self {
        let (image_id, image_url) = split_media(p.media);
        Self {
            id: Uuid::now_v7(),
            creator_id: p.creator_id,
            caption: p.caption,
            image_id,
            image_url,
            location: p.location,
            tags: p.tags,
        }
    }

    pub fn media(&self) -> Option<MediaRef> {
        match (&self.image_id, &self.image_url) {
            (Some(id), Some(url)) => Some(MediaRef {
                id: id.clone(),
                url: url.clone(),
            }),
            _ => None,
        }
    }

    pub fn detail_path(&self) -> String {
        detail_path(self.id)
    }

    pub fn apply(&mut self, changes: PostChanges) {
        self.caption = changes.caption;
        self.image_id = changes.image_id;
        self.image_url = changes.image_url;
        self.location = changes.location;
        self.tags = changes.tags;
    }
}

pub fn detail_path(id: Uuid) -> String {
    format!("/posts/{id}")
}

/// An uploaded file as known to the media store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub id: String,
    pub url: String,
}

fn split_media(media: Option<MediaRef>) -> (Option<String>, Option<String>) {
    match media {
        Some(m) => (Some(m.id), Some(m.url)),
        None => (None, None),
    }
}

/// One file part of a multipart form.
#[derive(Clone, PartialEq, Serialize)]
pub struct MediaFile {
    pub file_name: String,
    pub content_type: String,
    #[serde(skip)]
    pub bytes: Bytes,
}

impl MediaFile {
    /// Falls back to guessing from the file name when the browser sent no usable type.
    pub fn new(file_name: String, content_type: Option<String>, bytes: Bytes) -> Self {
        let content_type = content_type
            .filter(|ct| !ct.is_empty() && ct != "application/octet-stream")
            .unwrap_or_else(|| {
                mime_guess::from_path(&file_name)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_owned()
            });
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "image/png" => "png",
            "image/jpeg" => "jpg",
            "image/svg+xml" => "svg",
            _ => "bin",
        }
    }
}

impl fmt::Debug for MediaFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Values of the post form, validated before anything leaves the server.
#[derive(Debug, Clone, Default, PartialEq, Validate)]
pub struct PostForm {
    #[validate(length(
        min = 5,
        max = 2200,
        message = "Caption must be between 5 and 2200 characters"
    ))]
    pub caption: String,
    #[validate(custom(function = "validate_media"))]
    pub file: Vec<MediaFile>,
    #[validate(length(max = 1000, message = "Location is too long"))]
    pub location: Option<String>,
    #[validate(custom(function = "validate_tags"))]
    pub tags: String,
}

impl PostForm {
    /// Pre-populates the form for editing. Media is never pre-filled.
    pub fn from_post(post: &Post) -> Self {
        Self {
            caption: post.caption.clone(),
            file: Vec::new(),
            location: post.location.clone(),
            tags: join_tags(&post.tags),
        }
    }

    pub fn check(&self) -> Result<(), FieldErrors> {
        self.validate().map_err(FieldErrors::from)
    }

    pub fn tag_list(&self) -> Vec<String> {
        split_tags(&self.tags)
    }

    pub fn set_location(&mut self, raw: &str) {
        let raw = raw.trim();
        self.location = (!raw.is_empty()).then(|| raw.to_owned());
    }
}

/// `"JS, Full Stack,,"` becomes `["JS", "FullStack"]`.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.chars().filter(|c| !c.is_whitespace()).collect::<String>())
        .filter(|t| !t.is_empty())
        .collect()
}

pub fn join_tags(tags: &[String]) -> String {
    tags.join(",")
}

fn validate_media(files: &[MediaFile]) -> Result<(), ValidationError> {
    if files.len() > 1 {
        return Err(invalid("too_many_files", "Only one image per post"));
    }
    for f in files {
        if f.bytes.is_empty() {
            return Err(invalid("empty_file", "The selected file is empty"));
        }
        if !ACCEPTED_MEDIA_TYPES.contains(&f.content_type.as_str()) {
            return Err(invalid(
                "file_type",
                "Only .png, .jpg, .jpeg and .svg images are accepted",
            ));
        }
    }
    Ok(())
}

fn validate_tags(raw: &str) -> Result<(), ValidationError> {
    if raw.chars().count() > MAX_TAGS_CHARS {
        return Err(invalid("tags_length", "Tags are too long"));
    }
    let tags = split_tags(raw);
    if tags.len() > MAX_TAGS {
        return Err(invalid("too_many_tags", "No more than 30 tags"));
    }
    if tags.iter().any(|t| t.chars().count() > MAX_TAG_LEN) {
        return Err(invalid("tag_length", "Each tag must be at most 40 characters"));
    }
    Ok(())
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut e = ValidationError::new(code);
    e.message = Some(message.into());
    e
}

/// What the form was opened for. Update carries the identity and current
/// media of the post being edited, so they cannot be forgotten.
#[derive(Debug, Clone, PartialEq)]
pub enum PostAction {
    Create { author: Uuid },
    Update { post_id: Uuid, media: Option<MediaRef> },
}

impl PostAction {
    pub fn update_for(post: &Post) -> Self {
        PostAction::Update {
            post_id: post.id,
            media: post.media(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PostAction::Create { .. } => "Create",
            PostAction::Update { .. } => "Update",
        }
    }

    /// Where the form posts to.
    pub fn submit_path(&self) -> String {
        match self {
            PostAction::Create { .. } => "/posts".to_owned(),
            PostAction::Update { post_id, .. } => detail_path(*post_id),
        }
    }

    /// Where the user lands once the submission settles.
    pub fn destination(&self) -> String {
        match self {
            PostAction::Create { .. } => "/".to_owned(),
            PostAction::Update { post_id, .. } => detail_path(*post_id),
        }
    }

    /// `uploaded` replaces the existing media on update; `None` keeps it.
    pub fn into_request(self, form: PostForm, uploaded: Option<MediaRef>) -> SubmitRequest {
        let tags = form.tag_list();
        match self {
            PostAction::Create { author } => SubmitRequest::Create(NewPost {
                creator_id: author,
                caption: form.caption,
                media: uploaded,
                location: form.location,
                tags,
            }),
            PostAction::Update { post_id, media } => SubmitRequest::Update(PostUpdate {
                post_id,
                caption: form.caption,
                replaced: uploaded.as_ref().and(media.clone()),
                media: uploaded.or(media),
                location: form.location,
                tags,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitRequest {
    Create(NewPost),
    Update(PostUpdate),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub creator_id: Uuid,
    pub caption: String,
    pub media: Option<MediaRef>,
    pub location: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostUpdate {
    pub post_id: Uuid,
    pub caption: String,
    /// Media the post should point at after the update.
    pub media: Option<MediaRef>,
    /// Previous media, present only when `media` is a new upload.
    pub replaced: Option<MediaRef>,
    pub location: Option<String>,
    pub tags: Vec<String>,
}

impl PostUpdate {
    pub fn changes(&self) -> PostChanges {
        let (image_id, image_url) = split_media(self.media.clone());
        PostChanges {
            caption: self.caption.clone(),
            image_id,
            image_url,
            location: self.location.clone(),
            tags: self.tags.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, AsChangeset)]
#[diesel(table_name = crate::schema::posts)]
#[diesel(treat_none_as_null = true)]
pub struct PostChanges {
    pub caption: String,
    pub image_id: Option<String>,
    pub image_url: Option<String>,
    pub location: Option<String>,
    pub tags: Vec<String>,
}
