use maud::{html, Markup};
use uuid::Uuid;

use crate::models::post::{PostAction, PostForm};
use crate::models::FieldErrors;
use crate::workflow::submission::SubmissionState;

use super::loader;

pub struct PostFormView<'a> {
    pub action: &'a PostAction,
    pub form: &'a PostForm,
    pub errors: &'a FieldErrors,
    /// Current image of the post being edited.
    pub media_url: Option<&'a str>,
    pub submission_id: Uuid,
}

pub fn submission_events_path(id: Uuid, label: &str) -> String {
    format!("/posts/submissions/{id}?label={label}")
}

pub fn render(view: &PostFormView) -> Markup {
    let form = view.form;
    html! {
        form.post-form
            hx-post=(view.action.submit_path())
            hx-encoding="multipart/form-data"
            hx-swap="outerHTML"
            hx-disabled-elt="find button[type='submit']" {

            input type="hidden" name="submission_id" value=(view.submission_id);

            (field("caption", "Caption", view.errors, html! {
                textarea.shad-textarea #caption name="caption" placeholder="Write your caption here" {
                    (form.caption)
                }
            }))

            (field("file", "Add Photos", view.errors, file_uploader(view.media_url)))

            (field("location", "Add Location", view.errors, html! {
                input.shad-input #location type="text" name="location" placeholder="Tokyo"
                    value=(form.location.as_deref().unwrap_or_default());
            }))

            (field("tags", r#"Add Tags (separated by comma " , ")"#, view.errors, html! {
                input.shad-input #tags type="text" name="tags" placeholder="JS, React, FullStack"
                    value=(form.tags);
            }))

            .form-actions {
                button.shad-button_dark_4 type="button" onclick="history.back()" { "Cancel" }
                div hx-ext="sse"
                    sse-connect=(submission_events_path(view.submission_id, view.action.label()))
                    sse-swap="state" {
                    (submit_button(view.action.label(), &SubmissionState::Idle))
                }
            }
        }
    }
}

/// The loader replaces the label for as long as the backend call is running.
pub fn submit_button(label: &str, state: &SubmissionState) -> Markup {
    html! {
        button.shad-button_primary type="submit" disabled[state.is_busy()] {
            @if state.is_busy() {
                (loader::render())
            } @else {
                p { (label) }
            }
        }
    }
}

fn field(name: &str, label: &str, errors: &FieldErrors, control: Markup) -> Markup {
    html! {
        .form-item {
            label.shad-form_label for=(name) { (label) }
            (control)
            @for message in errors.get(name) {
                p.shad-form_message { (message) }
            }
        }
    }
}

fn file_uploader(media_url: Option<&str>) -> Markup {
    html! {
        .file-uploader {
            @if let Some(url) = media_url {
                img.file-uploader-img src=(url) alt="current image";
                p.file-uploader-label { "Choose a new photo to replace this one" }
            } @else {
                img src="/assets/icons/file-upload.svg" alt="file upload" width="96" height="77";
                p.file-uploader-label { "SVG, PNG, JPG" }
            }
            input #file type="file" name="file" accept=".png,.jpeg,.jpg,.svg";
        }
    }
}
