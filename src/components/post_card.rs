use maud::{html, Markup};
use uuid::Uuid;

use crate::models::post::Post;
use crate::models::user::User;

fn tag_list(post: &Post) -> Markup {
    html! {
        ul.post-tags {
            @for tag in &post.tags {
                li { a href=(format!("/explore?tag={}", urlencoding::encode(tag))) { "#" (tag) } }
            }
        }
    }
}

fn edit_link(post: &Post, viewer: Option<Uuid>) -> Markup {
    html! {
        @if viewer == Some(post.creator_id) {
            a.post-edit href=(format!("/update-post/{}", post.id)) {
                img src="/assets/icons/edit.svg" alt="edit" width="20" height="20";
            }
        }
    }
}

pub fn render(post: &Post, viewer: Option<Uuid>) -> Markup {
    html! {
        article.post-card {
            .post-card-header {
                @if let Some(location) = &post.location {
                    p.post-location { (location) }
                }
                (edit_link(post, viewer))
            }
            a href=(post.detail_path()) {
                p.post-caption { (post.caption) }
                (tag_list(post))
                @if let Some(url) = &post.image_url {
                    img.post-card_img src=(url) alt="post image";
                }
            }
        }
    }
}

pub fn feed(posts: &[Post], viewer: Option<Uuid>) -> Markup {
    html! {
        ul.post-feed {
            @for post in posts {
                li { (render(post, viewer)) }
            }
            @if posts.is_empty() {
                p.text-muted { "No posts yet" }
            }
        }
    }
}

pub fn detail(post: &Post, creator: Option<&User>, viewer: Option<Uuid>) -> Markup {
    html! {
        article.post-details {
            @if let Some(url) = &post.image_url {
                img.post-details-img src=(url) alt="post image";
            }
            .post-details-info {
                @if let Some(creator) = creator {
                    (creator)
                }
                (edit_link(post, viewer))
                @if let Some(location) = &post.location {
                    p.post-location { (location) }
                }
                p.post-caption { (post.caption) }
                (tag_list(post))
            }
        }
    }
}
