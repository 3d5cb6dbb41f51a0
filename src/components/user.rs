use maud::{html, Markup};

use crate::models::user::User;

pub const PROFILE_PLACEHOLDER: &str = "/assets/icons/profile-placeholder.svg";

pub fn avatar_url(user: &User) -> &str {
    user.image_url
        .as_deref()
        .filter(|url| !url.is_empty())
        .unwrap_or(PROFILE_PLACEHOLDER)
}

impl maud::Render for User {
    fn render(&self) -> Markup {
        html! {
            a.user-card href=(self.profile_path()) {
                img.rounded-full src=(avatar_url(self)) alt="creator" width="56" height="56";
                p.base-medium { (self.name) }
                p.small-regular.text-muted { "@" (self.username) }
            }
        }
    }
}
