use crate::models::user::User;
use maud::{html, Markup};

pub fn render(us: &[User]) -> Markup {
    html! {
        ul id="user-list-component" class="user-grid" {
            @for user in us {
                li { ( user ) }
            }
            @if us.is_empty() {
                p.text-muted { "No users yet" }
            }
        }
    }
}
