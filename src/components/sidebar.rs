use maud::{html, Markup};

use crate::models::nav::NavLink;
use crate::models::user::SessionContext;

use super::{loader, user::avatar_url};

pub fn render(current_path: &str, links: &[NavLink], session: &SessionContext) -> Markup {
    html! {
        nav.leftsidebar {
            .sidebar-top {
                a.logo href="/" {
                    img src="/assets/images/icon.svg" alt="logo" height="64" width="64";
                    h1.logo-title { "Hive Link" }
                }

                (profile(session))

                ul.sidebar-links {
                    @for link in links {
                        @let active = link.is_active(current_path);
                        li.leftsidebar-link.group.active[active] {
                            a href=(link.route) aria-current=[active.then_some("page")] {
                                img.invert-white[active] src=(link.icon) alt=(link.label);
                                (link.label)
                            }
                        }
                    }
                }
            }
            button.leftsidebar-link.group type="button" hx-post="/sign-out" hx-swap="none" {
                img src="/assets/icons/logout.svg" alt="logout";
                p.small-medium { "Logout" }
            }
        }
    }
}

/// Until the identity resolves this is a placeholder that fetches the real
/// block from `/sidebar/profile` as soon as it lands in the page.
pub fn profile(session: &SessionContext) -> Markup {
    html! {
        @if session.is_ready() {
            a.profile href=(session.user.profile_path()) {
                img.rounded-full src=(avatar_url(&session.user)) alt="profile" width="56" height="56";
                .flex.flex-col {
                    p.body-bold { (session.user.name) }
                    p.small-regular.text-muted { "@" (session.user.username) }
                }
            }
        } @else {
            .profile-placeholder hx-get="/sidebar/profile" hx-trigger="load" hx-swap="outerHTML" {
                (loader::render())
            }
        }
    }
}
