use maud::{html, Markup};

pub fn render() -> Markup {
    html! {
        .loader-container {
            img.loader src="/assets/icons/loader.svg" alt="loader" width="24" height="24";
        }
    }
}
