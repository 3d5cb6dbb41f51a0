use axum::response::Html;
use maud::Markup;

use crate::config::templates::Templates;
use crate::error::AppError;

/// Wraps a rendered component in the `layout.html` shell.
pub async fn page(
    templates: &Templates,
    title: &str,
    sidebar: Option<Markup>,
    content: Markup,
) -> Result<Html<String>, AppError> {
    let mut ctx = tera::Context::new();
    ctx.insert("title", title);
    ctx.insert(
        "sidebar",
        &sidebar.map(Markup::into_string).unwrap_or_default(),
    );
    ctx.insert("content", &content.into_string());
    let html = templates.read().await.render("layout.html", &ctx)?;
    Ok(Html(html))
}
