//! Render a single article to stdout

use anyhow::Result;

use crate::client::ContentClient;
use crate::page::{load_page, PageRenderer, PageResult};
use crate::Insights;

/// Load and render one article, failing when it would be a 404
pub async fn render(app: &Insights, client: &dyn ContentClient, slug: &str) -> Result<String> {
    match load_page(client, &app.config, Some(slug)).await {
        PageResult::Found { props, .. } => PageRenderer::new(&app.config)?.render(Some(&props.post)),
        PageResult::NotFound(reason) => anyhow::bail!("{}: not found ({})", slug, reason),
    }
}

pub async fn run(app: &Insights, client: &dyn ContentClient, slug: &str) -> Result<()> {
    println!("{}", render(app, client, slug).await?);
    Ok(())
}
