//! List the articles that would be pre-rendered

use anyhow::Result;

use crate::client::ContentClient;
use crate::helpers::post_path;
use crate::page::static_paths;
use crate::Insights;

/// Print every enumerated article path
pub async fn run(app: &Insights, client: &dyn ContentClient) -> Result<()> {
    let paths = static_paths(client, &app.config).await?;

    println!("Articles ({}):", paths.paths.len());
    for slug in paths.slugs() {
        println!("  {}", post_path(&app.config, slug));
    }

    Ok(())
}
