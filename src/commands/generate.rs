//! Pre-render article pages

use anyhow::Result;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::client::ContentClient;
use crate::page::{load_page, static_paths, PageRenderer, PageResult};
use crate::Insights;

/// Summary of a generate run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GenerateReport {
    pub written: usize,
    pub skipped: usize,
    pub removed: usize,
}

/// Render every enumerated article into the public directory
pub async fn run(app: &Insights, client: &dyn ContentClient) -> Result<()> {
    let start = std::time::Instant::now();
    let report = generate(app, client).await?;

    tracing::info!(
        "Wrote {} articles ({} skipped, {} removed) in {:.2}s",
        report.written,
        report.skipped,
        report.removed,
        start.elapsed().as_secs_f64()
    );

    Ok(())
}

pub async fn generate(app: &Insights, client: &dyn ContentClient) -> Result<GenerateReport> {
    let articles_dir = articles_dir(app)?;
    let renderer = PageRenderer::new(&app.config)?;
    let paths = static_paths(client, &app.config).await?;

    tracing::info!("Generating {} articles", paths.paths.len());
    fs::create_dir_all(&articles_dir)?;

    let mut report = GenerateReport::default();
    let mut keep = HashSet::new();

    for slug in paths.slugs() {
        match load_page(client, &app.config, Some(slug)).await {
            PageResult::Found { props, .. } => {
                let html = renderer.render(Some(&props.post))?;
                let dir = articles_dir.join(slug);
                fs::create_dir_all(&dir)?;
                fs::write(dir.join("index.html"), html)?;
                keep.insert(slug.to_string());
                report.written += 1;
                tracing::debug!("Generated: {}", slug);
            }
            PageResult::NotFound(reason) if reason.is_transient() => {
                tracing::warn!("Keeping previous output for {:?}: {}", slug, reason);
                keep.insert(slug.to_string());
                report.skipped += 1;
            }
            PageResult::NotFound(reason) => {
                tracing::warn!("Skipping {:?}: {}", slug, reason);
                report.skipped += 1;
            }
        }
    }

    report.removed = remove_stale(&articles_dir, &keep)?;

    fs::write(app.public_dir.join("404.html"), renderer.render_not_found()?)?;

    Ok(report)
}

/// Directory holding one sub-directory per article
///
/// Stale article directories are deleted from here, so it must not be the
/// public directory itself.
fn articles_dir(app: &Insights) -> Result<PathBuf> {
    let segment = app.config.listing_path.trim_matches('/');
    if segment.is_empty() {
        anyhow::bail!(
            "listing_path {:?} does not name a directory under {}",
            app.config.listing_path,
            app.public_dir.display()
        );
    }
    Ok(app.public_dir.join(segment))
}

/// Delete article directories from earlier runs that are no longer listed
fn remove_stale(articles_dir: &Path, keep: &HashSet<String>) -> Result<usize> {
    let mut removed = 0;

    for entry in fs::read_dir(articles_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if !keep.contains(&name) {
            fs::remove_dir_all(&path)?;
            tracing::info!("Deleted stale article: {:?}", path);
            removed += 1;
        }
    }

    Ok(removed)
}
