//! Static path enumeration

use std::collections::HashSet;

use crate::client::{ClientError, ContentClient};
use crate::config::SiteConfig;
use crate::page::loader::is_valid_slug;

/// Route parameters of one pre-rendered page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathParams {
    pub slug: String,
}

/// What happens to slugs that were not pre-rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Render on the first request, then cache like a pre-rendered page
    Blocking,
}

#[derive(Debug, Clone)]
pub struct StaticPaths {
    pub paths: Vec<PathParams>,
    pub fallback: Fallback,
}

impl StaticPaths {
    pub fn slugs(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(|p| p.slug.as_str())
    }
}

/// List the article slugs to pre-render
///
/// Asks the content store for up to `paths_limit` posts published to the
/// configured site. Later-published posts are still served through the
/// blocking fallback.
pub async fn static_paths(
    client: &dyn ContentClient,
    config: &SiteConfig,
) -> Result<StaticPaths, ClientError> {
    let posts = client
        .get_posts(&config.site_id, config.paths_limit)
        .await?;

    let mut seen = HashSet::new();
    let mut paths = Vec::with_capacity(posts.len());

    for post in posts {
        if post.slug.is_empty() {
            tracing::warn!("Skipping post {:?} without a slug", post.id);
            continue;
        }
        if !is_valid_slug(&post.slug) {
            tracing::warn!("Skipping post {:?} with unusable slug {:?}", post.id, post.slug);
            continue;
        }
        if seen.insert(post.slug.clone()) {
            paths.push(PathParams { slug: post.slug });
        }
    }

    tracing::debug!("Enumerated {} static paths", paths.len());

    Ok(StaticPaths {
        paths,
        fallback: Fallback::Blocking,
    })
}
