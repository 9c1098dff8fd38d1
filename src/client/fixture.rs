//! Local fixture backend
//!
//! Serves posts from memory, optionally loaded from a JSON file holding an
//! array of store documents. Used for offline previews and tests.

use async_trait::async_trait;
use std::fs;
use std::path::Path;

use super::{ClientError, ContentClient};
use crate::content::Post;

/// In-memory content store
#[derive(Debug, Clone, Default)]
pub struct FixtureClient {
    posts: Vec<Post>,
}

impl FixtureClient {
    pub fn new(posts: Vec<Post>) -> Self {
        Self { posts }
    }

    /// Load posts from a JSON array file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ClientError> {
        let content = fs::read_to_string(path.as_ref())?;
        let posts: Vec<Post> = serde_json::from_str(&content)?;
        tracing::info!(
            "Loaded {} fixture posts from {:?}",
            posts.len(),
            path.as_ref()
        );
        Ok(Self::new(posts))
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }
}

#[async_trait]
impl ContentClient for FixtureClient {
    async fn get_post(&self, slug: &str) -> Result<Option<Post>, ClientError> {
        Ok(self.posts.iter().find(|p| p.slug == slug).cloned())
    }

    async fn get_posts(&self, site: &str, limit: usize) -> Result<Vec<Post>, ClientError> {
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|p| p.is_published_to(site))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        posts.truncate(limit);
        Ok(posts)
    }
}
