//! assure-insights: server-rendered Insights articles for the Assure website
//!
//! Articles live in a headless content store. This crate fetches them,
//! checks they are published to this site and renders each one as a
//! complete HTML page, either ahead of time (`generate`) or on demand with
//! incremental regeneration (`serve`).

pub mod cache;
pub mod client;
pub mod commands;
pub mod config;
pub mod content;
pub mod helpers;
pub mod page;
pub mod server;
pub mod templates;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use client::{ContentClient, FixtureClient, SanityClient};

/// The Insights application
#[derive(Clone)]
pub struct Insights {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
}

impl Insights {
    /// Create a new instance from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            let mut config = config::SiteConfig::default();
            config.apply_env();
            config
        };

        let public_dir = base_dir.join(&config.public_dir);

        Ok(Self {
            config,
            base_dir,
            public_dir,
        })
    }

    /// Content client for this site: a fixture file when given, else the store
    pub fn client(&self, fixtures: Option<&Path>) -> Result<Arc<dyn ContentClient>> {
        match fixtures {
            Some(path) => {
                let path = if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    self.base_dir.join(path)
                };
                let client = FixtureClient::load(&path)
                    .with_context(|| format!("loading fixtures from {}", path.display()))?;
                Ok(Arc::new(client))
            }
            None => {
                let client = SanityClient::new(&self.config.sanity)
                    .context("configuring content store client")?;
                Ok(Arc::new(client))
            }
        }
    }

    /// Pre-render all listed articles
    pub async fn generate(&self, client: &dyn ContentClient) -> Result<()> {
        commands::generate::run(self, client).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_new_without_config() {
        let dir = tempfile::tempdir().unwrap();
        let app = Insights::new(dir.path()).unwrap();
        assert_eq!(app.config.site_id, "assure");
        assert_eq!(app.public_dir, dir.path().join("public"));
    }

    #[test]
    fn test_new_with_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("_config.yml"), "public_dir: out\n").unwrap();
        let app = Insights::new(dir.path()).unwrap();
        assert_eq!(app.public_dir, dir.path().join("out"));
    }

    #[test]
    fn test_fixture_client_relative_to_base() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("posts.json"), "[]").unwrap();
        let app = Insights::new(dir.path()).unwrap();
        assert!(app.client(Some(Path::new("posts.json"))).is_ok());
        assert!(app.client(Some(Path::new("nope.json"))).is_err());
    }
}
