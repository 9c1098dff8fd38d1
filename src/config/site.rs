//! Site configuration (_config.yml)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Environment variable that overrides `sanity.token`
pub const TOKEN_ENV: &str = "SANITY_API_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub site_id: String,
    pub language: String,
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,
    pub listing_path: String,
    pub contact_path: String,

    // Directory
    pub public_dir: String,

    // Regeneration
    pub revalidate_secs: u64,
    pub paths_limit: usize,

    // Images
    pub image_quality: u32,

    // Content store
    #[serde(default)]
    pub sanity: SanityConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Assure".to_string(),
            site_id: "assure".to_string(),
            language: "en-AU".to_string(),
            timezone: "Australia/Sydney".to_string(),

            url: "http://localhost:4000".to_string(),
            root: "/".to_string(),
            listing_path: "/insights".to_string(),
            contact_path: "/contact".to_string(),

            public_dir: "public".to_string(),

            revalidate_secs: 300,
            paths_limit: 100,

            image_quality: 80,

            sanity: SanityConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let mut config: SiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        config.apply_env();
        Ok(config)
    }

    /// Pick up secrets from the environment
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.is_empty() {
                tracing::debug!("Using content store token from {}", TOKEN_ENV);
                self.sanity.token = Some(token);
            }
        }
    }

    /// How long a rendered page stays fresh
    pub fn revalidate(&self) -> Duration {
        Duration::from_secs(self.revalidate_secs)
    }

    /// Parsed display timezone, falling back to UTC on an unknown name
    pub fn tz(&self) -> chrono_tz::Tz {
        self.timezone.parse().unwrap_or_else(|_| {
            tracing::warn!("Unknown timezone {:?}, using UTC", self.timezone);
            chrono_tz::UTC
        })
    }
}

/// Headless content store connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SanityConfig {
    pub project_id: String,
    pub dataset: String,
    pub api_version: String,
    pub use_cdn: bool,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SanityConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            dataset: "production".to_string(),
            api_version: "2023-05-03".to_string(),
            use_cdn: true,
            token: None,
            timeout_secs: 10,
        }
    }
}

impl SanityConfig {
    /// Base URL of the query endpoint for this project and dataset
    pub fn query_url(&self) -> String {
        let host = if self.use_cdn {
            "apicdn.sanity.io"
        } else {
            "api.sanity.io"
        };
        format!(
            "https://{}.{}/v{}/data/query/{}",
            self.project_id, host, self.api_version, self.dataset
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.title, "Assure");
        assert_eq!(config.site_id, "assure");
        assert_eq!(config.revalidate(), Duration::from_secs(300));
        assert_eq!(config.paths_limit, 100);
        assert_eq!(config.image_quality, 80);
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: Assure Staging
revalidate_secs: 60
sanity:
  project_id: abc123
  use_cdn: false
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "Assure Staging");
        assert_eq!(config.revalidate_secs, 60);
        assert_eq!(config.site_id, "assure");
        assert_eq!(config.sanity.project_id, "abc123");
        assert_eq!(config.sanity.dataset, "production");
        assert_eq!(
            config.sanity.query_url(),
            "https://abc123.api.sanity.io/v2023-05-03/data/query/production"
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_config.yml");
        fs::write(&path, "timezone: Europe/London\npaths_limit: 5\n").unwrap();

        let config = SiteConfig::load(&path).unwrap();
        assert_eq!(config.paths_limit, 5);
        assert_eq!(config.tz(), chrono_tz::Europe::London);
    }

    #[test]
    fn test_unknown_timezone_falls_back_to_utc() {
        let config = SiteConfig {
            timezone: "Mars/Olympus".to_string(),
            ..SiteConfig::default()
        };
        assert_eq!(config.tz(), chrono_tz::UTC);
    }
}
