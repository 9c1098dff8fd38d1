//! HTTP backend for the hosted content store

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use super::{ClientError, ContentClient};
use crate::config::SanityConfig;
use crate::content::Post;

/// Projection shared by both queries
const POST_PROJECTION: &str = r#"{
  _id,
  title,
  slug,
  excerpt,
  body,
  mainImage{ alt, asset->{ url } },
  author->{ name, role, image{ alt, asset->{ url } } },
  categories[]->{ _id, title },
  tags,
  jurisdictions,
  publishedAt,
  estimatedReadingTime,
  sites
}"#;

/// Query API response envelope
#[derive(Deserialize)]
struct QueryResponse<T> {
    result: T,
}

/// Client for the content store's GROQ query endpoint
#[derive(Debug, Clone)]
pub struct SanityClient {
    query_url: String,
    client: reqwest::Client,
}

impl SanityClient {
    pub fn new(config: &SanityConfig) -> Result<Self, ClientError> {
        if config.project_id.is_empty() {
            return Err(ClientError::InvalidConfig(
                "sanity.project_id is not set".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = &config.token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ClientError::InvalidConfig(format!("token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::ClientBuilder::new()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("assure-insights/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            query_url: config.query_url(),
            client,
        })
    }

    /// Run a GROQ query with JSON-encoded parameters
    async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        params: &[(&str, serde_json::Value)],
    ) -> Result<T, ClientError> {
        let mut pairs = vec![("query".to_string(), query.to_string())];
        for (name, value) in params {
            pairs.push((format!("${}", name), value.to_string()));
        }

        tracing::debug!("Querying content store: {}", query.lines().next().unwrap_or(""));

        let response = self.client.get(&self.query_url).query(&pairs).send().await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let envelope: QueryResponse<T> = serde_json::from_str(&text)?;
        Ok(envelope.result)
    }
}

#[async_trait]
impl ContentClient for SanityClient {
    async fn get_post(&self, slug: &str) -> Result<Option<Post>, ClientError> {
        let query = post_query();
        self.query(&query, &[("slug", serde_json::Value::from(slug))])
            .await
    }

    async fn get_posts(&self, site: &str, limit: usize) -> Result<Vec<Post>, ClientError> {
        let query = posts_query(limit);
        let documents: Option<Vec<serde_json::Value>> = self
            .query(&query, &[("site", serde_json::Value::from(site))])
            .await?;
        Ok(decode_posts(documents.unwrap_or_default()))
    }
}

/// Decode listed documents one by one, dropping any that do not fit
fn decode_posts(documents: Vec<serde_json::Value>) -> Vec<Post> {
    documents
        .into_iter()
        .filter_map(|document| {
            let id = document.get("_id").cloned();
            match serde_json::from_value::<Post>(document) {
                Ok(post) => Some(post),
                Err(e) => {
                    tracing::warn!("Skipping undecodable post {:?}: {}", id, e);
                    None
                }
            }
        })
        .collect()
}

fn post_query() -> String {
    format!(
        r#"*[_type == "post" && slug.current == $slug][0]{}"#,
        POST_PROJECTION
    )
}

fn posts_query(limit: usize) -> String {
    format!(
        r#"*[_type == "post" && $site in sites] | order(publishedAt desc)[0...{}]{}"#,
        limit, POST_PROJECTION
    )
}
