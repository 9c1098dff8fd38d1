//! Content store client
//!
//! Pages never talk to the content store directly. They go through the
//! [`ContentClient`] trait so the HTTP backend can be swapped for local
//! fixtures in previews and tests.

mod fixture;
mod sanity;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::content::{portable_text, Block, Post};

pub use fixture::FixtureClient;
pub use sanity::SanityClient;

/// Words read per minute when estimating reading time
pub const WORDS_PER_MINUTE: usize = 200;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"\S+").unwrap();
}

/// Errors raised while talking to the content store
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Content store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Read access to published posts
#[async_trait]
pub trait ContentClient: Send + Sync {
    /// Fetch a single post by slug
    async fn get_post(&self, slug: &str) -> Result<Option<Post>, ClientError>;

    /// Fetch the newest posts published to `site`, at most `limit` of them
    async fn get_posts(&self, site: &str, limit: usize) -> Result<Vec<Post>, ClientError>;
}

/// Image URL for a resized derivative of a store asset
///
/// The content store's image pipeline reads the transform from the query
/// string. Existing query parameters are kept.
///
/// # Examples
/// ```ignore
/// build_image_url("https://cdn.sanity.io/images/p/d/abc.jpg", 1200, 675, 80)
/// // -> "https://cdn.sanity.io/images/p/d/abc.jpg?w=1200&h=675&q=80&fit=crop&auto=format"
/// ```
pub fn build_image_url(source: &str, width: u32, height: u32, quality: u32) -> String {
    match url::Url::parse(source) {
        Ok(mut url) => {
            url.query_pairs_mut()
                .append_pair("w", &width.to_string())
                .append_pair("h", &height.to_string())
                .append_pair("q", &quality.to_string())
                .append_pair("fit", "crop")
                .append_pair("auto", "format");
            url.to_string()
        }
        Err(e) => {
            tracing::debug!("Image source {:?} is not absolute ({}), appending params", source, e);
            let sep = if source.contains('?') { '&' } else { '?' };
            format!(
                "{}{}w={}&h={}&q={}&fit=crop&auto=format",
                source, sep, width, height, quality
            )
        }
    }
}

/// Estimated reading time of a body in whole minutes, never less than one
pub fn calculate_reading_time(body: &[Block]) -> u32 {
    let text = portable_text::to_plain_text(body);
    let words = WORD.find_iter(&text).count();
    words.div_ceil(WORDS_PER_MINUTE).max(1) as u32
}
