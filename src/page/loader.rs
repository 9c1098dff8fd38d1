//! Page data loading

use std::fmt;
use std::time::Duration;

use crate::client::ContentClient;
use crate::config::SiteConfig;
use crate::content::Post;

/// Input of the article page
#[derive(Debug, Clone)]
pub struct PageProps {
    pub post: Post,
}

/// Why a slug did not produce a page
///
/// Visitors see the same not-found page for every reason; the distinction
/// only drives logging and whether the outcome may be cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    MissingSlug,
    InvalidSlug,
    FetchFailed,
    Absent,
    WrongSite,
}

impl NotFoundReason {
    /// The content store could not be reached; the post may well exist
    pub fn is_transient(self) -> bool {
        matches!(self, NotFoundReason::FetchFailed)
    }
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            NotFoundReason::MissingSlug => "no slug",
            NotFoundReason::InvalidSlug => "invalid slug",
            NotFoundReason::FetchFailed => "content store unavailable",
            NotFoundReason::Absent => "no such post",
            NotFoundReason::WrongSite => "post not published to this site",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone)]
pub enum PageResult {
    Found {
        props: PageProps,
        /// How long the rendered page may be served before a refresh
        revalidate: Duration,
    },
    NotFound(NotFoundReason),
}

/// Whether `slug` is usable as a single path segment
///
/// Store slugs are free text, so case, underscores, apostrophes and
/// non-ASCII letters all pass. Only separators, parent references and
/// control characters are refused, since generated pages use the slug as
/// a directory name.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug != "."
        && !slug.contains("..")
        && !slug.chars().any(|c| c == '/' || c == '\\' || c.is_control())
}

/// Fetch the post behind `slug` and check it belongs to this site
///
/// Fetch failures are logged and reported as not found. There is no retry.
pub async fn load_page(
    client: &dyn ContentClient,
    config: &SiteConfig,
    slug: Option<&str>,
) -> PageResult {
    let slug = match slug {
        Some(s) if !s.is_empty() => s,
        _ => return PageResult::NotFound(NotFoundReason::MissingSlug),
    };

    if !is_valid_slug(slug) {
        tracing::debug!("Rejecting malformed slug {:?}", slug);
        return PageResult::NotFound(NotFoundReason::InvalidSlug);
    }

    let post = match client.get_post(slug).await {
        Ok(Some(post)) => post,
        Ok(None) => {
            tracing::debug!("No post with slug {:?}", slug);
            return PageResult::NotFound(NotFoundReason::Absent);
        }
        Err(e) => {
            tracing::error!("Error fetching post {:?}: {}", slug, e);
            return PageResult::NotFound(NotFoundReason::FetchFailed);
        }
    };

    if !post.is_published_to(&config.site_id) {
        tracing::info!(
            "Post {:?} is not published to {:?} (sites: {:?})",
            slug,
            config.site_id,
            post.sites
        );
        return PageResult::NotFound(NotFoundReason::WrongSite);
    }

    PageResult::Found {
        props: PageProps { post },
        revalidate: config.revalidate(),
    }
}
