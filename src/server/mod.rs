//! Article server with incremental regeneration
//!
//! `GET {listing_path}/:slug` serves article pages out of the [`PageCache`],
//! rendering on a miss and refreshing stale pages in the background.
//! Anything else is looked up in the public directory.

use anyhow::Result;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{
        header::{self, HeaderName},
        Request, StatusCode,
    },
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::cache::{CacheEntry, Lookup, PageCache};
use crate::client::ContentClient;
use crate::config::SiteConfig;
use crate::helpers::url_for;
use crate::page::{load_page, static_paths, NotFoundReason, PageRenderer, PageResult};
use crate::Insights;

const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Server state
pub struct AppState {
    config: SiteConfig,
    public_dir: PathBuf,
    client: Arc<dyn ContentClient>,
    renderer: PageRenderer,
    cache: PageCache,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        config: SiteConfig,
        public_dir: PathBuf,
        client: Arc<dyn ContentClient>,
    ) -> Result<Self> {
        Ok(Self {
            renderer: PageRenderer::new(&config)?,
            cache: PageCache::new(),
            config,
            public_dir,
            client,
        })
    }

    pub fn cache(&self) -> &PageCache {
        &self.cache
    }
}

/// Outcome of rendering one slug
#[derive(Debug)]
pub enum Rendered {
    Page { html: String, revalidate: Duration },
    NotFound(NotFoundReason),
}

/// What a background refresh did to the cached page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Updated,
    Evicted,
    Kept,
}

/// Start the article server
pub async fn start(app: &Insights, client: Arc<dyn ContentClient>, ip: &str, port: u16) -> Result<()> {
    let state = Arc::new(AppState::new(
        app.config.clone(),
        app.public_dir.clone(),
        client,
    )?);

    match prerender(&state).await {
        Ok(count) => tracing::info!("Pre-rendered {} articles", count),
        Err(e) => tracing::warn!("Pre-rendering skipped, pages will render on demand: {}", e),
    }

    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router
pub fn router(state: SharedState) -> Router {
    let listing = url_for(&state.config, &state.config.listing_path);
    let article_route = format!("{}/:slug", listing.trim_end_matches('/'));

    Router::new()
        .route(&article_route, get(article_handler))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Render every enumerated path into the cache
pub async fn prerender(state: &AppState) -> Result<usize> {
    let paths = static_paths(state.client.as_ref(), &state.config).await?;
    let mut count = 0;

    for slug in paths.slugs() {
        match render_slug(state, slug).await? {
            Rendered::Page { html, revalidate } => {
                state.cache.store(slug, html, revalidate).await;
                count += 1;
            }
            Rendered::NotFound(reason) => {
                tracing::warn!("Listed post {:?} did not load: {}", slug, reason);
            }
        }
    }

    Ok(count)
}

/// Load and render one slug, bypassing the cache
pub async fn render_slug(state: &AppState, slug: &str) -> Result<Rendered> {
    match load_page(state.client.as_ref(), &state.config, Some(slug)).await {
        PageResult::Found { props, revalidate } => Ok(Rendered::Page {
            html: state.renderer.render(Some(&props.post))?,
            revalidate,
        }),
        PageResult::NotFound(reason) => Ok(Rendered::NotFound(reason)),
    }
}

/// Re-render a cached page
///
/// A post that is gone or moved off this site is evicted. When the
/// content store is unreachable the stale page stays in place.
pub async fn refresh(state: &AppState, slug: &str) -> RefreshOutcome {
    match render_slug(state, slug).await {
        Ok(Rendered::Page { html, revalidate }) => {
            state.cache.store(slug, html, revalidate).await;
            tracing::debug!("Regenerated {:?}", slug);
            RefreshOutcome::Updated
        }
        Ok(Rendered::NotFound(reason)) if reason.is_transient() => {
            tracing::warn!("Keeping stale page {:?}: {}", slug, reason);
            RefreshOutcome::Kept
        }
        Ok(Rendered::NotFound(reason)) => {
            tracing::info!("Removing page {:?}: {}", slug, reason);
            state.cache.evict(slug).await;
            RefreshOutcome::Evicted
        }
        Err(e) => {
            tracing::error!("Failed to regenerate {:?}: {}", slug, e);
            RefreshOutcome::Kept
        }
    }
}

async fn article_handler(
    State(state): State<SharedState>,
    Path(slug): Path<String>,
) -> Response {
    let lookup = state.cache.lookup(&slug).await;
    let label = lookup.label();

    match lookup {
        Lookup::Fresh(entry) => page_response(&entry, label),
        Lookup::Stale(entry) => {
            if !state.cache.is_refreshing(&slug) {
                let state = state.clone();
                let slug = slug.clone();
                tokio::spawn(async move {
                    if let Some(_claim) = state.cache.begin_refresh(&slug) {
                        refresh(&state, &slug).await;
                    }
                });
            }
            page_response(&entry, label)
        }
        Lookup::Miss => render_on_miss(&state, &slug).await,
    }
}

/// First render of a slug; concurrent visitors wait for one render
async fn render_on_miss(state: &AppState, slug: &str) -> Response {
    let _render = state.cache.begin_render(slug).await;

    if let Lookup::Fresh(entry) | Lookup::Stale(entry) = state.cache.lookup(slug).await {
        return page_response(&entry, "HIT");
    }

    match render_slug(state, slug).await {
        Ok(Rendered::Page { html, revalidate }) => {
            let entry = state.cache.store(slug, html, revalidate).await;
            page_response(&entry, "MISS")
        }
        Ok(Rendered::NotFound(reason)) => {
            tracing::debug!("Not found {:?}: {}", slug, reason);
            not_found_response(state, Some(reason))
        }
        Err(e) => {
            tracing::error!("Failed to render {:?}: {}", slug, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}

/// Serve files from the public directory, or the not-found page
async fn fallback_handler(State(state): State<SharedState>, request: Request<Body>) -> Response {
    let mut service = ServeDir::new(&state.public_dir).append_index_html_on_directories(true);
    match service.try_call(request).await {
        Ok(response) if response.status() == StatusCode::NOT_FOUND => {
            not_found_response(&state, None)
        }
        Ok(response) => response.into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
    }
}

fn page_response(entry: &CacheEntry, cache: &'static str) -> Response {
    let cache_control = format!(
        "public, s-maxage={}, stale-while-revalidate",
        entry.revalidate.as_secs()
    );
    (
        [
            (header::CACHE_CONTROL, cache_control),
            (X_CACHE, cache.to_string()),
        ],
        Html(entry.html.to_string()),
    )
        .into_response()
}

fn not_found_response(state: &AppState, reason: Option<NotFoundReason>) -> Response {
    let cache_control = match reason {
        Some(reason) if reason.is_transient() => "no-store".to_string(),
        _ => format!("public, s-maxage={}", state.config.revalidate_secs),
    };

    let body = state.renderer.render_not_found().unwrap_or_else(|e| {
        tracing::error!("Failed to render not-found page: {}", e);
        "Not found".to_string()
    });

    (
        StatusCode::NOT_FOUND,
        [(header::CACHE_CONTROL, cache_control)],
        Html(body),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::FixtureClient;
    use crate::client::ClientError;
    use crate::content::Post;
    use crate::page::loader::tests::{gdpr_post, FailingClient};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    /// Counts fetches and answers slowly enough for requests to overlap
    struct SlowClient {
        inner: FixtureClient,
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl ContentClient for SlowClient {
        async fn get_post(&self, slug: &str) -> Result<Option<Post>, ClientError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.inner.get_post(slug).await
        }

        async fn get_posts(&self, site: &str, limit: usize) -> Result<Vec<Post>, ClientError> {
            self.inner.get_posts(site, limit).await
        }
    }

    fn state_with(client: Arc<dyn ContentClient>, revalidate_secs: u64) -> SharedState {
        let config = SiteConfig {
            revalidate_secs,
            ..SiteConfig::default()
        };
        let dir = std::env::temp_dir().join("assure-insights-missing-public");
        Arc::new(AppState::new(config, dir, client).unwrap())
    }

    async fn get(state: &SharedState, uri: &str) -> (StatusCode, Response) {
        let response = router(state.clone())
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        (response.status(), response)
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn header(response: &Response, name: &str) -> String {
        response
            .headers()
            .get(name)
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_article_renders_then_hits_cache() {
        let client = Arc::new(FixtureClient::new(vec![gdpr_post(&["assure", "otherBrand"])]));
        let state = state_with(client, 300);

        let (status, response) = get(&state, "/insights/gdpr-update").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(header(&response, "x-cache"), "MISS");
        assert_eq!(
            header(&response, "cache-control"),
            "public, s-maxage=300, stale-while-revalidate"
        );
        assert!(body_text(response).await.contains("GDPR Update"));

        let (_, response) = get(&state, "/insights/gdpr-update").await;
        assert_eq!(header(&response, "x-cache"), "HIT");
    }

    #[tokio::test]
    async fn test_other_site_post_is_404() {
        let client = Arc::new(FixtureClient::new(vec![gdpr_post(&["otherBrand"])]));
        let state = state_with(client, 300);

        let (status, response) = get(&state, "/insights/gdpr-update").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("Page not found"));
        assert!(state.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_missing_post_and_unknown_path_are_404() {
        let state = state_with(Arc::new(FixtureClient::default()), 300);

        let (status, _) = get(&state, "/insights/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, response) = get(&state, "/nowhere.html").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("Page not found"));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_uncached_404() {
        let state = state_with(Arc::new(FailingClient), 300);

        let (status, response) = get(&state, "/insights/gdpr-update").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(header(&response, "cache-control"), "no-store");
    }

    #[tokio::test]
    async fn test_stale_page_served_while_refreshing() {
        let client = Arc::new(FixtureClient::new(vec![gdpr_post(&["assure"])]));
        let state = state_with(client, 0);

        let (_, response) = get(&state, "/insights/gdpr-update").await;
        assert_eq!(header(&response, "x-cache"), "MISS");

        let (status, response) = get(&state, "/insights/gdpr-update").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(header(&response, "x-cache"), "STALE");
        assert!(body_text(response).await.contains("GDPR Update"));
    }

    #[tokio::test]
    async fn test_refresh_outcomes() {
        let gone = state_with(Arc::new(FixtureClient::default()), 0);
        gone.cache().store("gdpr-update", "old".to_string(), Duration::ZERO).await;
        assert_eq!(refresh(&gone, "gdpr-update").await, RefreshOutcome::Evicted);
        assert!(gone.cache().is_empty().await);

        let down = state_with(Arc::new(FailingClient), 0);
        down.cache().store("gdpr-update", "old".to_string(), Duration::ZERO).await;
        assert_eq!(refresh(&down, "gdpr-update").await, RefreshOutcome::Kept);
        assert!(matches!(down.cache().lookup("gdpr-update").await, Lookup::Stale(_)));

        let live = state_with(
            Arc::new(FixtureClient::new(vec![gdpr_post(&["assure"])])),
            300,
        );
        live
            .cache()
            .store("gdpr-update", "old".to_string(), Duration::ZERO)
            .await;
        assert_eq!(refresh(&live, "gdpr-update").await, RefreshOutcome::Updated);
        match live.cache().lookup("gdpr-update").await {
            Lookup::Fresh(entry) => assert!(entry.html.contains("GDPR Update")),
            other => panic!("expected fresh, got {}", other.label()),
        }
    }

    #[tokio::test]
    async fn test_prerender_fills_cache() {
        let client = Arc::new(FixtureClient::new(vec![gdpr_post(&["assure"])]));
        let state = state_with(client, 300);
        assert_eq!(prerender(&state).await.unwrap(), 1);
        assert!(matches!(state.cache().lookup("gdpr-update").await, Lookup::Fresh(_)));

        let down = state_with(Arc::new(FailingClient), 300);
        assert!(prerender(&down).await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_misses_render_once() {
        let client = Arc::new(SlowClient {
            inner: FixtureClient::new(vec![gdpr_post(&["assure"])]),
            fetches: AtomicUsize::new(0),
        });
        let state = state_with(client.clone(), 300);

        let (first, second) = tokio::join!(
            get(&state, "/insights/gdpr-update"),
            get(&state, "/insights/gdpr-update")
        );
        assert_eq!(first.0, StatusCode::OK);
        assert_eq!(second.0, StatusCode::OK);
        assert_eq!(client.fetches.load(Ordering::SeqCst), 1);

        let mut labels = vec![header(&first.1, "x-cache"), header(&second.1, "x-cache")];
        labels.sort();
        assert_eq!(labels, vec!["HIT", "MISS"]);
    }

    #[tokio::test]
    async fn test_page_headers_follow_loaded_revalidate() {
        let client = Arc::new(FixtureClient::new(vec![gdpr_post(&["assure"])]));
        let state = state_with(client, 60);
        let (_, response) = get(&state, "/insights/gdpr-update").await;
        assert_eq!(
            header(&response, "cache-control"),
            "public, s-maxage=60, stale-while-revalidate"
        );
        match state.cache().lookup("gdpr-update").await {
            Lookup::Fresh(entry) => assert_eq!(entry.revalidate, Duration::from_secs(60)),
            other => panic!("expected fresh, got {}", other.label()),
        }
    }

    #[tokio::test]
    async fn test_store_slug_with_capitals_is_served() {
        let mut post = gdpr_post(&["assure"]);
        post.slug = "GDPR-Update".to_string();
        let state = state_with(Arc::new(FixtureClient::new(vec![post])), 300);
        let (status, _) = get(&state, "/insights/GDPR-Update").await;
        assert_eq!(status, StatusCode::OK);
    }
}
