//! Rendered page cache for incremental regeneration
//!
//! Each page is kept with the revalidate interval it was loaded with. After
//! that it is still served, but the first visitor to hit a stale page
//! triggers one background refresh. Further stale hits for the same slug do
//! not start another refresh while one is in flight, and concurrent misses
//! for one slug wait for a single first render.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, RwLock};

/// A rendered page
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub html: Arc<str>,
    pub rendered_at: Instant,
    /// How long the page is served before a refresh
    pub revalidate: Duration,
}

impl CacheEntry {
    pub fn is_fresh(&self) -> bool {
        self.rendered_at.elapsed() < self.revalidate
    }
}

/// Result of a cache lookup
#[derive(Debug, Clone)]
pub enum Lookup {
    Fresh(CacheEntry),
    /// Still servable, but due for a refresh
    Stale(CacheEntry),
    Miss,
}

impl Lookup {
    pub fn label(&self) -> &'static str {
        match self {
            Lookup::Fresh(_) => "HIT",
            Lookup::Stale(_) => "STALE",
            Lookup::Miss => "MISS",
        }
    }
}

/// In-process page store keyed by slug
#[derive(Debug, Default)]
pub struct PageCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    refreshing: Mutex<HashSet<String>>,
    rendering: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Claim on the background refresh of one slug, released on drop
#[derive(Debug)]
pub struct RefreshGuard<'a> {
    cache: &'a PageCache,
    slug: String,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        lock(&self.cache.refreshing).remove(&self.slug);
    }
}

/// Exclusive first render of one slug, released on drop
#[derive(Debug)]
pub struct RenderGuard<'a> {
    cache: &'a PageCache,
    slug: String,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for RenderGuard<'_> {
    fn drop(&mut self) {
        drop(self.held.take());
        let mut rendering = lock(&self.cache.rendering);
        if rendering
            .get(&self.slug)
            .is_some_and(|gate| Arc::strong_count(gate) == 1)
        {
            rendering.remove(&self.slug);
        }
    }
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lookup(&self, slug: &str) -> Lookup {
        let entries = self.entries.read().await;
        match entries.get(slug) {
            Some(entry) if entry.is_fresh() => Lookup::Fresh(entry.clone()),
            Some(entry) => Lookup::Stale(entry.clone()),
            None => Lookup::Miss,
        }
    }

    /// Store a freshly rendered page
    pub async fn store(&self, slug: &str, html: String, revalidate: Duration) -> CacheEntry {
        let entry = CacheEntry {
            html: html.into(),
            rendered_at: Instant::now(),
            revalidate,
        };
        self.entries
            .write()
            .await
            .insert(slug.to_string(), entry.clone());
        entry
    }

    pub async fn evict(&self, slug: &str) -> bool {
        let removed = self.entries.write().await.remove(slug).is_some();
        if removed {
            tracing::debug!("Evicted cached page {:?}", slug);
        }
        removed
    }

    /// Claim the refresh of `slug`; `None` if another refresh holds it
    pub fn begin_refresh(&self, slug: &str) -> Option<RefreshGuard<'_>> {
        lock(&self.refreshing)
            .insert(slug.to_string())
            .then(|| RefreshGuard {
                cache: self,
                slug: slug.to_string(),
            })
    }

    pub fn is_refreshing(&self, slug: &str) -> bool {
        lock(&self.refreshing).contains(slug)
    }

    /// Wait for exclusive rights to render `slug` for the first time
    ///
    /// Callers re-check the cache once this returns, since the previous
    /// holder has usually stored the page.
    pub async fn begin_render(&self, slug: &str) -> RenderGuard<'_> {
        let gate = lock(&self.rendering)
            .entry(slug.to_string())
            .or_default()
            .clone();
        RenderGuard {
            cache: self,
            slug: slug.to_string(),
            held: Some(gate.lock_owned().await),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// These sets stay consistent even if a holder panicked
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
