//! Wiki page lookups through the singleflight page cache.

use regex::Regex;
use serde::Serialize;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::debug;

use crate::cache::SingleFlightCache;
use crate::error::CoreError;
use crate::fetch::FetchText;

pub const DEFAULT_BASE_URL: &str = "https://warcraft.wiki.gg";

/// Redirect hops followed before giving up.
pub const MAX_REDIRECTS: usize = 3;

static REDIRECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*#REDIRECT\s*\[\[([^\]|#]+)").expect("redirect regex is valid")
});

/// Raw wikitext of a resolved page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WikiPage {
    /// Canonical form of the requested title.
    pub title: String,
    /// Title the content was read from, after redirects.
    pub resolved_title: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub redirected_from: Vec<String>,
    /// Raw URL of the resolved page.
    pub url: String,
    pub content: String,
}

/// Canonical wiki title: trimmed, spaces as `_`, first character uppercased.
///
/// Returns `None` for titles that are empty after trimming.
pub fn canonical_title(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join("_");
    let mut chars = collapsed.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}

/// Target of a `#REDIRECT [[Target]]` page.
fn redirect_target(content: &str) -> Option<&str> {
    REDIRECT
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

#[derive(Clone)]
pub struct WikiClient {
    fetcher: Arc<dyn FetchText>,
    base_url: Arc<str>,
    pages: SingleFlightCache<WikiPage, CoreError>,
}

impl WikiClient {
    pub fn new(
        fetcher: Arc<dyn FetchText>,
        base_url: &str,
        capacity: usize,
        ttl: Duration,
    ) -> Self {
        Self {
            fetcher,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            pages: SingleFlightCache::new(capacity, ttl),
        }
    }

    /// Fetch a page, serving repeated and concurrent lookups from the cache.
    #[tracing::instrument(skip_all, fields(title = %raw_title))]
    pub async fn page(&self, raw_title: &str) -> Result<Arc<WikiPage>, CoreError> {
        let title = canonical_title(raw_title).ok_or_else(|| CoreError::InvalidKey {
            kind: "title",
            value: raw_title.to_owned(),
        })?;

        let fetcher = self.fetcher.clone();
        let base_url = self.base_url.clone();
        let key = title.clone();
        self.pages
            .get_or_load(&key, move || resolve(fetcher, base_url, title))
            .await
    }

    /// Number of cached pages.
    pub fn cached(&self) -> usize {
        self.pages.len()
    }

    pub fn capacity(&self) -> usize {
        self.pages.capacity()
    }
}

fn raw_url(base_url: &str, title: &str) -> String {
    format!("{base_url}/wiki/{}?action=raw", urlencoding::encode(title))
}

async fn resolve(
    fetcher: Arc<dyn FetchText>,
    base_url: Arc<str>,
    title: String,
) -> Result<WikiPage, CoreError> {
    let mut current = title.clone();
    let mut redirected_from = Vec::new();

    loop {
        let url = raw_url(&base_url, &current);
        let content = fetcher.fetch_text(&url).await?;
        if content.trim().is_empty() {
            return Err(CoreError::parse(url, "empty page"));
        }

        let Some(target) = redirect_target(&content).and_then(canonical_title) else {
            debug!(title = %current, hops = redirected_from.len(), "wiki page resolved");
            return Ok(WikiPage {
                title,
                resolved_title: current,
                redirected_from,
                url,
                content,
            });
        };

        if redirected_from.len() >= MAX_REDIRECTS {
            return Err(CoreError::parse(url, "too many redirects"));
        }
        if target == current || redirected_from.contains(&target) {
            return Err(CoreError::parse(url, format!("redirect loop at {target}")));
        }
        debug!(from = %current, to = %target, "following wiki redirect");
        redirected_from.push(std::mem::replace(&mut current, target));
    }
}
