//! Query facade over the reference datasets and the wiki page cache.

use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::cache::{DatasetCache, RefreshStatus};
use crate::data::{
    ApiIndexSource, Flavor, GlobalStringsSource, Locale, LocalizedString, corpus,
};
use crate::error::CoreError;
use crate::search::{self, DEFAULT_THRESHOLD, Normalizer};
use crate::wiki::{WikiClient, WikiPage};

/// A fuzzy search over one flavor's global strings in one locale.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub query: String,
    /// Minimum score to keep; defaults to [`DEFAULT_THRESHOLD`].
    pub threshold: Option<f64>,
    /// Per-term result limit; absent or zero means unbounded.
    pub limit: Option<usize>,
    pub flavor: Option<Flavor>,
    pub locale: Option<Locale>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCacheStatus {
    pub cached: usize,
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStatus {
    pub global_strings: RefreshStatus,
    pub api_index: RefreshStatus,
    pub pages: PageCacheStatus,
}

pub struct Catalog {
    strings: DatasetCache<GlobalStringsSource>,
    api: DatasetCache<ApiIndexSource>,
    wiki: WikiClient,
    normalizer: Normalizer,
}

impl Catalog {
    pub fn new(strings: GlobalStringsSource, api: ApiIndexSource, wiki: WikiClient) -> Self {
        Self {
            strings: DatasetCache::new(strings),
            api: DatasetCache::new(api),
            wiki,
            normalizer: Normalizer::default(),
        }
    }

    pub fn strings(&self) -> &DatasetCache<GlobalStringsSource> {
        &self.strings
    }

    pub fn api(&self) -> &DatasetCache<ApiIndexSource> {
        &self.api
    }

    /// Every global string identifier of `flavor`, in upstream order.
    pub fn list_keys(&self, flavor: Flavor) -> Result<Vec<String>, CoreError> {
        let table = self.strings.get(flavor)?;
        Ok(table.keys().map(str::to_owned).collect())
    }

    /// Localized values for `keys`, in request order. Unknown identifiers are
    /// omitted.
    pub fn get_values<K: AsRef<str>>(
        &self,
        flavor: Flavor,
        keys: &[K],
    ) -> Result<IndexMap<String, LocalizedString>, CoreError> {
        let table = self.strings.get(flavor)?;
        Ok(keys
            .iter()
            .filter_map(|key| {
                let key = key.as_ref();
                table.get(key).map(|values| (key.to_owned(), values.clone()))
            })
            .collect())
    }

    /// Fuzzy search over identifiers and their text in the query's locale.
    ///
    /// Results map each identifier to its value in that locale only, ordered
    /// by the merged ranking.
    pub fn search(
        &self,
        query: &SearchQuery,
    ) -> Result<IndexMap<String, LocalizedString>, CoreError> {
        let threshold = check_threshold(query.threshold)?;
        let flavor = query.flavor.unwrap_or_default();
        let locale = query.locale.unwrap_or_default();
        let table = self.strings.get(flavor)?;

        let targets = table.targets(locale);
        let ranked = search::search(
            &self.normalizer,
            &query.query,
            &corpus(targets),
            threshold,
            query.limit.unwrap_or(0),
        );
        debug!(
            query = %query.query,
            %flavor,
            %locale,
            results = ranked.len(),
            "global string search"
        );

        Ok(ranked
            .into_iter()
            .filter_map(|key| {
                let text = table.get(key)?.get(&locale)?;
                Some((key.to_owned(), IndexMap::from([(locale, text.clone())])))
            })
            .collect())
    }

    /// Fuzzy search over API function names.
    pub fn search_api(
        &self,
        query: &str,
        threshold: Option<f64>,
        limit: Option<usize>,
        flavor: Option<Flavor>,
    ) -> Result<Vec<String>, CoreError> {
        let threshold = check_threshold(threshold)?;
        let table = self.api.get(flavor.unwrap_or_default())?;
        let targets = table.targets();
        Ok(search::search(
            &self.normalizer,
            query,
            &corpus(targets),
            threshold,
            limit.unwrap_or(0),
        )
        .into_iter()
        .map(str::to_owned)
        .collect())
    }

    /// Raw content of a wiki page.
    pub async fn lookup_content(&self, title: &str) -> Result<Arc<WikiPage>, CoreError> {
        self.wiki.page(title).await
    }

    pub fn status(&self) -> CatalogStatus {
        CatalogStatus {
            global_strings: self.strings.status(),
            api_index: self.api.status(),
            pages: PageCacheStatus {
                cached: self.wiki.cached(),
                capacity: self.wiki.capacity(),
            },
        }
    }

    /// Wake both refresh tasks.
    pub fn request_refresh(&self) {
        self.strings.trigger();
        self.api.trigger();
    }

    /// True once both datasets have been populated.
    pub fn is_ready(&self) -> bool {
        self.strings.is_initialized() && self.api.is_initialized()
    }
}

fn check_threshold(threshold: Option<f64>) -> Result<f64, CoreError> {
    match threshold {
        None => Ok(DEFAULT_THRESHOLD),
        Some(t) if (0.0..=1.0).contains(&t) => Ok(t),
        Some(t) => Err(CoreError::InvalidKey {
            kind: "threshold",
            value: t.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{api_index, global_strings};
    use crate::fetch::{FetchError, FetchText};
    use async_trait::async_trait;
    use std::time::Duration;

    struct StaticUpstream;

    #[async_trait]
    impl FetchText for StaticUpstream {
        async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
            if url.contains("GlobalAPI") {
                Ok("\"GetTime\",\n\"AbandonQuest\",\n".to_owned())
            } else {
                Ok("OKAY = \"Okay\";\nERR_QUEST_FAILED = \"Quest failed\";\n".to_owned())
            }
        }
    }

    fn catalog() -> Catalog {
        let fetcher: Arc<dyn FetchText> = Arc::new(StaticUpstream);
        Catalog::new(
            GlobalStringsSource::new(fetcher.clone(), global_strings::DEFAULT_URL_TEMPLATE),
            ApiIndexSource::new(fetcher.clone(), api_index::DEFAULT_URL_TEMPLATE),
            WikiClient::new(fetcher, "https://wiki.example", 4, Duration::from_secs(60)),
        )
    }

    #[tokio::test]
    async fn memo_only_holds_query_terms() {
        let catalog = catalog();
        catalog.strings().load().await.unwrap();
        catalog.api().load().await.unwrap();

        let results = catalog.search(&SearchQuery::new("okay quest")).unwrap();
        assert!(results.contains_key("OKAY"));
        assert!(results.contains_key("ERR_QUEST_FAILED"));
        let names = catalog.search_api("GetTime", None, None, None).unwrap();
        assert_eq!(names.first().map(String::as_str), Some("GetTime"));

        // Two strings terms plus one API term; no corpus identifiers.
        assert_eq!(catalog.normalizer.len(), 3);
    }

    #[test]
    fn threshold_defaults_and_bounds() {
        assert_eq!(check_threshold(None).unwrap(), DEFAULT_THRESHOLD);
        assert_eq!(check_threshold(Some(0.0)).unwrap(), 0.0);
        assert_eq!(check_threshold(Some(1.0)).unwrap(), 1.0);
        assert!(matches!(
            check_threshold(Some(1.5)),
            Err(CoreError::InvalidKey { kind: "threshold", .. })
        ));
        assert!(check_threshold(Some(f64::NAN)).is_err());
    }
}
