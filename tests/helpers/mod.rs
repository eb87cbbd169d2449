//! In-memory upstream for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use wowdex::catalog::Catalog;
use wowdex::data::{ApiIndexSource, Flavor, GlobalStringsSource, Locale};
use wowdex::fetch::{FetchError, FetchText};
use wowdex::wiki::WikiClient;

pub const STRINGS_TEMPLATE: &str = "mem://strings/{branch}/{locale}.lua";
pub const API_TEMPLATE: &str = "mem://api/{branch}/GlobalAPI.lua";
pub const WIKI_BASE: &str = "mem://wiki";

/// Serves registered bodies; unknown URLs answer 404.
#[derive(Default)]
pub struct MemoryFetcher {
    bodies: DashMap<String, Result<String, FetchError>>,
    calls: DashMap<String, usize>,
    delay: Option<Duration>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response, so concurrent callers overlap.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn set(&self, url: impl Into<String>, body: impl Into<String>) {
        self.bodies.insert(url.into(), Ok(body.into()));
    }

    pub fn fail(&self, url: impl Into<String>, status: u16) {
        let url = url.into();
        self.bodies.insert(
            url.clone(),
            Err(FetchError::Status {
                url,
                status,
            }),
        );
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.get(url).map(|c| *c).unwrap_or(0)
    }

    /// Serve `text` as the global strings file of every locale of `flavor`.
    pub fn set_strings(&self, flavor: Flavor, text: &str) {
        for locale in Locale::ALL {
            self.set(strings_url(flavor, locale), text);
        }
    }

    pub fn set_api(&self, flavor: Flavor, names: &[&str]) {
        let body: String = names.iter().map(|n| format!("\t\"{n}\",\n")).collect();
        self.set(api_url(flavor), format!("local GlobalAPI = {{\n{body}}}\n"));
    }

    /// Populate every flavor with the same small dataset.
    pub fn seed(&self) {
        for flavor in Flavor::ALL {
            self.set_strings(flavor, "OKAY = \"Okay\";\nCANCEL = \"Cancel\";\n");
            self.set(
                strings_url(flavor, Locale::DeDe),
                "OKAY = \"Okay\";\nCANCEL = \"Abbrechen\";\n",
            );
            self.set_api(
                flavor,
                &["GetTime", "C_QuestLog.IsQuestFlaggedCompleted", "AbandonQuest"],
            );
        }
    }
}

#[async_trait]
impl FetchText for MemoryFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        *self.calls.entry(url.to_owned()).or_insert(0) += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.bodies.get(url) {
            Some(body) => body.value().clone(),
            None => Err(FetchError::Status {
                url: url.to_owned(),
                status: 404,
            }),
        }
    }
}

pub fn strings_url(flavor: Flavor, locale: Locale) -> String {
    STRINGS_TEMPLATE
        .replace("{branch}", flavor.branch())
        .replace("{locale}", locale.as_str())
}

pub fn api_url(flavor: Flavor) -> String {
    API_TEMPLATE.replace("{branch}", flavor.branch())
}

pub fn wiki_url(title: &str) -> String {
    format!("{WIKI_BASE}/wiki/{title}?action=raw")
}

pub fn catalog(fetcher: &Arc<MemoryFetcher>) -> Catalog {
    Catalog::new(
        GlobalStringsSource::new(fetcher.clone(), STRINGS_TEMPLATE),
        ApiIndexSource::new(fetcher.clone(), API_TEMPLATE),
        WikiClient::new(fetcher.clone(), WIKI_BASE, 16, Duration::from_secs(3600)),
    )
}

/// A catalog over the seeded dataset, already populated.
pub async fn loaded_catalog() -> (Arc<MemoryFetcher>, Catalog) {
    let fetcher = Arc::new(MemoryFetcher::new());
    fetcher.seed();
    let catalog = catalog(&fetcher);
    catalog.strings().load().await.unwrap();
    catalog.api().load().await.unwrap();
    (fetcher, catalog)
}
