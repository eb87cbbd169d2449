//! Global API function names, one list per client flavor.

use async_trait::async_trait;
use indexmap::IndexSet;
use regex::Regex;
use std::sync::{Arc, LazyLock, OnceLock};

use super::Flavor;
use super::target::SearchTarget;
use crate::cache::DatasetSource;
use crate::error::CoreError;
use crate::fetch::FetchText;

pub const DEFAULT_URL_TEMPLATE: &str =
    "https://raw.githubusercontent.com/Ketho/BlizzardInterfaceResources/{branch}/Resources/GlobalAPI.lua";

/// A quoted function name on its own line, optionally namespaced.
static API_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*"([A-Za-z_][A-Za-z0-9_]*(?:[.:][A-Za-z_][A-Za-z0-9_]*)*)"\s*,?\s*$"#)
        .expect("api name regex is valid")
});

/// Extract function names from a GlobalAPI listing, first occurrence wins.
pub fn parse_api_names(text: &str) -> IndexSet<String> {
    text.lines()
        .filter_map(|line| API_NAME.captures(line))
        .map(|caps| caps[1].to_owned())
        .collect()
}

/// All API function names of one flavor.
pub struct ApiTable {
    flavor: Flavor,
    names: IndexSet<String>,
    targets: OnceLock<Vec<SearchTarget>>,
}

impl ApiTable {
    pub fn new(flavor: Flavor, names: IndexSet<String>) -> Self {
        Self {
            flavor,
            names,
            targets: OnceLock::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn targets(&self) -> &[SearchTarget] {
        self.targets.get_or_init(|| {
            self.names
                .iter()
                .map(|name| SearchTarget::new(name, "", self.flavor))
                .collect()
        })
    }
}

pub struct ApiIndexSource {
    fetcher: Arc<dyn FetchText>,
    url_template: String,
}

impl ApiIndexSource {
    pub fn new(fetcher: Arc<dyn FetchText>, url_template: impl Into<String>) -> Self {
        Self {
            fetcher,
            url_template: url_template.into(),
        }
    }

    pub fn url(&self, flavor: Flavor) -> String {
        self.url_template
            .replace("{branch}", flavor.branch())
            .replace("{flavor}", flavor.as_str())
    }
}

#[async_trait]
impl DatasetSource for ApiIndexSource {
    type Partition = ApiTable;

    fn name(&self) -> &'static str {
        "api index"
    }

    fn partition_len(partition: &ApiTable) -> usize {
        partition.len()
    }

    async fn load(&self, flavor: Flavor) -> Result<ApiTable, CoreError> {
        let url = self.url(flavor);
        let body = self.fetcher.fetch_text(&url).await?;
        let names = parse_api_names(&body);
        if names.is_empty() {
            return Err(CoreError::parse(url, "no function names found"));
        }
        Ok(ApiTable::new(flavor, names))
    }
}
