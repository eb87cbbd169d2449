//! Localized global strings, one table per client flavor.
//!
//! Upstream publishes one Lua file per flavor and locale, each line of the
//! form `IDENTIFIER = "Text";`. Every locale of a flavor is fetched and folded
//! into a single table keyed by identifier.

use async_trait::async_trait;
use indexmap::IndexMap;
use regex::Regex;
use std::sync::{Arc, LazyLock, OnceLock};
use tracing::debug;

use super::target::SearchTarget;
use super::{Flavor, Locale};
use crate::cache::DatasetSource;
use crate::error::CoreError;
use crate::fetch::FetchText;

pub const DEFAULT_URL_TEMPLATE: &str = "https://raw.githubusercontent.com/Ketho/BlizzardInterfaceResources/{branch}/Resources/GlobalStrings/{locale}.lua";

/// `[optional prefix] IDENTIFIER = "VALUE";` with the semicolon optional.
static ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:\[[^\]]*\]\s*)?([A-Za-z_][A-Za-z0-9_]*)\s*=\s*"(.*)"\s*;?\s*$"#)
        .expect("assignment regex is valid")
});

/// A string in every locale it is defined for.
pub type LocalizedString = IndexMap<Locale, String>;

/// Parse one global strings file into `identifier → text`.
///
/// Lines that don't match, blank lines and lines containing `{` or `}` are
/// skipped. Later duplicates overwrite earlier ones in place.
pub fn parse_global_strings(text: &str) -> IndexMap<String, String> {
    let mut entries = IndexMap::new();
    for line in text.lines() {
        if line.contains('{') || line.contains('}') {
            continue;
        }
        let Some(caps) = ASSIGNMENT.captures(line) else {
            continue;
        };
        entries.insert(caps[1].to_owned(), unescape_lua(&caps[2]));
    }
    entries
}

/// Undo the escapes Lua string literals use in these files.
fn unescape_lua(s: &str) -> String {
    if !s.contains('\\') {
        return s.to_owned();
    }
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// All global strings of one flavor.
pub struct StringTable {
    flavor: Flavor,
    entries: IndexMap<String, LocalizedString>,
    /// Per-locale search targets, built on first search.
    targets: [OnceLock<Vec<SearchTarget>>; Locale::COUNT],
}

impl StringTable {
    pub fn new(flavor: Flavor, entries: IndexMap<String, LocalizedString>) -> Self {
        Self {
            flavor,
            entries,
            targets: std::array::from_fn(|_| OnceLock::new()),
        }
    }

    /// Fold per-locale files into one table.
    ///
    /// Identifier order follows the first locale that defines each identifier,
    /// visiting locales in the given order.
    pub fn from_locales(
        flavor: Flavor,
        per_locale: impl IntoIterator<Item = (Locale, IndexMap<String, String>)>,
    ) -> Self {
        let mut entries: IndexMap<String, LocalizedString> = IndexMap::new();
        for (locale, strings) in per_locale {
            for (key, value) in strings {
                entries.entry(key).or_default().insert(locale, value);
            }
        }
        Self::new(flavor, entries)
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identifiers in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&LocalizedString> {
        self.entries.get(key)
    }

    /// Search targets for `locale`; identifiers without text in that locale
    /// are not searchable in it.
    pub fn targets(&self, locale: Locale) -> &[SearchTarget] {
        self.targets[locale.index()].get_or_init(|| {
            let targets: Vec<SearchTarget> = self
                .entries
                .iter()
                .filter_map(|(key, localized)| {
                    let text = localized.get(&locale)?;
                    Some(SearchTarget::new(key, text, self.flavor))
                })
                .collect();
            debug!(
                flavor = %self.flavor,
                locale = %locale,
                targets = targets.len(),
                "built global string search targets"
            );
            targets
        })
    }
}

/// Loads [`StringTable`]s through a [`FetchText`].
pub struct GlobalStringsSource {
    fetcher: Arc<dyn FetchText>,
    url_template: String,
}

impl GlobalStringsSource {
    pub fn new(fetcher: Arc<dyn FetchText>, url_template: impl Into<String>) -> Self {
        Self {
            fetcher,
            url_template: url_template.into(),
        }
    }

    pub fn url(&self, flavor: Flavor, locale: Locale) -> String {
        self.url_template
            .replace("{branch}", flavor.branch())
            .replace("{flavor}", flavor.as_str())
            .replace("{locale}", locale.as_str())
    }

    /// Fetch and parse one locale file.
    pub async fn fetch_locale(
        &self,
        flavor: Flavor,
        locale: Locale,
    ) -> Result<IndexMap<String, String>, CoreError> {
        let url = self.url(flavor, locale);
        let body = self.fetcher.fetch_text(&url).await?;
        let strings = parse_global_strings(&body);
        if strings.is_empty() {
            return Err(CoreError::parse(url, "no string assignments found"));
        }
        Ok(strings)
    }
}

#[async_trait]
impl DatasetSource for GlobalStringsSource {
    type Partition = StringTable;

    fn name(&self) -> &'static str {
        "global strings"
    }

    fn partition_len(partition: &StringTable) -> usize {
        partition.len()
    }

    async fn load(&self, flavor: Flavor) -> Result<StringTable, CoreError> {
        let fetches = Locale::ALL.map(|locale| self.fetch_locale(flavor, locale));
        let per_locale = futures::future::try_join_all(fetches).await?;
        Ok(StringTable::from_locales(
            flavor,
            Locale::ALL.into_iter().zip(per_locale),
        ))
    }
}
