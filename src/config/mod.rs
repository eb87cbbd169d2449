//! Application configuration, read from the environment via figment.
//!
//! Every key is optional. Durations accept either bare seconds (`90`) or a
//! unit-suffixed string (`90s`, `15m`, `6h`, `1h 30m`).

use anyhow::{Context, bail};
use figment::{Figment, providers::Env};
use fundu::{DurationParser, TimeUnit};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

use crate::data::{api_index, global_strings};
use crate::wiki;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base level for this crate's logs; other crates stay at `warn`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// How long to wait for background tasks after a shutdown signal.
    #[serde(
        default = "default_shutdown_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub shutdown_timeout: Duration,

    /// Interval between dataset refreshes once populated.
    #[serde(
        default = "default_refresh_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub refresh_interval: Duration,
    /// Retry interval while a dataset has never been populated.
    #[serde(
        default = "default_init_retry_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub init_retry_interval: Duration,

    /// Overall deadline for one upstream fetch, retries included.
    #[serde(
        default = "default_fetch_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub fetch_timeout: Duration,
    #[serde(
        default = "default_fetch_retry_delay",
        deserialize_with = "deserialize_duration"
    )]
    pub fetch_retry_delay: Duration,

    /// `{branch}`, `{flavor}` and `{locale}` are substituted per file.
    #[serde(default = "default_strings_url_template")]
    pub strings_url_template: String,
    /// `{branch}` and `{flavor}` are substituted per flavor.
    #[serde(default = "default_api_url_template")]
    pub api_url_template: String,
    #[serde(default = "default_wiki_base_url")]
    pub wiki_base_url: String,

    #[serde(default = "default_page_cache_capacity")]
    pub page_cache_capacity: usize,
    #[serde(
        default = "default_page_cache_ttl",
        deserialize_with = "deserialize_duration"
    )]
    pub page_cache_ttl: Duration,
}

impl Config {
    /// Read the configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_figment(Figment::new().merge(Env::raw()))
    }

    pub fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let config: Self = figment.extract().context("Failed to load config")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject intervals that would spin a loop without ever sleeping.
    fn validate(&self) -> anyhow::Result<()> {
        let intervals = [
            ("REFRESH_INTERVAL", self.refresh_interval),
            ("INIT_RETRY_INTERVAL", self.init_retry_interval),
            ("FETCH_TIMEOUT", self.fetch_timeout),
            ("FETCH_RETRY_DELAY", self.fetch_retry_delay),
        ];
        for (name, value) in intervals {
            if value.is_zero() {
                bail!("{name} must be greater than zero");
            }
        }
        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(8)
}

fn default_refresh_interval() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_init_retry_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_fetch_retry_delay() -> Duration {
    Duration::from_secs(3)
}

fn default_strings_url_template() -> String {
    global_strings::DEFAULT_URL_TEMPLATE.to_string()
}

fn default_api_url_template() -> String {
    api_index::DEFAULT_URL_TEMPLATE.to_string()
}

fn default_wiki_base_url() -> String {
    wiki::DEFAULT_BASE_URL.to_string()
}

fn default_page_cache_capacity() -> usize {
    256
}

fn default_page_cache_ttl() -> Duration {
    Duration::from_secs(60 * 60)
}

const DURATION_PARSER: DurationParser<'static> = DurationParser::builder()
    .time_units(&[
        TimeUnit::MilliSecond,
        TimeUnit::Second,
        TimeUnit::Minute,
        TimeUnit::Hour,
        TimeUnit::Day,
    ])
    .parse_multiple(None)
    .allow_time_unit_delimiter()
    .disable_infinity()
    .disable_fraction()
    .disable_exponent()
    .default_unit(TimeUnit::Second)
    .build();

/// Parse a duration string such as `30`, `90s`, `15m` or `1h 30m`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let parsed = DURATION_PARSER
        .parse(s.trim())
        .map_err(|e| format!("invalid duration '{s}': {e}"))?;
    Duration::try_from(parsed).map_err(|e| format!("invalid duration '{s}': {e}"))
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct DurationVisitor;

    impl Visitor<'_> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a duration string or a number of seconds")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Duration, E> {
            parse_duration(value).map_err(E::custom)
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Duration, E> {
            Ok(Duration::from_secs(value))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Duration, E> {
            u64::try_from(value)
                .map(Duration::from_secs)
                .map_err(|_| E::custom(format!("duration cannot be negative: {value}")))
        }
    }

    deserializer.deserialize_any(DurationVisitor)
}
