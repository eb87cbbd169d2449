//! Static partition (client flavor) and axis (locale) keys.
//!
//! Both sets are closed and known at compile time. Strings coming from the
//! outside are validated here, once, so everything downstream works with the
//! typed keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// A game client flavor; each flavor is one partition of every dataset.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    #[default]
    Mainline,
    Classic,
    Vanilla,
}

impl Flavor {
    pub const ALL: [Flavor; 3] = [Flavor::Mainline, Flavor::Classic, Flavor::Vanilla];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mainline => "mainline",
            Self::Classic => "classic",
            Self::Vanilla => "vanilla",
        }
    }

    /// Upstream branch name the flavor's resources are published under.
    pub fn branch(self) -> &'static str {
        match self {
            Self::Mainline => "live",
            Self::Classic => "mists",
            Self::Vanilla => "vanilla",
        }
    }

    /// Position in [`Flavor::ALL`].
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Flavor {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainline" | "retail" => Ok(Self::Mainline),
            "classic" | "mists" => Ok(Self::Classic),
            "vanilla" | "classic_era" => Ok(Self::Vanilla),
            _ => Err(CoreError::InvalidKey {
                kind: "flavor",
                value: s.to_owned(),
            }),
        }
    }
}

/// Client locale; the secondary axis of the global strings dataset.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Locale {
    #[default]
    #[serde(rename = "enUS")]
    EnUs,
    #[serde(rename = "deDE")]
    DeDe,
    #[serde(rename = "esES")]
    EsEs,
    #[serde(rename = "esMX")]
    EsMx,
    #[serde(rename = "frFR")]
    FrFr,
    #[serde(rename = "itIT")]
    ItIt,
    #[serde(rename = "koKR")]
    KoKr,
    #[serde(rename = "ptBR")]
    PtBr,
    #[serde(rename = "ruRU")]
    RuRu,
    #[serde(rename = "zhCN")]
    ZhCn,
    #[serde(rename = "zhTW")]
    ZhTw,
}

impl Locale {
    pub const ALL: [Locale; 11] = [
        Locale::EnUs,
        Locale::DeDe,
        Locale::EsEs,
        Locale::EsMx,
        Locale::FrFr,
        Locale::ItIt,
        Locale::KoKr,
        Locale::PtBr,
        Locale::RuRu,
        Locale::ZhCn,
        Locale::ZhTw,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn as_str(self) -> &'static str {
        match self {
            Self::EnUs => "enUS",
            Self::DeDe => "deDE",
            Self::EsEs => "esES",
            Self::EsMx => "esMX",
            Self::FrFr => "frFR",
            Self::ItIt => "itIT",
            Self::KoKr => "koKR",
            Self::PtBr => "ptBR",
            Self::RuRu => "ruRU",
            Self::ZhCn => "zhCN",
            Self::ZhTw => "zhTW",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = CoreError;

    /// Case-insensitive; accepts `enUS`, `enus` and `en_US`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect();
        Self::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| CoreError::InvalidKey {
                kind: "locale",
                value: s.to_owned(),
            })
    }
}
