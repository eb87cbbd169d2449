//! Identifier normalization for approximate matching.
//!
//! Turns dotted, namespaced, camelCase or SHOUTY_SNAKE identifiers into a
//! lowercase, space-tokenized string:
//!
//! ```
//! use wowdex::search::normalize;
//!
//! assert_eq!(
//!     normalize("C_QuestLog.IsQuestFlaggedCompleted"),
//!     "c_questlog is quest flagged completed"
//! );
//! assert_eq!(normalize("ERR_QUEST_FAILED_TOO_MANY"), "err quest failed too many");
//! ```

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Default number of distinct identifiers kept by a [`Normalizer`].
pub const DEFAULT_MEMO_CAPACITY: usize = 16 * 1024;

/// Normalize an identifier.
///
/// The namespace (everything before the first `.`) is kept verbatim apart
/// from lowercasing. In the remainder, a space is inserted before every
/// maximal run of uppercase letters, so acronyms stay in one piece, and
/// `.`/`_` become spaces. Whitespace is then collapsed and the result
/// lowercased.
pub fn normalize(identifier: &str) -> String {
    let (namespace, remainder) = match identifier.split_once('.') {
        Some((ns, rest)) => (Some(ns.trim()), rest),
        None => (None, identifier),
    };

    let mut spaced = String::with_capacity(remainder.len() + 8);
    let mut prev_upper = false;
    for ch in remainder.chars() {
        let upper = ch.is_uppercase();
        if upper && !prev_upper {
            spaced.push(' ');
        }
        prev_upper = upper;
        match ch {
            '.' | '_' => spaced.push(' '),
            _ => spaced.push(ch),
        }
    }

    let body = collapse_whitespace(&spaced).to_lowercase();
    match namespace {
        Some(ns) if !ns.is_empty() => {
            let ns = ns.to_lowercase();
            if body.is_empty() {
                ns
            } else {
                format!("{ns} {body}")
            }
        }
        _ => body,
    }
}

/// Collapse runs of whitespace into single spaces and trim.
fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Bounded memo table in front of [`normalize`].
///
/// Query terms recur across requests, so results are kept as shared
/// `Arc<str>`. Search targets are normalized once per dataset load and
/// bypass the memo.
pub struct Normalizer {
    memo: Mutex<LruCache<String, Arc<str>>>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_MEMO_CAPACITY)
    }
}

impl Normalizer {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            memo: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn normalize(&self, identifier: &str) -> Arc<str> {
        if let Some(hit) = self.memo.lock().get(identifier) {
            return hit.clone();
        }
        // Computed outside the lock; a racing duplicate insert is harmless.
        let normalized: Arc<str> = Arc::from(normalize(identifier));
        self.memo
            .lock()
            .put(identifier.to_owned(), normalized.clone());
        normalized
    }

    pub fn len(&self) -> usize {
        self.memo.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
