//! Multi-term queries: split, rank each term, interleave.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use super::normalize::Normalizer;
use super::rank::rank;

/// Hard cap on merged results, independent of the per-term limit.
pub const MAX_RESULTS: usize = 100;

static TERM_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s|\-]+").expect("term separator regex is valid"));

/// Split a raw query into sub-queries on whitespace, `|` and `-`.
pub fn split_terms(raw: &str) -> Vec<&str> {
    TERM_SEPARATOR
        .split(raw.trim())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Round-robin interleave of ranked lists, dropping keys already emitted.
///
/// Position 0 of every list is visited (in list order), then position 1,
/// and so on until the longest list is exhausted.
pub fn interleave<'a>(lists: &[Vec<&'a str>]) -> Vec<&'a str> {
    let longest = lists.iter().map(Vec::len).max().unwrap_or(0);
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for position in 0..longest {
        for list in lists {
            if let Some(&key) = list.get(position)
                && seen.insert(key)
            {
                merged.push(key);
            }
        }
    }

    merged
}

/// Rank `corpus` against every term of `raw_query` and merge the results.
///
/// Terms are normalized with the same rules the corpus text was built with.
/// `limit` applies per term; the merged list is capped at [`MAX_RESULTS`].
pub fn search<'a>(
    normalizer: &Normalizer,
    raw_query: &str,
    corpus: &[(&'a str, &'a str)],
    threshold: f64,
    limit: usize,
) -> Vec<&'a str> {
    let lists: Vec<Vec<&'a str>> = split_terms(raw_query)
        .into_iter()
        .map(|term| {
            let term = normalizer.normalize(term);
            rank(&term, corpus.iter().copied(), threshold, limit)
        })
        .collect();

    let mut merged = interleave(&lists);
    merged.truncate(MAX_RESULTS);
    merged
}
