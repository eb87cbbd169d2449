//! Approximate string ranking via Smith-Waterman local alignment.
//!
//! Each candidate text is aligned against the query; the best local alignment
//! score is divided by the score a perfect match of the whole query would
//! get, giving a similarity in `[0, 1]` where `1.0` means the query occurs
//! verbatim (case-insensitively) somewhere in the text.

const SCORE_MATCH: i32 = 2;
const PENALTY_MISMATCH: i32 = 1;
const PENALTY_GAP: i32 = 1;

/// Similarity of `query` to the best-matching region of `text`, in `[0, 1]`.
///
/// Comparison is case-insensitive. An empty query scores `0.0`.
pub fn similarity(query: &str, text: &str) -> f64 {
    let query: Vec<char> = query.chars().flat_map(char::to_lowercase).collect();
    if query.is_empty() {
        return 0.0;
    }
    let text: Vec<char> = text.chars().flat_map(char::to_lowercase).collect();
    if text.is_empty() {
        return 0.0;
    }

    let best = local_alignment(&query, &text);
    let max = SCORE_MATCH * query.len() as i32;
    (f64::from(best) / f64::from(max)).clamp(0.0, 1.0)
}

/// Best Smith-Waterman score of `query` against any region of `text`.
///
/// Two rolling rows over `text`; `O(|query| * |text|)` time.
fn local_alignment(query: &[char], text: &[char]) -> i32 {
    let n = text.len();
    let mut prev = vec![0i32; n + 1];
    let mut curr = vec![0i32; n + 1];
    let mut best = 0;

    for &q in query {
        curr[0] = 0;
        for j in 1..=n {
            let diagonal = if text[j - 1] == q {
                prev[j - 1] + SCORE_MATCH
            } else {
                prev[j - 1] - PENALTY_MISMATCH
            };
            let up = prev[j] - PENALTY_GAP;
            let left = curr[j - 1] - PENALTY_GAP;
            let cell = diagonal.max(up).max(left).max(0);
            curr[j] = cell;
            best = best.max(cell);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    best
}

/// Rank `corpus` entries against `query`, best first.
///
/// Entries scoring at or below `threshold` are dropped. Ties keep corpus
/// order. `limit == 0` means no limit.
pub fn rank<'a, I>(query: &str, corpus: I, threshold: f64, limit: usize) -> Vec<&'a str>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut scored: Vec<(&'a str, f64)> = corpus
        .into_iter()
        .filter_map(|(key, text)| {
            let score = similarity(query, text);
            (score > threshold).then_some((key, score))
        })
        .collect();

    // `sort_by` is stable, so equal scores stay in corpus order.
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    if limit > 0 {
        scored.truncate(limit);
    }
    scored.into_iter().map(|(key, _)| key).collect()
}
