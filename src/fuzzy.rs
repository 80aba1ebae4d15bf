//! Approximate name matching used to turn typed queries into snapshot keys.
//!
//! Scores are on a 0-100 scale. Each entity type uses a different measure:
//! artists by whole-string closeness, tracks by best substring window (short
//! queries match long titles), albums by a blend that also forgives
//! reordered words.

use std::collections::{BTreeSet, HashSet};

use strsim::normalized_levenshtein;

use crate::stats::SongKey;

/// Minimum whole-string score for an artist match.
pub const ARTIST_THRESHOLD: f64 = 50.0;

/// Minimum substring score for a track to be offered.
pub const TRACK_THRESHOLD: f64 = 80.0;

/// At most this many track candidates are offered for disambiguation.
pub const MAX_TRACK_CANDIDATES: usize = 5;

/// (partial, token set, weighted) weights for album scoring.
const ALBUM_WEIGHTS: (f64, f64, f64) = (0.4, 0.4, 0.2);

fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn raw_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 100.0;
    }
    normalized_levenshtein(a, b) * 100.0
}

/// Whole-string similarity, case-insensitive.
pub fn ratio(a: &str, b: &str) -> f64 {
    raw_ratio(&normalize(a), &normalize(b))
}

/// Best similarity between the shorter string and any equally long window of
/// the longer one.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let (a, b) = (normalize(a), normalize(b));
    let (short, long) = if char_len(&a) <= char_len(&b) { (a, b) } else { (b, a) };

    let n = char_len(&short);
    if n == 0 {
        return if long.is_empty() { 100.0 } else { 0.0 };
    }

    let long_chars: Vec<char> = long.chars().collect();
    if long_chars.len() == n {
        return raw_ratio(&short, &long);
    }

    let mut best = 0.0_f64;
    for window in long_chars.windows(n) {
        let candidate: String = window.iter().collect();
        best = best.max(raw_ratio(&short, &candidate));
        if best >= 100.0 {
            break;
        }
    }
    best
}

fn tokens(s: &str) -> BTreeSet<String> {
    normalize(s).split(' ').filter(|t| !t.is_empty()).map(String::from).collect()
}

/// Word-order-insensitive similarity: whole-string score with sorted tokens.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    let sorted = |s: &str| {
        let n = normalize(s);
        let mut words: Vec<&str> = n.split(' ').collect();
        words.sort_unstable();
        words.join(" ")
    };
    raw_ratio(&sorted(a), &sorted(b))
}

/// Similarity over shared and leftover words. A query whose words are all
/// contained in the candidate scores 100.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let (ta, tb) = (tokens(a), tokens(b));
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }

    let common: Vec<&str> = ta.intersection(&tb).map(String::as_str).collect();
    let only_a: Vec<&str> = ta.difference(&tb).map(String::as_str).collect();
    let only_b: Vec<&str> = tb.difference(&ta).map(String::as_str).collect();

    if !common.is_empty() && (only_a.is_empty() || only_b.is_empty()) {
        return 100.0;
    }

    let base = common.join(" ");
    let with = |rest: &[&str]| {
        if base.is_empty() {
            rest.join(" ")
        } else {
            format!("{base} {}", rest.join(" "))
        }
    };
    let (joined_a, joined_b) = (with(&only_a), with(&only_b));

    raw_ratio(&base, &joined_a)
        .max(raw_ratio(&base, &joined_b))
        .max(raw_ratio(&joined_a, &joined_b))
}

/// General-purpose score: whole-string ratio, falling back to scaled-down
/// partial and token scores depending on how different the lengths are.
pub fn weighted_ratio(a: &str, b: &str) -> f64 {
    let (la, lb) = (char_len(&normalize(a)), char_len(&normalize(b)));
    if la == 0 || lb == 0 {
        return 0.0;
    }

    let base = ratio(a, b);
    let len_ratio = la.max(lb) as f64 / la.min(lb) as f64;

    if len_ratio < 1.5 {
        return base
            .max(token_sort_ratio(a, b) * 0.95)
            .max(token_set_ratio(a, b) * 0.95);
    }

    let scale = if len_ratio < 8.0 { 0.9 } else { 0.6 };
    base.max(partial_ratio(a, b) * scale)
        .max(token_set_ratio(a, b) * 0.95 * scale)
}

/// Blend used for album titles.
pub fn album_score(query: &str, candidate: &str) -> f64 {
    let (wp, wt, ww) = ALBUM_WEIGHTS;
    wp * partial_ratio(query, candidate) + wt * token_set_ratio(query, candidate) + ww * weighted_ratio(query, candidate)
}

/// Highest-scoring candidate. Ties go to the earliest candidate.
fn best_by<'a>(candidates: impl IntoIterator<Item = &'a str>, score: impl Fn(&str) -> f64) -> Option<(&'a str, f64)> {
    let mut best: Option<(&'a str, f64)> = None;
    for cand in candidates {
        let s = score(cand);
        if best.is_none_or(|(_, b)| s > b) {
            best = Some((cand, s));
        }
    }
    best
}

/// Resolve a typed artist name. `None` if nothing reaches [`ARTIST_THRESHOLD`].
pub fn resolve_artist<'a>(query: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let (name, score) = best_by(candidates, |c| ratio(query, c))?;
    log::debug!("Best artist match for {query:?}: {name:?} ({score:.1})");
    (score >= ARTIST_THRESHOLD).then_some(name)
}

/// Resolve a typed album title. Always the best candidate when there is one.
pub fn resolve_album<'a>(query: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let (name, score) = best_by(candidates, |c| album_score(query, c))?;
    log::debug!("Best album match for {query:?}: {name:?} ({score:.1})");
    Some(name)
}

/// Outcome of [`resolve_track`].
#[derive(Debug, Clone, PartialEq)]
pub enum TrackMatch<'a> {
    ArtistNotFound,
    /// The artist resolved but none of their tracks is close enough.
    TrackNotFound { artist: &'a str },
    Unique(&'a SongKey),
    /// Best first, at most [`MAX_TRACK_CANDIDATES`]; the caller has to pick.
    Ambiguous(Vec<(&'a SongKey, f64)>),
}

/// Resolve a typed track title and artist against known song keys.
pub fn resolve_track<'a>(
    track_query: &str,
    artist_query: &str,
    candidates: impl IntoIterator<Item = &'a SongKey>,
) -> TrackMatch<'a> {
    let keys: Vec<&'a SongKey> = candidates.into_iter().collect();

    let mut seen = HashSet::new();
    let artists = keys
        .iter()
        .map(|&k| k.artist.as_str())
        .filter(|a| seen.insert(*a));

    let Some(artist) = resolve_artist(artist_query, artists) else {
        return TrackMatch::ArtistNotFound;
    };

    let mut scored: Vec<(&'a SongKey, f64)> = keys
        .into_iter()
        .filter(|k| k.artist == artist)
        .map(|k| (k, partial_ratio(track_query, &k.track)))
        .filter(|(_, s)| *s >= TRACK_THRESHOLD)
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(MAX_TRACK_CANDIDATES);

    match scored.len() {
        0 => TrackMatch::TrackNotFound { artist },
        1 => TrackMatch::Unique(scored[0].0),
        _ => TrackMatch::Ambiguous(scored),
    }
}
