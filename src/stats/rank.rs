use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::bucket::Bucket;
use crate::dates::DateError;
use crate::history::PlayEvent;

/// Metric used to order entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankMode {
    /// Number of plays in the window.
    Plays,
    /// Total milliseconds played in the window.
    Time,
}

/// A ranking mode name that is neither `plays` nor `time`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown ranking mode '{0}' (expected plays or time)")]
pub struct UnknownRankMode(pub String);

impl FromStr for RankMode {
    type Err = UnknownRankMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "plays" | "count" => Ok(Self::Plays),
            "time" | "duration" => Ok(Self::Time),
            other => Err(UnknownRankMode(other.to_string())),
        }
    }
}

impl fmt::Display for RankMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plays => write!(f, "plays"),
            Self::Time => write!(f, "time"),
        }
    }
}

/// Session-scoped query settings consulted by every ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFilter {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub result_limit: usize,
    /// Albums with fewer distinct tracks than this in the window are hidden.
    pub album_min_distinct_tracks: usize,
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self {
            start: DateTime::<Utc>::MIN_UTC,
            end: DateTime::<Utc>::MAX_UTC,
            result_limit: 10,
            album_min_distinct_tracks: 3,
        }
    }
}

impl QueryFilter {
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts <= self.end
    }

    /// Replace the window. `end = None` keeps the current end bound.
    ///
    /// Either both bounds change or neither does.
    pub fn set_window(&mut self, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Result<(), DateError> {
        let end = end.unwrap_or(self.end);
        if end < start {
            return Err(DateError::EndBeforeStart { start, end });
        }
        self.start = start;
        self.end = end;
        Ok(())
    }

    pub fn clear_window(&mut self) {
        self.start = DateTime::<Utc>::MIN_UTC;
        self.end = DateTime::<Utc>::MAX_UTC;
    }

    pub fn is_unbounded(&self) -> bool {
        self.start == DateTime::<Utc>::MIN_UTC && self.end == DateTime::<Utc>::MAX_UTC
    }
}

/// One key that survived filtering, with its in-window plays.
#[derive(Debug, Clone)]
pub struct RankedEntry<'a, K> {
    pub key: &'a K,
    pub plays: Vec<&'a PlayEvent>,
    first_play: &'a PlayEvent,
}

impl<'a, K> RankedEntry<'a, K> {
    pub fn play_count(&self) -> usize {
        self.plays.len()
    }

    pub fn total_ms(&self) -> u64 {
        self.plays.iter().map(|p| p.ms_played).sum()
    }

    /// Earliest in-window play. Ties go to the one inserted first.
    pub fn first_play(&self) -> &'a PlayEvent {
        self.first_play
    }

    /// Most recent in-window play carrying a track URI.
    pub fn latest_uri(&self) -> Option<&'a str> {
        self.plays
            .iter()
            .filter_map(|p| p.track_uri.as_deref().map(|uri| (p.timestamp, uri)))
            .max_by_key(|(ts, _)| *ts)
            .map(|(_, uri)| uri)
    }

    fn score(&self, mode: RankMode) -> u64 {
        match mode {
            RankMode::Plays => self.play_count() as u64,
            RankMode::Time => self.total_ms(),
        }
    }
}

/// Ordered result of [`rank`]. Holds the whole filtered set; [`Ranking::page`]
/// is what gets displayed.
#[derive(Debug, Clone)]
pub struct Ranking<'a, K> {
    pub mode: RankMode,
    pub entries: Vec<RankedEntry<'a, K>>,
    limit: usize,
}

impl<'a, K> Ranking<'a, K> {
    /// The top `result_limit` entries.
    pub fn page(&self) -> &[RankedEntry<'a, K>] {
        &self.entries[..self.limit.min(self.entries.len())]
    }

    /// Plays across every surviving key, not just the page.
    pub fn total_plays(&self) -> usize {
        self.entries.iter().map(|e| e.play_count()).sum()
    }

    pub fn unique_keys(&self) -> usize {
        self.entries.len()
    }

    /// Earliest play across every surviving key.
    pub fn first_play(&self) -> Option<&'a PlayEvent> {
        self.entries
            .iter()
            .map(|e| e.first_play())
            .min_by_key(|p| p.timestamp)
    }
}

/// Filter a bucket by the query window (and album threshold), then order it.
///
/// Sorting is stable, so keys with equal scores keep the bucket's
/// first-seen order. Returns `None` when no key has a play in the window.
pub fn rank<'a, K: Eq + Hash + Clone>(
    bucket: &'a Bucket<K>,
    mode: RankMode,
    filter: &QueryFilter,
    is_album: bool,
) -> Option<Ranking<'a, K>> {
    let mut entries: Vec<RankedEntry<'a, K>> = bucket
        .iter()
        .filter_map(|(key, events)| {
            let plays: Vec<&PlayEvent> = events.iter().filter(|e| filter.contains(e.timestamp)).collect();
            let first_play = plays.iter().copied().min_by_key(|p| p.timestamp)?;
            Some(RankedEntry { key, plays, first_play })
        })
        .collect();

    if is_album {
        entries.retain(|e| distinct_tracks(&e.plays) >= filter.album_min_distinct_tracks);
    }

    if entries.is_empty() {
        return None;
    }

    entries.sort_by(|a, b| b.score(mode).cmp(&a.score(mode)));

    Some(Ranking {
        mode,
        entries,
        limit: filter.result_limit,
    })
}

/// Number of distinct track names among `plays`.
pub fn distinct_tracks(plays: &[&PlayEvent]) -> usize {
    plays.iter().map(|p| p.track_name()).collect::<HashSet<_>>().len()
}
