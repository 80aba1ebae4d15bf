//! Plain-text rendering of rankings, summaries and detail views.

use std::fmt::Display;
use std::io::{self, Write};

use chrono::{DateTime, Utc};

use crate::stats::{AggregateSnapshot, QueryFilter, RankMode, RankedEntry, Ranking, SongKey, Summary, rank};

/// Entity type a listing command ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Track,
    Album,
    Artist,
    Skip,
}

impl Entity {
    /// Singular noun used in totals, e.g. "artist(s)".
    pub fn noun(self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::Album => "album",
            Self::Artist => "artist",
            Self::Skip => "skip",
        }
    }

    /// Song-keyed rankings already name the track, so they omit it from
    /// the "first played" clause.
    fn names_first_track(self) -> bool {
        matches!(self, Self::Album | Self::Artist)
    }
}

/// "H hours M minutes".
pub fn format_duration(ms: u64) -> String {
    let minutes = ms / 60_000;
    format!("{} hours {} minutes", minutes / 60, minutes % 60)
}

/// "7 March, 2023".
pub fn format_date(ts: DateTime<Utc>) -> String {
    ts.format("%-d %B, %Y").to_string()
}

/// Formatted window bounds, or `None` when unbounded. An open side shows "...".
fn window_bounds(filter: &QueryFilter) -> Option<(String, String)> {
    if filter.is_unbounded() {
        return None;
    }
    let default = QueryFilter::default();
    let bound = |ts: DateTime<Utc>, open: bool| {
        if open {
            "...".to_string()
        } else {
            ts.format("%d-%m-%Y").to_string()
        }
    };
    Some((
        bound(filter.start, filter.start == default.start),
        bound(filter.end, filter.end == default.end),
    ))
}

/// Active window as "<start> to <end>", or "all time" when unbounded.
pub fn describe_window(filter: &QueryFilter) -> String {
    match window_bounds(filter) {
        Some((start, end)) => format!("{start} to {end}"),
        None => "all time".to_string(),
    }
}

/// Default title for an exported playlist.
pub fn playlist_name(filter: &QueryFilter) -> String {
    match window_bounds(filter) {
        Some((start, end)) => format!("Top tracks {start} - {end}"),
        None => "Top tracks all time".to_string(),
    }
}

pub fn write_no_plays<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "No plays found.")
}

fn write_entry<W: Write, K: Display>(
    out: &mut W,
    position: usize,
    entry: &RankedEntry<'_, K>,
    name_first_track: bool,
) -> io::Result<()> {
    let first = entry.first_play();
    let first_track = if name_first_track {
        format!(" {}", first.track_name())
    } else {
        String::new()
    };
    writeln!(
        out,
        "{position}. {}, played {} times for {}, first played{first_track} on {}",
        entry.key,
        entry.play_count(),
        format_duration(entry.total_ms()),
        format_date(first.timestamp)
    )
}

/// Totals over the whole filtered set, then the numbered page. Track
/// listings open with the earliest play in the window.
pub fn write_ranking<W: Write, K: Display>(
    out: &mut W,
    ranking: Option<&Ranking<'_, K>>,
    entity: Entity,
) -> io::Result<()> {
    let Some(ranking) = ranking else {
        return write_no_plays(out);
    };

    if entity == Entity::Track {
        if let Some(first) = ranking.first_play() {
            writeln!(
                out,
                "First played {} by {} on {}",
                first.track_name(),
                first.artist_name(),
                format_date(first.timestamp)
            )?;
        }
    }
    writeln!(out, "Total listens: {} track(s)", ranking.total_plays())?;
    writeln!(out, "Total unique listens: {} {}(s)", ranking.unique_keys(), entity.noun())?;
    for (i, entry) in ranking.page().iter().enumerate() {
        write_entry(out, i + 1, entry, entity.names_first_track())?;
    }
    Ok(())
}

/// Rank one entity type of the snapshot and render it.
pub fn write_top<W: Write>(
    out: &mut W,
    snapshot: &AggregateSnapshot,
    entity: Entity,
    mode: RankMode,
    filter: &QueryFilter,
) -> io::Result<()> {
    log::debug!("Ranking {}s by {mode} over {}", entity.noun(), describe_window(filter));
    match entity {
        Entity::Track => write_ranking(out, rank(&snapshot.song_plays, mode, filter, false).as_ref(), entity),
        Entity::Skip => write_ranking(out, rank(&snapshot.skips, mode, filter, false).as_ref(), entity),
        Entity::Artist => write_ranking(out, rank(&snapshot.artist_plays, mode, filter, false).as_ref(), entity),
        Entity::Album => write_ranking(out, rank(&snapshot.album_plays, mode, filter, true).as_ref(), entity),
    }
}

pub fn write_summary<W: Write>(out: &mut W, summary: &Summary, raw_records: usize) -> io::Result<()> {
    writeln!(out, "Total songs played: {}", summary.total_plays)?;
    writeln!(out, "Unique songs: {}", summary.unique_songs)?;
    writeln!(out, "Unique artists: {}", summary.unique_artists)?;
    writeln!(out, "Total time listened: {} hours", summary.total_listened_ms / 3_600_000)?;
    writeln!(out, "Total skips: {}", summary.total_skips)?;
    writeln!(out, "Records read: {raw_records}")
}

/// Header block for an artist or album drill-down.
pub fn write_group_detail<W: Write>(
    out: &mut W,
    name: &str,
    entry: &RankedEntry<'_, String>,
    distinct_tracks: Option<usize>,
) -> io::Result<()> {
    let first = entry.first_play();
    writeln!(out, "{name}")?;
    writeln!(
        out,
        "Total listens: {} for {}",
        entry.play_count(),
        format_duration(entry.total_ms())
    )?;
    if let Some(n) = distinct_tracks {
        writeln!(out, "Distinct tracks: {n}")?;
    }
    writeln!(out, "First played {} on {}", first.track_name(), format_date(first.timestamp))
}

/// Detail block for one song.
pub fn write_track_detail<W: Write>(
    out: &mut W,
    entry: &RankedEntry<'_, SongKey>,
    skips: usize,
) -> io::Result<()> {
    let key = entry.key;
    writeln!(
        out,
        "First played {} by {} on {}",
        key.track,
        key.artist,
        format_date(entry.first_play().timestamp)
    )?;
    if let Some(album) = &key.album {
        writeln!(out, "Album: {album}")?;
    }
    writeln!(
        out,
        "Played {} times for {}",
        entry.play_count(),
        format_duration(entry.total_ms())
    )?;
    writeln!(out, "Skipped {skips} times")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::PlayEvent;
    use crate::stats::{Bucket, Policy, aggregate};
    use chrono::TimeZone;

    fn make_play(artist: &str, track: &str, album: &str, day: u32, ms: u64) -> PlayEvent {
        PlayEvent {
            timestamp: Utc.with_ymd_and_hms(2023, 3, day, 20, 0, 0).unwrap(),
            artist: Some(artist.into()),
            track: Some(track.into()),
            album: Some(album.into()),
            track_uri: None,
            ms_played: ms,
            skipped: false,
        }
    }

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0 hours 0 minutes");
        assert_eq!(format_duration(200_000), "0 hours 3 minutes");
        assert_eq!(format_duration(3_600_000 * 2 + 60_000 * 5 + 59_999), "2 hours 5 minutes");
    }

    #[test]
    fn test_format_date() {
        let ts = Utc.with_ymd_and_hms(2023, 3, 7, 9, 0, 0).unwrap();
        assert_eq!(format_date(ts), "7 March, 2023");
    }

    #[test]
    fn test_artist_ranking_lines() {
        let snap = aggregate(
            vec![
                make_play("Radiohead", "Creep", "Pablo Honey", 1, 240_000),
                make_play("Radiohead", "Karma Police", "OK Computer", 2, 260_000),
                make_play("Portishead", "Roads", "Dummy", 3, 300_000),
            ],
            &Policy::default(),
        );
        let text = render(|out| {
            write_top(out, &snap, Entity::Artist, RankMode::Time, &QueryFilter::default())
        });
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Total listens: 3 track(s)");
        assert_eq!(lines[1], "Total unique listens: 2 artist(s)");
        assert_eq!(
            lines[2],
            "1. Radiohead, played 2 times for 0 hours 8 minutes, first played Creep on 1 March, 2023"
        );
        assert!(lines[3].starts_with("2. Portishead, played 1 times"));
    }

    #[test]
    fn test_track_ranking_omits_first_track() {
        let snap = aggregate(
            vec![
                make_play("Portishead", "Roads", "Dummy", 2, 300_000),
                make_play("Radiohead", "Creep", "Pablo Honey", 1, 240_000),
                make_play("Radiohead", "Creep", "Pablo Honey", 3, 240_000),
            ],
            &Policy::default(),
        );
        let text = render(|out| {
            write_top(out, &snap, Entity::Track, RankMode::Plays, &QueryFilter::default())
        });
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "First played Creep by Radiohead on 1 March, 2023");
        assert_eq!(lines[1], "Total listens: 3 track(s)");
        assert_eq!(
            lines[3],
            "1. Creep by Radiohead, played 2 times for 0 hours 8 minutes, first played on 1 March, 2023"
        );
    }

    #[test]
    fn test_only_track_listing_has_first_played_header() {
        let snap = aggregate(
            vec![make_play("Radiohead", "Creep", "Pablo Honey", 1, 240_000)],
            &Policy::default(),
        );
        for entity in [Entity::Artist, Entity::Album, Entity::Skip] {
            let text = render(|out| write_top(out, &snap, entity, RankMode::Plays, &QueryFilter::default()));
            assert!(!text.starts_with("First played"), "{entity:?}: {text}");
        }
    }

    #[test]
    fn test_empty_ranking() {
        let empty: Bucket<String> = Bucket::new();
        let ranking = rank(&empty, RankMode::Plays, &QueryFilter::default(), false);
        let text = render(|out| write_ranking(out, ranking.as_ref(), Entity::Artist));
        assert_eq!(text, "No plays found.\n");
    }

    #[test]
    fn test_describe_window() {
        let mut filter = QueryFilter::default();
        assert_eq!(describe_window(&filter), "all time");
        let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        filter.set_window(start, None).unwrap();
        assert_eq!(describe_window(&filter), "01-01-2023 to ...");

        let end = Utc.with_ymd_and_hms(2023, 6, 30, 23, 59, 59).unwrap();
        filter.set_window(start, Some(end)).unwrap();
        assert_eq!(playlist_name(&filter), "Top tracks 01-01-2023 - 30-06-2023");
        filter.clear_window();
        assert_eq!(playlist_name(&filter), "Top tracks all time");
    }

    #[test]
    fn test_summary() {
        let summary = Summary {
            total_plays: 12,
            unique_songs: 5,
            unique_artists: 2,
            total_listened_ms: 3_600_000 * 3 + 1,
            total_skips: 4,
        };
        let text = render(|out| write_summary(out, &summary, 20));
        assert!(text.contains("Total songs played: 12\n"));
        assert!(text.contains("Total time listened: 3 hours\n"));
        assert!(text.contains("Records read: 20\n"));
    }
}
