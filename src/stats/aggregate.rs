use std::collections::HashSet;

use super::bucket::Bucket;
use super::classify::{Classification, classify};
use super::identity::{self, AlbumKey, ArtistKey, SongKey};
use crate::history::PlayEvent;

/// Identity rules applied while aggregating.
#[derive(Debug, Clone, Default)]
pub struct Policy {
    /// Track names that need an album-qualified [`SongKey`].
    pub duplicates: HashSet<String>,
    /// Artists excluded from every bucket and from the total.
    pub ignore: HashSet<String>,
}

/// Result of one ingestion pass. Built once, then only read.
#[derive(Debug, Clone, Default)]
pub struct AggregateSnapshot {
    pub song_plays: Bucket<SongKey>,
    pub artist_plays: Bucket<ArtistKey>,
    pub album_plays: Bucket<AlbumKey>,
    pub skips: Bucket<SongKey>,
    /// Sum of `ms_played` over full listens only.
    pub total_listened_ms: u64,
    pub discarded: usize,
    pub dropped: usize,
}

/// Headline numbers over the whole snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub total_plays: usize,
    pub unique_songs: usize,
    pub unique_artists: usize,
    pub total_listened_ms: u64,
    pub total_skips: usize,
}

/// Fold events into a snapshot in a single forward pass.
pub fn aggregate(events: impl IntoIterator<Item = PlayEvent>, policy: &Policy) -> AggregateSnapshot {
    let mut snap = AggregateSnapshot::default();

    for event in events {
        let class = classify(&event, &policy.ignore);
        log::trace!("{:?} {:?} -> {class:?}", event.track, event.artist);

        let key = match class {
            Classification::Discard => {
                snap.discarded += 1;
                continue;
            }
            Classification::Dropped => {
                snap.dropped += 1;
                continue;
            }
            Classification::Skip | Classification::FullListen => identity::resolve(
                event.track_name(),
                event.artist_name(),
                event.album.as_deref(),
                &policy.duplicates,
            ),
        };

        if class == Classification::Skip {
            snap.skips.push(key, event);
            continue;
        }

        snap.total_listened_ms += event.ms_played;
        snap.artist_plays.push(event.artist_name().to_string(), event.clone());
        snap.album_plays.push(event.album_name().to_string(), event.clone());
        snap.song_plays.push(key, event);
    }

    log::info!(
        "Aggregated {} plays of {} songs, {} skips ({} discarded, {} dropped)",
        snap.song_plays.total_events(),
        snap.song_plays.len(),
        snap.skips.total_events(),
        snap.discarded,
        snap.dropped
    );

    snap
}

impl AggregateSnapshot {
    pub fn summary(&self) -> Summary {
        Summary {
            total_plays: self.song_plays.total_events(),
            unique_songs: self.song_plays.len(),
            unique_artists: self.artist_plays.len(),
            total_listened_ms: self.total_listened_ms,
            total_skips: self.skips.total_events(),
        }
    }

    /// Full-listen song buckets restricted to one artist.
    pub fn songs_by_artist(&self, artist: &str) -> Bucket<SongKey> {
        self.song_plays.retain_keys(|k| k.artist == artist)
    }

    /// Full-listen song buckets whose plays came from one album.
    ///
    /// Album keys are not artist-qualified, so this can mix artists.
    pub fn songs_on_album(&self, album: &str) -> Bucket<SongKey> {
        let mut out = Bucket::new();
        for (key, events) in self.song_plays.iter() {
            for event in events.iter().filter(|e| e.album_name() == album) {
                out.push(key.clone(), event.clone());
            }
        }
        out
    }
}
