use std::collections::HashSet;

use crate::history::PlayEvent;

/// Plays longer than this count as a full listen, whatever the skip flag says.
pub const FULL_LISTEN_MS: u64 = 30_000;

/// Which bucket a play event falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// No artist/track metadata, or an ignored artist.
    Discard,
    /// Short play explicitly flagged as skipped.
    Skip,
    FullListen,
    /// Short play that was not flagged as skipped. Counted nowhere.
    Dropped,
}

/// Classify one event.
///
/// Checks run in a fixed order: discard rules first, then duration, then the
/// skip flag. A long play marked as skipped is still a full listen.
pub fn classify(event: &PlayEvent, ignore: &HashSet<String>) -> Classification {
    let artist = match (&event.artist, &event.track) {
        (Some(artist), Some(_)) => artist,
        _ => return Classification::Discard,
    };
    if ignore.contains(artist) {
        return Classification::Discard;
    }

    if event.ms_played > FULL_LISTEN_MS {
        Classification::FullListen
    } else if event.skipped {
        Classification::Skip
    } else {
        Classification::Dropped
    }
}
