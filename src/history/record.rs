use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One element of a streaming-history export, exactly as it appears on disk.
/// Every field is optional here; [`normalize`] decides what is usable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    pub ts: Option<String>,
    pub master_metadata_track_name: Option<String>,
    pub master_metadata_album_artist_name: Option<String>,
    pub master_metadata_album_album_name: Option<String>,
    pub spotify_track_uri: Option<String>,
    pub ms_played: Option<u64>,
    pub skipped: Option<bool>,
}

/// A validated play event.
///
/// `artist` and `track` stay optional: a record without them is still a
/// well-formed event, it is the classifier that throws it away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayEvent {
    pub timestamp: DateTime<Utc>,
    pub artist: Option<String>,
    pub track: Option<String>,
    pub album: Option<String>,
    pub track_uri: Option<String>,
    pub ms_played: u64,
    pub skipped: bool,
}

impl PlayEvent {
    /// Track name, or "" for events the classifier would discard.
    pub fn track_name(&self) -> &str {
        self.track.as_deref().unwrap_or_default()
    }

    pub fn artist_name(&self) -> &str {
        self.artist.as_deref().unwrap_or_default()
    }

    pub fn album_name(&self) -> &str {
        self.album.as_deref().unwrap_or_default()
    }
}

/// Turn a raw export record into a [`PlayEvent`].
///
/// Returns `None` when the timestamp is missing or unparseable or when
/// `ms_played` is absent. A null `skipped` flag counts as "not skipped".
pub fn normalize(raw: RawRecord) -> Option<PlayEvent> {
    let ts = raw.ts.as_deref()?;
    let timestamp = match DateTime::parse_from_rfc3339(ts) {
        Ok(t) => t.with_timezone(&Utc),
        Err(e) => {
            log::trace!("Dropping record with bad timestamp {ts:?}: {e}");
            return None;
        }
    };
    let ms_played = raw.ms_played?;

    Some(PlayEvent {
        timestamp,
        artist: raw.master_metadata_album_artist_name,
        track: raw.master_metadata_track_name,
        album: raw.master_metadata_album_album_name,
        track_uri: raw.spotify_track_uri,
        ms_played,
        skipped: raw.skipped.unwrap_or(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_raw_record_deserialize() {
        let json = r#"{
            "ts": "2023-04-09T18:22:01Z",
            "master_metadata_track_name": "Somebody Else",
            "master_metadata_album_artist_name": "The 1975",
            "master_metadata_album_album_name": "I like it when you sleep",
            "spotify_track_uri": "spotify:track:5hc71nKsUgtwQ3z52KEKQk",
            "ms_played": 347000,
            "skipped": false,
            "platform": "ios"
        }"#;
        let raw: RawRecord = serde_json::from_str(json).unwrap();
        let event = normalize(raw).unwrap();
        assert_eq!(event.track_name(), "Somebody Else");
        assert_eq!(event.artist_name(), "The 1975");
        assert_eq!(event.ms_played, 347_000);
        assert!(!event.skipped);
        assert_eq!(
            event.timestamp,
            Utc.with_ymd_and_hms(2023, 4, 9, 18, 22, 1).unwrap()
        );
    }

    #[test]
    fn test_null_metadata_is_kept_for_classifier() {
        let json = r#"{"ts": "2023-04-09T18:22:01Z", "master_metadata_track_name": null,
            "master_metadata_album_artist_name": null, "ms_played": 1000, "skipped": null}"#;
        let raw: RawRecord = serde_json::from_str(json).unwrap();
        let event = normalize(raw).unwrap();
        assert!(event.track.is_none());
        assert!(event.artist.is_none());
        assert!(!event.skipped);
    }

    #[test]
    fn test_missing_timestamp_is_malformed() {
        let raw = RawRecord {
            ms_played: Some(40_000),
            ..Default::default()
        };
        assert!(normalize(raw).is_none());
    }

    #[test]
    fn test_bad_timestamp_is_malformed() {
        let raw = RawRecord {
            ts: Some("yesterday".into()),
            ms_played: Some(40_000),
            ..Default::default()
        };
        assert!(normalize(raw).is_none());
    }

    #[test]
    fn test_missing_ms_played_is_malformed() {
        let raw = RawRecord {
            ts: Some("2023-04-09T18:22:01Z".into()),
            ..Default::default()
        };
        assert!(normalize(raw).is_none());
    }
}
