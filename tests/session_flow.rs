//! End-to-end runs: history files on disk, through aggregation, into a
//! scripted session with a fake music service.

use std::cell::RefCell;
use std::fs;
use std::io::Cursor;

use playtally::config::AppConfig;
use playtally::history::load_history;
use playtally::session::Session;
use playtally::spotify::{MusicService, ServiceError};
use playtally::stats::{AggregateSnapshot, aggregate};
use tempfile::TempDir;

#[derive(Default)]
struct FakeService {
    playlists: RefCell<Vec<String>>,
    added: RefCell<Vec<Vec<String>>>,
    fail_create: bool,
}

impl MusicService for FakeService {
    fn create_playlist(&self, name: &str, _description: &str) -> Result<String, ServiceError> {
        if self.fail_create {
            return Err(ServiceError::Status(401));
        }
        self.playlists.borrow_mut().push(name.to_string());
        Ok("playlist-1".to_string())
    }

    fn add_tracks(&self, _playlist_id: &str, uris: &[String]) -> Result<(), ServiceError> {
        self.added.borrow_mut().push(uris.to_vec());
        Ok(())
    }

    fn track_popularity(&self, track_uri: &str) -> Result<u32, ServiceError> {
        if track_uri.ends_with("creep") {
            Ok(83)
        } else {
            Err(ServiceError::Status(404))
        }
    }
}

fn record(ts: &str, artist: &str, track: &str, album: &str, ms: u64, skipped: bool) -> String {
    let uri = format!("spotify:track:{}", track.to_lowercase().replace(' ', ""));
    format!(
        r#"{{"ts": "{ts}", "master_metadata_track_name": "{track}",
            "master_metadata_album_artist_name": "{artist}",
            "master_metadata_album_album_name": "{album}",
            "spotify_track_uri": "{uri}", "ms_played": {ms}, "skipped": {skipped}}}"#
    )
}

/// Two history files and one broken file.
fn make_history_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    let first = [
        record("2022-12-30T20:00:00Z", "Radiohead", "Creep", "Pablo Honey", 238_000, false),
        record("2023-01-02T20:00:00Z", "Radiohead", "Creep", "Pablo Honey", 238_000, false),
        record("2023-01-03T20:00:00Z", "Radiohead", "Karma Police", "OK Computer", 261_000, false),
        record("2023-01-03T20:05:00Z", "Radiohead", "Airbag", "OK Computer", 10_000, true),
    ];
    let second = [
        record("2023-02-01T09:00:00Z", "Radiohead", "Airbag", "OK Computer", 284_000, true),
        record("2023-02-01T09:05:00Z", "Radiohead", "Lucky", "OK Computer", 259_000, false),
        record("2023-02-02T09:00:00Z", "Portishead", "Roads", "Dummy", 305_000, false),
        record("2023-02-02T09:10:00Z", "Portishead", "Sour Times", "Dummy", 12_000, false),
        record("2023-02-03T09:00:00Z", "Miracle Tones", "Hymn", "Ignored", 400_000, false),
    ];
    fs::write(dir.path().join("Streaming_History_0.json"), format!("[{}]", first.join(","))).unwrap();
    fs::write(dir.path().join("Streaming_History_1.json"), format!("[{}]", second.join(","))).unwrap();
    fs::write(dir.path().join("broken.json"), "{not json").unwrap();
    dir
}

fn make_config() -> AppConfig {
    AppConfig {
        ignore: vec!["Miracle Tones".to_string()],
        ..Default::default()
    }
}

fn load_snapshot(config: &AppConfig) -> (AggregateSnapshot, usize) {
    let dir = make_history_dir();
    let history = load_history(dir.path()).unwrap();
    assert_eq!(history.files_read, 2);
    assert_eq!(history.files_failed, 1);
    let raw = history.raw_records;
    (aggregate(history.events, &config.policy()), raw)
}

fn run(script: &str, service: Option<&FakeService>) -> String {
    let config = make_config();
    let (snapshot, raw) = load_snapshot(&config);
    let mut session = Session::new(&snapshot, config.initial_filter(), config.modes, raw);
    if let Some(service) = service {
        session = session.with_service(service);
    }
    let mut input = Cursor::new(script.as_bytes().to_vec());
    let mut out = Vec::new();
    session.run(&mut input, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn summary_counts_full_listens_only() {
    let text = run("summary\n", None);
    // Creep x2, Karma Police, Airbag (long, flagged skipped), Lucky, Roads.
    assert!(text.contains("Total songs played: 6\n"), "{text}");
    assert!(text.contains("Unique songs: 5\n"));
    assert!(text.contains("Unique artists: 2\n"));
    assert!(text.contains("Total skips: 1\n"));
    assert!(text.contains("Records read: 9\n"));
}

#[test]
fn album_ranking_respects_distinct_track_threshold() {
    let text = run("albums\n", None);
    // OK Computer has Karma Police, Airbag and Lucky. Pablo Honey and Dummy fall short.
    assert!(text.contains("Total unique listens: 1 album(s)"), "{text}");
    assert!(text.contains("1. OK Computer, played 3 times"));
    assert!(text.contains("first played Karma Police on 3 January, 2023"));
}

#[test]
fn filter_narrows_then_clears() {
    let text = run("filter 1 February 2023 to 28 February 2023\nartists\nfilter clear\nartists\n", None);
    assert!(text.contains("Filter: 01-02-2023 to 28-02-2023"));
    assert!(text.contains("Window: 01-02-2023 to 28-02-2023"));
    assert!(text.contains("Total listens: 3 track(s)"));
    assert!(text.contains("Total listens: 6 track(s)"));
}

#[test]
fn track_detail_with_popularity() {
    let service = FakeService::default();
    let text = run("track creep - radiohead\ntrack lucky by radiohead\n", Some(&service));
    assert!(text.contains("First played Creep by Radiohead on 30 December, 2022"), "{text}");
    assert!(text.contains("Played 2 times for 0 hours 7 minutes"));
    assert!(text.contains("Popularity: 83/100"));
    assert!(text.contains("Could not fetch popularity"));
}

#[test]
fn skips_are_counted_per_track() {
    let text = run("track airbag - radiohead\nskips\n", None);
    assert!(text.contains("Skipped 1 times"), "{text}");
    assert!(text.contains("1. Airbag by Radiohead, played 1 times for 0 hours 0 minutes"));
}

#[test]
fn make_exports_current_ranking() {
    let service = FakeService::default();
    let text = run("filter 2023\nmake\n", Some(&service));
    assert!(text.contains("Created playlist 'Top tracks 01-01-2023 - ...' with 5 tracks."), "{text}");
    assert_eq!(*service.playlists.borrow(), vec!["Top tracks 01-01-2023 - ...".to_string()]);

    let added = service.added.borrow();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0][0], "spotify:track:creep");
}

#[test]
fn make_failure_is_reported_not_fatal() {
    let service = FakeService {
        fail_create: true,
        ..Default::default()
    };
    let text = run("make Road Trip\nsummary\n", Some(&service));
    assert!(text.contains("Playlist export failed: Service returned HTTP 401"), "{text}");
    assert!(text.contains("Total songs played: 6"));
    assert!(service.added.borrow().is_empty());
}
