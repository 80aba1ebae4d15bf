use std::collections::HashSet;
use std::fmt;

/// Canonical identity of a song.
///
/// `album` is only filled in for track names listed as duplicates, which
/// are known to be different songs on different albums.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SongKey {
    pub track: String,
    pub artist: String,
    pub album: Option<String>,
}

impl fmt::Display for SongKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {}", self.track, self.artist)?;
        if let Some(album) = &self.album {
            write!(f, " ({album})")?;
        }
        Ok(())
    }
}

/// Album identity. Not qualified by artist: two albums with the same title
/// by different artists share a key.
pub type AlbumKey = String;

pub type ArtistKey = String;

/// Build the key for a track. Shape depends only on `duplicates` membership.
pub fn resolve(track: &str, artist: &str, album: Option<&str>, duplicates: &HashSet<String>) -> SongKey {
    let album = if duplicates.contains(track) {
        Some(album.unwrap_or_default().to_string())
    } else {
        None
    };

    SongKey {
        track: track.to_string(),
        artist: artist.to_string(),
        album,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_track_ignores_album() {
        let dups = HashSet::new();
        let a = resolve("Robbers", "The 1975", Some("The 1975"), &dups);
        let b = resolve("Robbers", "The 1975", Some("Live at the O2"), &dups);
        assert_eq!(a, b);
        assert!(a.album.is_none());
    }

    #[test]
    fn test_duplicate_track_is_album_qualified() {
        let dups: HashSet<String> = ["The 1975".to_string()].into();
        let a = resolve("The 1975", "The 1975", Some("The 1975"), &dups);
        let b = resolve("The 1975", "The 1975", Some("Notes On A Conditional Form"), &dups);
        assert_ne!(a, b);
        assert_eq!(a.album.as_deref(), Some("The 1975"));
    }

    #[test]
    fn test_display() {
        let dups: HashSet<String> = ["Intro".to_string()].into();
        assert_eq!(resolve("Go", "Moby", None, &HashSet::new()).to_string(), "Go by Moby");
        assert_eq!(
            resolve("Intro", "The xx", Some("xx"), &dups).to_string(),
            "Intro by The xx (xx)"
        );
    }
}
