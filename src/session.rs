//! Line-oriented command loop over an aggregate snapshot.
//!
//! The snapshot is only read. The query window and result limit live in the
//! [`Session`] and change only through `filter` and `result`.
//!
//! Lines come from a [`LineSource`]: plain [`Lines`] over any `BufRead`, or
//! the line editor in [`crate::terminal`].

use std::io::{self, BufRead, Write};

use anyhow::Result;

use crate::config::{ModeConfig, TOKEN_ENV};
use crate::dates;
use crate::fuzzy::{self, TrackMatch};
use crate::report::{self, Entity};
use crate::spotify::{self, MAX_PLAYLIST_TRACKS, MusicService};
use crate::stats::rank::distinct_tracks;
use crate::stats::{AggregateSnapshot, QueryFilter, SongKey, rank};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Summary,
    List(Entity),
    Filter,
    Result,
    Make,
    Help,
    Exit,
}

/// One command word and how it is shown in `help`.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    pub display_name: &'static str,
    pub about: &'static str,
    action: Action,
}

const fn command(name: &'static str, display_name: &'static str, about: &'static str, action: Action) -> CommandSpec {
    CommandSpec {
        name,
        display_name,
        about,
        action,
    }
}

static COMMANDS: &[CommandSpec] = &[
    command("summary", "summary", "Overall listening totals", Action::Summary),
    command("artist", "artist [name]", "Top artists, or one artist's stats", Action::List(Entity::Artist)),
    command("artists", "artists", "Top artists", Action::List(Entity::Artist)),
    command("track", "track [title - artist]", "Top tracks, or one track's stats", Action::List(Entity::Track)),
    command("tracks", "tracks", "Top tracks", Action::List(Entity::Track)),
    command("album", "album [name]", "Top albums, or one album's stats", Action::List(Entity::Album)),
    command("albums", "albums", "Top albums", Action::List(Entity::Album)),
    command("skip", "skip", "Most skipped tracks", Action::List(Entity::Skip)),
    command("skips", "skips", "Most skipped tracks", Action::List(Entity::Skip)),
    command("filter", "filter [start [to end] | clear]", "Show or set the date window", Action::Filter),
    command("result", "result <n>", "Rows shown per ranking", Action::Result),
    command("make", "make [name]", "Export the top tracks as a private playlist", Action::Make),
    command("help", "help", "This list", Action::Help),
    command("exit", "exit", "Leave", Action::Exit),
    command("quit", "quit", "Leave", Action::Exit),
];

/// Find the command for a typed word, case-insensitively.
pub fn lookup(word: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|c| c.name.eq_ignore_ascii_case(word))
}

/// Where a session reads its lines from.
pub trait LineSource {
    /// Show `prompt` and read one line. `None` means the user closed the
    /// input (end of file or an interrupt) and the session should end.
    fn read_line<W: Write>(&mut self, prompt: &str, out: &mut W) -> io::Result<Option<String>>;
}

/// Unedited lines from any buffered reader. The prompt goes to `out`.
pub struct Lines<R>(pub R);

impl<R: BufRead> LineSource for Lines<R> {
    fn read_line<W: Write>(&mut self, prompt: &str, out: &mut W) -> io::Result<Option<String>> {
        write!(out, "{prompt}")?;
        out.flush()?;
        let mut line = String::new();
        if self.0.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

/// Whether the command loop keeps reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// `title - artist` or `title by artist`. The last separator wins so titles
/// may contain one.
fn split_track_query(args: &str) -> Option<(&str, &str)> {
    let (title, artist) = args.rsplit_once(" - ").or_else(|| args.rsplit_once(" by "))?;
    let (title, artist) = (title.trim(), artist.trim());
    (!title.is_empty() && !artist.is_empty()).then_some((title, artist))
}

/// Ask the user to pick one of several matches. `None` when the input closes.
fn choose<'k, S: LineSource, W: Write>(
    found: &[(&'k SongKey, f64)],
    input: &mut S,
    out: &mut W,
) -> io::Result<Option<&'k SongKey>> {
    writeln!(out, "Several tracks match:")?;
    for (i, (key, score)) in found.iter().enumerate() {
        writeln!(out, "{}. {key} ({score:.0})", i + 1)?;
    }

    let prompt = format!("Select a track [1-{}]: ", found.len());
    loop {
        let Some(line) = input.read_line(&prompt, out)? else {
            return Ok(None);
        };
        match line.trim().parse::<usize>() {
            Ok(n) if (1..=found.len()).contains(&n) => return Ok(Some(found[n - 1].0)),
            _ => writeln!(out, "Please enter a number between 1 and {}.", found.len())?,
        }
    }
}

fn write_help<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "Commands:")?;
    for c in COMMANDS {
        writeln!(out, "  {:<34} {}", c.display_name, c.about)?;
    }
    Ok(())
}

/// Interactive query state over one snapshot.
pub struct Session<'a> {
    snapshot: &'a AggregateSnapshot,
    filter: QueryFilter,
    modes: ModeConfig,
    raw_records: usize,
    service: Option<&'a dyn MusicService>,
}

impl<'a> Session<'a> {
    pub fn new(snapshot: &'a AggregateSnapshot, filter: QueryFilter, modes: ModeConfig, raw_records: usize) -> Self {
        Self {
            snapshot,
            filter,
            modes,
            raw_records,
            service: None,
        }
    }

    /// Enable `make` and track popularity lookups.
    pub fn with_service(mut self, service: &'a dyn MusicService) -> Self {
        self.service = Some(service);
        self
    }

    pub fn filter(&self) -> &QueryFilter {
        &self.filter
    }

    /// Read commands from a plain reader until `exit` or end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, input: &mut R, out: &mut W) -> Result<()> {
        self.run_with(&mut Lines(input), out)
    }

    /// Read commands until `exit`, end of input or an interrupt.
    pub fn run_with<S: LineSource, W: Write>(&mut self, input: &mut S, out: &mut W) -> Result<()> {
        writeln!(out, "Type 'help' for a list of commands.")?;

        loop {
            let Some(line) = input.read_line("> ", out)? else {
                writeln!(out)?;
                break;
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (word, args) = match line.split_once(char::is_whitespace) {
                Some((word, args)) => (word, args.trim()),
                None => (line, ""),
            };

            let Some(spec) = lookup(word) else {
                writeln!(out, "Unknown command '{word}'. Type 'help' for a list of commands.")?;
                continue;
            };
            log::debug!("Command {:?} args {args:?}", spec.name);

            if self.dispatch(spec.action, args, input, out)? == Flow::Stop {
                break;
            }
        }

        writeln!(out, "Exiting program...")?;
        out.flush()?;
        Ok(())
    }

    fn dispatch<S: LineSource, W: Write>(&mut self, action: Action, args: &str, input: &mut S, out: &mut W) -> Result<Flow> {
        match action {
            Action::Summary => report::write_summary(out, &self.snapshot.summary(), self.raw_records)?,
            Action::List(entity) if args.is_empty() => self.list(entity, out)?,
            Action::List(Entity::Artist) => self.artist_detail(args, out)?,
            Action::List(Entity::Track) => return Ok(self.track_detail(args, input, out)?),
            Action::List(Entity::Album) => self.album_detail(args, out)?,
            Action::List(Entity::Skip) => self.list(Entity::Skip, out)?,
            Action::Filter => self.set_filter(args, out)?,
            Action::Result => self.set_result_limit(args, out)?,
            Action::Make => self.make_playlist(args, out)?,
            Action::Help => write_help(out)?,
            Action::Exit => return Ok(Flow::Stop),
        }
        Ok(Flow::Continue)
    }

    fn write_window<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if self.filter.is_unbounded() {
            return Ok(());
        }
        writeln!(out, "Window: {}", report::describe_window(&self.filter))
    }

    fn list<W: Write>(&self, entity: Entity, out: &mut W) -> io::Result<()> {
        self.write_window(out)?;
        report::write_top(out, self.snapshot, entity, self.modes.mode_for(entity), &self.filter)
    }

    fn artist_detail<W: Write>(&self, query: &str, out: &mut W) -> io::Result<()> {
        let candidates = self.snapshot.artist_plays.keys().map(String::as_str);
        let Some(artist) = fuzzy::resolve_artist(query, candidates) else {
            return writeln!(out, "No artist found matching '{query}'.");
        };

        self.write_window(out)?;
        let scoped = self.snapshot.artist_plays.retain_keys(|k| k == artist);
        let ranking = rank(&scoped, self.modes.artist, &self.filter, false);
        let Some(entry) = ranking.as_ref().and_then(|r| r.entries.first()) else {
            writeln!(out, "{artist}")?;
            return report::write_no_plays(out);
        };
        report::write_group_detail(out, artist, entry, None)?;

        writeln!(out)?;
        writeln!(out, "Top tracks:")?;
        let songs = self.snapshot.songs_by_artist(artist);
        let top = rank(&songs, self.modes.track, &self.filter, false);
        report::write_ranking(out, top.as_ref(), Entity::Track)
    }

    /// Stops the session when the input closes during disambiguation.
    fn track_detail<S: LineSource, W: Write>(&self, args: &str, input: &mut S, out: &mut W) -> io::Result<Flow> {
        let Some((title, artist)) = split_track_query(args) else {
            writeln!(out, "Usage: track <title> - <artist>")?;
            return Ok(Flow::Continue);
        };

        let key = match fuzzy::resolve_track(title, artist, self.snapshot.song_plays.keys()) {
            TrackMatch::ArtistNotFound => {
                writeln!(out, "No artist found matching '{artist}'.")?;
                return Ok(Flow::Continue);
            }
            TrackMatch::TrackNotFound { artist } => {
                writeln!(out, "No track by {artist} found matching '{title}'.")?;
                return Ok(Flow::Continue);
            }
            TrackMatch::Unique(key) => key,
            TrackMatch::Ambiguous(found) => match choose(&found, input, out)? {
                Some(key) => key,
                None => {
                    writeln!(out)?;
                    return Ok(Flow::Stop);
                }
            },
        };

        self.write_window(out)?;
        let scoped = self.snapshot.song_plays.retain_keys(|k| k == key);
        let ranking = rank(&scoped, self.modes.track, &self.filter, false);
        let Some(entry) = ranking.as_ref().and_then(|r| r.entries.first()) else {
            writeln!(out, "{key}")?;
            report::write_no_plays(out)?;
            return Ok(Flow::Continue);
        };

        let skips = self
            .snapshot
            .skips
            .get(key)
            .map(|events| events.iter().filter(|e| self.filter.contains(e.timestamp)).count())
            .unwrap_or(0);
        report::write_track_detail(out, entry, skips)?;
        self.write_popularity(entry.latest_uri(), out)?;
        Ok(Flow::Continue)
    }

    fn write_popularity<W: Write>(&self, uri: Option<&str>, out: &mut W) -> io::Result<()> {
        let (Some(service), Some(uri)) = (self.service, uri) else {
            return Ok(());
        };
        match service.track_popularity(uri) {
            Ok(popularity) => writeln!(out, "Popularity: {popularity}/100"),
            Err(e) => {
                log::warn!("Popularity lookup for {uri} failed: {e}");
                writeln!(out, "Could not fetch popularity: {e}")
            }
        }
    }

    fn album_detail<W: Write>(&self, query: &str, out: &mut W) -> io::Result<()> {
        let candidates = self
            .snapshot
            .album_plays
            .keys()
            .map(String::as_str)
            .filter(|a| !a.is_empty());
        let Some(album) = fuzzy::resolve_album(query, candidates) else {
            return writeln!(out, "No album found matching '{query}'.");
        };

        self.write_window(out)?;
        let scoped = self.snapshot.album_plays.retain_keys(|k| k == album);
        let ranking = rank(&scoped, self.modes.album, &self.filter, false);
        let Some(entry) = ranking.as_ref().and_then(|r| r.entries.first()) else {
            writeln!(out, "{album}")?;
            return report::write_no_plays(out);
        };
        report::write_group_detail(out, album, entry, Some(distinct_tracks(&entry.plays)))?;

        writeln!(out)?;
        writeln!(out, "Top tracks:")?;
        let songs = self.snapshot.songs_on_album(album);
        let top = rank(&songs, self.modes.track, &self.filter, false);
        report::write_ranking(out, top.as_ref(), Entity::Track)
    }

    fn set_filter<W: Write>(&mut self, args: &str, out: &mut W) -> io::Result<()> {
        if args.is_empty() {
            return writeln!(out, "Filter: {}", report::describe_window(&self.filter));
        }
        if args.eq_ignore_ascii_case("clear") {
            self.filter.clear_window();
            return writeln!(out, "Filter cleared.");
        }

        let applied = dates::parse_window(args)
            .and_then(|(start, end)| self.filter.set_window(start.start(), end.map(|e| e.end())));
        match applied {
            Ok(()) => writeln!(out, "Filter: {}", report::describe_window(&self.filter)),
            Err(e) => writeln!(out, "{e}"),
        }
    }

    fn set_result_limit<W: Write>(&mut self, args: &str, out: &mut W) -> io::Result<()> {
        match args.parse::<usize>() {
            Ok(n) if n >= 1 => {
                self.filter.result_limit = n;
                writeln!(out, "Showing {n} results.")
            }
            _ => writeln!(out, "Please enter a whole number of at least 1."),
        }
    }

    fn make_playlist<W: Write>(&self, args: &str, out: &mut W) -> io::Result<()> {
        let Some(service) = self.service else {
            return writeln!(out, "No music service configured. Set {TOKEN_ENV} to export playlists.");
        };
        let Some(ranking) = rank(&self.snapshot.song_plays, self.modes.track, &self.filter, false) else {
            return report::write_no_plays(out);
        };

        let uris: Vec<String> = ranking
            .entries
            .iter()
            .take(MAX_PLAYLIST_TRACKS)
            .filter_map(|e| e.latest_uri())
            .map(String::from)
            .collect();
        let name = if args.is_empty() {
            report::playlist_name(&self.filter)
        } else {
            args.to_string()
        };
        let description = format!("Most played tracks, {}", report::describe_window(&self.filter));

        match spotify::export_playlist(service, &name, &description, &uris) {
            Ok(result) => writeln!(out, "Created playlist '{name}' with {} tracks.", result.tracks_added),
            Err(e) => {
                log::warn!("Playlist export failed: {e}");
                writeln!(out, "Playlist export failed: {e}")
            }
        }
    }
}
