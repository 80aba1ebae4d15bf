use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use playtally::config::AppConfig;
use playtally::report::{self, Entity};
use playtally::session::Session;
use playtally::spotify::SpotifyClient;
use playtally::stats::{AggregateSnapshot, RankMode};
use playtally::terminal::Terminal;

#[derive(Parser)]
#[command(name = "playtally", version, about = "Listening-history statistics and playlist export")]
struct Cli {
    /// Directory of exported history JSON files (defaults to config data_dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Rows per ranking (defaults to config result_limit)
    #[arg(short = 'n', long, global = true)]
    limit: Option<usize>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, ValueEnum)]
enum EntityName {
    #[value(alias = "tracks")]
    Track,
    #[value(alias = "albums")]
    Album,
    #[value(alias = "artists")]
    Artist,
    #[value(alias = "skips")]
    Skip,
}

impl From<EntityName> for Entity {
    fn from(name: EntityName) -> Self {
        match name {
            EntityName::Track => Entity::Track,
            EntityName::Album => Entity::Album,
            EntityName::Artist => Entity::Artist,
            EntityName::Skip => Entity::Skip,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Query the history interactively (default)
    Interactive,

    /// Overall listening totals
    Summary,

    /// Show the top tracks, albums, artists or skips
    Top {
        /// What to rank
        #[arg(value_enum, default_value = "track")]
        entity: EntityName,

        /// Rank by play count or listening time (defaults to config modes)
        #[arg(short, long)]
        mode: Option<RankMode>,

        /// Start of the date window
        #[arg(long)]
        from: Option<String>,

        /// End of the date window (inclusive)
        #[arg(long)]
        to: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let mut config = AppConfig::load();
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(limit) = cli.limit {
        config.result_limit = limit;
    }
    log::info!("History directory: {}", config.data_dir.display());

    let history = playtally::history::load_history(&config.data_dir)
        .with_context(|| format!("Failed to load history from {}", config.data_dir.display()))?;
    if history.files_failed > 0 {
        eprintln!(
            "Skipped {} unreadable file(s); run with -v for details",
            history.files_failed
        );
    }
    let raw_records = history.raw_records;
    let snapshot = playtally::stats::aggregate(history.events, &config.policy());

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command.unwrap_or(Commands::Interactive) {
        Commands::Interactive => {
            let client = match SpotifyClient::from_config(&config) {
                Ok(client) => Some(client),
                Err(e) => {
                    log::info!("Music service disabled: {e}");
                    None
                }
            };

            let mut session = Session::new(&snapshot, config.initial_filter(), config.modes, raw_records);
            if let Some(client) = &client {
                session = session.with_service(client);
            }

            match Terminal::open(AppConfig::history_path()) {
                Ok(mut terminal) => {
                    let outcome = session.run_with(&mut terminal, &mut out);
                    if let Err(e) = terminal.save_history() {
                        log::warn!("Failed to save command history: {e}");
                    }
                    outcome.context("Session failed")?;
                }
                Err(e) => {
                    log::info!("Line editing unavailable ({e}), reading plain stdin");
                    let stdin = io::stdin();
                    let mut input = stdin.lock();
                    session.run(&mut input, &mut out).context("Session failed")?;
                }
            }
        }

        Commands::Summary => {
            report::write_summary(&mut out, &snapshot.summary(), raw_records)?;
        }

        Commands::Top { entity, mode, from, to } => {
            run_top(&mut out, &snapshot, &config, entity.into(), mode, from, to)?;
        }
    }

    out.flush()?;
    Ok(())
}

fn run_top<W: Write>(
    out: &mut W,
    snapshot: &AggregateSnapshot,
    config: &AppConfig,
    entity: Entity,
    mode: Option<RankMode>,
    from: Option<String>,
    to: Option<String>,
) -> Result<()> {
    let mut filter = config.initial_filter();
    let from = from.as_deref().map(playtally::dates::parse_date).transpose()?;
    let to = to.as_deref().map(playtally::dates::parse_date).transpose()?;
    if from.is_some() || to.is_some() {
        let start = from.map(|s| s.start()).unwrap_or(filter.start);
        filter.set_window(start, to.map(|s| s.end()))?;
        writeln!(out, "Window: {}", report::describe_window(&filter))?;
    }

    let mode = mode.unwrap_or_else(|| config.modes.mode_for(entity));
    report::write_top(out, snapshot, entity, mode, &filter)?;
    Ok(())
}
