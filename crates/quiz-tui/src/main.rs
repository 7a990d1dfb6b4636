mod app;
mod auth;
mod config;
mod error;
mod render;
mod store;
mod theme;
mod users;

use anyhow::Context;
use app::App;
use auth::LocalAuth;
use clap::{Parser, Subcommand};
use config::Config;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use quiz_core::{Difficulty, LeaderboardFilter, TimeBand};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use store::{DocumentStore, LocalStore, MemoryStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use users::UserService;

const LOG_FILE: &str = "mathquiz.log";

/// Timed arithmetic quiz for the terminal
#[derive(Debug, Parser)]
#[command(name = "mathquiz", version, about)]
struct Cli {
    /// Directory holding the document store and log file
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Extra configuration file, layered over the user config
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Keep everything in memory; nothing is written to disk
    #[arg(long, global = true)]
    guest: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the terminal game (default)
    Play,
    /// Print the leaderboard
    Leaderboard {
        /// Rank by one difficulty tier (easy, medium, hard)
        #[arg(long)]
        difficulty: Option<Difficulty>,
        /// Restrict to a time band (fast, medium, slow)
        #[arg(long)]
        time: Option<TimeBand>,
        /// Number of rows
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print a player's statistics
    Stats {
        #[arg(long)]
        email: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }
    let data_dir = config.data_dir();
    prepare_data_dir(&data_dir, cli.guest)?;

    let command = cli.command.unwrap_or(Command::Play);
    let target = log_target(matches!(command, Command::Play), cli.guest, &data_dir);
    init_tracing(&config, target)?;

    let store = open_store(&data_dir, cli.guest);
    if !store.is_available() {
        warn!(backend = store.backend_name(), "store unavailable, results will not be saved");
    }
    let users = UserService::new(Arc::clone(&store));

    match command {
        Command::Play => {
            let auth = Arc::new(LocalAuth::new(store));
            play(App::new(config, auth, users))
        }
        Command::Leaderboard {
            difficulty,
            time,
            limit,
        } => print_leaderboard(
            &users,
            &LeaderboardFilter {
                difficulty,
                time_band: time,
                limit: limit.unwrap_or(config.leaderboard_limit),
            },
        ),
        Command::Stats { email } => print_stats(&users, &email),
    }
}

/// Where log lines go
#[derive(Debug, PartialEq, Eq)]
enum LogTarget {
    File(PathBuf),
    Stderr,
    Discard,
}

/// The game owns the terminal, so it logs to a file in the data dir.
/// A guest game has nowhere to write and drops its logs.
fn log_target(play: bool, guest: bool, data_dir: &Path) -> LogTarget {
    match (play, guest) {
        (true, false) => LogTarget::File(data_dir.join(LOG_FILE)),
        (true, true) => LogTarget::Discard,
        (false, _) => LogTarget::Stderr,
    }
}

/// Guests never touch the data dir
fn prepare_data_dir(data_dir: &Path, guest: bool) -> anyhow::Result<()> {
    if guest {
        return Ok(());
    }
    fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))
}

fn open_store(data_dir: &Path, guest: bool) -> Arc<dyn DocumentStore> {
    if guest {
        info!("guest mode, keeping documents in memory");
        return Arc::new(MemoryStore::new());
    }
    let local = LocalStore::new(data_dir);
    info!(dir = %local.dir().display(), "using local store");
    Arc::new(local)
}

fn init_tracing(config: &Config, target: LogTarget) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env("MATHQUIZ_LOG")
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match target {
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            subscriber
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init()
        }
        LogTarget::Stderr => subscriber.with_writer(io::stderr).try_init(),
        LogTarget::Discard => subscriber.with_writer(io::sink).try_init(),
    };

    result.map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))
}

fn play(mut app: App) -> anyhow::Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let result = run_app(&mut stdout, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(stdout, LeaveAlternateScreen)?;

    result.context("terminal error")
}

fn run_app(stdout: &mut io::Stdout, app: &mut App) -> io::Result<()> {
    let mut last_tick = Instant::now();

    loop {
        render::render(stdout, app)?;
        stdout.flush()?;

        let timeout = app::TICK_RATE.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
                    break;
                }

                match app.handle_key(key) {
                    app::AppAction::Continue => {}
                    app::AppAction::Quit => break,
                }
            }
        }

        // Countdown, deferred saves and message expiry
        if last_tick.elapsed() >= app::TICK_RATE {
            app.tick();
            last_tick = Instant::now();
        }
    }

    Ok(())
}

fn print_leaderboard(users: &UserService, filter: &LeaderboardFilter) -> anyhow::Result<()> {
    let entries = users
        .leaderboard(filter)
        .context("failed to load leaderboard")?;

    if entries.is_empty() {
        println!("No entries yet.");
        return Ok(());
    }

    println!(
        "{:>4}  {:<20} {:>7} {:>5}  {:<7} {:>6}  {}",
        "Rank", "Player", "Score", "Best", "Level", "Time", "Date"
    );
    for (i, entry) in entries.iter().enumerate() {
        println!(
            "{:>4}  {:<20} {:>7.1} {:>5}  {:<7} {:>6}  {}",
            i + 1,
            entry.name,
            entry.score,
            entry.highest_score,
            entry.difficulty,
            render::format_time(entry.time),
            entry.date.format("%Y-%m-%d")
        );
    }
    Ok(())
}

fn print_stats(users: &UserService, email: &str) -> anyhow::Result<()> {
    let (_, user) = users
        .find_by_email(email)
        .with_context(|| format!("no statistics for {email}"))?;
    let stats = &user.stats;

    println!("{} <{}>", user.name, user.email);
    println!("  Games played   {}", stats.total_games);
    println!("  Total score    {}", stats.total_score);
    println!("  Average score  {}", stats.average_score);
    println!("  Highest score  {}", stats.highest_score);
    println!("  Correct        {}", stats.total_correct);
    println!("  Time played    {}", render::format_time(stats.total_time_played));
    println!(
        "  Addition       {}% of {}",
        stats.by_operation.addition.accuracy_percent(),
        stats.by_operation.addition.total
    );
    println!(
        "  Multiplication {}% of {}",
        stats.by_operation.multiplication.accuracy_percent(),
        stats.by_operation.multiplication.total
    );

    println!();
    for &difficulty in Difficulty::all() {
        let bucket = stats.by_difficulty.get(difficulty);
        println!(
            "  {:<7} games {:>4}  avg {:>4}",
            difficulty, bucket.total, bucket.avg_score
        );
    }

    if !stats.recent_activity.is_empty() {
        println!();
        println!("Recent games");
        for game in &stats.recent_activity {
            println!(
                "  {}  {:<7} {:>4}  {}",
                game.date.format("%Y-%m-%d"),
                game.difficulty,
                game.score,
                render::format_time(game.time)
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_leaderboard_flags() {
        let cli = Cli::parse_from([
            "mathquiz",
            "leaderboard",
            "--difficulty",
            "hard",
            "--time",
            "fast",
            "--limit",
            "5",
            "--guest",
        ]);
        assert!(cli.guest);
        match cli.command {
            Some(Command::Leaderboard {
                difficulty,
                time,
                limit,
            }) => {
                assert_eq!(difficulty, Some(Difficulty::Hard));
                assert_eq!(time, Some(TimeBand::Fast));
                assert_eq!(limit, Some(5));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_guest_leaves_data_dir_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let data_dir = tmp.path().join("data");

        prepare_data_dir(&data_dir, true).unwrap();
        let store = open_store(&data_dir, true);
        assert!(store.is_available());
        let users = UserService::new(store);
        users.create_user("u1", "Guest", "guest@example.com").unwrap();
        print_leaderboard(&users, &LeaderboardFilter::default()).unwrap();

        assert_eq!(log_target(true, true, &data_dir), LogTarget::Discard);
        assert_eq!(log_target(false, true, &data_dir), LogTarget::Stderr);
        assert!(!data_dir.exists());
    }

    #[test]
    fn test_local_play_logs_to_data_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let data_dir = tmp.path().join("data");

        prepare_data_dir(&data_dir, false).unwrap();
        assert!(data_dir.is_dir());
        assert_eq!(
            log_target(true, false, &data_dir),
            LogTarget::File(data_dir.join(LOG_FILE))
        );
    }

    #[test]
    fn test_bad_difficulty_rejected() {
        assert!(Cli::try_parse_from(["mathquiz", "leaderboard", "--difficulty", "extreme"]).is_err());
    }
}
