use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use scrobble_mirror::config::{AppConfig, CliConfig, FileConfig};
use scrobble_mirror::lastfm::{LastFmClient, LASTFM_API_BASE};
use scrobble_mirror::sync::{
    refresh_albums, refresh_artists, sync_loves, sync_scrobbles, SyncProgress,
};
use scrobble_mirror::timestamp::DateZone;
use scrobble_mirror::{HistoryStore, SqliteHistoryStore};

mod cli_style;
use cli_style::get_styles;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
#[command(name = "scrobble-mirror", version = VERSION, styles = get_styles())]
#[command(about = "Mirror a Last.fm listening history into a SQLite database")]
struct CliArgs {
    /// Path to a TOML config file. Its values override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Last.fm API key (32 alphanumeric characters).
    #[clap(long)]
    pub api_key: Option<String>,

    /// Last.fm user whose history is mirrored.
    #[clap(short, long)]
    pub username: Option<String>,

    /// Path to the SQLite history database, created if missing.
    #[clap(long, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Base URL of the Last.fm API.
    #[clap(long, default_value = LASTFM_API_BASE)]
    pub base_url: String,

    /// Timeout in seconds for each API request.
    #[clap(long, default_value_t = 30)]
    pub request_timeout_sec: u64,

    /// Number of records requested per page.
    #[clap(long, default_value_t = 200)]
    pub page_size: u32,

    /// Page to start from, to resume an interrupted export.
    #[clap(long, default_value_t = 1)]
    pub first_page: u32,

    /// Pause in milliseconds before every API request. 0 disables it.
    #[clap(long, default_value_t = 250)]
    pub request_delay_ms: u64,

    /// Only export scrobbles from this date on (YYYY-MM-DD).
    #[clap(long)]
    pub start_date: Option<String>,

    /// Only export scrobbles up to this date (YYYY-MM-DD).
    #[clap(long)]
    pub end_date: Option<String>,

    /// Time zone in which start and end dates are interpreted.
    #[clap(long, value_enum, default_value_t = DateZone::Utc)]
    pub date_zone: DateZone,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mirrors scrobbles, then loved tracks.
    Export,

    /// Refreshes artist and album details, stalest first.
    Details {
        /// Maximum number of artists, and of albums, to refresh.
        #[clap(long)]
        limit: Option<usize>,

        /// Skip entities refreshed within this many days.
        #[clap(long)]
        max_age_days: Option<u64>,
    },

    /// Prints row counts of the history database. Needs only the database path.
    Stats,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        let refresh_limit = match &self.command {
            Command::Details { limit, .. } => *limit,
            _ => None,
        };
        CliConfig {
            api_key: self.api_key.clone(),
            username: self.username.clone(),
            db_path: self.db_path.clone(),
            base_url: self.base_url.clone(),
            request_timeout_sec: self.request_timeout_sec,
            page_size: self.page_size,
            first_page: self.first_page,
            request_delay_ms: self.request_delay_ms,
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            date_zone: self.date_zone,
            refresh_limit,
        }
    }
}

/// Progress bar sized by the total the API announces on the first page.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{msg} {spinner} {pos}") {
            bar.set_style(style);
        }
        Self { bar }
    }
}

impl SyncProgress for BarProgress {
    fn start(&self, label: &str, total: Option<u64>) {
        if let Some(total) = total {
            self.bar.set_length(total);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} (ETA: {eta})")
            {
                self.bar.set_style(style.progress_chars("=> "));
            }
        }
        self.bar.set_message(label.to_string());
    }

    fn advance(&self, count: u64) {
        self.bar.inc(count);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn client_for(config: &AppConfig) -> Result<LastFmClient> {
    LastFmClient::with_reqwest(
        &config.base_url,
        &config.api_key,
        &config.username,
        config.request_timeout(),
    )
    .context("Failed to create the Last.fm HTTP client")
}

fn run(cli_args: &CliArgs) -> Result<()> {
    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = cli_args.to_cli_config();

    if let Command::Stats = cli_args.command {
        let db_path = AppConfig::resolve_db_path(&cli_config, file_config.as_ref())?;
        info!("Opening history database at {:?}...", db_path);
        let store = SqliteHistoryStore::new(&db_path)?;
        cli_style::print_history_stats(&store.get_stats()?);
        cli_style::print_success("Done");
        return Ok(());
    }

    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Opening history database at {:?}...", config.db_path);
    let store = SqliteHistoryStore::new(&config.db_path)?;
    let client = client_for(&config)?;

    match &cli_args.command {
        Command::Export => {
            let options = config.sync_options();
            info!("Exporting history of {}", client.username());

            let stats = sync_scrobbles(&client, &store, &options, &BarProgress::new())?;
            cli_style::print_sync_summary("Scrobbles", &stats);

            let stats = sync_loves(&client, &store, &options, &BarProgress::new())?;
            cli_style::print_sync_summary("Loves", &stats);
        }
        Command::Details { max_age_days, .. } => {
            let now = chrono::Utc::now().timestamp();
            let options = config.refresh_options(now, *max_age_days);

            let stats = refresh_artists(&client, &store, &options, &BarProgress::new())?;
            cli_style::print_refresh_summary("Artists", &stats);

            let stats = refresh_albums(&client, &store, &options, &BarProgress::new())?;
            cli_style::print_refresh_summary("Albums", &stats);
        }
        Command::Stats => {}
    }

    cli_style::print_history_stats(&store.get_stats()?);
    cli_style::print_success("Done");
    Ok(())
}

fn main() {
    let cli_args = CliArgs::parse();

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init();

    if let Err(e) = run(&cli_args) {
        cli_style::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
