//! TubeWatch CLI
//!
//! Local execution entry point: the long-running scheduler, one-shot runs,
//! and a few admin commands over the store.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tubewatch::{
    error::{AppError, Result},
    models::{Config, NewChannel},
    notify::{Dispatcher, Mailer, SmtpMailer},
    pipeline::{self, ChangeDetector, DigestAggregator, Scheduler},
    services::YoutubeFeedClient,
    storage::{LocalStore, Store},
    utils::http,
};

/// TubeWatch - Channel Upload Notifier
#[derive(Parser, Debug)]
#[command(
    name = "tubewatch",
    version,
    about = "Watches channel feeds and announces new videos"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Store directory (overrides `storage.dir`)
    #[arg(short, long)]
    storage_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run ingestion and the weekly digest on their schedules
    Run,

    /// Check every channel once
    Ingest,

    /// Send the digest for the previous week now
    Digest,

    /// Validate the configuration file
    Validate,

    /// Show store and sink info
    Info,

    /// Manage watched channels
    Channel {
        #[command(subcommand)]
        action: ChannelAction,
    },

    /// Manage excluded title words
    Exclude {
        #[command(subcommand)]
        action: ExcludeAction,
    },
}

#[derive(Subcommand, Debug)]
enum ChannelAction {
    /// Register a channel by its feed id
    Add {
        feed_id: String,
        name: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// Remove a channel and its recorded videos
    Remove { id: u64 },
    /// Keep recording a channel's videos without announcing them
    Mute { id: u64 },
    Unmute { id: u64 },
    List,
}

#[derive(Subcommand, Debug)]
enum ExcludeAction {
    Add { word: String },
    Remove { word: String },
    List,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Everything the pipeline needs, built once from configuration.
struct App {
    store: Arc<dyn Store>,
    detector: Arc<ChangeDetector>,
    digest: Arc<DigestAggregator>,
    dispatcher: Arc<Dispatcher>,
}

impl App {
    async fn build(config: &Config, storage_dir: &Path) -> Result<Self> {
        let client = http::create_async_client(&config.http)?;
        let store: Arc<dyn Store> = Arc::new(LocalStore::open(storage_dir).await?);

        let mailer: Option<Arc<dyn Mailer>> = match &config.smtp {
            Some(smtp) => Some(Arc::new(SmtpMailer::new(
                smtp,
                Duration::from_secs(config.http.timeout_secs),
            )?)),
            None => None,
        };

        let dispatcher = Arc::new(Dispatcher::from_config(
            config,
            client.clone(),
            mailer.clone(),
        )?);
        let feed = Arc::new(YoutubeFeedClient::new(client, &config.feed)?);
        let detector = Arc::new(ChangeDetector::new(
            Arc::clone(&store),
            feed,
            Arc::clone(&dispatcher),
        ));
        let digest = Arc::new(DigestAggregator::from_config(
            config,
            Arc::clone(&store),
            mailer,
        )?);

        Ok(Self {
            store,
            detector,
            digest,
            dispatcher,
        })
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The log level lives in the config file, so peek at it before the
    // logger exists; load failures are reported once logging is up.
    let level = Config::load(&cli.config)
        .map(|c| c.logging.level)
        .unwrap_or_else(|_| "info".to_string());
    init_logging(cli.verbose, &level);

    let mut config = Config::load_or_default(&cli.config);
    config.apply_env_overrides();

    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }
    let storage_dir = cli
        .storage_dir
        .unwrap_or_else(|| PathBuf::from(&config.storage.dir));

    match cli.command {
        Command::Validate => {
            log::info!("All validations passed!");
        }

        Command::Run => {
            log::info!("TubeWatch starting...");
            let app = App::build(&config, &storage_dir).await?;
            Scheduler::new(
                &config,
                Arc::clone(&app.store),
                Arc::clone(&app.detector),
                Arc::clone(&app.digest),
            )?
            .run()
            .await?;
        }

        Command::Ingest => {
            let app = App::build(&config, &storage_dir).await?;
            let summary = pipeline::run_ingestion(app.store.as_ref(), &app.detector).await?;
            if summary.errors > 0 {
                log::warn!("{} channels failed with store errors", summary.errors);
            }
        }

        Command::Digest => {
            let app = App::build(&config, &storage_dir).await?;
            pipeline::run_digest(&app.digest, Utc::now()).await?;
        }

        Command::Info => {
            let app = App::build(&config, &storage_dir).await?;
            log::info!("Storage directory: {}", storage_dir.display());
            log::info!("Channels: {}", app.store.list_channels().await?.len());
            log::info!("Videos: {}", app.store.video_count().await?);
            log::info!("Excluded words: {}", app.store.excluded_words().await?.len());

            let sinks = app.dispatcher.configured_sinks();
            if sinks.is_empty() {
                log::info!("Sinks: none configured");
            } else {
                log::info!("Sinks: {}", sinks.join(", "));
            }
            log::info!(
                "Weekly digest: {}",
                if app.digest.is_enabled() {
                    "enabled"
                } else {
                    "disabled"
                }
            );
        }

        Command::Channel { action } => {
            let store = LocalStore::open(&storage_dir).await?;
            channel_command(&store, action).await?;
        }

        Command::Exclude { action } => {
            let store = LocalStore::open(&storage_dir).await?;
            exclude_command(&store, action).await?;
        }
    }

    Ok(())
}

async fn channel_command(store: &dyn Store, action: ChannelAction) -> Result<()> {
    match action {
        ChannelAction::Add {
            feed_id,
            name,
            note,
        } => {
            let mut channel = NewChannel::new(feed_id, name);
            channel.note = note;
            let channel = store.add_channel(channel).await?;
            log::info!(
                "Added channel {} ({}) as #{}",
                channel.display_name,
                channel.external_feed_id,
                channel.id
            );
        }
        ChannelAction::Remove { id } => {
            if !store.remove_channel(id).await? {
                return Err(AppError::validation(format!("No channel with id {id}")));
            }
            log::info!("Removed channel #{}", id);
        }
        ChannelAction::Mute { id } => {
            store.set_muted(id, true, Utc::now()).await?;
            log::info!("Muted channel #{}", id);
        }
        ChannelAction::Unmute { id } => {
            store.set_muted(id, false, Utc::now()).await?;
            log::info!("Unmuted channel #{}", id);
        }
        ChannelAction::List => {
            for channel in store.list_channels().await? {
                log::info!(
                    "#{} {} ({}){}{}",
                    channel.id,
                    channel.display_name,
                    channel.external_feed_id,
                    if channel.is_muted() { " [muted]" } else { "" },
                    channel
                        .last_checked_at
                        .map(|at| format!(" checked {}", at))
                        .unwrap_or_default()
                );
            }
        }
    }
    Ok(())
}

async fn exclude_command(store: &dyn Store, action: ExcludeAction) -> Result<()> {
    match action {
        ExcludeAction::Add { word } => {
            if store.add_excluded_word(&word).await? {
                log::info!("Excluding titles containing '{}'", word.trim());
            } else {
                log::warn!("'{}' is already excluded", word.trim());
            }
        }
        ExcludeAction::Remove { word } => {
            if !store.remove_excluded_word(&word).await? {
                return Err(AppError::validation(format!("'{word}' is not excluded")));
            }
            log::info!("Removed excluded word '{}'", word);
        }
        ExcludeAction::List => {
            for word in store.excluded_words().await? {
                log::info!("{}", word.word);
            }
        }
    }
    Ok(())
}
