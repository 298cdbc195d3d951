//! NewsTracker CLI
//!
//! Runs the digest pipeline once, on a schedule, or inspects stored records.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use newstracker::{
    collectors::HttpCollectorFactory,
    error::Result,
    models::Config,
    notifiers::EmailNotifier,
    pipeline::{self, Pipeline, Schedule},
    processors::LlmProcessor,
    storage::{ArticleStore, HistorySource, LocalStorage, MemoryStorage},
};

/// NewsTracker - Announcement digest mailer
#[derive(Parser, Debug)]
#[command(
    name = "newstracker",
    version,
    about = "Collects new articles, summarizes them and emails a digest"
)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, global = true, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the pipeline once
    Run {
        /// Keep history in memory only (nothing is written to disk)
        #[arg(long)]
        ephemeral: bool,
    },

    /// Run the pipeline repeatedly per the [scheduler] section
    Schedule,

    /// Validate the configuration and show the selected source
    Validate,

    /// List stored records
    History {
        #[arg(long, value_enum, default_value_t = RecordKind::Digests)]
        kind: RecordKind,

        /// Look-back window in days
        #[arg(long, default_value_t = 7)]
        days: u32,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RecordKind {
    Articles,
    Processed,
    Digests,
}

/// Initialize logging; `RUST_LOG` wins over the given default level.
fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Collaborators shared by `run` and `schedule`.
struct Services {
    factory: HttpCollectorFactory,
    summarizer: LlmProcessor,
    notifier: Option<EmailNotifier>,
}

impl Services {
    fn build(config: &Config) -> Result<Self> {
        Ok(Self {
            factory: HttpCollectorFactory::new(config)?,
            summarizer: LlmProcessor::new(&config.llm, &config.crawler)?,
            notifier: config.email.as_ref().map(EmailNotifier::new).transpose()?,
        })
    }

    fn pipeline<'a, S: ArticleStore>(&'a self, config: &'a Config, storage: &'a S) -> Pipeline<'a> {
        let pipeline = Pipeline::new(config, &self.factory, &self.summarizer).with_storage(storage);
        match &self.notifier {
            Some(notifier) => pipeline.with_notifier(notifier),
            None => pipeline,
        }
    }
}

async fn run_once<S: ArticleStore>(config: &Config, services: &Services, storage: &S) -> Result<()> {
    match services.pipeline(config, storage).run().await? {
        Some(digest) => log::info!(
            "Sent '{}' with {} articles",
            digest.title,
            digest.articles.len()
        ),
        None => log::info!("Nothing to send"),
    }
    Ok(())
}

async fn show_history(storage: &LocalStorage, kind: RecordKind, days: u32, limit: usize) -> Result<()> {
    match kind {
        RecordKind::Articles => {
            let articles = storage.recent_articles(days, limit).await?;
            log::info!("{} articles in the last {} days", articles.len(), days);
            for a in articles {
                log::info!("  {} | {} | {}", a.created_at.format("%Y-%m-%d %H:%M"), a.short_title(), a.url);
            }
        }
        RecordKind::Processed => {
            let processed = storage.recent_processed(days, limit).await?;
            log::info!("{} processed articles in the last {} days", processed.len(), days);
            for p in processed {
                log::info!(
                    "  {} | {} | {}",
                    p.processed_at.format("%Y-%m-%d %H:%M"),
                    p.original_article.short_title(),
                    p.tags.join(", ")
                );
            }
        }
        RecordKind::Digests => {
            let digests = storage.recent_digests(days, limit).await?;
            log::info!("{} digests in the last {} days", digests.len(), days);
            for d in digests {
                log::info!("  {} ({} articles)", d.title, d.articles.len());
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = Config::load(&cli.config);
    let level = match (&loaded, cli.verbose) {
        (_, true) => "debug".to_string(),
        (Ok(config), false) => config.logging.level.clone(),
        (Err(_), false) => "info".to_string(),
    };
    init_logging(&level);

    let mut config = loaded.unwrap_or_else(|e| {
        log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            cli.config.display(),
            e
        );
        Config::default()
    });
    config.apply_env();

    match cli.command {
        Command::Run { ephemeral } => {
            config.validate()?;
            let services = Services::build(&config)?;
            if ephemeral {
                run_once(&config, &services, &MemoryStorage::new()).await?;
            } else {
                let storage = LocalStorage::new(&config.database.path);
                run_once(&config, &services, &storage).await?;
            }
        }

        Command::Schedule => {
            config.validate()?;
            let schedule = Schedule::from_config(&config.scheduler)?;
            let services = Services::build(&config)?;
            let storage = LocalStorage::new(&config.database.path);
            pipeline::run_scheduled(&services.pipeline(&config, &storage), schedule).await?;
        }

        Command::Validate => {
            log::info!("Validating {}...", cli.config.display());

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }

            for (i, candidate) in pipeline::candidates(&config).iter().enumerate() {
                log::info!("Source {}: {} ({:?})", i + 1, candidate.strategy, candidate.fallback);
            }
            log::info!("Config OK");
        }

        Command::History { kind, days, limit } => {
            let storage = LocalStorage::new(&config.database.path);
            log::info!("Reading records from {}", storage.root_dir().display());
            show_history(&storage, kind, days, limit).await?;
        }
    }

    Ok(())
}
