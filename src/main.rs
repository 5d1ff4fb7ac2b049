use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use spotify_transform::config::{Config, StorageBackend};
use spotify_transform::crawler::{CatalogJobService, CrawlerTrigger, TriggerOutcome};
use spotify_transform::pipeline::{Pipeline, RunError, RunSummary};
use spotify_transform::progress::{format_elapsed, ProgressMode};
use spotify_transform::safety::validate_layout;
use spotify_transform::storage::{LocalObjectStore, ObjectStore};

#[derive(Parser)]
#[command(name = "spotify-transform")]
#[command(about = "Flatten recently-played history snapshots into album, artist and song tables")]
struct Args {
    /// TOML config file (all fields optional)
    #[arg(long, env = "SPOTIFY_TRANSFORM_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    storage: Option<StorageBackend>,

    #[arg(long, env = "SPOTIFY_TRANSFORM_BUCKET")]
    bucket: Option<String>,

    /// Root directory for the local storage backend
    #[arg(long)]
    local_root: Option<PathBuf>,

    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    #[arg(long)]
    endpoint_url: Option<String>,

    #[arg(long)]
    crawler: Option<String>,

    #[arg(long)]
    max_attempts: Option<u32>,

    /// Seconds to wait between crawler status checks
    #[arg(long)]
    retry_delay: Option<u64>,

    /// Don't start the catalog crawler after processing
    #[arg(long)]
    skip_crawler: bool,

    /// Hide progress bars (tail-friendly output)
    #[arg(long)]
    log_only: bool,
}

impl Args {
    /// Apply command-line overrides on top of the loaded config.
    fn apply(self, mut config: Config) -> Config {
        if let Some(backend) = self.storage {
            config.storage.backend = backend;
        }
        if let Some(bucket) = self.bucket {
            config.storage.bucket = bucket;
        }
        if let Some(root) = self.local_root {
            config.storage.local_root = root;
        }
        if self.region.is_some() {
            config.storage.region = self.region;
        }
        if self.endpoint_url.is_some() {
            config.storage.endpoint_url = self.endpoint_url;
        }
        if let Some(name) = self.crawler {
            config.crawler.name = name;
        }
        if let Some(n) = self.max_attempts {
            config.crawler.max_attempts = n;
        }
        if let Some(secs) = self.retry_delay {
            config.crawler.retry_delay_secs = secs;
        }
        if self.skip_crawler {
            config.crawler.enabled = false;
        }
        config
    }
}

/// Collaborators picked from config. `jobs` is `None` when the crawler is
/// disabled.
struct Backends {
    store: Box<dyn ObjectStore>,
    jobs: Option<Box<dyn CatalogJobService>>,
}

#[cfg(feature = "aws")]
fn build_backends(config: &Config) -> Result<Backends> {
    use spotify_transform::aws::AwsContext;
    use spotify_transform::crawler::GlueCrawlerService;
    use spotify_transform::storage::S3ObjectStore;

    let needs_aws = config.storage.backend == StorageBackend::S3 || config.crawler.enabled;
    let ctx = if needs_aws {
        Some(AwsContext::load(config.storage.region.as_deref()).context("Failed to start AWS runtime")?)
    } else {
        None
    };

    let store: Box<dyn ObjectStore> = match (config.storage.backend, &ctx) {
        (StorageBackend::S3, Some(ctx)) => Box::new(S3ObjectStore::new(ctx, config.storage.endpoint_url.as_deref())),
        _ => Box::new(LocalObjectStore::new(&config.storage.local_root)),
    };
    let jobs: Option<Box<dyn CatalogJobService>> = match (&ctx, config.crawler.enabled) {
        (Some(ctx), true) => Some(Box::new(GlueCrawlerService::new(ctx))),
        _ => None,
    };

    Ok(Backends { store, jobs })
}

#[cfg(not(feature = "aws"))]
fn build_backends(config: &Config) -> Result<Backends> {
    if config.storage.backend == StorageBackend::S3 {
        bail!("S3 storage requires the `aws` feature");
    }
    if config.crawler.enabled {
        bail!("The catalog crawler requires the `aws` feature (use --skip-crawler)");
    }
    Ok(Backends {
        store: Box::new(LocalObjectStore::new(&config.storage.local_root)),
        jobs: None,
    })
}

fn print_summary(summary: &RunSummary, elapsed: std::time::Duration) {
    let songs: usize = summary.processed.iter().map(|f| f.songs).sum();
    let albums: usize = summary.processed.iter().map(|f| f.albums).sum();
    let artists: usize = summary.processed.iter().map(|f| f.artists).sum();

    println!("\n{:=<60}", "");
    println!("Transform complete!");
    println!("  Files processed: {}", summary.processed.len());
    println!("  Files failed: {}", summary.failed.len());
    println!("  Rows: {} songs, {} albums, {} artists", songs, albums, artists);
    match &summary.trigger {
        Some(TriggerOutcome::Started(c)) => println!("  Crawler: started {}", c.job_name),
        Some(TriggerOutcome::NotStarted { attempts }) => {
            println!("  Crawler: not started after {} attempts", attempts)
        }
        None => println!("  Crawler: not run"),
    }
    println!("  Elapsed: {}", format_elapsed(elapsed));
    println!("{:=<60}", "");

    for failed in &summary.failed {
        eprintln!("  FAILED {}: {}", failed.key, failed.error);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let progress = ProgressMode::from_log_only(args.log_only);

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("spotify_transform=info")))
        .init();

    let start = Instant::now();

    let config = Config::load(args.config.as_deref()).context("Failed to load config")?;
    let config = args.apply(config);
    validate_layout(&config.layout)?;

    println!(
        "Source: {:?} bucket '{}' prefix '{}'",
        config.storage.backend, config.storage.bucket, config.layout.input_prefix
    );

    let backends = build_backends(&config)?;
    let mut pipeline = Pipeline::new(
        backends.store.as_ref(),
        config.storage.bucket.clone(),
        config.layout.clone(),
    )
    .with_progress(progress);

    if let Some(jobs) = backends.jobs.as_deref() {
        let trigger = CrawlerTrigger::new(jobs, config.crawler.retry_policy()).with_sleep(|delay| {
            let spinner = progress.crawler_spinner(&config.crawler.name, delay);
            std::thread::sleep(delay);
            spinner.finish_and_clear();
        });
        pipeline = pipeline.with_catalog_refresh(trigger, config.crawler.name.clone());
    }

    let summary = match pipeline.run() {
        Ok(summary) => summary,
        Err(RunError::Trigger { source, summary }) => {
            print_summary(&summary, start.elapsed());
            return Err(source).context("Catalog refresh failed");
        }
        Err(e) => return Err(e).context("Transform run aborted"),
    };
    print_summary(&summary, start.elapsed());

    if !summary.failed.is_empty() {
        bail!("{} of {} payloads failed", summary.failed.len(), summary.failed.len() + summary.processed.len());
    }
    Ok(())
}
