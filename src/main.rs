mod cli;

use cinefeed::{
    broker::{Broker, KafkaBroker, MemoryBroker},
    config,
    pipeline::Pipeline,
    server::{self, AppContext},
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::sync::Arc;

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config::validate_config(&config)?;

    tracing::info!("Starting cinefeed server");

    let broker: Arc<dyn Broker> =
        Arc::new(KafkaBroker::new(&config.broker).context("Failed to create Kafka producer")?);
    let pipeline = Arc::new(Pipeline::new(&config, broker));

    let ctx = AppContext {
        config: Arc::new(config),
        pipeline: Arc::clone(&pipeline),
    };
    let result = server::start_server(ctx).await;

    tracing::info!(
        pending = pipeline.sink().pending(),
        "Waiting for outstanding publishes"
    );
    pipeline.sink().drain().await;

    result
}

async fn ingest(movie_ids: Vec<u64>, dry_run: bool, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    config::validate_config(&config)?;

    let memory = Arc::new(MemoryBroker::new());
    let broker: Arc<dyn Broker> = if dry_run {
        memory.clone() as Arc<dyn Broker>
    } else {
        Arc::new(KafkaBroker::new(&config.broker).context("Failed to create Kafka producer")?)
    };

    let movie_ids = if movie_ids.is_empty() {
        config.pipeline.movie_ids.clone()
    } else {
        movie_ids
    };

    let pipeline = Arc::new(Pipeline::new(&config, broker));
    let report = pipeline.start(movie_ids).wait().await;
    pipeline.sink().drain().await;

    println!("Run: {}", report.run_id);
    println!("  Genres fetched: {}", report.genres_fetched);
    println!("  Popular fetched: {}", report.popular_fetched);
    println!("  Titles searched: {}", report.titles);
    println!("  Posts sent: {}", report.posts_sent);
    println!("  Posts skipped: {}", report.posts_skipped);
    println!("  Details fetched: {}", report.details_fetched);

    if dry_run {
        println!("\n[DRY RUN] Messages captured:");
        for topic in [&config.broker.catalog_topic, &config.broker.posts_topic] {
            println!("  {}: {}", topic, memory.messages(topic).len());
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "cinefeed=trace,tower_http=debug".to_string()
        } else {
            "cinefeed=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Ingest { movie_ids, dry_run } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(ingest(movie_ids, dry_run, cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("cinefeed {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Subforum: r/{}", config.forum.subreddit);
            println!("  Token policy: {:?}", config.forum.token_policy);
            println!(
                "  Topics: {} / {}",
                config.broker.catalog_topic, config.broker.posts_topic
            );
            println!("  Movie ids: {:?}", config.pipeline.movie_ids);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
        }
    }

    Ok(())
}
