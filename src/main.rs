mod cli;

use episodex::catalog::RemoteCatalog;
use episodex::config;
use episodex::scanner::{LocalFile, ScanProgress, ScanSummary, Scanner};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Serialize)]
struct ScanOutput<'a> {
    summary: &'a ScanSummary,
    files: &'a [LocalFile],
}

async fn scan_files(
    files_path: &Path,
    config_path: Option<&Path>,
    user: Option<String>,
    enhanced: bool,
    output: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;
    if user.is_some() {
        config.scan.username = user;
    }
    config.scan.enhanced |= enhanced;

    let content = std::fs::read_to_string(files_path)
        .with_context(|| format!("Failed to read files list: {:?}", files_path))?;
    let mut files: Vec<LocalFile> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse files list: {:?}", files_path))?;

    let cancel = CancellationToken::new();
    let catalog =
        Arc::new(RemoteCatalog::from_config(&config.catalog)?.with_cancellation(cancel.clone()));

    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing with raw episode numbers");
            on_ctrl_c.cancel();
        }
    });

    let scanner = Scanner::new(&config, catalog.clone(), catalog)
        .with_cancellation(cancel)
        .with_progress(Box::new(|p: ScanProgress| {
            tracing::info!(stage = ?p.stage, percent = p.percent, "Scan progress");
        }));

    let summary = scanner.scan(&mut files).await?;

    let json = serde_json::to_string_pretty(&ScanOutput {
        summary: &summary,
        files: &files,
    })?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write output: {:?}", path))?;
            println!(
                "Scanned {} files: {} matched, {} unmatched, {} issues",
                summary.total_files,
                summary.matched,
                summary.unmatched,
                summary.issues.len()
            );
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "episodex=debug,episodex_common=debug".to_string()
        } else {
            "episodex=info,episodex_common=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Scan {
            files,
            user,
            enhanced,
            output,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(scan_files(
                &files,
                cli.config.as_deref(),
                user,
                enhanced,
                output.as_deref(),
            ))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("episodex {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    println!("  AniList: {}", config.catalog.anilist_url);
    println!("  ani.zip: {}", config.catalog.anizip_url);
    println!(
        "  Catalog budget: {} per {}s",
        config.limiter.catalog.permits, config.limiter.catalog.window_secs
    );
    println!(
        "  Analysis budget: {} per {}s",
        config.limiter.analysis.permits, config.limiter.analysis.window_secs
    );
    println!(
        "  User: {}",
        config.scan.username.as_deref().unwrap_or("(none)")
    );
    println!("  Enhanced: {}", config.scan.enhanced);
    println!("  Group concurrency: {}", config.scan.group_concurrency);

    Ok(())
}
