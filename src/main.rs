use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use studytube::cli::{Cli, Commands};
use studytube::config::Config;
use studytube::pipeline::StudyPipeline;
use studytube::{output, utils};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "studytube=debug"
    } else {
        "studytube=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;

    if let Commands::Config { show } = &cli.command {
        if *show {
            config.display();
        } else {
            println!("Configuration file initialized. Edit it or set environment variables.");
            config.display();
        }
        return Ok(());
    }

    let (url, action, common) = match cli.command.action() {
        Some(parts) => parts,
        None => return Ok(()),
    };

    let url = utils::validate_and_normalize_url(url)?;

    config.validate()?;

    // Check for required external tools (non-fatal, they may still resolve)
    let missing_deps = utils::check_dependencies().await;
    if !missing_deps.is_empty() {
        eprintln!("Dependency check warnings:");
        for dep in missing_deps {
            eprintln!("   - {}", dep);
        }
        eprintln!("   (Continuing anyway - tools may be available)");
    }

    let mut run_config = config;
    if let Some(language) = &common.language {
        run_config.whisper.language = language.clone();
    }

    let pipeline = StudyPipeline::new(&run_config)?;

    tracing::info!("Producing {} for {}", action.label(), url);

    let bundle = pipeline.run(&url, &action).await?;

    match &common.output {
        Some(path) => {
            output::save_to_file(&bundle, &action, path, &common.format)?;
            println!("Result saved to: {}", path.display());
        }
        None => {
            output::print_to_console(&bundle, &action, &common.format)?;
        }
    }

    Ok(())
}
