// src/main.rs — koibench entry point

use std::sync::Arc;

use clap::Parser;

use koibench::cli::{self, Cli, Commands};
use koibench::infra::config::Config;
use koibench::infra::logger;
use koibench::provider::openai_compat::OpenAICompatProvider;
use koibench::provider::retry::{RetryConfig, RetryProvider};
use koibench::provider::ModelProvider;

#[tokio::main]
async fn main() {
    // Initialize logging (respects RUST_LOG)
    logger::init_logging("warn");

    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config (falls back to defaults if no config.toml)
    let mut config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::load()?
    };

    match cli.command {
        Commands::Problems { problems_dir } => {
            let dir = problems_dir.or_else(|| config.bench.problems_dir.clone());
            let registry = cli::run::load_registry(dir.as_deref())?;
            print!("{}", cli::list::format_problems(&registry));
            Ok(())
        }
        Commands::Judges => {
            print!(
                "{}",
                cli::list::format_judges(&config.council.judges, config.council.enabled)
            );
            Ok(())
        }
        Commands::Run(args) => {
            cli::run::apply_overrides(&mut config, &args);
            config.validate()?;

            let toolchain = cli::run::check_toolchain(&config)?;
            tracing::debug!(toolchain = %toolchain.display(), "toolchain found");

            let api_key = config.api_key()?;
            let gateway: Arc<dyn ModelProvider> = Arc::new(OpenAICompatProvider::new(
                "gateway",
                api_key,
                config.gateway.base_url.clone(),
            ));
            let provider: Arc<dyn ModelProvider> = Arc::new(RetryProvider::with_config(
                gateway,
                RetryConfig {
                    max_retries: config.gateway.max_retries,
                    ..RetryConfig::default()
                },
            ));

            cli::run::run_command(&config, provider, &args).await
        }
    }
}
