//! matquery - Main CLI Entry Point

use anyhow::{bail, Context, Result};
use clap::Parser;
use matquery::{
    cli::{render_error, render_registry, render_resolution, Args, Commands},
    config::Config,
    llm::ChatClient,
    postprocess::Decision,
    retriever::{load_catalog, RetrieverSet},
    Resolver,
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    if let Err(message) = args.validate() {
        eprintln!("{}", message);
        return Ok(ExitCode::from(2));
    }

    // Logs go to stderr so stdout stays parseable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(args.verbosity().filter_directive())),
        )
        .init();

    let config = Config::load(args.config.clone())
        .context("Failed to load configuration")?
        .with_api_key_from_env();

    match &args.command {
        Some(Commands::Databases) => {
            let registry = config.registry().context("Invalid database registry")?;
            print!("{}", render_registry(&registry));
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Config) => {
            show_config(&config)?;
            Ok(ExitCode::SUCCESS)
        }
        None => match &args.query {
            Some(query) => run_query(&args, &config, query).await,
            None => Ok(ExitCode::from(2)),
        },
    }
}

async fn run_query(args: &Args, config: &Config, query: &str) -> Result<ExitCode> {
    let Some(catalog) = &args.catalog else {
        bail!("No retrievers configured. Pass --catalog <PATH> to serve a local JSON catalog.");
    };

    let mut retrievers = RetrieverSet::new();
    for retriever in load_catalog(catalog)
        .with_context(|| format!("Failed to load catalog {}", catalog.display()))?
    {
        let backend_id = retriever.backend_id().to_string();
        retrievers.register(backend_id, Arc::new(retriever));
    }
    tracing::info!(backends = retrievers.len(), "catalog loaded");

    let llm = ChatClient::from_config(&config.llm).with_context(|| {
        format!(
            "Failed to create LLM client (is {} set?)",
            config.llm.api_key_env
        )
    })?;
    let resolver = Resolver::new(config, Arc::new(llm), retrievers)
        .context("Invalid configuration")?;

    let n_results = args.n_results.unwrap_or(config.search.default_n_results);

    match resolver.resolve(query, n_results, args.format).await {
        Ok(resolution) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&resolution)?);
            } else {
                print!("{}", render_resolution(&resolution, args.verbosity()));
            }
            Ok(match resolution.decision {
                Decision::Escalate { .. } => ExitCode::FAILURE,
                _ => ExitCode::SUCCESS,
            })
        }
        Err(e) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&e.to_failure())?);
            } else {
                eprintln!("{}", render_error(&e));
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn show_config(config: &Config) -> Result<()> {
    let path = Config::default_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<no home directory>".to_string());

    println!("# default path: {}", path);
    println!(
        "# api key ({}): {}",
        config.llm.api_key_env,
        if config.llm.api_key.is_some() { "set" } else { "not set" }
    );
    println!(
        "{}",
        toml::to_string_pretty(config).context("Failed to serialize configuration")?
    );
    Ok(())
}
