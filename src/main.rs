use clap::Parser;
use docmill::Settings;
use docmill::cli::commands::{self, chunk::SizeOverrides, process::ProcessArgs};
use docmill::cli::{Cli, Commands};
use docmill::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // For non-init commands, check if project is initialized
    if cli.config.is_none() && !matches!(cli.command, Commands::Init { .. }) {
        if let Err(warning) = Settings::check_init() {
            eprintln!("Warning: {warning}");
            eprintln!("Using default configuration for now.");
        }
    }

    let loaded = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let config = loaded.unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        Settings::default()
    });

    logging::init_with_config(&config.logging);

    if let Err(e) = run(cli.command, &config).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &Settings) -> anyhow::Result<()> {
    match command {
        Commands::Init { force } => commands::init::run_init(force),
        Commands::Config => commands::init::run_config(config),
        Commands::Chunk {
            file,
            max,
            min,
            overlap,
            json,
        } => commands::chunk::run(&file, SizeOverrides { max, min, overlap }, json, config),
        Commands::Extract {
            file,
            schemas,
            threshold,
            chunks,
        } => commands::extract::run(&file, &schemas, threshold, chunks, config),
        Commands::Process {
            paths,
            schemas,
            no_embed,
            concurrency,
            timeout,
        } => {
            let args = ProcessArgs {
                paths,
                schemas,
                no_embed,
                concurrency,
                timeout,
            };
            commands::process::run(args, config).await
        }
        Commands::Documents { action } => commands::documents::run(action, config),
        Commands::Search {
            query,
            limit,
            threshold,
            text,
            json,
        } => commands::search::run(&query, limit, threshold, text, json, config),
        Commands::Schemas { action } => commands::schemas::run(action, config),
    }
}
