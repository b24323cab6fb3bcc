// src/main.rs — revbench entry point

use clap::Parser;

use revbench::cli::{score, Cli, Commands};
use revbench::infra::config::Config;
use revbench::infra::logger;

#[tokio::main]
async fn main() {
    // REVBENCH_LOG / RUST_LOG override the default level
    logger::init_logging("info");

    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::default()
    };

    match cli.command {
        Commands::Score {
            corpus,
            repo,
            concurrency,
            json,
            quiet,
        } => {
            score::run_score(
                score::ScoreArgs {
                    corpus,
                    repo,
                    concurrency,
                    json,
                    quiet,
                },
                &config,
            )
            .await
        }
    }
}
