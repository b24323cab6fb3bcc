// src/cli/mod.rs — CLI definition (clap derive)

pub mod progress;
pub mod score;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "revbench",
    about = "Score an AI code-review agent against a ground-truth benchmark",
    version
)]
pub struct Cli {
    /// Config file path (TOML)
    #[arg(long)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full evaluation over a corpus and print the report
    Score {
        /// Corpus directory (taxonomy.json + ground_truth/ [+ comments/])
        #[arg(long)]
        corpus: String,

        /// GitHub repository 'owner/repo' to pull agent comments from open PRs
        /// instead of local comment files
        #[arg(long)]
        repo: Option<String>,

        /// Override the configured concurrency limit
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Also write the report as JSON to this path
        #[arg(long)]
        json: Option<String>,

        /// Suppress progress output (only emit the final report)
        #[arg(long)]
        quiet: bool,
    },
}
