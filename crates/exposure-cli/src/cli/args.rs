use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "exposure",
    version,
    about = "Multi-rater AI task-exposure evaluation: local raters, consensus, and API-backed classification with resumable checkpoints"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the full pipeline: rate, reconcile, summarize, classify
    Run(RunArgs),
    /// Classify an already-summarized table, skipping the rater stages
    Classify(ClassifyArgs),
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Pipeline configuration file
    #[arg(short, long, default_value = "exposure.yaml")]
    pub config: PathBuf,
}

#[derive(Parser, Debug)]
pub struct ClassifyArgs {
    /// Pipeline configuration file (judge settings and rate limits)
    #[arg(short, long, default_value = "exposure.yaml")]
    pub config: PathBuf,
    /// Summarized input table (must carry a consensus_summary column)
    #[arg(short, long)]
    pub input: PathBuf,
    /// Output table
    #[arg(short, long)]
    pub output: PathBuf,
}
