//! bionlp CLI — BioNLP Shared Task 2009 corpus adapter.
//!
//! Downloads the corpus archives and exports every document in the
//! `source` or `bigbio_kb` schema.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
