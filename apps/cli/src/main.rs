//! Mriynyk CLI: curriculum-grounded workbooks and question answering.
//!
//! Resolves a student's query to a textbook topic, assembles that topic's
//! pages in reading order and generates an explanation with a quiz.

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
