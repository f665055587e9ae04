mod artifact;
mod cloudformation;
mod commands;
mod config;
mod error;
mod logger;
mod project;
mod runner;
use crate::commands::Commands;
use crate::config::DEFAULT_CONFIG_FILE;
use crate::logger::Logger;
use crate::runner::{Runnable, Runner};
use clap::Parser;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    arg_required_else_help = true,
    name = "webhook-stack",
    version,
    about = "Build and deploy the webhook to queue pipeline on AWS",
    long_about = "Synthesizes the CloudFormation template of the webhook stack (API Gateway, two Rust Lambda functions and an SQS queue), builds the functions and deploys the stack."
)]
struct Cli {
    /// Path to the config file
    #[arg(short, long, global = true, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Derive a runner from the command and run it
async fn run(command: impl Runnable, config_path: &Path) -> bool {
    let Err(error) = command.runner(config_path).run().await else {
        return true;
    };

    eprintln!("{}\n{error}", console::style("Error").red().bold());
    false
}

#[tokio::main]
async fn main() {
    Logger::init();
    let cli = Cli::parse();

    // Match all commands here, in one place
    let is_ok = match cli.command {
        Commands::Synth(cmd) => run(cmd, &cli.config).await,
        Commands::Build(cmd) => run(cmd, &cli.config).await,
        Commands::Deploy(cmd) => run(cmd, &cli.config).await,
        Commands::Outputs(cmd) => run(cmd, &cli.config).await,
    };

    if !is_ok {
        std::process::exit(1);
    }
}
