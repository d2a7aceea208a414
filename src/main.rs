//! AWS MFA login
//!
//! Obtains temporary AWS session credentials with an MFA one-time code and
//! writes them into a single profile of the shared credentials file.
//!
//! The program performs the following operations:
//! 1. Parses command-line arguments for configuration
//! 2. Prompts for the source profile, target profile, MFA serial and code
//!    that were not given as arguments
//! 3. Exchanges the code for session credentials through STS
//! 4. Rewrites the target profile, keeping every other line of the file as-is
//!
//! Any error exits with status 1 after printing the message to stderr.

use std::io;

use anyhow::Result;
use clap::Parser;

mod cli;
mod credentials;
mod editor;
mod error;
mod prompt;
mod updater;

use cli::Args;
use prompt::Prompter;
use updater::AwsMfaUpdater;

#[tokio::main]
async fn main() -> Result<()> {
    // INFO by default; RUST_LOG overrides.
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();

    let updater = AwsMfaUpdater::new(args.credentials_path.clone(), args.duration)?;

    let mut prompt = Prompter::new(io::stdin().lock(), io::stdout());
    let request = updater.collect(&args, &mut prompt)?;
    updater.remember(&request);

    updater.update_credentials(&request).await
}
