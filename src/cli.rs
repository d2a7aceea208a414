//! Command-line interface definitions.

use std::path::PathBuf;

use clap::Parser;

/// AWS MFA login.
///
/// Exchanges an MFA code for temporary session credentials and writes them
/// into one profile of the shared credentials file, leaving every other
/// profile untouched. Values not given as flags are prompted for.
#[derive(Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Path to AWS credentials file [default: ~/.aws/credentials]
    #[arg(short, long, env = "AWS_SHARED_CREDENTIALS_FILE")]
    pub credentials_path: Option<PathBuf>,

    /// Profile holding the long-term keys used to call STS
    #[arg(short, long, env = "AWS_MFA_SOURCE_PROFILE")]
    pub source_profile: Option<String>,

    /// Profile to receive the session credentials
    #[arg(short, long, env = "AWS_MFA_TARGET_PROFILE")]
    pub profile: Option<String>,

    /// MFA device serial number or ARN
    #[arg(long, env = "AWS_MFA_SERIAL")]
    pub serial: Option<String>,

    /// One-time MFA code
    #[arg(long)]
    pub code: Option<String>,

    /// Session duration in seconds (900-129600)
    #[arg(
        short,
        long,
        env = "AWS_SESSION_DURATION",
        default_value = "43200",
        value_parser = clap::value_parser!(u32).range(900..=129600)
    )]
    pub duration: u32,
}
