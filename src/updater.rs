//! MFA login workflow.
//!
//! Collects the profile names, device serial and one-time code, exchanges them
//! for temporary credentials with STS and writes those into the target profile
//! of the shared credentials file:
//!
//! ```ini
//! [default-long-term]                 # source: long-term IAM user keys
//! aws_access_key_id=AKIA...
//! aws_secret_access_key=...
//! aws_mfa_device=arn:aws:iam::...     # optional serial default
//!
//! [default]                           # target: rewritten on every login
//! region=us-east-1                    # preserved
//! aws_access_key_id=ASIA...
//! aws_secret_access_key=...
//! aws_session_token=...
//! ```
//!
//! The last source profile and serial are remembered in `~/.aws/.session` and
//! `~/.aws/.serial` so the next login only needs the code.

use std::{
    io::{BufRead, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use configparser::ini::Ini;
use log::{info, warn};

use crate::{
    cli::Args,
    credentials::{Credentials, SessionIssuer},
    editor,
    prompt::{Prompter, Sidecar},
};

const DEFAULT_SOURCE_PROFILE: &str = "default-long-term";
const DEFAULT_TARGET_PROFILE: &str = "default";

/// Keys of the source profile that may name the MFA device.
const SERIAL_KEYS: [&str; 2] = ["aws_mfa_device", "mfa_serial"];

/// Answers gathered before calling STS.
#[derive(Debug, PartialEq, Eq)]
pub struct LoginRequest {
    pub source_profile: String,
    pub target_profile: String,
    pub serial: String,
    pub code: String,
}

pub struct AwsMfaUpdater {
    /// Path to the AWS credentials file (typically ~/.aws/credentials)
    path: PathBuf,
    /// Remembers the last source profile
    session: Sidecar,
    /// Remembers the last MFA serial
    serial: Sidecar,
    issuer: SessionIssuer,
}

impl AwsMfaUpdater {
    /// Resolves the credentials file and sidecars under `$HOME/.aws`.
    ///
    /// # Arguments
    ///
    /// * `path` - Credentials file to rewrite. If `None`, defaults to
    ///   `~/.aws/credentials` following AWS CLI conventions.
    /// * `duration` - Session token lifetime in seconds (900-129600)
    ///
    /// # Errors
    ///
    /// Fails only when the home directory cannot be determined. A missing
    /// credentials file is reported later by the rewrite.
    pub fn new(path: Option<PathBuf>, duration: u32) -> Result<Self> {
        let aws_dir = dirs::home_dir()
            .map(|d| d.join(".aws"))
            .context("Could not determine home directory")?;
        let path = path.unwrap_or_else(|| aws_dir.join("credentials"));

        Ok(Self {
            path,
            session: Sidecar::new(aws_dir.join(".session")),
            serial: Sidecar::new(aws_dir.join(".serial")),
            issuer: SessionIssuer::new(duration),
        })
    }

    /// Fills in whatever `args` left out by prompting on `prompt`.
    ///
    /// Defaults offered at each prompt:
    /// - source profile: last value in `~/.aws/.session`, else `default-long-term`
    /// - target profile: `default`
    /// - serial: last value in `~/.aws/.serial`, else `aws_mfa_device` or
    ///   `mfa_serial` from the source profile
    ///
    /// # Errors
    ///
    /// Returns an error if input ends before a required answer is given or a
    /// profile name is not usable as a section header.
    pub fn collect<R: BufRead, W: Write>(
        &self,
        args: &Args,
        prompt: &mut Prompter<R, W>,
    ) -> Result<LoginRequest> {
        let source_profile = match &args.source_profile {
            Some(profile) => profile.trim().to_string(),
            None => {
                let last = self.session.load();
                let fallback = last.as_deref().unwrap_or(DEFAULT_SOURCE_PROFILE);
                prompt.ask("Source profile", Some(fallback), "Source profile is required")?
            }
        };
        editor::validate_profile_name(&source_profile)?;

        let target_profile = match &args.profile {
            Some(profile) => profile.trim().to_string(),
            None => prompt.ask(
                "Target profile",
                Some(DEFAULT_TARGET_PROFILE),
                "Target profile is required",
            )?,
        };
        editor::validate_profile_name(&target_profile)?;

        let serial = match &args.serial {
            Some(serial) => serial.clone(),
            None => {
                let last = self
                    .serial
                    .load()
                    .or_else(|| configured_serial(&self.path, &source_profile));
                prompt.ask(
                    "AWS MFA device serial",
                    last.as_deref(),
                    "AWS MFA device serial is required",
                )?
            }
        };

        let code = match &args.code {
            Some(code) => code.clone(),
            None => prompt.ask("AWS MFA code", None, "AWS MFA code is required")?,
        };

        Ok(LoginRequest {
            source_profile,
            target_profile,
            serial,
            code,
        })
    }

    /// Remembers the answers that are worth offering next time.
    pub fn remember(&self, request: &LoginRequest) {
        for (sidecar, value) in [
            (&self.session, &request.source_profile),
            (&self.serial, &request.serial),
        ] {
            if let Err(e) = sidecar.store(value) {
                warn!("Unable to store {}: {e:#}", sidecar.path().display());
            }
        }
    }

    /// Exchanges the code for session credentials and rewrites the target profile.
    ///
    /// The new access key id and session token are logged at INFO once STS
    /// answers, before the file is touched.
    ///
    /// # Errors
    ///
    /// * STS rejects the request (bad or expired code, unknown serial, network)
    /// * STS returns credentials that cannot be written on a single line
    /// * The credentials file cannot be rewritten (see [`editor::rewrite`])
    pub async fn update_credentials(&self, request: &LoginRequest) -> Result<()> {
        info!(
            "Fetching credentials - Profile: {}, Serial: {}",
            request.source_profile, request.serial
        );

        let session = self
            .issuer
            .issue(&request.source_profile, &request.serial, &request.code)
            .await?;
        let credentials = session.credentials;

        info!("KeyId: {}", credentials.access_key_id());
        info!("Session token: {}", credentials.session_token());

        self.write_session(&request.target_profile, credentials).await?;
        info!(
            "Success! Wrote [{}] to {}; credentials expire at: {}",
            request.target_profile,
            self.path.display(),
            session.expiration
        );

        Ok(())
    }

    /// Runs the blocking file rewrite off the async worker threads.
    async fn write_session(&self, profile: &str, credentials: Credentials) -> Result<()> {
        let path = self.path.clone();
        let profile = profile.to_string();
        tokio::task::spawn_blocking(move || editor::rewrite(&path, &profile, &credentials))
            .await
            .context("Credentials file rewrite did not complete")??;
        Ok(())
    }
}

/// MFA device recorded in the source profile of the credentials file.
fn configured_serial(path: &Path, profile: &str) -> Option<String> {
    let mut ini = Ini::new_cs();
    ini.load(path).ok()?;
    SERIAL_KEYS
        .iter()
        .find_map(|key| ini.get(profile, key).filter(|serial| !serial.is_empty()))
}

#[cfg(test)]
mod tests {
    use std::{fs, io::Cursor};

    use clap::Parser;

    use super::*;

    fn updater(dir: &Path) -> AwsMfaUpdater {
        let aws_dir = dir.join(".aws");
        AwsMfaUpdater {
            path: aws_dir.join("credentials"),
            session: Sidecar::new(aws_dir.join(".session")),
            serial: Sidecar::new(aws_dir.join(".serial")),
            issuer: SessionIssuer::new(43200),
        }
    }

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("aws-mfa-login").chain(argv.iter().copied())).unwrap()
    }

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn flags_skip_prompts() {
        let dir = tempfile::tempdir().unwrap();
        let updater = updater(dir.path());
        let args = args(&["-s", "base", "-p", "admin", "--serial", "SN", "--code", "123456"]);

        let request = updater.collect(&args, &mut prompter("")).unwrap();

        assert_eq!(
            request,
            LoginRequest {
                source_profile: "base".into(),
                target_profile: "admin".into(),
                serial: "SN".into(),
                code: "123456".into(),
            }
        );
    }

    #[test]
    fn prompts_use_defaults_and_sidecars() {
        let dir = tempfile::tempdir().unwrap();
        let updater = updater(dir.path());
        updater.serial.store("arn:aws:iam::123456789012:mfa/me").unwrap();
        let args = args(&["-s", "base"]);

        let request = updater.collect(&args, &mut prompter("\n\n654321\n")).unwrap();

        assert_eq!(request.target_profile, DEFAULT_TARGET_PROFILE);
        assert_eq!(request.serial, "arn:aws:iam::123456789012:mfa/me");
        assert_eq!(request.code, "654321");
    }

    #[test]
    fn serial_falls_back_to_source_profile() {
        let dir = tempfile::tempdir().unwrap();
        let updater = updater(dir.path());
        fs::create_dir_all(dir.path().join(".aws")).unwrap();
        fs::write(
            &updater.path,
            "[default-long-term]\naws_access_key_id=AKIA\naws_mfa_device=arn:aws:iam::1:mfa/dev\n",
        )
        .unwrap();
        let args = args(&["-p", "default", "--code", "111111"]);

        let request = updater.collect(&args, &mut prompter("\n\n")).unwrap();

        assert_eq!(request.source_profile, DEFAULT_SOURCE_PROFILE);
        assert_eq!(request.serial, "arn:aws:iam::1:mfa/dev");
    }

    #[test]
    fn invalid_profile_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let updater = updater(dir.path());
        let args = args(&["-s", "base", "--serial", "SN", "--code", "1"]);

        assert!(updater.collect(&args, &mut prompter("[bad]\n")).is_err());
    }

    #[test]
    fn remember_writes_sidecars() {
        let dir = tempfile::tempdir().unwrap();
        let updater = updater(dir.path());
        let request = LoginRequest {
            source_profile: "base".into(),
            target_profile: "admin".into(),
            serial: "SN".into(),
            code: "123456".into(),
        };

        updater.remember(&request);

        assert_eq!(updater.session.load().as_deref(), Some("base"));
        assert_eq!(updater.serial.load().as_deref(), Some("SN"));
    }

    #[test]
    fn configured_serial_skips_empty_device() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials");
        fs::write(&path, "[base]\naws_mfa_device=\nmfa_serial=arn:aws:iam::1:mfa/y\n").unwrap();

        assert_eq!(configured_serial(&path, "base").as_deref(), Some("arn:aws:iam::1:mfa/y"));
    }

    #[test]
    fn flag_profiles_are_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let updater = updater(dir.path());
        let args = args(&["-s", " base", "-p", "admin ", "--serial", "SN", "--code", "1"]);

        let request = updater.collect(&args, &mut prompter("")).unwrap();

        assert_eq!(request.source_profile, "base");
        assert_eq!(request.target_profile, "admin");
    }

    #[tokio::test]
    async fn write_session_rewrites_target_profile() {
        let dir = tempfile::tempdir().unwrap();
        let updater = updater(dir.path());
        fs::create_dir_all(dir.path().join(".aws")).unwrap();
        fs::write(&updater.path, "[base]\nk=v\n[admin]\nregion=eu-west-1\nold=1\n").unwrap();

        updater
            .write_session("admin", Credentials::new("ASIA", "SEC", "TOK"))
            .await
            .unwrap();

        assert_eq!(
            fs::read_to_string(&updater.path).unwrap(),
            "[base]\nk=v\n[admin]\nregion=eu-west-1\naws_access_key_id=ASIA\naws_secret_access_key=SEC\naws_session_token=TOK\n\n"
        );
    }

    #[tokio::test]
    async fn write_session_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let updater = updater(dir.path());

        let err = updater
            .write_session("admin", Credentials::new("ASIA", "SEC", "TOK"))
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<crate::error::EditError>(),
            Some(crate::error::EditError::PathNotFound(_))
        ));
    }

    #[test]
    fn configured_serial_reads_mfa_serial_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials");
        fs::write(&path, "[base]\nmfa_serial = arn:aws:iam::1:mfa/x\n").unwrap();

        assert_eq!(configured_serial(&path, "base").as_deref(), Some("arn:aws:iam::1:mfa/x"));
        assert_eq!(configured_serial(&path, "other"), None);
    }
}
