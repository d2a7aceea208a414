use std::fmt;

use anyhow::{Context, Result};
use aws_sdk_sts::{Client, types};
use aws_smithy_types::date_time::Format;

use crate::error::EditError;

/// Short-lived key triple written into the target profile.
///
/// The values are opaque; they are written as-is with no escaping.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
}

impl Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: session_token.into(),
        }
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    /// Every field must be non-empty and fit on a single line.
    pub fn validate(&self) -> Result<(), EditError> {
        let fields = [
            ("aws_access_key_id", &self.access_key_id),
            ("aws_secret_access_key", &self.secret_access_key),
            ("aws_session_token", &self.session_token),
        ];
        for (name, value) in fields {
            if value.is_empty() || value.contains(['\n', '\r']) {
                return Err(EditError::InvalidCredentials(name));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &"** redacted **")
            .finish()
    }
}

impl TryFrom<&types::Credentials> for Credentials {
    type Error = EditError;

    fn try_from(value: &types::Credentials) -> Result<Self, Self::Error> {
        let credentials = Self::new(
            value.access_key_id(),
            value.secret_access_key(),
            value.session_token(),
        );
        credentials.validate()?;
        Ok(credentials)
    }
}

/// Credentials returned by STS together with their expiry.
#[derive(Debug)]
pub struct IssuedSession {
    pub credentials: Credentials,
    pub expiration: String,
}

/// Exchanges an MFA code for temporary credentials through STS `GetSessionToken`.
pub struct SessionIssuer {
    /// Session lifetime in seconds (900-129600)
    duration: u32,
}

impl SessionIssuer {
    pub fn new(duration: u32) -> Self {
        Self { duration }
    }

    /// Requests session credentials for the MFA device `serial`.
    ///
    /// The request is signed with the long-term keys of `source_profile`, loaded
    /// through the usual SDK configuration chain.
    ///
    /// # Arguments
    ///
    /// * `source_profile` - Profile holding the IAM user's long-term keys
    /// * `serial` - MFA device serial number or ARN
    /// * `code` - Current one-time code from the device
    ///
    /// # Errors
    ///
    /// Returns an error if STS rejects the call, returns no credentials, or
    /// returns a field that is empty or spans several lines.
    pub async fn issue(&self, source_profile: &str, serial: &str, code: &str) -> Result<IssuedSession> {
        let config = aws_config::from_env()
            .profile_name(source_profile)
            .load()
            .await;

        let session = Client::new(&config)
            .get_session_token()
            .duration_seconds(self.duration as i32)
            .serial_number(serial)
            .token_code(code)
            .send()
            .await
            .with_context(|| format!("GetSessionToken failed for profile {source_profile}"))?
            .credentials()
            .cloned()
            .context("No credentials returned")?;

        let expiration = session.expiration().fmt(Format::DateTime)?;
        let credentials = Credentials::try_from(&session)?;

        Ok(IssuedSession { credentials, expiration })
    }
}
