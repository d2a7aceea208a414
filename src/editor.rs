//! In-place rewrite of one profile in the shared credentials file.
//!
//! The file is treated as a list of lines. Only section headers (`[name]`) and
//! the `region` key of the target profile are recognised; every other line is
//! opaque text that is either copied verbatim or, inside the target profile,
//! dropped. The target profile ends up holding exactly:
//!
//! ```ini
//! [target]
//! region=...                  # kept verbatim if the profile had one
//! aws_access_key_id=...
//! aws_secret_access_key=...
//! aws_session_token=...
//!
//! ```
//!
//! Only the first section named after the target is rewritten. When no such
//! section exists a new one is appended at the end of the file.

use std::{
    borrow::Cow,
    fs::{self, OpenOptions},
    io::{self, Read, Write},
    path::Path,
};

use tempfile::NamedTempFile;

use crate::{credentials::Credentials, error::EditError};

/// Replaces the credentials of `profile` in the file at `path`.
///
/// The new contents are written to a temporary sibling and renamed over the
/// original, so a failed write leaves the file untouched. The file must already
/// exist; it is never created here.
///
/// # Arguments
///
/// * `path` - Credentials file; symlinks are followed and the link is kept
/// * `profile` - Target profile. Surrounding whitespace is ignored, as it is in
///   section headers
/// * `credentials` - Key triple written into the target profile
///
/// # Errors
///
/// * [`EditError::InvalidProfileName`] - `profile` is blank or contains `[`, `]`
///   or a newline
/// * [`EditError::InvalidCredentials`] - a credential field is empty or contains
///   a newline
/// * [`EditError::PathNotFound`] - nothing exists at `path`
/// * [`EditError::PermissionDenied`] - the file cannot be opened for writing, or
///   its directory does not accept the temporary file
/// * [`EditError::ReadFailed`] - `path` is not a regular file, is not UTF-8, or
///   reading failed
/// * [`EditError::WriteFailed`] - writing, syncing or renaming the temporary
///   file failed; the original file is unchanged
pub fn rewrite(path: &Path, profile: &str, credentials: &Credentials) -> Result<(), EditError> {
    validate_profile_name(profile)?;
    credentials.validate()?;

    // Follow symlinks so the rename replaces the real file, not the link.
    let path = fs::canonicalize(path).map_err(|e| EditError::on_read(path.to_path_buf(), e))?;
    let read_err = |e| EditError::on_read(path.clone(), e);

    let metadata = fs::metadata(&path).map_err(read_err)?;
    if !metadata.is_file() {
        return Err(read_err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a regular file",
        )));
    }

    let mut content = String::new();
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(&path)
        .and_then(|mut file| file.read_to_string(&mut content))
        .map_err(read_err)?;

    let output = edit(&content, profile, credentials);
    write_back(&path, &output, metadata.permissions())
}

/// Writes `contents` to a temporary sibling of `path` and renames it over `path`.
fn write_back(path: &Path, contents: &str, permissions: fs::Permissions) -> Result<(), EditError> {
    let write_err = |e| EditError::on_write(path.to_path_buf(), e);
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir).map_err(write_err)?;
    temp.write_all(contents.as_bytes()).map_err(write_err)?;
    temp.as_file().sync_all().map_err(write_err)?;
    fs::set_permissions(temp.path(), permissions).map_err(write_err)?;
    temp.persist(path).map_err(|e| write_err(e.error))?;

    Ok(())
}

/// Computes the rewritten file contents without touching the filesystem.
///
/// The result depends only on the arguments; running it again on its own
/// output yields the same bytes.
pub fn edit(content: &str, profile: &str, credentials: &Credentials) -> String {
    // Header names are compared trimmed, so the target must be too.
    let profile = profile.trim_ascii();
    let (lines, terminated) = split_lines(content);
    let mut output = Transcript {
        lines: Vec::with_capacity(lines.len() + 6),
        terminated: true,
    };

    let mut state = State::Outside;
    for &line in &lines {
        state = match state {
            State::Outside if section_name(line) == Some(profile) => {
                output.push(line);
                State::InTarget { region: None }
            }
            State::Outside | State::Done => {
                output.push(line);
                state
            }
            State::InTarget { region } => match section_name(line) {
                Some(_) => {
                    output.push_credentials(region, credentials);
                    output.push(line);
                    State::Done
                }
                None if region.is_none() && is_region(line) => State::InTarget { region: Some(line) },
                None => State::InTarget { region },
            },
        };
    }

    match state {
        State::Outside => {
            // A terminating newline already separates the last line from the
            // appended section.
            let last_is_blank = lines.last().is_none_or(|line| line.trim().is_empty());
            if !terminated && !last_is_blank {
                output.push("");
            }
            output.push(format!("[{profile}]"));
            output.push_credentials(None, credentials);
        }
        State::InTarget { region } => output.push_credentials(region, credentials),
        // The last emitted line is the input's own last line.
        State::Done => output.terminated = terminated,
    }

    output.render()
}

/// Rejects names that could not round-trip through a section header.
pub fn validate_profile_name(profile: &str) -> Result<(), EditError> {
    if profile.trim_ascii().is_empty() || profile.contains(['[', ']', '\n', '\r']) {
        return Err(EditError::InvalidProfileName(profile.to_string()));
    }
    Ok(())
}

/// Position of the walk relative to the target profile.
#[derive(Clone, Copy)]
enum State<'a> {
    Outside,
    /// Inside the first target section; holds its first `region` line.
    InTarget { region: Option<&'a str> },
    Done,
}

/// Output lines plus whether the final line gets a `\n`.
struct Transcript<'a> {
    lines: Vec<Cow<'a, str>>,
    terminated: bool,
}

impl<'a> Transcript<'a> {
    fn push(&mut self, line: impl Into<Cow<'a, str>>) {
        self.lines.push(line.into());
    }

    fn push_credentials(&mut self, region: Option<&'a str>, credentials: &Credentials) {
        if let Some(region) = region {
            self.push(region);
        }
        self.push(format!("aws_access_key_id={}", credentials.access_key_id()));
        self.push(format!("aws_secret_access_key={}", credentials.secret_access_key()));
        self.push(format!("aws_session_token={}", credentials.session_token()));
        self.push("");
    }

    fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        if self.terminated && !self.lines.is_empty() {
            out.push('\n');
        }
        out
    }
}

/// Splits on `\n`, reporting whether the content ended with one.
fn split_lines(content: &str) -> (Vec<&str>, bool) {
    if content.is_empty() {
        return (Vec::new(), false);
    }
    match content.strip_suffix('\n') {
        Some(body) => (body.split('\n').collect(), true),
        None => (content.split('\n').collect(), false),
    }
}

/// Name inside a `[name]` header, trimmed; `None` for any other line.
fn section_name(line: &str) -> Option<&str> {
    line.trim_ascii()
        .strip_prefix('[')?
        .strip_suffix(']')
        .map(str::trim_ascii)
}

/// Matches `region`, optional whitespace, then `=`.
fn is_region(line: &str) -> bool {
    line.trim_ascii()
        .strip_prefix("region")
        .is_some_and(|rest| rest.trim_ascii_start().starts_with('='))
}
