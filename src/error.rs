//! Errors surfaced by the credentials-file editor.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Failure of [`crate::editor::rewrite`].
///
/// The I/O variants keep the offending path and the OS error so the driver can
/// print a useful message without the editor logging anything itself.
#[derive(Debug, Error)]
pub enum EditError {
    #[error("credentials file not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("permission denied: {}", .path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {}", .path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The original file is left as it was; only the temporary sibling may
    /// have been touched.
    #[error("failed to write {}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid profile name {0:?}: must be non-empty without '[', ']' or newlines")]
    InvalidProfileName(String),

    #[error("invalid credentials: {0} is empty or contains a newline")]
    InvalidCredentials(&'static str),
}

impl EditError {
    /// Classifies an error raised while opening or reading the file.
    pub(crate) fn on_read(path: PathBuf, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::PathNotFound(path),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path, source },
            _ => Self::ReadFailed { path, source },
        }
    }

    /// Classifies an error raised while writing the new contents.
    pub(crate) fn on_write(path: PathBuf, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path, source },
            _ => Self::WriteFailed { path, source },
        }
    }
}
