//! Fatal error taxonomy for a conversion run

use std::path::PathBuf;

/// Error that aborts a conversion run.
///
/// Missing optional fields are never reported through this type; they fall
/// back to per-field sentinels during extraction. Every variant carries the
/// offending path so the user can tell which file failed.
#[derive(Debug)]
pub enum ConvertError {
    /// Input file missing, unreadable, or not valid gzip
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Input is not well-formed XML, or does not decode in its declared
    /// encoding
    Parse { path: PathBuf, message: String },
    /// Output could not be created, written, or renamed into place
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for ConvertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            Self::Parse { path, message } => {
                write!(f, "malformed XML in {}: {message}", path.display())
            }
            Self::Write { path, source } => {
                write!(f, "failed to write {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConvertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } | Self::Write { source, .. } => Some(source),
            Self::Parse { .. } => None,
        }
    }
}

impl ConvertError {
    /// Process exit code (sysexits.h) for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            // EX_NOINPUT
            Self::Read { .. } => 66,
            // EX_DATAERR
            Self::Parse { .. } => 65,
            // EX_CANTCREAT
            Self::Write { .. } => 73,
        }
    }

    /// Path of the file the error refers to.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } | Self::Write { path, .. } => path,
        }
    }
}
