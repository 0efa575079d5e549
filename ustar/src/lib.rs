//! A tar archive engine.
//!
//! An [`Archive`] is an in-memory index of the entries in a tar stream,
//! built by [`Archive::read`]. Every other operation (appending, extracting,
//! diffing, updating and removing) works against that index and the same
//! underlying stream, seeking to the offsets it records.
mod archive;
mod bin;
mod builder;
mod diff;
pub mod ext;
mod extract;
mod remove;
#[cfg(test)]
mod test;
mod update;

pub use bin::*;
pub use archive::{Archive, ArchiveStorage};
pub use builder::{stored_name, write_end_data};
pub use diff::Difference;
pub use ustar_core::{Entry, EntryType, Mode};

use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::PathBuf;

const READ_WRITE_BUF_SIZE: usize = 4 * 1024 * 1024;

#[derive(thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] ustar_core::Error),

    #[error("{context}{}", display_path(.path))]
    Io {
        #[source]
        source: io::Error,
        path: Option<PathBuf>,
        context: &'static str,
    },

    #[error("Bad archive: {0}")]
    BadArchive(&'static str),

    #[error("'{0}' not found in archive")]
    NotFound(String),

    #[error("Unsupported file type: {}", .path.display())]
    UnsupportedFileType { path: PathBuf },

    #[error("Invalid path component '{}' in entry '{}'", .component.display(), .entry.display())]
    InvalidPath { entry: PathBuf, component: PathBuf },

    #[error("Size mismatch for '{}': expected {expected} bytes, got {actual}", .path.display())]
    LengthMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("Failed to {operation} {failed} of {total} items")]
    Incomplete {
        operation: &'static str,
        failed: usize,
        total: usize,
    },
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" ({})", path.display()),
        None => String::new(),
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{self}")?;

        let mut source = self.source();
        while let Some(err) = source {
            writeln!(f, "\tCaused by: {err}")?;
            source = err.source();
        }

        Ok(())
    }
}

/// Build a closure that wraps an [`io::Error`] into [`Error::Io`], with an
/// optional path and a short description of what was being attempted.
#[macro_export]
macro_rules! wrap_io_err {
    ($context:expr) => {
        |source| $crate::Error::Io {
            source,
            path: None,
            context: $context,
        }
    };
    ($path:expr, $context:expr) => {
        |source| $crate::Error::Io {
            source,
            path: Some(::std::path::PathBuf::from(&$path)),
            context: $context,
        }
    };
}
