use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure while walking a directory tree. Every variant aborts the walk.
#[derive(Error, Debug)]
pub enum TreeError {
    #[error("permission denied: {}", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("no such file or directory: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    #[error("symbolic link cycle at {}", path.display())]
    LinkCycle { path: PathBuf },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl TreeError {
    /// Classify an I/O failure raised while reading `path`.
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        let path = path.to_path_buf();
        match err.kind() {
            io::ErrorKind::PermissionDenied => TreeError::PermissionDenied { path },
            io::ErrorKind::NotFound => TreeError::NotFound { path },
            io::ErrorKind::NotADirectory => TreeError::NotADirectory { path },
            _ => TreeError::Io { path, source: err },
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            TreeError::PermissionDenied { path }
            | TreeError::NotFound { path }
            | TreeError::NotADirectory { path }
            | TreeError::LinkCycle { path }
            | TreeError::Io { path, .. } => path,
        }
    }
}
