use serde::Serialize;
use std::ffi::OsString;
use std::fs::{self, DirEntry};
use std::io;
use std::path::PathBuf;

use super::identity::DirId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Other,
}

/// One child of a listed directory.
#[derive(Clone, Debug)]
pub struct EntryMeta {
    pub path: PathBuf,
    pub name: OsString,
    pub kind: EntryKind,
    /// For symlinks: whether the link resolves to a directory.
    pub target_is_dir: bool,
}

impl EntryMeta {
    pub fn build(entry: &DirEntry) -> io::Result<Self> {
        let path = entry.path();
        let name = entry.file_name();
        let ft = entry.file_type()?;

        let kind = if ft.is_symlink() {
            EntryKind::Symlink
        } else if ft.is_dir() {
            EntryKind::Dir
        } else if ft.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        };

        // dangling links count as non-directories
        let target_is_dir = kind == EntryKind::Symlink
            && fs::metadata(&path).map(|m| m.is_dir()).unwrap_or(false);

        Ok(Self {
            path,
            name,
            kind,
            target_is_dir,
        })
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    pub fn points_to_directory(&self) -> bool {
        self.is_directory() || self.target_is_dir
    }

    pub fn display_name(&self) -> String {
        self.name.to_string_lossy().into_owned()
    }
}

/// Listing state of one directory on the active path.
#[derive(Debug)]
pub struct Frame {
    pub entries: Vec<EntryMeta>,
    pub idx: usize,
    pub prefix: String,
    pub depth: usize,
    pub id: DirId,
}

impl Frame {
    pub fn is_exhausted(&self) -> bool {
        self.idx >= self.entries.len()
    }
}
