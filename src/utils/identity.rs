use std::io;
use std::path::Path;

/// Identity of a directory, stable across the different paths that reach it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DirId {
    #[cfg(unix)]
    Inode { dev: u64, ino: u64 },
    #[cfg(not(unix))]
    Path(std::path::PathBuf),
}

/// Resolve the identity of the directory at `path`, following symlinks.
#[cfg(unix)]
pub fn dir_identity(path: &Path) -> io::Result<DirId> {
    use std::os::unix::fs::MetadataExt;

    let md = std::fs::metadata(path)?;
    Ok(DirId::Inode {
        dev: md.dev(),
        ino: md.ino(),
    })
}

#[cfg(not(unix))]
pub fn dir_identity(path: &Path) -> io::Result<DirId> {
    std::fs::canonicalize(path).map(DirId::Path)
}
