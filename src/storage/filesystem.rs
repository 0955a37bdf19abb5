//! File system operations
//!
//! The `Filesystem` trait is everything a session needs from storage; the
//! `LocalFilesystem` implementation works directly on the host file system
//! and keeps per-user home directories under a configurable root.

use log::{info, warn};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::storage::listing;

/// Storage operations consumed by the session and transfer handlers.
pub trait Filesystem: Send + Sync {
    /// Resolves `path` against `base`. Absolute paths are returned unchanged.
    fn resolve(&self, base: &Path, path: &str) -> PathBuf;
    fn exists(&self, path: &Path) -> bool;
    fn is_directory(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn is_readable(&self, path: &Path) -> bool;
    fn is_writable(&self, path: &Path) -> bool;
    /// Renders `path` as `ls -l` style text, one entry per CRLF line.
    fn list_directory(&self, path: &Path) -> io::Result<String>;
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;
    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
    /// Returns the home directory of `user`, creating it on first use.
    fn home_directory(&self, user: &str) -> io::Result<PathBuf>;
}

/// Host file system with home directories under `home_root`.
#[derive(Debug, Clone)]
pub struct LocalFilesystem {
    home_root: PathBuf,
}

impl LocalFilesystem {
    pub fn new(home_root: impl Into<PathBuf>) -> Self {
        Self {
            home_root: home_root.into(),
        }
    }
}

impl Filesystem for LocalFilesystem {
    fn resolve(&self, base: &Path, path: &str) -> PathBuf {
        let requested = Path::new(path);
        if requested.is_absolute() {
            return requested.to_path_buf();
        }
        let joined = base.join(requested);
        fs::canonicalize(&joined).unwrap_or_else(|_| normalize_lexically(&joined))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_directory(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_readable(&self, path: &Path) -> bool {
        if path.is_dir() {
            fs::read_dir(path).is_ok()
        } else {
            File::open(path).is_ok()
        }
    }

    /// Asks the kernel whether this process may write `path`, so ownership,
    /// group bits and ACLs all count. Directories also need search access.
    #[cfg(unix)]
    fn is_writable(&self, path: &Path) -> bool {
        use nix::unistd::{AccessFlags, access};
        let mode = if path.is_dir() {
            AccessFlags::W_OK | AccessFlags::X_OK
        } else {
            AccessFlags::W_OK
        };
        access(path, mode).is_ok()
    }

    #[cfg(not(unix))]
    fn is_writable(&self, path: &Path) -> bool {
        fs::metadata(path)
            .map(|metadata| !metadata.permissions().readonly())
            .unwrap_or(false)
    }

    fn list_directory(&self, path: &Path) -> io::Result<String> {
        listing::list(path)
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn home_directory(&self, user: &str) -> io::Result<PathBuf> {
        if user.is_empty()
            || user == "."
            || user == ".."
            || user.contains(['/', '\\', '\0'])
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unusable user name for a home directory: {user:?}"),
            ));
        }

        let path = std::path::absolute(self.home_root.join(user))?;
        if path.is_file() {
            let moved_to = move_aside(&path)?;
            warn!(
                "A file occupied home directory {}; moved it to {}",
                path.display(),
                moved_to.display()
            );
        }
        if !path.exists() {
            fs::create_dir_all(&path)?;
            info!("Created home directory {}", path.display());
        }
        fs::canonicalize(&path)
    }
}

/// Renames `path` by appending underscores until the new name is free.
fn move_aside(path: &Path) -> io::Result<PathBuf> {
    let mut candidate = OsString::from(path.as_os_str());
    loop {
        candidate.push("_");
        let target = PathBuf::from(&candidate);
        if target.exists() {
            continue;
        }
        fs::rename(path, &target)?;
        return Ok(target);
    }
}

/// Folds `.` and `..` components without touching the file system.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Lexical parent of `path`; the root is its own parent.
pub fn lexical_parent(path: &Path) -> PathBuf {
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn resolve_joins_relative_and_keeps_absolute() {
        let root = TempDir::new().unwrap();
        let base = root.path().canonicalize().unwrap();
        fs::create_dir(base.join("docs")).unwrap();
        let fs_impl = LocalFilesystem::new(base.join("home"));

        assert_eq!(fs_impl.resolve(&base, "docs"), base.join("docs"));
        assert_eq!(fs_impl.resolve(&base, "docs/../docs/."), base.join("docs"));
        assert_eq!(fs_impl.resolve(&base, "/etc"), PathBuf::from("/etc"));
        assert_eq!(
            fs_impl.resolve(&base, "missing/../other"),
            base.join("other")
        );
    }

    #[test]
    fn lexical_helpers() {
        assert_eq!(
            normalize_lexically(Path::new("/a/b/../c/./d")),
            PathBuf::from("/a/c/d")
        );
        assert_eq!(lexical_parent(Path::new("/a/b")), PathBuf::from("/a"));
        assert_eq!(lexical_parent(Path::new("/")), PathBuf::from("/"));
    }

    #[test]
    fn home_directory_is_created_on_first_use() {
        let root = TempDir::new().unwrap();
        let fs_impl = LocalFilesystem::new(root.path().join("home"));

        let home = fs_impl.home_directory("alice").unwrap();
        assert!(home.is_dir());
        assert!(home.ends_with("home/alice"));
        assert_eq!(fs_impl.home_directory("alice").unwrap(), home);
    }

    #[test]
    fn home_directory_moves_an_occupying_file_aside() {
        let root = TempDir::new().unwrap();
        let home_root = root.path().join("home");
        fs::create_dir_all(&home_root).unwrap();
        fs::write(home_root.join("bob"), b"squatter").unwrap();
        fs::write(home_root.join("bob_"), b"older squatter").unwrap();
        let fs_impl = LocalFilesystem::new(&home_root);

        let home = fs_impl.home_directory("bob").unwrap();
        assert!(home.is_dir());
        assert_eq!(fs::read(home_root.join("bob__")).unwrap(), b"squatter");
        assert_eq!(fs::read(home_root.join("bob_")).unwrap(), b"older squatter");
    }

    #[test]
    fn home_directory_rejects_path_like_names() {
        let root = TempDir::new().unwrap();
        let fs_impl = LocalFilesystem::new(root.path());
        assert!(fs_impl.home_directory("../escape").is_err());
        assert!(fs_impl.home_directory("").is_err());
    }

    #[test]
    fn read_write_and_inspect() {
        let root = TempDir::new().unwrap();
        let fs_impl = LocalFilesystem::new(root.path());
        let file = root.path().join("data.bin");

        fs_impl.write_file(&file, b"payload").unwrap();
        assert!(fs_impl.exists(&file));
        assert!(fs_impl.is_file(&file));
        assert!(fs_impl.is_readable(&file));
        assert!(!fs_impl.is_directory(&file));
        assert!(fs_impl.is_writable(root.path()));
        assert_eq!(fs_impl.read_file(&file).unwrap(), b"payload");
        assert!(!fs_impl.is_readable(&root.path().join("nope")));
        assert!(!fs_impl.is_writable(&root.path().join("nope")));
    }

    #[cfg(unix)]
    #[test]
    fn directory_without_write_bits_is_not_writable() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        let fs_impl = LocalFilesystem::new(root.path());
        let locked = root.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        let writable = fs_impl.is_writable(&locked);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        if nix::unistd::Uid::effective().is_root() {
            assert!(writable);
        } else {
            assert!(!writable);
        }
    }

    #[cfg(unix)]
    #[test]
    fn writability_follows_the_owner_not_just_the_mode() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        let fs_impl = LocalFilesystem::new(root.path());
        let file = root.path().join("owner_only.txt");
        fs::write(&file, b"x").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o200)).unwrap();
        assert!(fs_impl.is_writable(&file));
        fs::set_permissions(&file, fs::Permissions::from_mode(0o444)).unwrap();
        let writable = fs_impl.is_writable(&file);
        assert_eq!(writable, nix::unistd::Uid::effective().is_root());
    }
}
