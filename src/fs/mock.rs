// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File,
    Dir(Vec<String>), // List of child names
    Symlink(PathBuf), // Absolute target
}

/// Links followed before a lookup gives up, like the OS's ELOOP limit.
const MAX_LINK_HOPS: usize = 40;

/// In-memory directory tree. Paths are used verbatim; tests should stick to
/// absolute paths.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a file, creating its parent directories implicitly.
    pub fn add_file(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut entries = self.lock();
        entries.insert(path.to_path_buf(), MockEntry::File);
        link_to_parent(&mut entries, path);
    }

    /// Add an (empty) directory, creating its parents implicitly.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut entries = self.lock();
        ensure_dir_entry(&mut entries, path.as_ref());
    }

    /// Add a symbolic link at `path` pointing to the absolute `target`.
    pub fn add_symlink(&self, path: impl AsRef<Path>, target: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut entries = self.lock();
        entries.insert(path.to_path_buf(), MockEntry::Symlink(target.as_ref().to_path_buf()));
        link_to_parent(&mut entries, path);
    }

    /// Follow links in every component of `path`. `None` when the hop limit
    /// is exceeded.
    fn resolve(&self, path: &Path) -> Option<PathBuf> {
        let entries = self.lock();
        let mut hops = 0;
        let mut resolved = PathBuf::new();
        for component in path.components() {
            match component {
                Component::Normal(name) => resolved.push(name),
                other => resolved.push(other.as_os_str()),
            }
            while let Some(MockEntry::Symlink(target)) = entries.get(&resolved) {
                hops += 1;
                if hops > MAX_LINK_HOPS {
                    return None;
                }
                resolved = target.clone();
            }
        }
        Some(resolved)
    }

    fn entry(&self, path: &Path) -> Option<MockEntry> {
        let resolved = self.resolve(path)?;
        self.lock().get(&resolved).cloned()
    }
}

fn ensure_dir_entry(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    if entries.contains_key(path) {
        return;
    }
    entries.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
    link_to_parent(entries, path);
}

fn link_to_parent(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    let Some(parent) = path.parent() else {
        return;
    };
    if parent.as_os_str().is_empty() || parent == path {
        return;
    }

    ensure_dir_entry(entries, parent);
    if let (Some(MockEntry::Dir(children)), Some(name)) = (
        entries.get_mut(parent),
        path.file_name().and_then(|n| n.to_str()),
    ) {
        if !children.iter().any(|c| c == name) {
            children.push(name.to_string());
        }
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.entry(path).is_some()
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.entry(path), Some(MockEntry::File))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.entry(path), Some(MockEntry::Dir(_)))
    }

    fn is_symlink(&self, path: &Path) -> bool {
        let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
            return false;
        };
        let Some(parent) = self.resolve(parent) else {
            return false;
        };
        matches!(self.lock().get(&parent.join(name)), Some(MockEntry::Symlink(_)))
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        // Paths are taken as absolute; only links are resolved.
        self.resolve(path)
            .ok_or_else(|| anyhow!("Too many levels of symbolic links: {:?}", path))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        match self.entry(path) {
            Some(MockEntry::Dir(children)) => {
                let mut paths: Vec<PathBuf> = children.iter().map(|name| path.join(name)).collect();
                paths.sort();
                Ok(paths)
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_file_creates_parent_directories() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/src/main.rs");

        assert!(fs.is_dir(Path::new("/proj")));
        assert!(fs.is_dir(Path::new("/proj/src")));
        assert!(fs.is_file(Path::new("/proj/src/main.rs")));
        assert_eq!(
            fs.read_dir(Path::new("/proj")).unwrap(),
            vec![PathBuf::from("/proj/src")]
        );
    }

    #[test]
    fn read_dir_on_file_is_an_error() {
        let fs = MockFileSystem::new();
        fs.add_file("/a.txt");
        assert!(fs.read_dir(Path::new("/a.txt")).is_err());
    }

    #[test]
    fn symlinks_resolve_through_every_component() {
        let fs = MockFileSystem::new();
        fs.add_file("/q/inner.txt");
        fs.add_dir("/p");
        fs.add_symlink("/p/linked", "/q");

        assert!(fs.is_symlink(Path::new("/p/linked")));
        assert!(!fs.is_symlink(Path::new("/q")));
        assert!(fs.is_dir(Path::new("/p/linked")));
        assert!(fs.is_file(Path::new("/p/linked/inner.txt")));
        assert_eq!(
            fs.read_dir(Path::new("/p/linked")).unwrap(),
            vec![PathBuf::from("/p/linked/inner.txt")]
        );
        assert_eq!(
            fs.canonicalize(Path::new("/p/linked/inner.txt")).unwrap(),
            PathBuf::from("/q/inner.txt")
        );
    }

    #[test]
    fn self_referencing_link_is_an_error() {
        let fs = MockFileSystem::new();
        fs.add_symlink("/p/loop", "/p/loop");
        assert!(!fs.exists(Path::new("/p/loop")));
        assert!(fs.canonicalize(Path::new("/p/loop")).is_err());
    }
}
