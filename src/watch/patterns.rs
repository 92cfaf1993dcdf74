// src/watch/patterns.rs

//! Compiles a [`Pattern`] plus [`WatcherSettings`] into a [`WatchPlan`]:
//! which directories to hand to `notify`, and which paths under them are
//! reported.

use std::fmt;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use notify::RecursiveMode;
use tracing::debug;

use crate::errors::{Result, TaskwatchError};
use crate::fs::FileSystem;
use crate::types::Pattern;
use crate::watch::options::WatcherSettings;
use crate::watch::path_utils::{relative_str, slash_str};

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// One compiled pattern entry.
///
/// `root` is both the path handed to `notify` and the directory the glob is
/// evaluated against.
#[derive(Clone)]
pub struct PatternEntry {
    source: String,
    root: PathBuf,
    recursive: bool,
    matcher: GlobSet,
}

impl fmt::Debug for PatternEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternEntry")
            .field("source", &self.source)
            .field("root", &self.root)
            .field("recursive", &self.recursive)
            .finish_non_exhaustive()
    }
}

impl PatternEntry {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    fn mode(&self) -> RecursiveMode {
        if self.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        }
    }

    /// Returns true if `path` (absolute) is selected by this entry.
    pub fn matches(&self, path: &Path, depth: Option<usize>) -> bool {
        let Some(rel) = relative_str(&self.root, path) else {
            return false;
        };
        if rel.is_empty() {
            return false;
        }
        let nesting = rel.matches('/').count();
        if !self.recursive && nesting > 0 {
            return false;
        }
        if depth.is_some_and(|max| nesting > max) {
            return false;
        }
        self.matcher.is_match(&rel)
    }
}

/// Everything the watcher needs to know about what it is watching.
#[derive(Debug, Clone)]
pub struct WatchPlan {
    base: PathBuf,
    report_relative: bool,
    entries: Vec<PatternEntry>,
    ignored: Option<GlobSet>,
    depth: Option<usize>,
    follow_symlinks: bool,
}

impl WatchPlan {
    /// Compile `pattern` against the settings' `cwd` (or the process working
    /// directory when unset).
    pub fn compile(
        pattern: &Pattern,
        settings: &WatcherSettings,
        fs: &dyn FileSystem,
    ) -> Result<Self> {
        let base = resolve_base(settings.cwd.as_deref(), fs);

        let mut entries = Vec::new();
        for raw in pattern.entries() {
            if raw.trim().is_empty() {
                continue;
            }
            entries.push(compile_entry(&base, raw, fs)?);
        }

        if entries.is_empty() {
            return Err(TaskwatchError::ConfigError(
                "watch pattern must contain at least one non-empty entry".to_string(),
            ));
        }

        let ignored = if settings.ignored.is_empty() {
            None
        } else {
            Some(build_globset(settings.ignored.entries())?)
        };

        Ok(Self {
            base,
            report_relative: settings.cwd.is_some(),
            entries,
            ignored,
            depth: settings.depth,
            follow_symlinks: settings.follow_symlinks,
        })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn entries(&self) -> &[PatternEntry] {
        &self.entries
    }

    pub fn depth(&self) -> Option<usize> {
        self.depth
    }

    pub fn follow_symlinks(&self) -> bool {
        self.follow_symlinks
    }

    /// Paths to register with `notify`, deduplicated.
    ///
    /// A root that does not exist yet is replaced by its nearest existing
    /// ancestor, watched recursively, so the entry starts matching once the
    /// path is created. Matching stays anchored to the entry's own root.
    pub fn watch_roots(&self, fs: &dyn FileSystem) -> Vec<(PathBuf, RecursiveMode)> {
        let mut roots: Vec<(PathBuf, RecursiveMode)> = Vec::new();
        for entry in &self.entries {
            let (root, mode) = if fs.exists(&entry.root) {
                (entry.root.clone(), entry.mode())
            } else {
                let ancestor = nearest_existing_ancestor(&entry.root, fs);
                debug!(root = ?entry.root, ancestor = ?ancestor, "watch root missing, watching ancestor");
                (ancestor, RecursiveMode::Recursive)
            };
            // One registration per path; recursive wins over non-recursive.
            match roots.iter_mut().find(|(r, _)| *r == root) {
                Some((_, existing)) if mode == RecursiveMode::Recursive => *existing = mode,
                Some(_) => {}
                None => roots.push((root, mode)),
            }
        }
        roots
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        let Some(ignored) = &self.ignored else {
            return false;
        };
        if let Some(rel) = relative_str(&self.base, path) {
            if !rel.is_empty() && ignored.is_match(&rel) {
                return true;
            }
        }
        ignored.is_match(slash_str(path))
    }

    /// Returns true if `path` (absolute) should be reported.
    pub fn matches(&self, path: &Path) -> bool {
        self.entries.iter().any(|e| e.matches(path, self.depth)) && !self.is_ignored(path)
    }

    /// Path as it appears in reported events.
    pub fn display_path(&self, path: &Path) -> PathBuf {
        if self.report_relative {
            if let Ok(rel) = path.strip_prefix(&self.base) {
                return rel.to_path_buf();
            }
        }
        path.to_path_buf()
    }
}

fn nearest_existing_ancestor(path: &Path, fs: &dyn FileSystem) -> PathBuf {
    path.ancestors()
        .skip(1)
        .find(|dir| !dir.as_os_str().is_empty() && fs.exists(dir))
        .map(Path::to_path_buf)
        .unwrap_or_else(|| path.to_path_buf())
}

fn resolve_base(cwd: Option<&Path>, fs: &dyn FileSystem) -> PathBuf {
    let process_cwd = || std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let base = match cwd {
        Some(dir) if dir.is_absolute() => dir.to_path_buf(),
        Some(dir) => process_cwd().join(dir),
        None => process_cwd(),
    };
    // best-effort
    fs.canonicalize(&base).unwrap_or(base)
}

/// Split a pattern into its literal leading directories and the glob part.
///
/// `"src/**/*.rs"` → `("src", Some("**/*.rs"))`, `"a.txt"` → `("a.txt", None)`.
pub fn split_static_prefix(pattern: &str) -> (String, Option<String>) {
    let normalized = pattern.replace('\\', "/");
    let parts: Vec<&str> = normalized.split('/').collect();

    match parts.iter().position(|p| p.contains(GLOB_META)) {
        None => (normalized.clone(), None),
        Some(idx) => {
            let mut prefix = parts[..idx].join("/");
            if prefix.is_empty() && normalized.starts_with('/') {
                prefix = "/".to_string();
            }
            (prefix, Some(parts[idx..].join("/")))
        }
    }
}

fn compile_entry(base: &Path, raw: &str, fs: &dyn FileSystem) -> Result<PatternEntry> {
    let (prefix, glob) = split_static_prefix(raw);
    let joined = if prefix.is_empty() {
        base.to_path_buf()
    } else {
        base.join(&prefix)
    };
    let literal = fs.canonicalize(&joined).unwrap_or(joined);

    let (root, recursive, glob) = match glob {
        Some(glob) => (literal, true, glob),
        None if fs.is_dir(&literal) => (literal, true, "**".to_string()),
        None => {
            // A single file: watch its directory and select it by name, so
            // editors that replace the file on save keep being tracked.
            let name = literal
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    TaskwatchError::ConfigError(format!("cannot watch pattern '{raw}'"))
                })?;
            let parent = literal
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| base.to_path_buf());
            (parent, false, name)
        }
    };

    Ok(PatternEntry {
        source: raw.to_string(),
        root,
        recursive,
        matcher: build_globset(&[glob])?,
    })
}

/// Build a GlobSet from simple string patterns. `*` never crosses `/`.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat).literal_separator(true).build()?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;

    fn settings_in(cwd: &str) -> WatcherSettings {
        WatcherSettings {
            cwd: Some(PathBuf::from(cwd)),
            ..WatcherSettings::default()
        }
    }

    fn project() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/a.txt");
        fs.add_file("/proj/src/main.rs");
        fs.add_file("/proj/src/util/mod.rs");
        fs.add_file("/proj/src/notes.md");
        fs
    }

    #[test]
    fn splits_static_prefix() {
        assert_eq!(
            split_static_prefix("src/**/*.rs"),
            ("src".to_string(), Some("**/*.rs".to_string()))
        );
        assert_eq!(split_static_prefix("a.txt"), ("a.txt".to_string(), None));
        assert_eq!(
            split_static_prefix("*.txt"),
            (String::new(), Some("*.txt".to_string()))
        );
        assert_eq!(
            split_static_prefix("/**/x"),
            ("/".to_string(), Some("**/x".to_string()))
        );
    }

    #[test]
    fn literal_file_watches_parent_non_recursively() {
        let fs = project();
        let plan = WatchPlan::compile(&"a.txt".into(), &settings_in("/proj"), &fs).unwrap();

        assert_eq!(
            plan.watch_roots(&fs),
            vec![(PathBuf::from("/proj"), RecursiveMode::NonRecursive)]
        );
        assert!(plan.matches(Path::new("/proj/a.txt")));
        assert!(!plan.matches(Path::new("/proj/b.txt")));
        assert!(!plan.matches(Path::new("/proj/src/a.txt")));
    }

    #[test]
    fn literal_directory_matches_everything_beneath() {
        let fs = project();
        let plan = WatchPlan::compile(&"src".into(), &settings_in("/proj"), &fs).unwrap();

        assert_eq!(
            plan.watch_roots(&fs),
            vec![(PathBuf::from("/proj/src"), RecursiveMode::Recursive)]
        );
        assert!(plan.matches(Path::new("/proj/src/util/mod.rs")));
        assert!(!plan.matches(Path::new("/proj/src")));
        assert!(!plan.matches(Path::new("/proj/a.txt")));
    }

    #[test]
    fn glob_star_does_not_cross_directories() {
        let fs = project();
        let plan =
            WatchPlan::compile(&"src/*.rs".into(), &settings_in("/proj"), &fs).unwrap();

        assert!(plan.matches(Path::new("/proj/src/main.rs")));
        assert!(!plan.matches(Path::new("/proj/src/util/mod.rs")));
        assert!(!plan.matches(Path::new("/proj/src/notes.md")));

        let deep =
            WatchPlan::compile(&"src/**/*.rs".into(), &settings_in("/proj"), &fs).unwrap();
        assert!(deep.matches(Path::new("/proj/src/util/mod.rs")));
        assert!(deep.matches(Path::new("/proj/src/main.rs")));
    }

    #[test]
    fn ignored_and_depth_filter_matches() {
        let fs = project();
        let settings = WatcherSettings {
            ignored: "**/*.md".into(),
            depth: Some(0),
            ..settings_in("/proj")
        };
        let plan = WatchPlan::compile(&"src".into(), &settings, &fs).unwrap();

        assert!(plan.matches(Path::new("/proj/src/main.rs")));
        assert!(!plan.matches(Path::new("/proj/src/notes.md")));
        assert!(!plan.matches(Path::new("/proj/src/util/mod.rs")));
    }

    #[test]
    fn display_path_is_relative_only_with_cwd() {
        let fs = project();
        let with_cwd = WatchPlan::compile(&"a.txt".into(), &settings_in("/proj"), &fs).unwrap();
        assert_eq!(
            with_cwd.display_path(Path::new("/proj/a.txt")),
            PathBuf::from("a.txt")
        );

        let absolute =
            WatchPlan::compile(&"/proj/a.txt".into(), &WatcherSettings::default(), &fs).unwrap();
        assert_eq!(
            absolute.display_path(Path::new("/proj/a.txt")),
            PathBuf::from("/proj/a.txt")
        );
    }

    #[test]
    fn missing_roots_fall_back_to_existing_ancestor() {
        let fs = project();
        let plan = WatchPlan::compile(
            &["dist/bundle.js", "gen/out/**/*.rs"].into(),
            &settings_in("/proj"),
            &fs,
        )
        .unwrap();

        assert_eq!(
            plan.watch_roots(&fs),
            vec![(PathBuf::from("/proj"), RecursiveMode::Recursive)]
        );
        assert!(plan.matches(Path::new("/proj/dist/bundle.js")));
        assert!(plan.matches(Path::new("/proj/gen/out/x/lib.rs")));
        assert!(!plan.matches(Path::new("/proj/bundle.js")));
        assert!(!plan.matches(Path::new("/proj/src/main.rs")));
    }

    #[test]
    fn shared_root_is_registered_once_recursively() {
        let fs = project();
        let plan = WatchPlan::compile(
            &["a.txt", "dist/bundle.js"].into(),
            &settings_in("/proj"),
            &fs,
        )
        .unwrap();

        assert_eq!(
            plan.watch_roots(&fs),
            vec![(PathBuf::from("/proj"), RecursiveMode::Recursive)]
        );
    }

    #[test]
    fn multiple_entries_share_roots() {
        let fs = project();
        let plan = WatchPlan::compile(
            &["src/*.rs", "src/*.md", "a.txt"].into(),
            &settings_in("/proj"),
            &fs,
        )
        .unwrap();

        assert_eq!(plan.entries().len(), 3);
        assert_eq!(plan.watch_roots(&fs).len(), 2);
    }

    #[test]
    fn empty_and_invalid_patterns_are_rejected() {
        let fs = project();
        assert!(matches!(
            WatchPlan::compile(&"".into(), &settings_in("/proj"), &fs),
            Err(TaskwatchError::ConfigError(_))
        ));
        assert!(matches!(
            WatchPlan::compile(&"src/[".into(), &settings_in("/proj"), &fs),
            Err(TaskwatchError::Pattern(_))
        ));
    }
}
