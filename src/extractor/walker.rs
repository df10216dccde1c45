use std::path::{Path, PathBuf};
use std::sync::Arc;

use ignore::WalkBuilder;

use crate::config::ExtractorConfig;
use crate::error::{ExtractorError, Result};
use crate::languages::LanguageRegistry;

pub struct FileWalker {
    registry: LanguageRegistry,
    config: Arc<ExtractorConfig>,
}

impl FileWalker {
    pub fn new(registry: LanguageRegistry, config: Arc<ExtractorConfig>) -> Self {
        Self { registry, config }
    }

    /// Returns candidate source files under `root`, sorted by path.
    pub fn walk(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(ExtractorError::InvalidRoot(root.to_path_buf()));
        }

        let mut files = Vec::new();
        let respect_gitignore = self.config.respect_gitignore;
        let config = Arc::clone(&self.config);

        let walker = WalkBuilder::new(root)
            .hidden(true)
            .parents(respect_gitignore)
            .git_ignore(respect_gitignore)
            .git_global(respect_gitignore)
            .git_exclude(respect_gitignore)
            .ignore(respect_gitignore)
            .filter_entry(move |entry| {
                // The root is whatever the caller asked for, even if its name is excluded
                entry.depth() == 0
                    || !entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| config.is_excluded_name(name))
            })
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();
            if path.is_file() && self.is_supported(path) {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        Ok(files)
    }

    pub fn is_supported(&self, path: &Path) -> bool {
        self.registry.get_for_file(path).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;

    fn create_walker() -> FileWalker {
        FileWalker::new(LanguageRegistry::new(), Arc::new(ExtractorConfig::default()))
    }

    fn create_file(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut file = File::create(path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    fn relative_names(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_walk_finds_python_files() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "main.py", "def main(): pass");
        create_file(temp_dir.path(), "lib.py", "def lib(): pass");

        let walker = create_walker();
        let files = walker.walk(temp_dir.path()).unwrap();

        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|p| p.extension().unwrap() == "py"));
    }

    #[test]
    fn test_walk_recursive_and_sorted() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "setup.py", "");
        create_file(temp_dir.path(), "pkg/__init__.py", "");
        create_file(temp_dir.path(), "pkg/b.py", "");
        create_file(temp_dir.path(), "pkg/a.py", "");
        create_file(temp_dir.path(), "pkg/sub/deep.py", "");

        let walker = create_walker();
        let files = walker.walk(temp_dir.path()).unwrap();

        assert_eq!(
            relative_names(temp_dir.path(), &files),
            vec![
                "pkg/__init__.py",
                "pkg/a.py",
                "pkg/b.py",
                "pkg/sub/deep.py",
                "setup.py"
            ]
        );
    }

    #[test]
    fn test_walk_ignores_unsupported_files() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "main.py", "x = 1");
        create_file(temp_dir.path(), "README.md", "# Readme");
        create_file(temp_dir.path(), "stubs.pyi", "def f() -> int: ...");
        create_file(temp_dir.path(), "data.json", "{}");

        let walker = create_walker();
        let files = walker.walk(temp_dir.path()).unwrap();

        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_walk_skips_excluded_directories() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "pkg/core.py", "");
        create_file(temp_dir.path(), "tests/test_core.py", "");
        create_file(temp_dir.path(), "pkg/tests/test_inner.py", "");
        create_file(temp_dir.path(), "docs/conf.py", "");
        create_file(temp_dir.path(), "build/lib/pkg/core.py", "");
        create_file(temp_dir.path(), "pkg/__pycache__/core.py", "");
        create_file(temp_dir.path(), ".venv/lib/site.py", "");

        let walker = create_walker();
        let files = walker.walk(temp_dir.path()).unwrap();

        assert_eq!(relative_names(temp_dir.path(), &files), vec!["pkg/core.py"]);
    }

    #[test]
    fn test_walk_hidden_entries_ignored() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "visible.py", "");
        create_file(temp_dir.path(), ".hidden.py", "");
        create_file(temp_dir.path(), ".tox/env/mod.py", "");

        let walker = create_walker();
        let files = walker.walk(temp_dir.path()).unwrap();

        assert_eq!(relative_names(temp_dir.path(), &files), vec!["visible.py"]);
    }

    #[test]
    fn test_walk_extra_excluded_dirs() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "pkg/core.py", "");
        create_file(temp_dir.path(), "benchmarks/run.py", "");

        let config = ExtractorConfig {
            exclude_dirs: vec!["benchmarks".to_string()],
            ..Default::default()
        };
        let walker = FileWalker::new(LanguageRegistry::new(), Arc::new(config));
        let files = walker.walk(temp_dir.path()).unwrap();

        assert_eq!(relative_names(temp_dir.path(), &files), vec!["pkg/core.py"]);
    }

    #[test]
    fn test_walk_root_named_like_excluded_dir() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "build/pkg/mod.py", "");

        let walker = create_walker();
        let files = walker.walk(&temp_dir.path().join("build")).unwrap();

        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_walk_gitignore_not_honored_by_default() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), ".ignore", "generated/\n");
        create_file(temp_dir.path(), "generated/api.py", "");

        let walker = create_walker();
        let files = walker.walk(temp_dir.path()).unwrap();

        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_walk_ignore_file_honored_when_configured() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), ".ignore", "generated/\n");
        create_file(temp_dir.path(), "generated/api.py", "");
        create_file(temp_dir.path(), "pkg/api.py", "");

        let config = ExtractorConfig {
            respect_gitignore: true,
            ..Default::default()
        };
        let walker = FileWalker::new(LanguageRegistry::new(), Arc::new(config));
        let files = walker.walk(temp_dir.path()).unwrap();

        assert_eq!(relative_names(temp_dir.path(), &files), vec!["pkg/api.py"]);
    }

    #[test]
    fn test_walk_empty_directory() {
        let temp_dir = TempDir::new().unwrap();

        let walker = create_walker();
        let files = walker.walk(temp_dir.path()).unwrap();

        assert!(files.is_empty());
    }

    #[test]
    fn test_walk_rejects_file_root() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "single.py", "");

        let walker = create_walker();
        let err = walker.walk(&temp_dir.path().join("single.py")).unwrap_err();

        assert!(matches!(err, ExtractorError::InvalidRoot(_)));
    }

    #[test]
    fn test_walk_rejects_missing_root() {
        let walker = create_walker();
        let err = walker.walk(Path::new("/definitely/not/here")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_is_supported() {
        let walker = create_walker();
        assert!(walker.is_supported(Path::new("script.py")));
        assert!(walker.is_supported(Path::new("pkg/__init__.py")));
        assert!(!walker.is_supported(Path::new("file.txt")));
        assert!(!walker.is_supported(Path::new("Makefile")));
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_skips_dangling_symlink() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "real.py", "def real(): pass");
        std::os::unix::fs::symlink(temp_dir.path().join("missing.py"), temp_dir.path().join("ghost.py")).unwrap();

        let walker = create_walker();
        let files = walker.walk(temp_dir.path()).unwrap();

        assert_eq!(relative_names(temp_dir.path(), &files), vec!["real.py"]);
    }
}
