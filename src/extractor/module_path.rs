//! Maps file paths to dotted module identifiers.

use std::path::{Component, Path};

use crate::models::SourceFile;

/// Resolves repository-relative paths to import-time module names
#[derive(Debug, Clone)]
pub struct ModulePathResolver {
    initializer_stem: String,
    source_prefixes: Vec<String>,
}

impl ModulePathResolver {
    pub fn new(initializer_stem: impl Into<String>, source_prefixes: Vec<String>) -> Self {
        Self {
            initializer_stem: initializer_stem.into(),
            source_prefixes,
        }
    }

    /// Builds the `SourceFile` for `path`, which must lie under `root`.
    /// Returns `None` for paths outside the root.
    pub fn resolve(&self, root: &Path, path: &Path) -> Option<SourceFile> {
        let relative = path.strip_prefix(root).ok()?;

        let mut segments: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        if segments.is_empty() {
            return None;
        }
        let display_path = segments.join("/");

        let file_name = segments.pop()?;
        let stem = Path::new(&file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or(file_name);

        let is_package = stem == self.initializer_stem;
        if !is_package || segments.is_empty() {
            segments.push(stem);
        }

        if segments.len() > 1 && self.source_prefixes.iter().any(|p| p == &segments[0]) {
            segments.remove(0);
        }

        Some(SourceFile::new(display_path, segments.join("."), is_package))
    }
}

impl Default for ModulePathResolver {
    fn default() -> Self {
        Self::new("__init__", vec!["src".to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn resolve(relative: &str) -> SourceFile {
        let root = PathBuf::from("/repo");
        ModulePathResolver::default()
            .resolve(&root, &root.join(relative))
            .unwrap()
    }

    #[test]
    fn test_plain_module() {
        let file = resolve("pkg/sub/mod.py");
        assert_eq!(file.module, "pkg.sub.mod");
        assert_eq!(file.path, "pkg/sub/mod.py");
        assert!(!file.is_package);
    }

    #[test]
    fn test_package_initializer_names_package() {
        let file = resolve("pkg/sub/__init__.py");
        assert_eq!(file.module, "pkg.sub");
        assert!(file.is_package);
    }

    #[test]
    fn test_src_layout_stripped() {
        assert_eq!(resolve("src/pkg/impl.py").module, "pkg.impl");
        assert_eq!(resolve("src/pkg/__init__.py").module, "pkg");
    }

    #[test]
    fn test_src_prefix_kept_when_alone() {
        assert_eq!(resolve("src/__init__.py").module, "src");
        assert_eq!(resolve("src.py").module, "src");
    }

    #[test]
    fn test_src_only_stripped_at_top() {
        assert_eq!(resolve("pkg/src/util.py").module, "pkg.src.util");
    }

    #[test]
    fn test_root_initializer() {
        let file = resolve("__init__.py");
        assert_eq!(file.module, "__init__");
        assert!(file.is_package);
    }

    #[test]
    fn test_top_level_script() {
        assert_eq!(resolve("setup.py").module, "setup");
    }

    #[test]
    fn test_custom_prefixes() {
        let resolver = ModulePathResolver::new("__init__", vec!["lib".to_string()]);
        let root = PathBuf::from("/repo");
        let file = resolver.resolve(&root, &root.join("lib/pkg/mod.py")).unwrap();
        assert_eq!(file.module, "pkg.mod");

        let file = resolver.resolve(&root, &root.join("src/pkg/mod.py")).unwrap();
        assert_eq!(file.module, "src.pkg.mod");
    }

    #[test]
    fn test_outside_root() {
        let resolver = ModulePathResolver::default();
        assert!(resolver
            .resolve(Path::new("/repo"), Path::new("/elsewhere/mod.py"))
            .is_none());
    }
}
