//! Read-only view over every collected file, keyed by module identifier.

use std::collections::{BTreeMap, HashMap};

use crate::extractor::collector::CollectedFile;
use crate::models::{FunctionDefinition, QualifiedName};

/// Location of a definition inside the arena: (file index, definition index)
type DefinitionSlot = (usize, usize);

pub struct ModuleArena {
    files: Vec<CollectedFile>,
    by_module: BTreeMap<String, usize>,
    public_definitions: HashMap<QualifiedName, DefinitionSlot>,
}

impl ModuleArena {
    /// Builds the arena. Files are ordered by path; when two files map to the
    /// same module the first one in path order owns the identifier.
    pub fn new(mut files: Vec<CollectedFile>) -> Self {
        files.sort_by(|a, b| a.source.path.cmp(&b.source.path));

        let mut by_module: BTreeMap<String, usize> = BTreeMap::new();
        let mut public_definitions = HashMap::new();

        for (file_idx, file) in files.iter().enumerate() {
            if let Some(&owner) = by_module.get(&file.source.module) {
                tracing::debug!(
                    "Module {} defined by both {} and {}; keeping the first",
                    file.source.module,
                    files[owner].source.path,
                    file.source.path
                );
                continue;
            }
            by_module.insert(file.source.module.clone(), file_idx);

            let export_list = file.export_list.as_deref();
            for (def_idx, def) in file.definitions.iter().enumerate() {
                if def.is_public(export_list) {
                    public_definitions.insert(
                        QualifiedName::new(file.source.module.clone(), def.name.clone()),
                        (file_idx, def_idx),
                    );
                }
            }
        }

        Self {
            files,
            by_module,
            public_definitions,
        }
    }

    /// Files that own their module identifier, in module order. A file that
    /// lost an identifier collision is not listed.
    pub fn modules(&self) -> impl Iterator<Item = &CollectedFile> {
        self.by_module.values().map(|&idx| &self.files[idx])
    }

    pub fn module(&self, module: &str) -> Option<&CollectedFile> {
        self.by_module.get(module).map(|&idx| &self.files[idx])
    }

    /// Package initializers, in module order
    pub fn packages(&self) -> Vec<&CollectedFile> {
        self.modules().filter(|f| f.source.is_package).collect()
    }

    /// Public definition named `qualified`, if one was collected
    pub fn definition(&self, qualified: &QualifiedName) -> Option<&FunctionDefinition> {
        self.public_definitions
            .get(qualified)
            .map(|&(file_idx, def_idx)| &self.files[file_idx].definitions[def_idx])
    }

    /// True if `module` was collected, or is a directory that holds
    /// collected modules without an initializer of its own
    pub fn contains_module(&self, module: &str) -> bool {
        self.modules_under(module).next().is_some()
    }

    /// True if any collected module shares the top-level segment of `module`
    pub fn owns_root_of(&self, module: &str) -> bool {
        let root = module.split('.').next().unwrap_or(module);
        !root.is_empty() && self.contains_module(root)
    }

    /// Public definitions in `package` itself or anywhere beneath it, in
    /// module order
    pub fn definitions_under<'a>(
        &'a self,
        package: &'a str,
    ) -> impl Iterator<Item = (&'a CollectedFile, &'a FunctionDefinition)> + 'a {
        self.modules_under(package).flat_map(|file| {
            file.public_definitions().map(move |def| (file, def))
        })
    }

    fn modules_under<'a>(&'a self, package: &'a str) -> impl Iterator<Item = &'a CollectedFile> + 'a {
        self.by_module
            .range::<str, _>((std::ops::Bound::Included(package), std::ops::Bound::Unbounded))
            .take_while(move |(module, _)| module.starts_with(package))
            .filter(move |(module, _)| {
                module.len() == package.len() || module[package.len()..].starts_with('.')
            })
            .map(|(_, &idx)| &self.files[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceFile;

    fn def(name: &str, file: &str) -> FunctionDefinition {
        FunctionDefinition {
            name: name.to_string(),
            parameters: Vec::new(),
            return_annotation: None,
            doc_first_line: None,
            is_async: false,
            file: file.to_string(),
            lineno: 1,
            signature: format!("def {}()", name),
        }
    }

    fn file(path: &str, module: &str, names: &[&str]) -> CollectedFile {
        CollectedFile {
            source: SourceFile::new(path, module, path.ends_with("__init__.py")),
            definitions: names.iter().map(|n| def(n, path)).collect(),
            export_list: None,
            declarations: Vec::new(),
        }
    }

    fn sample_arena() -> ModuleArena {
        ModuleArena::new(vec![
            file("pkg/sub/core.py", "pkg.sub.core", &["deep"]),
            file("pkg/__init__.py", "pkg", &["top", "_private"]),
            file("pkg/impl.py", "pkg.impl", &["compute"]),
            file("pkg_extra/mod.py", "pkg_extra.mod", &["other"]),
            file("ns/inner.py", "ns.inner", &["spaced"]),
        ])
    }

    #[test]
    fn test_modules_in_module_order() {
        let arena = sample_arena();
        let modules: Vec<&str> = arena.modules().map(|f| f.source.module.as_str()).collect();
        assert_eq!(
            modules,
            vec!["ns.inner", "pkg", "pkg.impl", "pkg.sub.core", "pkg_extra.mod"]
        );
    }

    #[test]
    fn test_definition_lookup_public_only() {
        let arena = sample_arena();
        assert!(arena.definition(&QualifiedName::new("pkg.impl", "compute")).is_some());
        assert!(arena.definition(&QualifiedName::new("pkg", "top")).is_some());
        assert!(arena.definition(&QualifiedName::new("pkg", "_private")).is_none());
        assert!(arena.definition(&QualifiedName::new("pkg.impl", "missing")).is_none());
    }

    #[test]
    fn test_definitions_under_respects_segment_boundary() {
        let arena = sample_arena();
        let names: Vec<&str> = arena
            .definitions_under("pkg")
            .map(|(_, d)| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["top", "compute", "deep"]);
    }

    #[test]
    fn test_contains_module() {
        let arena = sample_arena();
        assert!(arena.contains_module("pkg.impl"));
        assert!(arena.contains_module("ns"));
        assert!(!arena.contains_module("pkg.missing"));
        assert!(!arena.contains_module("pk"));
    }

    #[test]
    fn test_owns_root_of() {
        let arena = sample_arena();
        assert!(arena.owns_root_of("pkg.anything.here"));
        assert!(!arena.owns_root_of("numpy.linalg"));
    }

    #[test]
    fn test_packages() {
        let arena = sample_arena();
        let packages: Vec<&str> = arena.packages().iter().map(|f| f.source.module.as_str()).collect();
        assert_eq!(packages, vec!["pkg"]);
    }

    #[test]
    fn test_module_collision_keeps_first_path() {
        let arena = ModuleArena::new(vec![
            file("pkg/tools/__init__.py", "pkg.tools", &["from_package"]),
            file("pkg/tools.py", "pkg.tools", &["from_module"]),
        ]);
        assert_eq!(arena.module("pkg.tools").unwrap().source.path, "pkg/tools.py");
        let owners: Vec<&str> = arena.modules().map(|f| f.source.path.as_str()).collect();
        assert_eq!(owners, vec!["pkg/tools.py"]);
        assert!(arena.definition(&QualifiedName::new("pkg.tools", "from_module")).is_some());
        assert!(arena.definition(&QualifiedName::new("pkg.tools", "from_package")).is_none());
    }
}
