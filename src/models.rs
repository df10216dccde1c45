use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// =====================================================
// Collection Types
// =====================================================

/// A scanned source file with its resolved module identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Path relative to the repository root, always with `/` separators
    pub path: String,
    /// Dotted module identifier (e.g. `pkg.sub.mod`)
    pub module: String,
    /// True for `__init__.py` package initializers
    pub is_package: bool,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, module: impl Into<String>, is_package: bool) -> Self {
        Self {
            path: path.into(),
            module: module.into(),
            is_package,
        }
    }
}

/// How a parameter binds arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    PositionalOnly,
    PositionalOrKeyword,
    VarPositional,
    KeywordOnly,
    VarKeyword,
}

/// A single function parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub kind: ParamKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    #[serde(default)]
    pub has_default: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            annotation: None,
            has_default: false,
        }
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }
}

/// A top-level function definition found during collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_annotation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_first_line: Option<String>,
    #[serde(default)]
    pub is_async: bool,
    /// Defining file, relative to the repository root
    pub file: String,
    /// 1-based line of the `def` (or `async def`) keyword
    pub lineno: u32,
    /// Rendered signature, computed once at collection time
    pub signature: String,
}

impl FunctionDefinition {
    /// Publicness rule: no leading underscore, unless the module's export
    /// list names the function explicitly.
    pub fn is_public(&self, export_list: Option<&[String]>) -> bool {
        !self.name.starts_with('_')
            || export_list.is_some_and(|names| names.iter().any(|n| n == &self.name))
    }
}

/// Module reference exactly as written in an import statement
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImportSource {
    /// Number of leading dots (0 for absolute imports)
    pub level: usize,
    /// Dotted module path after the dots, if any
    pub module: Option<String>,
}

impl ImportSource {
    pub fn absolute(module: impl Into<String>) -> Self {
        Self {
            level: 0,
            module: Some(module.into()),
        }
    }

    pub fn relative(level: usize, module: Option<&str>) -> Self {
        Self {
            level,
            module: module.map(|m| m.to_string()),
        }
    }
}

impl fmt::Display for ImportSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", ".".repeat(self.level), self.module.as_deref().unwrap_or(""))
    }
}

/// Export declarations stated in a package initializer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExportDeclaration {
    /// `from M import name as local` (or without `as`, where local == name)
    ReExport {
        local: String,
        source: ImportSource,
        name: String,
        line: u32,
    },
    /// `from . import sub as local` or `import a.b as local`.
    /// `source` designates the submodule itself.
    SubpackageAlias {
        local: String,
        source: ImportSource,
        line: u32,
    },
    /// `__all__ = [...]`
    ExportList { names: Vec<String> },
}

// =====================================================
// Synthesis Types
// =====================================================

/// Fully qualified location of an original definition
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    pub module: String,
    pub name: String,
}

impl QualifiedName {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.module.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.module, self.name)
        }
    }
}

/// Names a module exposes, each pointing at the definition it really is.
///
/// Only the synthesizer constructs tables, and only after the target has
/// been found in the arena, so every entry is resolvable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageExportTable {
    pub module: String,
    entries: BTreeMap<String, QualifiedName>,
}

impl PackageExportTable {
    pub(crate) fn from_entries(
        module: impl Into<String>,
        entries: BTreeMap<String, QualifiedName>,
    ) -> Self {
        Self {
            module: module.into(),
            entries,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &QualifiedName)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =====================================================
// Output Types
// =====================================================

/// The emitted unit: one publicly reachable function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRecord {
    pub id: String,
    pub module: String,
    pub name: String,
    pub signature: String,
    pub doc_first_line: String,
    pub file: String,
    pub lineno: u32,
}

impl ToolRecord {
    pub fn make_id(module: &str, name: &str) -> String {
        format!("{}:{}", module, name)
    }

    /// Record for a function exposed as `module:name`. Everything except the
    /// identity comes from the original definition.
    pub fn exposed(module: &str, name: &str, def: &FunctionDefinition) -> Self {
        Self {
            id: Self::make_id(module, name),
            module: module.to_string(),
            name: name.to_string(),
            signature: def.signature.clone(),
            doc_first_line: def.doc_first_line.clone().unwrap_or_default(),
            file: def.file.clone(),
            lineno: def.lineno,
        }
    }

    /// Record for a function at its defining module
    pub fn direct(module: &str, def: &FunctionDefinition) -> Self {
        Self::exposed(module, &def.name, def)
    }
}

/// A file that was scanned but excluded from analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}
