//! Export synthesis: the whole-tree pass that follows package-level
//! re-exports and aliases back to the definitions they name.
//!
//! For every package initializer, in order of preference:
//! - explicit re-exports (`from .impl import compute as run`) resolve to
//!   the named definition
//! - subpackage aliases (`from . import preprocessing as pp`) re-expose the
//!   child's own export table under `<package>.<alias>`
//! - with neither, exports are inferred from the definitions under the
//!   package, restricted to `__all__` when present
//!
//! Synthesis only reads the [`ModuleArena`]; packages are independent and
//! are processed in parallel.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::config::InferencePolicy;
use crate::error::ExtractorError;
use crate::extractor::arena::ModuleArena;
use crate::extractor::collector::CollectedFile;
use crate::models::{ExportDeclaration, ImportSource, PackageExportTable, QualifiedName};

/// Re-export hops followed before a target counts as unresolved
const MAX_REEXPORT_DEPTH: usize = 8;

/// Non-fatal findings from synthesis
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A re-export or alias whose target was not found. `external` is set
    /// when the target lies outside every collected top-level package.
    Unresolved {
        package: String,
        exposed: String,
        target: String,
        external: bool,
    },
    /// Inference found several definitions for one exposed name
    Ambiguity {
        module: String,
        name: String,
        chosen: String,
        candidates: Vec<String>,
    },
}

#[derive(Debug, Default)]
pub struct SynthesisResult {
    pub tables: Vec<PackageExportTable>,
    pub diagnostics: Vec<Diagnostic>,
}

impl SynthesisResult {
    /// Unresolved declarations that point inside the analyzed tree
    pub fn unresolved_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::Unresolved { external: false, .. }))
            .count()
    }

    pub fn ambiguity_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::Ambiguity { .. }))
            .count()
    }
}

/// A definition competing for an inferred export name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate<'a> {
    pub module: &'a str,
    pub file: &'a str,
}

/// How well a defining module's leaf segment matches the exposed name:
/// `name` 3, `_name` 2, any other public leaf 1, any other private leaf 0.
pub fn leaf_match_score(module: &str, name: &str) -> u8 {
    let leaf = module.rsplit('.').next().unwrap_or(module);
    if leaf == name {
        3
    } else if leaf.strip_prefix('_') == Some(name) {
        2
    } else if !leaf.starts_with('_') {
        1
    } else {
        0
    }
}

/// Orders candidates best first: higher leaf score, then file path.
pub fn compare_candidates(name: &str, a: &Candidate, b: &Candidate) -> Ordering {
    leaf_match_score(b.module, name)
        .cmp(&leaf_match_score(a.module, name))
        .then_with(|| a.file.cmp(b.file))
}

/// Resolves an import source written inside the initializer of `package`.
///
/// The initializer's own identifier is `<package>.__init__`, so `level`
/// dots strip `level - 1` segments from the package name. Returns `None`
/// when the import climbs above the top-level package.
pub fn resolve_import(package: &str, source: &ImportSource) -> Option<String> {
    if source.level == 0 {
        return source.module.clone();
    }

    let mut parts: Vec<&str> = package.split('.').filter(|p| !p.is_empty()).collect();
    let climb = source.level - 1;
    if climb > parts.len() {
        return None;
    }
    parts.truncate(parts.len() - climb);
    if let Some(module) = source.module.as_deref() {
        parts.extend(module.split('.'));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("."))
    }
}

/// Explicit entries of one initializer plus the aliases it declares
struct Declared {
    entries: BTreeMap<String, QualifiedName>,
    aliases: Vec<(String, String)>,
    diagnostics: Vec<Diagnostic>,
}

pub struct ExportSynthesizer<'a> {
    arena: &'a ModuleArena,
    policy: InferencePolicy,
}

impl<'a> ExportSynthesizer<'a> {
    pub fn new(arena: &'a ModuleArena, policy: InferencePolicy) -> Self {
        Self { arena, policy }
    }

    pub fn synthesize(&self) -> SynthesisResult {
        let packages = self.arena.packages();

        let per_package: Vec<SynthesisResult> = packages
            .par_iter()
            .map(|package| self.synthesize_package(package))
            .collect();

        let mut result = SynthesisResult::default();
        for partial in per_package {
            result.tables.extend(partial.tables);
            result.diagnostics.extend(partial.diagnostics);
        }

        tracing::debug!(
            "Synthesized {} export tables from {} packages",
            result.tables.len(),
            packages.len()
        );
        result
    }

    /// Export tables exposed by one package initializer
    pub fn synthesize_package(&self, package: &CollectedFile) -> SynthesisResult {
        let module = package.source.module.as_str();
        let declared = self.declared(package);
        let mut result = SynthesisResult {
            tables: Vec::new(),
            diagnostics: declared.diagnostics,
        };

        if !declared.entries.is_empty() {
            result
                .tables
                .push(PackageExportTable::from_entries(module, declared.entries));
        }

        for (alias, child) in &declared.aliases {
            let exposing = format!("{}.{}", module, alias);
            let table = self.exports_of(child, &exposing, &mut result.diagnostics);
            if table.is_empty() {
                tracing::debug!("Alias {} -> {} exposes no functions", exposing, child);
            } else {
                result.tables.push(table);
            }
        }

        if !package.has_re_exports() && !package.has_aliases() && self.should_infer(package) {
            let table = self.infer(module, module, package.export_list.as_deref(), &mut result.diagnostics);
            if !table.is_empty() {
                result.tables.push(table);
            }
        }

        result
    }

    fn should_infer(&self, package: &CollectedFile) -> bool {
        match self.policy {
            InferencePolicy::AllPackages => true,
            InferencePolicy::Declared => package.export_list.as_ref().is_some_and(|l| !l.is_empty()),
        }
    }

    fn declared(&self, package: &CollectedFile) -> Declared {
        let module = package.source.module.as_str();
        let mut declared = Declared {
            entries: BTreeMap::new(),
            aliases: Vec::new(),
            diagnostics: Vec::new(),
        };

        for declaration in &package.declarations {
            match declaration {
                ExportDeclaration::ReExport {
                    local, source, name, ..
                } => {
                    let Some(target_module) = resolve_import(module, source) else {
                        declared
                            .diagnostics
                            .push(self.unresolved(module, local, &format!("{}.{}", source, name)));
                        continue;
                    };
                    let target = QualifiedName::new(target_module, name.clone());
                    if let Some(found) = self.lookup_export(&target, MAX_REEXPORT_DEPTH) {
                        // Later bindings of the same local name win, as at runtime
                        declared.entries.insert(local.clone(), found);
                    } else if self.arena.contains_module(&target.to_string()) {
                        // `from .pkg import submodule as alias`
                        declared.aliases.push((local.clone(), target.to_string()));
                    } else {
                        declared
                            .diagnostics
                            .push(self.unresolved(module, local, &target.to_string()));
                    }
                }
                ExportDeclaration::SubpackageAlias { local, source, .. } => {
                    match resolve_import(module, source) {
                        Some(child) if self.arena.contains_module(&child) => {
                            declared.aliases.push((local.clone(), child));
                        }
                        Some(child) => declared.diagnostics.push(self.unresolved(module, local, &child)),
                        None => declared
                            .diagnostics
                            .push(self.unresolved(module, local, &source.to_string())),
                    }
                }
                ExportDeclaration::ExportList { .. } => {}
            }
        }

        declared
    }

    /// Follows `target` through package re-exports until it reaches a
    /// definition. `from .sub import run` finds `run` even when `sub` only
    /// re-exports it from a private module.
    fn lookup_export(&self, target: &QualifiedName, depth: usize) -> Option<QualifiedName> {
        if self.arena.definition(target).is_some() {
            return Some(target.clone());
        }
        if depth == 0 {
            return None;
        }

        let package = self.arena.module(&target.module).filter(|f| f.source.is_package)?;
        package.declarations.iter().rev().find_map(|declaration| match declaration {
            ExportDeclaration::ReExport {
                local, source, name, ..
            } if local == &target.name => {
                let module = resolve_import(&target.module, source)?;
                self.lookup_export(&QualifiedName::new(module, name.clone()), depth - 1)
            }
            _ => None,
        })
    }

    /// What `child` exposes when aliased. A package that declares
    /// re-exports exposes them together with its own functions; anything
    /// else exposes its inferred exports.
    fn exports_of(&self, child: &str, exposing: &str, diagnostics: &mut Vec<Diagnostic>) -> PackageExportTable {
        let child_file = self.arena.module(child);

        if let Some(file) = child_file.filter(|f| f.source.is_package && f.has_re_exports()) {
            // Unresolved entries are reported when the child itself is synthesized
            let mut entries = self.declared(file).entries;
            for def in file.public_definitions() {
                // Own definitions win, matching the direct records
                entries.insert(def.name.clone(), QualifiedName::new(child, def.name.clone()));
            }
            return PackageExportTable::from_entries(exposing, entries);
        }

        let export_list = child_file.and_then(|f| f.export_list.as_deref());
        self.infer(child, exposing, export_list, diagnostics)
    }

    /// Infers exports of `package` from the public definitions beneath it.
    /// Each exposed name goes to the best candidate per `compare_candidates`.
    fn infer(
        &self,
        package: &str,
        exposing: &str,
        export_list: Option<&[String]>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> PackageExportTable {
        let restrict = export_list.filter(|names| !names.is_empty());
        let scope = self.inference_scope(package);

        let mut groups: BTreeMap<&str, Vec<Candidate>> = BTreeMap::new();
        for (file, def) in self.arena.definitions_under(scope) {
            if restrict.is_some_and(|names| !names.iter().any(|n| n == &def.name)) {
                continue;
            }
            groups.entry(def.name.as_str()).or_default().push(Candidate {
                module: file.source.module.as_str(),
                file: file.source.path.as_str(),
            });
        }

        let mut entries = BTreeMap::new();
        for (name, mut candidates) in groups {
            candidates.sort_by(|a, b| compare_candidates(name, a, b));
            let best = candidates[0];

            if candidates.len() > 1 {
                tracing::info!(
                    "Ambiguous export {}.{}: {} candidates, chose {}",
                    exposing,
                    name,
                    candidates.len(),
                    best.file
                );
                diagnostics.push(Diagnostic::Ambiguity {
                    module: exposing.to_string(),
                    name: name.to_string(),
                    chosen: best.file.to_string(),
                    candidates: candidates.iter().map(|c| c.file.to_string()).collect(),
                });
            }

            entries.insert(name.to_string(), QualifiedName::new(best.module, name));
        }

        PackageExportTable::from_entries(exposing, entries)
    }

    /// Under the `declared` policy a subpackage with no functions beneath it
    /// draws candidates from its whole top-level package, so an `__all__`
    /// may name functions defined in sibling packages.
    fn inference_scope<'p>(&self, package: &'p str) -> &'p str {
        if self.policy != InferencePolicy::Declared || self.arena.definitions_under(package).next().is_some() {
            return package;
        }
        match package.split_once('.') {
            Some((top, _)) => {
                tracing::debug!("No functions under {}, inferring from {}", package, top);
                top
            }
            None => package,
        }
    }

    fn unresolved(&self, package: &str, exposed: &str, target: &str) -> Diagnostic {
        let external = !self.arena.owns_root_of(target);
        let error = ExtractorError::Resolution {
            package: package.to_string(),
            exposed: exposed.to_string(),
            target: target.to_string(),
        };
        if external {
            tracing::debug!("{}", error);
        } else {
            tracing::warn!("{}", error);
        }
        Diagnostic::Unresolved {
            package: package.to_string(),
            exposed: exposed.to_string(),
            target: target.to_string(),
            external,
        }
    }
}
