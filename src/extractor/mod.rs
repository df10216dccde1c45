//! Whole-repository extraction.
//!
//! The pipeline runs in two passes. Collection parses every file in
//! parallel and produces an immutable [`ModuleArena`]; synthesis then reads
//! the arena to follow package re-exports, and the emitter merges both
//! record sets.

pub mod arena;
pub mod collector;
pub mod emitter;
pub mod module_path;
pub mod parser;
pub mod progress;
pub mod signature;
pub mod synthesizer;
pub mod walker;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;

pub use arena::ModuleArena;
pub use collector::{CollectedFile, SyntaxCollector};
pub use emitter::{merge_records, write_records, write_summary, ScanSummary};
pub use module_path::ModulePathResolver;
pub use parser::{ParsedFile, Parser};
pub use progress::{ExtractionProgress, ProgressSnapshot};
pub use synthesizer::{Diagnostic, ExportSynthesizer, SynthesisResult};
pub use walker::FileWalker;

use crate::config::ExtractorConfig;
use crate::error::{ExtractorError, Result};
use crate::languages::LanguageRegistry;
use crate::models::{SkippedFile, ToolRecord};

/// Outcome of one extraction run
#[derive(Debug)]
pub struct ExtractionReport {
    /// Deduplicated records, sorted by id
    pub records: Vec<ToolRecord>,
    pub files_scanned: usize,
    pub skipped: Vec<SkippedFile>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ExtractionReport {
    pub fn files_skipped(&self) -> usize {
        self.skipped.len()
    }

    /// Unresolved declarations that point inside the repository
    pub fn unresolved_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::Unresolved { external: false, .. }))
            .count()
    }

    pub fn summary(&self, output: &Path) -> ScanSummary {
        ScanSummary {
            files_scanned: self.files_scanned,
            files_skipped: self.files_skipped(),
            tools_found: self.records.len(),
            unresolved: self.unresolved_count(),
            output: output.to_path_buf(),
        }
    }
}

pub struct ToolExtractor {
    config: Arc<ExtractorConfig>,
    progress: Option<ExtractionProgress>,
}

impl ToolExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            config: Arc::new(config),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ExtractionProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Scans `root` and returns every publicly reachable function.
    ///
    /// Only an unusable root fails the run. Files that cannot be read or
    /// parsed are reported in `skipped`, declarations that cannot be
    /// resolved in `diagnostics`.
    pub fn extract(&self, root: &Path) -> Result<ExtractionReport> {
        let walker = FileWalker::new(LanguageRegistry::new(), Arc::clone(&self.config));
        let files = walker.walk(root)?;
        tracing::info!("Found {} Python files under {}", files.len(), root.display());

        let outcomes = match self.config.threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| ExtractorError::Config(e.to_string()))?;
                pool.install(|| self.collect_all(root, &files))
            }
            None => self.collect_all(root, &files),
        };

        let mut collected = Vec::with_capacity(outcomes.len());
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(file) => collected.push(file),
                Err(skip) => skipped.push(skip),
            }
        }

        let arena = ModuleArena::new(collected);
        let synthesis = ExportSynthesizer::new(&arena, self.config.inference).synthesize();
        let records = merge_records(&arena, &synthesis);

        tracing::info!(
            "Extracted {} tools from {} files ({} skipped, {} unresolved exports)",
            records.len(),
            files.len(),
            skipped.len(),
            synthesis.unresolved_count()
        );

        Ok(ExtractionReport {
            records,
            files_scanned: files.len(),
            skipped,
            diagnostics: synthesis.diagnostics,
        })
    }

    fn collect_all(&self, root: &Path, files: &[PathBuf]) -> Vec<std::result::Result<CollectedFile, SkippedFile>> {
        let resolver = ModulePathResolver::new(initializer_stem(), self.config.source_prefixes.clone());

        if let Some(progress) = &self.progress {
            progress.start(files.len());
        }

        let outcomes: Vec<_> = files
            .par_iter()
            .map(|path| {
                let outcome = collect_file(root, path, &resolver);
                if let Some(progress) = &self.progress {
                    match &outcome {
                        Ok(file) => progress.inc(file.definitions.len()),
                        Err(_) => progress.inc_skipped(),
                    }
                }
                outcome
            })
            .collect();

        if let Some(progress) = &self.progress {
            progress.finish();
        }
        outcomes
    }
}

fn initializer_stem() -> &'static str {
    crate::REGISTRY
        .get_by_name("python")
        .and_then(|grammar| grammar.initializer_stem())
        .unwrap_or("__init__")
}

fn collect_file(
    root: &Path,
    path: &Path,
    resolver: &ModulePathResolver,
) -> std::result::Result<CollectedFile, SkippedFile> {
    let Some(source) = resolver.resolve(root, path) else {
        return Err(skip(path.display().to_string(), "outside repository root".to_string()));
    };

    // Each worker gets its own parser; tree-sitter parsers are not shared
    let parser = Parser::new(LanguageRegistry::new());
    match parser.parse_file(path) {
        Ok(parsed) => Ok(SyntaxCollector::new().collect(&parsed, source)),
        Err(ExtractorError::Parse { message, .. }) => Err(skip(source.path, message)),
        Err(e) => Err(skip(source.path, e.to_string())),
    }
}

fn skip(path: String, reason: String) -> SkippedFile {
    tracing::warn!("Skipping {}: {}", path, reason);
    SkippedFile { path, reason }
}

/// Runs extraction over `root` with default settings
pub fn extract_tools(root: &Path) -> Result<ExtractionReport> {
    ToolExtractor::new(ExtractorConfig::default()).extract(root)
}
