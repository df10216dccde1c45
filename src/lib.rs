pub mod config;
pub mod error;
pub mod extractor;
pub mod languages;
pub mod models;

use once_cell::sync::Lazy;

pub use config::{ExtractorConfig, InferencePolicy};
pub use error::{ExtractorError, Result};
pub use extractor::{
    extract_tools, ExtractionProgress, ExtractionReport, FileWalker, ModuleArena, Parser, ScanSummary,
    SyntaxCollector, ToolExtractor,
};
pub use languages::LanguageRegistry;
pub use models::{
    ExportDeclaration, FunctionDefinition, ImportSource, PackageExportTable, ParamKind, Parameter,
    QualifiedName, SkippedFile, SourceFile, ToolRecord,
};

/// Global language registry instance (lazily initialized)
pub static REGISTRY: Lazy<LanguageRegistry> = Lazy::new(LanguageRegistry::new);
