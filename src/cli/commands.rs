use std::path::Path;

use anyhow::Context;

use tool_extractor::extractor::{write_records, write_summary};
use tool_extractor::{
    ExtractionProgress, ExtractorConfig, InferencePolicy, ToolExtractor, ToolRecord,
};

use super::OutputFormat;

fn load_config(path: Option<&Path>) -> anyhow::Result<ExtractorConfig> {
    match path {
        Some(path) => ExtractorConfig::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => Ok(ExtractorConfig::default()),
    }
}

pub fn extract(
    repo: &Path,
    out: &Path,
    config_path: Option<&Path>,
    inference: Option<InferencePolicy>,
    progress: bool,
) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(inference) = inference {
        config.inference = inference;
    }

    let mut extractor = ToolExtractor::new(config);
    if progress {
        extractor = extractor.with_progress(ExtractionProgress::with_terminal_bar());
    }

    let report = extractor.extract(repo)?;

    write_records(&report.records, out)
        .with_context(|| format!("Failed to write {}", out.display()))?;
    let summary = report.summary(out);
    let summary_path = write_summary(&summary, out)?;
    tracing::debug!("Summary written to {}", summary_path.display());

    println!(
        "Scanned {} files, found {} tools, skipped {} files",
        report.files_scanned,
        report.records.len(),
        report.files_skipped()
    );
    println!("Output: {}", out.display());

    Ok(())
}

pub fn list(
    repo: &Path,
    module: Option<&str>,
    config_path: Option<&Path>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let report = ToolExtractor::new(config).extract(repo)?;

    let records: Vec<&ToolRecord> = report
        .records
        .iter()
        .filter(|r| module.map_or(true, |prefix| module_matches(&r.module, prefix)))
        .collect();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        OutputFormat::Text => {
            if records.is_empty() {
                println!("No tools found");
                return Ok(());
            }
            for record in &records {
                println!("{} - {}:{}", record.id, record.file, record.lineno);
                println!("  {}", record.signature);
                if !record.doc_first_line.is_empty() {
                    println!("  {}", record.doc_first_line);
                }
            }
            println!("\n{} tools", records.len());
        }
    }

    Ok(())
}

/// `prefix` itself or any module beneath it
fn module_matches(module: &str, prefix: &str) -> bool {
    module == prefix
        || module
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('.'))
}
