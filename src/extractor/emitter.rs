//! Record merging and artifact output.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::extractor::arena::ModuleArena;
use crate::extractor::synthesizer::SynthesisResult;
use crate::models::ToolRecord;

pub const SUMMARY_FILE_NAME: &str = "tools_summary.txt";

/// Merges direct and synthesized records. Direct records are inserted
/// first, so an exposed id that collides with a real definition keeps the
/// definition. Only files that own their module identifier contribute
/// direct records. Output is sorted by id.
pub fn merge_records(arena: &ModuleArena, synthesis: &SynthesisResult) -> Vec<ToolRecord> {
    let mut by_id: BTreeMap<String, ToolRecord> = BTreeMap::new();

    for file in arena.modules() {
        for record in file.direct_records() {
            by_id.entry(record.id.clone()).or_insert(record);
        }
    }

    for table in &synthesis.tables {
        for (exposed, target) in table.iter() {
            // Tables only hold targets found in the arena
            let Some(def) = arena.definition(target) else {
                continue;
            };
            let record = ToolRecord::exposed(&table.module, exposed, def);
            by_id.entry(record.id.clone()).or_insert(record);
        }
    }

    by_id.into_values().collect()
}

/// Counts reported alongside the records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub tools_found: usize,
    pub unresolved: usize,
    pub output: PathBuf,
}

impl ScanSummary {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Scanned files: {}", self.files_scanned);
        let _ = writeln!(out, "Files skipped: {}", self.files_skipped);
        let _ = writeln!(out, "Tools found: {}", self.tools_found);
        let _ = writeln!(out, "Unresolved exports: {}", self.unresolved);
        let _ = writeln!(out, "Output: {}", self.output.display());
        out
    }
}

/// Writes records as a pretty-printed JSON array
pub fn write_records(records: &[ToolRecord], out: &Path) -> Result<()> {
    let mut json = serde_json::to_string_pretty(records)?;
    json.push('\n');
    write_atomic(out, json.as_bytes())
}

/// Writes the summary next to `out` and returns its path
pub fn write_summary(summary: &ScanSummary, out: &Path) -> Result<PathBuf> {
    let path = summary_path(out);
    write_atomic(&path, summary.render().as_bytes())?;
    Ok(path)
}

pub fn summary_path(out: &Path) -> PathBuf {
    match out.parent() {
        Some(parent) => parent.join(SUMMARY_FILE_NAME),
        None => PathBuf::from(SUMMARY_FILE_NAME),
    }
}

/// Writes through a temp file in the target directory, then renames it into
/// place. Readers never observe a partially written file.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".tools-")
        .suffix(".tmp")
        .tempfile_in(&dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    tracing::debug!("Wrote {} ({} bytes)", path.display(), contents.len());
    Ok(())
}
