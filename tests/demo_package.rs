//! Extraction over the checked-in `demos/sample-package` fixture.

use std::path::PathBuf;

use tool_extractor::extractor::Diagnostic;
use tool_extractor::{extract_tools, ExtractionReport, ToolRecord};

fn sample_package() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/sample-package")
}

fn extract() -> ExtractionReport {
    extract_tools(&sample_package()).expect("Failed to extract sample package")
}

fn record<'a>(report: &'a ExtractionReport, id: &str) -> &'a ToolRecord {
    report
        .records
        .iter()
        .find(|r| r.id == id)
        .unwrap_or_else(|| panic!("missing record {}", id))
}

#[test]
fn test_sample_package_records() {
    let report = extract();
    let ids: Vec<&str> = report.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "sample_pkg.core:compute",
            "sample_pkg.core:fetch",
            "sample_pkg.io.readers:read_table",
            "sample_pkg.pp:normalize",
            "sample_pkg.preprocessing._filters:normalize",
            "sample_pkg.preprocessing._filters:smooth",
            "sample_pkg.preprocessing:normalize",
            "sample_pkg.tools._internal:predict",
            "sample_pkg.tools.predict:predict",
            "sample_pkg.tools:predict",
            "sample_pkg:read_table",
            "sample_pkg:run",
        ]
    );
}

#[test]
fn test_sample_package_counts() {
    let report = extract();
    assert_eq!(report.files_scanned, 9);
    assert_eq!(report.files_skipped(), 1);
    assert_eq!(report.skipped[0].path, "src/sample_pkg/legacy.py");
    assert_eq!(report.unresolved_count(), 0);

    // `from typing import Any` points outside the tree
    assert!(report.diagnostics.iter().any(|d| matches!(
        d,
        Diagnostic::Unresolved { target, external: true, .. } if target == "typing.Any"
    )));
}

#[test]
fn test_sample_package_signatures() {
    let report = extract();

    let run = record(&report, "sample_pkg:run");
    assert_eq!(run.signature, "def compute(x: int, *, scale: float=...) -> int");
    assert_eq!(run.doc_first_line, "Runs computation.");
    assert_eq!(run.file, "src/sample_pkg/core.py");
    assert_eq!(run.lineno, 4);

    let fetch = record(&report, "sample_pkg.core:fetch");
    assert_eq!(fetch.signature, "async def fetch(url: str, timeout=...) -> bytes");
    assert_eq!(fetch.doc_first_line, "Fetch a resource.");

    let read_table = record(&report, "sample_pkg:read_table");
    assert_eq!(
        read_table.signature,
        "def read_table(path: \"str | Path\", sep: str=...) -> \"DataFrame\""
    );

    let normalize = record(&report, "sample_pkg.pp:normalize");
    assert_eq!(normalize.signature, "def normalize(values, /, axis=...)");

    let smooth = record(&report, "sample_pkg.preprocessing._filters:smooth");
    assert_eq!(smooth.signature, "def smooth(values, *args, window: int=..., **kwargs)");
    assert_eq!(smooth.doc_first_line, "");
}

#[test]
fn test_sample_package_inferred_predict() {
    let report = extract();
    let predict = record(&report, "sample_pkg.tools:predict");
    assert_eq!(predict.file, "src/sample_pkg/tools/predict.py");
    assert_eq!(predict.doc_first_line, "Predict with a fitted model.");

    assert!(report.diagnostics.iter().any(|d| matches!(
        d,
        Diagnostic::Ambiguity { module, name, .. } if module == "sample_pkg.tools" && name == "predict"
    )));
}

#[test]
fn test_sample_package_excludes_private_and_methods() {
    let report = extract();
    assert!(report.records.iter().all(|r| !r.name.starts_with('_')));
    assert!(report.records.iter().all(|r| r.name != "fit"));
    assert!(report.records.iter().all(|r| !r.file.starts_with("tests/")));
}
