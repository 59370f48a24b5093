use crate::support::{EXIT_ERROR, fail, print_json};
use coursegate_core::{CatalogCheckReport, check_catalog, read_catalog_from_path};
use std::path::Path;

pub fn run(catalog_path: &Path, json_output: bool) {
    if !catalog_path.exists() {
        fail(format!("catalog not found: {}", catalog_path.display()));
    }
    // Raw records: a catalog that `Catalog::load_jsonl` would refuse must
    // still produce a report.
    let records = read_catalog_from_path(catalog_path)
        .unwrap_or_else(|e| fail(format!("failed to read {}: {e}", catalog_path.display())));
    let report = check_catalog(&records);

    if json_output {
        print_json(&report);
    } else {
        print_report(&report);
    }

    if !report.accepted() {
        std::process::exit(EXIT_ERROR);
    }
}

fn print_report(report: &CatalogCheckReport) {
    println!(
        "[catalog] {} (items={}, prerequisites={}, errors={})",
        if report.accepted() { "OK" } else { "FAIL" },
        report.summary.item_count,
        report.summary.edge_count,
        report.summary.error_count
    );
    for finding in &report.errors {
        println!(
            "  - {} {} ({})",
            finding.item_id, finding.class, finding.message
        );
    }
}
