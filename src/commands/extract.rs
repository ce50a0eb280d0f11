use crate::config::Config;
use crate::extract::{extract_job, extract_rows};
use crate::grid::ExtractionJob;
use crate::store::{FileStore, JobStore};
use anyhow::{Context, Result};

pub fn run(config: &Config, retry: bool) -> Result<()> {
    let store = FileStore::new(config);
    let rows = store.load_grid().context("No input data found")?;
    let summary = extract_rows(config, &store, &rows)?;

    for row in &summary.skipped_rows {
        println!("Skipping invalid row {}.", row);
    }
    for job in &summary.succeeded {
        println!(
            "Extracted pages {} from {} -> {}.pdf",
            job.page_range, job.source_pdf, job.output_name
        );
    }
    for failed in &summary.failed {
        println!(
            "Error extracting pages from {}: {}",
            failed.job.source_pdf, failed.error
        );
    }
    for job in &summary.not_retryable {
        println!(
            "Cannot queue {} -> {} for retry: '|' is not allowed in names.",
            job.source_pdf, job.output_name
        );
    }
    println!(
        "{} succeeded, {} failed.",
        summary.succeeded.len(),
        summary.failed.len()
    );

    if retry && !summary.failed.is_empty() {
        super::retry::run_until_drained(config)?;
    }
    Ok(())
}

pub fn run_one(config: &Config, source_pdf: &str, pages: &str, output: &str) -> Result<()> {
    let job = ExtractionJob::new(source_pdf, output, pages);
    let extracted = extract_job(config, &job)
        .with_context(|| format!("Failed to extract pages {} from {}", pages, source_pdf))?;

    if !extracted.dropped.is_empty() {
        println!(
            "Skipped page(s) outside the document: {}",
            extracted.dropped.join(", ")
        );
    }
    println!(
        "Extracted {} page(s) to {}",
        extracted.page_count,
        extracted.output.display()
    );
    Ok(())
}
