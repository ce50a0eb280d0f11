use crate::config::Config;
use crate::extract::extract_job;
use crate::retry::{retry_pass, RetryReport};
use crate::store::{FileStore, JobStore};
use anyhow::Result;

pub fn run(config: &Config) -> Result<()> {
    let store = FileStore::new(config);
    let report = retry_pass(&store, config.max_retries, |job| extract_job(config, job))?;

    if report.attempted() == 0 {
        println!("No failed jobs to retry.");
        return Ok(());
    }
    print_report(&report);
    Ok(())
}

/// Retry until the failure log drains; each job gets at most `max_retries`
/// passes.
pub fn run_until_drained(config: &Config) -> Result<()> {
    let store = FileStore::new(config);
    for _ in 0..config.max_retries {
        if store.load_failure_log()?.is_empty() {
            break;
        }
        let report = retry_pass(&store, config.max_retries, |job| extract_job(config, job))?;
        print_report(&report);
    }
    Ok(())
}

pub fn print_report(report: &RetryReport) {
    for job in &report.succeeded {
        println!("Retry succeeded: {} -> {}.pdf", job.source_pdf, job.output_name);
    }
    for failing in &report.still_failing {
        println!(
            "Retry {} failed: {} -> {}.pdf: {}",
            failing.attempts, failing.job.source_pdf, failing.job.output_name, failing.error
        );
    }
    for job in &report.abandoned {
        println!(
            "Giving up on {} -> {}.pdf (pages {})",
            job.source_pdf, job.output_name, job.page_range
        );
    }
}
