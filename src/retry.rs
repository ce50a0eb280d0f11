use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::grid::ExtractionJob;
use crate::store::JobStore;

const KEY_SEPARATOR: char = '|';

pub fn job_key(job: &ExtractionJob) -> String {
    format!(
        "{}{sep}{}{sep}{}",
        job.source_pdf,
        job.output_name,
        job.page_range,
        sep = KEY_SEPARATOR
    )
}

/// Page ranges never contain the separator, so the range is split off the
/// right. Keys whose source or output name held one are never written.
pub fn parse_job_key(key: &str) -> Option<ExtractionJob> {
    let (rest, range) = key.rsplit_once(KEY_SEPARATOR)?;
    let (source, output) = rest.split_once(KEY_SEPARATOR)?;
    Some(ExtractionJob::new(source, output, range))
}

/// Whether `job` can be written as a key and read back unchanged.
pub fn is_keyable(job: &ExtractionJob) -> bool {
    [&job.source_pdf, &job.output_name, &job.page_range]
        .iter()
        .all(|field| !field.contains(KEY_SEPARATOR))
}

/// Failed jobs keyed by [`job_key`], each with the number of retries already
/// spent on it.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FailureLog {
    entries: BTreeMap<String, u32>,
}

impl FailureLog {
    /// Record a fresh failure; resets any existing counter to 0.
    ///
    /// Returns false, and records nothing, when a field contains the key
    /// separator and the job could not be replayed from its key.
    pub fn record_failure(&mut self, job: &ExtractionJob) -> bool {
        if !is_keyable(job) {
            warn!(
                source = %job.source_pdf,
                output = %job.output_name,
                "'{}' in a field, job cannot be queued for retry",
                KEY_SEPARATOR
            );
            return false;
        }
        self.entries.insert(job_key(job), 0);
        true
    }

    pub fn remove(&mut self, job: &ExtractionJob) -> Option<u32> {
        self.entries.remove(&job_key(job))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
impl FailureLog {
    pub fn attempts(&self, job: &ExtractionJob) -> Option<u32> {
        self.entries.get(&job_key(job)).copied()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StillFailing {
    pub job: ExtractionJob,
    pub attempts: u32,
    pub error: String,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct RetryReport {
    pub succeeded: Vec<ExtractionJob>,
    pub still_failing: Vec<StillFailing>,
    /// Jobs that hit the retry ceiling and were dropped from the log.
    pub abandoned: Vec<ExtractionJob>,
}

impl RetryReport {
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.still_failing.len() + self.abandoned.len()
    }
}

/// Re-run every job in the failure log once.
///
/// Successes leave the log; failures have their counter bumped, and a job
/// whose counter reaches `max_retries` is reported as abandoned and dropped.
/// The updated log is written back (or removed when empty).
#[instrument(skip(store, attempt))]
pub fn retry_pass<S, F, T>(store: &S, max_retries: u32, mut attempt: F) -> Result<RetryReport>
where
    S: JobStore,
    F: FnMut(&ExtractionJob) -> Result<T>,
{
    let log = store.load_failure_log()?;
    let mut next = FailureLog::default();
    let mut report = RetryReport::default();

    for (key, attempts) in log.entries {
        let Some(job) = parse_job_key(&key) else {
            warn!(%key, "dropping malformed failure log entry");
            continue;
        };
        if attempts >= max_retries {
            report.abandoned.push(job);
            continue;
        }
        match attempt(&job) {
            Ok(_) => {
                info!(%key, "retry succeeded");
                report.succeeded.push(job);
            }
            Err(e) => {
                let attempts = attempts + 1;
                if attempts >= max_retries {
                    warn!(%key, attempts, error = %e, "giving up");
                    report.abandoned.push(job);
                } else {
                    warn!(%key, attempts, error = %e, "retry failed");
                    next.entries.insert(key, attempts);
                    report.still_failing.push(StillFailing {
                        job,
                        attempts,
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    store.save_failure_log(&next)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, DEFAULT_MAX_RETRIES};
    use crate::error::PullError;
    use crate::extract::{extract_job, run_batch};
    use crate::grid::write_rows;
    use crate::pdf::document::fixtures::write_pdf;
    use crate::store::FileStore;

    #[test]
    fn test_key_round_trip() {
        let job = ExtractionJob::new("a b.pdf", "out", "1-2,4");
        assert_eq!(job_key(&job), "a b.pdf|out|1-2,4");
        assert_eq!(parse_job_key(&job_key(&job)), Some(job));
        assert_eq!(parse_job_key("only|two"), None);
        assert_eq!(parse_job_key("no separator"), None);
    }

    #[test]
    fn test_separator_in_name_is_not_queued() {
        let mut log = FailureLog::default();
        assert!(!log.record_failure(&ExtractionJob::new("a|b.pdf", "out", "1")));
        assert!(!log.record_failure(&ExtractionJob::new("a.pdf", "o|ut", "1")));
        assert!(log.is_empty());
        assert!(log.record_failure(&ExtractionJob::new("a.pdf", "out", "1")));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_batch_reports_unqueueable_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(dir.path());
        config.ensure_master_dir().unwrap();
        let grid = vec![
            vec!["a|b.pdf".to_string(), "out".to_string(), "1".to_string()],
            vec!["gone.pdf".to_string(), "other".to_string(), "1".to_string()],
        ];
        write_rows(&config.grid_path, &grid, false).unwrap();
        let store = FileStore::new(&config);

        let summary = run_batch(&config, &store).unwrap();
        assert_eq!(summary.failed.len(), 2);
        assert_eq!(
            summary.not_retryable,
            vec![ExtractionJob::new("a|b.pdf", "out", "1")]
        );

        let log = store.load_failure_log().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log.attempts(&ExtractionJob::new("gone.pdf", "other", "1")), Some(0));

        // Every queued key replays as the job that failed.
        let mut replayed = Vec::new();
        retry_pass(&store, DEFAULT_MAX_RETRIES, |j| {
            replayed.push(j.clone());
            extract_job(&config, j)
        })
        .unwrap();
        assert_eq!(replayed, vec![ExtractionJob::new("gone.pdf", "other", "1")]);
    }

    #[test]
    fn test_job_abandoned_after_three_failures() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(dir.path());
        config.ensure_master_dir().unwrap();
        let grid = vec![vec!["gone.pdf".to_string(), "out".to_string(), "1".to_string()]];
        write_rows(&config.grid_path, &grid, false).unwrap();
        let store = FileStore::new(&config);
        let job = ExtractionJob::new("gone.pdf", "out", "1");

        run_batch(&config, &store).unwrap();
        assert_eq!(store.load_failure_log().unwrap().attempts(&job), Some(0));

        let extract = |j: &ExtractionJob| extract_job(&config, j);

        let first = retry_pass(&store, DEFAULT_MAX_RETRIES, extract).unwrap();
        assert_eq!(first.still_failing[0].attempts, 1);
        assert_eq!(store.load_failure_log().unwrap().attempts(&job), Some(1));

        let second = retry_pass(&store, DEFAULT_MAX_RETRIES, extract).unwrap();
        assert_eq!(second.still_failing[0].attempts, 2);
        assert_eq!(store.load_failure_log().unwrap().attempts(&job), Some(2));

        let third = retry_pass(&store, DEFAULT_MAX_RETRIES, extract).unwrap();
        assert!(third.still_failing.is_empty());
        assert_eq!(third.abandoned, vec![job]);
        assert!(!config.failure_log_path.exists());
    }

    #[test]
    fn test_success_removes_entry() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(dir.path());
        config.ensure_master_dir().unwrap();
        let store = FileStore::new(&config);

        let job = ExtractionJob::new("late.pdf", "out", "1");
        let mut log = FailureLog::default();
        log.record_failure(&job);
        log.record_failure(&ExtractionJob::new("gone.pdf", "other", "1"));
        store.save_failure_log(&log).unwrap();

        // The missing master shows up before the retry.
        write_pdf(&config.source_path("late.pdf"), 2);

        let report = retry_pass(&store, DEFAULT_MAX_RETRIES, |j| extract_job(&config, j)).unwrap();
        assert_eq!(report.succeeded, vec![job.clone()]);
        assert_eq!(report.still_failing.len(), 1);
        assert!(config.output_path("out").is_file());

        let log = store.load_failure_log().unwrap();
        assert_eq!(log.attempts(&job), None);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_entries_at_ceiling_are_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(dir.path());
        let store = FileStore::new(&config);
        std::fs::write(
            &config.failure_log_path,
            r#"{ "a.pdf|x|1": 3, "garbage": 0 }"#,
        )
        .unwrap();

        let mut calls = 0;
        let report = retry_pass(&store, 3, |_| {
            calls += 1;
            Err::<(), _>(PullError::Format("unreachable".to_string()))
        })
        .unwrap();
        assert_eq!(calls, 0);
        assert_eq!(report.abandoned, vec![ExtractionJob::new("a.pdf", "x", "1")]);
        assert!(!config.failure_log_path.exists());
    }
}
