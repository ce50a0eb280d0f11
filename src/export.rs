use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::error::{PullError, Result};

/// Inserted before the extension when the destination name is taken.
pub const COLLISION_SUFFIX: &str = "_copy";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportMode {
    #[default]
    Move,
    Copy,
}

#[derive(Debug, Clone, Serialize)]
pub struct Exported {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub renamed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportFailure {
    pub source: PathBuf,
    pub error: String,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct ExportSummary {
    pub exported: Vec<Exported>,
    pub failed: Vec<ExportFailure>,
}

/// PDFs directly inside `dir`, sorted by name.
pub fn list_outputs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(PullError::MissingResource(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            PullError::io(
                format!("Failed to list {}", dir.display()),
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
            )
        })?;
        let is_pdf = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if entry.file_type().is_file() && is_pdf {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// First path in `dest_dir` for `file_name` that does not exist yet:
/// `name.pdf`, then `name_copy.pdf`, then `name_copy2.pdf`, ...
pub fn free_destination(dest_dir: &Path, file_name: &Path) -> PathBuf {
    let candidate = dest_dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let stem = file_name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = file_name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut n = 1u32;
    loop {
        let suffix = if n == 1 {
            COLLISION_SUFFIX.to_string()
        } else {
            format!("{}{}", COLLISION_SUFFIX, n)
        };
        let candidate = dest_dir.join(format!("{}{}{}", stem, suffix, ext));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Move or copy each file into `dest_dir`, renaming on collision. A failed
/// file is recorded and the rest continue.
#[instrument(skip(files), fields(count = files.len()))]
pub fn export_files(files: &[PathBuf], dest_dir: &Path, mode: ExportMode) -> Result<ExportSummary> {
    if !dest_dir.is_dir() {
        return Err(PullError::MissingResource(dest_dir.to_path_buf()));
    }

    let mut summary = ExportSummary::default();
    for source in files {
        let Some(file_name) = source.file_name() else {
            continue;
        };
        let destination = free_destination(dest_dir, Path::new(file_name));
        let renamed = destination.file_name() != Some(file_name);

        let result = match mode {
            ExportMode::Move => move_file(source, &destination),
            ExportMode::Copy => fs::copy(source, &destination).map(|_| ()),
        };
        match result {
            Ok(()) => {
                debug!(from = %source.display(), to = %destination.display(), renamed, "exported");
                summary.exported.push(Exported {
                    source: source.clone(),
                    destination,
                    renamed,
                });
            }
            Err(e) => {
                warn!(file = %source.display(), error = %e, "export failed");
                summary.failed.push(ExportFailure {
                    source: source.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        exported = summary.exported.len(),
        failed = summary.failed.len(),
        "export finished"
    );
    Ok(summary)
}

/// Rename, falling back to copy + delete across filesystems.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_outputs_only_pdfs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.pdf"), b"b").unwrap();
        fs::write(dir.path().join("a.PDF"), b"a").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::create_dir(dir.path().join("sub.pdf")).unwrap();

        let files = list_outputs(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);
    }

    #[test]
    fn test_free_destination_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        let name = Path::new("report.pdf");
        assert_eq!(free_destination(dir.path(), name), dir.path().join("report.pdf"));

        fs::write(dir.path().join("report.pdf"), b"1").unwrap();
        assert_eq!(
            free_destination(dir.path(), name),
            dir.path().join("report_copy.pdf")
        );

        fs::write(dir.path().join("report_copy.pdf"), b"2").unwrap();
        assert_eq!(
            free_destination(dir.path(), name),
            dir.path().join("report_copy2.pdf")
        );
    }

    #[test]
    fn test_collision_never_overwrites() {
        let exports = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        fs::write(exports.path().join("ch1.pdf"), b"new").unwrap();
        fs::write(exports.path().join("ch2.pdf"), b"two").unwrap();
        fs::write(dest.path().join("ch1.pdf"), b"old").unwrap();

        let files = list_outputs(exports.path()).unwrap();
        let summary = export_files(&files, dest.path(), ExportMode::Move).unwrap();

        assert_eq!(summary.exported.len(), 2);
        assert!(summary.failed.is_empty());
        assert!(summary.exported[0].renamed);
        assert!(!summary.exported[1].renamed);
        assert_eq!(fs::read(dest.path().join("ch1.pdf")).unwrap(), b"old");
        assert_eq!(fs::read(dest.path().join("ch1_copy.pdf")).unwrap(), b"new");
        assert_eq!(fs::read(dest.path().join("ch2.pdf")).unwrap(), b"two");
        assert!(list_outputs(exports.path()).unwrap().is_empty());
    }

    #[test]
    fn test_copy_mode_keeps_sources() {
        let exports = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        fs::write(exports.path().join("ch1.pdf"), b"x").unwrap();

        let files = list_outputs(exports.path()).unwrap();
        export_files(&files, dest.path(), ExportMode::Copy).unwrap();
        assert!(exports.path().join("ch1.pdf").is_file());
        assert!(dest.path().join("ch1.pdf").is_file());
    }

    #[test]
    fn test_missing_destination() {
        let exports = tempfile::tempdir().unwrap();
        let missing = exports.path().join("nowhere");
        assert!(matches!(
            export_files(&[], &missing, ExportMode::Move),
            Err(PullError::MissingResource(_))
        ));
    }
}
