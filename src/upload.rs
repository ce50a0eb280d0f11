use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::error::{PullError, Result};

/// Copy `file` into the master directory under its own name. An existing
/// master with that name is replaced.
#[instrument(skip(config))]
pub fn upload_pdf(config: &Config, file: &Path) -> Result<PathBuf> {
    if !file.is_file() {
        return Err(PullError::MissingResource(file.to_path_buf()));
    }
    let is_pdf = file
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    let Some(name) = file.file_name().filter(|_| is_pdf) else {
        return Err(PullError::Format(format!(
            "{} is not a PDF file",
            file.display()
        )));
    };

    config.ensure_master_dir()?;
    let dest = config.master_dir.join(name);
    if dest.exists() {
        warn!(dest = %dest.display(), "replacing existing master");
    }
    fs::copy(file, &dest).map_err(|e| {
        PullError::io(
            format!("Failed to copy {} to {}", file.display(), dest.display()),
            e,
        )
    })?;
    info!(dest = %dest.display(), "uploaded");
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_copies_into_master_dir() {
        let base = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let config = Config::new(base.path());
        let src = outside.path().join("Manual.pdf");
        fs::write(&src, b"%PDF-1.5").unwrap();

        let dest = upload_pdf(&config, &src).unwrap();
        assert_eq!(dest, config.source_path("Manual.pdf"));
        assert_eq!(fs::read(&dest).unwrap(), b"%PDF-1.5");
        assert!(src.is_file());
    }

    #[test]
    fn test_upload_rejects_non_pdf_and_missing() {
        let base = tempfile::tempdir().unwrap();
        let config = Config::new(base.path());
        let txt = base.path().join("notes.txt");
        fs::write(&txt, b"x").unwrap();

        assert!(matches!(upload_pdf(&config, &txt), Err(PullError::Format(_))));
        assert!(matches!(
            upload_pdf(&config, &base.path().join("none.pdf")),
            Err(PullError::MissingResource(_))
        ));
    }
}
