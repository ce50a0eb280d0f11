use crate::config::Config;
use crate::upload::upload_pdf;
use anyhow::Result;
use std::path::PathBuf;

pub fn run(config: &Config, files: &[PathBuf]) -> Result<()> {
    let mut uploaded = 0;
    for file in files {
        match upload_pdf(config, file) {
            Ok(dest) => {
                uploaded += 1;
                println!("Uploaded {} -> {}", file.display(), dest.display());
            }
            Err(e) => println!("Error uploading {}: {}", file.display(), e),
        }
    }

    if uploaded == 0 {
        anyhow::bail!("No files were uploaded");
    }
    Ok(())
}
