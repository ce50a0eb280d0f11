use crate::config::Config;
use crate::error::PullError;
use crate::grid::{parse_values, read_rows, set_column, write_rows, Column};
use anyhow::{Context, Result};
use std::io::Read;

pub fn save(config: &Config) -> Result<()> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read grid from stdin")?;
    let rows: Vec<Vec<String>> =
        serde_json::from_str(&input).context("Grid must be a JSON array of string rows")?;

    config.ensure_base_dir()?;
    write_rows(&config.saved_grid_path, &rows, true)?;
    println!("Grid saved to {}", config.saved_grid_path.display());
    Ok(())
}

pub fn load(config: &Config) -> Result<()> {
    let rows = match read_rows(&config.saved_grid_path, true) {
        Ok(rows) => rows,
        Err(PullError::MissingResource(_)) => {
            eprintln!("No saved grid file found.");
            return Ok(());
        }
        Err(e) => return Err(e).context("Error loading grid"),
    };

    let data: Vec<Vec<String>> = rows.into_iter().map(|row| row.fields).collect();
    println!("{}", serde_json::to_string(&data)?);
    Ok(())
}

pub fn set(config: &Config, column: Column) -> Result<()> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read values from stdin")?;
    let values = parse_values(&input);
    if values.is_empty() {
        return Err(PullError::UserCancelled("No input provided.".to_string()).into());
    }

    config.ensure_base_dir()?;
    let count = set_column(&config.grid_path, column, &values)?;
    println!("Updated {} entries for {:?}.", count, column);
    Ok(())
}
