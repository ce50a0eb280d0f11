use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PullError, Result};

/// Header written by `grid save`; the working grid has none.
pub const HEADER: [&str; 3] = ["Master PDF", "Output Name", "Page Range"];

/// One requested extraction: pages of `source_pdf` written to `output_name`.pdf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionJob {
    pub source_pdf: String,
    pub output_name: String,
    pub page_range: String,
}

impl ExtractionJob {
    pub fn new(
        source_pdf: impl Into<String>,
        output_name: impl Into<String>,
        page_range: impl Into<String>,
    ) -> Self {
        ExtractionJob {
            source_pdf: source_pdf.into(),
            output_name: output_name.into(),
            page_range: page_range.into(),
        }
    }

    pub fn has_empty_field(&self) -> bool {
        self.source_pdf.is_empty() || self.output_name.is_empty() || self.page_range.is_empty()
    }
}

/// A raw grid record, kept with its 1-based position for error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRow {
    pub index: usize,
    pub fields: Vec<String>,
}

impl GridRow {
    pub fn to_job(&self) -> Result<ExtractionJob> {
        match self.fields.as_slice() {
            [source, output, range] => Ok(ExtractionJob::new(
                source.as_str(),
                output.as_str(),
                range.as_str(),
            )),
            _ => Err(PullError::Format(format!(
                "Row {}: Incorrect format.",
                self.index
            ))),
        }
    }
}

/// Which grid column a mass-input list fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Column {
    MasterPdf,
    OutputName,
    PageRange,
}

impl Column {
    fn index(self) -> usize {
        match self {
            Column::MasterPdf => 0,
            Column::OutputName => 1,
            Column::PageRange => 2,
        }
    }
}

/// Read every record of a grid file. Records may have any number of fields.
///
/// Blank lines are not records, but row numbers still follow the physical
/// line a record starts on (counted after the header), so "Row N" points at
/// the line a user sees in an editor.
pub fn read_rows(path: &Path, has_header: bool) -> Result<Vec<GridRow>> {
    if !path.is_file() {
        return Err(PullError::MissingResource(path.to_path_buf()));
    }
    let file = File::open(path)
        .map_err(|e| PullError::io(format!("Failed to open grid: {}", path.display()), e))?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(has_header)
        .from_reader(file);

    let header_lines = u64::from(has_header);
    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let index = record
            .position()
            .map(|pos| pos.line().saturating_sub(header_lines) as usize)
            .unwrap_or(i + 1);
        rows.push(GridRow {
            index,
            fields: record.iter().map(str::to_string).collect(),
        });
    }
    debug!(path = %path.display(), rows = rows.len(), "grid loaded");
    Ok(rows)
}

pub fn write_rows<R: AsRef<[String]>>(path: &Path, rows: &[R], with_header: bool) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| PullError::io(format!("Failed to write grid: {}", path.display()), e))?;
    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(file);
    if with_header {
        writer.write_record(HEADER)?;
    }
    for row in rows {
        writer.write_record(row.as_ref())?;
    }
    writer
        .flush()
        .map_err(|e| PullError::io(format!("Failed to write grid: {}", path.display()), e))?;
    Ok(())
}

/// Write `values` into `column` of the grid at `path`, one per row, leaving the
/// other columns alone. Rows are appended as needed. Returns the number of
/// values written.
pub fn set_column(path: &Path, column: Column, values: &[String]) -> Result<usize> {
    let mut rows: Vec<Vec<String>> = if path.is_file() {
        read_rows(path, false)?
            .into_iter()
            .map(|row| row.fields)
            .collect()
    } else {
        Vec::new()
    };

    let col = column.index();
    for (i, value) in values.iter().enumerate() {
        if i >= rows.len() {
            rows.push(vec![String::new(); 3]);
        }
        let row = &mut rows[i];
        if row.len() <= col {
            warn!(row = i + 1, "short grid row padded");
            row.resize(col + 1, String::new());
        }
        row[col] = value.clone();
    }

    write_rows(path, &rows, false)?;
    Ok(values.len())
}

/// Split pasted text into trimmed, non-empty values.
pub fn parse_values(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_row_to_job() {
        let ok = GridRow {
            index: 1,
            fields: row(&["a.pdf", "out", "1-2"]),
        };
        assert_eq!(ok.to_job().unwrap(), ExtractionJob::new("a.pdf", "out", "1-2"));

        let short = GridRow {
            index: 4,
            fields: row(&["a.pdf", "out"]),
        };
        match short.to_job() {
            Err(PullError::Format(msg)) => assert_eq!(msg, "Row 4: Incorrect format."),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_write_then_read_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved_grid.csv");
        let rows = vec![row(&["a.pdf", "first, part", "1-3"]), row(&["b.pdf", "x", "2"])];
        write_rows(&path, &rows, true).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Master PDF,Output Name,Page Range"));

        let loaded = read_rows(&path, true).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].fields, rows[0]);
        assert_eq!(loaded[1].index, 2);
    }

    #[test]
    fn test_flexible_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.csv");
        std::fs::write(&path, "a.pdf,out,1\nb.pdf,only-two\nc.pdf,o,2,extra\n").unwrap();

        let rows = read_rows(&path, false).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].to_job().is_ok());
        assert!(rows[1].to_job().is_err());
        assert!(rows[2].to_job().is_err());
    }

    #[test]
    fn test_row_numbers_follow_lines_across_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.csv");
        std::fs::write(&path, "a.pdf,out,1\n\nb.pdf,only-two\n\n\nc.pdf,o,2\n").unwrap();
        let rows = read_rows(&path, false).unwrap();
        let indexes: Vec<usize> = rows.iter().map(|r| r.index).collect();
        assert_eq!(indexes, vec![1, 3, 6]);
        assert_eq!(
            rows[1].to_job().unwrap_err().to_string(),
            "Row 3: Incorrect format."
        );

        std::fs::write(&path, "Master PDF,Output Name,Page Range\na.pdf,out,1\n\nc.pdf,o,2\n")
            .unwrap();
        let indexes: Vec<usize> = read_rows(&path, true)
            .unwrap()
            .iter()
            .map(|r| r.index)
            .collect();
        assert_eq!(indexes, vec![1, 3]);
    }

    #[test]
    fn test_missing_grid() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_rows(&dir.path().join("none.csv"), false),
            Err(PullError::MissingResource(_))
        ));
    }

    #[test]
    fn test_set_column_keeps_other_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.csv");

        set_column(&path, Column::MasterPdf, &row(&["a.pdf", "b.pdf"])).unwrap();
        set_column(&path, Column::PageRange, &row(&["1-2", "3", "4"])).unwrap();
        set_column(&path, Column::OutputName, &row(&["one"])).unwrap();

        let rows: Vec<_> = read_rows(&path, false)
            .unwrap()
            .into_iter()
            .map(|r| r.fields)
            .collect();
        assert_eq!(
            rows,
            vec![
                row(&["a.pdf", "one", "1-2"]),
                row(&["b.pdf", "", "3"]),
                row(&["", "", "4"]),
            ]
        );
    }

    #[test]
    fn test_parse_values() {
        assert_eq!(
            parse_values("  a.pdf \n\n b.pdf\r\n   \n"),
            row(&["a.pdf", "b.pdf"])
        );
    }
}
