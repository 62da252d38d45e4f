//! Semicolon-delimited data files
//!
//! Every file starts with a header line, which is skipped on read. Cells are
//! trimmed; blank lines and carriage returns are ignored. Cells are never
//! quoted.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::record::TableRow;
use crate::serialize::{serialize_table, split_row};

/// Rows of one data file, indexed by id.
#[derive(Debug)]
pub struct Table<R> {
    pub path: PathBuf,
    pub rows: Vec<R>,
    index: HashMap<String, usize>,
}

impl<R: TableRow> Table<R> {
    /// Read a data file from disk.
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let table = Self::parse(path, &text)?;
        debug!(path = %path.display(), rows = table.rows.len(), "read table");
        Ok(table)
    }

    /// Parse file contents. `path` is only used in error messages.
    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let mut rows = Vec::new();
        for (line_no, line) in data_lines(text) {
            let row = R::from_cells(split_row(line)).map_err(|reason| Error::Row {
                file: path.to_path_buf(),
                line: line_no,
                reason,
            })?;
            rows.push(row);
        }
        Ok(Self::from_rows(path.to_path_buf(), rows))
    }

    pub fn from_rows(path: PathBuf, rows: Vec<R>) -> Self {
        let mut index = HashMap::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            // First occurrence wins for duplicated ids
            index.entry(row.id().to_string()).or_insert(i);
        }
        Self { path, rows, index }
    }

    pub fn get(&self, id: &str) -> Option<&R> {
        self.index.get(id).map(|&i| &self.rows[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut R> {
        self.index.get(id).map(|&i| &mut self.rows[i])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render the table, with the header line if requested.
    pub fn render(&self, header: bool) -> String {
        let rows: Vec<Vec<String>> = self.rows.iter().map(TableRow::to_cells).collect();
        let header = if header { Some(R::HEADER) } else { None };
        serialize_table(header, &rows)
    }

    /// Write the table to `path`, creating parent directories.
    pub fn write(&self, path: &Path, header: bool) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut text = self.render(header);
        text.push('\n');
        std::fs::write(path, text)?;
        debug!(path = %path.display(), rows = self.rows.len(), "wrote table");
        Ok(())
    }
}

/// Non-blank lines after the header, with 1-based line numbers.
fn data_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .skip(1)
        .map(|(i, line)| (i + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty())
}

/// Sibling path with `suffix` appended to the file stem:
/// `datas/skills.csv` + `_bis` gives `datas/skills_bis.csv`.
pub fn output_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.file_stem().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    path.with_file_name(name)
}
