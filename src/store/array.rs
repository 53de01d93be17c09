//! Plain-text array codec.
//!
//! Arrays are stored as whitespace-delimited numeric tables. A leading block
//! of `#` comment lines carries metadata; its last line holds the tab-joined
//! column names.
//!
//! Epistemic foundation:
//! - K_i: Every array read is 2-D, even with a single row or column
//! - B_i: Column names may be missing or stale → Option, never an error
//! - I^B: Appends are one scoped open/write/sync per row, so an interrupted
//!   run leaves a readable file

use crate::models::{EmulikeError, Result};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Marker starting a comment line.
pub const COMMENT: char = '#';

/// Separator between column names in the header line.
pub const NAME_DELIMITER: char = '\t';

/// Column selection applied to a loaded table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Columns {
    /// Every column
    #[default]
    All,
    /// Explicit column indices, in the given order
    List(Vec<usize>),
    /// Contiguous range; `end: None` runs to the last column
    Range { start: usize, end: Option<usize> },
    /// Every column except the last one
    AllButLast,
    /// Only the last column
    Last,
}

impl Columns {
    /// Resolve the selection against a table with `n_columns` columns.
    pub fn resolve(&self, n_columns: usize) -> Result<Vec<usize>> {
        let indices: Vec<usize> = match self {
            Self::All => (0..n_columns).collect(),
            Self::List(indices) => {
                if let Some(bad) = indices.iter().find(|&&i| i >= n_columns) {
                    return Err(EmulikeError::InvalidColumns(format!(
                        "column {bad} out of range for {n_columns} columns"
                    )));
                }
                indices.clone()
            }
            Self::Range { start, end } => {
                let end = end.unwrap_or(n_columns);
                if *start > end || end > n_columns {
                    return Err(EmulikeError::InvalidColumns(format!(
                        "range {start}..{end} out of bounds for {n_columns} columns"
                    )));
                }
                (*start..end).collect()
            }
            Self::AllButLast => (0..n_columns.saturating_sub(1)).collect(),
            Self::Last => match n_columns {
                0 => {
                    return Err(EmulikeError::InvalidColumns(
                        "no last column in an empty table".to_string(),
                    ));
                }
                n => vec![n - 1],
            },
        };

        if indices.is_empty() && n_columns > 0 {
            return Err(EmulikeError::InvalidColumns(format!(
                "{self:?} selects no column out of {n_columns}"
            )));
        }
        Ok(indices)
    }
}

/// Read an array and its column names from `path`.
///
/// The selection is applied to both the array and the names. Names are
/// `None` when the file has no comment line or when the count does not match.
pub fn read_array(path: &Path, columns: &Columns) -> Result<(Array2<f64>, Option<Vec<String>>)> {
    let content = fs::read_to_string(path)
        .map_err(|e| EmulikeError::io(format!("reading array {}", path.display()), e))?;

    let table = parse_table(path, &content)?;
    let names = resolve_names(&content, table.ncols());
    let selected = columns.resolve(table.ncols())?;

    let array = table.select(Axis(1), &selected);
    let names = names.map(|names| selected.iter().map(|&i| names[i].clone()).collect());

    debug!(
        path = %path.display(),
        rows = array.nrows(),
        cols = array.ncols(),
        named = names.is_some(),
        "Loaded array"
    );
    Ok((array, names))
}

/// Resolve column names from the leading comment block of a table.
///
/// The last comment line holds the names. Returns `None` when there is no
/// comment line, when it is empty, or when the number of names differs from
/// `n_columns`.
pub fn resolve_names(content: &str, n_columns: usize) -> Option<Vec<String>> {
    let header = content
        .lines()
        .take_while(|line| line.starts_with(COMMENT))
        .last()?;

    let stripped = header.replace(COMMENT, "");
    if stripped.trim().is_empty() {
        return None;
    }

    let names: Vec<String> = stripped
        .split(NAME_DELIMITER)
        .map(|name| name.trim().to_string())
        .collect();

    if names.len() == n_columns {
        Some(names)
    } else {
        debug!(
            found = names.len(),
            expected = n_columns,
            "Header does not match column count, names unknown"
        );
        None
    }
}

fn parse_table(path: &Path, content: &str) -> Result<Array2<f64>> {
    let mut data = Vec::new();
    let mut n_rows = 0;
    let mut n_cols = None;

    for (line_num, line) in content.lines().enumerate() {
        // Trailing comments are allowed after the values
        let values = line.split(COMMENT).next().unwrap_or_default().trim();
        if values.is_empty() {
            continue;
        }

        let row: Vec<f64> = values
            .split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|e| EmulikeError::Parse {
                    path: path.to_owned(),
                    line: line_num + 1,
                    message: format!("'{token}': {e}"),
                })
            })
            .collect::<Result<_>>()?;

        match n_cols {
            None => n_cols = Some(row.len()),
            Some(expected) if expected != row.len() => {
                return Err(EmulikeError::Parse {
                    path: path.to_owned(),
                    line: line_num + 1,
                    message: format!("expected {expected} values, found {}", row.len()),
                });
            }
            Some(_) => {}
        }

        data.extend(row);
        n_rows += 1;
    }

    Array2::from_shape_vec((n_rows, n_cols.unwrap_or(0)), data).map_err(|e| EmulikeError::Parse {
        path: path.to_owned(),
        line: 0,
        message: e.to_string(),
    })
}

fn format_row(row: ArrayView1<f64>) -> String {
    row.iter()
        .map(|v| format!("{v:e}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Write `array` to `path`, overwriting it.
///
/// The first line is the header: `# a\tb` for known names, a bare `#` for
/// unknown ones, which reads back as unknown.
pub fn write_array(path: &Path, array: ArrayView2<f64>, names: Option<&[String]>) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| EmulikeError::io(format!("creating {}", path.display()), e))?;
    let mut writer = BufWriter::new(file);
    let context = || format!("writing {}", path.display());

    let header = match names.filter(|names| !names.is_empty()) {
        Some(names) => format!("{COMMENT} {}", names.join(&NAME_DELIMITER.to_string())),
        None => COMMENT.to_string(),
    };
    writeln!(writer, "{header}").map_err(|e| EmulikeError::io(context(), e))?;
    for row in array.rows() {
        writeln!(writer, "{}", format_row(row)).map_err(|e| EmulikeError::io(context(), e))?;
    }

    writer.flush().map_err(|e| EmulikeError::io(context(), e))?;
    debug!(path = %path.display(), rows = array.nrows(), "Wrote array");
    Ok(())
}

/// Append one row to an existing array file.
///
/// The file is opened, written, synced and closed within this call.
pub fn append_row(path: &Path, row: ArrayView1<f64>) -> Result<()> {
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| EmulikeError::io(format!("opening {} for append", path.display()), e))?;

    writeln!(file, "{}", format_row(row))
        .map_err(|e| EmulikeError::io(format!("appending to {}", path.display()), e))?;
    file.sync_all()
        .map_err(|e| EmulikeError::io(format!("syncing {}", path.display()), e))?;
    Ok(())
}
