//! Delimited text files: a header line of column names followed by one line of
//! integers per row, every field separated by the same delimiter. There is no
//! quoting or escaping.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};

pub const DEFAULT_DELIMITER: &str = "|";

/// Delimiters tried, in order, when a file is read without an explicit one.
const SNIFFED_DELIMITERS: [&str; 4] = ["|", ",", "\t", ";"];

/// Header and rows as read from, or written to, a delimited file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<i64>>,
}

fn sniff(header: &str) -> &'static str {
    SNIFFED_DELIMITERS
        .into_iter()
        .find(|d| header.contains(d))
        .unwrap_or(DEFAULT_DELIMITER)
}

/// Reads a delimited file.
///
/// When `delimiter` is `None` it is guessed from the header line. Column names are
/// lower-cased so they can be referenced from the (case-insensitive) command
/// language. Blank lines are ignored.
///
/// # Errors
/// [Error::Io] if the file cannot be read, [Error::Format] for an empty file, an
/// empty column name, a row of the wrong width or a field that is not an integer.
pub fn read_file(path: &Path, delimiter: Option<&str>) -> Result<RawTable> {
    let io_err = |source| Error::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(io_err)?;
    let lines = BufReader::new(file)
        .lines()
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(io_err)?;
    parse_lines(path, lines.iter().map(String::as_str), delimiter)
}

/// Parses already loaded lines; `path` is only used in error messages.
pub fn parse_lines<'a>(
    path: &Path,
    lines: impl IntoIterator<Item = &'a str>,
    delimiter: Option<&str>,
) -> Result<RawTable> {
    let format_err = |line: usize, message: String| Error::Format {
        path: path.to_path_buf(),
        line,
        message,
    };

    let mut lines = lines
        .into_iter()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty());

    let (header_no, header) = lines
        .next()
        .ok_or_else(|| format_err(1, "missing header line".into()))?;
    let delimiter = delimiter.unwrap_or_else(|| sniff(header));

    let columns: Vec<String> = header
        .split(delimiter)
        .map(|name| name.trim().to_lowercase())
        .collect();
    if let Some(pos) = columns.iter().position(String::is_empty) {
        return Err(format_err(header_no, format!("column {} has an empty name", pos + 1)));
    }

    let mut rows = Vec::new();
    for (line_no, line) in lines {
        let row = line
            .split(delimiter)
            .map(|field| {
                field.trim().parse::<i64>().map_err(|_| {
                    format_err(line_no, format!("{:?} is not an integer", field.trim()))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        if row.len() != columns.len() {
            return Err(format_err(
                line_no,
                format!("expected {} field(s), found {}", columns.len(), row.len()),
            ));
        }
        rows.push(row);
    }

    Ok(RawTable { columns, rows })
}

/// Renders the header then each row, one per line. No delimiter follows the last
/// field and every line, including the last, ends with `\n`.
pub fn render<W: Write>(
    out: &mut W,
    columns: &[&str],
    rows: &[Vec<i64>],
    delimiter: &str,
) -> std::io::Result<()> {
    writeln!(out, "{}", columns.join(delimiter))?;
    for row in rows {
        let fields: Vec<String> = row.iter().map(i64::to_string).collect();
        writeln!(out, "{}", fields.join(delimiter))?;
    }
    Ok(())
}

/// Writes a delimited file, replacing any existing file at `path`.
pub fn write_file(
    path: &Path,
    columns: &[&str],
    rows: &[Vec<i64>],
    delimiter: &str,
) -> Result<()> {
    let io_err = |source| Error::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    let mut out = BufWriter::new(file);
    render(&mut out, columns, rows, delimiter).map_err(io_err)?;
    out.flush().map_err(io_err)
}
