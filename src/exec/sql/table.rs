//! Parsers turning SQL client output into rows.
//!
//! | Client    | Format                                   |
//! |-----------|------------------------------------------|
//! | `sqlite3` | `-json`: one JSON array per result set   |
//! | `mysql`   | `--batch`: tab separated, escaped, NULL  |
//! | `psql`    | `--csv`: RFC 4180, NULL is bare empty    |

use serde_json::{Map, Value};

use crate::exec::driver::Row;

// ============================================================================
// JSON (sqlite3 -json)
// ============================================================================

/// Parse `sqlite3 -json` output. Multiple statements print one array each;
/// the last result set wins.
pub fn parse_json_rows(text: &str) -> Option<Vec<Row>> {
    if text.trim().is_empty() {
        return None;
    }
    serde_json::Deserializer::from_str(text)
        .into_iter::<Vec<Row>>()
        .filter_map(Result::ok)
        .last()
}

// ============================================================================
// TSV (mysql --batch)
// ============================================================================

/// Parse `mysql --batch` output: a header line, then one tab-separated line
/// per row with `\t`, `\n`, `\\` and `\0` escaped and `NULL` for nulls.
pub fn parse_tsv_rows(text: &str) -> Option<Vec<Row>> {
    let mut lines = text.lines();
    let header: Vec<String> = lines.next()?.split('\t').map(unescape_tsv).collect();

    let rows = lines
        .filter(|line| !line.is_empty())
        .map(|line| {
            let values = line.split('\t').map(|cell| match cell {
                "NULL" => Value::Null,
                cell => typed_value(&unescape_tsv(cell)),
            });
            zip_row(&header, values)
        })
        .collect();

    Some(rows)
}

fn unescape_tsv(cell: &str) -> String {
    let mut out = String::with_capacity(cell.len());
    let mut chars = cell.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

// ============================================================================
// CSV (psql --csv)
// ============================================================================

/// A CSV cell plus whether it was quoted (psql quotes empty strings, so a
/// bare empty cell is NULL).
#[derive(Debug, PartialEq)]
struct Cell {
    text: String,
    quoted: bool,
}

/// Parse `psql --csv` output into rows keyed by the header line.
pub fn parse_csv_rows(text: &str) -> Option<Vec<Row>> {
    let mut records = parse_csv(text).into_iter();
    let header: Vec<String> = records.next()?.into_iter().map(|c| c.text).collect();

    let rows = records
        .map(|record| {
            let values = record.into_iter().map(|cell| match cell {
                Cell { quoted: false, ref text } if text.is_empty() => Value::Null,
                Cell { quoted: true, text } => Value::String(text),
                Cell { text, .. } => typed_value(&text),
            });
            zip_row(&header, values)
        })
        .collect();

    Some(rows)
}

fn parse_csv(text: &str) -> Vec<Vec<Cell>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut cell = Cell {
        text: String::new(),
        quoted: false,
    };
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    cell.text.push('"');
                }
                '"' => in_quotes = false,
                c => cell.text.push(c),
            }
            continue;
        }

        match c {
            '"' => {
                in_quotes = true;
                cell.quoted = true;
            }
            ',' => record.push(std::mem::replace(
                &mut cell,
                Cell {
                    text: String::new(),
                    quoted: false,
                },
            )),
            '\r' => {}
            '\n' => {
                record.push(std::mem::replace(
                    &mut cell,
                    Cell {
                        text: String::new(),
                        quoted: false,
                    },
                ));
                records.push(std::mem::take(&mut record));
            }
            c => cell.text.push(c),
        }
    }

    if !cell.text.is_empty() || cell.quoted || !record.is_empty() {
        record.push(cell);
        records.push(record);
    }

    records
}

// ============================================================================
// Helpers
// ============================================================================

fn zip_row(header: &[String], values: impl Iterator<Item = Value>) -> Row {
    let mut row = Map::new();
    for (column, value) in header.iter().zip(values) {
        row.insert(column.clone(), value);
    }
    row
}

/// Best-effort typing of a textual cell: integers, floats, booleans, else text.
pub fn typed_value(text: &str) -> Value {
    if let Ok(int) = text.parse::<i64>() {
        return Value::from(int);
    }
    if let Ok(float) = text.parse::<f64>()
        && float.is_finite()
        && text.chars().any(|c| c.is_ascii_digit())
    {
        return Value::from(float);
    }
    match text {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(text.to_string()),
    }
}
