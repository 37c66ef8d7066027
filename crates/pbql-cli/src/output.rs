//! Query execution and result rendering.

use anyhow::{Context, Result};
use base64::Engine as _;
use clap::ValueEnum;
use rusqlite::types::Value;
use rusqlite::Connection;
use serde_json::{Map, Number, Value as Json};
use std::fmt;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Table,
    Json,
    Csv,
}

impl Format {
    pub fn parse(s: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(s, true).ok()
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Table => "table",
            Self::Json => "json",
            Self::Csv => "csv",
        })
    }
}

/// A fully materialized result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

pub fn run_query(conn: &Connection, sql: &str) -> Result<QueryResult> {
    let mut stmt = conn.prepare(sql).context("failed to prepare query")?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
    let width = columns.len();

    let rows = stmt
        .query_map([], |row| (0..width).map(|i| row.get::<_, Value>(i)).collect())
        .context("failed to run query")?
        .collect::<rusqlite::Result<Vec<Vec<Value>>>>()
        .context("failed to read query results")?;

    tracing::debug!(columns = width, rows = rows.len(), "query finished");
    Ok(QueryResult { columns, rows })
}

pub fn render(result: &QueryResult, format: Format, out: &mut impl Write) -> Result<()> {
    match format {
        Format::Table => write_table(result, out),
        Format::Json => write_json(result, out),
        Format::Csv => write_csv(result, out),
    }
}

/// Text form shared by the table and CSV renderers.
fn cell(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(n) => n.to_string(),
        Value::Real(x) => x.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => base64::engine::general_purpose::STANDARD.encode(b),
    }
}

fn write_table(result: &QueryResult, out: &mut impl Write) -> Result<()> {
    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(cell).collect())
        .collect();

    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (w, c) in widths.iter_mut().zip(row) {
            *w = (*w).max(c.chars().count());
        }
    }

    write_table_row(out, &result.columns, &widths)?;
    let rule: String = widths.iter().map(|w| "-".repeat(w + 2)).collect();
    writeln!(out, "{rule}")?;
    for row in &cells {
        write_table_row(out, row, &widths)?;
    }
    writeln!(out, "({} rows)", cells.len())?;
    Ok(())
}

fn write_table_row(out: &mut impl Write, values: &[String], widths: &[usize]) -> Result<()> {
    let line: String = values
        .iter()
        .zip(widths)
        .map(|(v, w)| format!("{v:<width$}", width = w + 2))
        .collect();
    writeln!(out, "{}", line.trim_end())?;
    Ok(())
}

fn write_json(result: &QueryResult, out: &mut impl Write) -> Result<()> {
    let rows: Vec<Json> = result
        .rows
        .iter()
        .map(|row| {
            let mut obj = Map::new();
            for (column, value) in result.columns.iter().zip(row) {
                obj.insert(column.clone(), json_value(value));
            }
            Json::Object(obj)
        })
        .collect();

    serde_json::to_writer_pretty(&mut *out, &rows)?;
    writeln!(out)?;
    Ok(())
}

/// Options columns hold JSON text; embed those as JSON rather than as strings.
fn json_value(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Integer(n) => Json::from(*n),
        Value::Real(x) => Number::from_f64(*x).map_or(Json::Null, Json::Number),
        Value::Text(s) => {
            let trimmed = s.trim_start();
            if trimmed.starts_with('{') || trimmed.starts_with('[') {
                if let Ok(parsed) = serde_json::from_str(s) {
                    return parsed;
                }
            }
            Json::String(s.clone())
        }
        Value::Blob(b) => Json::String(base64::engine::general_purpose::STANDARD.encode(b)),
    }
}

fn write_csv(result: &QueryResult, out: &mut impl Write) -> Result<()> {
    write_csv_record(out, result.columns.iter().map(String::as_str))?;
    for row in &result.rows {
        let cells: Vec<String> = row.iter().map(cell).collect();
        write_csv_record(out, cells.iter().map(String::as_str))?;
    }
    Ok(())
}

fn write_csv_record<'a>(out: &mut impl Write, fields: impl Iterator<Item = &'a str>) -> Result<()> {
    let record: Vec<String> = fields.map(csv_field).collect();
    writeln!(out, "{}", record.join(","))?;
    Ok(())
}

// RFC 4180: quote when the field holds a delimiter, quote or line break.
fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
