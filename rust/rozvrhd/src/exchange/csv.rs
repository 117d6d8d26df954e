//! Quote-wrapping CSV writer and the matching naive reader.
//!
//! Neither side is RFC 4180 aware. The writer wraps every cell in double quotes without
//! escaping; the reader splits each line on commas and drops every `"` it sees. A cell that
//! contains a comma therefore comes back as several cells. Files produced by earlier
//! exports look exactly like this.

use serde_json::{Map, Value};

/// One parsed data line, header name → raw text, in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvRow {
    fields: Vec<(String, String)>,
}

impl CsvRow {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Missing columns read as empty text.
    pub fn text(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    /// Splits a comma-joined list cell. Empty pieces are dropped.
    pub fn list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Blank or missing cells take `default`; anything else must parse.
    pub fn integer_or(&self, key: &str, default: i64) -> Result<i64, String> {
        let raw = self.get(key).unwrap_or_default().trim();
        if raw.is_empty() {
            return Ok(default);
        }
        raw.parse::<i64>()
            .map_err(|_| format!("'{key}' is not an integer: '{raw}'"))
    }

    pub fn flag(&self, key: &str) -> bool {
        matches!(self.get(key).map(str::trim), Some("true") | Some("1"))
    }

}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CsvRow {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        CsvRow {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

pub fn parse_csv(text: &str) -> Vec<CsvRow> {
    let mut lines = text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l));
    let Some(header_line) = lines.next() else {
        return Vec::new();
    };
    let headers: Vec<String> = header_line.split(',').map(strip_quotes).collect();

    let mut rows = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let values: Vec<String> = line.split(',').map(strip_quotes).collect();
        rows.push(
            headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.clone(), values.get(i).cloned().unwrap_or_default()))
                .collect(),
        );
    }
    rows
}

fn strip_quotes(cell: &str) -> String {
    cell.chars().filter(|c| *c != '"').collect()
}

/// Header from the first row's keys, then one quote-wrapped line per row.
pub fn write_csv(rows: &[Map<String, Value>]) -> String {
    let Some(first) = rows.first() else {
        return String::new();
    };
    let headers: Vec<&String> = first.keys().collect();

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        headers
            .iter()
            .map(|h| h.as_str())
            .collect::<Vec<_>>()
            .join(","),
    );
    for row in rows {
        let cells: Vec<String> = headers
            .iter()
            .map(|h| format!("\"{}\"", row.get(h.as_str()).map(cell_text).unwrap_or_default()))
            .collect();
        lines.push(cells.join(","));
    }
    lines.join("\n")
}

// Falsy values (null, false, 0, "") export as empty cells.
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(false) => String::new(),
        Value::Bool(true) => "true".to_string(),
        Value::Number(n) if n.as_f64() == Some(0.0) => String::new(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
