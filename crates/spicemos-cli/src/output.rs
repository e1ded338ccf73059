//! Result tables and their text, CSV and JSON renderings.

use std::fmt::Write;

use clap::ValueEnum;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Csv,
    Json,
}

/// Named columns of numeric rows.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<f64>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn render(&self, format: Format) -> anyhow::Result<String> {
        Ok(match format {
            Format::Text => self.to_text(),
            Format::Csv => self.to_csv(),
            Format::Json => serde_json::to_string_pretty(self)?,
        })
    }

    fn to_csv(&self) -> String {
        let mut out = self.columns.join(",");
        out.push('\n');
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(|v| format!("{v:e}")).collect();
            out.push_str(&cells.join(","));
            out.push('\n');
        }
        out
    }

    fn to_text(&self) -> String {
        let mut out = String::new();
        for c in &self.columns {
            let _ = write!(out, "{c:>14}");
        }
        out.push('\n');
        for row in &self.rows {
            for v in row {
                let _ = write!(out, "{v:>14.6e}");
            }
            out.push('\n');
        }
        out
    }
}

/// Name/value pairs for a single operating point.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub values: indexmap::IndexMap<String, f64>,
}

impl Report {
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn render(&self, format: Format) -> anyhow::Result<String> {
        Ok(match format {
            Format::Text => {
                let mut out = String::new();
                for (k, v) in &self.values {
                    let _ = writeln!(out, "{k:>8} = {v:.6e}");
                }
                out
            }
            Format::Csv => {
                let mut out = String::from("name,value\n");
                for (k, v) in &self.values {
                    let _ = writeln!(out, "{k},{v:e}");
                }
                out
            }
            Format::Json => serde_json::to_string_pretty(&self.values)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_csv() {
        let mut t = Table::new(["vg", "id"]);
        t.push(vec![1.0, 2.5e-5]);
        assert_eq!(t.render(Format::Csv).unwrap(), "vg,id\n1e0,2.5e-5\n");
    }

    #[test]
    fn test_table_json_shape() {
        let mut t = Table::new(["f"]);
        t.push(vec![1e3]);
        let v: serde_json::Value = serde_json::from_str(&t.render(Format::Json).unwrap()).unwrap();
        assert_eq!(v["columns"][0], "f");
        assert_eq!(v["rows"][0][0], 1e3);
    }

    #[test]
    fn test_report_keeps_insertion_order() {
        let mut r = Report::default();
        r.insert("id", 1.0);
        r.insert("gm", 2.0);
        let text = r.render(Format::Text).unwrap();
        assert!(text.find("id").unwrap() < text.find("gm").unwrap());
        assert_eq!(r.render(Format::Csv).unwrap(), "name,value\nid,1e0\ngm,2e0\n");
    }
}
