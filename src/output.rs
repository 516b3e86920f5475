//! Output formatting
//!
//! Instances are written as they arrive so long listings stream instead of
//! buffering every page.

use crate::commands::{InstanceSink, RemoveOutcome};
use crate::error::{Result, SqlError};
use crate::sql::DatabaseInstance;
use clap::ValueEnum;
use serde::Serialize;
use serde_json::Value;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Table,
}

/// Table columns: header, width
const COLUMNS: [(&str, usize); 6] = [
    ("NAME", 28),
    ("DATABASE_VERSION", 18),
    ("REGION", 16),
    ("TIER", 18),
    ("PRIMARY_ADDRESS", 16),
    ("STATE", 10),
];

fn cells(instance: &DatabaseInstance, value: &Value) -> [String; 6] {
    [
        extract_json_value(value, "name"),
        extract_json_value(value, "databaseVersion"),
        extract_json_value(value, "region"),
        extract_json_value(value, "settings.tier"),
        instance.primary_address().unwrap_or("-").to_string(),
        extract_json_value(value, "state"),
    ]
}

/// Writes instances and status markers in the chosen format
pub struct Printer<W: Write> {
    out: W,
    format: OutputFormat,
    written: usize,
}

impl<W: Write> Printer<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            written: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_document<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let text = match self.format {
            OutputFormat::Json | OutputFormat::Table => serde_json::to_string_pretty(value)
                .map_err(|e| SqlError::Output(format!("cannot render JSON: {}", e)))?,
            OutputFormat::Yaml => {
                let body = serde_yaml::to_string(value)
                    .map_err(|e| SqlError::Output(format!("cannot render YAML: {}", e)))?;
                format!("---\n{}", body.trim_end())
            },
        };
        self.write_line(&text)
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "{}", line)
            .map_err(|e| SqlError::Output(format!("cannot write to stdout: {}", e)))
    }

    fn write_row(&mut self, instance: &DatabaseInstance, value: &Value) -> Result<()> {
        if self.written == 0 {
            let header = COLUMNS
                .iter()
                .map(|(h, w)| format!("{:<width$}", h, width = *w))
                .collect::<Vec<_>>()
                .join(" ");
            self.write_line(header.trim_end())?;
        }
        let row = COLUMNS
            .iter()
            .zip(cells(instance, value))
            .map(|((_, w), cell)| format!("{:<width$}", truncate(&cell, *w), width = *w))
            .collect::<Vec<_>>()
            .join(" ");
        self.write_line(row.trim_end())
    }

    /// Report the outcome of `remove`
    pub fn outcome(&mut self, outcome: &RemoveOutcome) -> Result<()> {
        match (self.format, outcome) {
            (OutputFormat::Table, RemoveOutcome::Deleted { instance, .. }) => {
                self.write_line(&format!("Deleted {}", instance))
            },
            (OutputFormat::Table, RemoveOutcome::Skipped { instance }) => {
                self.write_line(&format!("Skipped {}", instance))
            },
            _ => self.write_document(outcome),
        }
    }
}

impl<W: Write> InstanceSink for Printer<W> {
    fn emit(&mut self, instance: &DatabaseInstance) -> Result<()> {
        if self.format == OutputFormat::Table {
            let value = serde_json::to_value(instance)
                .map_err(|e| SqlError::Output(format!("cannot render instance: {}", e)))?;
            self.write_row(instance, &value)?;
        } else {
            self.write_document(instance)?;
        }
        self.written += 1;
        self.out
            .flush()
            .map_err(|e| SqlError::Output(format!("cannot write to stdout: {}", e)))
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut t: String = s.chars().take(width.saturating_sub(1)).collect();
        t.push('…');
        t
    }
}

/// Extract a value from JSON using a dot-notation path
pub fn extract_json_value(item: &Value, path: &str) -> String {
    let mut current = item;

    for part in path.split('.') {
        let next = match part.parse::<usize>() {
            Ok(idx) => current.get(idx),
            Err(_) => current.get(part),
        };
        current = match next {
            Some(v) => v,
            None => return "-".to_string(),
        };
    }

    match current {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(_) => "[object]".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::InstanceRef;
    use serde_json::json;

    fn sample() -> DatabaseInstance {
        serde_json::from_value(json!({
            "name": "db-1",
            "project": "my-project",
            "region": "us-central1",
            "databaseVersion": "POSTGRES_15",
            "state": "RUNNABLE",
            "ipAddresses": [{"ipAddress": "34.1.2.3", "type": "PRIMARY"}],
            "settings": {"tier": "db-f1-micro"}
        }))
        .unwrap()
    }

    #[test]
    fn test_extract_json_value() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(extract_json_value(&value, "settings.tier"), "db-f1-micro");
        assert_eq!(extract_json_value(&value, "ipAddresses.0.ipAddress"), "34.1.2.3");
        assert_eq!(extract_json_value(&value, "ipAddresses"), "[1 items]");
        assert_eq!(extract_json_value(&value, "missing.path"), "-");
    }

    #[test]
    fn test_table_prints_header_once() {
        let mut printer = Printer::new(Vec::new(), OutputFormat::Table);
        printer.emit(&sample()).unwrap();
        printer.emit(&sample()).unwrap();
        let text = String::from_utf8(printer.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("NAME"));
        assert!(lines[1].contains("POSTGRES_15"));
        assert!(lines[1].contains("34.1.2.3"));
    }

    #[test]
    fn test_json_output_round_trips() {
        let mut printer = Printer::new(Vec::new(), OutputFormat::Json);
        printer.emit(&sample()).unwrap();
        let text = String::from_utf8(printer.into_inner()).unwrap();
        let parsed: DatabaseInstance = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn test_yaml_documents_are_separated() {
        let mut printer = Printer::new(Vec::new(), OutputFormat::Yaml);
        printer.emit(&sample()).unwrap();
        printer.emit(&sample()).unwrap();
        let text = String::from_utf8(printer.into_inner()).unwrap();
        assert_eq!(text.matches("---\n").count(), 2);
        assert!(text.contains("name: db-1"));
    }

    #[test]
    fn test_outcome_table() {
        let mut printer = Printer::new(Vec::new(), OutputFormat::Table);
        printer
            .outcome(&RemoveOutcome::Skipped {
                instance: InstanceRef::new("p1", "db1"),
            })
            .unwrap();
        assert_eq!(String::from_utf8(printer.into_inner()).unwrap(), "Skipped p1/db1\n");
    }

    #[test]
    fn test_table_shows_primary_address_only() {
        let instance: DatabaseInstance = serde_json::from_value(json!({
            "name": "db-private",
            "ipAddresses": [
                {"ipAddress": "10.0.0.3", "type": "PRIVATE"},
                {"ipAddress": "34.9.9.9", "type": "PRIMARY"}
            ]
        }))
        .unwrap();
        let mut printer = Printer::new(Vec::new(), OutputFormat::Table);
        printer.emit(&instance).unwrap();
        let text = String::from_utf8(printer.into_inner()).unwrap();
        assert!(text.contains("34.9.9.9"));
        assert!(!text.contains("10.0.0.3"));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed"))
        }
    }

    #[test]
    fn test_write_failure_is_output_error() {
        let mut printer = Printer::new(ClosedPipe, OutputFormat::Json);
        let err = printer.emit(&sample()).unwrap_err();
        assert!(matches!(err, SqlError::Output(_)));
        assert_eq!(err.exit_code(), 5);
        assert!(err.to_string().contains("pipe closed"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abcdef", 4), "abc…");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
