//! Reading instance objects and asking for confirmation

use crate::error::{Result, SqlError};
use crate::sql::DatabaseInstance;
use std::io::{IsTerminal, Read};

/// Parse an instance object from inline JSON, `@path` (JSON or YAML) or `-`
/// for stdin
pub fn read_instance_data(data: &str) -> Result<DatabaseInstance> {
    let (content, source) = if data == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| SqlError::Configuration(format!("Failed to read from stdin: {}", e)))?;
        (buffer, "stdin".to_string())
    } else if let Some(file_path) = data.strip_prefix('@') {
        let content = std::fs::read_to_string(file_path).map_err(|e| {
            SqlError::Configuration(format!("Failed to read file {}: {}", file_path, e))
        })?;
        (content, file_path.to_string())
    } else {
        (data.to_string(), "argument".to_string())
    };

    parse_instance(&content, &source)
}

/// JSON first; YAML (a superset) as fallback
pub fn parse_instance(content: &str, source: &str) -> Result<DatabaseInstance> {
    match serde_json::from_str(content) {
        Ok(instance) => Ok(instance),
        Err(json_err) => serde_yaml::from_str(content).map_err(|yaml_err| {
            SqlError::Configuration(format!(
                "Invalid instance object in {}: not JSON ({}) nor YAML ({})",
                source, json_err, yaml_err
            ))
        }),
    }
}

/// "Would this action proceed" gate in front of destructive calls
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// Interactive confirmation on a terminal; declines when stdin is not a TTY
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        if !std::io::stdin().is_terminal() {
            eprintln!("Warning: {} Use --force to skip confirmation.", prompt);
            return Ok(false);
        }

        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| SqlError::Configuration(format!("Failed to get user confirmation: {}", e)))
    }
}
