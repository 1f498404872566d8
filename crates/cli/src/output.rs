// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output formatting for CLI commands

use clap::ValueEnum;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Render a single value in the specified format
pub fn render<T: Serialize + fmt::Display>(
    value: &T,
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Text => Ok(value.to_string()),
        OutputFormat::Json => serde_json::to_string_pretty(value),
    }
}

/// Render a table of rows
///
/// Text output prints `header` above the rows, or `empty` alone when there
/// are none. JSON output is always an array.
pub fn render_list<T: Serialize + fmt::Display>(
    items: &[T],
    header: &str,
    empty: &str,
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Text => {
            if items.is_empty() {
                return Ok(empty.to_string());
            }
            let mut lines = vec![header.to_string()];
            lines.extend(items.iter().map(|item| item.to_string()));
            Ok(lines.join("\n"))
        }
        OutputFormat::Json => serde_json::to_string_pretty(items),
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
