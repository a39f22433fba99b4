//! Rendering query results for the terminal.

use colored::Colorize;
use kviri_core::{Evaluator, Item, Query};
use serde_json::Value;

use crate::config::OutputFormat;
use crate::error::PlanResult;

/// Render the query's results (or its bindings, before any terminal clause).
pub fn render<E: Evaluator>(query: &Query<E>, format: OutputFormat) -> PlanResult<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&query.to_value())?),
        OutputFormat::Lines => {
            let lines = query
                .iter()
                .map(|item| serde_json::to_string(&item.to_value()))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(lines.join("\n"))
        }
        OutputFormat::Pretty => Ok(render_pretty(query)),
    }
}

fn render_pretty<E: Evaluator>(query: &Query<E>) -> String {
    let mut lines = Vec::new();
    for item in query {
        match item {
            Item::Row(row) => lines.push(format_row(row)),
            Item::Group(group) => {
                lines.push(format!("{} {}", format_value(&group.key).bold(), "=>".dimmed()));
                for row in &group.rows {
                    lines.push(format!("  {}", format_row(row)));
                }
            }
            Item::Binding(binding) => {
                let fields: Vec<String> = binding
                    .iter()
                    .map(|(name, value)| format!("{} = {}", name.cyan(), format_value(value)))
                    .collect();
                lines.push(fields.join(", "));
            }
        }
    }

    if lines.is_empty() {
        return "(no results)".dimmed().to_string();
    }
    lines.join("\n")
}

fn format_row(row: &[Value]) -> String {
    let cells: Vec<String> = row.iter().map(format_value).collect();
    format!("({})", cells.join(", "))
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".dimmed().to_string(),
        Value::Bool(b) => if *b { "true".green() } else { "false".red() }.to_string(),
        Value::Number(n) => n.to_string().yellow().to_string(),
        Value::String(s) => format!("\"{}\"", s).green().to_string(),
        // nested values stay compact
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
