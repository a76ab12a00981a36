use crate::data::result_set::{CellValue, Column};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde_json::Value as JsonValue;
use std::path::Path;
use tracing::info;

/// Serialization targets offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Tsv,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "json" => Some(ExportFormat::Json),
            "tsv" => Some(ExportFormat::Tsv),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Tsv => "tsv",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
            ExportFormat::Tsv => "text/tab-separated-values",
        }
    }
}

/// A fully serialized export: the text, a suggested filename, and the
/// MIME type a download/clipboard consumer needs
#[derive(Debug, Clone, PartialEq)]
pub struct Export {
    pub content: String,
    pub filename: String,
    pub mime_type: &'static str,
}

/// Serialize the given rows. Returns None when there are no rows, so a
/// zero-row request offers nothing. Serialization is pure; writing the
/// file or clipboard is a separate step.
pub fn build_export(
    columns: &[Column],
    rows: &[&[CellValue]],
    format: ExportFormat,
    at: &DateTime<Local>,
) -> Result<Option<Export>> {
    let content = match format {
        ExportFormat::Csv => csv_text(columns, rows),
        ExportFormat::Tsv => tsv_text(columns, rows),
        ExportFormat::Json => json_text(columns, rows)?,
    };
    Ok(content.map(|content| Export {
        content,
        filename: format!(
            "query_results_{}.{}",
            at.format("%Y%m%d_%H%M%S"),
            format.extension()
        ),
        mime_type: format.mime_type(),
    }))
}

/// Comma-separated text: plain-joined header, then one line per row.
/// A field is quoted only when it contains a comma, quote, or newline.
pub fn csv_text(columns: &[Column], rows: &[&[CellValue]]) -> Option<String> {
    if rows.is_empty() {
        return None;
    }
    let header = columns
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(",");

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(header);
    for row in rows {
        let fields: Vec<String> = row
            .iter()
            .map(|value| match value {
                CellValue::Null => String::new(),
                other => escape_csv_field(&other.to_string()),
            })
            .collect();
        lines.push(fields.join(","));
    }
    Some(lines.join("\n"))
}

/// Tab-separated text for the clipboard; nulls become empty fields and
/// no escaping is applied
pub fn tsv_text(columns: &[Column], rows: &[&[CellValue]]) -> Option<String> {
    if rows.is_empty() {
        return None;
    }
    let header = columns
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join("\t");

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(header);
    for row in rows {
        let fields: Vec<String> = row.iter().map(|value| value.to_string()).collect();
        lines.push(fields.join("\t"));
    }
    Some(lines.join("\n"))
}

/// Pretty-printed JSON array of objects restricted to the declared
/// columns, keys in column order
pub fn json_text(columns: &[Column], rows: &[&[CellValue]]) -> Result<Option<String>> {
    if rows.is_empty() {
        return Ok(None);
    }
    let objects: Vec<JsonValue> = rows
        .iter()
        .map(|row| {
            let mut obj = serde_json::Map::new();
            for (idx, col) in columns.iter().enumerate() {
                let value = row.get(idx).map(|v| v.to_json()).unwrap_or(JsonValue::Null);
                obj.insert(col.name.clone(), value);
            }
            JsonValue::Object(obj)
        })
        .collect();
    let text = serde_json::to_string_pretty(&objects)?;
    Ok(Some(text))
}

/// Helper to escape CSV fields that contain special characters
fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Write an export to disk
pub fn save_to_file(export: &Export, path: &Path) -> Result<()> {
    std::fs::write(path, &export.content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Exported {} bytes to {}", export.content.len(), path.display());
    Ok(())
}

/// Put text on the system clipboard
pub fn copy_to_clipboard(content: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new().context("Clipboard unavailable")?;
    clipboard
        .set_text(content.to_string())
        .context("Failed to write clipboard")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_only_when_needed() {
        assert_eq!(escape_csv_field("plain"), "plain");
        assert_eq!(escape_csv_field("a,b"), "\"a,b\"");
        assert_eq!(escape_csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_csv_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_zero_rows_offer_nothing() {
        let columns = vec![Column::dimension("region")];
        assert!(csv_text(&columns, &[]).is_none());
        assert!(tsv_text(&columns, &[]).is_none());
        assert!(json_text(&columns, &[]).unwrap().is_none());
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(ExportFormat::parse("CSV"), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::parse("json"), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::parse("xlsx"), None);
    }
}
