use crate::api_client::{ColumnMeta, QueryResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use tracing::debug;

/// Semantic role of a column as classified by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Dimension,
    Measure,
    Date,
}

impl SemanticType {
    /// Parse the wire string; anything unrecognized is treated as a dimension
    pub fn from_wire(s: &str) -> Self {
        match s {
            "measure" => SemanticType::Measure,
            "date" => SemanticType::Date,
            "dimension" => SemanticType::Dimension,
            other => {
                debug!("Unknown semantic type '{}', treating as dimension", other);
                SemanticType::Dimension
            }
        }
    }
}

/// Column metadata: display name plus semantic role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub semantic_type: SemanticType,
}

impl Column {
    pub fn new(name: impl Into<String>, semantic_type: SemanticType) -> Self {
        Self {
            name: name.into(),
            semantic_type,
        }
    }

    pub fn dimension(name: impl Into<String>) -> Self {
        Self::new(name, SemanticType::Dimension)
    }

    pub fn measure(name: impl Into<String>) -> Self {
        Self::new(name, SemanticType::Measure)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, SemanticType::Date)
    }
}

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Null,
}

impl CellValue {
    /// Convert an untyped JSON value into a cell, quarantining anything
    /// that is not a scalar as its compact JSON text form
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => CellValue::Null,
            JsonValue::Number(n) => match n.as_f64() {
                Some(f) => CellValue::Number(f),
                None => CellValue::Text(n.to_string()),
            },
            JsonValue::String(s) => CellValue::Text(s.clone()),
            JsonValue::Bool(b) => CellValue::Text(b.to_string()),
            other => CellValue::Text(other.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// JSON form used by the exporter, restricted to the scalar types
    pub fn to_json(&self) -> JsonValue {
        match self {
            CellValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            CellValue::Text(s) => JsonValue::String(s.clone()),
            CellValue::Null => JsonValue::Null,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Null => write!(f, ""),
        }
    }
}

/// One row, values aligned to the owning ResultSet's column order
pub type Row = Vec<CellValue>;

/// An immutable tabular query result: ordered columns plus rows
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(columns: Vec<Column>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Typed view of a backend answer
    pub fn from_response(response: &QueryResponse) -> Self {
        Self::from_columns_and_rows(&response.columns, &response.data)
    }

    /// Typed view of any columns-plus-rows payload (query answers,
    /// table samples)
    pub fn from_columns_and_rows(
        columns: &[ColumnMeta],
        data: &[serde_json::Map<String, JsonValue>],
    ) -> Self {
        let columns = columns
            .iter()
            .map(|meta| Column::new(meta.name.clone(), SemanticType::from_wire(&meta.r#type)))
            .collect();
        Self::from_json_rows(columns, data)
    }

    /// Build from untyped row objects as returned by the backend.
    /// Keys that match no declared column are dropped; declared columns
    /// missing from a row become Null.
    pub fn from_json_rows(
        columns: Vec<Column>,
        data: &[serde_json::Map<String, JsonValue>],
    ) -> Self {
        let rows = data
            .iter()
            .map(|obj| {
                columns
                    .iter()
                    .map(|col| {
                        obj.get(&col.name)
                            .map(CellValue::from_json)
                            .unwrap_or(CellValue::Null)
                    })
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Measure columns in declared order, with their indices
    pub fn measure_columns(&self) -> Vec<(usize, &Column)> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.semantic_type == SemanticType::Measure)
            .collect()
    }

    pub fn value(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: JsonValue) -> serde_json::Map<String, JsonValue> {
        match value {
            JsonValue::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_from_json_rows_aligns_to_columns() {
        let columns = vec![Column::dimension("region"), Column::measure("revenue")];
        let data = vec![
            obj(json!({"region": "West", "revenue": 100.5})),
            obj(json!({"revenue": 200, "region": "East"})),
        ];
        let rs = ResultSet::from_json_rows(columns, &data);

        assert_eq!(rs.row_count(), 2);
        assert_eq!(rs.rows[0][0], CellValue::Text("West".to_string()));
        assert_eq!(rs.rows[0][1], CellValue::Number(100.5));
        assert_eq!(rs.rows[1][0], CellValue::Text("East".to_string()));
        assert_eq!(rs.rows[1][1], CellValue::Number(200.0));
    }

    #[test]
    fn test_undeclared_keys_are_dropped() {
        let columns = vec![Column::dimension("region")];
        let data = vec![obj(json!({"region": "West", "internal_id": 42}))];
        let rs = ResultSet::from_json_rows(columns, &data);

        assert_eq!(rs.column_count(), 1);
        assert_eq!(rs.rows[0].len(), 1);
    }

    #[test]
    fn test_missing_declared_column_becomes_null() {
        let columns = vec![Column::dimension("region"), Column::measure("revenue")];
        let data = vec![obj(json!({"region": "West"}))];
        let rs = ResultSet::from_json_rows(columns, &data);

        assert_eq!(rs.rows[0][1], CellValue::Null);
    }

    #[test]
    fn test_non_scalar_values_are_quarantined_as_text() {
        let columns = vec![Column::dimension("tags")];
        let data = vec![obj(json!({"tags": ["a", "b"]}))];
        let rs = ResultSet::from_json_rows(columns, &data);

        assert_eq!(rs.rows[0][0], CellValue::Text("[\"a\",\"b\"]".to_string()));
    }

    #[test]
    fn test_bool_coerces_to_text() {
        assert_eq!(
            CellValue::from_json(&json!(true)),
            CellValue::Text("true".to_string())
        );
    }

    #[test]
    fn test_semantic_type_fallback() {
        assert_eq!(SemanticType::from_wire("measure"), SemanticType::Measure);
        assert_eq!(SemanticType::from_wire("date"), SemanticType::Date);
        assert_eq!(SemanticType::from_wire("weird"), SemanticType::Dimension);
    }

    #[test]
    fn test_number_display_drops_trailing_zero() {
        assert_eq!(CellValue::Number(100.0).to_string(), "100");
        assert_eq!(CellValue::Number(100.5).to_string(), "100.5");
    }
}
