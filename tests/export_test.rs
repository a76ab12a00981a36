use autobi_cli::data::exporter::{
    build_export, csv_text, json_text, save_to_file, tsv_text, ExportFormat,
};
use autobi_cli::data::result_set::{CellValue, Column};
use chrono::TimeZone;
use tempfile::TempDir;

fn company_columns() -> Vec<Column> {
    vec![Column::dimension("company"), Column::measure("revenue")]
}

fn company_rows() -> Vec<Vec<CellValue>> {
    vec![
        vec![
            CellValue::Text("Acme, \"Inc.\"".into()),
            CellValue::Number(1200.5),
        ],
        vec![CellValue::Text("Plain Co".into()), CellValue::Null],
    ]
}

fn as_slices(rows: &[Vec<CellValue>]) -> Vec<&[CellValue]> {
    rows.iter().map(|r| r.as_slice()).collect()
}

#[test]
fn csv_quotes_only_fields_that_need_it() {
    let columns = company_columns();
    let rows = company_rows();
    let text = csv_text(&columns, &as_slices(&rows)).unwrap();

    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "company,revenue");
    assert_eq!(lines[1], "\"Acme, \"\"Inc.\"\"\",1200.5");
    assert_eq!(lines[2], "Plain Co,");
}

#[test]
fn csv_survives_a_strict_reparse() {
    let columns = company_columns();
    let rows = vec![
        vec![
            CellValue::Text("Acme, \"Inc.\"".into()),
            CellValue::Number(10.0),
        ],
        vec![CellValue::Text("line1\nline2".into()), CellValue::Number(20.0)],
    ];
    let text = csv_text(&columns, &as_slices(&rows)).unwrap();

    let mut reader = csv::ReaderBuilder::new().from_reader(text.as_bytes());
    let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();

    assert_eq!(records.len(), 2);
    assert_eq!(&records[0][0], "Acme, \"Inc.\"");
    assert_eq!(&records[1][0], "line1\nline2");
    assert_eq!(&records[1][1], "20");
}

#[test]
fn tsv_joins_on_tabs_without_escaping() {
    let columns = company_columns();
    let rows = company_rows();
    let text = tsv_text(&columns, &as_slices(&rows)).unwrap();

    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "company\trevenue");
    // Commas and quotes pass through untouched
    assert_eq!(lines[1], "Acme, \"Inc.\"\t1200.5");
    assert_eq!(lines[2], "Plain Co\t");
}

#[test]
fn json_keeps_declared_columns_in_order() {
    let columns = company_columns();
    let rows = company_rows();
    let text = json_text(&columns, &as_slices(&rows)).unwrap().unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    let array = parsed.as_array().unwrap();
    assert_eq!(array.len(), 2);

    let keys: Vec<&String> = array[0].as_object().unwrap().keys().collect();
    assert_eq!(keys, ["company", "revenue"]);

    assert_eq!(array[0]["revenue"], serde_json::json!(1200.5));
    assert!(array[1]["revenue"].is_null());
}

#[test]
fn zero_rows_export_nothing() {
    let columns = company_columns();
    let rows: Vec<&[CellValue]> = Vec::new();

    assert!(csv_text(&columns, &rows).is_none());
    assert!(tsv_text(&columns, &rows).is_none());
    assert!(json_text(&columns, &rows).unwrap().is_none());

    let at = chrono::Local.with_ymd_and_hms(2024, 3, 1, 14, 30, 5).unwrap();
    let export = build_export(&columns, &rows, ExportFormat::Csv, &at).unwrap();
    assert!(export.is_none());
}

#[test]
fn build_export_stamps_filename_and_mime() {
    let columns = company_columns();
    let rows = company_rows();
    let at = chrono::Local.with_ymd_and_hms(2024, 3, 1, 14, 30, 5).unwrap();

    let export = build_export(&columns, &as_slices(&rows), ExportFormat::Json, &at)
        .unwrap()
        .unwrap();
    assert_eq!(export.filename, "query_results_20240301_143005.json");
    assert_eq!(export.mime_type, "application/json");

    let export = build_export(&columns, &as_slices(&rows), ExportFormat::Csv, &at)
        .unwrap()
        .unwrap();
    assert_eq!(export.filename, "query_results_20240301_143005.csv");
    assert_eq!(export.mime_type, "text/csv");
}

#[test]
fn saved_export_round_trips_through_disk() {
    let columns = company_columns();
    let rows = company_rows();
    let at = chrono::Local.with_ymd_and_hms(2024, 3, 1, 14, 30, 5).unwrap();
    let export = build_export(&columns, &as_slices(&rows), ExportFormat::Csv, &at)
        .unwrap()
        .unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join(&export.filename);
    save_to_file(&export, &path).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, export.content);
}
