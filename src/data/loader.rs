use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::fields::{self, ColumnBinding, Field};
use super::geo::{self, GeoOptions, Projector, ResolvedCoordinate};
use super::model::{
    Category, InstitutionDataset, LoadReport, NormalizedRecord, Rubric,
};
use super::numeric::parse_amount;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load an institution dataset from a file. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – delimiter sniffed between `,` and `;` (both occur in the wild)
/// * `.json`    – records orientation: `[{ "AMIE": "...", ... }, ...]`
/// * `.parquet` – flat table, one column per raw header
pub fn load_file(
    path: &Path,
    options: &GeoOptions,
    projector: &dyn Projector,
) -> Result<InstitutionDataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let (headers, rows) = match ext.as_str() {
        "csv" => read_csv(path)?,
        "json" => read_json(path)?,
        "parquet" | "pq" => read_parquet(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };

    let dataset = normalize_rows(&headers, &rows, options, projector)?;
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// Normalization pipeline (shared by all formats)
// ---------------------------------------------------------------------------

/// Resolve the column binding and normalize every raw row.
///
/// Fails only when a required column cannot be resolved; every row-level
/// problem degrades to a default value and a [`LoadReport`] count.
pub fn normalize_rows(
    headers: &[String],
    rows: &[Vec<String>],
    options: &GeoOptions,
    projector: &dyn Projector,
) -> Result<InstitutionDataset, fields::ResolveError> {
    let binding = fields::resolve(headers)?;

    let mut report = LoadReport::default();
    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        records.push(normalize_row(row, &binding, options, projector, &mut report));
    }
    report.rows = records.len();

    Ok(InstitutionDataset::from_records(records, report))
}

fn cell<'a>(row: &'a [String], binding: &ColumnBinding, field: Field) -> &'a str {
    binding
        .index_of(field)
        .and_then(|index| row.get(index))
        .map(String::as_str)
        .unwrap_or("")
}

fn normalize_row(
    row: &[String],
    binding: &ColumnBinding,
    options: &GeoOptions,
    projector: &dyn Projector,
    report: &mut LoadReport,
) -> NormalizedRecord {
    let identifier = cell(row, binding, Field::Identifier).trim().to_string();
    let name = cell(row, binding, Field::Name).trim().to_string();

    let zone_cell = binding
        .index_of(Field::UtmZone)
        .and_then(|index| row.get(index))
        .map(String::as_str);
    let resolved = geo::resolve_coordinate(
        cell(row, binding, Field::Latitude),
        cell(row, binding, Field::Longitude),
        zone_cell,
        options,
        projector,
    );
    match resolved {
        ResolvedCoordinate::Projected(_) => report.projected += 1,
        ResolvedCoordinate::Absent => report.missing_coordinate += 1,
        ResolvedCoordinate::Geographic(_) => {}
    }

    let mut rubrics = [0.0; 3];
    for rubric in Rubric::ALL {
        let raw = cell(row, binding, rubric.field()).trim();
        match parse_amount(raw) {
            Some(value) => rubrics[rubric as usize] = value,
            None if !raw.is_empty() => report.bad_amounts += 1,
            None => {}
        }
    }

    let categories = Category::ALL
        .iter()
        .filter_map(|&category| {
            let value = cell(row, binding, category.field()).trim();
            (!value.is_empty()).then(|| (category, value.to_string()))
        })
        .collect();

    let students = parse_amount(cell(row, binding, Field::Students));

    NormalizedRecord {
        identifier,
        name,
        coordinate: resolved.point(),
        categories,
        rubrics,
        students,
    }
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

/// Ministry exports use `;`, the cleaned-up extracts use `,`. The header
/// line tells them apart.
fn detect_delimiter(header_line: &str) -> u8 {
    let semicolons = header_line.matches(';').count();
    let commas = header_line.matches(',').count();
    if semicolons > commas { b';' } else { b',' }
}

fn sniff_delimiter(path: &Path) -> Result<u8> {
    let file = File::open(path).context("opening CSV")?;
    let mut first_line = String::new();
    BufReader::new(file)
        .read_line(&mut first_line)
        .context("reading CSV header line")?;
    Ok(detect_delimiter(&first_line))
}

fn read_csv(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let delimiter = sniff_delimiter(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .context("opening CSV")?;

    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push(record.iter().map(|v| v.to_string()).collect());
    }

    Ok((headers, rows))
}

// ---------------------------------------------------------------------------
// JSON reader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, what the upstream table API
/// returns):
///
/// ```json
/// [
///   { "AMIE": "05H00011", "INSTITUCION": "...", "LATITUD": -2.9, ... },
///   ...
/// ]
/// ```
///
/// Headers are the union of keys across rows, in first-seen order; every
/// value is rendered back to its raw text form for the shared pipeline.
fn read_json(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut headers: Vec<String> = Vec::new();
    let mut objects = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        let obj = record
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !headers.iter().any(|h| h == key) {
                headers.push(key.clone());
            }
        }
        objects.push(obj);
    }

    let rows: Vec<Vec<String>> = objects
        .iter()
        .map(|obj| {
            headers
                .iter()
                .map(|key| obj.get(key).map(json_to_cell).unwrap_or_default())
                .collect()
        })
        .collect();

    Ok((headers, rows))
}

fn json_to_cell(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

/// Load a flat Parquet table: one column per raw header, one row per
/// institution. Works with files written by both Pandas and Polars.
fn read_parquet(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let file = File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut headers: Vec<String> = Vec::new();
    let mut rows: Vec<Vec<String>> = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        if headers.is_empty() {
            headers = schema.fields().iter().map(|f| f.name().clone()).collect();
        }

        for row in 0..batch.num_rows() {
            let cells: Vec<String> = (0..batch.num_columns())
                .map(|col| cell_to_string(batch.column(col), row))
                .collect();
            rows.push(cells);
        }
    }

    Ok((headers, rows))
}

/// Render a single Arrow cell back to raw text.
fn cell_to_string(col: &Arc<dyn Array>, row: usize) -> String {
    if col.is_null(row) {
        return String::new();
    }
    match col.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 => {
            if let Some(s) = col.as_any().downcast_ref::<StringArray>() {
                s.value(row).to_string()
            } else {
                // LargeStringArray
                col.as_string::<i64>().value(row).to_string()
            }
        }
        DataType::Int32 => col
            .as_any()
            .downcast_ref::<Int32Array>()
            .map(|arr| arr.value(row).to_string())
            .unwrap_or_default(),
        DataType::Int64 => col
            .as_any()
            .downcast_ref::<Int64Array>()
            .map(|arr| arr.value(row).to_string())
            .unwrap_or_default(),
        DataType::Float32 => col
            .as_any()
            .downcast_ref::<Float32Array>()
            .map(|arr| arr.value(row).to_string())
            .unwrap_or_default(),
        DataType::Float64 => col
            .as_any()
            .downcast_ref::<Float64Array>()
            .map(|arr| arr.value(row).to_string())
            .unwrap_or_default(),
        DataType::Boolean => col
            .as_any()
            .downcast_ref::<BooleanArray>()
            .map(|arr| arr.value(row).to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::geo::UtmGrid;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rows_normalize_against_the_resolved_binding() {
        let headers = strings(&[
            "AMIE",
            "INSTITUCIÓN",
            "LATITUD",
            "LONGITUD",
            "PROVINCIA",
            "MD_MONTO USD$",
        ]);
        let rows = vec![
            strings(&["05H00011", "UE Uno", "-2.9", "-79.0", "AZUAY", "1.234,56"]),
            strings(&["05H00022", "UE Dos", "", "", "AZUAY", "$100"]),
        ];
        let dataset =
            normalize_rows(&headers, &rows, &GeoOptions::default(), &UtmGrid).unwrap();

        assert_eq!(dataset.len(), 2);
        let first = &dataset.records[0];
        assert_eq!(first.identifier, "05H00011");
        let point = first.coordinate.unwrap();
        assert_eq!((point.lat, point.lon), (-2.9, -79.0));
        assert!((first.rubric(Rubric::LudicMaterial) - 1234.56).abs() < 1e-9);

        let second = &dataset.records[1];
        assert!(second.coordinate.is_none());
        assert_eq!(second.rubric(Rubric::LudicMaterial), 100.0);

        assert_eq!(dataset.report.rows, 2);
        assert_eq!(dataset.report.missing_coordinate, 1);
        assert_eq!(dataset.report.bad_amounts, 0);
    }

    #[test]
    fn planar_rows_are_projected_and_counted() {
        let headers = strings(&["AMIE", "INSTITUCION", "GIS_Y", "GIS_X"]);
        let rows = vec![strings(&["05H00011", "UE Uno", "9800000", "800000"])];
        let dataset =
            normalize_rows(&headers, &rows, &GeoOptions::default(), &UtmGrid).unwrap();

        let point = dataset.records[0].coordinate.unwrap();
        assert!((point.lat - -1.80744).abs() < 1e-4);
        assert!((point.lon - -78.30364).abs() < 1e-4);
        assert_eq!(dataset.report.projected, 1);
        assert_eq!(dataset.report.missing_coordinate, 0);
    }

    #[test]
    fn missing_required_columns_fail_the_whole_load() {
        let headers = strings(&["AMIE", "PROVINCIA"]);
        let err = normalize_rows(&headers, &[], &GeoOptions::default(), &UtmGrid).unwrap_err();
        assert!(err.missing.contains(&Field::Latitude));
    }

    #[test]
    fn bad_amount_cells_degrade_to_zero_but_are_counted() {
        let headers = strings(&["AMIE", "INSTITUCION", "LATITUD", "LONGITUD", "M_MONTO_USD"]);
        let rows = vec![
            strings(&["A1", "UE", "-1.8", "-78.2", "n/a"]),
            strings(&["A2", "UE", "-1.8", "-78.2", ""]),
        ];
        let dataset =
            normalize_rows(&headers, &rows, &GeoOptions::default(), &UtmGrid).unwrap();
        assert_eq!(dataset.records[0].rubric(Rubric::Furniture), 0.0);
        assert_eq!(dataset.report.bad_amounts, 1);
    }

    #[test]
    fn short_rows_read_as_empty_cells() {
        let headers = strings(&["AMIE", "INSTITUCION", "LATITUD", "LONGITUD", "PROVINCIA"]);
        let rows = vec![strings(&["A1", "UE"])];
        let dataset =
            normalize_rows(&headers, &rows, &GeoOptions::default(), &UtmGrid).unwrap();
        assert!(dataset.records[0].coordinate.is_none());
        assert!(dataset.records[0].category(Category::Province).is_none());
    }

    #[test]
    fn delimiter_detection_prefers_the_majority_separator() {
        assert_eq!(detect_delimiter("AMIE;INSTITUCIÓN;LATITUD;LONGITUD"), b';');
        assert_eq!(detect_delimiter("AMIE,INSTITUCION,LATITUD,LONGITUD"), b',');
        // A comma inside one header must not flip a semicolon file.
        assert_eq!(detect_delimiter("AMIE;NOMBRE, COMPLETO;LATITUD;LONGITUD"), b';');
        assert_eq!(detect_delimiter("AMIE"), b',');
    }

    #[test]
    fn json_cells_render_numbers_and_nulls_as_text() {
        assert_eq!(json_to_cell(&serde_json::json!("x")), "x");
        assert_eq!(json_to_cell(&serde_json::json!(-2.9)), "-2.9");
        assert_eq!(json_to_cell(&serde_json::json!(100)), "100");
        assert_eq!(json_to_cell(&JsonValue::Null), "");
    }
}
