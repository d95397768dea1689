use std::io::Write;

use anyhow::{Context, Result};

use super::cluster::GlobalSummary;
use super::model::{Category, InstitutionDataset, Rubric};

// ---------------------------------------------------------------------------
// Rubric summary export
// ---------------------------------------------------------------------------

/// Rubric label/total pairs for the current summary, in rubric order.
pub fn summary_rows(summary: &GlobalSummary) -> Vec<(&'static str, f64)> {
    Rubric::ALL
        .iter()
        .map(|&rubric| (rubric.label(), summary.rubric_sum(rubric)))
        .collect()
}

/// Render the rubric summary as delimited text: a `rubric,value` header and
/// one line per rubric. Values use `.` as the decimal separator and are
/// rounded to cents; literal commas inside a rubric name are replaced by
/// spaces so the two-column shape survives any consumer.
pub fn rubric_summary_csv(rows: &[(&str, f64)]) -> String {
    let mut out = String::from("rubric,value\n");
    for (name, total) in rows {
        let name = name.replace(',', " ");
        let cents = (total * 100.0).round() / 100.0;
        out.push_str(&format!("{name},{cents}\n"));
    }
    out
}

// ---------------------------------------------------------------------------
// Filtered record export
// ---------------------------------------------------------------------------

/// Write the filtered subset as CSV: identifier, name, coordinate, every
/// category, every rubric. Indices are dataset positions, in subset order.
pub fn write_filtered_csv<W: Write>(
    writer: W,
    dataset: &InstitutionDataset,
    indices: &[usize],
) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec![
        "AMIE".to_string(),
        "INSTITUCION".to_string(),
        "LATITUD".to_string(),
        "LONGITUD".to_string(),
    ];
    header.extend(Category::ALL.iter().map(|c| c.label().to_string()));
    header.extend(Rubric::ALL.iter().map(|r| r.label().to_string()));
    csv_writer
        .write_record(&header)
        .context("writing CSV header")?;

    for &index in indices {
        let record = &dataset.records[index];
        let mut row = vec![record.identifier.clone(), record.name.clone()];
        match record.coordinate {
            Some(point) => {
                row.push(point.lat.to_string());
                row.push(point.lon.to_string());
            }
            None => {
                row.push(String::new());
                row.push(String::new());
            }
        }
        for category in Category::ALL {
            row.push(record.category(category).unwrap_or("").to_string());
        }
        for rubric in Rubric::ALL {
            row.push(record.rubric(rubric).to_string());
        }
        csv_writer
            .write_record(&row)
            .with_context(|| format!("writing record {index}"))?;
    }

    csv_writer.flush().context("flushing CSV output")?;
    Ok(())
}

// ---------------------------------------------------------------------------
