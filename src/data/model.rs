use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use super::fields::Field;
use super::geo::GeoPoint;

/// Bucket label absorbing empty/missing category values in cluster
/// frequency tables.
pub const UNSPECIFIED: &str = "(unspecified)";

// ---------------------------------------------------------------------------
// Category – the filterable/aggregatable attributes of a record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Category {
    Province,
    Canton,
    Sponsorship,
    Regime,
    Zone,
    EducationLevel,
    ProvisionYear,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Province,
        Category::Canton,
        Category::Sponsorship,
        Category::Regime,
        Category::Zone,
        Category::EducationLevel,
        Category::ProvisionYear,
    ];

    pub fn field(self) -> Field {
        match self {
            Category::Province => Field::Province,
            Category::Canton => Field::Canton,
            Category::Sponsorship => Field::Sponsorship,
            Category::Regime => Field::Regime,
            Category::Zone => Field::Zone,
            Category::EducationLevel => Field::EducationLevel,
            Category::ProvisionYear => Field::ProvisionYear,
        }
    }

    /// Label shown in the filter panel and export headers.
    pub fn label(self) -> &'static str {
        match self {
            Category::Province => "Provincia",
            Category::Canton => "Cantón",
            Category::Sponsorship => "Sostenimiento",
            Category::Regime => "Régimen",
            Category::Zone => "Zona",
            Category::EducationLevel => "Nivel de educación",
            Category::ProvisionYear => "Año de dotación",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Rubric – the three tracked C2 cost categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Rubric {
    LudicMaterial,
    Furniture,
    OutdoorGames,
}

impl Rubric {
    pub const ALL: [Rubric; 3] = [
        Rubric::LudicMaterial,
        Rubric::Furniture,
        Rubric::OutdoorGames,
    ];

    pub fn field(self) -> Field {
        match self {
            Rubric::LudicMaterial => Field::RubricLudic,
            Rubric::Furniture => Field::RubricFurniture,
            Rubric::OutdoorGames => Field::RubricPlayground,
        }
    }

    /// Official rubric designation, as printed in summaries and exports.
    pub fn label(self) -> &'static str {
        match self {
            Rubric::LudicMaterial => "C2: Rubro 2.3.1 MATERIAL LÚDICO (DIDÁCTICO)",
            Rubric::Furniture => "C2: Rubro 2.3.2 MOBILIARIO",
            Rubric::OutdoorGames => "C2: Rubro 2.3.3 JUEGOS EXTERIORES (EQUIPAMIENTO)",
        }
    }
}

impl fmt::Display for Rubric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// NormalizedRecord – one institution (one source row)
// ---------------------------------------------------------------------------

/// A single institution, fully normalized. Immutable once built; filtering
/// only ever selects subsets.
#[derive(Debug, Clone)]
pub struct NormalizedRecord {
    /// AMIE code (may be empty when the source cell was blank).
    pub identifier: String,
    /// Institution display name.
    pub name: String,
    /// Geographic position, when one could be resolved.
    pub coordinate: Option<GeoPoint>,
    /// Categorical attributes; absent keys mean the source cell was empty.
    pub categories: BTreeMap<Category, String>,
    /// Monetary rubric values, zero when absent or unparseable.
    pub rubrics: [f64; 3],
    /// Enrolled student count, when the source column resolved.
    pub students: Option<f64>,
}

impl NormalizedRecord {
    pub fn category(&self, category: Category) -> Option<&str> {
        self.categories.get(&category).map(String::as_str)
    }

    pub fn rubric(&self, rubric: Rubric) -> f64 {
        self.rubrics[rubric as usize]
    }

    pub fn rubric_total(&self) -> f64 {
        self.rubrics.iter().sum()
    }
}

// ---------------------------------------------------------------------------
// LoadReport – recoverable-error accumulation
// ---------------------------------------------------------------------------

/// Row-local issues collected during normalization. Diagnostic only; the
/// pipeline never stops for these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Total rows normalized.
    pub rows: usize,
    /// Rows without a resolvable coordinate.
    pub missing_coordinate: usize,
    /// Rows whose coordinate came through the projection delegate.
    pub projected: usize,
    /// Non-empty monetary cells that failed to parse.
    pub bad_amounts: usize,
}

// ---------------------------------------------------------------------------
// InstitutionDataset – the canonical in-memory dataset
// ---------------------------------------------------------------------------

/// The full normalized dataset with a precomputed distinct-value index per
/// category, used to populate filter option lists.
#[derive(Debug, Clone)]
pub struct InstitutionDataset {
    pub records: Vec<NormalizedRecord>,
    pub distinct: BTreeMap<Category, BTreeSet<String>>,
    pub report: LoadReport,
}

impl InstitutionDataset {
    /// Build the distinct-value index from normalized records.
    pub fn from_records(records: Vec<NormalizedRecord>, report: LoadReport) -> Self {
        let mut distinct: BTreeMap<Category, BTreeSet<String>> = BTreeMap::new();
        for record in &records {
            for (category, value) in &record.categories {
                distinct
                    .entry(*category)
                    .or_default()
                    .insert(value.clone());
            }
        }
        InstitutionDataset {
            records,
            distinct,
            report,
        }
    }

    /// Number of institutions.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Shorthand constructor shared by the filter and cluster tests.
    pub(crate) fn record(
        identifier: &str,
        name: &str,
        coordinate: Option<(f64, f64)>,
        categories: &[(Category, &str)],
        rubrics: [f64; 3],
    ) -> NormalizedRecord {
        NormalizedRecord {
            identifier: identifier.to_string(),
            name: name.to_string(),
            coordinate: coordinate.map(|(lat, lon)| GeoPoint { lat, lon }),
            categories: categories
                .iter()
                .map(|(c, v)| (*c, v.to_string()))
                .collect(),
            rubrics,
            students: None,
        }
    }

    #[test]
    fn distinct_index_collects_unique_category_values() {
        let dataset = InstitutionDataset::from_records(
            vec![
                record(
                    "A1",
                    "UE Uno",
                    Some((-1.8, -78.2)),
                    &[(Category::Province, "AZUAY"), (Category::Canton, "CUENCA")],
                    [0.0; 3],
                ),
                record(
                    "A2",
                    "UE Dos",
                    None,
                    &[(Category::Province, "AZUAY"), (Category::Canton, "GUALACEO")],
                    [0.0; 3],
                ),
            ],
            LoadReport::default(),
        );
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.distinct[&Category::Province].len(), 1);
        assert_eq!(dataset.distinct[&Category::Canton].len(), 2);
        assert!(!dataset.distinct.contains_key(&Category::Regime));
    }

    #[test]
    fn rubric_accessors_index_the_fixed_slots() {
        let r = record("A1", "UE", None, &[], [100.0, 50.0, 10.0]);
        assert_eq!(r.rubric(Rubric::LudicMaterial), 100.0);
        assert_eq!(r.rubric(Rubric::Furniture), 50.0);
        assert_eq!(r.rubric(Rubric::OutdoorGames), 10.0);
        assert_eq!(r.rubric_total(), 160.0);
    }
}
