use std::collections::{BTreeMap, BTreeSet};

use super::fields::fold;
use super::model::{Category, InstitutionDataset, NormalizedRecord};

// ---------------------------------------------------------------------------
// Filter criteria: identifier substring + exact category matches
// ---------------------------------------------------------------------------

/// Active filter selections. Rebuilt wholesale on every interaction; an
/// empty criterion imposes no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    /// Case- and diacritic-insensitive substring of the AMIE code.
    pub identifier: String,
    /// Exact-match value per categorical field.
    pub categories: BTreeMap<Category, String>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.identifier.trim().is_empty() && self.categories.is_empty()
    }

    pub fn clear(&mut self) {
        self.identifier.clear();
        self.categories.clear();
    }

    /// Set or remove one category criterion. `None` and blank values both
    /// clear it.
    pub fn set_category(&mut self, category: Category, value: Option<String>) {
        match value.filter(|v| !v.trim().is_empty()) {
            Some(v) => {
                self.categories.insert(category, v);
            }
            None => {
                self.categories.remove(&category);
            }
        }
    }

    /// One record against all active criteria (logical AND).
    pub fn passes(&self, record: &NormalizedRecord) -> bool {
        let needle = fold(&self.identifier);
        if !needle.is_empty() && !fold(&record.identifier).contains(&needle) {
            return false;
        }
        for (category, wanted) in &self.categories {
            let wanted = fold(wanted);
            if wanted.is_empty() {
                continue;
            }
            match record.category(*category) {
                Some(value) if fold(value) == wanted => {}
                _ => return false,
            }
        }
        true
    }

    /// Human-readable summary of the active criteria, for the status line.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if !self.identifier.trim().is_empty() {
            parts.push(format!("AMIE~{}", self.identifier.trim()));
        }
        for (category, value) in &self.categories {
            parts.push(format!("{category}={value}"));
        }
        if parts.is_empty() {
            "—".to_string()
        } else {
            parts.join(" • ")
        }
    }
}

/// Indices of records passing the current criteria, in dataset order.
pub fn filtered_indices(dataset: &InstitutionDataset, criteria: &FilterCriteria) -> Vec<usize> {
    dataset
        .records
        .iter()
        .enumerate()
        .filter(|(_, record)| criteria.passes(record))
        .map(|(i, _)| i)
        .collect()
}

// ---------------------------------------------------------------------------
// Derived option lists
// ---------------------------------------------------------------------------

/// Distinct cantons observed among records of one province (or of the whole
/// dataset when no province is active). Backs the cascaded canton combo.
pub fn cantons_for_province(
    dataset: &InstitutionDataset,
    province: Option<&str>,
) -> BTreeSet<String> {
    let wanted = province.map(fold).filter(|p| !p.is_empty());
    dataset
        .records
        .iter()
        .filter(|record| match &wanted {
            Some(p) => record
                .category(Category::Province)
                .is_some_and(|v| fold(v) == *p),
            None => true,
        })
        .filter_map(|record| record.category(Category::Canton))
        .map(str::to_string)
        .collect()
}

/// Sort key for planning-zone labels: embedded number first ("Zona 2"
/// before "Zona 10"), unnumbered labels last.
pub fn zone_sort_key(value: &str) -> (u32, String) {
    let digits: String = value
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    (digits.parse().unwrap_or(u32::MAX), value.to_string())
}

/// Option list for one category's combo box, in display order.
pub fn category_options(dataset: &InstitutionDataset, category: Category) -> Vec<String> {
    let mut options: Vec<String> = dataset
        .distinct
        .get(&category)
        .map(|values| values.iter().cloned().collect())
        .unwrap_or_default();
    if category == Category::Zone {
        options.sort_by_key(|v| zone_sort_key(v));
    }
    options
}

// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::record;
    use crate::data::model::LoadReport;

    fn dataset() -> InstitutionDataset {
        InstitutionDataset::from_records(
            vec![
                record(
                    "05H00011",
                    "UE Cuenca Norte",
                    Some((-2.9, -79.0)),
                    &[
                        (Category::Province, "AZUAY"),
                        (Category::Canton, "CUENCA"),
                        (Category::Regime, "SIERRA"),
                    ],
                    [100.0, 0.0, 0.0],
                ),
                record(
                    "05H00022",
                    "UE Gualaceo",
                    Some((-2.88, -78.77)),
                    &[
                        (Category::Province, "AZUAY"),
                        (Category::Canton, "GUALACEO"),
                        (Category::Regime, "SIERRA"),
                    ],
                    [0.0, 50.0, 0.0],
                ),
                record(
                    "09H00033",
                    "UE Guayaquil Sur",
                    Some((-2.2, -79.9)),
                    &[
                        (Category::Province, "GUAYAS"),
                        (Category::Canton, "GUAYAQUIL"),
                        (Category::Regime, "COSTA"),
                    ],
                    [0.0, 0.0, 10.0],
                ),
            ],
            LoadReport::default(),
        )
    }

    #[test]
    fn empty_criteria_pass_every_record() {
        let ds = dataset();
        let criteria = FilterCriteria::default();
        assert!(criteria.is_empty());
        assert_eq!(filtered_indices(&ds, &criteria), vec![0, 1, 2]);
    }

    #[test]
    fn all_active_criteria_must_pass() {
        let ds = dataset();
        let mut criteria = FilterCriteria::default();
        criteria.identifier = "05H".to_string();
        criteria.set_category(Category::Province, Some("AZUAY".to_string()));
        assert_eq!(filtered_indices(&ds, &criteria), vec![0, 1]);

        // Adding a canton narrows further; the AND never widens.
        criteria.set_category(Category::Canton, Some("CUENCA".to_string()));
        assert_eq!(filtered_indices(&ds, &criteria), vec![0]);

        // A criterion contradicting the identifier filter empties the set.
        criteria.identifier = "09H".to_string();
        assert_eq!(filtered_indices(&ds, &criteria), Vec::<usize>::new());
    }

    #[test]
    fn matching_is_case_and_diacritic_insensitive() {
        let ds = InstitutionDataset::from_records(
            vec![record(
                "05h00011",
                "UE Cañar",
                None,
                &[(Category::Province, "CAÑAR")],
                [0.0; 3],
            )],
            LoadReport::default(),
        );
        let mut criteria = FilterCriteria::default();
        criteria.identifier = "5H000".to_string();
        criteria.set_category(Category::Province, Some("cañar".to_string()));
        assert_eq!(filtered_indices(&ds, &criteria).len(), 1);

        criteria.set_category(Category::Province, Some("CANAR".to_string()));
        assert_eq!(filtered_indices(&ds, &criteria).len(), 1);
    }

    #[test]
    fn records_without_the_category_fail_an_active_criterion() {
        let ds = InstitutionDataset::from_records(
            vec![record("A1", "UE", None, &[], [0.0; 3])],
            LoadReport::default(),
        );
        let mut criteria = FilterCriteria::default();
        criteria.set_category(Category::Province, Some("AZUAY".to_string()));
        assert!(filtered_indices(&ds, &criteria).is_empty());
    }

    #[test]
    fn subset_preserves_dataset_order() {
        let ds = dataset();
        let mut criteria = FilterCriteria::default();
        criteria.set_category(Category::Regime, Some("SIERRA".to_string()));
        assert_eq!(filtered_indices(&ds, &criteria), vec![0, 1]);
    }

    #[test]
    fn canton_options_cascade_from_the_active_province() {
        let ds = dataset();
        let all: Vec<String> = cantons_for_province(&ds, None).into_iter().collect();
        assert_eq!(all, vec!["CUENCA", "GUALACEO", "GUAYAQUIL"]);

        let azuay: Vec<String> = cantons_for_province(&ds, Some("Azuay")).into_iter().collect();
        assert_eq!(azuay, vec!["CUENCA", "GUALACEO"]);
    }

    #[test]
    fn zone_options_sort_by_embedded_number() {
        let ds = InstitutionDataset::from_records(
            vec![
                record("A1", "a", None, &[(Category::Zone, "Zona 10")], [0.0; 3]),
                record("A2", "b", None, &[(Category::Zone, "Zona 2")], [0.0; 3]),
                record("A3", "c", None, &[(Category::Zone, "Sin zona")], [0.0; 3]),
            ],
            LoadReport::default(),
        );
        assert_eq!(
            category_options(&ds, Category::Zone),
            vec!["Zona 2", "Zona 10", "Sin zona"]
        );
    }

    #[test]
    fn blank_category_values_clear_the_criterion() {
        let mut criteria = FilterCriteria::default();
        criteria.set_category(Category::Province, Some("AZUAY".to_string()));
        assert!(!criteria.is_empty());
        criteria.set_category(Category::Province, Some("  ".to_string()));
        assert!(criteria.is_empty());
    }
}
