use crate::color::CategoryColors;
use crate::data::cluster::{AggregateOptions, GlobalSummary, SpatialCluster, aggregate};
use crate::data::filter::{FilterCriteria, cantons_for_province, filtered_indices};
use crate::data::geo::GeoOptions;
use crate::data::model::{Category, InstitutionDataset};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full session state, independent of rendering. The dataset and the
/// criteria are replaced wholesale on load/filter change; derived values
/// (visible subset, clusters, summary) are recomputed in the same step so
/// readers never see a half-updated session.
pub struct AppState {
    /// Loaded dataset (None until the user opens a file).
    pub dataset: Option<InstitutionDataset>,

    /// Active filter selections.
    pub criteria: FilterCriteria,

    /// Indices of records passing the current criteria (cached).
    pub visible_indices: Vec<usize>,

    /// Spatial clusters over the visible subset (cached).
    pub clusters: Vec<SpatialCluster>,

    /// Subset-wide totals (cached).
    pub summary: GlobalSummary,

    /// Projection parameters for planar sources.
    pub geo_options: GeoOptions,

    /// Clustering parameters.
    pub aggregate_options: AggregateOptions,

    /// Which category colours the map points.
    pub color_category: Category,

    /// Active colour map.
    pub colors: Option<CategoryColors>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Whether a file loading operation is in progress.
    pub loading: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            dataset: None,
            criteria: FilterCriteria::default(),
            visible_indices: Vec::new(),
            clusters: Vec::new(),
            summary: GlobalSummary::default(),
            geo_options: GeoOptions::default(),
            aggregate_options: AggregateOptions::default(),
            color_category: Category::Regime,
            colors: None,
            status_message: None,
            loading: false,
        }
    }
}

impl AppState {
    /// Install a newly loaded dataset, resetting filters and derived state.
    pub fn set_dataset(&mut self, dataset: InstitutionDataset) {
        self.criteria.clear();
        self.dataset = Some(dataset);
        self.rebuild_colors();
        self.refilter();
        self.status_message = None;
        self.loading = false;
    }

    /// Recompute the visible subset, clusters and summary after any change
    /// to the criteria.
    pub fn refilter(&mut self) {
        if let Some(dataset) = &self.dataset {
            self.visible_indices = filtered_indices(dataset, &self.criteria);
            let (clusters, summary) = aggregate(
                self.visible_indices.iter().map(|&i| &dataset.records[i]),
                &self.aggregate_options,
            );
            self.clusters = clusters;
            self.summary = summary;
        } else {
            self.visible_indices.clear();
            self.clusters.clear();
            self.summary = GlobalSummary::default();
        }
    }

    /// Rebuild the colour map from the current colour category.
    pub fn rebuild_colors(&mut self) {
        self.colors = self.dataset.as_ref().and_then(|dataset| {
            dataset
                .distinct
                .get(&self.color_category)
                .map(|values| CategoryColors::new(self.color_category, values))
        });
    }

    /// Switch the category used to colour the map.
    pub fn set_color_category(&mut self, category: Category) {
        self.color_category = category;
        self.rebuild_colors();
    }

    /// Set or clear one category criterion and recompute.
    ///
    /// Changing the province invalidates a canton selection that the
    /// narrowed canton list no longer offers.
    pub fn set_category_filter(&mut self, category: Category, value: Option<String>) {
        self.criteria.set_category(category, value);

        if category == Category::Province {
            if let Some(dataset) = &self.dataset {
                let selected_canton = self.criteria.categories.get(&Category::Canton).cloned();
                if let Some(canton) = selected_canton {
                    let province = self
                        .criteria
                        .categories
                        .get(&Category::Province)
                        .map(String::as_str);
                    if !cantons_for_province(dataset, province).contains(&canton) {
                        self.criteria.categories.remove(&Category::Canton);
                    }
                }
            }
        }

        self.refilter();
    }

    /// Reset every criterion and recompute.
    pub fn clear_filters(&mut self) {
        self.criteria.clear();
        self.refilter();
    }
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
                    "UE Cuenca",
                    Some((-2.9, -79.0)),
                    &[
                        (Category::Province, "AZUAY"),
                        (Category::Canton, "CUENCA"),
                    ],
                    [100.0, 0.0, 0.0],
                ),
                record(
                    "09H00033",
                    "UE Guayaquil",
                    Some((-2.2, -79.9)),
                    &[
                        (Category::Province, "GUAYAS"),
                        (Category::Canton, "GUAYAQUIL"),
                    ],
                    [50.0, 0.0, 0.0],
                ),
            ],
            LoadReport::default(),
        )
    }

    #[test]
    fn installing_a_dataset_resets_filters_and_derived_state() {
        let mut state = AppState::default();
        state.criteria.identifier = "stale".to_string();
        state.set_dataset(dataset());

        assert!(state.criteria.is_empty());
        assert_eq!(state.visible_indices, vec![0, 1]);
        assert_eq!(state.clusters.len(), 2);
        assert_eq!(state.summary.records, 2);
    }

    #[test]
    fn refilter_keeps_subset_and_clusters_in_step() {
        let mut state = AppState::default();
        state.set_dataset(dataset());

        state.set_category_filter(Category::Province, Some("AZUAY".to_string()));
        assert_eq!(state.visible_indices, vec![0]);
        assert_eq!(state.clusters.len(), 1);
        assert!((state.summary.rubric_sums[0] - 100.0).abs() < 1e-9);

        state.clear_filters();
        assert_eq!(state.visible_indices, vec![0, 1]);
    }

    #[test]
    fn changing_province_drops_a_canton_the_new_list_lacks() {
        let mut state = AppState::default();
        state.set_dataset(dataset());

        state.set_category_filter(Category::Province, Some("AZUAY".to_string()));
        state.set_category_filter(Category::Canton, Some("CUENCA".to_string()));
        assert_eq!(state.visible_indices, vec![0]);

        state.set_category_filter(Category::Province, Some("GUAYAS".to_string()));
        assert!(!state.criteria.categories.contains_key(&Category::Canton));
        assert_eq!(state.visible_indices, vec![1]);
    }
}
