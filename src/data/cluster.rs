use std::collections::BTreeMap;

use serde::Serialize;

use super::model::{Category, NormalizedRecord, Rubric, UNSPECIFIED};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Tunables for one aggregation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateOptions {
    /// Decimal places of the rounded coordinate key. Four decimals group
    /// records within roughly eleven meters.
    pub precision: u32,
    /// Maximum member names retained per cluster for display.
    pub name_preview: usize,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            precision: 4,
            name_preview: 8,
        }
    }
}

/// Categories summarized per cluster.
const FREQUENCY_CATEGORIES: [Category; 3] = [
    Category::Sponsorship,
    Category::Province,
    Category::Regime,
];

// ---------------------------------------------------------------------------
// Output shapes
// ---------------------------------------------------------------------------

/// Records sharing one rounded coordinate key, with summary statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpatialCluster {
    /// Rounded latitude of the grouping key.
    pub latitude: f64,
    /// Rounded longitude of the grouping key.
    pub longitude: f64,
    /// Member records (all have a coordinate by construction).
    pub members: usize,
    /// Per-category value → count tables. A category only appears when at
    /// least one member carries a non-empty value; empty values land in the
    /// [`UNSPECIFIED`] bucket.
    pub frequencies: BTreeMap<Category, BTreeMap<String, usize>>,
    /// Sum of the three rubric values across members.
    pub rubric_total: f64,
    /// Summed student count, when the source column resolved.
    pub students: Option<f64>,
    /// First member names, truncated to the configured preview length.
    pub names: Vec<String>,
}

/// Subset-wide totals, independent of coordinate presence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GlobalSummary {
    /// Records in the aggregated subset.
    pub records: usize,
    /// Clusters produced from coordinate-bearing records.
    pub clusters: usize,
    /// Per-rubric sums over the whole subset.
    pub rubric_sums: [f64; 3],
}

impl GlobalSummary {
    pub fn rubric_sum(&self, rubric: Rubric) -> f64 {
        self.rubric_sums[rubric as usize]
    }

    pub fn total(&self) -> f64 {
        self.rubric_sums.iter().sum()
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ClusterAccumulator {
    members: usize,
    rubric_total: f64,
    students: Option<f64>,
    names: Vec<String>,
    frequencies: BTreeMap<Category, BTreeMap<String, usize>>,
}

/// Group a filtered subset into proximity clusters and compute the global
/// summary in one pass.
///
/// Records without a coordinate contribute to the rubric sums but to no
/// cluster. Clusters come back ordered by rounded latitude, then longitude,
/// so identical input yields identical output.
pub fn aggregate<'a, I>(records: I, options: &AggregateOptions) -> (Vec<SpatialCluster>, GlobalSummary)
where
    I: IntoIterator<Item = &'a NormalizedRecord>,
{
    let scale = 10f64.powi(options.precision as i32);
    let mut groups: BTreeMap<(i64, i64), ClusterAccumulator> = BTreeMap::new();
    let mut summary = GlobalSummary::default();

    for record in records {
        summary.records += 1;
        for rubric in Rubric::ALL {
            summary.rubric_sums[rubric as usize] += record.rubric(rubric);
        }

        let Some(point) = record.coordinate else {
            continue;
        };
        let key = (
            (point.lat * scale).round() as i64,
            (point.lon * scale).round() as i64,
        );
        let group = groups.entry(key).or_default();
        group.members += 1;
        group.rubric_total += record.rubric_total();
        if let Some(students) = record.students {
            *group.students.get_or_insert(0.0) += students;
        }
        if group.names.len() < options.name_preview && !record.name.is_empty() {
            group.names.push(record.name.clone());
        }
        for category in FREQUENCY_CATEGORIES {
            let value = match record.category(category) {
                Some(v) if !v.trim().is_empty() => v,
                _ => UNSPECIFIED,
            };
            *group
                .frequencies
                .entry(category)
                .or_default()
                .entry(value.to_string())
                .or_insert(0) += 1;
        }
    }

    let clusters: Vec<SpatialCluster> = groups
        .into_iter()
        .map(|((lat_key, lon_key), mut group)| {
            // Drop tables where every member was unspecified.
            group
                .frequencies
                .retain(|_, table| table.keys().any(|value| value != UNSPECIFIED));
            SpatialCluster {
                latitude: lat_key as f64 / scale,
                longitude: lon_key as f64 / scale,
                members: group.members,
                frequencies: group.frequencies,
                rubric_total: group.rubric_total,
                students: group.students,
                names: group.names,
            }
        })
        .collect();

    summary.clusters = clusters.len();
    (clusters, summary)
}

// ---------------------------------------------------------------------------
