use std::ops::RangeInclusive;

use serde::Serialize;
use thiserror::Error;

use super::numeric::parse_amount;

// ---------------------------------------------------------------------------
// Geographic coordinate
// ---------------------------------------------------------------------------

/// A geographic coordinate in signed decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

const LAT_RANGE: RangeInclusive<f64> = -90.0..=90.0;
const LON_RANGE: RangeInclusive<f64> = -180.0..=180.0;

/// Magnitude ranges that identify planar (projected) coordinates in the
/// region of interest. Northings around ten million and eastings up to a
/// million are consistent with southern-hemisphere UTM over Ecuador and
/// cannot be confused with degree values.
const EASTING_RANGE: RangeInclusive<f64> = 10_000.0..=1_000_000.0;
const NORTHING_RANGE: RangeInclusive<f64> = 9_000_000.0..=11_000_000.0;

// ---------------------------------------------------------------------------
// Projection delegate
// ---------------------------------------------------------------------------

/// The delegate rejected a transform request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProjectionError {
    #[error("UTM zone {0} outside 1..=60")]
    UnsupportedZone(u8),
    #[error("non-finite planar input")]
    BadInput,
}

/// Capability interface for the planar → geographic transform. The engine
/// decides *whether* a conversion is needed and with which zone/hemisphere
/// parameters; the delegate owns the geodesy.
pub trait Projector {
    /// Project a planar (easting, northing) pair in the given UTM zone to
    /// geographic (longitude, latitude) degrees.
    fn project(
        &self,
        easting: f64,
        northing: f64,
        zone: u8,
        south: bool,
    ) -> Result<(f64, f64), ProjectionError>;
}

// ---------------------------------------------------------------------------
// Bundled delegate: WGS84 inverse transverse Mercator
// ---------------------------------------------------------------------------

/// Default projector: inverse UTM on the WGS84 ellipsoid via the Snyder
/// series expansion.
#[derive(Debug, Clone, Copy, Default)]
pub struct UtmGrid;

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

impl Projector for UtmGrid {
    fn project(
        &self,
        easting: f64,
        northing: f64,
        zone: u8,
        south: bool,
    ) -> Result<(f64, f64), ProjectionError> {
        if !(1..=60).contains(&zone) {
            return Err(ProjectionError::UnsupportedZone(zone));
        }
        if !easting.is_finite() || !northing.is_finite() {
            return Err(ProjectionError::BadInput);
        }

        let e2 = WGS84_F * (2.0 - WGS84_F);
        let ep2 = e2 / (1.0 - e2);

        let x = easting - FALSE_EASTING;
        let y = northing - if south { FALSE_NORTHING_SOUTH } else { 0.0 };

        // Footpoint latitude from the meridional arc.
        let m = y / K0;
        let mu = m
            / (WGS84_A
                * (1.0 - e2 / 4.0 - 3.0 * e2.powi(2) / 64.0 - 5.0 * e2.powi(3) / 256.0));
        let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());
        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1.powi(2) / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let sin1 = phi1.sin();
        let cos1 = phi1.cos();
        let tan1 = phi1.tan();

        let c1 = ep2 * cos1 * cos1;
        let t1 = tan1 * tan1;
        let n1 = WGS84_A / (1.0 - e2 * sin1 * sin1).sqrt();
        let r1 = WGS84_A * (1.0 - e2) / (1.0 - e2 * sin1 * sin1).powf(1.5);
        let d = x / (n1 * K0);

        let lat = phi1
            - (n1 * tan1 / r1)
                * (d.powi(2) / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4)
                        / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                        - 252.0 * ep2
                        - 3.0 * c1 * c1)
                        * d.powi(6)
                        / 720.0);

        let lon0 = f64::from(zone) * 6.0 - 183.0;
        let lon = lon0.to_radians()
            + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1)
                    * d.powi(5)
                    / 120.0)
                / cos1;

        Ok((lon.to_degrees(), lat.to_degrees()))
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Dataset-level projection parameters for sources that carry planar
/// coordinates without declaring their coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoOptions {
    /// UTM zone assumed when no explicit zone column resolves.
    pub default_zone: u8,
    /// Hemisphere of the false-northing offset.
    pub south: bool,
}

impl Default for GeoOptions {
    fn default() -> Self {
        // Continental Ecuador sits in zone 17 south.
        Self {
            default_zone: 17,
            south: true,
        }
    }
}

/// Outcome of classifying one row's coordinate cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolvedCoordinate {
    /// Cells already held degree values.
    Geographic(GeoPoint),
    /// Cells held planar values and went through the projection delegate.
    Projected(GeoPoint),
    /// Unparseable, out of every known range, or rejected by the delegate.
    Absent,
}

impl ResolvedCoordinate {
    pub fn point(self) -> Option<GeoPoint> {
        match self {
            ResolvedCoordinate::Geographic(p) | ResolvedCoordinate::Projected(p) => Some(p),
            ResolvedCoordinate::Absent => None,
        }
    }
}

/// First embedded integer run in a UTM-zone cell ("17S", "Zona 18" → 17, 18).
pub fn zone_hint(raw: &str) -> Option<u8> {
    let digits: String = raw
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Classify a row's two coordinate cells and normalize to degrees.
///
/// Already-geographic pairs are accepted directly, without touching the
/// delegate. Pairs within planar magnitude ranges are projected with the
/// zone taken from the explicit zone cell when present, the configured
/// default otherwise. Everything else, including delegate rejections and
/// transforms that land outside geographic bounds, resolves to `Absent`;
/// a coordinate problem is never fatal to the dataset.
pub fn resolve_coordinate(
    lat_cell: &str,
    lon_cell: &str,
    zone_cell: Option<&str>,
    options: &GeoOptions,
    projector: &dyn Projector,
) -> ResolvedCoordinate {
    let (Some(v_lat), Some(v_lon)) = (parse_amount(lat_cell), parse_amount(lon_cell)) else {
        return ResolvedCoordinate::Absent;
    };

    if LAT_RANGE.contains(&v_lat) && LON_RANGE.contains(&v_lon) {
        return ResolvedCoordinate::Geographic(GeoPoint { lat: v_lat, lon: v_lon });
    }

    // The latitude column carries the northing, the longitude column the
    // easting (GIS_Y / GIS_X in the sources that do this).
    if NORTHING_RANGE.contains(&v_lat) && EASTING_RANGE.contains(&v_lon) {
        let zone = zone_cell
            .and_then(zone_hint)
            .unwrap_or(options.default_zone);
        if let Ok((lon, lat)) = projector.project(v_lon, v_lat, zone, options.south) {
            if LAT_RANGE.contains(&lat) && LON_RANGE.contains(&lon) {
                return ResolvedCoordinate::Projected(GeoPoint { lat, lon });
            }
        }
    }

    ResolvedCoordinate::Absent
}

// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    /// Delegate that records calls; fails the test if a geographic pair
    /// ever reaches it.
    struct CountingProjector {
        calls: Cell<usize>,
    }

    impl CountingProjector {
        fn new() -> Self {
            Self { calls: Cell::new(0) }
        }
    }

    impl Projector for CountingProjector {
        fn project(
            &self,
            easting: f64,
            northing: f64,
            zone: u8,
            south: bool,
        ) -> Result<(f64, f64), ProjectionError> {
            self.calls.set(self.calls.get() + 1);
            UtmGrid.project(easting, northing, zone, south)
        }
    }

    #[test]
    fn geographic_pairs_never_touch_the_delegate() {
        let counting = CountingProjector::new();
        let opts = GeoOptions::default();
        let resolved = resolve_coordinate("-1.8", "-78.2", None, &opts, &counting);
        assert_eq!(
            resolved,
            ResolvedCoordinate::Geographic(GeoPoint { lat: -1.8, lon: -78.2 })
        );
        assert_eq!(counting.calls.get(), 0);
    }

    #[test]
    fn decimal_comma_coordinates_are_geographic_too() {
        let counting = CountingProjector::new();
        let opts = GeoOptions::default();
        let resolved = resolve_coordinate("-1,8", "-78,2", None, &opts, &counting);
        assert_eq!(
            resolved,
            ResolvedCoordinate::Geographic(GeoPoint { lat: -1.8, lon: -78.2 })
        );
        assert_eq!(counting.calls.get(), 0);
    }

    #[test]
    fn planar_pair_projects_into_the_regional_extent() {
        let opts = GeoOptions::default();
        let resolved = resolve_coordinate("9800000", "800000", None, &opts, &UtmGrid);
        let point = resolved.point().expect("should project");
        assert!(matches!(resolved, ResolvedCoordinate::Projected(_)));
        assert!((point.lat - -1.80744).abs() < 1e-4, "lat = {}", point.lat);
        assert!((point.lon - -78.30364).abs() < 1e-4, "lon = {}", point.lon);
    }

    #[test]
    fn projection_is_idempotent_per_input() {
        let opts = GeoOptions::default();
        let a = resolve_coordinate("9750000", "650000", None, &opts, &UtmGrid);
        let b = resolve_coordinate("9750000", "650000", None, &opts, &UtmGrid);
        assert_eq!(a, b);
        let point = a.point().unwrap();
        assert!((point.lat - -2.26119).abs() < 1e-4);
        assert!((point.lon - -79.65107).abs() < 1e-4);
    }

    #[test]
    fn explicit_zone_cell_overrides_the_default() {
        let opts = GeoOptions::default();
        let z17 = resolve_coordinate("9800000", "800000", Some("17S"), &opts, &UtmGrid)
            .point()
            .unwrap();
        let z18 = resolve_coordinate("9800000", "800000", Some("Zona 18"), &opts, &UtmGrid)
            .point()
            .unwrap();
        assert!((z18.lon - (z17.lon + 6.0)).abs() < 1e-6);
        assert!((z18.lat - z17.lat).abs() < 1e-9);
    }

    #[test]
    fn zone_hints_extract_the_first_integer_run() {
        assert_eq!(zone_hint("17S"), Some(17));
        assert_eq!(zone_hint("Zona 18"), Some(18));
        assert_eq!(zone_hint("sur"), None);
        assert_eq!(zone_hint(""), None);
    }

    #[test]
    fn delegate_rejections_resolve_to_absent() {
        let opts = GeoOptions::default();
        // Zone 0 from a malformed hint.
        let resolved = resolve_coordinate("9800000", "800000", Some("0"), &opts, &UtmGrid);
        assert_eq!(resolved, ResolvedCoordinate::Absent);
        assert_eq!(
            UtmGrid.project(800_000.0, 9_800_000.0, 0, true),
            Err(ProjectionError::UnsupportedZone(0))
        );
    }

    #[test]
    fn out_of_range_values_are_absent() {
        let opts = GeoOptions::default();
        let cases = [
            ("", "-78.2"),
            ("-1.8", ""),
            ("no coord", "-78.2"),
            ("120.0", "-78.2"),    // latitude beyond 90, not a northing
            ("5000000", "800000"), // northing outside the regional band
            ("9800000", "5000"),   // easting below the planar band
        ];
        for (lat, lon) in cases {
            assert_eq!(
                resolve_coordinate(lat, lon, None, &opts, &UtmGrid),
                ResolvedCoordinate::Absent,
                "({lat:?}, {lon:?})"
            );
        }
    }

    #[test]
    fn false_northing_only_applies_in_the_south() {
        let (lon, lat) = UtmGrid.project(500_000.0, 10_000_000.0, 17, true).unwrap();
        assert!((lat - 0.0).abs() < 1e-9);
        assert!((lon - -81.0).abs() < 1e-9);
    }
}
