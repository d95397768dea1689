use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Field – canonical column identifiers
// ---------------------------------------------------------------------------

/// A semantically stable column identifier, independent of how any particular
/// source file spells its headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    /// AMIE institution code.
    Identifier,
    /// Institution display name.
    Name,
    Latitude,
    Longitude,
    Province,
    Canton,
    Sponsorship,
    Regime,
    /// Administrative planning zone ("Zona 1" … "Zona 9").
    Zone,
    EducationLevel,
    ProvisionYear,
    /// Explicit UTM zone indicator, when a source declares one.
    UtmZone,
    Students,
    RubricLudic,
    RubricFurniture,
    RubricPlayground,
}

impl Field {
    pub const ALL: [Field; 16] = [
        Field::Identifier,
        Field::Name,
        Field::Latitude,
        Field::Longitude,
        Field::Province,
        Field::Canton,
        Field::Sponsorship,
        Field::Regime,
        Field::Zone,
        Field::EducationLevel,
        Field::ProvisionYear,
        Field::UtmZone,
        Field::Students,
        Field::RubricLudic,
        Field::RubricFurniture,
        Field::RubricPlayground,
    ];

    /// Fields without which a dataset cannot be normalized at all.
    pub const REQUIRED: [Field; 4] = [
        Field::Identifier,
        Field::Name,
        Field::Latitude,
        Field::Longitude,
    ];

    /// Accepted raw header spellings, in priority order. Variants observed
    /// across ministry exports: embedded units, underscores, missing
    /// diacritics, auxiliary prefixes.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::Identifier => &["AMIE", "CODIGO AMIE", "COD AMIE"],
            Field::Name => &["INSTITUCION", "INSTITUCIÓN", "NOMBRE INSTITUCION", "NOMBRE"],
            Field::Latitude => &["LATITUD", "LATITUDE", "LAT", "GIS_Y", "COORDENADA Y"],
            Field::Longitude => &["LONGITUD", "LONGITUDE", "LON", "GIS_X", "COORDENADA X"],
            Field::Province => &["PROVINCIA"],
            Field::Canton => &["CANTON", "CANTÓN"],
            Field::Sponsorship => &["SOSTENIMIENTO"],
            Field::Regime => &["REGIMEN", "RÉGIMEN"],
            Field::Zone => &["ZONA"],
            Field::EducationLevel => &[
                "NIVEL DE EDUCACION",
                "NIVEL DE EDUCACIÓN",
                "NIVEL EDUCATIVO",
                "NIVEL",
            ],
            Field::ProvisionYear => &[
                "AUX_ANIO DE DOTACION",
                "AUX_AÑO DE DOTACIÓN",
                "ANIO DE DOTACION",
                "AÑO DE DOTACION",
            ],
            // Deliberately a single token: the substring pass must never
            // latch onto the administrative "ZONA" column.
            Field::UtmZone => &["UTM"],
            Field::Students => &["ESTUDIANTES", "ALUMNOS", "MATRICULA"],
            Field::RubricLudic => &["MD_MONTO USD$", "MD_MONTO_USD", "MD MONTO"],
            Field::RubricFurniture => &["M_MONTO USD$", "M_MONTO_USD", "M MONTO"],
            Field::RubricPlayground => &["JE_MONTO USD$", "JE_MONTO_USD", "JE MONTO"],
        }
    }

    /// Canonical header label, used for error messages and exports.
    pub fn label(self) -> &'static str {
        match self {
            Field::Identifier => "AMIE",
            Field::Name => "INSTITUCION",
            Field::Latitude => "LATITUD",
            Field::Longitude => "LONGITUD",
            Field::Province => "PROVINCIA",
            Field::Canton => "CANTON",
            Field::Sponsorship => "SOSTENIMIENTO",
            Field::Regime => "REGIMEN",
            Field::Zone => "ZONA",
            Field::EducationLevel => "NIVEL DE EDUCACION",
            Field::ProvisionYear => "ANIO DE DOTACION",
            Field::UtmZone => "ZONA UTM",
            Field::Students => "ESTUDIANTES",
            Field::RubricLudic => "MD_MONTO USD",
            Field::RubricFurniture => "M_MONTO USD",
            Field::RubricPlayground => "JE_MONTO USD",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Text normalization shared by header matching and value comparison
// ---------------------------------------------------------------------------

/// Case- and diacritic-insensitive canonical form of a cell value.
pub fn fold(raw: &str) -> String {
    raw.trim().chars().map(fold_char).collect()
}

fn fold_char(c: char) -> char {
    match c {
        'á' | 'Á' => 'a',
        'é' | 'É' => 'e',
        'í' | 'Í' => 'i',
        'ó' | 'Ó' => 'o',
        'ú' | 'Ú' | 'ü' | 'Ü' => 'u',
        'ñ' | 'Ñ' => 'n',
        c => c.to_ascii_lowercase(),
    }
}

/// Canonical form of a raw header name: folded, with the separator characters
/// that vary between exports (`_ . - / $`) treated as spaces, runs collapsed.
pub fn normalize_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for c in raw.trim().chars() {
        let mapped = match c {
            '_' | '.' | '-' | '/' | '$' => ' ',
            c if c.is_whitespace() => ' ',
            c => fold_char(c),
        };
        if mapped == ' ' {
            pending_space = !out.is_empty();
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(mapped);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// ColumnBinding – per-dataset resolution result
// ---------------------------------------------------------------------------

/// The raw column a canonical field resolved to for one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundColumn {
    /// Position within the dataset's header row.
    pub index: usize,
    /// The raw header as spelled by the source.
    pub name: String,
}

/// Canonical field → selected raw column, built once per dataset load and
/// stable afterwards. Each field binds to at most one column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnBinding {
    slots: BTreeMap<Field, BoundColumn>,
}

impl ColumnBinding {
    pub fn get(&self, field: Field) -> Option<&BoundColumn> {
        self.slots.get(&field)
    }

    pub fn index_of(&self, field: Field) -> Option<usize> {
        self.slots.get(&field).map(|c| c.index)
    }

    pub fn is_bound(&self, field: Field) -> bool {
        self.slots.contains_key(&field)
    }
}

/// Required columns could not be matched against any header.
#[derive(Debug, Clone, Error)]
#[error(
    "could not resolve required column(s): {}; available columns: {}",
    field_list(.missing),
    .available.join(", ")
)]
pub struct ResolveError {
    pub missing: Vec<Field>,
    pub available: Vec<String>,
}

fn field_list(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|f| f.label())
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Resolve a dataset's raw headers into a [`ColumnBinding`].
///
/// Two passes per field: first an exact match between a normalized alias and
/// a normalized header, then a fallback that accepts a header containing a
/// word that starts with the first token of an alias (tolerates suffixed
/// variants such as units embedded in the header, without letting short
/// tokens match in the middle of unrelated names). Pure function of the
/// header list.
pub fn resolve(headers: &[String]) -> Result<ColumnBinding, ResolveError> {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();

    let mut slots = BTreeMap::new();
    for field in Field::ALL {
        if let Some(index) = resolve_field(field, &normalized) {
            slots.insert(
                field,
                BoundColumn {
                    index,
                    name: headers[index].clone(),
                },
            );
        }
    }

    let missing: Vec<Field> = Field::REQUIRED
        .iter()
        .copied()
        .filter(|f| !slots.contains_key(f))
        .collect();
    if !missing.is_empty() {
        return Err(ResolveError {
            missing,
            available: headers.to_vec(),
        });
    }

    Ok(ColumnBinding { slots })
}

fn resolve_field(field: Field, normalized_headers: &[String]) -> Option<usize> {
    // Exact pass, aliases in priority order.
    for alias in field.aliases() {
        let alias = normalize_header(alias);
        if let Some(i) = normalized_headers.iter().position(|h| *h == alias) {
            return Some(i);
        }
    }

    // Fallback pass on the first alias token.
    for alias in field.aliases() {
        let alias = normalize_header(alias);
        let Some(token) = alias.split(' ').next().filter(|t| !t.is_empty()) else {
            continue;
        };
        if let Some(i) = normalized_headers
            .iter()
            .position(|h| h.split(' ').any(|word| word.starts_with(token)))
        {
            return Some(i);
        }
    }

    None
}

// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_match_ignores_case_and_diacritics() {
        let h = headers(&["amie", "Institución", "latitud", "LONGITUD", "Cantón"]);
        let binding = resolve(&h).unwrap();
        assert_eq!(binding.index_of(Field::Identifier), Some(0));
        assert_eq!(binding.index_of(Field::Name), Some(1));
        assert_eq!(binding.index_of(Field::Canton), Some(4));
    }

    #[test]
    fn substring_pass_tolerates_suffixed_headers() {
        let h = headers(&[
            "AMIE",
            "NOMBRE DE LA INSTITUCION EDUCATIVA",
            "LATITUD (GRADOS)",
            "LONGITUD (GRADOS)",
            "MD_MONTO TOTAL",
        ]);
        let binding = resolve(&h).unwrap();
        assert_eq!(binding.index_of(Field::Name), Some(1));
        assert_eq!(binding.index_of(Field::Latitude), Some(2));
        assert_eq!(binding.index_of(Field::RubricLudic), Some(4));
    }

    #[test]
    fn underscore_variants_match_exactly() {
        let h = headers(&["AMIE", "INSTITUCION", "LATITUD", "LONGITUD", "MD_MONTO_USD"]);
        let binding = resolve(&h).unwrap();
        let bound = binding.get(Field::RubricLudic).unwrap();
        assert_eq!(bound.index, 4);
        assert_eq!(bound.name, "MD_MONTO_USD");
    }

    #[test]
    fn utm_zone_never_steals_the_administrative_zone_column() {
        let h = headers(&["AMIE", "INSTITUCION", "LATITUD", "LONGITUD", "ZONA"]);
        let binding = resolve(&h).unwrap();
        assert_eq!(binding.index_of(Field::Zone), Some(4));
        assert!(!binding.is_bound(Field::UtmZone));

        let h = headers(&["AMIE", "INSTITUCION", "LATITUD", "LONGITUD", "ZONA", "ZONA UTM"]);
        let binding = resolve(&h).unwrap();
        assert_eq!(binding.index_of(Field::Zone), Some(4));
        assert_eq!(binding.index_of(Field::UtmZone), Some(5));
    }

    #[test]
    fn unresolved_optional_fields_stay_unbound() {
        let h = headers(&["AMIE", "INSTITUCION", "LATITUD", "LONGITUD"]);
        let binding = resolve(&h).unwrap();
        assert!(!binding.is_bound(Field::Province));
        assert!(!binding.is_bound(Field::Students));
        // "M_MONTO"'s single-letter token must not latch onto AMIE.
        assert!(!binding.is_bound(Field::RubricFurniture));
    }

    #[test]
    fn missing_required_fields_report_whats_available() {
        let h = headers(&["AMIE", "PROVINCIA", "CANTON"]);
        let err = resolve(&h).unwrap_err();
        assert_eq!(
            err.missing,
            vec![Field::Name, Field::Latitude, Field::Longitude]
        );
        assert_eq!(err.available, h);
        let message = err.to_string();
        assert!(message.contains("INSTITUCION"));
        assert!(message.contains("PROVINCIA"));
    }

    #[test]
    fn resolution_is_deterministic() {
        let h = headers(&[
            "Código AMIE",
            "Nombre",
            "LATITUD",
            "LONGITUD",
            "Provincia",
            "ZONA",
            "NIVEL DE EDUCACIÓN",
        ]);
        let first = resolve(&h).unwrap();
        let second = resolve(&h).unwrap();
        assert_eq!(first, second);
    }
}
