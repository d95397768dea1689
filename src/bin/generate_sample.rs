use std::fmt::Write as _;
use std::sync::Arc;

use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform value in [lo, hi).
    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    fn pick<'a>(&mut self, options: &[&'a str]) -> &'a str {
        options[(self.next_u64() as usize) % options.len()]
    }
}

struct Province {
    name: &'static str,
    canton: &'static str,
    lat: f64,
    lon: f64,
    regime: &'static str,
    zone: &'static str,
}

const PROVINCES: [Province; 5] = [
    Province { name: "AZUAY", canton: "CUENCA", lat: -2.90, lon: -79.00, regime: "SIERRA", zone: "Zona 6" },
    Province { name: "GUAYAS", canton: "GUAYAQUIL", lat: -2.19, lon: -79.89, regime: "COSTA", zone: "Zona 8" },
    Province { name: "PICHINCHA", canton: "QUITO", lat: -0.18, lon: -78.47, regime: "SIERRA", zone: "Zona 9" },
    Province { name: "MANABI", canton: "PORTOVIEJO", lat: -1.05, lon: -80.45, regime: "COSTA", zone: "Zona 4" },
    Province { name: "LOJA", canton: "LOJA", lat: -3.99, lon: -79.20, regime: "SIERRA", zone: "Zona 7" },
];

const LEVELS: [&str; 3] = ["INICIAL", "EGB", "BACHILLERATO"];
const SPONSORSHIPS: [&str; 3] = ["FISCAL", "PARTICULAR", "FISCOMISIONAL"];
const YEARS: [&str; 3] = ["2021", "2022", "2023"];

struct Row {
    amie: String,
    name: String,
    lat: f64,
    lon: f64,
    province: &'static str,
    canton: &'static str,
    sponsorship: &'static str,
    regime: &'static str,
    zone: &'static str,
    level: &'static str,
    year: &'static str,
    students: i64,
    amounts: [f64; 3],
}

fn generate_rows(rng: &mut SimpleRng) -> Vec<Row> {
    let mut rows = Vec::new();
    for (p_idx, province) in PROVINCES.iter().enumerate() {
        for i in 0..40 {
            rows.push(Row {
                amie: format!("{:02}H{:05}", p_idx + 1, i + 11),
                name: format!("UE {} {}", province.canton, i + 1),
                lat: province.lat + rng.range(-0.4, 0.4),
                lon: province.lon + rng.range(-0.4, 0.4),
                province: province.name,
                canton: province.canton,
                sponsorship: rng.pick(&SPONSORSHIPS),
                regime: province.regime,
                zone: province.zone,
                level: rng.pick(&LEVELS),
                year: rng.pick(&YEARS),
                students: (rng.range(30.0, 900.0)) as i64,
                amounts: [
                    rng.range(100.0, 5000.0),
                    rng.range(100.0, 8000.0),
                    rng.range(0.0, 3000.0),
                ],
            });
        }
    }
    rows
}

/// Format an amount in the Latin-American convention (`1.234,56`).
fn latam(value: f64) -> String {
    let us = format!("{value:.2}");
    let (whole, frac) = us.split_once('.').unwrap();
    let mut grouped = String::new();
    for (i, c) in whole.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    let grouped: String = grouped.chars().rev().collect();
    format!("{grouped},{frac}")
}

/// CSV with the ministry's messy headers: `;` delimited, diacritics,
/// embedded units, and a tenth of the rows carrying UTM zone-17 planar
/// coordinates instead of degrees. Amounts alternate between the two
/// decimal-separator conventions.
fn write_csv(rows: &[Row], rng: &mut SimpleRng) -> std::io::Result<()> {
    let mut out = String::new();
    out.push_str(
        "AMIE;INSTITUCIÓN;LATITUD;LONGITUD;ZONA UTM;PROVINCIA;CANTON;SOSTENIMIENTO;\
         RÉGIMEN;ZONA;NIVEL DE EDUCACIÓN;AUX_AÑO DE DOTACIÓN;ESTUDIANTES;\
         MD_MONTO USD$;M_MONTO_USD;JE_MONTO USD$\n",
    );

    for (i, row) in rows.iter().enumerate() {
        let (lat_cell, lon_cell, utm_cell) = if i % 10 == 9 {
            // Planar row: easting/northing in the coordinate columns.
            (
                format!("{:.0}", rng.range(9_750_000.0, 9_990_000.0)),
                format!("{:.0}", rng.range(520_000.0, 780_000.0)),
                "17S".to_string(),
            )
        } else {
            (format!("{:.5}", row.lat), format!("{:.5}", row.lon), String::new())
        };

        let amounts: Vec<String> = row
            .amounts
            .iter()
            .map(|&a| {
                if i % 2 == 0 {
                    format!("$ {}", latam(a))
                } else {
                    format!("{a:.2}")
                }
            })
            .collect();

        let _ = writeln!(
            out,
            "{};{};{};{};{};{};{};{};{};{};{};{};{};{};{};{}",
            row.amie,
            row.name,
            lat_cell,
            lon_cell,
            utm_cell,
            row.province,
            row.canton,
            row.sponsorship,
            row.regime,
            row.zone,
            row.level,
            row.year,
            row.students,
            amounts[0],
            amounts[1],
            amounts[2],
        );
    }

    std::fs::write("sample_institutions.csv", out)
}

/// Flat Parquet table with the cleaned-up underscore headers.
fn write_parquet(rows: &[Row]) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("AMIE", DataType::Utf8, false),
        Field::new("INSTITUCION", DataType::Utf8, false),
        Field::new("LATITUD", DataType::Float64, false),
        Field::new("LONGITUD", DataType::Float64, false),
        Field::new("PROVINCIA", DataType::Utf8, false),
        Field::new("CANTON", DataType::Utf8, false),
        Field::new("SOSTENIMIENTO", DataType::Utf8, false),
        Field::new("REGIMEN", DataType::Utf8, false),
        Field::new("ZONA", DataType::Utf8, false),
        Field::new("NIVEL_DE_EDUCACION", DataType::Utf8, false),
        Field::new("AUX_ANIO_DOTACION", DataType::Utf8, false),
        Field::new("ESTUDIANTES", DataType::Int64, false),
        Field::new("MD_MONTO_USD", DataType::Float64, false),
        Field::new("M_MONTO_USD", DataType::Float64, false),
        Field::new("JE_MONTO_USD", DataType::Float64, false),
    ]));

    fn strings(rows: &[Row], f: impl Fn(&Row) -> &str) -> StringArray {
        StringArray::from(rows.iter().map(|r| f(r)).collect::<Vec<_>>())
    }

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(strings(rows, |r| r.amie.as_str())),
            Arc::new(strings(rows, |r| r.name.as_str())),
            Arc::new(Float64Array::from(rows.iter().map(|r| r.lat).collect::<Vec<_>>())),
            Arc::new(Float64Array::from(rows.iter().map(|r| r.lon).collect::<Vec<_>>())),
            Arc::new(strings(rows, |r| r.province)),
            Arc::new(strings(rows, |r| r.canton)),
            Arc::new(strings(rows, |r| r.sponsorship)),
            Arc::new(strings(rows, |r| r.regime)),
            Arc::new(strings(rows, |r| r.zone)),
            Arc::new(strings(rows, |r| r.level)),
            Arc::new(strings(rows, |r| r.year)),
            Arc::new(Int64Array::from(rows.iter().map(|r| r.students).collect::<Vec<_>>())),
            Arc::new(Float64Array::from(rows.iter().map(|r| r.amounts[0]).collect::<Vec<_>>())),
            Arc::new(Float64Array::from(rows.iter().map(|r| r.amounts[1]).collect::<Vec<_>>())),
            Arc::new(Float64Array::from(rows.iter().map(|r| r.amounts[2]).collect::<Vec<_>>())),
        ],
    )
    .expect("Failed to create RecordBatch");

    let file = std::fs::File::create("sample_institutions.parquet")
        .expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");
}

fn main() {
    let mut rng = SimpleRng::new(42);
    let rows = generate_rows(&mut rng);

    write_csv(&rows, &mut rng).expect("Failed to write CSV");
    write_parquet(&rows);

    println!(
        "Wrote {} institutions to sample_institutions.csv and sample_institutions.parquet",
        rows.len()
    );
}
