use std::fs::File;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use co2_dashboard::data::EmissionsRecord;
use parquet::arrow::ArrowWriter;

const FIRST_YEAR: i32 = 1990;
const LAST_YEAR: i32 = 2021;
const COMPONENTS: [&str; 6] = ["Coal", "Oil", "Gas", "Cement", "Flaring", "Other"];

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

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Country profile: 1990 component levels (MtCO₂) and yearly growth rate.
struct Profile {
    name: &'static str,
    base: [f64; 6],
    growth: f64,
}

const PROFILES: [Profile; 8] = [
    Profile { name: "China", base: [1800.0, 250.0, 20.0, 90.0, 0.0, 0.0], growth: 0.055 },
    Profile { name: "USA", base: [1850.0, 2150.0, 1000.0, 35.0, 10.0, 0.0], growth: 0.001 },
    Profile { name: "India", base: [420.0, 160.0, 20.0, 25.0, 2.0, 0.0], growth: 0.05 },
    Profile { name: "Germany", base: [520.0, 330.0, 130.0, 15.0, 1.0, 20.0], growth: -0.012 },
    Profile { name: "Brazil", base: [30.0, 150.0, 5.0, 12.0, 2.0, 0.0], growth: 0.025 },
    Profile { name: "United Kingdom", base: [240.0, 210.0, 110.0, 7.0, 3.0, 8.0], growth: -0.025 },
    Profile { name: "Nigeria", base: [0.5, 20.0, 6.0, 1.5, 30.0, 0.0], growth: 0.03 },
    Profile { name: "Kuwaiti Oil Fires", base: [0.0, 0.0, 0.0, 0.0, 130.0, 0.0], growth: 0.0 },
];

#[derive(Default)]
struct Columns {
    country: Vec<String>,
    year: Vec<i32>,
    total: Vec<Option<f64>>,
    components: [Vec<Option<f64>>; 6],
}

impl Columns {
    fn push(&mut self, country: &str, year: i32, parts: [Option<f64>; 6]) {
        self.country.push(country.to_string());
        self.year.push(year);
        self.total.push(Some(parts.iter().flatten().sum()));
        for (col, value) in self.components.iter_mut().zip(parts) {
            col.push(value);
        }
    }
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let mut cols = Columns::default();
    let mut global = vec![[0.0f64; 6]; (LAST_YEAR - FIRST_YEAR + 1) as usize];

    for profile in &PROFILES {
        for year in FIRST_YEAR..=LAST_YEAR {
            let t = (year - FIRST_YEAR) as f64;
            let mut parts = [None; 6];
            for (i, slot) in parts.iter_mut().enumerate() {
                let trend = profile.base[i] * (1.0 + profile.growth).powf(t);
                let value = (trend * (1.0 + rng.gauss(0.0, 0.03))).max(0.0);
                global[(year - FIRST_YEAR) as usize][i] += value;
                // Sparse reporting of the minor categories, as in real inventories.
                *slot = if i >= 4 && rng.next_f64() < 0.1 { None } else { Some(value) };
            }
            cols.push(profile.name, year, parts);
        }
    }
    for (offset, parts) in global.iter().enumerate() {
        cols.push("Global", FIRST_YEAR + offset as i32, parts.map(Some));
    }

    let mut fields = vec![
        Field::new("Country", DataType::Utf8, false),
        Field::new("Year", DataType::Int32, false),
        Field::new("Total", DataType::Float64, true),
    ];
    fields.extend(COMPONENTS.iter().map(|c| Field::new(*c, DataType::Float64, true)));
    let schema = Arc::new(Schema::new(fields));

    let mut arrays: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(cols.country.clone())),
        Arc::new(Int32Array::from(cols.year.clone())),
        Arc::new(Float64Array::from(cols.total.clone())),
    ];
    for col in &cols.components {
        arrays.push(Arc::new(Float64Array::from(col.clone())));
    }
    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building record batch")?;

    // Write Parquet
    let parquet_path = "sample_emissions.parquet";
    let file = File::create(parquet_path).context("creating parquet output")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;

    // Same rows as CSV and JSON, blank cells / nulls for missing values
    let records: Vec<EmissionsRecord> = (0..cols.country.len())
        .map(|row| {
            let part = |i: usize| cols.components[i][row];
            EmissionsRecord {
                country: cols.country[row].clone(),
                year: cols.year[row],
                total: cols.total[row],
                coal: part(0),
                oil: part(1),
                gas: part(2),
                cement: part(3),
                flaring: part(4),
                other: part(5),
            }
        })
        .collect();

    let csv_path = "sample_emissions.csv";
    let mut csv = csv::Writer::from_path(csv_path).context("creating CSV output")?;
    for record in &records {
        csv.serialize(record)?;
    }
    csv.flush()?;

    let json_path = "sample_emissions.json";
    let json = File::create(json_path).context("creating JSON output")?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(json), &records)
        .context("writing JSON output")?;

    println!(
        "Wrote {} rows ({} countries, {FIRST_YEAR}-{LAST_YEAR}) to {parquet_path}, {csv_path} and {json_path}",
        records.len(),
        PROFILES.len() + 1
    );
    Ok(())
}
