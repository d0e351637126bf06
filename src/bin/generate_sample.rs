use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

const INDICATORS: [&str; 24] = [
    "Area_SqMil", "Area_Sqft", "Area_SqM", "HealthSens", "SocioEcoFa", "SensitiveP",
    "PollExposu", "PollSource", "PollutionB", "Score", "Percentile", "Rank", "TotalPopul",
    "PercentBla", "PercentAme", "PercentAsi", "PercentNat", "PercentOth", "PercentHis",
    "PercentWhi", "TotalPerce", "Unemployed", "PovertyPer", "Median_Inc",
];

/// Sentinel the source data uses for "not available".
const NOT_AVAILABLE: f64 = -999.0;

const COUNTIES: [(&str, &[&str]); 4] = [
    ("Hartford", &["Avon", "Canton", "East Granby", "West Hartford"]),
    ("Litchfield", &["Barkhamsted", "New Hartford", "Norfolk"]),
    ("Tolland", &["Andover", "Bolton", "Stafford"]),
    ("Windham", &["Ashford", "Eastford", "Union"]),
];

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

    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

/// One census tract: names plus the 24 indicator values.
struct Tract {
    town: &'static str,
    county: &'static str,
    values: [f64; 24],
}

fn generate_tract(town: &'static str, county: &'static str, rng: &mut SimpleRng) -> Tract {
    let sq_mil = rng.range(0.5, 30.0);
    let population = rng.range(200.0, 12000.0).round();

    // Racial shares that sum to 100.
    let mut shares: Vec<f64> = (0..7).map(|_| rng.range(0.0, 1.0)).collect();
    shares[6] += 4.0;
    let total: f64 = shares.iter().sum();
    let shares: Vec<f64> = shares.iter().map(|s| (s / total * 100.0 * 10.0).round() / 10.0).collect();

    let health = rng.range(0.0, 10.0);
    let socio = rng.range(0.0, 10.0);
    let exposure = rng.range(0.0, 10.0);
    let source = rng.range(0.0, 10.0);
    let score = (health + socio + exposure + source) * 2.5;

    let mut values = [
        sq_mil,
        sq_mil * 27_878_400.0,
        sq_mil * 2_589_988.11,
        health,
        socio,
        (health + socio) / 2.0,
        exposure,
        source,
        (exposure + source) / 2.0,
        score,
        score.clamp(0.0, 100.0),
        rng.range(1.0, 800.0).round(),
        population,
        shares[0],
        shares[1],
        shares[2],
        shares[3],
        shares[4],
        shares[5],
        shares[6],
        shares.iter().sum::<f64>(),
        rng.range(0.0, 15.0),
        rng.range(0.0, 30.0),
        rng.range(25_000.0, 180_000.0).round(),
    ];

    for v in &mut values {
        if rng.next_f64() < 0.03 {
            *v = NOT_AVAILABLE;
        }
    }

    Tract {
        town,
        county,
        values,
    }
}

fn write_csv(path: &Path, tracts: &[Tract]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).context("creating CSV")?;

    let mut header = vec!["OBJECTID", "TOWN_NAME", "County"];
    header.extend(INDICATORS);
    wtr.write_record(&header)?;

    for (id, tract) in tracts.iter().enumerate() {
        let mut record = vec![(id + 1).to_string(), tract.town.to_string(), tract.county.to_string()];
        record.extend(tract.values.iter().map(|v| format!("{v}")));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, tracts: &[Tract]) -> Result<()> {
    let mut fields = vec![
        Field::new("OBJECTID", DataType::Int64, false),
        Field::new("TOWN_NAME", DataType::Utf8, false),
        Field::new("County", DataType::Utf8, false),
    ];
    fields.extend(INDICATORS.iter().map(|c| Field::new(*c, DataType::Float64, true)));
    let schema = Arc::new(Schema::new(fields));

    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from_iter_values(1..=tracts.len() as i64)),
        Arc::new(StringArray::from_iter_values(tracts.iter().map(|t| t.town))),
        Arc::new(StringArray::from_iter_values(tracts.iter().map(|t| t.county))),
    ];
    for i in 0..INDICATORS.len() {
        columns.push(Arc::new(Float64Array::from_iter_values(
            tracts.iter().map(|t| t.values[i]),
        )));
    }

    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;
    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let output = std::env::args().nth(1).unwrap_or_else(|| "output.csv".to_string());
    let output_path = Path::new(&output);
    let mut rng = SimpleRng::new(42);

    let mut tracts = Vec::new();
    for (county, towns) in COUNTIES {
        for (i, &town) in towns.iter().enumerate() {
            // The first town of every county is a single-tract town.
            let n = if i == 0 { 1 } else { 2 + (rng.next_u64() % 4) as usize };
            for _ in 0..n {
                tracts.push(generate_tract(town, county, &mut rng));
            }
        }
    }

    let is_parquet = output_path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("parquet") || e.eq_ignore_ascii_case("pq"));
    if is_parquet {
        write_parquet(output_path, &tracts)?;
    } else {
        write_csv(output_path, &tracts)?;
    }

    println!(
        "Wrote {} tracts in {} counties to {output}",
        tracts.len(),
        COUNTIES.len()
    );
    Ok(())
}
