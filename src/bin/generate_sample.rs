//! Write a small three-class dataset for trying the viewer offline:
//! `blobs.csv`, `blobs.json` and `blobs.parquet` in the current directory.

use std::fs::File;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

const POINTS_PER_CLASS: usize = 60;

/// Class name, centre, spread.
const CLUSTERS: [(&str, [f64; 2], f64); 3] = [
    ("A", [0.0, 0.0], 0.6),
    ("B", [3.0, 1.0], 0.8),
    ("C", [1.0, 3.5], 0.5),
];

#[derive(Debug, Serialize)]
struct Sample {
    id: i64,
    x1: f64,
    x2: f64,
    class: String,
}

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

fn generate(rng: &mut SimpleRng) -> Vec<Sample> {
    let mut samples = Vec::with_capacity(CLUSTERS.len() * POINTS_PER_CLASS);
    for (class, [cx, cy], spread) in CLUSTERS {
        for _ in 0..POINTS_PER_CLASS {
            samples.push(Sample {
                id: samples.len() as i64,
                x1: rng.gauss(cx, spread),
                x2: rng.gauss(cy, spread),
                class: class.to_string(),
            });
        }
    }
    samples
}

fn write_csv(samples: &[Sample], path: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV")?;
    for sample in samples {
        writer.serialize(sample).context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

fn write_json(samples: &[Sample], path: &str) -> Result<()> {
    let file = File::create(path).context("creating JSON file")?;
    serde_json::to_writer_pretty(file, samples).context("writing JSON")?;
    Ok(())
}

fn write_parquet(samples: &[Sample], path: &str) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("x1", DataType::Float64, false),
        Field::new("x2", DataType::Float64, false),
        Field::new("class", DataType::Utf8, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from_iter_values(samples.iter().map(|s| s.id))),
            Arc::new(Float64Array::from_iter_values(samples.iter().map(|s| s.x1))),
            Arc::new(Float64Array::from_iter_values(samples.iter().map(|s| s.x2))),
            Arc::new(StringArray::from_iter_values(samples.iter().map(|s| s.class.as_str()))),
        ],
    )
    .context("building record batch")?;

    let file = File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let samples = generate(&mut rng);

    write_csv(&samples, "blobs.csv")?;
    write_json(&samples, "blobs.json")?;
    write_parquet(&samples, "blobs.parquet")?;

    println!(
        "Wrote {} samples in {} classes to blobs.{{csv,json,parquet}}",
        samples.len(),
        CLUSTERS.len()
    );
    Ok(())
}
