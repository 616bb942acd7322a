//! Writes a synthetic ticket table as `airline_cleaned.csv` and
//! `airline_cleaned.parquet` in the working directory.

use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

const AIRLINES: [&str; 6] = ["Vistara", "Air_India", "Indigo", "GO_FIRST", "AirAsia", "SpiceJet"];
const CITIES: [(&str, f64, f64); 6] = [
    ("Delhi", 28.7041, 77.1025),
    ("Mumbai", 19.0760, 72.8777),
    ("Bangalore", 12.9716, 77.5946),
    ("Hyderabad", 17.3850, 78.4867),
    ("Kolkata", 22.5726, 88.3639),
    ("Chennai", 13.0827, 80.2707),
];
const STOPS: [&str; 3] = ["zero", "one", "two_or_more"];

#[derive(Debug, Serialize)]
struct Row {
    airline: String,
    flight: String,
    source_city: String,
    destination_city: String,
    class: String,
    stops: String,
    price: i64,
    duration: f64,
    days_left: i64,
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

    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Rough great-circle distance in km.
fn distance_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());
    let h = ((lat2 - lat1) / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * ((lon2 - lon1) / 2.0).sin().powi(2);
    2.0 * 6371.0 * h.sqrt().asin()
}

fn generate(n: usize, rng: &mut SimpleRng) -> Vec<Row> {
    let mut rows = Vec::with_capacity(n);
    while rows.len() < n {
        let (src, src_lat, src_lon) = CITIES[rng.below(CITIES.len())];
        let (dst, dst_lat, dst_lon) = CITIES[rng.below(CITIES.len())];
        if src == dst {
            continue;
        }
        let airline_idx = rng.below(AIRLINES.len());
        let airline = AIRLINES[airline_idx];
        let business = rng.next_f64() < 0.3 && (airline == "Vistara" || airline == "Air_India");
        let stops_idx = rng.below(STOPS.len());
        let days_left = 1 + rng.below(49) as i64;

        let km = distance_km((src_lat, src_lon), (dst_lat, dst_lon));
        let duration = (km / 700.0 + 1.2 * stops_idx as f64 + rng.gauss(0.5, 0.3).abs()).max(0.8);
        let mut price = 2500.0 + km * 4.0 + 1500.0 * stops_idx as f64;
        if business {
            price *= 4.5;
        }
        // Late bookings cost more.
        price *= 1.0 + 1.5 / days_left as f64;
        price *= rng.gauss(1.0, 0.12).clamp(0.6, 1.6);

        rows.push(Row {
            airline: airline.to_string(),
            flight: format!("{}-{}", airline[..2].to_uppercase(), 100 + rng.below(900)),
            source_city: src.to_string(),
            destination_city: dst.to_string(),
            class: if business { "Business" } else { "Economy" }.to_string(),
            stops: STOPS[stops_idx].to_string(),
            price: price.round() as i64,
            duration: (duration * 100.0).round() / 100.0,
            days_left,
        });
    }
    rows
}

fn write_csv(rows: &[Row], path: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(rows: &[Row], path: &str) -> Result<()> {
    let text = |f: fn(&Row) -> &str| -> StringArray { rows.iter().map(|r| Some(f(r))).collect() };

    let schema = Arc::new(Schema::new(vec![
        Field::new("airline", DataType::Utf8, false),
        Field::new("flight", DataType::Utf8, false),
        Field::new("source_city", DataType::Utf8, false),
        Field::new("destination_city", DataType::Utf8, false),
        Field::new("class", DataType::Utf8, false),
        Field::new("stops", DataType::Utf8, false),
        Field::new("price", DataType::Int64, false),
        Field::new("duration", DataType::Float64, false),
        Field::new("days_left", DataType::Int64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(text(|r| r.airline.as_str())),
            Arc::new(text(|r| r.flight.as_str())),
            Arc::new(text(|r| r.source_city.as_str())),
            Arc::new(text(|r| r.destination_city.as_str())),
            Arc::new(text(|r| r.class.as_str())),
            Arc::new(text(|r| r.stops.as_str())),
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.price))),
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.duration))),
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.days_left))),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let rows = generate(3000, &mut rng);

    write_csv(&rows, "airline_cleaned.csv")?;
    write_parquet(&rows, "airline_cleaned.parquet")?;

    println!(
        "Wrote {} tickets to airline_cleaned.csv and airline_cleaned.parquet",
        rows.len()
    );
    Ok(())
}
