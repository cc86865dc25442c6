//! Writes a small, reproducible data directory for the dashboard:
//! `features_2023.csv`, `clustering_results_2023.csv` and
//! `combined_telemetry_2023.csv`.
//!
//! Usage: `generate_sample [DATA_DIR]` (defaults to `data`).

use std::f64::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SEED: u64 = 42;

const DRIVERS: [&str; 3] = ["Max Verstappen", "Charles Leclerc", "Fernando Alonso"];
const RACES: [&str; 3] = ["Monaco", "Monza", "Silverstone"];

/// Feature name with the uniform range its values are drawn from.
const FEATURES: [(&str, f64, f64); 17] = [
    ("Throttle_Rate", 0.5, 1.0),
    ("Coasting_Pct", 10.0, 30.0),
    ("Speed_Variance", 50.0, 100.0),
    ("Brake_Freq_Per_Km", 3.0, 7.0),
    ("High_Throttle_Pct", 20.0, 50.0),
    ("Brake_Duration_Per_Km", 2.0, 5.0),
    ("Avg_Speed_Std", 10.0, 20.0),
    ("DRS_Efficiency", 5.0, 15.0),
    ("Avg_Throttle_S1", 60.0, 90.0),
    ("Avg_Throttle_S2", 60.0, 90.0),
    ("Avg_Throttle_S3", 60.0, 90.0),
    ("Brake_Percentage_S1", 10.0, 30.0),
    ("Brake_Percentage_S2", 10.0, 30.0),
    ("Brake_Percentage_S3", 10.0, 30.0),
    ("Speed_Std_S1", 5.0, 15.0),
    ("Speed_Std_S2", 5.0, 15.0),
    ("Speed_Std_S3", 5.0, 15.0),
];

/// Telemetry resolution along one lap, in metres.
const LAP_LENGTH: f64 = 5000.0;
const SAMPLE_STEP: f64 = 50.0;

fn cluster_for(driver: &str, race: &str) -> u8 {
    let smooth = matches!(driver, "Max Verstappen" | "Fernando Alonso") && race != "Monza";
    if smooth {
        0
    } else {
        1
    }
}

fn write_features(path: &Path, rng: &mut StdRng) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path)?;
    let header = ["Driver", "Race"]
        .into_iter()
        .chain(FEATURES.iter().map(|(name, _, _)| *name));
    writer.write_record(header)?;

    let mut rows = 0;
    for driver in DRIVERS {
        for race in RACES {
            let mut record = vec![driver.to_string(), race.to_string()];
            record.extend(
                FEATURES
                    .iter()
                    .map(|&(_, lo, hi)| rng.gen_range(lo..hi).to_string()),
            );
            writer.write_record(&record)?;
            rows += 1;
        }
    }
    writer.flush()?;
    Ok(rows)
}

fn write_clusters(path: &Path) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["Driver", "Race", "Cluster"])?;
    let mut rows = 0;
    for driver in DRIVERS {
        for race in RACES {
            let code = cluster_for(driver, race).to_string();
            writer.write_record([driver, race, code.as_str()])?;
            rows += 1;
        }
    }
    writer.flush()?;
    Ok(rows)
}

/// One lap per (driver, race): speed follows a few braking zones, throttle
/// and brake mirror it, DRS opens on the fastest stretch.
fn write_telemetry(path: &Path, rng: &mut StdRng) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "Driver", "Race", "LapNumber", "Distance", "Speed", "Throttle", "Brake", "RPM", "DRS",
    ])?;

    let steps = (LAP_LENGTH / SAMPLE_STEP) as usize;
    let mut rows = 0;
    for driver in DRIVERS {
        for race in RACES {
            let corners: f64 = rng.gen_range(3.0..7.0);
            let top_speed: f64 = rng.gen_range(290.0..330.0);
            for i in 0..=steps {
                let distance = i as f64 * SAMPLE_STEP;
                let phase = (2.0 * PI * corners * distance / LAP_LENGTH).cos();
                let speed = (top_speed * (0.65 + 0.35 * phase) + rng.gen_range(-3.0..3.0)).max(60.0);
                let braking = phase < -0.6;
                let throttle = if braking { 0.0 } else { (60.0 + 40.0 * phase.max(0.0)).min(100.0) };
                let rpm = 7000.0 + speed / top_speed * 5000.0;
                let drs = if phase > 0.9 { 12 } else { 0 };

                writer.write_record([
                    driver.to_string(),
                    race.to_string(),
                    "1".to_string(),
                    format!("{distance:.1}"),
                    format!("{speed:.1}"),
                    format!("{throttle:.1}"),
                    if braking { "True" } else { "False" }.to_string(),
                    format!("{rpm:.0}"),
                    drs.to_string(),
                ])?;
                rows += 1;
            }
        }
    }
    writer.flush()?;
    Ok(rows)
}

fn main() -> Result<()> {
    env_logger::init();

    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"));
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut rng = StdRng::seed_from_u64(SEED);

    let features = dir.join("features_2023.csv");
    let n = write_features(&features, &mut rng).with_context(|| format!("writing {}", features.display()))?;
    log::info!("Wrote {n} feature rows to {}", features.display());

    let clusters = dir.join("clustering_results_2023.csv");
    let n = write_clusters(&clusters).with_context(|| format!("writing {}", clusters.display()))?;
    log::info!("Wrote {n} cluster rows to {}", clusters.display());

    let telemetry = dir.join("combined_telemetry_2023.csv");
    let n = write_telemetry(&telemetry, &mut rng).with_context(|| format!("writing {}", telemetry.display()))?;
    log::info!("Wrote {n} telemetry samples to {}", telemetry.display());

    println!("Sample data written to {}", dir.display());
    Ok(())
}
