//! Raw per-distance telemetry. Entirely optional: every failure here
//! degrades to an empty table plus a diagnostic.

use std::collections::BTreeMap;
use std::path::Path;

use super::diagnostics::{Checked, Diagnostic};
use super::loader::load_table;
use super::model::{DriverRace, Table, TelemetrySample, DRIVER, RACE};
use super::schema::partition_columns;

const DISTANCE: &str = "Distance";
const SPEED: &str = "Speed";
const THROTTLE: &str = "Throttle";
const BRAKE: &str = "Brake";
const RPM: &str = "RPM";
const DRS: &str = "DRS";
const LAP_NUMBER: &str = "LapNumber";

pub const TELEMETRY_COLUMNS: [&str; 9] = [
    DISTANCE, SPEED, THROTTLE, BRAKE, RPM, DRS, RACE, DRIVER, LAP_NUMBER,
];

/// Rows missing any of these are unusable.
const CRITICAL_COLUMNS: [&str; 6] = [DRIVER, RACE, DISTANCE, SPEED, THROTTLE, BRAKE];

#[derive(Debug, Clone, Default)]
pub struct TelemetryTable {
    pub samples: Vec<TelemetrySample>,
}

impl TelemetryTable {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Load telemetry from `path`. Never fails: a missing or malformed file
/// yields an empty table and a `TelemetryUnavailable` diagnostic.
pub fn load_telemetry(path: &Path) -> Checked<TelemetryTable> {
    if !path.exists() {
        return unavailable(format!("{} not found", path.display()));
    }
    match load_table(path) {
        Ok(table) => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            from_table(&table, &name)
        }
        Err(e) => unavailable(format!("error loading {}: {e:#}", path.display())),
    }
}

/// Coerce an untyped table into telemetry samples.
///
/// Distance, Speed, Throttle, Brake, RPM and DRS are read as numbers
/// (unparseable cells count as missing); boolean brake values become 0/1.
/// Rows missing a critical field are dropped.
pub fn from_table(table: &Table, table_name: &str) -> Checked<TelemetryTable> {
    let (_, missing) = partition_columns(table, &TELEMETRY_COLUMNS);
    let mut diagnostics = Vec::new();
    if !missing.is_empty() {
        diagnostics.push(
            Diagnostic::SchemaWarning {
                table: table_name.to_string(),
                missing: missing.iter().map(|c| c.to_string()).collect(),
            }
            .logged(),
        );
    }

    let critical_missing: Vec<&str> = missing
        .iter()
        .copied()
        .filter(|c| CRITICAL_COLUMNS.contains(c))
        .collect();
    if !critical_missing.is_empty() {
        let mut degraded = unavailable(format!(
            "{table_name} lacks required column(s): {}",
            critical_missing.join(", ")
        ));
        diagnostics.append(&mut degraded.diagnostics);
        return Checked::with(degraded.value, diagnostics);
    }

    let idx = |name: &str| table.column_index(name);
    let (driver, race) = (idx(DRIVER), idx(RACE));
    let (distance, speed, throttle, brake) =
        (idx(DISTANCE), idx(SPEED), idx(THROTTLE), idx(BRAKE));
    let (rpm, drs, lap) = (idx(RPM), idx(DRS), idx(LAP_NUMBER));

    let key_at = |row: usize, col: Option<usize>| col.and_then(|c| table.cell(row, c).to_key());
    let num_at = |row: usize, col: Option<usize>| col.and_then(|c| table.cell(row, c).to_f64());

    let mut samples = Vec::with_capacity(table.len());
    let mut dropped = 0;
    for row in 0..table.len() {
        let sample = (|| {
            Some(TelemetrySample {
                key: DriverRace {
                    driver: key_at(row, driver)?,
                    race: key_at(row, race)?,
                },
                distance: num_at(row, distance)?,
                speed: num_at(row, speed)?,
                throttle: num_at(row, throttle)?,
                brake: num_at(row, brake)?,
                rpm: num_at(row, rpm),
                drs: num_at(row, drs),
                lap_number: num_at(row, lap),
            })
        })();
        match sample {
            Some(sample) => samples.push(sample),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        diagnostics.push(
            Diagnostic::InvalidRow {
                table: table_name.to_string(),
                dropped,
                reason: "missing Driver, Race, Distance, Speed, Throttle or Brake".to_string(),
            }
            .logged(),
        );
    }

    log::info!("Telemetry: {} sample(s) from {table_name}", samples.len());
    Checked::with(TelemetryTable { samples }, diagnostics)
}

fn unavailable(reason: String) -> Checked<TelemetryTable> {
    Checked::with(
        TelemetryTable::default(),
        vec![Diagnostic::TelemetryUnavailable { reason }.logged()],
    )
}

// ---------------------------------------------------------------------------
// Derived views
// ---------------------------------------------------------------------------

/// Speed/Throttle/Brake over distance for one (Driver, Race).
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryTrace {
    pub key: DriverRace,
    /// First lap number seen for the pair.
    pub lap: Option<f64>,
    pub distance: Vec<f64>,
    pub speed: Vec<f64>,
    pub throttle: Vec<f64>,
    pub brake: Vec<f64>,
}

/// Group samples into traces, ordered by driver then race.
pub fn traces<'a>(samples: impl IntoIterator<Item = &'a TelemetrySample>) -> Vec<TelemetryTrace> {
    let mut grouped: BTreeMap<&DriverRace, TelemetryTrace> = BTreeMap::new();
    for s in samples {
        let trace = grouped.entry(&s.key).or_insert_with(|| TelemetryTrace {
            key: s.key.clone(),
            lap: s.lap_number,
            distance: Vec::new(),
            speed: Vec::new(),
            throttle: Vec::new(),
            brake: Vec::new(),
        });
        trace.lap = trace.lap.or(s.lap_number);
        trace.distance.push(s.distance);
        trace.speed.push(s.speed);
        trace.throttle.push(s.throttle);
        trace.brake.push(s.brake);
    }
    grouped.into_values().collect()
}

/// DRS activity summary for one (Driver, Race).
#[derive(Debug, Clone, PartialEq)]
pub struct DrsUsage {
    pub key: DriverRace,
    /// Distinct DRS readings, ascending.
    pub distinct_values: Vec<f64>,
    /// Share of samples with a DRS reading where DRS > 0, in percent.
    pub usage_pct: Option<f64>,
    pub active_samples: usize,
    pub total_samples: usize,
}

/// Per-pair DRS usage, ordered by driver then race.
pub fn drs_usage<'a>(samples: impl IntoIterator<Item = &'a TelemetrySample>) -> Vec<DrsUsage> {
    let mut grouped: BTreeMap<&DriverRace, (Vec<f64>, usize)> = BTreeMap::new();
    for s in samples {
        let (readings, total) = grouped.entry(&s.key).or_default();
        *total += 1;
        if let Some(drs) = s.drs {
            readings.push(drs);
        }
    }

    grouped
        .into_iter()
        .map(|(key, (readings, total_samples))| {
            let active_samples = readings.iter().filter(|&&v| v > 0.0).count();
            let usage_pct = (!readings.is_empty())
                .then(|| active_samples as f64 / readings.len() as f64 * 100.0);
            let mut distinct_values = readings;
            distinct_values.sort_by(f64::total_cmp);
            distinct_values.dedup();
            DrsUsage {
                key: key.clone(),
                distinct_values,
                usage_pct,
                active_samples,
                total_samples,
            }
        })
        .collect()
}
