use std::fmt;

// ---------------------------------------------------------------------------
// Value – a single untyped cell as read from a source file
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring the dtypes a CSV/JSON/Parquet reader
/// can hand us before any schema is applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl Value {
    /// Numeric coercion: anything that cannot be read as a finite number
    /// becomes `None`. Booleans map to 1/0 and text is parsed, so `"True"`
    /// and `"0.5"` both coerce.
    pub fn to_f64(&self) -> Option<f64> {
        let v = match self {
            Value::Float(v) => *v,
            Value::Integer(i) => *i as f64,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Text(s) => {
                let s = s.trim();
                match s.to_ascii_lowercase().as_str() {
                    "true" => 1.0,
                    "false" => 0.0,
                    _ => s.parse::<f64>().ok()?,
                }
            }
            Value::Null => return None,
        };
        v.is_finite().then_some(v)
    }

    /// Key coercion used for Driver/Race columns. Empty text counts as missing.
    pub fn to_key(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Text(s) if s.trim().is_empty() => None,
            Value::Text(s) => Some(s.trim().to_string()),
            other => Some(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Table – the loader's output, before validation
// ---------------------------------------------------------------------------

/// A rectangular table of untyped cells with named columns.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell lookup tolerant of ragged rows.
    pub fn cell(&self, row: usize, col: usize) -> &Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&Value::Null)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

// ---------------------------------------------------------------------------
// Feature columns
// ---------------------------------------------------------------------------

/// Canonical, ordered list of driving-behaviour features.
pub const FEATURE_COLUMNS: [&str; 17] = [
    "Throttle_Rate",
    "Coasting_Pct",
    "Speed_Variance",
    "Brake_Freq_Per_Km",
    "High_Throttle_Pct",
    "Brake_Duration_Per_Km",
    "Avg_Speed_Std",
    "DRS_Efficiency",
    "Avg_Throttle_S1",
    "Avg_Throttle_S2",
    "Avg_Throttle_S3",
    "Brake_Percentage_S1",
    "Brake_Percentage_S2",
    "Brake_Percentage_S3",
    "Speed_Std_S1",
    "Speed_Std_S2",
    "Speed_Std_S3",
];

pub const DRIVER: &str = "Driver";
pub const RACE: &str = "Race";
pub const CLUSTER: &str = "Cluster";

/// The features actually present in the loaded feature table, in canonical
/// order. Computed once by the schema validator and threaded through every
/// downstream stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveFeatureSet {
    names: Vec<String>,
}

impl ActiveFeatureSet {
    pub(crate) fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Keep only the wanted features that are active, preserving `wanted` order.
    pub fn restrict<'a>(&self, wanted: &[&'a str]) -> Vec<&'a str> {
        wanted
            .iter()
            .copied()
            .filter(|w| self.position(w).is_some())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Keys and clusters
// ---------------------------------------------------------------------------

/// Composite (Driver, Race) join key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DriverRace {
    pub driver: String,
    pub race: String,
}

impl DriverRace {
    pub fn new(driver: impl Into<String>, race: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            race: race.into(),
        }
    }
}

impl fmt::Display for DriverRace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.driver, self.race)
    }
}

/// Behavioural cluster label assigned upstream. Only 0 and 1 exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClusterCode {
    Smooth,
    Aggressive,
}

/// Static label map: code → human-readable name.
pub const CLUSTER_LABELS: [(ClusterCode, &str); 2] = [
    (ClusterCode::Smooth, "Smooth Drivers"),
    (ClusterCode::Aggressive, "Aggressive Brakers"),
];

impl ClusterCode {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(ClusterCode::Smooth),
            1 => Some(ClusterCode::Aggressive),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            ClusterCode::Smooth => 0,
            ClusterCode::Aggressive => 1,
        }
    }

    pub fn label(self) -> &'static str {
        CLUSTER_LABELS
            .iter()
            .find(|(c, _)| *c == self)
            .map(|(_, name)| *name)
            .unwrap_or_default()
    }

    pub fn from_label(label: &str) -> Option<Self> {
        CLUSTER_LABELS
            .iter()
            .find(|(_, name)| *name == label)
            .map(|(c, _)| *c)
    }

    /// Parse a cluster cell. Integral floats (`1.0`) are accepted.
    pub fn from_value(value: &Value) -> Option<Self> {
        let v = value.to_f64()?;
        if v.fract() != 0.0 {
            return None;
        }
        Self::from_code(v as i64)
    }
}

impl fmt::Display for ClusterCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.code())
    }
}

/// Presentation-only lap time drawn from a seeded normal distribution.
/// It is not measured and must never be read as real lap performance.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct SyntheticLapTime(pub f64);

impl SyntheticLapTime {
    pub fn seconds(self) -> f64 {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Typed rows
// ---------------------------------------------------------------------------

/// One row of the feature table, values aligned with the active feature set.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub key: DriverRace,
    pub values: Vec<f64>,
}

/// Row identity shared by the merged, scaled and projected tables so they
/// stay joinable for display.
#[derive(Debug, Clone, PartialEq)]
pub struct RowKey {
    pub key: DriverRace,
    pub cluster: ClusterCode,
    pub lap_time: SyntheticLapTime,
}

impl RowKey {
    pub fn cluster_name(&self) -> &'static str {
        self.cluster.label()
    }
}

/// Feature row joined with its cluster assignment and synthetic lap time.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub id: RowKey,
    pub features: Vec<f64>,
}

/// The analysis-ready table. Read-only once built.
#[derive(Debug, Clone)]
pub struct MergedDataset {
    pub features: ActiveFeatureSet,
    pub rows: Vec<MergedRow>,
}

impl MergedDataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// One raw per-distance telemetry reading.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySample {
    pub key: DriverRace,
    pub lap_number: Option<f64>,
    pub distance: f64,
    pub speed: f64,
    pub throttle: f64,
    /// Brake pressed, normalised to 0/1 when the source is boolean.
    pub brake: f64,
    pub rpm: Option<f64>,
    pub drs: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_coercion_handles_text_and_bools() {
        assert_eq!(Value::Text(" 3.5 ".into()).to_f64(), Some(3.5));
        assert_eq!(Value::Text("True".into()).to_f64(), Some(1.0));
        assert_eq!(Value::Bool(false).to_f64(), Some(0.0));
        assert_eq!(Value::Text("fast".into()).to_f64(), None);
        assert_eq!(Value::Float(f64::NAN).to_f64(), None);
        assert_eq!(Value::Null.to_f64(), None);
    }

    #[test]
    fn keys_reject_blank_cells() {
        assert_eq!(Value::Text("  ".into()).to_key(), None);
        assert_eq!(Value::Integer(44).to_key(), Some("44".to_string()));
        assert_eq!(Value::Text("Monaco ".into()).to_key(), Some("Monaco".into()));
    }

    #[test]
    fn cluster_labels_round_trip_through_names() {
        assert_eq!(ClusterCode::from_label("Smooth Drivers"), Some(ClusterCode::Smooth));
        assert_eq!(ClusterCode::Aggressive.label(), "Aggressive Brakers");
        assert_eq!(ClusterCode::from_value(&Value::Float(1.0)), Some(ClusterCode::Aggressive));
        assert_eq!(ClusterCode::from_value(&Value::Float(0.5)), None);
        assert_eq!(ClusterCode::from_value(&Value::Integer(2)), None);
        assert_eq!(ClusterCode::from_label("Unknown"), None);
    }

    #[test]
    fn active_features_restrict_in_requested_order() {
        let active = ActiveFeatureSet::new(vec!["DRS_Efficiency".into(), "Throttle_Rate".into()]);
        assert_eq!(
            active.restrict(&["Throttle_Rate", "Coasting_Pct", "DRS_Efficiency"]),
            vec!["Throttle_Rate", "DRS_Efficiency"]
        );
    }
}
