//! Shared builders for unit tests.

use super::loader::read_csv;
use super::model::{
    ActiveFeatureSet, ClusterCode, DriverRace, MergedDataset, MergedRow, RowKey, SyntheticLapTime,
    Table,
};

/// A merged dataset built directly from `(driver, race, cluster, features)` rows.
pub fn dataset(features: &[&str], rows: &[(&str, &str, u8, &[f64])]) -> MergedDataset {
    MergedDataset {
        features: ActiveFeatureSet::new(features.iter().map(|f| f.to_string()).collect()),
        rows: rows
            .iter()
            .enumerate()
            .map(|(i, (driver, race, cluster, values))| MergedRow {
                id: RowKey {
                    key: DriverRace::new(*driver, *race),
                    cluster: ClusterCode::from_code(i64::from(*cluster)).unwrap(),
                    lap_time: SyntheticLapTime(90.0 + i as f64),
                },
                features: values.to_vec(),
            })
            .collect(),
    }
}

pub fn table(text: &str) -> Table {
    read_csv(text.as_bytes()).unwrap()
}

/// Three drivers over three races, with a deliberately unmatched pair on
/// each side of the join.
pub const FEATURES_CSV: &str = "\
Driver,Race,Throttle_Rate,Brake_Freq_Per_Km,DRS_Efficiency,High_Throttle_Pct,Avg_Speed_Std
Max Verstappen,Monaco,0.62,5.1,8.0,31.0,12.5
Max Verstappen,Monza,0.91,3.4,14.2,47.0,17.9
Charles Leclerc,Monaco,0.55,6.8,6.1,24.0,11.2
Charles Leclerc,Monza,0.88,4.0,12.7,44.0,16.4
Fernando Alonso,Monaco,0.58,5.9,7.4,27.0,13.0
Fernando Alonso,Silverstone,0.79,4.6,10.9,39.0,15.1
";

pub const CLUSTERS_CSV: &str = "\
Driver,Race,Cluster
Max Verstappen,Monaco,0
Max Verstappen,Monza,1
Charles Leclerc,Monaco,1
Charles Leclerc,Monza,1
Fernando Alonso,Monaco,0
Lewis Hamilton,Silverstone,0
";

pub const TELEMETRY_CSV: &str = "\
Distance,Speed,Throttle,Brake,RPM,DRS,Race,Driver,LapNumber
0.0,280.5,100,False,11200,12,Monza,Max Verstappen,5
0.1,305.2,100,False,11800,12,Monza,Max Verstappen,5
0.2,120.0,0,True,8000,0,Monza,Max Verstappen,5
0.0,95.0,40,True,9000,0,Monaco,Charles Leclerc,7
0.1,,55,False,9500,0,Monaco,Charles Leclerc,7
0.2,110.0,70,False,9900,0,Monaco,Charles Leclerc,7
0.0,150.0,80,1,10000,8,Silverstone,Lewis Hamilton,3
";
