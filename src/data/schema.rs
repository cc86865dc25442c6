//! Column-presence checks and typed extraction of the two keyed tables.

use crate::error::{PipelineError, Result};

use super::diagnostics::{Checked, Diagnostic};
use super::model::{
    ActiveFeatureSet, ClusterCode, DriverRace, FeatureRecord, Table, CLUSTER, DRIVER,
    FEATURE_COLUMNS, RACE,
};

/// Split `wanted` into the columns present in `table` and those missing.
pub fn partition_columns<'a>(table: &Table, wanted: &[&'a str]) -> (Vec<&'a str>, Vec<&'a str>) {
    wanted.iter().copied().partition(|c| table.has_column(c))
}

/// Fail with `MissingColumns` unless every mandatory column is present.
pub fn require_columns(table: &Table, table_name: &str, mandatory: &[&str]) -> Result<()> {
    let (_, missing) = partition_columns(table, mandatory);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::MissingColumns {
            table: table_name.to_string(),
            columns: missing.into_iter().map(String::from).collect(),
        })
    }
}

/// Validate the feature table and derive the active feature set.
///
/// Driver and Race are mandatory. Missing feature columns shrink the active
/// set and yield a `SchemaWarning`; an empty set is fatal.
pub fn validate_features(table: &Table, table_name: &str) -> Result<Checked<ActiveFeatureSet>> {
    require_columns(table, table_name, &[DRIVER, RACE])?;

    let (present, missing) = partition_columns(table, &FEATURE_COLUMNS);
    if present.is_empty() {
        return Err(PipelineError::NoFeatureColumns {
            table: table_name.to_string(),
        });
    }

    let mut diagnostics = Vec::new();
    if !missing.is_empty() {
        diagnostics.push(
            Diagnostic::SchemaWarning {
                table: table_name.to_string(),
                missing: missing.into_iter().map(String::from).collect(),
            }
            .logged(),
        );
    }

    let active = ActiveFeatureSet::new(present.into_iter().map(String::from).collect());
    log::info!("{table_name}: {} active feature(s)", active.len());
    Ok(Checked::with(active, diagnostics))
}

/// Validate the cluster-assignment table: Driver, Race and Cluster are all mandatory.
pub fn validate_clusters(table: &Table, table_name: &str) -> Result<()> {
    require_columns(table, table_name, &[DRIVER, RACE, CLUSTER])
}

fn row_key(table: &Table, row: usize, driver_idx: usize, race_idx: usize) -> Option<DriverRace> {
    Some(DriverRace {
        driver: table.cell(row, driver_idx).to_key()?,
        race: table.cell(row, race_idx).to_key()?,
    })
}

/// Typed feature rows for a validated table. Rows with a blank key or a
/// missing/non-numeric active feature are dropped with an `InvalidRow`.
pub fn extract_features(
    table: &Table,
    table_name: &str,
    active: &ActiveFeatureSet,
) -> Result<Checked<Vec<FeatureRecord>>> {
    let driver_idx = column(table, table_name, DRIVER)?;
    let race_idx = column(table, table_name, RACE)?;
    let feature_idx = active
        .names()
        .iter()
        .map(|name| column(table, table_name, name))
        .collect::<Result<Vec<_>>>()?;

    let mut records = Vec::with_capacity(table.len());
    let mut blank_keys = 0;
    let mut bad_values = 0;
    for row in 0..table.len() {
        let Some(key) = row_key(table, row, driver_idx, race_idx) else {
            blank_keys += 1;
            continue;
        };
        let values: Option<Vec<f64>> = feature_idx
            .iter()
            .map(|&col| table.cell(row, col).to_f64())
            .collect();
        match values {
            Some(values) => records.push(FeatureRecord { key, values }),
            None => bad_values += 1,
        }
    }

    let mut diagnostics = Vec::new();
    if blank_keys > 0 {
        diagnostics.push(invalid(table_name, blank_keys, "missing Driver or Race"));
    }
    if bad_values > 0 {
        diagnostics.push(invalid(table_name, bad_values, "missing or non-numeric feature value"));
    }
    Ok(Checked::with(records, diagnostics))
}

/// Typed (key, cluster) pairs. Blank keys and cluster codes other than 0/1
/// are dropped with an `InvalidRow`, never defaulted.
pub fn extract_assignments(
    table: &Table,
    table_name: &str,
) -> Result<Checked<Vec<(DriverRace, ClusterCode)>>> {
    validate_clusters(table, table_name)?;
    let driver_idx = column(table, table_name, DRIVER)?;
    let race_idx = column(table, table_name, RACE)?;
    let cluster_idx = column(table, table_name, CLUSTER)?;

    let mut pairs = Vec::with_capacity(table.len());
    let mut rejected = 0;
    for row in 0..table.len() {
        let key = row_key(table, row, driver_idx, race_idx);
        let cluster = ClusterCode::from_value(table.cell(row, cluster_idx));
        match (key, cluster) {
            (Some(key), Some(cluster)) => pairs.push((key, cluster)),
            _ => rejected += 1,
        }
    }

    let mut diagnostics = Vec::new();
    if rejected > 0 {
        diagnostics.push(invalid(
            table_name,
            rejected,
            "missing key or cluster label outside {0, 1}",
        ));
    }
    Ok(Checked::with(pairs, diagnostics))
}

fn column(table: &Table, table_name: &str, name: &str) -> Result<usize> {
    table
        .column_index(name)
        .ok_or_else(|| PipelineError::MissingColumns {
            table: table_name.to_string(),
            columns: vec![name.to_string()],
        })
}

fn invalid(table: &str, dropped: usize, reason: &str) -> Diagnostic {
    Diagnostic::InvalidRow {
        table: table.to_string(),
        dropped,
        reason: reason.to_string(),
    }
    .logged()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::read_csv;

    fn table(text: &str) -> Table {
        read_csv(text.as_bytes()).unwrap()
    }

    #[test]
    fn full_feature_table_has_no_warnings() {
        let header = format!("Driver,Race,{}", FEATURE_COLUMNS.join(","));
        let row = format!("A,Monaco,{}", vec!["1.0"; 17].join(","));
        let checked = validate_features(&table(&format!("{header}\n{row}\n")), "features").unwrap();
        assert_eq!(checked.value.len(), 17);
        assert!(checked.diagnostics.is_empty());
    }

    #[test]
    fn missing_optional_features_shrink_the_active_set() {
        let t = table("Driver,Race,DRS_Efficiency,Throttle_Rate\nA,Monaco,1,2\n");
        let checked = validate_features(&t, "features").unwrap();
        // Canonical order, not file order.
        assert_eq!(checked.value.names(), ["Throttle_Rate", "DRS_Efficiency"]);
        match &checked.diagnostics[..] {
            [Diagnostic::SchemaWarning { missing, .. }] => assert_eq!(missing.len(), 15),
            other => panic!("unexpected diagnostics: {other:?}"),
        }
    }

    #[test]
    fn no_features_is_fatal() {
        let err = validate_features(&table("Driver,Race,Colour\nA,Monaco,red\n"), "features")
            .unwrap_err();
        assert_eq!(
            err,
            PipelineError::NoFeatureColumns {
                table: "features".into()
            }
        );
    }

    #[test]
    fn missing_cluster_column_is_fatal() {
        let err = extract_assignments(&table("Driver,Race\nA,Monaco\n"), "clusters").unwrap_err();
        assert_eq!(
            err,
            PipelineError::MissingColumns {
                table: "clusters".into(),
                columns: vec!["Cluster".into()],
            }
        );
    }

    #[test]
    fn non_numeric_feature_rows_are_dropped() {
        let t = table("Driver,Race,Throttle_Rate\nA,Monaco,0.5\nB,Monza,fast\n,Silverstone,0.7\n");
        let active = validate_features(&t, "features").unwrap().value;
        let checked = extract_features(&t, "features", &active).unwrap();
        assert_eq!(checked.value.len(), 1);
        assert_eq!(checked.value[0].key, DriverRace::new("A", "Monaco"));
        assert_eq!(checked.diagnostics.len(), 2);
    }

    #[test]
    fn out_of_range_clusters_are_rejected() {
        let t = table("Driver,Race,Cluster\nA,Monaco,0\nB,Monza,3\nC,Silverstone,1.0\n");
        let checked = extract_assignments(&t, "clusters").unwrap();
        assert_eq!(
            checked.value,
            vec![
                (DriverRace::new("A", "Monaco"), ClusterCode::Smooth),
                (DriverRace::new("C", "Silverstone"), ClusterCode::Aggressive),
            ]
        );
        assert_eq!(checked.diagnostics.len(), 1);
    }
}
