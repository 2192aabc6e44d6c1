// src/odt_views.rs
//
// Match OMF snapshots to their rows in an ODT table and expose the merged
// table as curves.
//
// Every OMF file name carries a (stage, iteration) key (see snapshot.rs).
// The merged table has one row per OMF file, in OMF order:
//   File | stage | iteration | <other ODT columns in ODT order>
// where File is the 0-based position of the OMF file in the input list.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::{Result, ViewError};
use crate::maps::{DynamicMap, HoloMap, KeyValue};
use crate::odt::{read_odt, OdtTable};
use crate::snapshot::SnapshotKey;
use crate::views::{Curve, Dimension, TableView};

/// ODT rows merged with a list of OMF snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct OdtViews {
    pub omf_paths: Vec<PathBuf>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    /// Every column except `File`.
    pub headers: Vec<String>,
}

/// Stand-in file name for errors about the table itself.
const TABLE: &str = "<odt table>";

fn integral_key(v: f64) -> Option<u64> {
    (v.is_finite() && v >= 0.0 && v.fract() == 0.0).then_some(v as u64)
}

impl OdtViews {
    pub fn new(odt_path: &Path, omf_paths: &[PathBuf]) -> Result<Self> {
        let table = read_odt(odt_path)?;
        Self::from_table(&table, omf_paths).map_err(|e| match e {
            ViewError::CrossReference { file, reason } if file == TABLE => {
                ViewError::cross_reference(odt_path.display().to_string(), reason)
            }
            other => other,
        })
    }

    /// Join `table` against `omf_paths`. Each OMF file must match exactly
    /// one ODT row by (stage, iteration).
    pub fn from_table(table: &OdtTable, omf_paths: &[PathBuf]) -> Result<Self> {
        let missing = |col: &str| ViewError::cross_reference(TABLE, format!("ODT table has no '{}' column", col));
        let stage_col = table.column_index("stage").ok_or_else(|| missing("stage"))?;
        let iter_col = table
            .column_index("iteration")
            .ok_or_else(|| missing("iteration"))?;

        let mut by_key: HashMap<SnapshotKey, Vec<usize>> = HashMap::new();
        for (r, row) in table.rows.iter().enumerate() {
            let (Some(stage), Some(iteration)) = (integral_key(row[stage_col]), integral_key(row[iter_col]))
            else {
                return Err(ViewError::cross_reference(
                    TABLE,
                    format!(
                        "row {} has non-integer stage/iteration ({}, {})",
                        r, row[stage_col], row[iter_col]
                    ),
                ));
            };
            by_key.entry(SnapshotKey { stage, iteration }).or_default().push(r);
        }

        let mut columns = vec![
            "File".to_string(),
            "stage".to_string(),
            "iteration".to_string(),
        ];
        let rest: Vec<usize> = (0..table.columns.len())
            .filter(|&c| c != stage_col && c != iter_col)
            .collect();
        columns.extend(rest.iter().map(|&c| table.columns[c].clone()));

        let mut rows = Vec::with_capacity(omf_paths.len());
        for (pos, path) in omf_paths.iter().enumerate() {
            let key = SnapshotKey::from_path(path)?;
            let file = path.display().to_string();
            let matches = by_key.get(&key).map(Vec::as_slice).unwrap_or(&[]);
            let r = match matches {
                [r] => *r,
                [] => {
                    return Err(ViewError::cross_reference(
                        file,
                        format!("no ODT row for {}", key),
                    ))
                }
                _ => {
                    return Err(ViewError::cross_reference(
                        file,
                        format!("{} ODT rows match {}", matches.len(), key),
                    ))
                }
            };
            let src = &table.rows[r];
            let mut row = Vec::with_capacity(columns.len());
            row.push(pos as f64);
            row.push(key.stage as f64);
            row.push(key.iteration as f64);
            row.extend(rest.iter().map(|&c| src[c]));
            rows.push(row);
        }

        info!(
            "matched {} snapshots against {} ODT rows",
            rows.len(),
            table.rows.len()
        );
        let headers = columns[1..].to_vec();
        Ok(Self {
            omf_paths: omf_paths.to_vec(),
            columns,
            rows,
            headers,
        })
    }

    fn column(&self, name: &str) -> Result<Vec<f64>> {
        let c = self.columns.iter().position(|n| n == name).ok_or_else(|| {
            ViewError::InvalidArgument(format!(
                "'{}' is not a column; expected one of {:?}",
                name, self.headers
            ))
        })?;
        Ok(self.rows.iter().map(|r| r[c]).collect())
    }

    /// Column `y` against column `x`.
    pub fn get_curve(&self, x: &str, y: &str) -> Result<Curve> {
        Ok(Curve {
            kdim: x.to_string(),
            vdim: y.to_string(),
            x: self.column(x)?,
            y: self.column(y)?,
        })
    }

    pub fn table(&self) -> TableView {
        TableView {
            columns: self.columns.clone(),
            rows: self.rows.clone(),
        }
    }

    /// Curves for every (x, y) pair of headers.
    pub fn create_holomap(&self) -> Result<HoloMap<Curve>> {
        let mut map = HoloMap::new(vec![Dimension::new("x"), Dimension::new("y")]);
        for x in &self.headers {
            for y in &self.headers {
                map.insert(
                    vec![KeyValue::from(x.as_str()), KeyValue::from(y.as_str())],
                    self.get_curve(x, y)?,
                )?;
            }
        }
        Ok(map)
    }

    /// Curves computed on demand; kdims `x` and `Graph` range over the headers.
    pub fn create_dmap(&self) -> DynamicMap<Curve> {
        let values: Vec<KeyValue> = self.headers.iter().map(|h| KeyValue::from(h.as_str())).collect();
        let kdims = vec![
            Dimension::new("x").with_values(values.clone()),
            Dimension::new("Graph").with_values(values),
        ];
        let views = self.clone();
        DynamicMap::new(kdims, move |key: &[KeyValue]| {
            let (Some(x), Some(y)) = (key[0].as_text(), key[1].as_text()) else {
                return Err(ViewError::InvalidArgument(
                    "curve keys must be column names".to_string(),
                ));
            };
            views.get_curve(x, y)
        })
    }
}
