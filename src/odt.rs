// src/odt.rs
//
// Parser for OOMMF ODT data tables.
//
// Layout:
//   # ODT 1.0
//   # Table Start
//   # Title: ...
//   # Columns: Oxs_TimeDriver::Iteration {Oxs_RungeKuttaEvolve:evolver:Total energy} ...
//   # Units:   {} J ...
//   <row of numbers>
//   ...
//   # Table End
//
// Column names with spaces are wrapped in braces. Column names are shortened
// to the quantity after the last ':' (see `short_name`).

use std::fs;
use std::path::Path;

use log::debug;
use serde::Serialize;

use crate::error::{Result, ViewError};

/// Parsed ODT table. `rows[r][c]` is the value of column `c` in row `r`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OdtTable {
    pub columns: Vec<String>,
    pub units: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl OdtTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let c = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r[c]).collect())
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }
}

pub fn read_odt(path: &Path) -> Result<OdtTable> {
    let text = fs::read_to_string(path)?;
    let table = parse_odt(&text)?;
    debug!(
        "read {} ({} columns, {} rows)",
        path.display(),
        table.columns.len(),
        table.rows.len()
    );
    Ok(table)
}

pub fn parse_odt(text: &str) -> Result<OdtTable> {
    let mut raw_columns: Option<Vec<String>> = None;
    let mut units: Vec<String> = Vec::new();
    let mut rows: Vec<Vec<f64>> = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(body) = line.strip_prefix('#') {
            let body = body.trim();
            if let Some(cols) = strip_key(body, "columns") {
                let cols = split_braced(cols, line_no)?;
                match &raw_columns {
                    Some(prev) if *prev != cols => {
                        return Err(ViewError::format(
                            line_no,
                            "table columns differ from an earlier table in the same file",
                        ));
                    }
                    _ => raw_columns = Some(cols),
                }
            } else if let Some(u) = strip_key(body, "units") {
                units = split_braced(u, line_no)?;
            }
            continue;
        }

        let Some(cols) = &raw_columns else {
            return Err(ViewError::format(line_no, "data row before '# Columns:' header"));
        };
        let row = line
            .split_whitespace()
            .map(|tok| {
                tok.parse::<f64>()
                    .map_err(|_| ViewError::format(line_no, format!("invalid number '{}'", tok)))
            })
            .collect::<Result<Vec<f64>>>()?;
        if row.len() != cols.len() {
            return Err(ViewError::format(
                line_no,
                format!("row has {} values, header has {} columns", row.len(), cols.len()),
            ));
        }
        rows.push(row);
    }

    let raw_columns =
        raw_columns.ok_or_else(|| ViewError::format(0, "no '# Columns:' header found"))?;

    let mut columns: Vec<String> = Vec::with_capacity(raw_columns.len());
    for raw in &raw_columns {
        let short = short_name(raw);
        if columns.contains(&short) {
            columns.push(raw.clone());
        } else {
            columns.push(short);
        }
    }
    if units.len() != columns.len() {
        units = vec![String::new(); columns.len()];
    }

    Ok(OdtTable {
        columns,
        units,
        rows,
    })
}

fn strip_key<'a>(body: &'a str, key: &str) -> Option<&'a str> {
    let (k, v) = body.split_once(':')?;
    if k.trim().eq_ignore_ascii_case(key) {
        Some(v)
    } else {
        None
    }
}

/// Split a header line into tokens; `{a b}` is a single token "a b".
fn split_braced(s: &str, line: usize) -> Result<Vec<String>> {
    let mut out = Vec::new();
    let mut chars = s.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '{' {
            chars.next();
            let mut tok = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(ch) => tok.push(ch),
                    None => return Err(ViewError::format(line, "unterminated '{' in header")),
                }
            }
            out.push(tok.trim().to_string());
        } else {
            let mut tok = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() {
                    break;
                }
                tok.push(ch);
                chars.next();
            }
            out.push(tok);
        }
    }
    Ok(out)
}

/// Short column name for an OOMMF column label like
/// `Oxs_RungeKuttaEvolve:evolver:Total energy`.
pub fn short_name(raw: &str) -> String {
    let quantity = raw.rsplit(':').next().unwrap_or(raw).trim();
    match quantity {
        "Iteration" => "iteration".into(),
        "Stage" => "stage".into(),
        "Stage iteration" => "stage_iteration".into(),
        "Simulation time" => "t".into(),
        "Total energy" => "E".into(),
        "Energy calc count" => "E_calc_count".into(),
        "Max dm/dt" => "max_dm/dt".into(),
        "dE/dt" => "dE/dt".into(),
        "Delta E" => "delta_E".into(),
        "Last time step" => "last_time_step".into(),
        "Max mxHxm" => "max_mxHxm".into(),
        "mx" | "my" | "mz" | "Bx" | "By" | "Bz" | "B" => quantity.into(),
        other => other.to_lowercase().replace(' ', "_"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# ODT 1.0
# Table Start
# Title: Oxs_MinDriver
# Columns: {Oxs_CGEvolve::Max mxHxm} {Oxs_CGEvolve::Total energy} Oxs_MinDriver::Iteration Oxs_MinDriver::Stage {Oxs_MinDriver::Stage iteration} Oxs_MinDriver::mx {Oxs_UniformExchange::Energy} {Oxs_Demag::Energy}
# Units: A/m J {} {} {} {} J J
        12.5  -1.0e-18  0  0  0  0.9  1e-19  2e-19
         3.5  -2.0e-18  5  0  5  0.8  1e-19  3e-19
# Table End
";

    #[test]
    fn braces_group_tokens_and_names_are_shortened() {
        let t = parse_odt(SAMPLE).unwrap();
        assert_eq!(
            t.columns,
            vec![
                "max_mxHxm".to_string(),
                "E".to_string(),
                "iteration".to_string(),
                "stage".to_string(),
                "stage_iteration".to_string(),
                "mx".to_string(),
                "energy".to_string(),
                "Oxs_Demag::Energy".to_string(),
            ]
        );
        assert_eq!(t.units[1], "J");
        assert_eq!(t.units[2], "");
        assert_eq!(t.n_rows(), 2);
        assert_eq!(t.column("iteration").unwrap(), vec![0.0, 5.0]);
    }

    #[test]
    fn consecutive_tables_are_concatenated() {
        let text = "# Table Start\n# Columns: Stage Iteration\n0 1\n# Table End\n\
                    # Table Start\n# Columns: Stage Iteration\n1 2\n# Table End\n";
        let t = parse_odt(text).unwrap();
        assert_eq!(t.rows, vec![vec![0.0, 1.0], vec![1.0, 2.0]]);
        assert_eq!(t.units, vec!["".to_string(), "".to_string()]);
    }

    #[test]
    fn ragged_rows_and_changed_columns_fail() {
        let ragged = "# Columns: a b\n1 2 3\n";
        assert!(matches!(parse_odt(ragged), Err(ViewError::Format { line: 2, .. })));

        let changed = "# Columns: a b\n1 2\n# Columns: a c\n";
        assert!(matches!(parse_odt(changed), Err(ViewError::Format { line: 3, .. })));

        assert!(parse_odt("1 2\n").is_err());
        assert!(parse_odt("# Columns: {a b\n").is_err());
    }
}
