use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use derive_more::Display;
use log::info;
use serde::{Deserialize, Serialize};

use crate::models::milp::Formulation;
use crate::solver::Incumbent;

pub const OBJECTIVE_VALUE: &str = "Objective Value";
pub const BEST_BOUND: &str = "Best Bound";
pub const GAP_PERCENTAGE: &str = "Gap Percentage";

/// Values below this are left out of the printed solution
const PRINT_TOLERANCE: f64 = 1e-6;

/// A row of the exported solution table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    #[serde(rename = "Variable")]
    pub variable: String,
    #[serde(rename = "Value")]
    pub value: f64,
}

impl Row {
    fn new(variable: &str, value: f64) -> Row {
        Row {
            variable: variable.to_string(),
            value,
        }
    }
}

#[derive(Debug, Display)]
pub enum ReportError {
    #[display(fmt = "failed to create {}: {}", path, source)]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[display(fmt = "failed to write {}: {}", path, source)]
    Csv { path: String, source: csv::Error },
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::Io { source, .. } => Some(source),
            ReportError::Csv { source, .. } => Some(source),
        }
    }
}

/// One row per model variable, in creation order, followed by the three summary rows.
pub fn solution_table(formulation: &Formulation, incumbent: &Incumbent) -> Vec<Row> {
    let mut rows: Vec<Row> = formulation
        .columns
        .iter()
        .zip(&incumbent.values)
        .map(|(column, value)| Row::new(&column.name, *value))
        .collect();

    rows.push(Row::new(OBJECTIVE_VALUE, incumbent.objective));
    rows.push(Row::new(BEST_BOUND, incumbent.best_bound));
    rows.push(Row::new(GAP_PERCENTAGE, incumbent.relative_gap * 100.0));
    rows
}

/// `<dir>/solution_at_price_<price per liter>.csv`, whole prices keep a trailing `.0`
pub fn output_path(dir: &Path, third_party_price: f64, conversion_yield: f64) -> PathBuf {
    let price = third_party_price / conversion_yield;
    let label = if price.is_finite() && price.fract() == 0.0 {
        format!("{:.1}", price)
    } else {
        price.to_string()
    };
    dir.join(format!("solution_at_price_{}.csv", label))
}

pub fn write_table(path: &Path, rows: &[Row]) -> Result<(), ReportError> {
    let csv_err = |source| ReportError::Csv {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ReportError::Io {
            path: parent.display().to_string(),
            source,
        })?;
    }

    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    for row in rows {
        writer.serialize(row).map_err(csv_err)?;
    }
    writer.flush().map_err(|source| ReportError::Io {
        path: path.display().to_string(),
        source,
    })?;

    info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Human readable listing of the objective and every non-zero variable.
pub fn format_solution(formulation: &Formulation, incumbent: &Incumbent) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "objective: {:.3}", incumbent.objective);
    for (column, value) in formulation.columns.iter().zip(&incumbent.values) {
        if value.abs() > PRINT_TOLERANCE {
            let _ = writeln!(out, "  {}={}", column.name, value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::milp::{MilpModel, VarType};

    fn model() -> Formulation {
        let mut model = MilpModel::new("report");
        model.add_var("Q_Anderson_1", VarType::Continuous);
        model.add_var("H_1", VarType::Binary);
        model.add_var("TP", VarType::Continuous);
        model.formulation().clone()
    }

    fn incumbent() -> Incumbent {
        Incumbent {
            values: vec![100.0, 1.0, 0.0],
            objective: 200.0,
            best_bound: 199.0,
            relative_gap: 0.005,
        }
    }

    #[test]
    fn table_ends_with_the_summary_rows() {
        let rows = solution_table(&model(), &incumbent());
        let names: Vec<&str> = rows.iter().map(|r| r.variable.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Q_Anderson_1",
                "H_1",
                "TP",
                OBJECTIVE_VALUE,
                BEST_BOUND,
                GAP_PERCENTAGE
            ]
        );
        assert_eq!(rows[5].value, 0.5);
    }

    #[test]
    fn output_file_is_named_after_the_price_per_liter() {
        let path = output_path(Path::new("solutions"), 464.0, 232.0);
        assert_eq!(path, Path::new("solutions").join("solution_at_price_2.0.csv"));
        let path = output_path(Path::new("out"), 58.0, 232.0);
        assert_eq!(path, Path::new("out").join("solution_at_price_0.25.csv"));
        let path = output_path(Path::new("out"), 369.0, 232.0);
        assert_eq!(path, Path::new("out").join("solution_at_price_1.5905172413793103.csv"));
    }

    #[test]
    fn writes_a_variable_value_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("solution.csv");
        write_table(&path, &solution_table(&model(), &incumbent())).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], "Variable,Value");
        assert_eq!(lines[1], "Q_Anderson_1,100.0");
        assert_eq!(lines[4], "Objective Value,200.0");
        assert_eq!(lines.len(), 7);
    }

    #[test]
    fn printed_solution_skips_zeros() {
        let text = format_solution(&model(), &incumbent());
        assert_eq!(text, "objective: 200.000\n  Q_Anderson_1=100\n  H_1=1\n");
    }
}
