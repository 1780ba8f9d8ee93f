use std::path::{Path, PathBuf};

use derive_more::Display;
use log::{debug, info};
use serde::de::DeserializeOwned;

use crate::problem::{County, Hub, Plant, Problem, ProblemConstructionError, RailArc, RoadArc};

#[derive(Debug, Display)]
pub enum ParseError {
    /// A table could not be opened or one of its rows is malformed
    #[display(fmt = "failed to read {}: {}", path, source)]
    Csv { path: String, source: csv::Error },
    /// A problem file could not be opened
    #[display(fmt = "failed to open {}: {}", path, source)]
    Io {
        path: String,
        source: std::io::Error,
    },
    /// A problem file is not valid JSON, or fails validation
    #[display(fmt = "failed to parse {}: {}", path, source)]
    Json {
        path: String,
        source: serde_json::Error,
    },
    /// The tables were read, but do not form a valid problem
    #[display(fmt = "invalid problem data: {}", _0)]
    Invalid(ProblemConstructionError),
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Csv { source, .. } => Some(source),
            ParseError::Io { source, .. } => Some(source),
            ParseError::Json { source, .. } => Some(source),
            ParseError::Invalid(err) => Some(err),
        }
    }
}

impl From<ProblemConstructionError> for ParseError {
    fn from(err: ProblemConstructionError) -> Self {
        ParseError::Invalid(err)
    }
}

/// Locations of the five input tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFiles {
    /// `county,supply`
    pub suppliers: PathBuf,
    /// `hub,capacity,invest`
    pub hubs: PathBuf,
    /// `plant,capacity,invest`
    pub plants: PathBuf,
    /// `county,hub,cost`
    pub roads: PathBuf,
    /// `hub,plant,cost,loading,capacity`
    pub railroads: PathBuf,
}

impl DataFiles {
    /// The standard file names, relative to `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> DataFiles {
        let dir = dir.as_ref();
        DataFiles {
            suppliers: dir.join("TX_suppliers.csv"),
            hubs: dir.join("TX_hubs.csv"),
            plants: dir.join("TX_plants.csv"),
            roads: dir.join("TX_roads.csv"),
            railroads: dir.join("TX_railroads.csv"),
        }
    }
}

/// Reads every row of a CSV table with a header line. Columns are matched by name, extra columns are ignored.
pub fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, ParseError> {
    let err = |source| ParseError::Csv {
        path: path.display().to_string(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(err)?;

    let rows = reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(err)?;

    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Loads and validates the five tables.
pub fn load_problem(
    files: &DataFiles,
    conversion_yield: f64,
    demand: f64,
) -> Result<Problem, ParseError> {
    let counties: Vec<County> = read_table(&files.suppliers)?;
    let hubs: Vec<Hub> = read_table(&files.hubs)?;
    let plants: Vec<Plant> = read_table(&files.plants)?;
    let roads: Vec<RoadArc> = read_table(&files.roads)?;
    let rails: Vec<RailArc> = read_table(&files.railroads)?;

    info!(
        "Loaded {} counties, {} hubs, {} plants, {} road arcs and {} rail arcs",
        counties.len(),
        hubs.len(),
        plants.len(),
        roads.len(),
        rails.len()
    );

    Ok(Problem::new(
        counties,
        hubs,
        plants,
        roads,
        rails,
        conversion_yield,
        demand,
    )?)
}

/// Reads a problem stored as JSON.
pub fn read_json(path: &Path) -> Result<Problem, ParseError> {
    let file = std::fs::File::open(path).map_err(|source| ParseError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let reader = std::io::BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| ParseError::Json {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_tables(dir: &Path) {
        fs::write(
            dir.join("TX_suppliers.csv"),
            "county,supply\nAnderson,120.5\nBexar,80\n",
        )
        .unwrap();
        fs::write(
            dir.join("TX_hubs.csv"),
            ",hub,capacity,invest\n0,1,100,5000\n1,2,300,9000\n",
        )
        .unwrap();
        fs::write(dir.join("TX_plants.csv"), "plant,capacity,invest\n7,23200,1e6\n").unwrap();
        fs::write(
            dir.join("TX_roads.csv"),
            "county,hub,cost\nAnderson,1,1.5\nAnderson,2,2.5\nBexar,1,3\nBexar,2,0.5\n",
        )
        .unwrap();
        fs::write(
            dir.join("TX_railroads.csv"),
            "hub,plant,cost,loading,capacity\n1,7,0.2,100,50\n2, 7 ,0.3,200,60\n",
        )
        .unwrap();
    }

    #[test]
    fn loads_the_standard_tables() {
        let dir = tempfile::tempdir().unwrap();
        write_tables(dir.path());

        let problem = load_problem(&DataFiles::in_dir(dir.path()), 232.0, 23200.0).unwrap();
        assert_eq!(problem.counties().len(), 2);
        assert_eq!(problem.hubs()[1].id, "2");
        assert_eq!(problem.hubs()[1].invest, 9000.0);
        assert_eq!(problem.plants()[0].invest, 1e6);
        assert_eq!(problem.road(1, 1).cost, 0.5);
        assert_eq!(problem.rail(1, 0).loading, 200.0);
        assert_eq!(problem.required_biomass(), 100.0);
    }

    #[test]
    fn missing_file_reports_its_path() {
        let dir = tempfile::tempdir().unwrap();
        write_tables(dir.path());
        fs::remove_file(dir.path().join("TX_roads.csv")).unwrap();

        let err = load_problem(&DataFiles::in_dir(dir.path()), 232.0, 0.0).unwrap_err();
        assert!(matches!(err, ParseError::Csv { .. }));
        assert!(err.to_string().contains("TX_roads.csv"));
    }

    #[test]
    fn malformed_rows_and_missing_arcs_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        write_tables(dir.path());
        fs::write(
            dir.path().join("TX_suppliers.csv"),
            "county,supply\nAnderson,lots\n",
        )
        .unwrap();
        let err = load_problem(&DataFiles::in_dir(dir.path()), 232.0, 0.0).unwrap_err();
        assert!(matches!(err, ParseError::Csv { .. }));

        write_tables(dir.path());
        fs::write(
            dir.path().join("TX_roads.csv"),
            "county,hub,cost\nAnderson,1,1.5\n",
        )
        .unwrap();
        let err = load_problem(&DataFiles::in_dir(dir.path()), 232.0, 0.0).unwrap_err();
        assert!(matches!(
            err,
            ParseError::Invalid(ProblemConstructionError::MissingArc { .. })
        ));
    }

    #[test]
    fn reads_json_problems() {
        let dir = tempfile::tempdir().unwrap();
        write_tables(dir.path());
        let problem = load_problem(&DataFiles::in_dir(dir.path()), 232.0, 23200.0).unwrap();

        let path = dir.path().join("problem.json");
        fs::write(&path, problem.to_json().unwrap()).unwrap();
        let parsed = read_json(&path).unwrap();
        assert_eq!(parsed.rails(), problem.rails());
        assert_eq!(parsed.demand(), 23200.0);
    }
}
