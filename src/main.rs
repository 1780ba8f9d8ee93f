use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;

use biofuel_siting::parse::{self, DataFiles};
use biofuel_siting::problem::{DEFAULT_CONVERSION_YIELD, DEFAULT_DEMAND};
use biofuel_siting::report;
use biofuel_siting::{Backend, BackendKind, Problem, SitingSolution, SitingSolver, SolverConfig};
use clap::{ArgEnum, Parser};
use env_logger::Env;
use log::{info, warn};

/// Sites biomass hubs and biofuel plants by solving a MILP for each third-party price.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Directory holding TX_suppliers.csv, TX_hubs.csv, TX_plants.csv, TX_roads.csv and TX_railroads.csv
    #[clap(long, default_value = ".")]
    data_dir: PathBuf,

    /// Read the whole problem from a JSON file instead of the CSV tables
    #[clap(long)]
    problem: Option<PathBuf>,

    /// Where the solution tables are written
    #[clap(long, default_value = "solutions")]
    output_dir: PathBuf,

    /// Unit price of biomass-equivalent bought from a third party. Repeat to run several trials.
    #[clap(long = "price", required = true)]
    prices: Vec<f64>,

    /// Liters of biofuel per unit of biomass
    #[clap(long, default_value_t = DEFAULT_CONVERSION_YIELD)]
    conversion_yield: f64,

    /// Total demand in liters
    #[clap(long, default_value_t = DEFAULT_DEMAND)]
    demand: f64,

    /// Solver time limit in seconds
    #[clap(long, default_value_t = 10800)]
    time_limit: u64,

    /// Relative MIP gap tolerance
    #[clap(long, default_value_t = 0.0005)]
    mip_gap: f64,

    /// MILP solver. `highs` needs the `solver-highs` cargo feature, `gurobi` the `gurobi` feature
    #[clap(long, arg_enum, default_value = "microlp")]
    backend: BackendArg,

    /// Do not print the solver's own log
    #[clap(long)]
    quiet: bool,
}

#[derive(ArgEnum, Debug, Clone, Copy)]
enum BackendArg {
    Microlp,
    Highs,
    Gurobi,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Microlp => BackendKind::Microlp,
            BackendArg::Highs => BackendKind::Highs,
            BackendArg::Gurobi => BackendKind::Gurobi,
        }
    }
}

/// Builds, solves and exports one trial. Returns whether a solution was found.
fn run_trial(
    problem: &Problem,
    price: f64,
    backend: &dyn Backend,
    config: &SolverConfig,
    output_dir: &Path,
) -> Result<bool, Box<dyn Error>> {
    let result = SitingSolver::solve(problem, price, backend, config)?;

    let incumbent = match &result.outcome.incumbent {
        Some(incumbent) => incumbent,
        None => {
            println!("No solution found");
            warn!("Price {}: solver stopped with status {}", price, result.outcome.status);
            return Ok(false);
        }
    };

    println!("Solution found:\n");
    print!("{}", report::format_solution(&result.formulation, incumbent));

    let solution = SitingSolution::new(
        &result.formulation,
        &result.variables,
        result.outcome.status,
        incumbent,
    )?;
    let costs = solution.costs(&result.sets, &result.parameters);
    info!(
        "Price {}: objective {:.2} (road {:.2}, rail {:.2}, loading {:.2}, hubs {:.2}, plants {:.2}, third party {:.2}), gap {:.4}%",
        price,
        solution.objective,
        costs.road,
        costs.rail,
        costs.loading,
        costs.hub_investment,
        costs.plant_investment,
        costs.third_party,
        solution.relative_gap * 100.0
    );
    info!(
        "Opened {} hubs and {} plants, third party covers {:.2}",
        solution.open_hubs().len(),
        solution.open_plants().len(),
        solution.tp
    );
    for violation in solution.audit(&result.sets, &result.parameters, 1e-6) {
        warn!("{}", violation);
    }

    let path = report::output_path(output_dir, price, problem.conversion_yield());
    report::write_table(&path, &report::solution_table(&result.formulation, incumbent))?;
    Ok(true)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let problem = match &args.problem {
        Some(path) => parse::read_json(path)?,
        None => parse::load_problem(
            &DataFiles::in_dir(&args.data_dir),
            args.conversion_yield,
            args.demand,
        )?,
    };

    let config = SolverConfig {
        time_limit: Duration::from_secs(args.time_limit),
        mip_gap: args.mip_gap,
        log_output: !args.quiet,
    };
    let backend = BackendKind::from(args.backend).backend()?;

    let mut unsolved = Vec::new();
    for price in &args.prices {
        if !run_trial(&problem, *price, backend.as_ref(), &config, &args.output_dir)? {
            unsolved.push(*price);
        }
    }

    if !unsolved.is_empty() {
        return Err(format!("no solution found for price(s) {:?}", unsolved).into());
    }
    Ok(())
}
