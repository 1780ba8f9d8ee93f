#[cfg(feature = "solver-highs")]
use std::time::Instant;

#[cfg(feature = "solver-highs")]
use good_lp::solvers::highs::highs;
use good_lp::solvers::microlp::microlp;
use good_lp::{ProblemVariables, ResolutionError, Solution, SolverModel};
use log::{info, warn};

use super::{Backend, Incumbent, Outcome, SolveError, SolverConfig, Status};
use crate::models::milp::{Formulation, VarType};

/// Allowed row violation, relative to the rhs, of values returned by an interrupted solve
const FEASIBILITY_TOLERANCE: f64 = 1e-6;

/// Pure Rust branch-and-bound. Always solves to proven optimality.
#[derive(Debug, Clone, Copy, Default)]
pub struct MicrolpBackend;

impl Backend for MicrolpBackend {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn solve(
        &self,
        variables: ProblemVariables,
        formulation: &Formulation,
        config: &SolverConfig,
    ) -> Result<Outcome, SolveError> {
        log_start(self.name(), formulation, config);
        warn!(
            "microlp ignores the time limit ({:?}) and the gap tolerance ({}) and solves to optimality, build with `solver-highs` to enforce them",
            config.time_limit, config.mip_gap
        );

        let problem = variables
            .minimise(formulation.objective.clone())
            .using(microlp);
        let result = with_rows(problem, formulation).solve();
        read_outcome(self.name(), formulation, result, Status::Optimal)
    }
}

/// HiGHS through its bundled C++ library. Honors the time limit and the gap.
#[cfg(feature = "solver-highs")]
#[derive(Debug, Clone, Copy, Default)]
pub struct HighsBackend;

#[cfg(feature = "solver-highs")]
impl Backend for HighsBackend {
    fn name(&self) -> &'static str {
        "highs"
    }

    fn solve(
        &self,
        variables: ProblemVariables,
        formulation: &Formulation,
        config: &SolverConfig,
    ) -> Result<Outcome, SolveError> {
        log_start(self.name(), formulation, config);

        let problem = variables
            .minimise(formulation.objective.clone())
            .using(highs)
            .set_option("output_flag", config.log_output)
            .set_option("time_limit", config.time_limit.as_secs_f64())
            .set_option("mip_rel_gap", config.mip_gap);

        let started = Instant::now();
        let result = with_rows(problem, formulation).solve();
        // good_lp hands back whatever HiGHS has when it stops early
        let status = if started.elapsed() >= config.time_limit {
            Status::TimeLimit
        } else {
            Status::Optimal
        };
        read_outcome(self.name(), formulation, result, status)
    }
}

fn log_start(backend: &str, formulation: &Formulation, config: &SolverConfig) {
    if config.log_output {
        info!(
            "{}: solving `{}` with {} variables ({} binary) and {} constraints",
            backend,
            formulation.name,
            formulation.num_vars(),
            formulation.num_binaries(),
            formulation.num_rows()
        );
    }
}

fn with_rows<M: SolverModel>(mut problem: M, formulation: &Formulation) -> M {
    for row in &formulation.rows {
        problem = problem.with(row.constraint());
    }
    problem
}

/// Reads the column values back. `status` is what a returned solution means for this backend.
fn read_outcome<S: Solution>(
    backend: &'static str,
    formulation: &Formulation,
    result: Result<S, ResolutionError>,
    status: Status,
) -> Result<Outcome, SolveError> {
    let solution = match result {
        Ok(solution) => solution,
        Err(ResolutionError::Infeasible) => {
            return Ok(Outcome::without_incumbent(Status::Infeasible))
        }
        Err(ResolutionError::Unbounded) => {
            return Ok(Outcome::without_incumbent(Status::Unbounded))
        }
        Err(err) => {
            return Err(SolveError::Backend {
                backend,
                message: err.to_string(),
            })
        }
    };

    let values: Vec<f64> = formulation
        .columns
        .iter()
        .map(|c| {
            let value = solution.value(c.var);
            match c.vtype {
                VarType::Binary => value.round(),
                VarType::Continuous => value,
            }
        })
        .collect();

    if status == Status::TimeLimit {
        let violated = formulation.violated(&values, FEASIBILITY_TOLERANCE);
        if let Some(first) = violated.first() {
            warn!(
                "{} stopped at the time limit without a feasible solution, {} rows violated (first: {})",
                backend,
                violated.len(),
                first
            );
            return Ok(Outcome::without_incumbent(Status::NoSolution));
        }
    }

    let objective = formulation
        .objective
        .eval_with(&formulation.assignment(&values));
    // good_lp does not expose the dual bound of an interrupted search
    let (best_bound, relative_gap) = match status {
        Status::Optimal => (objective, 0.0),
        _ => (f64::NAN, f64::NAN),
    };

    Ok(Outcome {
        status,
        incumbent: Some(Incumbent {
            values,
            objective,
            best_bound,
            relative_gap,
        }),
    })
}
