pub mod lp;

#[cfg(feature = "gurobi")]
pub mod gurobi;

use std::time::Duration;

use derive_more::Display;
use good_lp::ProblemVariables;

use crate::models::milp::Formulation;

/// Settings passed to every backend
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// Wall clock limit for a single solve
    pub time_limit: Duration,
    /// Relative MIP gap at which the search stops
    pub mip_gap: f64,
    /// Whether the backend should print its own progress log
    pub log_output: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            time_limit: Duration::from_secs(10800),
            mip_gap: 0.0005,
            log_output: true,
        }
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Proven optimal within the gap tolerance
    #[display(fmt = "optimal")]
    Optimal,
    /// Stopped by the time limit with a feasible solution
    #[display(fmt = "time limit reached")]
    TimeLimit,
    #[display(fmt = "infeasible")]
    Infeasible,
    #[display(fmt = "unbounded")]
    Unbounded,
    /// Stopped without finding any feasible solution
    #[display(fmt = "no solution found")]
    NoSolution,
}

/// The best solution a backend found
#[derive(Debug, Clone, PartialEq)]
pub struct Incumbent {
    /// Value of every model variable, in column order
    pub values: Vec<f64>,
    pub objective: f64,
    /// Best proven lower bound on the objective, NaN when the backend cannot tell
    pub best_bound: f64,
    /// `|objective - best_bound| / |objective|`, NaN when the bound is unknown
    pub relative_gap: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub status: Status,
    pub incumbent: Option<Incumbent>,
}

impl Outcome {
    pub fn without_incumbent(status: Status) -> Outcome {
        Outcome {
            status,
            incumbent: None,
        }
    }
}

#[derive(Debug, Display, Clone, PartialEq)]
pub enum SolveError {
    /// The solver library reported an error
    #[display(fmt = "{} backend failed: {}", backend, message)]
    Backend {
        backend: &'static str,
        message: String,
    },
    /// The requested backend is not part of this build
    #[display(fmt = "the {} backend is not available in this build", _0)]
    Unavailable(BackendKind),
    /// The assignment does not match the model it is supposed to belong to
    #[display(fmt = "assignment has {} values, but the model has {} variables", actual, expected)]
    SizeMismatch { expected: usize, actual: usize },
}

impl std::error::Error for SolveError {}

/// A MILP solver that can minimize a [`Formulation`] whose variables live in `variables`.
pub trait Backend {
    fn name(&self) -> &'static str;

    fn solve(
        &self,
        variables: ProblemVariables,
        formulation: &Formulation,
        config: &SolverConfig,
    ) -> Result<Outcome, SolveError>;
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    #[display(fmt = "microlp")]
    Microlp,
    #[display(fmt = "highs")]
    Highs,
    #[display(fmt = "gurobi")]
    Gurobi,
}

impl BackendKind {
    pub fn backend(self) -> Result<Box<dyn Backend>, SolveError> {
        match self {
            BackendKind::Microlp => Ok(Box::new(lp::MicrolpBackend)),
            #[cfg(feature = "solver-highs")]
            BackendKind::Highs => Ok(Box::new(lp::HighsBackend)),
            #[cfg(not(feature = "solver-highs"))]
            BackendKind::Highs => Err(SolveError::Unavailable(self)),
            #[cfg(feature = "gurobi")]
            BackendKind::Gurobi => Ok(Box::new(gurobi::GurobiBackend)),
            #[cfg(not(feature = "gurobi"))]
            BackendKind::Gurobi => Err(SolveError::Unavailable(self)),
        }
    }
}

/// Relative distance between an objective value and a bound, as reported by MIP solvers.
pub fn relative_gap(objective: f64, best_bound: f64) -> f64 {
    (objective - best_bound).abs() / objective.abs().max(1e-10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_run() {
        let config = SolverConfig::default();
        assert_eq!(config.time_limit.as_secs(), 10800);
        assert_eq!(config.mip_gap, 0.0005);
    }

    #[test]
    fn gap_is_relative_to_the_objective() {
        assert_eq!(relative_gap(200.0, 190.0), 0.05);
        assert_eq!(relative_gap(-200.0, -210.0), 0.05);
        assert_eq!(relative_gap(0.0, 0.0), 0.0);
    }

    #[test]
    fn microlp_is_always_available() {
        assert_eq!(BackendKind::Microlp.backend().unwrap().name(), "microlp");
        if cfg!(not(feature = "solver-highs")) {
            assert!(matches!(
                BackendKind::Highs.backend(),
                Err(SolveError::Unavailable(BackendKind::Highs))
            ));
        }
        if cfg!(not(feature = "gurobi")) {
            assert!(matches!(
                BackendKind::Gurobi.backend(),
                Err(SolveError::Unavailable(BackendKind::Gurobi))
            ));
        }
    }
}
