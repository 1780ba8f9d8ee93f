pub mod models;
pub mod parse;
pub mod problem;
pub mod report;
pub mod solution;
pub mod solver;

pub use models::siting::{SitingResult, SitingSolver};
pub use problem::Problem;
pub use solution::SitingSolution;
pub use solver::{Backend, BackendKind, SolverConfig};
