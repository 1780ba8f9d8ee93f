use std::collections::HashMap;

use good_lp::{IntoAffineExpression, ProblemVariables, Variable};
use grb::prelude::*;
use grb::{attr, param, Expr as GrbExpr};
use log::info;

use super::{relative_gap, Backend, Incumbent, Outcome, SolveError, SolverConfig, Status};
use crate::models::milp::{Formulation, Sense, VarType};

/// Solves through the Gurobi C library. Requires a licensed local installation.
#[derive(Debug, Clone, Copy, Default)]
pub struct GurobiBackend;

impl Backend for GurobiBackend {
    fn name(&self) -> &'static str {
        "gurobi"
    }

    fn solve(
        &self,
        _variables: ProblemVariables,
        formulation: &Formulation,
        config: &SolverConfig,
    ) -> Result<Outcome, SolveError> {
        run(formulation, config).map_err(|err| SolveError::Backend {
            backend: "gurobi",
            message: err.to_string(),
        })
    }
}

fn run(source: &Formulation, config: &SolverConfig) -> grb::Result<Outcome> {
    let mut model = Model::new(&source.name)?;
    model.set_param(param::OutputFlag, i32::from(config.log_output))?;
    model.set_param(param::TimeLimit, config.time_limit.as_secs_f64())?;
    model.set_param(param::MIPGap, config.mip_gap)?;

    let objective: HashMap<Variable, f64> = source
        .objective
        .clone()
        .linear_coefficients()
        .into_iter()
        .collect();
    let mut vars = HashMap::with_capacity(source.num_vars());
    let mut ordered = Vec::with_capacity(source.num_vars());
    for column in &source.columns {
        let (vtype, ub) = match column.vtype {
            VarType::Binary => (grb::VarType::Binary, 1.0),
            VarType::Continuous => (grb::VarType::Continuous, f64::INFINITY),
        };
        let obj = objective.get(&column.var).copied().unwrap_or(0.0);
        let var = model.add_var(&column.name, vtype, obj, 0.0, ub, std::iter::empty())?;
        vars.insert(column.var, var);
        ordered.push(var);
    }
    model.set_attr(attr::ObjCon, source.objective.constant())?;
    model.set_attr(attr::ModelSense, ModelSense::Minimize)?;
    model.update()?;

    for row in &source.rows {
        let lhs: GrbExpr = row
            .lhs
            .clone()
            .linear_coefficients()
            .into_iter()
            .map(|(var, coeff)| coeff * vars[&var])
            .grb_sum();
        let rhs = row.rhs;
        let constr = match row.sense {
            Sense::Le => c!(lhs <= rhs),
            Sense::Ge => c!(lhs >= rhs),
            Sense::Eq => c!(lhs == rhs),
        };
        model.add_constr(&row.name, constr)?;
    }

    model.optimize()?;

    let status = match model.status()? {
        grb::Status::Optimal => Status::Optimal,
        grb::Status::TimeLimit => Status::TimeLimit,
        grb::Status::Infeasible | grb::Status::InfOrUnbd => Status::Infeasible,
        grb::Status::Unbounded => Status::Unbounded,
        _ => Status::NoSolution,
    };
    info!("gurobi finished with status {}", status);

    let solutions: i32 = model.get_attr(attr::SolCount)?;
    if solutions == 0 {
        let status = match status {
            Status::Optimal | Status::TimeLimit => Status::NoSolution,
            other => other,
        };
        return Ok(Outcome::without_incumbent(status));
    }

    let mut values = Vec::with_capacity(ordered.len());
    for var in &ordered {
        values.push(model.get_obj_attr(attr::X, var)?);
    }
    let objective: f64 = model.get_attr(attr::ObjVal)?;
    let is_mip: i32 = model.get_attr(attr::IsMIP)?;
    let best_bound: f64 = if is_mip == 1 {
        model.get_attr(attr::ObjBound)?
    } else {
        objective
    };

    Ok(Outcome {
        status,
        incumbent: Some(Incumbent {
            values,
            objective,
            best_bound,
            relative_gap: relative_gap(objective, best_bound),
        }),
    })
}
