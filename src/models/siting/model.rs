use super::sets_and_parameters::{Parameters, Sets};
use crate::models::milp::{Formulation, MilpModel, Sense, VarType};
use crate::models::utils::AddVars;
use crate::problem::Problem;
use crate::solution::SitingSolution;
use crate::solver::{Backend, Outcome, SolveError, SolverConfig};
use derive_more::Constructor;
use good_lp::{Expression, Variable};
use itertools::iproduct;
use log::info;

#[derive(Debug, Clone, Constructor)]
pub struct Variables {
    /// biomass shipped from county i to hub j
    pub q: Vec<Vec<Variable>>,
    /// biomass shipped from hub j to plant k
    pub l: Vec<Vec<Variable>>,
    /// 1 if hub j is opened
    pub h: Vec<Variable>,
    /// 1 if plant k is opened
    pub p: Vec<Variable>,
    /// 1 if the rail arc from hub j to plant k is used
    pub y: Vec<Vec<Variable>>,
    /// biomass-equivalent bought from a third party
    pub tp: Variable,
}

pub struct SitingSolver {}

#[allow(non_snake_case)]
impl SitingSolver {
    /// builds the siting model
    pub fn build(
        problem: &Problem,
        sets: &Sets,
        parameters: &Parameters,
    ) -> (MilpModel, Variables) {
        info!(
            "Building siting model for {} counties, {} hubs and {} plants",
            sets.I.len(),
            sets.J.len(),
            sets.K.len()
        );

        let mut model = MilpModel::new("BioethanolSupplyChain");

        let counties: Vec<&str> = problem.counties().iter().map(|c| c.id.as_str()).collect();
        let hubs: Vec<&str> = problem.hubs().iter().map(|h| h.id.as_str()).collect();
        let plants: Vec<&str> = problem.plants().iter().map(|p| p.id.as_str()).collect();

        //*************CREATE VARIABLES*************//

        let q = (&counties[..], &hubs[..]).cont(&mut model, "Q");
        let l = (&hubs[..], &plants[..]).cont(&mut model, "L");
        let h = hubs.binary(&mut model, "H");
        let p = plants.binary(&mut model, "P");
        let y = (&hubs[..], &plants[..]).binary(&mut model, "Y");
        let tp = model.add_var("TP", VarType::Continuous);

        let I = &sets.I;
        let J = &sets.J;
        let K = &sets.K;

        // ******************** OBJECTIVE ********************
        let road_costs: Expression = iproduct!(I, J)
            .map(|(i, j)| parameters.C_road[*i][*j] * q[*i][*j])
            .sum();
        let rail_costs: Expression = iproduct!(J, K)
            .map(|(j, k)| {
                parameters.C_rail[*j][*k] * l[*j][*k] + parameters.C_loading[*j][*k] * y[*j][*k]
            })
            .sum();
        let hub_investments: Expression = J.iter().map(|j| parameters.F_hub[*j] * h[*j]).sum();
        let plant_investments: Expression =
            K.iter().map(|k| parameters.F_plant[*k] * p[*k]).sum();
        let third_party = parameters.C_third_party * tp;

        model.set_objective(
            road_costs + rail_costs + hub_investments + plant_investments + third_party,
        );

        // ******************** ADD CONSTRAINTS ********************

        // a county cannot ship more than it supplies
        for i in I {
            let lhs: Expression = J.iter().map(|j| q[*i][*j]).sum();
            model.add_row(
                format!("supply_{}", counties[*i]),
                lhs,
                Sense::Le,
                parameters.S[*i],
            );
        }

        for j in J {
            let inflow = || I.iter().map(|i| q[*i][*j]).sum::<Expression>();
            let outflow: Expression = K.iter().map(|k| l[*j][*k]).sum();

            // only open hubs can receive biomass
            model.add_row(
                format!("hub_capacity_{}", hubs[*j]),
                inflow() - parameters.U_hub[*j] * h[*j],
                Sense::Le,
                0.0,
            );
            // everything entering a hub leaves it again
            model.add_row(
                format!("flow_conservation_{}", hubs[*j]),
                inflow() - outflow,
                Sense::Eq,
                0.0,
            );
        }

        // a plant cannot convert more than its capacity
        for k in K {
            let lhs: Expression = J.iter().map(|j| l[*j][*k]).sum();
            model.add_row(
                format!("plant_capacity_{}", plants[*k]),
                lhs,
                Sense::Le,
                parameters.U_plant[*k],
            );
        }

        // only used rail arcs can carry biomass
        for (j, k) in iproduct!(J, K) {
            model.add_row(
                format!("rail_capacity_{}_{}", hubs[*j], plants[*k]),
                l[*j][*k] - parameters.U_rail[*j][*k] * y[*j][*k],
                Sense::Le,
                0.0,
            );
        }

        // the demand is met by the network or by the third party
        let delivered: Expression = iproduct!(J, K).map(|(j, k)| l[*j][*k]).sum();
        model.add_row("demand".to_string(), delivered + tp, Sense::Ge, parameters.D);

        // rail arcs may only enter open plants
        for k in K {
            let arcs: Expression = J.iter().map(|j| y[*j][*k]).sum();
            model.add_row(
                format!("plant_arcs_{}", plants[*k]),
                arcs - parameters.M_plant * p[*k],
                Sense::Le,
                0.0,
            );
        }

        // rail arcs may only leave open hubs
        for j in J {
            let arcs: Expression = K.iter().map(|k| y[*j][*k]).sum();
            model.add_row(
                format!("hub_arcs_{}", hubs[*j]),
                arcs - parameters.M_hub * h[*j],
                Sense::Le,
                0.0,
            );
        }

        let formulation = model.formulation();
        info!(
            "Successfully built siting model with {} variables ({} binary) and {} constraints",
            formulation.num_vars(),
            formulation.num_binaries(),
            formulation.num_rows()
        );

        (model, Variables::new(q, l, h, p, y, tp))
    }

    /// Builds the model for one third-party price and hands it to `backend`
    pub fn solve(
        problem: &Problem,
        third_party_price: f64,
        backend: &dyn Backend,
        config: &SolverConfig,
    ) -> Result<SitingResult, SolveError> {
        let sets = Sets::new(problem);
        let parameters = Parameters::new(problem, &sets, third_party_price);
        let (model, variables) = SitingSolver::build(problem, &sets, &parameters);
        let (lp_vars, formulation) = model.into_parts();

        info!(
            "Solving with {} at third-party price {}",
            backend.name(),
            third_party_price
        );
        let outcome = backend.solve(lp_vars, &formulation, config)?;
        info!("Solver finished: {}", outcome.status);

        Ok(SitingResult {
            sets,
            parameters,
            formulation,
            variables,
            outcome,
        })
    }
}

/// Everything produced by a single build and solve
#[derive(Debug)]
pub struct SitingResult {
    pub sets: Sets,
    pub parameters: Parameters,
    pub formulation: Formulation,
    pub variables: Variables,
    pub outcome: Outcome,
}

impl SitingResult {
    /// The typed solution, if the solver found one
    pub fn solution(&self) -> Result<Option<SitingSolution>, SolveError> {
        match &self.outcome.incumbent {
            Some(incumbent) => Ok(Some(SitingSolution::new(
                &self.formulation,
                &self.variables,
                self.outcome.status,
                incumbent,
            )?)),
            None => Ok(None),
        }
    }
}
