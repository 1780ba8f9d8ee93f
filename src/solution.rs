use derive_more::Display;
use float_ord::FloatOrd;
use itertools::{iproduct, Itertools};

use crate::models::milp::Formulation;
use crate::models::siting::{Parameters, Sets, Variables};
use crate::models::utils::ConvertVars;
use crate::problem::{HubIndex, PlantIndex};
use crate::solver::{Incumbent, SolveError, Status};

/// A solution of the siting model with every variable group laid out like the model's variables.
#[derive(Debug, Clone, PartialEq)]
pub struct SitingSolution {
    pub status: Status,
    /// biomass shipped from county i to hub j
    pub q: Vec<Vec<f64>>,
    /// biomass shipped from hub j to plant k
    pub l: Vec<Vec<f64>>,
    pub h: Vec<f64>,
    pub p: Vec<f64>,
    pub y: Vec<Vec<f64>>,
    pub tp: f64,
    pub objective: f64,
    pub best_bound: f64,
    pub relative_gap: f64,
}

/// The objective split into its cost components
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CostBreakdown {
    pub road: f64,
    pub rail: f64,
    pub loading: f64,
    pub hub_investment: f64,
    pub plant_investment: f64,
    pub third_party: f64,
}

impl CostBreakdown {
    pub fn total(&self) -> f64 {
        self.road
            + self.rail
            + self.loading
            + self.hub_investment
            + self.plant_investment
            + self.third_party
    }
}

/// A structural property of the siting model that a solution fails to satisfy.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum Violation {
    #[display(fmt = "county {} ships {} but supplies {}", county, shipped, supply)]
    Supply {
        county: usize,
        shipped: f64,
        supply: f64,
    },
    #[display(fmt = "hub {} is closed but handles {}", hub, flow)]
    ClosedHub { hub: HubIndex, flow: f64 },
    #[display(fmt = "hub {} receives {} but has capacity {}", hub, inflow, capacity)]
    HubCapacity {
        hub: HubIndex,
        inflow: f64,
        capacity: f64,
    },
    #[display(fmt = "hub {} receives {} but sends {}", hub, inflow, outflow)]
    Conservation {
        hub: HubIndex,
        inflow: f64,
        outflow: f64,
    },
    #[display(fmt = "plant {} receives {} but accepts at most {}", plant, inflow, capacity)]
    PlantCapacity {
        plant: PlantIndex,
        inflow: f64,
        capacity: f64,
    },
    #[display(fmt = "plant {} is closed but has {} rail arcs in use", plant, arcs)]
    ClosedPlant { plant: PlantIndex, arcs: f64 },
    #[display(fmt = "rail arc ({}, {}) carries {} but is unused", hub, plant, flow)]
    UnusedArc {
        hub: HubIndex,
        plant: PlantIndex,
        flow: f64,
    },
    #[display(fmt = "rail arc ({}, {}) carries {} but has capacity {}", hub, plant, flow, capacity)]
    RailCapacity {
        hub: HubIndex,
        plant: PlantIndex,
        flow: f64,
        capacity: f64,
    },
    #[display(fmt = "{} is delivered or bought, but {} is required", covered, required)]
    Demand { covered: f64, required: f64 },
}

impl SitingSolution {
    pub fn new(
        formulation: &Formulation,
        variables: &Variables,
        status: Status,
        incumbent: &Incumbent,
    ) -> Result<SitingSolution, SolveError> {
        if incumbent.values.len() != formulation.num_vars() {
            return Err(SolveError::SizeMismatch {
                expected: formulation.num_vars(),
                actual: incumbent.values.len(),
            });
        }
        let assignment = formulation.assignment(&incumbent.values);

        Ok(SitingSolution {
            status,
            q: variables.q.convert(&assignment),
            l: variables.l.convert(&assignment),
            h: variables.h.convert(&assignment),
            p: variables.p.convert(&assignment),
            y: variables.y.convert(&assignment),
            tp: variables.tp.convert(&assignment),
            objective: incumbent.objective,
            best_bound: incumbent.best_bound,
            relative_gap: incumbent.relative_gap,
        })
    }

    /// Total flow into hub `j`
    pub fn hub_inflow(&self, j: HubIndex) -> f64 {
        self.q.iter().map(|row| row[j]).sum()
    }

    /// Total flow out of hub `j`
    pub fn hub_outflow(&self, j: HubIndex) -> f64 {
        self.l[j].iter().sum()
    }

    /// Total biomass received by plant `k`
    pub fn plant_inflow(&self, k: PlantIndex) -> f64 {
        self.l.iter().map(|row| row[k]).sum()
    }

    /// Biomass delivered to the plants by the network
    pub fn delivered(&self) -> f64 {
        self.l.iter().flatten().sum()
    }

    /// Opened hubs, busiest first
    pub fn open_hubs(&self) -> Vec<HubIndex> {
        (0..self.h.len())
            .filter(|j| self.h[*j] > 0.5)
            .sorted_by_key(|j| std::cmp::Reverse(FloatOrd(self.hub_inflow(*j))))
            .collect()
    }

    /// Opened plants, busiest first
    pub fn open_plants(&self) -> Vec<PlantIndex> {
        (0..self.p.len())
            .filter(|k| self.p[*k] > 0.5)
            .sorted_by_key(|k| std::cmp::Reverse(FloatOrd(self.plant_inflow(*k))))
            .collect()
    }

    #[allow(non_snake_case)]
    pub fn costs(&self, sets: &Sets, parameters: &Parameters) -> CostBreakdown {
        let (I, J, K) = (&sets.I, &sets.J, &sets.K);
        CostBreakdown {
            road: iproduct!(I, J)
                .map(|(i, j)| parameters.C_road[*i][*j] * self.q[*i][*j])
                .sum(),
            rail: iproduct!(J, K)
                .map(|(j, k)| parameters.C_rail[*j][*k] * self.l[*j][*k])
                .sum(),
            loading: iproduct!(J, K)
                .map(|(j, k)| parameters.C_loading[*j][*k] * self.y[*j][*k])
                .sum(),
            hub_investment: J.iter().map(|j| parameters.F_hub[*j] * self.h[*j]).sum(),
            plant_investment: K.iter().map(|k| parameters.F_plant[*k] * self.p[*k]).sum(),
            third_party: parameters.C_third_party * self.tp,
        }
    }

    /// Every structural property the solution violates by more than `tolerance`, scaled by the
    /// magnitude of the quantities compared.
    #[allow(non_snake_case)]
    pub fn audit(&self, sets: &Sets, parameters: &Parameters, tolerance: f64) -> Vec<Violation> {
        let exceeds = |lhs: f64, rhs: f64| lhs - rhs > tolerance * (1.0 + rhs.abs());
        let (I, J, K) = (&sets.I, &sets.J, &sets.K);
        let mut violations = Vec::new();

        for i in I {
            let shipped: f64 = self.q[*i].iter().sum();
            if exceeds(shipped, parameters.S[*i]) {
                violations.push(Violation::Supply {
                    county: *i,
                    shipped,
                    supply: parameters.S[*i],
                });
            }
        }

        for j in J {
            let inflow = self.hub_inflow(*j);
            let outflow = self.hub_outflow(*j);
            if self.h[*j] < 0.5 && (exceeds(inflow, 0.0) || exceeds(outflow, 0.0)) {
                violations.push(Violation::ClosedHub {
                    hub: *j,
                    flow: inflow.max(outflow),
                });
            }
            if exceeds(inflow, parameters.U_hub[*j]) {
                violations.push(Violation::HubCapacity {
                    hub: *j,
                    inflow,
                    capacity: parameters.U_hub[*j],
                });
            }
            if exceeds(inflow, outflow) || exceeds(outflow, inflow) {
                violations.push(Violation::Conservation {
                    hub: *j,
                    inflow,
                    outflow,
                });
            }
        }

        for k in K {
            let inflow = self.plant_inflow(*k);
            if exceeds(inflow, parameters.U_plant[*k]) {
                violations.push(Violation::PlantCapacity {
                    plant: *k,
                    inflow,
                    capacity: parameters.U_plant[*k],
                });
            }
            let arcs: f64 = J.iter().map(|j| self.y[*j][*k]).sum();
            if self.p[*k] < 0.5 && exceeds(arcs, 0.0) {
                violations.push(Violation::ClosedPlant { plant: *k, arcs });
            }
        }

        for (j, k) in iproduct!(J, K) {
            let flow = self.l[*j][*k];
            if self.y[*j][*k] < 0.5 && exceeds(flow, 0.0) {
                violations.push(Violation::UnusedArc {
                    hub: *j,
                    plant: *k,
                    flow,
                });
            }
            if exceeds(flow, parameters.U_rail[*j][*k]) {
                violations.push(Violation::RailCapacity {
                    hub: *j,
                    plant: *k,
                    flow,
                    capacity: parameters.U_rail[*j][*k],
                });
            }
        }

        let covered = self.delivered() + self.tp;
        if exceeds(parameters.D, covered) {
            violations.push(Violation::Demand {
                covered,
                required: parameters.D,
            });
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sets() -> Sets {
        Sets {
            I: vec![0],
            J: vec![0, 1],
            K: vec![0],
        }
    }

    fn parameters() -> Parameters {
        Parameters {
            S: vec![100.0],
            U_hub: vec![100.0, 100.0],
            F_hub: vec![10.0, 20.0],
            U_plant: vec![100.0],
            F_plant: vec![30.0],
            C_road: vec![vec![1.0, 2.0]],
            C_rail: vec![vec![1.0], vec![3.0]],
            C_loading: vec![vec![5.0], vec![7.0]],
            U_rail: vec![vec![100.0], vec![100.0]],
            D: 100.0,
            C_third_party: 4.0,
            M_plant: 2.0,
            M_hub: 1.0,
        }
    }

    fn solution() -> SitingSolution {
        SitingSolution {
            status: Status::Optimal,
            q: vec![vec![60.0, 0.0]],
            l: vec![vec![60.0], vec![0.0]],
            h: vec![1.0, 0.0],
            p: vec![1.0],
            y: vec![vec![1.0], vec![0.0]],
            tp: 40.0,
            objective: 325.0,
            best_bound: 325.0,
            relative_gap: 0.0,
        }
    }

    #[test]
    fn cost_breakdown_adds_up_to_the_objective() {
        let costs = solution().costs(&sets(), &parameters());
        assert_eq!(costs.road, 60.0);
        assert_eq!(costs.rail, 60.0);
        assert_eq!(costs.loading, 5.0);
        assert_eq!(costs.hub_investment, 10.0);
        assert_eq!(costs.plant_investment, 30.0);
        assert_eq!(costs.third_party, 160.0);
        assert_eq!(costs.total(), 325.0);
    }

    #[test]
    fn a_consistent_solution_passes_the_audit() {
        let solution = solution();
        assert!(solution.audit(&sets(), &parameters(), 1e-6).is_empty());
        assert_eq!(solution.open_hubs(), vec![0]);
        assert_eq!(solution.open_plants(), vec![0]);
    }

    #[test]
    fn audit_finds_flow_through_closed_facilities() {
        let mut solution = solution();
        solution.q[0][1] = 10.0;
        solution.l[1][0] = 10.0;
        solution.tp = 30.0;

        let violations = solution.audit(&sets(), &parameters(), 1e-6);
        assert_eq!(
            violations,
            vec![
                Violation::ClosedHub {
                    hub: 1,
                    flow: 10.0
                },
                Violation::UnusedArc {
                    hub: 1,
                    plant: 0,
                    flow: 10.0
                },
            ]
        );
    }

    #[test]
    fn audit_finds_broken_conservation_and_demand() {
        let mut solution = solution();
        solution.l[0][0] = 50.0;
        solution.p[0] = 0.0;

        let violations = solution.audit(&sets(), &parameters(), 1e-6);
        assert!(violations.contains(&Violation::Conservation {
            hub: 0,
            inflow: 60.0,
            outflow: 50.0
        }));
        assert!(violations.contains(&Violation::ClosedPlant { plant: 0, arcs: 1.0 }));
        assert!(violations.contains(&Violation::Demand {
            covered: 90.0,
            required: 100.0
        }));
        assert_eq!(violations.len(), 3);
    }
}
