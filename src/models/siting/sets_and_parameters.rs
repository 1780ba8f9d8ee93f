use crate::problem::{CountyIndex, HubIndex, PlantIndex, Problem, RailArc};
use log::trace;

/// sets for the siting model
#[derive(Debug)]
#[allow(non_snake_case)]
pub struct Sets {
    /// Set of supplier counties
    pub I: Vec<CountyIndex>,
    /// Set of candidate hubs
    pub J: Vec<HubIndex>,
    /// Set of candidate plants
    pub K: Vec<PlantIndex>,
}

/// parameters for the siting model
#[derive(Debug)]
#[allow(non_snake_case)]
pub struct Parameters {
    /// biomass available at county i
    pub S: Vec<f64>,
    /// throughput capacity of hub j
    pub U_hub: Vec<f64>,
    /// fixed cost of opening hub j
    pub F_hub: Vec<f64>,
    /// maximum biomass input of plant k, i.e. its output capacity divided by the conversion yield
    pub U_plant: Vec<f64>,
    /// fixed cost of opening plant k
    pub F_plant: Vec<f64>,
    /// unit road cost from county i to hub j
    pub C_road: Vec<Vec<f64>>,
    /// unit rail cost from hub j to plant k
    pub C_rail: Vec<Vec<f64>>,
    /// fixed loading fee for using the rail arc from hub j to plant k
    pub C_loading: Vec<Vec<f64>>,
    /// capacity of the rail arc from hub j to plant k
    pub U_rail: Vec<Vec<f64>>,
    /// biomass needed to cover the demand
    pub D: f64,
    /// unit price of biomass-equivalent bought from a third party
    pub C_third_party: f64,
    /// upper bound on the number of rail arcs entering a plant
    pub M_plant: f64,
    /// upper bound on the number of rail arcs leaving a hub
    pub M_hub: f64,
}

#[allow(non_snake_case)]
impl Sets {
    pub fn new(problem: &Problem) -> Sets {
        Sets {
            I: (0..problem.counties().len()).collect(),
            J: (0..problem.hubs().len()).collect(),
            K: (0..problem.plants().len()).collect(),
        }
    }
}

#[allow(non_snake_case)]
impl Parameters {
    pub fn new(problem: &Problem, sets: &Sets, third_party_price: f64) -> Parameters {
        let yield_ = problem.conversion_yield();

        let S = sets.I.iter().map(|i| problem.counties()[*i].supply).collect();
        let U_hub = sets.J.iter().map(|j| problem.hubs()[*j].capacity).collect();
        let F_hub = sets.J.iter().map(|j| problem.hubs()[*j].invest).collect();
        let U_plant = sets
            .K
            .iter()
            .map(|k| problem.plants()[*k].capacity / yield_)
            .collect();
        let F_plant = sets.K.iter().map(|k| problem.plants()[*k].invest).collect();

        let C_road = sets
            .I
            .iter()
            .map(|i| sets.J.iter().map(|j| problem.road(*i, *j).cost).collect())
            .collect();

        let rail = |f: fn(&RailArc) -> f64| -> Vec<Vec<f64>> {
            sets.J
                .iter()
                .map(|j| sets.K.iter().map(|k| f(problem.rail(*j, *k))).collect())
                .collect()
        };
        let C_rail = rail(|r| r.cost);
        let C_loading = rail(|r| r.loading);
        let U_rail = rail(|r| r.capacity);

        // every hub can reach every plant, so the arc counts are bounded by the set sizes
        let M_plant = sets.J.len() as f64;
        let M_hub = sets.K.len() as f64;
        trace!("big-M for plant in-arcs: {}, hub out-arcs: {}", M_plant, M_hub);

        Parameters {
            S,
            U_hub,
            F_hub,
            U_plant,
            F_plant,
            C_road,
            C_rail,
            C_loading,
            U_rail,
            D: problem.required_biomass(),
            C_third_party: third_party_price,
            M_plant,
            M_hub,
        }
    }
}
