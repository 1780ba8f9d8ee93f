use derive_more::Display;
use log::trace;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The type used for biomass and biofuel quantities
pub type Quantity = f64;
/// The type used for costs
pub type Cost = f64;

pub type CountyIndex = usize;
pub type HubIndex = usize;
pub type PlantIndex = usize;

/// Liters of biofuel obtained per unit of biomass
pub const DEFAULT_CONVERSION_YIELD: f64 = 232.0;
/// System-wide biofuel demand, in liters
pub const DEFAULT_DEMAND: Quantity = 1_476_310_602.0;

/// A supplier county.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct County {
    #[serde(rename = "county")]
    pub id: String,
    /// Maximum amount of biomass the county can supply
    pub supply: Quantity,
}

/// A consolidation hub between the counties and the plants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hub {
    #[serde(rename = "hub")]
    pub id: String,
    /// Throughput limit of the hub
    pub capacity: Quantity,
    /// Fixed cost of opening the hub
    pub invest: Cost,
}

/// A conversion plant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    #[serde(rename = "plant")]
    pub id: String,
    /// Output capacity of the plant. Divided by the conversion yield this gives the maximum biomass input.
    pub capacity: Quantity,
    /// Fixed cost of opening the plant
    pub invest: Cost,
}

/// A road connection from a county to a hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadArc {
    pub county: String,
    pub hub: String,
    /// Cost per unit shipped
    pub cost: Cost,
}

/// A rail connection from a hub to a plant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RailArc {
    pub hub: String,
    pub plant: String,
    /// Cost per unit shipped
    pub cost: Cost,
    /// Fixed fee paid if the arc is used at all
    pub loading: Cost,
    /// Maximum throughput of the arc
    pub capacity: Quantity,
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    #[display(fmt = "county")]
    County,
    #[display(fmt = "hub")]
    Hub,
    #[display(fmt = "plant")]
    Plant,
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ArcKind {
    #[display(fmt = "road arc")]
    Road,
    #[display(fmt = "rail arc")]
    Rail,
}

#[derive(Debug, Display, Clone, PartialEq)]
pub enum ProblemConstructionError {
    /// Two entities of the same kind share an identifier
    #[display(fmt = "duplicate {} identifier `{}`", kind, id)]
    DuplicateId { kind: EntityKind, id: String },
    /// An arc references an entity that does not exist
    #[display(fmt = "{} references unknown {} `{}`", arc, kind, id)]
    UnknownEndpoint {
        arc: ArcKind,
        kind: EntityKind,
        id: String,
    },
    /// A pair of entities has no arc record
    #[display(fmt = "no {} record for ({}, {})", arc, from, to)]
    MissingArc {
        arc: ArcKind,
        from: String,
        to: String,
    },
    /// A pair of entities has more than one arc record
    #[display(fmt = "more than one {} record for ({}, {})", arc, from, to)]
    DuplicateArc {
        arc: ArcKind,
        from: String,
        to: String,
    },
    /// The conversion yield must be strictly positive
    #[display(fmt = "conversion yield must be positive and finite, got {}", _0)]
    InvalidYield(f64),
    /// A numeric field is negative or not finite
    #[display(fmt = "invalid {} of {}: {}", field, owner, value)]
    InvalidValue {
        field: &'static str,
        owner: String,
        value: f64,
    },
}

impl std::error::Error for ProblemConstructionError {}

/// A validated instance of the siting problem.
///
/// Every (county, hub) pair has exactly one road arc and every (hub, plant) pair exactly one rail arc.
/// Serialized as the raw tables plus the two scalars, and validated again on deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawProblem", into = "RawProblem")]
pub struct Problem {
    counties: Vec<County>,
    hubs: Vec<Hub>,
    plants: Vec<Plant>,
    roads: Vec<RoadArc>,
    rails: Vec<RailArc>,
    /// `road_index[i][j]` is the position in `roads` of the arc from county i to hub j
    road_index: Vec<Vec<usize>>,
    /// `rail_index[j][k]` is the position in `rails` of the arc from hub j to plant k
    rail_index: Vec<Vec<usize>>,
    conversion_yield: f64,
    demand: Quantity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawProblem {
    counties: Vec<County>,
    hubs: Vec<Hub>,
    plants: Vec<Plant>,
    roads: Vec<RoadArc>,
    rails: Vec<RailArc>,
    conversion_yield: f64,
    demand: Quantity,
}

impl TryFrom<RawProblem> for Problem {
    type Error = ProblemConstructionError;

    fn try_from(raw: RawProblem) -> Result<Self, Self::Error> {
        Problem::new(
            raw.counties,
            raw.hubs,
            raw.plants,
            raw.roads,
            raw.rails,
            raw.conversion_yield,
            raw.demand,
        )
    }
}

impl From<Problem> for RawProblem {
    fn from(problem: Problem) -> Self {
        RawProblem {
            counties: problem.counties,
            hubs: problem.hubs,
            plants: problem.plants,
            roads: problem.roads,
            rails: problem.rails,
            conversion_yield: problem.conversion_yield,
            demand: problem.demand,
        }
    }
}

impl Problem {
    pub fn new(
        counties: Vec<County>,
        hubs: Vec<Hub>,
        plants: Vec<Plant>,
        roads: Vec<RoadArc>,
        rails: Vec<RailArc>,
        conversion_yield: f64,
        demand: Quantity,
    ) -> Result<Problem, ProblemConstructionError> {
        if !(conversion_yield.is_finite() && conversion_yield > 0.0) {
            return Err(ProblemConstructionError::InvalidYield(conversion_yield));
        }
        check_value("demand", "the system", demand)?;

        for c in &counties {
            check_value("supply", &c.id, c.supply)?;
        }
        for h in &hubs {
            check_value("capacity", &h.id, h.capacity)?;
            check_value("invest", &h.id, h.invest)?;
        }
        for p in &plants {
            check_value("capacity", &p.id, p.capacity)?;
            check_value("invest", &p.id, p.invest)?;
        }

        let county_lookup = lookup(EntityKind::County, counties.iter().map(|c| c.id.as_str()))?;
        let hub_lookup = lookup(EntityKind::Hub, hubs.iter().map(|h| h.id.as_str()))?;
        let plant_lookup = lookup(EntityKind::Plant, plants.iter().map(|p| p.id.as_str()))?;

        let mut road_slots = vec![vec![None; hubs.len()]; counties.len()];
        for (r, road) in roads.iter().enumerate() {
            let owner = format!("road arc ({}, {})", road.county, road.hub);
            check_value("cost", &owner, road.cost)?;
            let i = resolve(ArcKind::Road, EntityKind::County, &county_lookup, &road.county)?;
            let j = resolve(ArcKind::Road, EntityKind::Hub, &hub_lookup, &road.hub)?;
            if road_slots[i][j].replace(r).is_some() {
                return Err(ProblemConstructionError::DuplicateArc {
                    arc: ArcKind::Road,
                    from: road.county.clone(),
                    to: road.hub.clone(),
                });
            }
        }

        let mut rail_slots = vec![vec![None; plants.len()]; hubs.len()];
        for (r, rail) in rails.iter().enumerate() {
            let owner = format!("rail arc ({}, {})", rail.hub, rail.plant);
            check_value("cost", &owner, rail.cost)?;
            check_value("loading", &owner, rail.loading)?;
            check_value("capacity", &owner, rail.capacity)?;
            let j = resolve(ArcKind::Rail, EntityKind::Hub, &hub_lookup, &rail.hub)?;
            let k = resolve(ArcKind::Rail, EntityKind::Plant, &plant_lookup, &rail.plant)?;
            if rail_slots[j][k].replace(r).is_some() {
                return Err(ProblemConstructionError::DuplicateArc {
                    arc: ArcKind::Rail,
                    from: rail.hub.clone(),
                    to: rail.plant.clone(),
                });
            }
        }

        let road_index = complete(ArcKind::Road, road_slots, &counties, &hubs, |c| &c.id, |h| &h.id)?;
        let rail_index = complete(ArcKind::Rail, rail_slots, &hubs, &plants, |h| &h.id, |p| &p.id)?;

        trace!(
            "Validated problem with {} counties, {} hubs, {} plants",
            counties.len(),
            hubs.len(),
            plants.len()
        );

        Ok(Problem {
            counties,
            hubs,
            plants,
            roads,
            rails,
            road_index,
            rail_index,
            conversion_yield,
            demand,
        })
    }

    /// The supplier counties, in input order
    pub fn counties(&self) -> &[County] {
        &self.counties
    }

    /// The candidate hubs, in input order
    pub fn hubs(&self) -> &[Hub] {
        &self.hubs
    }

    /// The candidate plants, in input order
    pub fn plants(&self) -> &[Plant] {
        &self.plants
    }

    /// All road arcs, in input order
    pub fn roads(&self) -> &[RoadArc] {
        &self.roads
    }

    /// All rail arcs, in input order
    pub fn rails(&self) -> &[RailArc] {
        &self.rails
    }

    /// The road arc from county `i` to hub `j`
    pub fn road(&self, i: CountyIndex, j: HubIndex) -> &RoadArc {
        &self.roads[self.road_index[i][j]]
    }

    /// The rail arc from hub `j` to plant `k`
    pub fn rail(&self, j: HubIndex, k: PlantIndex) -> &RailArc {
        &self.rails[self.rail_index[j][k]]
    }

    /// Liters of biofuel per unit of biomass
    pub fn conversion_yield(&self) -> f64 {
        self.conversion_yield
    }

    /// Total demand, in liters
    pub fn demand(&self) -> Quantity {
        self.demand
    }

    /// The amount of biomass needed to cover the demand
    pub fn required_biomass(&self) -> Quantity {
        self.demand / self.conversion_yield
    }

    /// Parses a problem from its JSON representation.
    pub fn from_json(string: &str) -> serde_json::Result<Problem> {
        serde_json::from_str(string)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn check_value(field: &'static str, owner: &str, value: f64) -> Result<(), ProblemConstructionError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ProblemConstructionError::InvalidValue {
            field,
            owner: owner.to_string(),
            value,
        })
    }
}

fn resolve(
    arc: ArcKind,
    kind: EntityKind,
    table: &HashMap<&str, usize>,
    id: &str,
) -> Result<usize, ProblemConstructionError> {
    table
        .get(id)
        .copied()
        .ok_or_else(|| ProblemConstructionError::UnknownEndpoint {
            arc,
            kind,
            id: id.to_string(),
        })
}

fn lookup<'a>(
    kind: EntityKind,
    ids: impl Iterator<Item = &'a str>,
) -> Result<HashMap<&'a str, usize>, ProblemConstructionError> {
    let mut table = HashMap::new();
    for (index, id) in ids.enumerate() {
        if table.insert(id, index).is_some() {
            return Err(ProblemConstructionError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(table)
}

/// Turns the partially filled arc slots into a dense index, failing on the first gap.
fn complete<A, B>(
    arc: ArcKind,
    slots: Vec<Vec<Option<usize>>>,
    from: &[A],
    to: &[B],
    from_id: impl Fn(&A) -> &String,
    to_id: impl Fn(&B) -> &String,
) -> Result<Vec<Vec<usize>>, ProblemConstructionError> {
    slots
        .into_iter()
        .enumerate()
        .map(|(a, row)| {
            row.into_iter()
                .enumerate()
                .map(|(b, slot)| {
                    slot.ok_or_else(|| ProblemConstructionError::MissingArc {
                        arc,
                        from: from_id(&from[a]).clone(),
                        to: to_id(&to[b]).clone(),
                    })
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn county(id: &str, supply: f64) -> County {
        County {
            id: id.to_string(),
            supply,
        }
    }

    fn hub(id: &str) -> Hub {
        Hub {
            id: id.to_string(),
            capacity: 10.0,
            invest: 5.0,
        }
    }

    fn plant(id: &str) -> Plant {
        Plant {
            id: id.to_string(),
            capacity: 2320.0,
            invest: 7.0,
        }
    }

    fn road(county: &str, hub: &str, cost: f64) -> RoadArc {
        RoadArc {
            county: county.to_string(),
            hub: hub.to_string(),
            cost,
        }
    }

    fn rail(hub: &str, plant: &str) -> RailArc {
        RailArc {
            hub: hub.to_string(),
            plant: plant.to_string(),
            cost: 1.0,
            loading: 2.0,
            capacity: 10.0,
        }
    }

    fn build(roads: Vec<RoadArc>, rails: Vec<RailArc>) -> Result<Problem, ProblemConstructionError> {
        Problem::new(
            vec![county("Anderson", 4.0), county("Bexar", 6.0)],
            vec![hub("1"), hub("2")],
            vec![plant("10")],
            roads,
            rails,
            232.0,
            2320.0,
        )
    }

    fn all_roads() -> Vec<RoadArc> {
        vec![
            road("Bexar", "2", 4.0),
            road("Anderson", "1", 1.0),
            road("Anderson", "2", 2.0),
            road("Bexar", "1", 3.0),
        ]
    }

    #[test]
    fn arcs_are_indexed_by_entity_position() {
        let problem = build(all_roads(), vec![rail("1", "10"), rail("2", "10")]).unwrap();
        assert_eq!(problem.road(0, 0).cost, 1.0);
        assert_eq!(problem.road(0, 1).cost, 2.0);
        assert_eq!(problem.road(1, 0).cost, 3.0);
        assert_eq!(problem.road(1, 1).cost, 4.0);
        assert_eq!(problem.rail(1, 0).hub, "2");
        assert_eq!(problem.required_biomass(), 10.0);
    }

    #[test]
    fn missing_road_arc_is_rejected() {
        let mut roads = all_roads();
        roads.remove(0);
        let err = build(roads, vec![rail("1", "10"), rail("2", "10")]).unwrap_err();
        assert_eq!(
            err,
            ProblemConstructionError::MissingArc {
                arc: ArcKind::Road,
                from: "Bexar".to_string(),
                to: "2".to_string(),
            }
        );
    }

    #[test]
    fn duplicate_rail_arc_is_rejected() {
        let err = build(
            all_roads(),
            vec![rail("1", "10"), rail("2", "10"), rail("1", "10")],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ProblemConstructionError::DuplicateArc {
                arc: ArcKind::Rail,
                ..
            }
        ));
    }

    #[test]
    fn unknown_endpoint_is_rejected() {
        let mut roads = all_roads();
        roads.push(road("Travis", "1", 1.0));
        let err = build(roads, vec![rail("1", "10"), rail("2", "10")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "road arc references unknown county `Travis`"
        );
    }

    #[test]
    fn duplicate_ids_and_bad_scalars_are_rejected() {
        let err = Problem::new(
            vec![county("Anderson", 1.0), county("Anderson", 2.0)],
            vec![],
            vec![],
            vec![],
            vec![],
            232.0,
            0.0,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ProblemConstructionError::DuplicateId {
                kind: EntityKind::County,
                ..
            }
        ));

        let err = Problem::new(vec![], vec![], vec![], vec![], vec![], 0.0, 1.0).unwrap_err();
        assert_eq!(err, ProblemConstructionError::InvalidYield(0.0));

        let err =
            Problem::new(vec![county("A", -1.0)], vec![], vec![], vec![], vec![], 232.0, 1.0)
                .unwrap_err();
        assert!(matches!(
            err,
            ProblemConstructionError::InvalidValue {
                field: "supply",
                ..
            }
        ));
    }

    #[test]
    fn json_representation_is_validated() {
        let problem = build(all_roads(), vec![rail("1", "10"), rail("2", "10")]).unwrap();
        let json = problem.to_json().unwrap();
        let parsed = Problem::from_json(&json).unwrap();
        assert_eq!(parsed.roads(), problem.roads());
        assert_eq!(parsed.road(1, 1).cost, 4.0);

        let broken = json.replacen("\"Bexar\"", "\"Travis\"", 1);
        assert!(Problem::from_json(&broken).is_err());
    }
}
