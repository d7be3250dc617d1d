//! Compound actions - the staged decoder from flat vectors to commands
//!
//! A command is assembled over several ticks: pick workers, then a
//! coordinate or a building, then (for buildings) a coordinate. Each stage
//! declares which components it accepts; masks and gate openers are derived
//! from that declaration over one fixed-width input encoding, so a policy
//! with a constant action head works at every stage.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::actions::component::{
    ActionComponent, ActionDims, Component, WORKER_CHOOSE, WORKER_NOOP, WORKER_SKIP,
};
use crate::core::types::Coord;
use crate::world::assignment::Assignment;
use crate::world::building::{Building, Cost, Dependencies};
use crate::world::objects::{Resource, Worker};
use crate::world::state::{Positions, WorldState};

/// Stage tag without the accumulated selections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    NoWorkers,
    Workers,
    Coord,
    Building,
    BuildingCoord,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::NoWorkers,
        Stage::Workers,
        Stage::Coord,
        Stage::Building,
        Stage::BuildingCoord,
    ];

    /// Which components this stage accepts
    pub fn capabilities(&self) -> Capabilities {
        match self {
            Stage::NoWorkers | Stage::Coord | Stage::BuildingCoord => Capabilities {
                worker: true,
                coord: false,
                building: false,
            },
            Stage::Workers => Capabilities {
                worker: false,
                coord: true,
                building: true,
            },
            Stage::Building => Capabilities {
                worker: false,
                coord: true,
                building: false,
            },
        }
    }
}

/// Component activity flags for one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub worker: bool,
    pub coord: bool,
    pub building: bool,
}

impl Capabilities {
    pub fn target(&self) -> bool {
        self.coord || self.building
    }
}

/// Rules a selection must satisfy beyond the mask
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRules {
    pub dependencies: Dependencies,
    /// Reject buildings the stockpile cannot pay for
    pub enforce_costs: bool,
}

/// Why a legal-by-mask selection is still refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum Invalid {
    #[error("{building} requires a completed {prerequisite}")]
    DependencyUnmet {
        building: Building,
        prerequisite: Building,
    },

    #[error("{building} is short {shortfall}")]
    InsufficientResources { building: Building, shortfall: Cost },

    #[error("{coord} is already occupied by a {occupant}")]
    Occupied { coord: Coord, occupant: Building },

    #[error("an Assimilator must sit on the gas tile, not {coord}")]
    AssimilatorOffGas { coord: Coord },

    #[error("{building} cannot be placed on the {resource} tile at {coord}")]
    OnResource {
        building: Building,
        resource: Resource,
        coord: Coord,
    },
}

/// Live node of the action decoder, carrying accumulated selections
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompoundAction {
    /// Initial stage: nothing selected
    #[default]
    NoWorkers,
    Workers {
        workers: Vec<Worker>,
    },
    /// Terminal: move or harvest
    Coord {
        workers: Vec<Worker>,
        coord: Coord,
    },
    Building {
        workers: Vec<Worker>,
        building: Building,
    },
    /// Terminal: build order
    BuildingCoord {
        workers: Vec<Worker>,
        building: Building,
        coord: Coord,
    },
}

impl CompoundAction {
    pub fn initial() -> Self {
        CompoundAction::NoWorkers
    }

    pub fn stage(&self) -> Stage {
        match self {
            CompoundAction::NoWorkers => Stage::NoWorkers,
            CompoundAction::Workers { .. } => Stage::Workers,
            CompoundAction::Coord { .. } => Stage::Coord,
            CompoundAction::Building { .. } => Stage::Building,
            CompoundAction::BuildingCoord { .. } => Stage::BuildingCoord,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.stage().capabilities()
    }

    pub fn workers(&self) -> &[Worker] {
        match self {
            CompoundAction::NoWorkers => &[],
            CompoundAction::Workers { workers }
            | CompoundAction::Coord { workers, .. }
            | CompoundAction::Building { workers, .. }
            | CompoundAction::BuildingCoord { workers, .. } => workers,
        }
    }

    pub fn building(&self) -> Option<Building> {
        match self {
            CompoundAction::Building { building, .. }
            | CompoundAction::BuildingCoord { building, .. } => Some(*building),
            _ => None,
        }
    }

    pub fn coord(&self) -> Option<Coord> {
        match self {
            CompoundAction::Coord { coord, .. } | CompoundAction::BuildingCoord { coord, .. } => {
                Some(*coord)
            }
            _ => None,
        }
    }

    /// Multi-discrete sizes of the input vector, identical for every stage
    pub fn input_space(dims: &ActionDims) -> Vec<usize> {
        vec![dims.row_width(); dims.rows()]
    }

    /// Sizes of the partial-action representation: `[2]*N ++ [B, W²]`
    pub fn representation_space(dims: &ActionDims) -> Vec<usize> {
        let mut sizes = vec![2; dims.num_workers];
        sizes.push(dims.building_space());
        sizes.push(dims.coord_space());
        sizes
    }

    /// Every legal code, row by row
    pub fn permitted_values(&self, dims: &ActionDims) -> Vec<Vec<usize>> {
        let caps = self.capabilities();
        let worker_row = if caps.worker {
            vec![WORKER_SKIP, WORKER_CHOOSE]
        } else {
            vec![WORKER_NOOP]
        };
        let mut rows = vec![worker_row; dims.num_workers];

        let coords = dims.coord_space();
        let mut target = Vec::new();
        if caps.coord {
            target.extend(1..=coords);
        }
        if caps.building {
            target.extend(coords + 1..=coords + dims.building_space());
        }
        if !caps.target() {
            target.push(0);
        }
        rows.push(target);
        rows
    }

    /// `[rows, width]` with `true` marking codes that must be masked
    ///
    /// Padding beyond a row's natural width is always masked.
    pub fn mask(&self, dims: &ActionDims) -> Vec<Vec<bool>> {
        self.permitted_values(dims)
            .into_iter()
            .map(|permitted| {
                let mut row = vec![true; dims.row_width()];
                for code in permitted {
                    row[code] = false;
                }
                row
            })
            .collect()
    }

    /// Full input vectors that also open the external gate
    ///
    /// Worker stages open it by selecting nobody; target stages by any
    /// coordinate.
    pub fn gate_openers(&self, dims: &ActionDims) -> Vec<Vec<usize>> {
        if self.capabilities().worker {
            let mut opener = vec![WORKER_SKIP; dims.num_workers];
            opener.push(0);
            vec![opener]
        } else {
            (0..dims.coord_space())
                .map(|code| {
                    let mut opener = vec![WORKER_NOOP; dims.num_workers];
                    opener.push(1 + code);
                    opener
                })
                .collect()
        }
    }

    /// Partial-action representation: worker bits, building code, coord code
    pub fn to_ints(&self, dims: &ActionDims) -> Vec<usize> {
        let selected = self.workers();
        let mut ints: Vec<usize> = Worker::all(dims.num_workers)
            .map(|w| usize::from(selected.contains(&w)))
            .collect();
        ints.push(self.building().map_or(0, |b| b.to_int(dims)));
        ints.push(self.coord().map_or(0, |c| c.to_int(dims)));
        ints
    }

    /// Encode components as the input vector this stage would decode
    pub fn encode(&self, components: &[Component], dims: &ActionDims) -> Vec<usize> {
        let caps = self.capabilities();
        let mut ints = vec![
            if caps.worker { WORKER_SKIP } else { WORKER_NOOP };
            dims.num_workers
        ];
        let mut target = 0;
        for component in components {
            match component {
                Component::Worker(w) => ints[w.to_int(dims)] = WORKER_CHOOSE,
                Component::Coord(c) => target = 1 + c.to_int(dims),
                Component::Building(b) => target = 1 + dims.coord_space() + b.to_int(dims),
            }
        }
        ints.push(target);
        ints
    }

    /// Decode an input vector and advance
    ///
    /// Codes for components this stage does not accept are ignored.
    /// Panics if `ints` does not have one entry per row.
    pub fn update_from_ints(&self, ints: &[usize], dims: &ActionDims) -> CompoundAction {
        assert_eq!(
            ints.len(),
            dims.rows(),
            "action vector must have one entry per worker plus the target"
        );
        let caps = self.capabilities();
        let (worker_codes, target) = ints.split_at(dims.num_workers);
        let mut components = Vec::new();
        if caps.worker {
            components.extend(
                worker_codes
                    .iter()
                    .enumerate()
                    .filter(|(_, code)| **code == WORKER_CHOOSE)
                    .map(|(i, _)| Component::Worker(Worker(i))),
            );
        }
        if let Some(code) = target[0].checked_sub(1) {
            if caps.coord && code < dims.coord_space() {
                components.extend(Coord::parse(code, dims).ok().map(Component::Coord));
            } else if let Some(code) = code.checked_sub(dims.coord_space()) {
                if caps.building {
                    components.extend(Building::parse(code, dims).ok().map(Component::Building));
                }
            }
        }
        self.update(&components)
    }

    /// Advance with decoded components
    ///
    /// Panics on a component the stage does not accept, or on both a
    /// coordinate and a building at once.
    pub fn update(&self, components: &[Component]) -> CompoundAction {
        match self {
            CompoundAction::NoWorkers
            | CompoundAction::Coord { .. }
            | CompoundAction::BuildingCoord { .. } => {
                let workers: Vec<Worker> = components
                    .iter()
                    .map(|c| match c {
                        Component::Worker(w) => *w,
                        other => panic!("{:?} stage accepts only workers, got {other:?}", self.stage()),
                    })
                    .collect();
                if workers.is_empty() {
                    CompoundAction::NoWorkers
                } else {
                    CompoundAction::Workers { workers }
                }
            }
            CompoundAction::Workers { workers } => match components {
                [] => CompoundAction::NoWorkers,
                [Component::Coord(coord)] => CompoundAction::Coord {
                    workers: workers.clone(),
                    coord: *coord,
                },
                [Component::Building(building)] => CompoundAction::Building {
                    workers: workers.clone(),
                    building: *building,
                },
                other => panic!("Workers stage accepts one coordinate or building, got {other:?}"),
            },
            CompoundAction::Building { workers, building } => match components {
                [] => self.clone(),
                [Component::Coord(coord)] => CompoundAction::BuildingCoord {
                    workers: workers.clone(),
                    building: *building,
                    coord: *coord,
                },
                other => panic!("Building stage accepts one coordinate, got {other:?}"),
            },
        }
    }

    /// Legality beyond the mask, checked against the current world
    pub fn invalid(&self, world: &WorldState, rules: &BuildRules) -> Option<Invalid> {
        match self {
            CompoundAction::Building { building, .. } => {
                if let Some(prerequisite) = rules.dependencies.get(*building) {
                    if !rules.dependencies.met(*building, world.buildings.values()) {
                        return Some(Invalid::DependencyUnmet {
                            building: *building,
                            prerequisite,
                        });
                    }
                }
                let shortfall = world.stockpile.shortfall(&building.cost());
                if rules.enforce_costs && !shortfall.is_zero() {
                    return Some(Invalid::InsufficientResources {
                        building: *building,
                        shortfall,
                    });
                }
                None
            }
            CompoundAction::BuildingCoord {
                building, coord, ..
            } => {
                if let Some(occupant) = world.occupied(*coord) {
                    return Some(Invalid::Occupied {
                        coord: *coord,
                        occupant,
                    });
                }
                let gas = world.positions.resource(Resource::Gas);
                if *building == Building::Assimilator {
                    return (*coord != gas).then_some(Invalid::AssimilatorOffGas { coord: *coord });
                }
                world
                    .positions
                    .resource_on(*coord)
                    .map(|resource| Invalid::OnResource {
                        building: *building,
                        resource,
                        coord: *coord,
                    })
            }
            _ => None,
        }
    }

    /// The command a terminal stage resolves to, `None` mid-selection
    ///
    /// Panics if a build order reaches an illegal tile; `invalid` must have
    /// rejected it first.
    pub fn assignment(&self, positions: &Positions) -> Option<Assignment> {
        match self {
            CompoundAction::NoWorkers => Some(Assignment::DoNothing),
            CompoundAction::Coord { coord, .. } => Some(match positions.resource_on(*coord) {
                Some(resource) => Assignment::Harvest(resource),
                None => Assignment::GoTo(*coord),
            }),
            CompoundAction::BuildingCoord {
                building, coord, ..
            } => {
                let on_gas = positions.resource(Resource::Gas) == *coord;
                assert_eq!(
                    on_gas,
                    *building == Building::Assimilator,
                    "only an Assimilator may be built on gas"
                );
                assert_ne!(
                    positions.resource(Resource::Minerals),
                    *coord,
                    "nothing may be built on minerals"
                );
                Some(Assignment::BuildOrder {
                    building: *building,
                    coord: *coord,
                })
            }
            CompoundAction::Workers { .. } | CompoundAction::Building { .. } => None,
        }
    }

    /// Text shown when a human supplies the next selection
    pub fn prompt(&self, dims: &ActionDims) -> String {
        match self.stage() {
            Stage::NoWorkers | Stage::Coord | Stage::BuildingCoord => "Workers:".to_string(),
            Stage::Workers => {
                let mut lines: Vec<String> = dims
                    .catalog
                    .iter()
                    .enumerate()
                    .map(|(i, b)| format!("({i}) {b}"))
                    .collect();
                lines.push("Coord or Building".to_string());
                lines.join("\n")
            }
            Stage::Building => "Coord".to_string(),
        }
    }
}
