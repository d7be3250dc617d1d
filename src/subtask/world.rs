//! Room-crossing world state and its per-tick transition

use std::collections::{BTreeMap, BTreeSet};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::SubtaskConfig;
use crate::core::types::Coord;
use crate::subtask::objects::{Item, LowerAction, Material, Subtask, Terrain, Tile};
use crate::subtask::room::{generate_room, make_feasible, requirements, Room};

/// Random setbacks applied while the agent works
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Hazards {
    pub bandit_prob: f64,
    pub bridge_failure_prob: f64,
    pub map_discovery_prob: f64,
}

impl Hazards {
    pub fn from_config(config: &SubtaskConfig) -> Self {
        Self {
            bandit_prob: config.bandit_prob,
            bridge_failure_prob: config.bridge_failure_prob,
            map_discovery_prob: config.map_discovery_prob,
        }
    }
}

/// What happened during one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transition {
    pub room_complete: bool,
    pub robbed: Option<Item>,
}

#[derive(Debug, Clone)]
pub struct SubtaskWorld {
    side: usize,
    hazards: Hazards,
    blocks: Vec<Vec<Subtask>>,
    rooms: Vec<Room>,
    room: usize,
    objects: Room,
    agent: Coord,
    inventory: BTreeSet<Item>,
    build_supplies: BTreeMap<Item, usize>,
    required: BTreeMap<Item, usize>,
    rooms_complete: usize,
    success: bool,
}

impl SubtaskWorld {
    /// One room per block, agent placed off the crossing column
    pub fn generate(
        side: usize,
        hazards: Hazards,
        blocks: Vec<Vec<Subtask>>,
        rng: &mut impl Rng,
    ) -> Self {
        let rooms: Vec<Room> = blocks.iter().map(|_| generate_room(side, rng)).collect();
        let mut objects = rooms.first().cloned().unwrap_or_default();
        let required = blocks.first().map(|b| requirements(b)).unwrap_or_default();
        let agent = Coord::new(
            rng.gen_range(0..side) as i32,
            rng.gen_range(0..side - 1) as i32,
        );
        make_feasible(&mut objects, side, rng);
        Self {
            side,
            hazards,
            blocks,
            rooms,
            room: 0,
            objects,
            agent,
            inventory: BTreeSet::new(),
            build_supplies: BTreeMap::new(),
            required,
            rooms_complete: 0,
            success: false,
        }
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn agent(&self) -> Coord {
        self.agent
    }

    pub fn objects(&self) -> &Room {
        &self.objects
    }

    pub fn inventory(&self) -> &BTreeSet<Item> {
        &self.inventory
    }

    pub fn build_supplies(&self) -> &BTreeMap<Item, usize> {
        &self.build_supplies
    }

    /// Supplies the current room's bridge costs
    pub fn required(&self) -> &BTreeMap<Item, usize> {
        &self.required
    }

    pub fn num_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn rooms_complete(&self) -> usize {
        self.rooms_complete
    }

    pub fn success(&self) -> bool {
        self.success
    }

    /// Apply one lower-level action
    pub fn step(&mut self, action: LowerAction, rng: &mut impl Rng) -> Transition {
        let mut transition = Transition::default();
        if rng.gen::<f64>() < self.hazards.bandit_prob {
            transition.robbed = self.rob(rng);
        }

        let standing_on = self.objects.get(&self.agent).copied();
        match action {
            LowerAction::Move { di, dj } => {
                let target = Coord::new(self.agent.i + di, self.agent.j + dj);
                transition.room_complete = self.move_to(target, rng);
            }
            LowerAction::Collect => {
                if let Some(Tile::Material(material)) = standing_on {
                    self.inventory.insert(Item::Raw(material));
                    self.objects.remove(&self.agent);
                    if rng.gen::<f64>() < self.hazards.map_discovery_prob {
                        self.inventory.insert(Item::Map);
                    }
                }
            }
            LowerAction::Refine(material) => self.refine(material, standing_on),
        }

        if !self.success {
            make_feasible(&mut self.objects, self.side, rng);
        }
        transition
    }

    fn rob(&mut self, rng: &mut impl Rng) -> Option<Item> {
        let owned: Vec<Item> = self
            .build_supplies
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(item, _)| *item)
            .collect();
        let item = *owned.choose(rng)?;
        if let Some(count) = self.build_supplies.get_mut(&item) {
            *count -= 1;
        }
        tracing::debug!(?item, "bandit stole a supply");
        Some(item)
    }

    fn refine(&mut self, material: Material, standing_on: Option<Tile>) {
        if standing_on == Some(Tile::Terrain(Terrain::Factory))
            && self.inventory.contains(&Item::Raw(material))
        {
            self.inventory.insert(Item::Refined(material));
        }
    }

    /// Returns whether the agent left the room
    fn move_to(&mut self, target: Coord, rng: &mut impl Rng) -> bool {
        let moving_into = self.objects.get(&target).copied();
        let side = self.side as i32;

        if moving_into == Some(Tile::Terrain(Terrain::Water)) {
            for item in std::mem::take(&mut self.inventory) {
                *self.build_supplies.entry(item).or_insert(0) += 1;
            }
            if !self.covers_required() {
                return false;
            }
            for (item, count) in &self.required {
                if let Some(supply) = self.build_supplies.get_mut(item) {
                    *supply = supply.saturating_sub(*count);
                }
            }
            if rng.gen::<f64>() >= self.hazards.bridge_failure_prob {
                self.agent = target;
            } else {
                tracing::debug!(%target, "bridge washed out");
            }
            return false;
        }

        let inside = (0..side).contains(&target.i) && (0..side).contains(&target.j);
        let next_room = target.j == side && (0..side).contains(&target.i);
        if !inside && !next_room {
            return false;
        }
        if moving_into == Some(Tile::Terrain(Terrain::Mountain)) && !self.inventory.remove(&Item::Map)
        {
            return false;
        }
        self.agent = Coord::new(target.i, target.j.rem_euclid(side));
        if next_room {
            self.enter_next_room();
        }
        next_room
    }

    fn covers_required(&self) -> bool {
        self.required
            .iter()
            .all(|(item, count)| self.build_supplies.get(item).copied().unwrap_or(0) >= *count)
    }

    fn enter_next_room(&mut self) {
        self.rooms_complete += 1;
        self.room += 1;
        match self.rooms.get(self.room) {
            Some(room) => {
                self.objects = room.clone();
                self.required = requirements(&self.blocks[self.room]);
            }
            None => {
                self.success = true;
                self.required.clear();
            }
        }
        tracing::debug!(
            rooms_complete = self.rooms_complete,
            success = self.success,
            "room complete"
        );
    }
}
