//! Building kinds, the active catalog and the dependency forest

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::world::objects::Resource;

/// Building kind, in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Building {
    Assimilator,
    CyberneticsCore,
    DarkShrine,
    FleetBeacon,
    Forge,
    Gateway,
    Nexus,
    PhotonCannon,
    Pylon,
    RoboticsBay,
    RoboticsFacility,
    StarGate,
    TemplarArchives,
    TwilightCouncil,
}

impl Building {
    pub const ALL: [Building; 14] = [
        Building::Assimilator,
        Building::CyberneticsCore,
        Building::DarkShrine,
        Building::FleetBeacon,
        Building::Forge,
        Building::Gateway,
        Building::Nexus,
        Building::PhotonCannon,
        Building::Pylon,
        Building::RoboticsBay,
        Building::RoboticsFacility,
        Building::StarGate,
        Building::TemplarArchives,
        Building::TwilightCouncil,
    ];

    /// Resources paid when construction is committed
    pub fn cost(&self) -> Cost {
        let (minerals, gas) = match self {
            Building::Assimilator => (75, 0),
            Building::CyberneticsCore => (150, 0),
            Building::DarkShrine => (150, 150),
            Building::FleetBeacon => (300, 200),
            Building::Forge => (150, 0),
            Building::Gateway => (150, 0),
            Building::Nexus => (400, 0),
            Building::PhotonCannon => (150, 0),
            Building::Pylon => (100, 0),
            Building::RoboticsBay => (200, 200),
            Building::RoboticsFacility => (200, 100),
            Building::StarGate => (150, 150),
            Building::TemplarArchives => (150, 200),
            Building::TwilightCouncil => (150, 100),
        };
        Cost { minerals, gas }
    }

    /// Map symbol, unique per kind
    pub fn symbol(&self) -> &'static str {
        match self {
            Building::Assimilator => "A",
            Building::CyberneticsCore => "CC",
            Building::DarkShrine => "DS",
            Building::FleetBeacon => "FB",
            Building::Forge => "f",
            Building::Gateway => "GW",
            Building::Nexus => "N",
            Building::PhotonCannon => "PC",
            Building::Pylon => "P",
            Building::RoboticsBay => "RB",
            Building::RoboticsFacility => "RF",
            Building::StarGate => "SG",
            Building::TemplarArchives => "TA",
            Building::TwilightCouncil => "TC",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Building::Assimilator => "Assimilator",
            Building::CyberneticsCore => "CyberneticsCore",
            Building::DarkShrine => "DarkShrine",
            Building::FleetBeacon => "FleetBeacon",
            Building::Forge => "Forge",
            Building::Gateway => "Gateway",
            Building::Nexus => "Nexus",
            Building::PhotonCannon => "PhotonCannon",
            Building::Pylon => "Pylon",
            Building::RoboticsBay => "RoboticsBay",
            Building::RoboticsFacility => "RoboticsFacility",
            Building::StarGate => "StarGate",
            Building::TemplarArchives => "TemplarArchives",
            Building::TwilightCouncil => "TwilightCouncil",
        }
    }
}

impl std::fmt::Display for Building {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Minerals and gas owed for one building
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cost {
    pub minerals: i64,
    pub gas: i64,
}

impl Cost {
    pub fn get(&self, resource: Resource) -> i64 {
        match resource {
            Resource::Minerals => self.minerals,
            Resource::Gas => self.gas,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.minerals == 0 && self.gas == 0
    }
}

impl std::ops::Add for Cost {
    type Output = Cost;

    fn add(self, other: Cost) -> Cost {
        Cost {
            minerals: self.minerals + other.minerals,
            gas: self.gas + other.gas,
        }
    }
}

impl std::fmt::Display for Cost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} minerals, {} gas", self.minerals, self.gas)
    }
}

/// The buildings an environment exposes, in code order
///
/// A building's position in the catalog is its action code. Dropping the
/// Assimilator shifts every later code down by one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingCatalog {
    buildings: Vec<Building>,
}

impl BuildingCatalog {
    pub fn new(include_assimilator: bool) -> Self {
        let buildings = Building::ALL
            .iter()
            .copied()
            .filter(|b| include_assimilator || *b != Building::Assimilator)
            .collect();
        Self { buildings }
    }

    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Building> {
        self.buildings.get(index).copied()
    }

    pub fn index_of(&self, building: Building) -> Option<usize> {
        self.buildings.iter().position(|b| *b == building)
    }

    pub fn contains(&self, building: Building) -> bool {
        self.buildings.contains(&building)
    }

    pub fn iter(&self) -> impl Iterator<Item = Building> + '_ {
        self.buildings.iter().copied()
    }

    /// Buildings a generated task may require
    ///
    /// Without an Assimilator gas is unobtainable, so anything with a gas
    /// cost is left out.
    pub fn buildable(&self) -> Vec<Building> {
        let has_gas = self.contains(Building::Assimilator);
        self.iter().filter(|b| has_gas || b.cost().gas == 0).collect()
    }
}

impl Default for BuildingCatalog {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Dependency forest: each building has at most one prerequisite
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies(BTreeMap<Building, Building>);

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, building: Building) -> Option<Building> {
        self.0.get(&building).copied()
    }

    pub fn insert(&mut self, building: Building, prerequisite: Building) {
        self.0.insert(building, prerequisite);
    }

    /// Prerequisites of `building`, root first, excluding the building itself
    pub fn chain(&self, building: Building) -> Vec<Building> {
        let mut chain = Vec::new();
        let mut current = building;
        while let Some(prerequisite) = self.get(current) {
            // A cycle would loop forever; the forest generator never builds one
            if prerequisite == building || chain.contains(&prerequisite) {
                break;
            }
            chain.push(prerequisite);
            current = prerequisite;
        }
        chain.reverse();
        chain
    }

    /// Whether the prerequisite of `building` is among `completed`
    pub fn met<'a>(
        &self,
        building: Building,
        mut completed: impl Iterator<Item = &'a Building>,
    ) -> bool {
        match self.get(building) {
            None => true,
            Some(prerequisite) => completed.any(|b| *b == prerequisite),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Building, Building)> + '_ {
        self.0.iter().map(|(b, p)| (*b, *p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbols_are_unique() {
        let mut symbols: Vec<&str> = Building::ALL.iter().map(|b| b.symbol()).collect();
        symbols.sort_unstable();
        symbols.dedup();
        assert_eq!(symbols.len(), Building::ALL.len());
    }

    #[test]
    fn test_catalog_codes_shift_without_assimilator() {
        let full = BuildingCatalog::new(true);
        let reduced = BuildingCatalog::new(false);
        assert_eq!(full.len(), 14);
        assert_eq!(reduced.len(), 13);
        assert_eq!(full.index_of(Building::Gateway), Some(5));
        assert_eq!(reduced.index_of(Building::Gateway), Some(4));
        assert_eq!(reduced.index_of(Building::Assimilator), None);
    }

    #[test]
    fn test_buildable_drops_gas_buildings_without_assimilator() {
        let reduced = BuildingCatalog::new(false);
        assert!(reduced.buildable().iter().all(|b| b.cost().gas == 0));
        assert!(reduced.buildable().contains(&Building::Pylon));
        assert_eq!(BuildingCatalog::new(true).buildable().len(), 14);
    }

    #[test]
    fn test_dependency_chain_root_first() {
        let mut deps = Dependencies::new();
        deps.insert(Building::Gateway, Building::Pylon);
        deps.insert(Building::CyberneticsCore, Building::Gateway);
        assert_eq!(
            deps.chain(Building::CyberneticsCore),
            vec![Building::Pylon, Building::Gateway]
        );
        assert!(deps.chain(Building::Pylon).is_empty());
    }

    #[test]
    fn test_dependency_met() {
        let mut deps = Dependencies::new();
        deps.insert(Building::Gateway, Building::Pylon);
        assert!(!deps.met(Building::Gateway, [Building::Nexus].iter()));
        assert!(deps.met(Building::Gateway, [Building::Pylon].iter()));
        assert!(deps.met(Building::Pylon, std::iter::empty::<&Building>()));
    }
}
