//! Subtask world vocabulary: materials, terrain, items, subtasks, moves

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Material {
    Wood,
    Stone,
}

impl Material {
    pub const ALL: [Material; 2] = [Material::Wood, Material::Stone];

    pub fn index(&self) -> usize {
        *self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Terrain {
    Factory,
    Water,
    Mountain,
}

/// Anything that occupies a room tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tile {
    Material(Material),
    Terrain(Terrain),
}

impl Tile {
    /// Every room must hold at least one of each
    pub const NECESSARY: [Tile; 3] = [
        Tile::Material(Material::Wood),
        Tile::Material(Material::Stone),
        Tile::Terrain(Terrain::Factory),
    ];

    /// Observation channel; the agent takes the channel after the last tile
    pub fn channel(&self) -> usize {
        match self {
            Tile::Material(m) => m.index(),
            Tile::Terrain(Terrain::Factory) => 2,
            Tile::Terrain(Terrain::Water) => 3,
            Tile::Terrain(Terrain::Mountain) => 4,
        }
    }

    /// Crossing tiles along a room's last column
    pub fn is_liminal(&self) -> bool {
        matches!(self, Tile::Terrain(Terrain::Water | Terrain::Mountain))
    }

    pub fn symbol(&self) -> char {
        match self {
            Tile::Material(Material::Wood) => 'w',
            Tile::Material(Material::Stone) => 's',
            Tile::Terrain(Terrain::Factory) => 'F',
            Tile::Terrain(Terrain::Water) => '~',
            Tile::Terrain(Terrain::Mountain) => '^',
        }
    }
}

/// Number of tile channels plus the agent channel
pub const OBS_CHANNELS: usize = 6;
pub const AGENT_CHANNEL: usize = 5;

/// Inventory and build-supply item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Item {
    Raw(Material),
    Refined(Material),
    Map,
}

impl Item {
    pub const ALL: [Item; 5] = [
        Item::Raw(Material::Wood),
        Item::Raw(Material::Stone),
        Item::Refined(Material::Wood),
        Item::Refined(Material::Stone),
        Item::Map,
    ];
}

/// One instruction of the subtask world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subtask {
    Collect(Material),
    Refine(Material),
    Cross(Terrain),
}

impl Subtask {
    /// Upper-level action order; `ALL.len()` is the no-op
    pub const ALL: [Subtask; 6] = [
        Subtask::Cross(Terrain::Water),
        Subtask::Cross(Terrain::Mountain),
        Subtask::Collect(Material::Wood),
        Subtask::Collect(Material::Stone),
        Subtask::Refine(Material::Wood),
        Subtask::Refine(Material::Stone),
    ];

    /// Subtasks a block may contain
    pub const BLOCK: [Subtask; 4] = [
        Subtask::Collect(Material::Wood),
        Subtask::Collect(Material::Stone),
        Subtask::Refine(Material::Wood),
        Subtask::Refine(Material::Stone),
    ];

    /// `[interaction, object]` line code; `[0, 0]` is padding
    pub fn line_code(&self) -> [usize; 2] {
        match self {
            Subtask::Collect(m) => [1, 1 + m.index()],
            Subtask::Refine(m) => [2, 1 + m.index()],
            Subtask::Cross(_) => [3, 1 + Material::ALL.len()],
        }
    }

    /// Item a block subtask leaves in the build supplies
    pub fn requirement(&self) -> Option<Item> {
        match self {
            Subtask::Collect(m) => Some(Item::Raw(*m)),
            Subtask::Refine(m) => Some(Item::Refined(*m)),
            Subtask::Cross(_) => None,
        }
    }
}

impl std::fmt::Display for Subtask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Subtask::Collect(m) => write!(f, "Collect {m:?}"),
            Subtask::Refine(m) => write!(f, "Refine {m:?}"),
            Subtask::Cross(t) => write!(f, "Cross {t:?}"),
        }
    }
}

/// Line-code widths: interactions + padding, objects + crossing + padding
pub const LINE_SPACE: [usize; 2] = [4, 4];

/// Lower-level primitive action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LowerAction {
    Collect,
    Refine(Material),
    Move { di: i32, dj: i32 },
}

impl LowerAction {
    pub const ALL: [LowerAction; 7] = [
        LowerAction::Collect,
        LowerAction::Refine(Material::Wood),
        LowerAction::Refine(Material::Stone),
        LowerAction::Move { di: -1, dj: 0 },
        LowerAction::Move { di: 0, dj: -1 },
        LowerAction::Move { di: 0, dj: 1 },
        LowerAction::Move { di: 1, dj: 0 },
    ];
}
