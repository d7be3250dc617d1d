//! Property tests for compound-action encoding, masks and gate openers

use craftworld::actions::{ActionDims, Component, CompoundAction};
use craftworld::core::{Coord, WorldSize};
use craftworld::world::{Building, BuildingCatalog, Worker};
use proptest::prelude::*;

const SIDE: i32 = 4;
const WORKERS: usize = 3;

fn dims() -> ActionDims {
    ActionDims::new(
        WorldSize::new(SIDE as usize).unwrap(),
        WORKERS,
        BuildingCatalog::new(true),
    )
}

// ============================================================================
// Strategies
// ============================================================================

fn coord() -> impl Strategy<Value = Coord> {
    (0..SIDE, 0..SIDE).prop_map(|(i, j)| Coord::new(i, j))
}

fn building() -> impl Strategy<Value = Building> {
    prop::sample::select(Building::ALL.to_vec())
}

/// Ascending worker selections, the order decoding produces
fn selection(min: usize) -> impl Strategy<Value = Vec<Worker>> {
    prop::collection::btree_set(0..WORKERS, min..=WORKERS)
        .prop_map(|set| set.into_iter().map(Worker).collect())
}

fn action() -> impl Strategy<Value = CompoundAction> {
    prop_oneof![
        Just(CompoundAction::NoWorkers),
        selection(1).prop_map(|workers| CompoundAction::Workers { workers }),
        (selection(1), coord()).prop_map(|(workers, coord)| CompoundAction::Coord { workers, coord }),
        (selection(1), building())
            .prop_map(|(workers, building)| CompoundAction::Building { workers, building }),
        (selection(1), building(), coord()).prop_map(|(workers, building, coord)| {
            CompoundAction::BuildingCoord {
                workers,
                building,
                coord,
            }
        }),
    ]
}

/// A stage together with components it accepts
fn action_with_components() -> impl Strategy<Value = (CompoundAction, Vec<Component>)> {
    action().prop_flat_map(|action| {
        let caps = action.capabilities();
        let components: BoxedStrategy<Vec<Component>> = if caps.worker {
            selection(0)
                .prop_map(|workers| workers.into_iter().map(Component::from).collect())
                .boxed()
        } else if caps.building {
            prop_oneof![
                Just(vec![]),
                coord().prop_map(|c| vec![Component::from(c)]),
                building().prop_map(|b| vec![Component::from(b)]),
            ]
            .boxed()
        } else {
            prop_oneof![Just(vec![]), coord().prop_map(|c| vec![Component::from(c)])].boxed()
        };
        (Just(action), components)
    })
}

/// A stage with an input vector drawn only from its permitted codes
fn action_with_permitted_input() -> impl Strategy<Value = (CompoundAction, Vec<usize>)> {
    action().prop_flat_map(|action| {
        let rows: Vec<_> = action
            .permitted_values(&dims())
            .into_iter()
            .map(prop::sample::select)
            .collect();
        (Just(action), rows)
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Decoding an encoded selection advances exactly like the selection
    #[test]
    fn test_encode_decode_round_trip((action, components) in action_with_components()) {
        let dims = dims();
        let ints = action.encode(&components, &dims);
        prop_assert_eq!(ints.len(), dims.rows());
        prop_assert_eq!(action.update_from_ints(&ints, &dims), action.update(&components));
    }

    /// Every code the mask allows is permitted, and decoding it never panics
    #[test]
    fn test_mask_soundness((action, ints) in action_with_permitted_input()) {
        let dims = dims();
        let mask = action.mask(&dims);
        prop_assert_eq!(mask.len(), dims.rows());
        for (row, code) in mask.iter().zip(&ints) {
            prop_assert_eq!(row.len(), dims.row_width());
            prop_assert!(!row[*code]);
        }
        let next = action.update_from_ints(&ints, &dims);
        let representation = next.to_ints(&dims);
        let space = CompoundAction::representation_space(&dims);
        prop_assert_eq!(representation.len(), space.len());
        for (value, size) in representation.iter().zip(&space) {
            prop_assert!(value < size);
        }
    }

    /// Gate openers are unmasked input vectors
    #[test]
    fn test_gate_openers_are_unmasked(action in action()) {
        let dims = dims();
        let mask = action.mask(&dims);
        let openers = action.gate_openers(&dims);
        prop_assert!(!openers.is_empty());
        for opener in openers {
            prop_assert_eq!(opener.len(), dims.rows());
            for (row, code) in mask.iter().zip(&opener) {
                prop_assert!(!row[*code]);
            }
        }
    }
}

#[test]
fn test_worker_stage_gate_opener_selects_nobody() {
    let dims = dims();
    let openers = CompoundAction::NoWorkers.gate_openers(&dims);
    assert_eq!(openers, vec![vec![1, 1, 1, 0]]);
    assert_eq!(
        CompoundAction::NoWorkers.update_from_ints(&openers[0], &dims),
        CompoundAction::NoWorkers
    );
}

#[test]
fn test_target_stage_gate_openers_cover_every_coord() {
    let dims = dims();
    let action = CompoundAction::Workers {
        workers: vec![Worker(1)],
    };
    let openers = action.gate_openers(&dims);
    assert_eq!(openers.len(), dims.coord_space());
    assert!(openers
        .iter()
        .all(|o| o[..WORKERS].iter().all(|code| *code == 0)));
}
