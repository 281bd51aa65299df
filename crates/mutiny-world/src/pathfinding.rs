//! Best-first navigation over a (possibly partial) world view.
//!
//! The frontier is ordered by a straight-line estimate: the number of tiles
//! on the Bresenham line from a candidate to the destination, plus two for
//! every impassable tile on that line. Ties resolve in insertion order.
//! Tiles are marked visited when first pushed, and the search stops as soon
//! as the destination is generated.
//!
//! Tiles missing from the view are empty and therefore passable, so an
//! agent plans optimistically through unexplored space. Actors never block
//! a path; they move between observations.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use mutiny_types::{Direction, ObjectKind, Position};

use crate::world::World;

/// Extra priority per impassable tile on the straight line.
const BLOCKED_TILE_PENALTY: usize = 2;

/// Single-step directions from `origin` to `dest`, or `None` if `dest`
/// cannot be reached.
///
/// With `treat_doors_open`, locked doors count as passable. An empty path
/// means the actor is already there.
pub fn navigate(
    world: &World,
    origin: Position,
    dest: Position,
    treat_doors_open: bool,
) -> Option<Vec<Direction>> {
    if origin == dest {
        return Some(Vec::new());
    }
    if !world.is_passable(dest, treat_doors_open) {
        return None;
    }

    let priority = |pos: Position| {
        let line = pos.line_to(dest);
        let blocked = line
            .iter()
            .filter(|tile| !world.is_passable(**tile, treat_doors_open))
            .count();
        line.len()
            .saturating_add(blocked.saturating_mul(BLOCKED_TILE_PENALTY))
    };

    let mut frontier = BinaryHeap::new();
    let mut visited = BTreeSet::from([origin]);
    let mut came_from: BTreeMap<Position, (Position, Direction)> = BTreeMap::new();
    let mut seq = 0u64;
    frontier.push(Reverse((priority(origin), seq, origin)));

    while let Some(Reverse((_, _, current))) = frontier.pop() {
        for (direction, next) in current.neighbors() {
            if visited.contains(&next) || !world.is_passable(next, treat_doors_open) {
                continue;
            }
            visited.insert(next);
            came_from.insert(next, (current, direction));
            if next == dest {
                return Some(reconstruct(&came_from, origin, dest));
            }
            seq = seq.saturating_add(1);
            frontier.push(Reverse((priority(next), seq, next)));
        }
    }
    None
}

fn reconstruct(
    came_from: &BTreeMap<Position, (Position, Direction)>,
    origin: Position,
    dest: Position,
) -> Vec<Direction> {
    let mut steps = Vec::new();
    let mut cursor = dest;
    while cursor != origin {
        let Some((previous, direction)) = came_from.get(&cursor) else {
            break;
        };
        steps.push(*direction);
        cursor = *previous;
    }
    steps.reverse();
    steps
}

/// Tiles visited by following `path` from `origin`, excluding `origin`.
pub fn trace(origin: Position, path: &[Direction]) -> Vec<Position> {
    path.iter()
        .scan(origin, |pos, direction| {
            *pos = pos.step(*direction);
            Some(*pos)
        })
        .collect()
}

/// The first locked door along `path`, if any.
pub fn first_locked_door(world: &World, origin: Position, path: &[Direction]) -> Option<Position> {
    trace(origin, path).into_iter().find(|pos| {
        world
            .objects_at(*pos)
            .iter()
            .any(|obj| obj.kind() == ObjectKind::Door && obj.is_locked())
    })
}
