//! Serde adapter for the tile map.
//!
//! JSON object keys must be strings, so the floor is written as a sequence
//! of `{ "position": {..}, "objects": [..] }` entries in position order.
//!
//! Usage: `#[serde(with = "crate::serde_tiles")]`

use std::collections::BTreeMap;

use mutiny_types::Position;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::object::WorldObject;

#[derive(Serialize)]
struct TileRef<'a> {
    position: Position,
    objects: &'a [WorldObject],
}

#[derive(Deserialize)]
struct Tile {
    position: Position,
    objects: Vec<WorldObject>,
}

/// Serialize the tile map as an ordered sequence.
pub fn serialize<S: Serializer>(
    tiles: &BTreeMap<Position, Vec<WorldObject>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(tiles.iter().map(|(position, objects)| TileRef {
        position: *position,
        objects,
    }))
}

/// Deserialize the tile map, dropping empty tiles.
pub fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<Position, Vec<WorldObject>>, D::Error> {
    let tiles = Vec::<Tile>::deserialize(deserializer)?;
    let mut map: BTreeMap<Position, Vec<WorldObject>> = BTreeMap::new();
    for tile in tiles {
        if !tile.objects.is_empty() {
            map.entry(tile.position).or_default().extend(tile.objects);
        }
    }
    Ok(map)
}
