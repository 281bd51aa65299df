//! Grid positions, single-step directions, and distance metrics.
//!
//! The grid origin is the top-left tile `(0,0)`; `x` grows to the right and
//! `y` grows downward, so [`Direction::Up`] decreases `y`.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// A tile coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Position {
    /// Construct a position.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The tile one step away in `direction`.
    pub const fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// Chebyshev (king-move) distance.
    pub const fn chebyshev(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        if dx > dy { dx } else { dy }
    }

    /// Manhattan (rook-move) distance.
    pub const fn manhattan(self, other: Self) -> u32 {
        self.x.abs_diff(other.x).saturating_add(self.y.abs_diff(other.y))
    }

    /// Whether the position lies inside a `dim` x `dim` grid.
    pub const fn in_bounds(self, dim: i32) -> bool {
        self.x >= 0 && self.y >= 0 && self.x < dim && self.y < dim
    }

    /// The four orthogonal neighbours, in [`Direction::ALL`] order.
    pub fn neighbors(self) -> [(Direction, Self); 4] {
        Direction::ALL.map(|d| (d, self.step(d)))
    }

    /// Whether `other` is exactly one orthogonal step away.
    pub const fn is_adjacent(self, other: Self) -> bool {
        self.manhattan(other) == 1
    }

    /// The direction of a single orthogonal step from `self` to `other`.
    pub fn direction_to(self, other: Self) -> Option<Direction> {
        Direction::ALL.into_iter().find(|d| self.step(*d) == other)
    }

    /// Tiles on the Bresenham line from `self` to `other`, excluding `self`
    /// and including `other`.
    pub fn line_to(self, other: Self) -> Vec<Self> {
        let mut tiles = Vec::new();
        let dx = i64::from(other.x) - i64::from(self.x);
        let dy = i64::from(other.y) - i64::from(self.y);
        let step_x: i64 = if dx >= 0 { 1 } else { -1 };
        let step_y: i64 = if dy >= 0 { 1 } else { -1 };
        let dx = dx.abs();
        let dy = -dy.abs();
        let mut err = dx + dy;
        let mut x = i64::from(self.x);
        let mut y = i64::from(self.y);
        let target = (i64::from(other.x), i64::from(other.y));

        while (x, y) != target {
            let doubled = err * 2;
            if doubled >= dy {
                err += dy;
                x += step_x;
            }
            if doubled <= dx {
                err += dx;
                y += step_y;
            }
            // Coordinates stay between two i32 endpoints.
            let (Ok(px), Ok(py)) = (i32::try_from(x), i32::try_from(y)) else {
                break;
            };
            tiles.push(Self::new(px, py));
        }
        tiles
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

impl FromStr for Position {
    type Err = String;

    /// Parse `x,y`, optionally wrapped in parentheses.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('(').trim_end_matches(')');
        let (x, y) = trimmed
            .split_once(',')
            .ok_or_else(|| format!("expected x,y but got {s:?}"))?;
        let x = x
            .trim()
            .parse::<i32>()
            .map_err(|e| format!("invalid x coordinate in {s:?}: {e}"))?;
        let y = y
            .trim()
            .parse::<i32>()
            .map_err(|e| format!("invalid y coordinate in {s:?}: {e}"))?;
        Ok(Self::new(x, y))
    }
}

/// A single orthogonal step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Towards smaller `y`.
    Up,
    /// Towards larger `y`.
    Down,
    /// Towards smaller `x`.
    Left,
    /// Towards larger `x`.
    Right,
}

impl Direction {
    /// All directions in expansion order. Pathfinding tie-breaks follow it.
    pub const ALL: [Self; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// Unit offset `(dx, dy)`.
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    /// Lowercase label used in action tokens.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "north" => Ok(Self::Up),
            "down" | "south" => Ok(Self::Down),
            "left" | "west" => Ok(Self::Left),
            "right" | "east" => Ok(Self::Right),
            other => Err(format!("unknown direction {other:?}")),
        }
    }
}
