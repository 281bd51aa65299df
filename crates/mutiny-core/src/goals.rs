//! Goal validity, discrepancy explanation, and the per-actor goal graph.
//!
//! Every cycle an agent checks its goals against its current knowledge:
//!
//! ```text
//! VALID --check--> DISCREPANT(reason) --explain--> DROPPED
//!                                              \-> DECOMPOSED(+subgoal)
//!                                              \-> REBELLED
//! ```
//!
//! All checks run on the actor's knowledge view, never on the true world.

use core::fmt;

use mutiny_types::{Goal, GoalPredicate, ObjectId, ObjectKind, Position};
use mutiny_world::{Actor, ObjectQuery, World, first_locked_door, navigate};
use serde::{Deserialize, Serialize};

use crate::rebellion::Rebellion;

// ---------------------------------------------------------------------------
// Discrepancies
// ---------------------------------------------------------------------------

/// Why a goal cannot be pursued as stated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum Discrepancy {
    /// The destination tile cannot be entered.
    Unpassable {
        /// The destination.
        dest: Position,
    },
    /// No path reaches the destination with doors closed.
    NoAccess {
        /// The destination.
        dest: Position,
    },
    /// Nothing locked occupies the tile.
    NoObject {
        /// The tile to open.
        dest: Position,
    },
    /// The target is not known to exist.
    NoTarget {
        /// The missing target.
        target: ObjectId,
    },
    /// Detonating at the firing position would kill civilians.
    CiviKilled {
        /// The intended target.
        target: ObjectId,
        /// Where the actor would detonate.
        firing_position: Position,
        /// Living civilians inside the blast.
        civilians: Vec<ObjectId>,
    },
}

impl Discrepancy {
    /// The reason tag used in dialogs and logs.
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Unpassable { .. } => "unpassable",
            Self::NoAccess { .. } => "no-access",
            Self::NoObject { .. } => "no-object",
            Self::NoTarget { .. } => "no-target",
            Self::CiviKilled { .. } => "civi-killed",
        }
    }
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unpassable { dest } | Self::NoAccess { dest } | Self::NoObject { dest } => {
                write!(f, "{} at {dest}", self.tag())
            }
            Self::NoTarget { target } => write!(f, "no-target {target}"),
            Self::CiviKilled {
                target, civilians, ..
            } => write!(
                f,
                "civi-killed: attacking {target} endangers {} civilian(s)",
                civilians.len()
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Validity and completion
// ---------------------------------------------------------------------------

/// Check a goal against the actor's view.
///
/// A goal that is already complete is valid.
pub fn check(view: &World, actor: &Actor, goal: &Goal) -> Result<(), Discrepancy> {
    if is_complete(view, actor, goal) {
        return Ok(());
    }
    match &goal.predicate {
        GoalPredicate::AgentAt(dest) => {
            let dest = *dest;
            if !view.is_passable(dest, false) {
                return Err(Discrepancy::Unpassable { dest });
            }
            if navigate(view, actor.position, dest, false).is_none() {
                return Err(Discrepancy::NoAccess { dest });
            }
            Ok(())
        }
        GoalPredicate::Open(dest) => {
            let dest = *dest;
            if view.objects_at(dest).iter().any(|obj| obj.is_locked()) {
                Ok(())
            } else {
                Err(Discrepancy::NoObject { dest })
            }
        }
        GoalPredicate::Killed(target) => {
            let Some(npc) = view.object(target).filter(|obj| obj.kind() == ObjectKind::Npc) else {
                return Err(Discrepancy::NoTarget {
                    target: target.clone(),
                });
            };
            let firing_position = firing_position(view, actor, npc.position());
            let civilians = civilians_in_blast(view, firing_position);
            if civilians.is_empty() {
                Ok(())
            } else {
                Err(Discrepancy::CiviKilled {
                    target: target.clone(),
                    firing_position,
                    civilians,
                })
            }
        }
    }
}

/// Whether the goal is achieved in the actor's view.
pub fn is_complete(view: &World, actor: &Actor, goal: &Goal) -> bool {
    match &goal.predicate {
        GoalPredicate::AgentAt(dest) => actor.position == *dest,
        GoalPredicate::Open(dest) => view.objects_at(*dest).iter().any(|obj| {
            matches!(obj.kind(), ObjectKind::Door | ObjectKind::Chest) && !obj.is_locked()
        }),
        GoalPredicate::Killed(target) => view
            .object(target)
            .is_some_and(|obj| obj.kind() == ObjectKind::Npc && !obj.is_living_npc()),
    }
}

/// The tile an actor should detonate from to hit `target`.
///
/// Among passable tiles orthogonally adjacent to the target, the one with
/// the shortest path from the actor wins; the actor's own tile counts when
/// adjacent. Without any reachable candidate, the nearest candidate by
/// Manhattan distance is used, and without any candidate the target tile
/// itself.
pub fn firing_position(view: &World, actor: &Actor, target: Position) -> Position {
    let candidates: Vec<Position> = target
        .neighbors()
        .into_iter()
        .map(|(_, pos)| pos)
        .filter(|pos| *pos == actor.position || view.is_passable(*pos, false))
        .collect();

    let reachable = candidates
        .iter()
        .filter_map(|pos| navigate(view, actor.position, *pos, false).map(|path| (path.len(), *pos)))
        .min();
    if let Some((_, pos)) = reachable {
        return pos;
    }

    candidates
        .into_iter()
        .min_by_key(|pos| (actor.position.manhattan(*pos), *pos))
        .unwrap_or(target)
}

/// Living civilians within blast range of `center`.
pub fn civilians_in_blast(view: &World, center: Position) -> Vec<ObjectId> {
    view.query(
        &ObjectQuery::new()
            .kind(ObjectKind::Npc)
            .civilian(true)
            .alive(true)
            .within(center, view.bomb_range()),
    )
    .into_iter()
    .map(|obj| obj.id().clone())
    .collect()
}

/// Living hostile NPCs the actor could validly be told to kill, excluding
/// `except`.
pub fn valid_targets(view: &World, actor: &Actor, except: Option<&ObjectId>) -> Vec<ObjectId> {
    view.query(&ObjectQuery::new().kind(ObjectKind::Npc).civilian(false).alive(true))
        .into_iter()
        .filter(|npc| Some(npc.id()) != except)
        .filter(|npc| {
            civilians_in_blast(view, firing_position(view, actor, npc.position())).is_empty()
        })
        .map(|npc| npc.id().clone())
        .collect()
}

// ---------------------------------------------------------------------------
// Explanation
// ---------------------------------------------------------------------------

/// What to do about a discrepant goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Explanation {
    /// Abandon the goal.
    Drop(Discrepancy),
    /// Pursue a sub-goal first; its parent is the discrepant goal.
    Decompose(Goal),
    /// Refuse the goal and negotiate with its owner.
    Rebel(Rebellion),
}

/// Map a discrepancy to an actionable cause.
///
/// `no-access` is re-tested with doors treated as open: when a locked door
/// is what blocks the way (`door-blocking`), the goal decomposes into
/// opening that door.
pub fn explain(view: &World, actor: &Actor, goal: &Goal, discrepancy: Discrepancy) -> Explanation {
    match discrepancy {
        Discrepancy::NoAccess { dest } => {
            let door = navigate(view, actor.position, dest, true)
                .and_then(|path| first_locked_door(view, actor.position, &path));
            match door {
                Some(door) => Explanation::Decompose(Goal::subgoal(GoalPredicate::Open(door), goal)),
                None => Explanation::Drop(Discrepancy::NoAccess { dest }),
            }
        }
        Discrepancy::CiviKilled { .. } => {
            Explanation::Rebel(Rebellion::new(view, actor, goal.clone(), discrepancy))
        }
        Discrepancy::Unpassable { .. }
        | Discrepancy::NoObject { .. }
        | Discrepancy::NoTarget { .. } => Explanation::Drop(discrepancy),
    }
}

// ---------------------------------------------------------------------------
// Goal graph
// ---------------------------------------------------------------------------

/// One actor's goals with their parent links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoalGraph {
    goals: Vec<Goal>,
    delivered: u64,
}

impl GoalGraph {
    /// An empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a goal unless an identical one is already present.
    pub fn add(&mut self, goal: Goal) -> bool {
        if self.goals.contains(&goal) {
            return false;
        }
        self.goals.push(goal);
        true
    }

    /// Whether the graph holds the goal.
    pub fn contains(&self, goal: &Goal) -> bool {
        self.goals.contains(goal)
    }

    /// Goals without a pending sub-goal, in insertion order.
    pub fn leaves(&self) -> Vec<&Goal> {
        self.goals
            .iter()
            .filter(|goal| {
                !self
                    .goals
                    .iter()
                    .any(|other| other.parent.as_deref() == Some(*goal))
            })
            .collect()
    }

    /// Remove an achieved goal and count it as delivered.
    pub fn achieve(&mut self, goal: &Goal) -> bool {
        let before = self.goals.len();
        self.goals.retain(|g| g != goal);
        let removed = self.goals.len() < before;
        if removed {
            self.delivered = self.delivered.saturating_add(1);
        }
        removed
    }

    /// Remove a goal together with every goal descended from it.
    pub fn drop_goal(&mut self, goal: &Goal) -> usize {
        let before = self.goals.len();
        self.goals
            .retain(|g| g != goal && !descends_from(g, goal));
        before.saturating_sub(self.goals.len())
    }

    /// Number of goals achieved so far.
    pub const fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Number of pending goals.
    pub fn len(&self) -> usize {
        self.goals.len()
    }

    /// Whether no goals are pending.
    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }
}

fn descends_from(goal: &Goal, ancestor: &Goal) -> bool {
    let mut cursor = goal.parent.as_deref();
    while let Some(parent) = cursor {
        if parent == ancestor {
            return true;
        }
        cursor = parent.parent.as_deref();
    }
    false
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use mutiny_types::{ActorId, Direction, Role};
    use mutiny_world::{Action, ObjectState, trace};

    use super::*;

    fn owner() -> ActorId {
        "op".parse().unwrap()
    }

    /// 5x5 grid split by a wall column at x=2 with a locked door at (2,2),
    /// agent at (0,0) with full vision.
    fn door_scenario() -> (World, Actor) {
        let mut world = World::new(5, 1).unwrap();
        for y in 0..5 {
            let state = if y == 2 {
                ObjectState::Door { locked: true }
            } else {
                ObjectState::Wall
            };
            world.place_object(state, Position::new(2, y)).unwrap();
        }
        let agent = Actor::new("agent1".parse().unwrap(), Role::Agent, Position::new(0, 0), -1);
        (world, agent)
    }

    fn open_field(npc_at: Position) -> (World, Actor, ObjectId) {
        let mut world = World::new(8, 1).unwrap();
        let npc = world
            .place_object(
                ObjectState::Npc {
                    alive: true,
                    civilian: false,
                },
                npc_at,
            )
            .unwrap();
        let agent = Actor::new("agent1".parse().unwrap(), Role::Agent, Position::new(0, 3), -1);
        (world, agent, npc.id().clone())
    }

    #[test]
    fn door_blocking_decomposes_into_open() {
        let (world, agent) = door_scenario();
        let goal = Goal::new(GoalPredicate::AgentAt(Position::new(4, 4)), owner());

        let discrepancy = check(&world, &agent, &goal).unwrap_err();
        assert_eq!(
            discrepancy,
            Discrepancy::NoAccess {
                dest: Position::new(4, 4)
            }
        );

        let Explanation::Decompose(sub) = explain(&world, &agent, &goal, discrepancy) else {
            panic!("expected decomposition");
        };
        assert_eq!(sub.predicate, GoalPredicate::Open(Position::new(2, 2)));
        assert_eq!(sub.parent.as_deref(), Some(&goal));
        assert_eq!(sub.owner, owner());
        assert!(check(&world, &agent, &sub).is_ok());
    }

    #[test]
    fn unlocking_the_door_makes_the_destination_reachable() {
        let (mut world, agent) = door_scenario();
        let door = world.occupant(Position::new(2, 2)).unwrap().id().clone();
        world
            .place_object(
                ObjectState::Key {
                    unlocks: door,
                    taken: false,
                },
                Position::new(0, 1),
            )
            .unwrap();
        let id = agent.id.clone();
        world.add_actor(agent).unwrap();

        let goal = Goal::new(GoalPredicate::AgentAt(Position::new(4, 4)), owner());
        let open = Goal::subgoal(GoalPredicate::Open(Position::new(2, 2)), &goal);
        for action in [
            Action::Move(Direction::Down),
            Action::Move(Direction::Down),
            Action::Move(Direction::Right),
            Action::Unlock(Position::new(2, 2)),
        ] {
            world.apply_action(&id, action).unwrap();
        }

        let actor = world.actor(&id).unwrap();
        assert_eq!(actor.position, Position::new(1, 2));
        assert!(is_complete(&world, actor, &open));
        assert!(check(&world, actor, &goal).is_ok());
        let path = navigate(&world, actor.position, Position::new(4, 4), false).unwrap();
        assert_eq!(
            trace(actor.position, &path).last(),
            Some(&Position::new(4, 4))
        );
    }

    #[test]
    fn walled_off_destination_is_dropped() {
        let (mut world, agent) = door_scenario();
        world.remove_object_at(ObjectKind::Door, Position::new(2, 2)).unwrap();
        world.place_object(ObjectState::Wall, Position::new(2, 2)).unwrap();
        let goal = Goal::new(GoalPredicate::AgentAt(Position::new(4, 4)), owner());

        let discrepancy = check(&world, &agent, &goal).unwrap_err();
        assert!(matches!(
            explain(&world, &agent, &goal, discrepancy),
            Explanation::Drop(Discrepancy::NoAccess { .. })
        ));
    }

    #[test]
    fn unpassable_and_missing_objects_drop() {
        let (world, agent) = door_scenario();
        let into_wall = Goal::new(GoalPredicate::AgentAt(Position::new(2, 0)), owner());
        let d = check(&world, &agent, &into_wall).unwrap_err();
        assert_eq!(d.tag(), "unpassable");
        assert!(matches!(explain(&world, &agent, &into_wall, d), Explanation::Drop(_)));

        let open_floor = Goal::new(GoalPredicate::Open(Position::new(1, 1)), owner());
        assert_eq!(check(&world, &agent, &open_floor).unwrap_err().tag(), "no-object");

        let ghost = Goal::new(
            GoalPredicate::Killed("npc-0123456789abcdef".parse().unwrap()),
            owner(),
        );
        assert_eq!(check(&world, &agent, &ghost).unwrap_err().tag(), "no-target");
    }

    #[test]
    fn completion_per_predicate() {
        let (mut world, mut agent, target) = open_field(Position::new(5, 3));
        let here = Goal::new(GoalPredicate::AgentAt(Position::new(0, 3)), owner());
        assert!(is_complete(&world, &agent, &here));

        let kill = Goal::new(GoalPredicate::Killed(target), owner());
        assert!(!is_complete(&world, &agent, &kill));

        agent.position = Position::new(4, 3);
        world.add_actor(agent.clone()).unwrap();
        let id = agent.id.clone();
        world.arm(&id).unwrap();
        world.arm(&id).unwrap();
        world.detonate_at(&id).unwrap();
        assert!(is_complete(&world, &agent, &kill));
    }

    #[test]
    fn firing_position_prefers_shortest_path() {
        let (world, agent, _) = open_field(Position::new(5, 3));
        assert_eq!(
            firing_position(&world, &agent, Position::new(5, 3)),
            Position::new(4, 3)
        );
    }

    #[test]
    fn adding_a_civilian_in_blast_flips_to_civi_killed() {
        let (mut world, agent, target) = open_field(Position::new(5, 3));
        let goal = Goal::new(GoalPredicate::Killed(target.clone()), owner());
        assert!(check(&world, &agent, &goal).is_ok());

        // (3,2) is within range 1 of the firing position (4,3) but not
        // adjacent to the target.
        let civilian = world
            .place_object(
                ObjectState::Npc {
                    alive: true,
                    civilian: true,
                },
                Position::new(3, 2),
            )
            .unwrap();
        let discrepancy = check(&world, &agent, &goal).unwrap_err();
        assert_eq!(
            discrepancy,
            Discrepancy::CiviKilled {
                target,
                firing_position: Position::new(4, 3),
                civilians: vec![civilian.id().clone()],
            }
        );
        assert!(matches!(
            explain(&world, &agent, &goal, discrepancy),
            Explanation::Rebel(_)
        ));
    }

    #[test]
    fn valid_targets_exclude_endangering_ones() {
        let (mut world, agent, first) = open_field(Position::new(5, 3));
        let second = world
            .place_object(
                ObjectState::Npc {
                    alive: true,
                    civilian: false,
                },
                Position::new(5, 6),
            )
            .unwrap();
        world
            .place_object(
                ObjectState::Npc {
                    alive: true,
                    civilian: true,
                },
                Position::new(4, 5),
            )
            .unwrap();

        let targets = valid_targets(&world, &agent, None);
        assert_eq!(targets, vec![first.clone()]);
        assert!(valid_targets(&world, &agent, Some(&first)).is_empty());
        assert!(!targets.contains(second.id()));
    }

    #[test]
    fn graph_tracks_leaves_and_cascades_drops() {
        let parent = Goal::new(GoalPredicate::AgentAt(Position::new(4, 4)), owner());
        let child = Goal::subgoal(GoalPredicate::Open(Position::new(2, 2)), &parent);
        let other = Goal::new(GoalPredicate::AgentAt(Position::new(0, 4)), owner());

        let mut graph = GoalGraph::new();
        assert!(graph.add(parent.clone()));
        assert!(!graph.add(parent.clone()));
        graph.add(child.clone());
        graph.add(other.clone());
        assert_eq!(graph.leaves(), vec![&child, &other]);

        assert!(graph.achieve(&child));
        assert_eq!(graph.delivered(), 1);
        assert_eq!(graph.leaves(), vec![&parent, &other]);

        graph.add(child.clone());
        assert_eq!(graph.drop_goal(&parent), 2);
        assert_eq!(graph.leaves(), vec![&other]);
        assert_eq!(graph.delivered(), 1);
    }
}
