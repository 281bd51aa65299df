//! Goal pursuit for agents: observe, validate, explain, step.
//!
//! Each cycle the agent drains newly queued goals into its goal graph,
//! refreshes its knowledge, and works on the first leaf goal. A valid goal
//! yields one action; a discrepant one is explained and dropped,
//! decomposed, or contested with its owner.

use std::time::Duration;

use mutiny_core::goals::{explain, firing_position};
use mutiny_core::{
    Discrepancy, Explanation, GoalGraph, NegotiationPolicy, PlanState, Resolution, negotiate,
};
use mutiny_protocol::{SERVER_SENDER, WorldClient};
use mutiny_types::{ArmedState, Goal, GoalPredicate, ObjectKind, Position};
use mutiny_world::{Action, ObjectQuery, ObjectState};
use tracing::{debug, info, warn};

use crate::error::AgentError;
use crate::link::DialogLink;

/// Consecutive failed snapshots before the server is considered gone.
pub const MAX_MISSED_ROUNDS: u32 = 20;

/// What to do about the current goal this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Send this action.
    Act(Action),
    /// The goal already holds.
    Achieved,
    /// The goal no longer makes sense.
    Discrepant(Discrepancy),
    /// Nothing useful to do yet.
    Idle,
}

/// Decide the next step for `goal`.
///
/// A goal the owner insisted on is pursued even when it would kill
/// civilians.
pub fn next_step(plan: &PlanState, goal: &Goal, insisted: bool) -> Step {
    if plan.goal_complete(goal) {
        return Step::Achieved;
    }
    match plan.valid_goal(goal) {
        Err(Discrepancy::CiviKilled { .. }) if insisted => {}
        Err(discrepancy) => return Step::Discrepant(discrepancy),
        Ok(()) => {}
    }
    step_toward(plan, goal).map_or(Step::Idle, Step::Act)
}

/// One action that makes progress on a valid goal.
pub fn step_toward(plan: &PlanState, goal: &Goal) -> Option<Action> {
    let actor = plan.actor();
    let view = plan.view();
    match &goal.predicate {
        GoalPredicate::AgentAt(dest) => move_toward(plan, *dest),
        GoalPredicate::Open(target) => {
            let lock = view.occupant(*target)?;
            if !actor.has_key_for(lock.id()) {
                let key = view
                    .query(&ObjectQuery::new().kind(ObjectKind::Key))
                    .into_iter()
                    .find(|key| {
                        matches!(key.state(), ObjectState::Key { unlocks, taken: false } if unlocks == lock.id())
                    })?;
                return move_toward(plan, key.position());
            }
            if actor.position.is_adjacent(*target) {
                return Some(Action::Unlock(*target));
            }
            move_toward(plan, firing_position(view, actor, *target))
        }
        GoalPredicate::Killed(target) => {
            let npc = view.object(target)?;
            let stand = firing_position(view, actor, npc.position());
            if actor.position != stand {
                return move_toward(plan, stand);
            }
            Some(match actor.armed {
                ArmedState::Armed => Action::Detonate,
                ArmedState::Unarmed | ArmedState::Arming => Action::Arm,
            })
        }
    }
}

fn move_toward(plan: &PlanState, dest: Position) -> Option<Action> {
    plan.navigate(dest, false)?
        .first()
        .copied()
        .map(Action::Move)
}

// ---------------------------------------------------------------------------
// Runtime loop
// ---------------------------------------------------------------------------

/// Agent runtime state.
#[derive(Debug)]
pub struct Pursuit {
    client: WorldClient,
    link: DialogLink,
    graph: GoalGraph,
    insisted: Vec<Goal>,
    policy: NegotiationPolicy,
    cycle: Duration,
}

impl Pursuit {
    /// A pursuit loop for the client's actor.
    pub fn new(client: WorldClient, cycle: Duration, policy: NegotiationPolicy) -> Self {
        Self {
            link: DialogLink::new(client.clone()),
            client,
            graph: GoalGraph::new(),
            insisted: Vec::new(),
            policy,
            cycle,
        }
    }

    /// Run until the actor stands down or the server goes away.
    pub async fn run(mut self, server: &str) -> Result<(), AgentError> {
        let mut missed = 0_u32;
        loop {
            self.collect_goals().await;

            let Some(snapshot) = self.client.observe().await else {
                missed = missed.saturating_add(1);
                if missed >= MAX_MISSED_ROUNDS {
                    return Err(AgentError::ServerGone {
                        addr: server.to_owned(),
                        rounds: missed,
                    });
                }
                tokio::time::sleep(self.cycle).await;
                continue;
            };
            missed = 0;

            let actor = snapshot.into_actor();
            if !actor.active {
                info!(actor = %actor.id, delivered = self.graph.delivered(), "Actor inactive, stopping");
                return Ok(());
            }
            let plan = PlanState::new(&actor);
            if !self.work(&plan).await {
                info!(actor = %actor.id, delivered = self.graph.delivered(), "Stood down");
                return Ok(());
            }

            for receipt in self.client.dialogs(Some(SERVER_SENDER)).await {
                debug!(actor = %actor.id, receipt = %receipt.text, "Receipt");
            }
            tokio::time::sleep(self.cycle).await;
        }
    }

    async fn collect_goals(&mut self) {
        for envelope in self.client.goals().await {
            match Goal::parse(&envelope.goal, envelope.owner.clone()) {
                Ok(goal) => {
                    if self.graph.add(goal.clone()) {
                        info!(goal = %goal, owner = %goal.owner, "Goal received");
                    }
                }
                Err(err) => warn!(goal = %envelope.goal, error = %err, "Ignoring unparsable goal"),
            }
        }
    }

    /// Work one cycle on the first leaf goal. Returns false on stand-down.
    async fn work(&mut self, plan: &PlanState) -> bool {
        let Some(goal) = self.graph.leaves().first().map(|goal| (*goal).clone()) else {
            return true;
        };
        let insisted = self.insisted.contains(&goal);

        match next_step(plan, &goal, insisted) {
            Step::Act(action) => {
                debug!(goal = %goal, action = %action, "Acting");
                self.client.act(action).await;
            }
            Step::Idle => debug!(goal = %goal, "No progress possible this cycle"),
            Step::Achieved => {
                self.graph.achieve(&goal);
                self.insisted.retain(|g| g != &goal);
                info!(goal = %goal, delivered = self.graph.delivered(), "Goal achieved");
                self.client
                    .send_dialog(goal.owner.as_str(), &format!("achieved {goal}"))
                    .await;
            }
            Step::Discrepant(discrepancy) => {
                return self.resolve(plan, goal, discrepancy).await;
            }
        }
        true
    }

    async fn resolve(&mut self, plan: &PlanState, goal: Goal, discrepancy: Discrepancy) -> bool {
        match explain(plan.view(), plan.actor(), &goal, discrepancy) {
            Explanation::Drop(reason) => {
                let dropped = self.graph.drop_goal(&goal);
                info!(goal = %goal, reason = reason.tag(), dropped, "Goal dropped");
                self.client
                    .send_dialog(goal.owner.as_str(), &format!("dropped {goal}: {reason}"))
                    .await;
            }
            Explanation::Decompose(subgoal) => {
                info!(goal = %goal, subgoal = %subgoal, "Goal decomposed");
                self.graph.add(subgoal);
            }
            Explanation::Rebel(rebellion) => {
                self.graph.drop_goal(&goal);
                match negotiate(&self.link, &rebellion, &self.policy).await {
                    Ok(Resolution::NewGoal(next)) => {
                        self.graph.add(next);
                    }
                    Ok(Resolution::KeepOriginal(original)) => {
                        self.insisted.push(original.clone());
                        self.graph.add(original);
                    }
                    Ok(Resolution::StandDown) => {
                        self.client.stand_down().await;
                        return false;
                    }
                    Err(err) => warn!(goal = %goal, error = %err, "Rebellion unanswered, goal dropped"),
                }
            }
        }
        true
    }
}
