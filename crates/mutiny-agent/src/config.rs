//! Configuration for the agent runtime.
//!
//! All configuration is loaded from environment variables so that one
//! binary can be launched many times with different identities.

use std::time::Duration;

use mutiny_types::{ActorId, GoalPredicate, Role};

use crate::error::AgentError;

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Server address, `host:port`.
    pub server: String,
    /// The actor this process speaks for.
    pub actor: ActorId,
    /// Agent or operator behaviour.
    pub role: Role,
    /// Delay between decision cycles.
    pub cycle: Duration,
    /// Delay between dialog polls.
    pub poll: Duration,
    /// Optional bound on how long a rebellion waits for an answer.
    pub rebellion_deadline: Option<Duration>,
    /// Goals an operator issues at start.
    pub goals: Vec<GoalOrder>,
    /// How an operator answers rebellions.
    pub rebellion_choice: ChoicePolicy,
}

/// A goal an operator issues to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalOrder {
    /// Who receives the goal.
    pub recipient: ActorId,
    /// What the goal is.
    pub target: OrderTarget,
}

/// The goal part of an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderTarget {
    /// A concrete goal token.
    Goal(GoalPredicate),
    /// `killed(*)`: one kill goal per hostile the operator knows about.
    AllEnemies,
}

/// How an operator answers a rebellion prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoicePolicy {
    /// Take the first alternative target, else keep the original.
    FirstTarget,
    /// Insist on the original goal.
    KeepOriginal,
    /// Let the agent stand down.
    StandDown,
    /// Reply with this number verbatim.
    Index(usize),
}

impl AgentConfig {
    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `MUTINY_ACTOR` -- actor id, e.g. `agent1`
    ///
    /// Optional variables:
    /// - `MUTINY_SERVER` -- server address (default `127.0.0.1:6000`)
    /// - `MUTINY_ROLE` -- `agent` or `operator` (default `agent`)
    /// - `MUTINY_CYCLE_MS` -- decision cycle in milliseconds (default 500)
    /// - `MUTINY_POLL_MS` -- dialog poll interval in milliseconds (default 500)
    /// - `MUTINY_REBELLION_DEADLINE_MS` -- give up on unanswered rebellions
    /// - `MUTINY_GOALS` -- operator orders, `agent1=agent-at(4,4);agent2=killed(*)`
    /// - `MUTINY_REBELLION_CHOICE` -- `first`, `keep`, `none`, or a number (default `keep`)
    pub fn from_env() -> Result<Self, AgentError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AgentError> {
        let actor = lookup("MUTINY_ACTOR")
            .ok_or_else(|| AgentError::Config(String::from("MUTINY_ACTOR is not set")))?
            .parse::<ActorId>()
            .map_err(|e| AgentError::Config(format!("invalid MUTINY_ACTOR: {e}")))?;

        let server = lookup("MUTINY_SERVER").unwrap_or_else(|| String::from("127.0.0.1:6000"));

        let role = match lookup("MUTINY_ROLE").as_deref().map(str::trim) {
            None | Some("agent") => Role::Agent,
            Some("operator") => Role::Operator,
            Some(other) => {
                return Err(AgentError::Config(format!(
                    "invalid MUTINY_ROLE {other:?}, expected agent or operator"
                )));
            }
        };

        let cycle = millis(&lookup, "MUTINY_CYCLE_MS", 500)?;
        let poll = millis(&lookup, "MUTINY_POLL_MS", 500)?;
        let rebellion_deadline = match lookup("MUTINY_REBELLION_DEADLINE_MS") {
            Some(raw) => Some(Duration::from_millis(raw.trim().parse().map_err(|e| {
                AgentError::Config(format!("invalid MUTINY_REBELLION_DEADLINE_MS: {e}"))
            })?)),
            None => None,
        };

        let goals = match lookup("MUTINY_GOALS") {
            Some(raw) => parse_orders(&raw)?,
            None => Vec::new(),
        };
        let rebellion_choice = match lookup("MUTINY_REBELLION_CHOICE") {
            Some(raw) => parse_choice_policy(&raw)?,
            None => ChoicePolicy::KeepOriginal,
        };

        Ok(Self {
            server,
            actor,
            role,
            cycle,
            poll,
            rebellion_deadline,
            goals,
            rebellion_choice,
        })
    }
}

fn millis(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<Duration, AgentError> {
    let ms = match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| AgentError::Config(format!("invalid {key}: {e}")))?,
        None => default,
    };
    Ok(Duration::from_millis(ms))
}

/// Parse `recipient=goal` orders separated by `;`.
pub fn parse_orders(raw: &str) -> Result<Vec<GoalOrder>, AgentError> {
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (recipient, goal) = entry.split_once('=').ok_or_else(|| {
                AgentError::Config(format!("invalid goal order {entry:?}, expected recipient=goal"))
            })?;
            let recipient = recipient
                .trim()
                .parse::<ActorId>()
                .map_err(|e| AgentError::Config(format!("invalid recipient in {entry:?}: {e}")))?;
            let goal = goal.trim();
            let target = if goal == "killed(*)" {
                OrderTarget::AllEnemies
            } else {
                OrderTarget::Goal(
                    goal.parse()
                        .map_err(|e| AgentError::Config(format!("invalid goal in {entry:?}: {e}")))?,
                )
            };
            Ok(GoalOrder { recipient, target })
        })
        .collect()
}

fn parse_choice_policy(raw: &str) -> Result<ChoicePolicy, AgentError> {
    match raw.trim() {
        "first" => Ok(ChoicePolicy::FirstTarget),
        "keep" => Ok(ChoicePolicy::KeepOriginal),
        "none" => Ok(ChoicePolicy::StandDown),
        other => other.parse::<usize>().map(ChoicePolicy::Index).map_err(|_| {
            AgentError::Config(format!(
                "invalid MUTINY_REBELLION_CHOICE {other:?}, expected first, keep, none, or a number"
            ))
        }),
    }
}
