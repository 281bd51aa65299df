//! Operator responder: issues configured goals and answers rebellions.

use std::time::Duration;

use mutiny_protocol::{DialogMessage, KnowledgeSnapshot, WorldClient};
use mutiny_types::{GoalPredicate, ObjectKind};
use mutiny_world::ObjectQuery;
use tracing::{info, warn};

use crate::config::{ChoicePolicy, GoalOrder, OrderTarget};
use crate::error::AgentError;
use crate::pursuit::MAX_MISSED_ROUNDS;

const REBELLION_PREFIX: &str = "rebellion:";
const OPTIONS_MARKER: &str = "reply with a number:";

/// The numbered options listed in a rebellion prompt.
pub fn prompt_options(prompt: &str) -> Vec<(usize, String)> {
    let Some((_, options)) = prompt.split_once(OPTIONS_MARKER) else {
        return Vec::new();
    };
    options
        .split(';')
        .filter_map(|option| {
            let (index, label) = option.trim().split_once(") ")?;
            Some((index.parse().ok()?, label.trim().to_owned()))
        })
        .collect()
}

/// The reply an operator following `policy` gives to `prompt`.
pub fn choose(prompt: &str, policy: ChoicePolicy) -> Option<usize> {
    let options = prompt_options(prompt);
    let find = |label: &str| {
        options
            .iter()
            .find(|(_, text)| text == label)
            .map(|(index, _)| *index)
    };
    match policy {
        ChoicePolicy::Index(index) => Some(index),
        ChoicePolicy::KeepOriginal => find("keep original"),
        ChoicePolicy::StandDown => find("none"),
        ChoicePolicy::FirstTarget => options
            .iter()
            .find(|(_, text)| text.starts_with("killed("))
            .map(|(index, _)| *index)
            .or_else(|| find("keep original")),
    }
}

/// Goals to send for `order`, given what the operator currently knows.
pub fn expand_order(order: &GoalOrder, snapshot: &KnowledgeSnapshot) -> Vec<GoalPredicate> {
    match &order.target {
        OrderTarget::Goal(goal) => vec![goal.clone()],
        OrderTarget::AllEnemies => snapshot
            .knowledge
            .view
            .query(&ObjectQuery::new().kind(ObjectKind::Npc).civilian(false).alive(true))
            .into_iter()
            .map(|npc| GoalPredicate::Killed(npc.id().clone()))
            .collect(),
    }
}

/// Operator runtime state.
#[derive(Debug)]
pub struct Responder {
    client: WorldClient,
    pending: Vec<GoalOrder>,
    policy: ChoicePolicy,
    poll: Duration,
}

impl Responder {
    /// A responder that will issue `orders` and answer with `policy`.
    pub const fn new(
        client: WorldClient,
        orders: Vec<GoalOrder>,
        policy: ChoicePolicy,
        poll: Duration,
    ) -> Self {
        Self {
            client,
            pending: orders,
            policy,
            poll,
        }
    }

    /// Run until the server goes away.
    pub async fn run(mut self, server: &str) -> Result<(), AgentError> {
        let mut missed = 0_u32;
        loop {
            let Some(snapshot) = self.client.observe().await else {
                missed = missed.saturating_add(1);
                if missed >= MAX_MISSED_ROUNDS {
                    return Err(AgentError::ServerGone {
                        addr: server.to_owned(),
                        rounds: missed,
                    });
                }
                tokio::time::sleep(self.poll).await;
                continue;
            };
            missed = 0;

            self.issue_orders(&snapshot).await;
            for message in self.client.dialogs(None).await {
                self.answer(&message).await;
            }
            tokio::time::sleep(self.poll).await;
        }
    }

    async fn issue_orders(&mut self, snapshot: &KnowledgeSnapshot) {
        let mut unsent = Vec::new();
        for order in std::mem::take(&mut self.pending) {
            let goals = expand_order(&order, snapshot);
            let mut delivered = true;
            for goal in &goals {
                if let GoalPredicate::Killed(target) = goal {
                    self.client.share(&order.recipient, target).await;
                }
                if self.client.send_goal(&order.recipient, goal).await {
                    info!(recipient = %order.recipient, goal = %goal, "Goal issued");
                } else {
                    delivered = false;
                }
            }
            if !delivered {
                unsent.push(order);
            }
        }
        self.pending = unsent;
    }

    async fn answer(&self, message: &DialogMessage) {
        if !message.text.starts_with(REBELLION_PREFIX) {
            info!(from = %message.from, text = %message.text, "Message received");
            return;
        }
        match choose(&message.text, self.policy) {
            Some(choice) => {
                info!(from = %message.from, choice, "Answering rebellion");
                self.client
                    .send_dialog(&message.from, &choice.to_string())
                    .await;
            }
            None => warn!(from = %message.from, prompt = %message.text, "No acceptable option"),
        }
    }
}
