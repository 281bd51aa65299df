//! Mutiny agent runtime binary.
//!
//! One process speaks for one actor. Agents pursue the goals they receive
//! and rebel when a goal turns out to be wrong; operators issue goals and
//! answer rebellions.
//!
//! # Modules
//!
//! - [`config`] -- environment-driven configuration
//! - [`error`] -- runtime error types
//! - [`link`] -- rebellion dialog over the server mailboxes
//! - [`operator`] -- operator responder
//! - [`pursuit`] -- agent decision loop

mod config;
mod error;
mod link;
mod operator;
mod pursuit;

use mutiny_core::NegotiationPolicy;
use mutiny_protocol::WorldClient;
use mutiny_types::Role;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::AgentConfig;
use crate::operator::Responder;
use crate::pursuit::Pursuit;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = AgentConfig::from_env()?;
    info!(
        actor = %config.actor,
        role = ?config.role,
        server = config.server,
        cycle = ?config.cycle,
        "mutiny-agent starting"
    );

    let client = WorldClient::new(config.server.clone(), config.actor.clone());
    match config.role {
        Role::Operator => {
            Responder::new(client, config.goals, config.rebellion_choice, config.poll)
                .run(&config.server)
                .await?;
        }
        Role::Agent => {
            let policy = NegotiationPolicy {
                poll_interval: config.poll,
                deadline: config.rebellion_deadline,
            };
            Pursuit::new(client, config.cycle, policy)
                .run(&config.server)
                .await?;
        }
    }

    info!(actor = %config.actor, "mutiny-agent stopped");
    Ok(())
}
