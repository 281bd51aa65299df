//! Listener lifecycle for one simulation run.
//!
//! [`Server::run`] accepts connections until the run ends (time limit,
//! every enemy eliminated, or the caller's shutdown future), then aborts
//! outstanding connections, freezes the result record, and writes it to
//! the results directory.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use mutiny_core::{EndReason, ResultRecord, SimulationConfig, SimulationRun};
use mutiny_world::World;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::connection::handle_connection;
use crate::error::ServerError;
use crate::owner::spawn_owner;
use crate::state::WorldState;

/// A bound server ready to run.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    config: SimulationConfig,
    world: World,
}

impl Server {
    /// Bind the configured address for `world`.
    pub async fn bind(config: SimulationConfig, world: World) -> Result<Self, ServerError> {
        let addr = format!("{}:{}", config.server.host, config.server.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        Ok(Self {
            listener,
            config,
            world,
        })
    }

    /// The address actually bound, useful with port 0.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until the run ends, then write and return its result record.
    pub async fn run<F>(self, shutdown: F) -> Result<ResultRecord, ServerError>
    where
        F: Future<Output = ()>,
    {
        let Self {
            listener,
            config,
            world,
        } = self;
        let time_limit = Duration::from_secs(config.run.time_limit_secs);
        let read_timeout = Duration::from_millis(config.server.read_timeout_ms);
        let check_every = Duration::from_millis(config.server.termination_check_ms.max(1));

        let run = SimulationRun::start(&world, time_limit);
        let run_id = run.id();
        let (handle, mut ended, owner) = spawn_owner(WorldState::new(world, run));
        let mut connections = JoinSet::new();
        let mut ticker = tokio::time::interval(check_every);
        tokio::pin!(shutdown);

        info!(
            run_id = %run_id,
            addr = %listener.local_addr()?,
            "Mutiny server listening"
        );

        let reason = loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let handle = handle.clone();
                        connections.spawn(async move {
                            if let Err(err) = handle_connection(stream, handle, read_timeout).await {
                                warn!(%peer, error = %err, "Connection ended with error");
                            }
                        });
                    }
                    Err(err) => warn!(error = %err, "Accept failed"),
                },
                changed = ended.changed() => {
                    if changed.is_err() {
                        break EndReason::Shutdown;
                    }
                    if let Some(reason) = *ended.borrow_and_update() {
                        break reason;
                    }
                }
                _ = ticker.tick() => {
                    if let Some(reason) = handle.check_termination().await? {
                        break reason;
                    }
                }
                () = &mut shutdown => break EndReason::Shutdown,
                Some(_) = connections.join_next() => {}
            }
        };

        info!(run_id = %run_id, %reason, "Run ending, closing connections");
        drop(listener);
        connections.abort_all();
        while connections.join_next().await.is_some() {}

        let record = handle.finish(reason).await?;
        if let Err(err) = owner.await {
            error!(error = %err, "World owner task failed");
        }
        let path = record.write_to(&config.run.results_dir)?;
        info!(
            run_id = %run_id,
            path = %path.display(),
            enemy_kill_rate = record.score.enemy_kill_rate,
            civilian_survival_rate = record.score.civilian_survival_rate,
            "Run finished"
        );
        Ok(record)
    }
}
