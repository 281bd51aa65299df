//! End-to-end tests driving a real server over TCP.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use mutiny_core::{EndReason, ResultRecord, SimulationConfig};
use mutiny_protocol::{SERVER_SENDER, TERMINATOR, WorldClient};
use mutiny_server::{Server, ServerError};
use mutiny_types::{ActorId, Direction, GoalPredicate, Position, Role, RunId};
use mutiny_world::{Action, Actor, ObjectState, World};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Running {
    addr: SocketAddr,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<ResultRecord, ServerError>>,
    results_dir: PathBuf,
}

impl Running {
    fn client(&self, user: &str) -> WorldClient {
        WorldClient::new(self.addr.to_string(), id(user)).with_timeout(Duration::from_secs(2))
    }

    async fn stop(mut self) -> ResultRecord {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let record = self.task.await.unwrap().unwrap();
        std::fs::remove_dir_all(&self.results_dir).unwrap();
        record
    }
}

fn id(name: &str) -> ActorId {
    name.parse().unwrap()
}

/// 5x5 world: wall right of agent1, a hostile NPC, a civilian, and an
/// operator in the far corner.
fn test_world() -> World {
    let mut world = World::new(5, 1).unwrap();
    world
        .place_object(ObjectState::Wall, Position::new(1, 0))
        .unwrap();
    world
        .place_object(
            ObjectState::Npc {
                alive: true,
                civilian: false,
            },
            Position::new(1, 2),
        )
        .unwrap();
    world
        .place_object(
            ObjectState::Npc {
                alive: true,
                civilian: true,
            },
            Position::new(4, 0),
        )
        .unwrap();
    world
        .add_actor(Actor::new(id("agent1"), Role::Agent, Position::new(0, 0), 2))
        .unwrap();
    world
        .add_actor(Actor::new(id("agent2"), Role::Agent, Position::new(0, 4), 2))
        .unwrap();
    world
        .add_actor(Actor::new(id("op"), Role::Operator, Position::new(4, 4), 1))
        .unwrap();
    world
}

async fn start(world: World, time_limit_secs: u64) -> Running {
    let mut config = SimulationConfig::default();
    config.server.host = String::from("127.0.0.1");
    config.server.port = 0;
    config.server.termination_check_ms = 20;
    config.run.time_limit_secs = time_limit_secs;
    let results_dir = std::env::temp_dir().join(format!("mutiny-server-test-{}", RunId::new()));
    config.run.results_dir = results_dir.clone();

    let server = Server::bind(config, world).await.unwrap();
    let addr = server.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(server.run(async move {
        let _ = stopped.await;
    }));
    Running {
        addr,
        stop: Some(stop),
        task,
        results_dir,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn wall_move_fails_with_receipt() {
    let server = start(test_world(), 60).await;
    let agent = server.client("agent1");

    assert!(agent.act(Action::Move(Direction::Right)).await);
    let receipts = agent.dialogs(Some(SERVER_SENDER)).await;
    assert_eq!(receipts.len(), 1);
    assert!(receipts[0].text.starts_with("failed move:right"));

    let actor = agent.agent().await.unwrap();
    assert_eq!(actor.position, Position::new(0, 0));

    let record = server.stop().await;
    assert_eq!(record.end_reason, EndReason::Shutdown);
    assert!(record.event_log.contains("failed move:right"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn goal_queue_is_ordered_and_draining() {
    let server = start(test_world(), 60).await;
    let op = server.client("op");
    let agent = server.client("agent1");

    let first = GoalPredicate::AgentAt(Position::new(0, 3));
    let second = GoalPredicate::Open(Position::new(2, 2));
    for round in 0..100 {
        assert!(op.send_goal(&id("agent1"), &first).await);
        assert!(op.send_goal(&id("agent1"), &second).await);

        let goals = agent.goals().await;
        let tokens: Vec<&str> = goals.iter().map(|g| g.goal.as_str()).collect();
        assert_eq!(tokens, ["agent-at(0,3)", "open(2,2)"], "round {round}");
        assert!(goals.iter().all(|g| g.owner == id("op")));
        assert!(agent.goals().await.is_empty(), "round {round}");
    }

    server.stop().await;
}

#[tokio::test]
async fn dialog_filter_takes_only_matching_sender() {
    let server = start(test_world(), 60).await;
    let op = server.client("op");
    let other = server.client("agent2");
    let agent = server.client("agent1");

    assert!(op.send_dialog("agent1", "hold position").await);
    assert!(other.send_dialog("agent1", "on my way").await);

    let from_op = agent.dialogs(Some("op")).await;
    assert_eq!(from_op.len(), 1);
    assert_eq!(from_op[0].text, "hold position");

    let rest = agent.dialogs(None).await;
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].from, "agent2");
    assert!(agent.dialogs(None).await.is_empty());

    server.stop().await;
}

#[tokio::test]
async fn unknown_message_type_closes_the_connection() {
    let server = start(test_world(), 60).await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    let mut request = b"TELEPORT_REQ:agent1:4,4".to_vec();
    request.push(TERMINATOR);
    stream.write_all(&request).await.unwrap();
    let mut reply = Vec::new();
    let read = tokio::time::timeout(Duration::from_secs(2), stream.read_to_end(&mut reply))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(read, 0);

    // The server itself keeps serving.
    let snapshot = server.client("agent1").observe().await.unwrap();
    assert_eq!(snapshot.actor.position, Position::new(0, 0));

    server.stop().await;
}

#[tokio::test]
async fn snapshot_is_fogged_but_operator_sees_enemies() {
    let server = start(test_world(), 60).await;

    let agent = server.client("agent1").observe().await.unwrap();
    let view = &agent.knowledge.view;
    assert!(!view.objects_at(Position::new(1, 2)).is_empty());
    assert!(view.objects_at(Position::new(4, 0)).is_empty());

    let op = server.client("op").observe().await.unwrap();
    assert!(!op.knowledge.view.objects_at(Position::new(1, 2)).is_empty());

    server.stop().await;
}

#[tokio::test]
async fn eliminating_every_enemy_ends_the_run() {
    let server = start(test_world(), 60).await;
    let agent = server.client("agent1");

    for action in [
        Action::Move(Direction::Down),
        Action::Arm,
        Action::Arm,
        Action::Detonate,
    ] {
        assert!(agent.act(action).await);
    }

    let record = tokio::time::timeout(Duration::from_secs(5), server.task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(record.end_reason, EndReason::AllEnemiesEliminated);
    assert!((record.score.enemy_kill_rate - 1.0).abs() < f64::EPSILON);
    assert!((record.score.civilian_survival_rate - 1.0).abs() < f64::EPSILON);

    let written = server.results_dir.join(format!("{}.json", record.run_id));
    assert!(written.exists());
    std::fs::remove_dir_all(&server.results_dir).unwrap();
}

#[tokio::test]
async fn zero_time_limit_times_out() {
    let server = start(test_world(), 0).await;
    let record = tokio::time::timeout(Duration::from_secs(5), server.task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(record.end_reason, EndReason::Timeout);
    std::fs::remove_dir_all(&server.results_dir).unwrap();
}
