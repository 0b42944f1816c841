//! Command handler behavior against the in-memory unit of work.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;

use application::{
    ApplicationError, ArenaTx, CommandHandler, CreateArena, EventPublisher, InMemoryTx,
    InMemoryUnitOfWork, LifecycleCommand, NoopPublisher, OutboxPublisher, UnitOfWork,
};
use common::clock::SystemClock;
use common::types::ArenaId;
use domain::{ArenaConfig, ArenaEvent, ArenaStatus, Temperature};
use outbox::{InMemoryOutboxStore, OutboxStatus};

fn config() -> ArenaConfig {
    ArenaConfig {
        tick_millis: 100,
        width: 50,
        height: 50,
        diffusion_rate: 0.2,
        mutation_rate: 0.01,
        max_organisms: 1000,
        snapshot_every_ticks: 10,
        temperature: Temperature::celsius(25.0),
    }
}

fn fixture() -> (
    CommandHandler<InMemoryUnitOfWork, OutboxPublisher>,
    InMemoryUnitOfWork,
    Arc<InMemoryOutboxStore>,
) {
    let clock = Arc::new(SystemClock);
    let store = Arc::new(InMemoryOutboxStore::new(clock.clone()));
    let uow = InMemoryUnitOfWork::new(store.clone());
    let publisher = OutboxPublisher::new("arena.events", 5, clock.clone());
    let handler = CommandHandler::new(uow.clone(), publisher, clock);
    (handler, uow, store)
}

fn create_command(name: &str) -> CreateArena {
    CreateArena {
        name: name.to_string(),
        config: config(),
        created_by: None,
    }
}

#[tokio::test]
async fn create_arena_persists_state_and_enqueues_one_event() {
    let (handler, uow, store) = fixture();

    let id = handler.create_arena(create_command("Dish-1")).await.unwrap();

    let arena = uow.arena(id).await.unwrap();
    assert_eq!(arena.name(), "Dish-1");
    assert_eq!(arena.status(), ArenaStatus::Pending);
    assert_eq!(arena.pending_events(), 0);

    let rows = store.all().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, OutboxStatus::Pending);
    assert_eq!(rows[0].event_type, "ArenaCreated");
    assert_eq!(rows[0].aggregate_id, id.to_string());
    assert_eq!(rows[0].aggregate_type, "arena");
    assert_eq!(rows[0].payload["name"], "Dish-1");
    assert_eq!(rows[0].headers["schemaVersion"], 1);
    assert!(rows[0].headers["occurredAt"].is_string());
}

#[tokio::test]
async fn short_name_fails_validation_with_no_side_effects() {
    let (handler, uow, store) = fixture();

    let err = handler.create_arena(create_command("ab")).await.unwrap_err();
    assert!(matches!(err, ApplicationError::Validation(_)));
    assert_eq!(uow.arena_count().await, 0);
    assert!(store.all().await.is_empty());
}

#[tokio::test]
async fn invalid_config_fails_validation_with_no_side_effects() {
    let (handler, uow, store) = fixture();

    let command = CreateArena {
        config: ArenaConfig {
            diffusion_rate: 2.0,
            ..config()
        },
        ..create_command("Dish-1")
    };
    let err = handler.create_arena(command).await.unwrap_err();
    assert!(matches!(err, ApplicationError::Validation(_)));
    assert_eq!(uow.arena_count().await, 0);
    assert!(store.all().await.is_empty());
}

#[tokio::test]
async fn lifecycle_commands_transition_and_enqueue() {
    let (handler, uow, store) = fixture();
    let id = handler.create_arena(create_command("Dish-1")).await.unwrap();

    let command = LifecycleCommand {
        arena_id: id,
        actor: None,
    };
    handler.start_arena(command).await.unwrap();
    assert_eq!(uow.arena(id).await.unwrap().status(), ArenaStatus::Running);

    handler.pause_arena(command).await.unwrap();
    assert_eq!(uow.arena(id).await.unwrap().status(), ArenaStatus::Paused);

    handler.resume_arena(command).await.unwrap();
    handler.stop_arena(command).await.unwrap();
    assert_eq!(uow.arena(id).await.unwrap().status(), ArenaStatus::Finished);

    let types: Vec<String> = store.all().await.into_iter().map(|r| r.event_type).collect();
    assert_eq!(
        types,
        vec![
            "ArenaCreated",
            "ArenaStarted",
            "ArenaPaused",
            "ArenaResumed",
            "ArenaStopped",
        ]
    );
}

#[tokio::test]
async fn stopping_twice_enqueues_no_second_event() {
    let (handler, _uow, store) = fixture();
    let id = handler.create_arena(create_command("Dish-1")).await.unwrap();
    let command = LifecycleCommand {
        arena_id: id,
        actor: None,
    };

    handler.stop_arena(command).await.unwrap();
    handler.stop_arena(command).await.unwrap();

    let types: Vec<String> = store.all().await.into_iter().map(|r| r.event_type).collect();
    assert_eq!(types, vec!["ArenaCreated", "ArenaStopped"]);
}

#[tokio::test]
async fn lifecycle_on_unknown_arena_is_not_found() {
    let (handler, _uow, _store) = fixture();
    let err = handler
        .start_arena(LifecycleCommand {
            arena_id: ArenaId::new(),
            actor: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ApplicationError::NotFound(_)));
}

#[tokio::test]
async fn domain_rejection_rolls_back_cleanly() {
    let (handler, uow, store) = fixture();
    let id = handler.create_arena(create_command("Dish-1")).await.unwrap();
    let command = LifecycleCommand {
        arena_id: id,
        actor: None,
    };

    // Pause from Pending is a domain error; nothing must be written.
    let err = handler.pause_arena(command).await.unwrap_err();
    assert!(matches!(err, ApplicationError::Domain(_)));
    assert_eq!(uow.arena(id).await.unwrap().status(), ArenaStatus::Pending);
    assert_eq!(store.all().await.len(), 1);
}

struct FailingPublisher;

#[async_trait]
impl EventPublisher<InMemoryTx> for FailingPublisher {
    async fn publish(
        &self,
        _tx: &mut InMemoryTx,
        _events: Vec<ArenaEvent>,
    ) -> Result<(), ApplicationError> {
        Err(ApplicationError::Publish("enqueue refused".to_string()))
    }
}

#[tokio::test]
async fn publisher_failure_rolls_back_the_arena_save() {
    let clock = Arc::new(SystemClock);
    let store = Arc::new(InMemoryOutboxStore::new(clock.clone()));
    let uow = InMemoryUnitOfWork::new(store.clone());
    let handler = CommandHandler::new(uow.clone(), FailingPublisher, clock);

    let err = handler.create_arena(create_command("Dish-1")).await.unwrap_err();
    assert!(matches!(err, ApplicationError::Publish(_)));
    assert_eq!(uow.arena_count().await, 0);
    assert!(store.all().await.is_empty());
}

#[tokio::test]
async fn noop_publisher_commits_state_without_outbox_rows() {
    let clock = Arc::new(SystemClock);
    let store = Arc::new(InMemoryOutboxStore::new(clock.clone()));
    let uow = InMemoryUnitOfWork::new(store.clone());
    let handler = CommandHandler::new(uow.clone(), NoopPublisher, clock);

    let id = handler.create_arena(create_command("Dish-1")).await.unwrap();
    assert!(uow.arena(id).await.is_some());
    assert!(store.all().await.is_empty());
}

#[tokio::test]
async fn within_transaction_commits_on_ok_and_rolls_back_on_err() {
    let clock = Arc::new(SystemClock);
    let store = Arc::new(InMemoryOutboxStore::new(clock));
    let uow = InMemoryUnitOfWork::new(store);

    let id = ArenaId::new();
    let arena = domain::Arena::new(id, "Dish-1", config(), chrono::Utc::now()).unwrap();

    let committed = arena.clone();
    uow.within_transaction(move |tx| {
        async move {
            tx.save_arena(&committed).await?;
            Ok(())
        }
        .boxed()
    })
    .await
    .unwrap();
    assert!(uow.arena(id).await.is_some());

    let discarded_id = ArenaId::new();
    let discarded = domain::Arena::new(discarded_id, "Dish-2", config(), chrono::Utc::now()).unwrap();
    let result: Result<(), ApplicationError> = uow
        .within_transaction(move |tx| {
            async move {
                tx.save_arena(&discarded).await?;
                Err(ApplicationError::Storage("deliberate failure".to_string()))
            }
            .boxed()
        })
        .await;
    assert!(result.is_err());
    assert!(uow.arena(discarded_id).await.is_none());
}
