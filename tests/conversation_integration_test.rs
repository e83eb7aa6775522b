//! Conversation state persistence against a file-backed SQLite database.

mod common;

use std::sync::Arc;

use common::{orchestrator, registry_with_general, ScriptedAgent, StaticRetriever};
use provost::adapters::sqlite::{initialize_database, Migrator, SqliteConversationRepository};
use provost::domain::models::{state_keys, DatabaseConfig, OrchestrationRequest, SaveOutcome};
use provost::domain::ports::ConversationRepository;
use provost::services::ConversationService;
use serde_json::json;
use tempfile::TempDir;

async fn file_repository(dir: &TempDir) -> SqliteConversationRepository {
    let config = DatabaseConfig {
        path: dir.path().join("state/provost.db").display().to_string(),
        max_connections: 4,
    };
    SqliteConversationRepository::new(initialize_database(&config).await.unwrap())
}

#[tokio::test]
async fn test_initialize_database_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig {
        path: dir.path().join("provost.db").display().to_string(),
        max_connections: 2,
    };

    let first = initialize_database(&config).await.unwrap();
    let version = Migrator::new(first.clone()).get_current_version().await.unwrap();
    first.close().await;

    let second = initialize_database(&config).await.unwrap();
    assert_eq!(
        Migrator::new(second).get_current_version().await.unwrap(),
        version
    );
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    file_repository(&dir)
        .await
        .save("c-1", &json!({"turn_count": 3, "last_intent": "staff"}))
        .await
        .unwrap();

    let reopened = file_repository(&dir).await;
    let state = reopened.load("c-1").await.unwrap().unwrap();
    assert_eq!(state.turn_count(), 3);
    assert_eq!(state.get("last_intent"), Some(&json!("staff")));
}

#[tokio::test]
async fn test_concurrent_saves_keep_one_row_per_conversation() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(file_repository(&dir).await);

    let writes = (0..20).map(|i| {
        let repo = Arc::clone(&repo);
        async move {
            let id = format!("c-{}", i % 5);
            repo.save(&id, &json!({ "turn_count": i })).await
        }
    });
    for outcome in futures::future::join_all(writes).await {
        assert_eq!(outcome.unwrap(), SaveOutcome::Saved);
    }

    assert_eq!(repo.count().await.unwrap(), 5);
}

#[tokio::test]
async fn test_non_object_state_is_counted_not_stored() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(file_repository(&dir).await);
    let service = ConversationService::new(repo.clone(), 10);

    assert_eq!(
        service.save("c-1", &json!(["not", "a", "map"])).await,
        Some(SaveOutcome::IgnoredNonObject)
    );
    assert_eq!(service.save("c-1", &json!("text")).await, Some(SaveOutcome::IgnoredNonObject));
    assert_eq!(service.ignored_writes(), 2);
    assert_eq!(service.failed_writes(), 0);
    assert!(repo.load("c-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_orchestrator_checkpoints_each_turn() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(file_repository(&dir).await);
    let conversations = Arc::new(ConversationService::new(repo.clone(), 10));

    let mut registry = registry_with_general();
    registry.register_shared("students", ScriptedAgent::answering("students", "412").shared());
    registry.register_shared("staff", ScriptedAgent::answering("staff", "58").shared());
    let orchestrator =
        orchestrator(registry, Arc::new(StaticRetriever::empty())).with_conversations(conversations);

    let first = orchestrator
        .handle(OrchestrationRequest::chat("how big is the student body", Some("s-1".to_string())))
        .await
        .unwrap();
    assert!(!first.execution_state.contains_key(state_keys::PRIOR_STATE));

    let second = orchestrator
        .handle(OrchestrationRequest::chat("and the teachers?", Some("s-1".to_string())))
        .await
        .unwrap();
    assert_eq!(
        second.execution_state[state_keys::PRIOR_STATE]["last_intent"],
        json!("students")
    );
    assert_eq!(second.execution_state[state_keys::PRIOR_STATE]["turn_count"], 1);

    let saved = repo.load("s-1").await.unwrap().unwrap();
    assert_eq!(saved.turn_count(), 2);
    assert_eq!(saved.get("last_intent"), Some(&json!("staff")));
    assert_eq!(saved.get("last_workflow"), Some(&json!("single_agent")));
    let history = saved.get("history").unwrap().as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["user"], "how big is the student body");
    assert_eq!(history[1]["assistant"], "58");
    assert_eq!(repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_history_is_capped() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(file_repository(&dir).await);
    let conversations = Arc::new(ConversationService::new(repo.clone(), 2));
    let orchestrator = orchestrator(registry_with_general(), Arc::new(StaticRetriever::empty()))
        .with_conversations(conversations);

    for turn in ["one", "two", "three"] {
        orchestrator
            .handle(OrchestrationRequest::chat(turn, Some("s-2".to_string())))
            .await
            .unwrap();
    }

    let saved = repo.load("s-2").await.unwrap().unwrap();
    assert_eq!(saved.turn_count(), 3);
    let history = saved.get("history").unwrap().as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["user"], "two");
}
