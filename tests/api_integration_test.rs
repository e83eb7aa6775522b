//! HTTP API tests against a server bound to an ephemeral port.

mod common;

use std::sync::Arc;

use common::{chunk, orchestrator, registry_with_general, ScriptedAgent, StaticRetriever};
use provost::adapters::http::ApiServer;
use provost::domain::models::ServerConfig;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct TestServer {
    base_url: String,
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    async fn start() -> Self {
        let mut registry = registry_with_general();
        registry.register_shared(
            "students",
            ScriptedAgent::answering("students", "There are 412 students.").shared(),
        );
        registry.register_shared("staff", ScriptedAgent::failing("staff").shared());
        let retriever = Arc::new(StaticRetriever::with_chunks(vec![chunk(
            "h1",
            "Report cards go home in June.",
        )]));
        let orchestrator = Arc::new(orchestrator(registry, retriever));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let (stop, stopped) = oneshot::channel::<()>();
        let server = ApiServer::new(ServerConfig::default(), orchestrator);
        let handle = tokio::spawn(server.serve_on(listener, async move {
            let _ = stopped.await;
        }));

        Self {
            base_url,
            stop: Some(stop),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.handle.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await;
    let body = reqwest::get(server.url("/health")).await.unwrap().text().await.unwrap();
    assert_eq!(body, "OK");
    server.shutdown().await;
}

#[tokio::test]
async fn test_chat_returns_reply_and_trace() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/api/v1/chat"))
        .json(&json!({"message": "show students", "session_id": "web-1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["reply"], "There are 412 students.");
    assert_eq!(body["intent"], "students");
    assert_eq!(body["session_id"], "web-1");
    assert_eq!(body["partial_failure"], false);
    assert_eq!(body["agent_trace"][0]["agent_id"], "students");
    assert_eq!(body["agent_trace"][0]["status"], "ok");
    assert_eq!(body["envelopes"][0]["tone"], "informative");
    server.shutdown().await;
}

#[tokio::test]
async fn test_chat_reports_partial_failure() {
    let server = TestServer::start().await;

    let body: Value = reqwest::Client::new()
        .post(server.url("/api/v1/chat"))
        .json(&json!({"message": "list staff"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // staff fails, the general fallback answers from the handbook.
    assert_eq!(body["partial_failure"], true);
    assert_eq!(body["agent_trace"][0]["status"], "error");
    assert_eq!(body["agent_trace"][1]["agent_id"], "general");
    assert!(body["reply"].as_str().unwrap().contains("Report cards go home in June."));
    server.shutdown().await;
}

#[tokio::test]
async fn test_blank_message_is_bad_request() {
    let server = TestServer::start().await;

    let response = reqwest::Client::new()
        .post(server.url("/api/v1/chat"))
        .json(&json!({"message": "  "}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "invalid_request");
    server.shutdown().await;
}

#[tokio::test]
async fn test_rag_endpoint_answers_latest_user_turn() {
    let server = TestServer::start().await;

    let body: Value = reqwest::Client::new()
        .post(server.url("/api/v1/rag"))
        .json(&json!({
            "index": "handbook",
            "messages": [
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "Hello!"},
                {"role": "user", "content": "when do report cards go home?"}
            ]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["intent"], "unknown");
    assert!(body["answer"].as_str().unwrap().contains("June"));
    assert_eq!(body["agent_trace"][0]["agent_id"], "general");
    server.shutdown().await;
}

#[tokio::test]
async fn test_admin_and_catalog_endpoints() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let reindex: Value = client
        .post(server.url("/api/v1/admin/reindex"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reindex["loaded_chunks"], 1);

    let agents: Value = client.get(server.url("/api/v1/agents")).send().await.unwrap().json().await.unwrap();
    let intents: Vec<&str> = agents
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["intent"].as_str().unwrap())
        .collect();
    assert_eq!(intents, vec!["general", "staff", "students"]);

    let rules: Value = client.get(server.url("/api/v1/rules")).send().await.unwrap().json().await.unwrap();
    assert!(rules
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r["name"] == "students_create" && r["action"] == "create"));
    server.shutdown().await;
}
