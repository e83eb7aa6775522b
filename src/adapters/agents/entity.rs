//! List-endpoint agents, one per data-service entity.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{AgentRequest, AgentResult, AgentStatus, RuleAction};
use crate::domain::ports::{Agent, DataService};

/// Records named in the answer text; the full list goes in `data.items`.
const PREVIEW_ROWS: usize = 5;

/// Fields tried, in order, to label a record in the answer text.
const LABEL_FIELDS: [&str; 4] = ["name", "full_name", "title", "id"];

pub struct EntityListAgent {
    entity: String,
    name: String,
    data: Arc<dyn DataService>,
}

impl EntityListAgent {
    pub fn new(entity: impl Into<String>, data: Arc<dyn DataService>) -> Self {
        let entity = entity.into();
        let name = display_name(&entity);
        Self { entity, name, data }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    fn filters_for(action: &RuleAction) -> Vec<(String, String)> {
        match action {
            RuleAction::ShowWithdrawn(_) => vec![("status".to_string(), "withdrawn".to_string())],
            _ => Vec::new(),
        }
    }
}

fn display_name(entity: &str) -> String {
    let mut chars = entity.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>().replace('_', " "),
        None => String::new(),
    }
}

fn label(item: &Value) -> String {
    LABEL_FIELDS
        .iter()
        .find_map(|field| match item.get(*field) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| item.to_string())
}

#[async_trait]
impl Agent for EntityListAgent {
    fn id(&self) -> &str {
        &self.entity
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, request: AgentRequest) -> DomainResult<AgentResult> {
        if request.action.is_mutation() {
            let answer = format!(
                "I can't {} {} records from chat. Please use the {} screen in the district portal.",
                request.action, self.entity, self.name
            );
            return Ok(AgentResult::ok(&self.entity, &self.name, &request.intent, answer)
                .with_status(AgentStatus::Partial)
                .with_session(request.session_id)
                .with_data(json!({ "entity": self.entity, "requested_action": request.action })));
        }

        let filters = Self::filters_for(&request.action);
        let items = self
            .data
            .list(&self.entity, &filters)
            .await
            .map_err(|e| DomainError::AgentFailed {
                agent_id: self.entity.clone(),
                reason: e.to_string(),
            })?;
        tracing::debug!(entity = %self.entity, rows = items.len(), "listed records");

        let qualifier = if filters.is_empty() { "" } else { "withdrawn " };
        let mut answer = format!("Found {} {qualifier}{} records.", items.len(), self.entity);
        if !items.is_empty() {
            let preview: Vec<String> = items.iter().take(PREVIEW_ROWS).map(label).collect();
            answer.push_str(&format!(" {}", preview.join(", ")));
            if items.len() > PREVIEW_ROWS {
                answer.push_str(&format!(" and {} more", items.len() - PREVIEW_ROWS));
            }
            answer.push('.');
        }

        let filters: serde_json::Map<String, Value> = filters
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        Ok(AgentResult::ok(&self.entity, &self.name, &request.intent, answer)
            .with_session(request.session_id)
            .with_data(json!({ "entity": self.entity, "filters": filters, "items": items })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingDataService {
        calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
        rows: Vec<Value>,
    }

    #[async_trait]
    impl DataService for RecordingDataService {
        async fn list(&self, entity: &str, filters: &[(String, String)]) -> DomainResult<Vec<Value>> {
            self.calls
                .lock()
                .unwrap()
                .push((entity.to_string(), filters.to_vec()));
            Ok(self.rows.clone())
        }

        async fn query(&self, _text: &str) -> DomainResult<Value> {
            Ok(Value::Null)
        }
    }

    fn request(action: RuleAction) -> AgentRequest {
        AgentRequest::new("show students", "s1").with_intent("students", action)
    }

    #[tokio::test]
    async fn test_read_lists_records() {
        let data = Arc::new(RecordingDataService {
            rows: vec![json!({"id": 1, "name": "Ada"}), json!({"id": 2, "name": "Grace"})],
            ..Default::default()
        });
        let agent = EntityListAgent::new("students", data.clone());

        let result = agent.run(request(RuleAction::Read)).await.unwrap();
        assert_eq!(result.status, AgentStatus::Ok);
        assert_eq!(result.answer_text, "Found 2 students records. Ada, Grace.");
        assert_eq!(result.data["items"].as_array().unwrap().len(), 2);
        assert_eq!(data.calls.lock().unwrap()[0], ("students".to_string(), Vec::new()));
    }

    #[tokio::test]
    async fn test_show_withdrawn_adds_status_filter() {
        let data = Arc::new(RecordingDataService::default());
        let agent = EntityListAgent::new("students", data.clone());

        let result = agent
            .run(request(RuleAction::ShowWithdrawn("students".to_string())))
            .await
            .unwrap();
        assert_eq!(result.data["filters"]["status"], "withdrawn");
        assert_eq!(
            data.calls.lock().unwrap()[0].1,
            vec![("status".to_string(), "withdrawn".to_string())]
        );
    }

    #[tokio::test]
    async fn test_mutation_is_partial_without_calling_service() {
        let data = Arc::new(RecordingDataService::default());
        let agent = EntityListAgent::new("staff", data.clone());

        let result = agent.run(request(RuleAction::Delete)).await.unwrap();
        assert_eq!(result.status, AgentStatus::Partial);
        assert!(result.answer_text.contains("district portal"));
        assert!(data.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("students"), "Students");
        assert_eq!(display_name("bus_routes"), "Bus routes");
        assert_eq!(label(&json!({"id": 42})), "42");
    }
}
