//! Free-text data query agent, the preflight lock target.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{AgentRequest, AgentResult};
use crate::domain::ports::{Agent, DataService};
use crate::services::DATA_QUERY_TARGET;

pub struct DataQueryAgent {
    data: Arc<dyn DataService>,
}

impl DataQueryAgent {
    pub fn new(data: Arc<dyn DataService>) -> Self {
        Self { data }
    }
}

/// Split a query response into answer text and optional rows.
fn interpret(value: Value) -> (String, Value) {
    let rows = ["rows", "items"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_array).cloned());
    let answer = value
        .get("answer")
        .and_then(Value::as_str)
        .map(str::to_string);

    match (answer, rows) {
        (Some(answer), Some(rows)) => (answer, json!({ "items": rows })),
        (Some(answer), None) => (answer, json!({ "result": value })),
        (None, Some(rows)) => (format!("The query returned {} rows.", rows.len()), json!({ "items": rows })),
        (None, None) => match value {
            Value::Array(rows) => (format!("The query returned {} rows.", rows.len()), json!({ "items": rows })),
            Value::String(text) => (text, Value::Null),
            other => (other.to_string(), json!({ "result": other })),
        },
    }
}

#[async_trait]
impl Agent for DataQueryAgent {
    fn id(&self) -> &str {
        DATA_QUERY_TARGET
    }

    fn name(&self) -> &str {
        "Data Query"
    }

    async fn run(&self, request: AgentRequest) -> DomainResult<AgentResult> {
        let query = request.message.trim();
        if query.is_empty() {
            return Err(DomainError::ValidationFailed("query text is empty".to_string()));
        }

        let value = self.data.query(query).await?;
        let (answer, data) = interpret(value);
        Ok(AgentResult::ok(DATA_QUERY_TARGET, self.name(), &request.intent, answer)
            .with_session(request.session_id)
            .with_data(data))
    }
}
