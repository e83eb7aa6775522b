//! SQLite implementation of the ConversationRepository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ConversationState, SaveOutcome};
use crate::domain::ports::ConversationRepository;

#[derive(Clone)]
pub struct SqliteConversationRepository {
    pool: SqlitePool,
}

impl SqliteConversationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Number of stored conversations.
    pub async fn count(&self) -> DomainResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM conversation_states")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl ConversationRepository for SqliteConversationRepository {
    async fn load(&self, conversation_id: &str) -> DomainResult<Option<ConversationState>> {
        let row: Option<ConversationRow> = sqlx::query_as(
            "SELECT conversation_id, state, created_at, updated_at
             FROM conversation_states WHERE conversation_id = ?",
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn save(
        &self,
        conversation_id: &str,
        state: &serde_json::Value,
    ) -> DomainResult<SaveOutcome> {
        if !state.is_object() {
            return Ok(SaveOutcome::IgnoredNonObject);
        }

        let state_json = serde_json::to_string(state)?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"INSERT INTO conversation_states (conversation_id, state, created_at, updated_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(conversation_id) DO UPDATE SET
                   state = excluded.state,
                   updated_at = excluded.updated_at"#,
        )
        .bind(conversation_id)
        .bind(&state_json)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(SaveOutcome::Saved)
    }
}

#[derive(sqlx::FromRow)]
struct ConversationRow {
    conversation_id: String,
    state: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ConversationRow> for ConversationState {
    type Error = DomainError;

    fn try_from(row: ConversationRow) -> Result<Self, Self::Error> {
        let state = match serde_json::from_str(&row.state)? {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(DomainError::SerializationError(format!(
                    "conversation {} holds a non-object state ({other})",
                    row.conversation_id
                )))
            }
        };

        Ok(Self {
            conversation_id: row.conversation_id,
            state,
            created_at: super::parse_datetime(&row.created_at)?,
            updated_at: super::parse_datetime(&row.updated_at)?,
        })
    }
}
