//! External district data service port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// Read access to the student/staff data service the entity agents wrap.
#[async_trait]
pub trait DataService: Send + Sync {
    /// List records for one entity (e.g. "students"), with equality filters.
    async fn list(
        &self,
        entity: &str,
        filters: &[(String, String)],
    ) -> DomainResult<Vec<serde_json::Value>>;

    /// Run a free-text data query.
    async fn query(&self, text: &str) -> DomainResult<serde_json::Value>;
}
