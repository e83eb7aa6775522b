//! Retrieved context chunks.

use serde::{Deserialize, Serialize};

/// Source label prefix for text attached to the session rather than retrieved.
pub const SESSION_FILE_SOURCE: &str = "session_file";

/// One scored chunk returned by the retrieval collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub id: String,
    pub text: String,
    pub source: String,
    pub score: f32,
}

impl RetrievedChunk {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        source: impl Into<String>,
        score: f32,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source: source.into(),
            score,
        }
    }

    /// Wrap an attached session file so agents see it as context.
    pub fn from_session_file(file: &SessionFile) -> Self {
        Self {
            id: format!("{SESSION_FILE_SOURCE}:{}", file.name),
            text: file.content.clone(),
            source: format!("{SESSION_FILE_SOURCE}:{}", file.name),
            score: 1.0,
        }
    }

    /// Blank text or a non-finite score means the retriever handed back junk.
    pub fn is_well_formed(&self) -> bool {
        !self.text.trim().is_empty() && self.score.is_finite()
    }
}

/// A file the caller attached to the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFile {
    pub name: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed() {
        assert!(RetrievedChunk::new("a", "text", "handbook", 0.5).is_well_formed());
        assert!(!RetrievedChunk::new("a", "   ", "handbook", 0.5).is_well_formed());
        assert!(!RetrievedChunk::new("a", "text", "handbook", f32::NAN).is_well_formed());
    }

    #[test]
    fn test_session_file_chunk() {
        let file = SessionFile {
            name: "roster.csv".to_string(),
            content: "id,name".to_string(),
        };
        let chunk = RetrievedChunk::from_session_file(&file);
        assert_eq!(chunk.source, "session_file:roster.csv");
        assert_eq!(chunk.text, "id,name");
    }
}
