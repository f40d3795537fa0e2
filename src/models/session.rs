use serde::{Deserialize, Serialize};

use super::{AnswerEntry, NodeId};

/// Payload of a reached result node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultPayload {
    pub title: String,
    pub content: String,
}

/// The in-memory session.
///
/// Owned exclusively by the [`Navigator`](crate::navigation::Navigator); the
/// persistence layer only reads and writes a serialized mirror of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub current_node_id: NodeId,
    pub answer_history: Vec<AnswerEntry>,
    pub result: Option<ResultPayload>,
    pub cache_version: String,
}

impl SessionState {
    /// A session at the root with no answers.
    pub fn fresh(root: NodeId, cache_version: impl Into<String>) -> Self {
        Self {
            current_node_id: root,
            answer_history: Vec::new(),
            result: None,
            cache_version: cache_version.into(),
        }
    }
}

/// Where the navigator is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavState {
    Question { node_id: NodeId },
    Result { payload: ResultPayload },
}
