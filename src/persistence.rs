//! Versioned persistence of the session to local storage.
//!
//! Four keys make up the persisted mirror of a [`SessionState`]:
//!
//! | Key                | Value                                  |
//! |--------------------|----------------------------------------|
//! | `current-question` | node id                                |
//! | `answer-history`   | JSON array of `{question, answer}`     |
//! | `result`           | JSON `{title, content}`                |
//! | `cache-version`    | schema version tag                     |
//!
//! The store is a thin codec over a [`KeyValueStore`]. It never keeps a copy
//! of the session between calls.

use anyhow::Result;

use crate::models::{AnswerEntry, NodeId, ResultPayload, SessionState};
use crate::storage::{KeyValueStore, StorageOp};

pub const CURRENT_QUESTION_KEY: &str = "current-question";
pub const ANSWER_HISTORY_KEY: &str = "answer-history";
pub const RESULT_KEY: &str = "result";
pub const CACHE_VERSION_KEY: &str = "cache-version";

const SESSION_KEYS: [&str; 4] = [
    CURRENT_QUESTION_KEY,
    ANSWER_HISTORY_KEY,
    RESULT_KEY,
    CACHE_VERSION_KEY,
];

pub struct SessionStore<S> {
    storage: S,
    root: NodeId,
    cache_version: String,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(storage: S, root: NodeId, cache_version: impl Into<String>) -> Self {
        Self {
            storage,
            root,
            cache_version: cache_version.into(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn root(&self) -> &NodeId {
        &self.root
    }

    fn fresh(&self) -> SessionState {
        SessionState::fresh(self.root.clone(), self.cache_version.clone())
    }

    /// Restore the persisted session, resetting it when it is stale or
    /// inconsistent.
    ///
    /// - A cache version other than the expected one (including none at all)
    ///   discards every key and stamps the expected version.
    /// - A result without a current question is an inconsistent completed
    ///   session and is reset the same way.
    /// - History that does not parse becomes empty; the current question is
    ///   kept.
    pub fn load_session(&self) -> Result<SessionState> {
        let stored_version = self.storage.get(CACHE_VERSION_KEY)?;
        if stored_version.as_deref() != Some(self.cache_version.as_str()) {
            tracing::info!(
                "Cache version {:?} does not match {}, starting a fresh session",
                stored_version,
                self.cache_version
            );
            return self.reset();
        }

        let current = self.storage.get(CURRENT_QUESTION_KEY)?;
        let result = self.storage.get(RESULT_KEY)?.and_then(|raw| {
            serde_json::from_str::<ResultPayload>(&raw)
                .inspect_err(|e| tracing::warn!("Discarding unreadable stored result: {}", e))
                .ok()
        });

        let Some(current) = current.filter(|id| !id.is_empty()) else {
            if result.is_some() {
                tracing::warn!("Stored result has no current question, resetting session");
                return self.reset();
            }
            // Kept at the root; the navigator replays the history to place it.
            let mut session = self.fresh();
            session.answer_history = self.load_history()?;
            return Ok(session);
        };

        Ok(SessionState {
            current_node_id: NodeId::from(current),
            answer_history: self.load_history()?,
            result,
            cache_version: self.cache_version.clone(),
        })
    }

    fn load_history(&self) -> Result<Vec<AnswerEntry>> {
        let Some(raw) = self.storage.get(ANSWER_HISTORY_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(history) => Ok(history),
            Err(e) => {
                tracing::warn!("Stored answer history is unreadable, clearing it: {}", e);
                Ok(Vec::new())
            }
        }
    }

    fn reset(&self) -> Result<SessionState> {
        let mut ops: Vec<StorageOp> = SESSION_KEYS.iter().map(|k| StorageOp::remove(*k)).collect();
        ops.push(StorageOp::set(CACHE_VERSION_KEY, self.cache_version.as_str()));
        self.storage.write_batch(&ops)?;
        Ok(self.fresh())
    }

    /// Persist the history and the node it leads to. Called before anything
    /// is rendered so a reload mid-transition resumes at `next`.
    pub fn save_answer(&self, history: &[AnswerEntry], next: &NodeId) -> Result<()> {
        let history = serde_json::to_string(history)?;
        self.storage.write_batch(&[
            StorageOp::set(ANSWER_HISTORY_KEY, history),
            StorageOp::set(CURRENT_QUESTION_KEY, next.as_str()),
        ])
    }

    /// Persist a reached result with the history that led to it.
    ///
    /// `current-question` is left as is; it is stale once a result exists.
    pub fn save_result(&self, result: &ResultPayload, history: &[AnswerEntry]) -> Result<()> {
        let result = serde_json::to_string(result)?;
        let history = serde_json::to_string(history)?;
        self.storage.write_batch(&[
            StorageOp::set(RESULT_KEY, result),
            StorageOp::set(ANSWER_HISTORY_KEY, history),
        ])
    }

    /// Like [`save_answer`](Self::save_answer), but also drops a saved
    /// result. Used when the answer that reached a result is taken back.
    pub fn save_rewind(&self, history: &[AnswerEntry], current: &NodeId) -> Result<()> {
        let history = serde_json::to_string(history)?;
        self.storage.write_batch(&[
            StorageOp::set(ANSWER_HISTORY_KEY, history),
            StorageOp::set(CURRENT_QUESTION_KEY, current.as_str()),
            StorageOp::remove(RESULT_KEY),
        ])
    }

    pub fn clear_all(&self) -> Result<()> {
        let ops: Vec<StorageOp> = SESSION_KEYS.iter().map(|k| StorageOp::remove(*k)).collect();
        self.storage.write_batch(&ops)
    }
}
