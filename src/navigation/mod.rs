//! The navigation state machine.
//!
//! A [`Navigator`] owns the decision tree, the in-memory [`SessionState`] and
//! a handle to the [`SessionStore`]. It moves between two states:
//!
//! - `Question(node_id)`: waiting for a yes/no answer
//! - `Result(payload)`: a terminal node was reached
//!
//! Every transition persists before it renders, so a restart at any point
//! resumes at a position consistent with the stored history. Back navigation
//! recomputes the position by replaying the truncated history from the root
//! (see [`replay`]) rather than following stored back-pointers.

mod renderer;
mod replay;

pub use renderer::*;
pub use replay::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::*;
use crate::persistence::SessionStore;
use crate::progress::{progress, Progress};
use crate::storage::KeyValueStore;
use crate::tree::{self, DecisionTree, LoadError, TreeSource};

/// Transitions refused by the navigator. The session is unchanged when one
/// of these is returned.
#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("Unknown node '{0}'")]
    UnknownNode(NodeId),

    #[error("Node '{node}' has no '{answer}' branch")]
    MissingBranch { node: NodeId, answer: Answer },

    #[error("Node '{node}' '{answer}' branch points at unknown node '{target}'")]
    DanglingBranch {
        node: NodeId,
        answer: Answer,
        target: NodeId,
    },

    #[error("Session already has a result")]
    AlreadyComplete,

    #[error("Failed to persist session: {0}")]
    Storage(anyhow::Error),
}

impl NavigationError {
    /// Whether the error comes from malformed tree data or an invalid request
    /// rather than the storage medium.
    pub fn is_data_error(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

#[derive(Debug, Error)]
pub enum BootError {
    #[error(transparent)]
    TreeLoad(#[from] LoadError),

    #[error("Failed to restore session: {0}")]
    Storage(anyhow::Error),
}

/// The current question as shown to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionView {
    pub id: NodeId,
    pub step: u32,
    pub text: String,
}

/// A serializable snapshot of the navigator for front-ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub state: NavState,
    pub question: Option<QuestionView>,
    pub progress: Option<Progress>,
    pub history: Vec<AnswerEntry>,
    pub can_go_back: bool,
}

pub struct Navigator<S> {
    tree: DecisionTree,
    store: SessionStore<S>,
    session: SessionState,
    state: NavState,
    total_steps: u32,
    renderer: Box<dyn Renderer + Send>,
}

impl<S: KeyValueStore> Navigator<S> {
    /// Restore the persisted session, load the tree and enter the restored
    /// state.
    ///
    /// When the tree cannot be loaded, every persisted key is cleared (a
    /// stored node id cannot be validated without the tree), an error is
    /// rendered and the load error is returned.
    pub async fn boot(
        source: &TreeSource,
        store: SessionStore<S>,
        total_steps: u32,
        mut renderer: Box<dyn Renderer + Send>,
    ) -> Result<Self, BootError> {
        let session = store.load_session().map_err(BootError::Storage)?;

        let tree = match tree::load(source).await {
            Ok(tree) => tree,
            Err(e) => {
                tracing::error!("Could not load decision tree from {}: {}", source, e);
                if let Err(clear_err) = store.clear_all() {
                    tracing::error!("Failed to clear stored session: {}", clear_err);
                }
                renderer.show_error(&format!(
                    "The questions could not be loaded ({}). Please try again later.",
                    e.reason()
                ));
                return Err(e.into());
            }
        };

        Self::resume(tree, store, session, total_steps, renderer).map_err(BootError::Storage)
    }

    /// Enter the state implied by a restored session.
    ///
    /// A stored result wins. A session sitting at the root with answers
    /// already recorded (the current question was never saved) is moved to
    /// where those answers lead. Otherwise a current node that is not a
    /// question in this tree is recomputed by replaying the history, and a
    /// current node that is a result whose payload was never saved is
    /// completed.
    pub fn resume(
        tree: DecisionTree,
        store: SessionStore<S>,
        mut session: SessionState,
        total_steps: u32,
        renderer: Box<dyn Renderer + Send>,
    ) -> anyhow::Result<Self> {
        if session.result.is_none()
            && session.current_node_id == *store.root()
            && !session.answer_history.is_empty()
        {
            let replayed = replay(&tree, store.root(), &session.answer_history);
            let node_id = if replayed.is_complete(&session.answer_history) {
                replayed.node_id
            } else {
                settle(&tree, store.root(), &mut session.answer_history)
            };
            tracing::warn!(
                "Session at the root with {} answers, moving to {}",
                session.answer_history.len(),
                node_id
            );
            store.save_answer(&session.answer_history, &node_id)?;
            session.current_node_id = node_id;
        }

        let state = if let Some(payload) = &session.result {
            NavState::Result {
                payload: payload.clone(),
            }
        } else if tree.question(&session.current_node_id).is_some() {
            NavState::Question {
                node_id: session.current_node_id.clone(),
            }
        } else if let Some(result) = tree.result(&session.current_node_id) {
            tracing::info!(
                "Completing interrupted transition into {}",
                session.current_node_id
            );
            let payload = result.payload();
            store.save_result(&payload, &session.answer_history)?;
            session.result = Some(payload.clone());
            NavState::Result { payload }
        } else {
            tracing::warn!(
                "Stored node {} is not in the tree, replaying {} answers",
                session.current_node_id,
                session.answer_history.len()
            );
            let node_id = settle(&tree, store.root(), &mut session.answer_history);
            store.save_answer(&session.answer_history, &node_id)?;
            session.current_node_id = node_id.clone();
            NavState::Question { node_id }
        };

        let mut navigator = Self {
            tree,
            store,
            session,
            state,
            total_steps,
            renderer,
        };
        navigator.render();
        Ok(navigator)
    }

    pub fn state(&self) -> &NavState {
        &self.state
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn history(&self) -> &[AnswerEntry] {
        &self.session.answer_history
    }

    pub fn current_question(&self) -> Option<&QuestionNode> {
        match &self.state {
            NavState::Question { node_id } => self.tree.question(node_id),
            NavState::Result { .. } => None,
        }
    }

    /// Answer the current question.
    ///
    /// On success the new history and next node are persisted, and a result
    /// node additionally persists its payload. On error nothing changes.
    pub fn answer(&mut self, choice: Answer) -> Result<&NavState, NavigationError> {
        let node_id = match &self.state {
            NavState::Question { node_id } => node_id.clone(),
            NavState::Result { .. } => return Err(refuse(NavigationError::AlreadyComplete)),
        };

        let Some(question) = self.tree.question(&node_id) else {
            return Err(refuse(NavigationError::UnknownNode(node_id)));
        };
        let Some(next) = question.branch(choice).cloned() else {
            return Err(refuse(NavigationError::MissingBranch {
                node: node_id,
                answer: choice,
            }));
        };
        let Some(target) = self.tree.get(&next) else {
            return Err(refuse(NavigationError::DanglingBranch {
                node: node_id,
                answer: choice,
                target: next,
            }));
        };

        let mut history = self.session.answer_history.clone();
        history.push(AnswerEntry::new(question.text.clone(), choice));

        self.store
            .save_answer(&history, &next)
            .map_err(NavigationError::Storage)?;

        let state = match target {
            Node::Result(result) => {
                let payload = result.payload();
                self.store
                    .save_result(&payload, &history)
                    .map_err(NavigationError::Storage)?;
                self.session.result = Some(payload.clone());
                NavState::Result { payload }
            }
            Node::Question(_) => NavState::Question {
                node_id: next.clone(),
            },
        };

        tracing::debug!("Answered {} with {}, now at {}", node_id, choice, next);
        self.session.answer_history = history;
        self.session.current_node_id = next;
        self.state = state;
        self.render();
        Ok(&self.state)
    }

    /// Undo the last answer.
    ///
    /// The new position is recomputed by replaying the remaining history from
    /// the root. From a result this also drops the stored result.
    pub fn go_back(&mut self) -> Result<&NavState, NavigationError> {
        if self.session.answer_history.is_empty() {
            tracing::debug!("Nothing to go back to");
            return Ok(&self.state);
        }

        let mut history = self.session.answer_history.clone();
        history.pop();
        let node_id = settle(&self.tree, self.store.root(), &mut history);

        if self.session.result.is_some() {
            self.store
                .save_rewind(&history, &node_id)
                .map_err(NavigationError::Storage)?;
        } else {
            self.store
                .save_answer(&history, &node_id)
                .map_err(NavigationError::Storage)?;
        }

        tracing::debug!(
            "Went back to {} with {} answers",
            node_id,
            history.len()
        );
        self.session.answer_history = history;
        self.session.current_node_id = node_id.clone();
        self.session.result = None;
        self.state = NavState::Question { node_id };
        self.render();
        Ok(&self.state)
    }

    /// Clear all persisted state and start over at the root.
    ///
    /// The cleared store is loaded again so the cache version is stamped
    /// before the first new answer is saved.
    pub fn restart(&mut self) -> Result<&NavState, NavigationError> {
        self.store.clear_all().map_err(NavigationError::Storage)?;
        let session = self
            .store
            .load_session()
            .map_err(NavigationError::Storage)?;

        tracing::info!("Restarting questionnaire at {}", session.current_node_id);
        self.state = NavState::Question {
            node_id: session.current_node_id.clone(),
        };
        self.session = session;
        self.render();
        Ok(&self.state)
    }

    pub fn progress(&self) -> Option<Progress> {
        self.current_question()
            .map(|q| progress(q.step, self.total_steps))
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            state: self.state.clone(),
            question: self.current_question().map(|q| QuestionView {
                id: q.id.clone(),
                step: q.step,
                text: q.text.clone(),
            }),
            progress: self.progress(),
            history: self.session.answer_history.clone(),
            can_go_back: !self.session.answer_history.is_empty(),
        }
    }

    fn render(&mut self) {
        match &self.state {
            NavState::Question { node_id } => match self.tree.question(node_id) {
                Some(question) => {
                    let progress = progress(question.step, self.total_steps);
                    let can_go_back = !self.session.answer_history.is_empty();
                    self.renderer
                        .show_question(question, &progress, can_go_back);
                }
                None => {
                    tracing::warn!("Cannot render unknown question {}", node_id);
                    self.renderer
                        .show_error("This question is not available. Please start over.");
                }
            },
            NavState::Result { payload } => {
                self.renderer
                    .show_result(payload, &self.session.answer_history);
            }
        }
    }
}

fn refuse(err: NavigationError) -> NavigationError {
    tracing::warn!("Transition refused: {}", err);
    err
}
