//! Decision tree store.
//!
//! The tree is an immutable mapping from node id to node, fetched once per
//! front-end lifetime from either a local JSON file or an HTTP(S) URL.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

use crate::models::{Answer, Node, NodeId, NodeRecord, QuestionNode, ResultNode};

/// Reasons a tree could not be loaded.
///
/// Any of these makes previously persisted session state untrustworthy: a
/// stored node id cannot be re-validated without the tree.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("network error fetching decision tree: {0}")]
    Network(#[from] reqwest::Error),

    #[error("decision tree request returned HTTP {0}")]
    HttpStatus(u16),

    #[error("decision tree is malformed: {0}")]
    Malformed(String),

    #[error("failed to read decision tree file: {0}")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    /// Short machine-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::HttpStatus(_) => "http-status",
            Self::Malformed(_) => "malformed",
            Self::Io(_) => "io",
        }
    }
}

/// Where to fetch the tree from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeSource {
    File(PathBuf),
    Url(String),
}

impl TreeSource {
    /// `http://` and `https://` strings become URLs, anything else a path.
    pub fn parse(s: &str) -> Self {
        if s.starts_with("http://") || s.starts_with("https://") {
            Self::Url(s.to_string())
        } else {
            Self::File(PathBuf::from(s))
        }
    }
}

impl fmt::Display for TreeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

/// A data-integrity problem found in a loaded tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeIssue {
    /// A question's branch points at an id that is not in the tree.
    DanglingBranch {
        from: NodeId,
        answer: Answer,
        target: NodeId,
    },
    /// A question does not define one of its branches.
    MissingBranch { from: NodeId, answer: Answer },
}

impl fmt::Display for TreeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingBranch {
                from,
                answer,
                target,
            } => write!(f, "{} --{}--> {} (no such node)", from, answer, target),
            Self::MissingBranch { from, answer } => {
                write!(f, "{} has no '{}' branch", from, answer)
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DecisionTree {
    nodes: BTreeMap<NodeId, Node>,
}

impl DecisionTree {
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| LoadError::Malformed(e.to_string()))?;
        Self::from_value(value)
    }

    /// Parse a keyed JSON object into tagged nodes.
    pub fn from_value(value: Value) -> Result<Self, LoadError> {
        let Value::Object(entries) = value else {
            return Err(LoadError::Malformed(
                "expected an object keyed by node id".to_string(),
            ));
        };

        let mut nodes = BTreeMap::new();
        for (id, raw) in entries {
            if !raw.is_object() {
                return Err(LoadError::Malformed(format!(
                    "node '{}' is not an object",
                    id
                )));
            }
            let record: NodeRecord = serde_json::from_value(raw)
                .map_err(|e| LoadError::Malformed(format!("node '{}': {}", id, e)))?;
            let id = NodeId::from(id);
            nodes.insert(id.clone(), record.into_node(id));
        }

        Ok(Self { nodes })
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn question(&self, id: &NodeId) -> Option<&QuestionNode> {
        self.get(id).and_then(Node::as_question)
    }

    pub fn result(&self, id: &NodeId) -> Option<&ResultNode> {
        self.get(id).and_then(Node::as_result)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn question_count(&self) -> usize {
        self.nodes().filter(|n| n.as_question().is_some()).count()
    }

    /// Every branch that is missing or does not resolve, in id order.
    pub fn issues(&self) -> Vec<TreeIssue> {
        let mut issues = Vec::new();
        for question in self.nodes().filter_map(Node::as_question) {
            for answer in [Answer::Yes, Answer::No] {
                match question.branch(answer) {
                    None => issues.push(TreeIssue::MissingBranch {
                        from: question.id.clone(),
                        answer,
                    }),
                    Some(target) if !self.contains(target) => {
                        issues.push(TreeIssue::DanglingBranch {
                            from: question.id.clone(),
                            answer,
                            target: target.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }
        }
        issues
    }
}

/// Fetch and parse the tree.
///
/// Integrity issues are logged but do not fail the load; navigation refuses
/// the affected transitions instead.
pub async fn load(source: &TreeSource) -> Result<DecisionTree, LoadError> {
    tracing::debug!("Loading decision tree from {}", source);

    let tree = match source {
        TreeSource::File(path) => {
            let body = tokio::fs::read_to_string(path).await?;
            DecisionTree::from_json(&body)?
        }
        TreeSource::Url(url) => fetch(url).await?,
    };

    for issue in tree.issues() {
        tracing::warn!("Decision tree integrity: {}", issue);
    }
    tracing::info!(
        "Loaded decision tree with {} nodes ({} questions)",
        tree.len(),
        tree.question_count()
    );

    Ok(tree)
}

async fn fetch(url: &str) -> Result<DecisionTree, LoadError> {
    let response = Client::new().get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(LoadError::HttpStatus(status.as_u16()));
    }

    let body = response.text().await?;
    DecisionTree::from_json(&body)
}
