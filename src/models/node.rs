use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Answer, ResultPayload};

/// Ids carrying this prefix denote terminal (result) nodes.
pub const RESULT_ID_PREFIX: &str = "action_";

/// Identifier of a node in the decision tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this id names a result node. Only consulted while parsing the
    /// tree; navigation works on the parsed [`Node`] variant instead.
    pub fn is_result_id(&self) -> bool {
        self.0.starts_with(RESULT_ID_PREFIX)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A yes/no question.
///
/// Both branches are optional at the data level so that a malformed tree can
/// still be loaded; following an absent branch is reported as a navigation
/// error instead of silently dead-ending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionNode {
    pub id: NodeId,
    /// Position among question nodes, used for progress display only.
    pub step: u32,
    pub text: String,
    pub yes: Option<NodeId>,
    pub no: Option<NodeId>,
}

impl QuestionNode {
    pub fn branch(&self, answer: Answer) -> Option<&NodeId> {
        match answer {
            Answer::Yes => self.yes.as_ref(),
            Answer::No => self.no.as_ref(),
        }
    }
}

/// A terminal node. Its payload is presentation content, opaque to navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultNode {
    pub id: NodeId,
    pub title: String,
    pub content: String,
}

impl ResultNode {
    pub fn payload(&self) -> ResultPayload {
        ResultPayload {
            title: self.title.clone(),
            content: self.content.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Question(QuestionNode),
    Result(ResultNode),
}

impl Node {
    pub fn as_question(&self) -> Option<&QuestionNode> {
        match self {
            Self::Question(q) => Some(q),
            Self::Result(_) => None,
        }
    }

    pub fn as_result(&self) -> Option<&ResultNode> {
        match self {
            Self::Result(r) => Some(r),
            Self::Question(_) => None,
        }
    }
}

/// The record shape of a tree entry as it appears in the JSON document.
///
/// Question entries use `step`, `text`, `yes`, `no`; result entries use
/// `title` and `content`. Unused fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeRecord {
    #[serde(default)]
    pub step: u32,
    #[serde(default)]
    pub text: String,
    #[serde(default, deserialize_with = "non_empty_id")]
    pub yes: Option<NodeId>,
    #[serde(default, deserialize_with = "non_empty_id")]
    pub no: Option<NodeId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

impl NodeRecord {
    /// Tag the record by its id. This is the only place the result prefix is
    /// inspected.
    pub fn into_node(self, id: NodeId) -> Node {
        if id.is_result_id() {
            Node::Result(ResultNode {
                id,
                title: self.title,
                content: self.content,
            })
        } else {
            Node::Question(QuestionNode {
                id,
                step: self.step,
                text: self.text,
                yes: self.yes,
                no: self.no,
            })
        }
    }
}

/// Empty strings and `null` both mean "no branch".
fn non_empty_id<'de, D>(deserializer: D) -> Result<Option<NodeId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()).map(NodeId::from))
}
