use crate::models::{AnswerEntry, NodeId};
use crate::tree::DecisionTree;

/// Outcome of replaying an answer history from the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replay {
    /// The node the replayed prefix leads to.
    pub node_id: NodeId,
    /// How many leading history entries could be followed.
    pub consumed: usize,
}

impl Replay {
    pub fn is_complete(&self, history: &[AnswerEntry]) -> bool {
        self.consumed == history.len()
    }
}

/// Walk the tree from `root`, following each recorded answer in order.
///
/// Only the recorded answers drive the walk. The recorded question text is
/// kept for display and may be stale after a tree edit. Replay stops at the
/// first entry it cannot follow: the current node is not a question, or the
/// chosen branch is missing or unknown. `consumed` then tells the caller how
/// much of the history is still consistent with the tree.
pub fn replay(tree: &DecisionTree, root: &NodeId, history: &[AnswerEntry]) -> Replay {
    let mut current = root.clone();

    for (index, entry) in history.iter().enumerate() {
        let stop = Replay {
            node_id: current.clone(),
            consumed: index,
        };

        let Some(question) = tree.question(&current) else {
            return stop;
        };
        match question.branch(entry.answer) {
            Some(next) if tree.contains(next) => current = next.clone(),
            _ => return stop,
        }
    }

    Replay {
        node_id: current,
        consumed: history.len(),
    }
}

/// Replay `history`, dropping entries until it lands on a question node.
///
/// Returns the question the truncated history leads to, or `root` once the
/// history is exhausted.
pub fn settle(tree: &DecisionTree, root: &NodeId, history: &mut Vec<AnswerEntry>) -> NodeId {
    loop {
        let replayed = replay(tree, root, history);
        history.truncate(replayed.consumed);

        if history.is_empty() || tree.question(&replayed.node_id).is_some() {
            return replayed.node_id;
        }
        history.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Answer;

    fn tree() -> DecisionTree {
        DecisionTree::from_json(
            r#"{
                "q1": {"step": 1, "text": "T1", "yes": "q2", "no": "action_x"},
                "q2": {"step": 2, "text": "T2", "yes": "action_y", "no": "action_z"},
                "action_x": {"title": "X", "content": ""},
                "action_y": {"title": "R", "content": "C"}
            }"#,
        )
        .unwrap()
    }

    fn root() -> NodeId {
        NodeId::from("q1")
    }

    #[test]
    fn test_empty_history_is_root() {
        let replayed = replay(&tree(), &root(), &[]);
        assert_eq!(replayed.node_id, root());
        assert_eq!(replayed.consumed, 0);
    }

    #[test]
    fn test_follows_recorded_answers() {
        let history = vec![
            AnswerEntry::new("T1", Answer::Yes),
            AnswerEntry::new("T2", Answer::Yes),
        ];
        let replayed = replay(&tree(), &root(), &history);
        assert_eq!(replayed.node_id, NodeId::from("action_y"));
        assert!(replayed.is_complete(&history));
    }

    #[test]
    fn test_stops_at_dangling_branch() {
        let history = vec![
            AnswerEntry::new("T1", Answer::Yes),
            AnswerEntry::new("T2", Answer::No),
        ];
        let replayed = replay(&tree(), &root(), &history);
        assert_eq!(replayed.node_id, NodeId::from("q2"));
        assert_eq!(replayed.consumed, 1);
    }

    #[test]
    fn test_follows_answers_past_reworded_questions() {
        let history = vec![
            AnswerEntry::new("T1 as it was once worded", Answer::Yes),
            AnswerEntry::new("Old T2", Answer::Yes),
        ];
        let replayed = replay(&tree(), &root(), &history);
        assert_eq!(replayed.node_id, NodeId::from("action_y"));
        assert_eq!(replayed.consumed, 2);
    }

    #[test]
    fn test_stops_after_reaching_a_result() {
        let history = vec![
            AnswerEntry::new("T1", Answer::No),
            AnswerEntry::new("T2", Answer::Yes),
        ];
        let replayed = replay(&tree(), &root(), &history);
        assert_eq!(replayed.node_id, NodeId::from("action_x"));
        assert_eq!(replayed.consumed, 1);
    }

    #[test]
    fn test_settle_lands_on_a_question() {
        let mut history = vec![
            AnswerEntry::new("T1", Answer::No),
            AnswerEntry::new("T2", Answer::Yes),
        ];
        let node = settle(&tree(), &root(), &mut history);
        assert_eq!(node, root());
        assert!(history.is_empty());
    }
}
