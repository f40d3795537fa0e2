use std::sync::{Arc, Mutex};

use questionnaire::db::Database;
use questionnaire::models::*;
use questionnaire::navigation::*;
use questionnaire::persistence::*;
use questionnaire::progress::Progress;
use questionnaire::storage::KeyValueStore;
use questionnaire::tree::DecisionTree;
use speculate2::speculate;

const SCENARIO_TREE: &str = r#"{
    "q1": {"step": 1, "text": "T1", "yes": "q2", "no": "action_x"},
    "q2": {"step": 2, "text": "T2", "yes": "action_y", "no": "action_z"},
    "action_y": {"title": "R", "content": "C"}
}"#;

const BUNDLED_TREE: &str = include_str!("../data/tree.json");

/// Records each render effect as a short string.
#[derive(Clone, Default)]
struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl Renderer for Recorder {
    fn show_question(&mut self, question: &QuestionNode, progress: &Progress, _can_go_back: bool) {
        self.events
            .lock()
            .unwrap()
            .push(format!("question {} {}", question.id, progress.label));
    }

    fn show_result(&mut self, result: &ResultPayload, journey: &[AnswerEntry]) {
        self.events
            .lock()
            .unwrap()
            .push(format!("result {} after {}", result.title, journey.len()));
    }

    fn show_error(&mut self, _message: &str) {
        self.events.lock().unwrap().push("error".to_string());
    }
}

fn store(db: &Database) -> SessionStore<Database> {
    SessionStore::new(db.clone(), NodeId::from("q1"), "2")
}

/// Simulates a page load: restore from storage, then enter the restored state.
fn open(tree: &str, db: &Database) -> Navigator<Database> {
    open_with(tree, db, Box::new(NullRenderer))
}

fn open_with(tree: &str, db: &Database, renderer: Box<dyn Renderer + Send>) -> Navigator<Database> {
    let store = store(db);
    let session = store.load_session().expect("Failed to load session");
    let tree = DecisionTree::from_json(tree).expect("Failed to parse tree");
    Navigator::resume(tree, store, session, 2, renderer).expect("Failed to resume")
}

fn question(id: &str) -> NavState {
    NavState::Question { node_id: NodeId::from(id) }
}

fn seed(db: &Database, current: &str, history: &str) {
    db.set(CACHE_VERSION_KEY, "2").expect("Failed to seed");
    db.set(CURRENT_QUESTION_KEY, current).expect("Failed to seed");
    db.set(ANSWER_HISTORY_KEY, history).expect("Failed to seed");
}

/// Every answer sequence that stays on question nodes, starting at the root.
fn question_paths(tree: &DecisionTree, from: &NodeId, prefix: Vec<AnswerEntry>, out: &mut Vec<Vec<AnswerEntry>>) {
    out.push(prefix.clone());
    let Some(question) = tree.question(from) else {
        return;
    };
    for answer in [Answer::Yes, Answer::No] {
        if let Some(next) = question.branch(answer) {
            if tree.contains(next) {
                let mut path = prefix.clone();
                path.push(AnswerEntry::new(question.text.clone(), answer));
                question_paths(tree, next, path, out);
            }
        }
    }
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "starting" {
        it "begins at the root with no history on a fresh load" {
            let nav = open(SCENARIO_TREE, &db);

            assert_eq!(nav.state(), &question("q1"));
            assert!(nav.history().is_empty());
            assert_eq!(nav.progress().map(|p| p.label), Some("1/2".to_string()));
        }

        it "resumes at the stored question" {
            seed(&db, "q2", r#"[{"question":"T1","answer":"yes"}]"#);

            let nav = open(SCENARIO_TREE, &db);

            assert_eq!(nav.state(), &question("q2"));
            assert_eq!(nav.history().len(), 1);
        }

        it "resumes in the result state when a result is stored" {
            seed(&db, "action_y", r#"[{"question":"T1","answer":"yes"},{"question":"T2","answer":"yes"}]"#);
            db.set(RESULT_KEY, r#"{"title":"R","content":"C"}"#).expect("Failed to seed");

            let nav = open(SCENARIO_TREE, &db);

            assert!(matches!(nav.state(), NavState::Result { payload } if payload.title == "R"));
        }

        it "completes a transition interrupted before the result was saved" {
            seed(&db, "action_y", r#"[{"question":"T1","answer":"yes"},{"question":"T2","answer":"yes"}]"#);

            let nav = open(SCENARIO_TREE, &db);

            assert!(matches!(nav.state(), NavState::Result { .. }));
            assert_eq!(db.get(RESULT_KEY).expect("Query failed"), Some(r#"{"title":"R","content":"C"}"#.to_string()));
        }

        it "recomputes a stored node the tree no longer has from the history" {
            seed(&db, "q_removed", r#"[{"question":"T1","answer":"yes"},{"question":"T2","answer":"no"}]"#);

            let nav = open(SCENARIO_TREE, &db);

            assert_eq!(nav.state(), &question("q2"));
            assert_eq!(nav.history(), &[AnswerEntry::new("T1", Answer::Yes)]);
            assert_eq!(db.get(CURRENT_QUESTION_KEY).expect("Query failed"), Some("q2".to_string()));
        }

        it "moves a session stored without its current question to where the answers lead" {
            db.set(CACHE_VERSION_KEY, "2").expect("Failed to seed");
            db.set(ANSWER_HISTORY_KEY, r#"[{"question":"T1","answer":"yes"}]"#).expect("Failed to seed");

            let mut nav = open(SCENARIO_TREE, &db);

            assert_eq!(nav.state(), &question("q2"));
            assert_eq!(nav.history().len(), 1);
            assert_eq!(db.get(CURRENT_QUESTION_KEY).expect("Query failed"), Some("q2".to_string()));

            nav.go_back().expect("Failed to go back");
            assert_eq!(nav.state(), &question("q1"));
            assert!(nav.history().is_empty());
        }

        it "completes a session stored without its current question whose answers reach a result" {
            db.set(CACHE_VERSION_KEY, "2").expect("Failed to seed");
            db.set(
                ANSWER_HISTORY_KEY,
                r#"[{"question":"T1","answer":"yes"},{"question":"T2","answer":"yes"}]"#,
            )
            .expect("Failed to seed");

            let nav = open(SCENARIO_TREE, &db);

            assert!(matches!(nav.state(), NavState::Result { payload } if payload.title == "R"));
            assert_eq!(db.get(RESULT_KEY).expect("Query failed"), Some(r#"{"title":"R","content":"C"}"#.to_string()));
        }
    }

    describe "answer" {
        it "moves to the next question and persists before rendering" {
            let mut nav = open(SCENARIO_TREE, &db);

            nav.answer(Answer::Yes).expect("Failed to answer");

            assert_eq!(nav.state(), &question("q2"));
            assert_eq!(db.get(CURRENT_QUESTION_KEY).expect("Query failed"), Some("q2".to_string()));
            assert_eq!(
                db.get(ANSWER_HISTORY_KEY).expect("Query failed"),
                Some(r#"[{"question":"T1","answer":"yes"}]"#.to_string())
            );
        }

        it "reaches a result and records the journey" {
            let mut nav = open(SCENARIO_TREE, &db);

            nav.answer(Answer::Yes).expect("Failed to answer");
            nav.answer(Answer::Yes).expect("Failed to answer");

            assert_eq!(
                nav.state(),
                &NavState::Result {
                    payload: ResultPayload { title: "R".to_string(), content: "C".to_string() }
                }
            );
            assert_eq!(
                nav.history(),
                &[AnswerEntry::new("T1", Answer::Yes), AnswerEntry::new("T2", Answer::Yes)]
            );

            let reloaded = open(SCENARIO_TREE, &db);
            assert_eq!(reloaded.state(), nav.state());
            assert_eq!(reloaded.history(), nav.history());
        }

        it "refuses a branch that points outside the tree" {
            let mut nav = open(SCENARIO_TREE, &db);

            let err = nav.answer(Answer::No).unwrap_err();

            assert!(matches!(err, NavigationError::DanglingBranch { .. }));
            assert_eq!(nav.state(), &question("q1"));
            assert!(nav.history().is_empty());
            assert_eq!(db.get(ANSWER_HISTORY_KEY).expect("Query failed"), None);
        }

        it "refuses a missing branch" {
            let tree = r#"{"q1": {"step": 1, "text": "T1", "yes": "q1"}}"#;
            let mut nav = open(tree, &db);

            let err = nav.answer(Answer::No).unwrap_err();

            assert!(matches!(err, NavigationError::MissingBranch { answer: Answer::No, .. }));
            assert_eq!(nav.state(), &question("q1"));
            assert!(nav.history().is_empty());
        }

        it "refuses to answer when the current node is unknown" {
            let recorder = Recorder::default();
            let tree = r#"{"start": {"step": 1, "text": "T", "yes": "start", "no": "start"}}"#;
            let mut nav = open_with(tree, &db, Box::new(recorder.clone()));

            let err = nav.answer(Answer::Yes).unwrap_err();

            assert!(matches!(err, NavigationError::UnknownNode(ref id) if id.as_str() == "q1"));
            assert_eq!(recorder.events(), vec!["error"]);
        }

        it "refuses to answer once a result is reached" {
            let mut nav = open(SCENARIO_TREE, &db);
            nav.answer(Answer::Yes).expect("Failed to answer");
            nav.answer(Answer::Yes).expect("Failed to answer");

            let err = nav.answer(Answer::Yes).unwrap_err();

            assert!(matches!(err, NavigationError::AlreadyComplete));
            assert_eq!(nav.history().len(), 2);
        }

        it "never lands outside the bundled tree" {
            let tree = DecisionTree::from_json(BUNDLED_TREE).expect("Failed to parse tree");
            let question_ids: Vec<NodeId> = tree
                .nodes()
                .filter_map(Node::as_question)
                .map(|q| q.id.clone())
                .collect();

            for id in question_ids {
                for choice in [Answer::Yes, Answer::No] {
                    let db = Database::open_memory().expect("Failed to create database");
                    db.migrate().expect("Failed to migrate");
                    seed(&db, id.as_str(), "[]");
                    let mut nav = open(BUNDLED_TREE, &db);

                    nav.answer(choice).expect("Failed to answer");

                    assert!(tree.contains(&nav.session().current_node_id), "{} {}", id, choice);
                }
            }
        }
    }

    describe "go_back" {
        it "returns to the previous question" {
            let mut nav = open(SCENARIO_TREE, &db);
            nav.answer(Answer::Yes).expect("Failed to answer");

            nav.go_back().expect("Failed to go back");

            assert_eq!(nav.state(), &question("q1"));
            assert!(nav.history().is_empty());
            assert_eq!(db.get(CURRENT_QUESTION_KEY).expect("Query failed"), Some("q1".to_string()));
            assert_eq!(db.get(ANSWER_HISTORY_KEY).expect("Query failed"), Some("[]".to_string()));
        }

        it "drops exactly one answer when question wording has changed" {
            let tree = r#"{
                "q1": {"step": 1, "text": "T1 reworded", "yes": "q2", "no": "action_y"},
                "q2": {"step": 2, "text": "T2", "yes": "q3", "no": "action_y"},
                "q3": {"step": 3, "text": "T3", "yes": "action_y", "no": "action_y"},
                "action_y": {"title": "R", "content": "C"}
            }"#;
            seed(&db, "q3", r#"[{"question":"T1","answer":"yes"},{"question":"T2","answer":"yes"}]"#);
            let mut nav = open(tree, &db);

            nav.go_back().expect("Failed to go back");

            assert_eq!(nav.state(), &question("q2"));
            assert_eq!(nav.history(), &[AnswerEntry::new("T1", Answer::Yes)]);
            assert_eq!(db.get(CURRENT_QUESTION_KEY).expect("Query failed"), Some("q2".to_string()));
        }

        it "does nothing without history" {
            let mut nav = open(SCENARIO_TREE, &db);

            nav.go_back().expect("Failed to go back");

            assert_eq!(nav.state(), &question("q1"));
            assert_eq!(db.get(CURRENT_QUESTION_KEY).expect("Query failed"), None);
        }

        it "leaves a result and forgets it" {
            let mut nav = open(SCENARIO_TREE, &db);
            nav.answer(Answer::Yes).expect("Failed to answer");
            nav.answer(Answer::Yes).expect("Failed to answer");

            nav.go_back().expect("Failed to go back");

            assert_eq!(nav.state(), &question("q2"));
            assert!(nav.session().result.is_none());
            assert_eq!(db.get(RESULT_KEY).expect("Query failed"), None);

            let reloaded = open(SCENARIO_TREE, &db);
            assert_eq!(reloaded.state(), &question("q2"));
        }

        it "agrees with replaying every prefix of the history" {
            let tree = DecisionTree::from_json(BUNDLED_TREE).expect("Failed to parse tree");
            let root = NodeId::from("q1");
            let mut paths = Vec::new();
            question_paths(&tree, &root, Vec::new(), &mut paths);
            assert!(paths.len() > 5);

            for path in paths.iter().filter(|p| !p.is_empty()) {
                for k in 0..=path.len() {
                    let db = Database::open_memory().expect("Failed to create database");
                    db.migrate().expect("Failed to migrate");
                    let mut nav = open(BUNDLED_TREE, &db);
                    for entry in path {
                        nav.answer(entry.answer).expect("Failed to answer");
                    }

                    for _ in k..path.len() {
                        nav.go_back().expect("Failed to go back");
                    }

                    let expected = replay(&tree, &root, &path[..k]);
                    assert_eq!(nav.session().current_node_id, expected.node_id);
                    assert_eq!(nav.history(), &path[..k]);
                }
            }
        }
    }

    describe "restart" {
        it "clears storage and returns to the root" {
            let mut nav = open(SCENARIO_TREE, &db);
            nav.answer(Answer::Yes).expect("Failed to answer");
            nav.answer(Answer::Yes).expect("Failed to answer");

            nav.restart().expect("Failed to restart");

            assert_eq!(nav.state(), &question("q1"));
            assert!(nav.history().is_empty());
            assert_eq!(db.keys().expect("Query failed"), vec![CACHE_VERSION_KEY]);
        }

        it "keeps answers given after a restart" {
            let mut nav = open(SCENARIO_TREE, &db);
            nav.answer(Answer::Yes).expect("Failed to answer");
            nav.restart().expect("Failed to restart");

            nav.answer(Answer::Yes).expect("Failed to answer");

            let reloaded = open(SCENARIO_TREE, &db);
            assert_eq!(reloaded.state(), &question("q2"));
            assert_eq!(reloaded.history().len(), 1);
        }
    }

    describe "rendering" {
        it "renders each state it enters" {
            let recorder = Recorder::default();
            let mut nav = open_with(SCENARIO_TREE, &db, Box::new(recorder.clone()));

            nav.answer(Answer::Yes).expect("Failed to answer");
            nav.answer(Answer::Yes).expect("Failed to answer");
            nav.go_back().expect("Failed to go back");

            assert_eq!(
                recorder.events(),
                vec!["question q1 1/2", "question q2 2/2", "result R after 2", "question q2 2/2"]
            );
        }

        it "does not render a refused transition" {
            let recorder = Recorder::default();
            let mut nav = open_with(SCENARIO_TREE, &db, Box::new(recorder.clone()));

            let _ = nav.answer(Answer::No);

            assert_eq!(recorder.events(), vec!["question q1 1/2"]);
        }
    }
}
