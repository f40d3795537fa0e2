//! A yes/no decision-tree questionnaire with progress that survives restarts.
//!
//! The [`navigation::Navigator`] walks a [`tree::DecisionTree`], recording each
//! answer in the session's history and mirroring the session to local storage
//! through [`persistence::SessionStore`]. Two front-ends drive it: an
//! interactive terminal loop and a JSON HTTP API ([`api`]).

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod navigation;
pub mod persistence;
pub mod progress;
pub mod render;
pub mod storage;
pub mod tree;
