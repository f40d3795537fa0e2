//! Step counter shown alongside each question.

use serde::{Deserialize, Serialize};

/// Number of question nodes in the bundled tree (`data/tree.json`).
///
/// This is a design constant and must be kept in step with the tree.
pub const TOTAL_STEPS: u32 = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub step: u32,
    pub total: u32,
    pub percentage: f64,
    pub label: String,
}

pub fn progress(step: u32, total: u32) -> Progress {
    let percentage = if total == 0 {
        0.0
    } else {
        f64::from(step) / f64::from(total) * 100.0
    };

    Progress {
        step,
        total,
        percentage,
        label: format!("{}/{}", step, total),
    }
}
