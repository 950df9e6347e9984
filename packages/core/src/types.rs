// ABOUTME: Small shared types used across Daybook packages
// ABOUTME: Batch-operation outcome reporting

use serde::Serialize;

/// Outcome of a batch operation: rows that fail their guard are skipped,
/// not failed, so one bad id never aborts the rest.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub requested: usize,
    pub affected: usize,
}
