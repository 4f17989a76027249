use thiserror::Error;

use crate::shared::models::ir::StmtId;

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Crate-level error taxonomy.
///
/// Only configuration problems and broken internal invariants surface as
/// errors. Data-level anomalies (division by zero during constant
/// propagation, a dispatch that finds no target) are folded into the
/// lattice or into an empty callee set and never cross this boundary.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("entry method not found: {0}")]
    EntryMethodNotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("argument count mismatch at call site {call_site:?}: expected {expected}, got {actual}")]
    ArityMismatch {
        call_site: StmtId,
        expected: usize,
        actual: usize,
    },

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl AnalysisError {
    pub fn config<E: std::fmt::Display>(e: E) -> Self {
        Self::Config(e.to_string())
    }

    pub fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal(e.to_string())
    }
}
