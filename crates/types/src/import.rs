//! Result of handing a sealed block to the chain engine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of `ChainEngine::add_new_block`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportResult {
    /// Imported and became the new best block
    ImportedBest,
    /// Imported on a side chain
    ImportedNotBest,
    /// Already known
    Exist,
    /// Parent is unknown
    NoParent,
    /// Failed validation
    Invalid,
    /// Violates a consensus rule that cannot be recovered by resubmission
    ConsensusBreak,
}

impl ImportResult {
    pub fn is_successful(&self) -> bool {
        matches!(self, ImportResult::ImportedBest | ImportResult::ImportedNotBest)
    }
}

impl fmt::Display for ImportResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImportResult::ImportedBest => "imported best",
            ImportResult::ImportedNotBest => "imported not best",
            ImportResult::Exist => "exist",
            ImportResult::NoParent => "no parent",
            ImportResult::Invalid => "invalid",
            ImportResult::ConsensusBreak => "consensus break",
        };
        f.write_str(s)
    }
}
