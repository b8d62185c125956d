//! Seal submission outcomes
//!
//! Immediate admission and deferred admission mean different things: the first reports what
//! the chain engine did, the second only that the seal was structurally valid and queued.
//! Both count as accepted for callers that need a plain boolean.

use sealer_types::ImportResult;
use std::fmt;
use std::time::Duration;

/// Result of submitting a seal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SealOutcome {
    /// Chain engine admitted the block before the call returned
    Imported(ImportResult),
    /// Block queued for submission once its timestamp arrives
    Deferred { delay: Duration },
    /// Seal not admitted
    Rejected(RejectReason),
}

impl SealOutcome {
    /// Map an engine result onto an outcome
    pub fn from_import(result: ImportResult) -> Self {
        if result.is_successful() {
            SealOutcome::Imported(result)
        } else {
            SealOutcome::Rejected(RejectReason::ImportFailed(result))
        }
    }

    /// Boolean view used by the RPC layer
    pub fn is_accepted(&self) -> bool {
        matches!(self, SealOutcome::Imported(_) | SealOutcome::Deferred { .. })
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, SealOutcome::Deferred { .. })
    }

    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            SealOutcome::Rejected(reason) => Some(*reason),
            _ => None,
        }
    }
}

/// Why a seal was not admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No template cached under the seal hash (expired, replaced or replayed)
    UnknownTemplate,
    /// Template already carries a seal
    AlreadySealed,
    /// Seal hash does not match the template's mine hash
    MineHashMismatch,
    /// Sealed header is too far in the future
    FutureTimestamp,
    /// Chain engine refused the block
    ImportFailed(ImportResult),
    /// Deferred submission requested after shutdown
    SubmitterClosed,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::UnknownTemplate => f.write_str("unknown template"),
            RejectReason::AlreadySealed => f.write_str("template already sealed"),
            RejectReason::MineHashMismatch => f.write_str("seal hash does not match template"),
            RejectReason::FutureTimestamp => f.write_str("timestamp in the future"),
            RejectReason::ImportFailed(result) => write!(f, "import failed: {}", result),
            RejectReason::SubmitterClosed => f.write_str("deferred submitter closed"),
        }
    }
}
