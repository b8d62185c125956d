//! Sealer errors
//!
//! Only precondition and lifecycle failures are errors. A seal that does not make it onto the
//! chain is reported as a [`crate::SealOutcome`], not as an error.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SealerError>;

#[derive(Error, Debug)]
pub enum SealerError {
    #[error("Staking is not active at the next block")]
    StakingInactive,

    #[error("Deferred submitter is closed")]
    SubmitterClosed,

    #[error("No tokio runtime for deferred submissions: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    #[error("Missing component: {0}")]
    MissingComponent(&'static str),
}
