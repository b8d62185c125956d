//! Error types for the reference collaborators

use sealer_types::Address;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum KeystoreError {
    #[error("Unknown account: {0}")]
    UnknownAccount(Address),

    #[error("Account is locked: {0}")]
    Locked(Address),
}
