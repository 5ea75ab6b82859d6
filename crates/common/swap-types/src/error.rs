use crate::address::Address;
use thiserror::Error;

/// Errors produced when parsing addresses and peer ids.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid hex encoding: {0}")]
    InvalidHex(String),

    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Errors reported by a state store.
///
/// `NotFound` is the benign outcome: callers treat it as "zero balance" or
/// "no prior cheque". Every other variant aborts the operation in progress.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("failed to encode or decode value for {key}: {reason}")]
    Codec { key: String, reason: String },

    #[error("store is closed")]
    Closed,
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Errors around cheque signing and validation.
#[derive(Debug, Error)]
pub enum ChequeError {
    #[error("invalid cheque signature")]
    InvalidSignature,

    #[error("failed to sign cheque: {0}")]
    Signing(String),

    #[error("failed to recover cheque signer: {0}")]
    SignatureRecovery(String),

    #[error("cheque beneficiary {actual} does not match {expected}")]
    WrongBeneficiary { expected: Address, actual: Address },

    #[error("cheque serial {serial} is not greater than last received serial {last}")]
    StaleSerial { serial: u64, last: u64 },

    #[error("cheque amount {amount} is lower than last received amount {last}")]
    DecreasingAmount { amount: u64, last: u64 },
}
