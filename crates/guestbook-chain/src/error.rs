use guestbook_abi::AbiError;
use guestbook_crypto::CryptoError;
use guestbook_types::{Address, Wei};

/// Transaction-level failure. A reverted transaction leaves the ledger,
/// balances and nonces exactly as they were.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum Revert {
    #[error("no valid signer: {0}")]
    InvalidSignature(#[from] CryptoError),
    #[error("signature recovers to {recovered}, not the sender {claimed}")]
    SignerMismatch { claimed: Address, recovered: Address },
    #[error("nonce mismatch: expected {expected}, got {got}")]
    NonceMismatch { expected: u64, got: u64 },
    #[error("insufficient funds: balance {balance} wei, value {value} wei")]
    InsufficientFunds { balance: Wei, value: Wei },
    #[error("out of gas: limit {limit}, required {required}")]
    OutOfGas { limit: u64, required: u64 },
    #[error("function is not payable")]
    NonPayable,
    #[error("state-changing function called without a transaction")]
    StaticCallViolation,
    #[error("malformed calldata: {0}")]
    Calldata(#[from] AbiError),
    #[error("block could not be persisted")]
    StorageFailure,
}

/// Reasons the pending pool refuses a transaction outright.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Rejected(#[from] Revert),
    #[error("transaction already known")]
    Duplicate,
    #[error("pending pool is full ({0} transactions)")]
    PoolFull(usize),
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}
