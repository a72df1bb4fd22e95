use guestbook_types::{Address, Transaction, TxHash};

use crate::hash::keccak256;
use crate::signature::{CryptoError, recover_personal};

pub fn transaction_hash(tx: &Transaction, chain_id: u64) -> TxHash {
    TxHash(keccak256(tx.signing_payload(chain_id).as_bytes()))
}

/// Address that produced `signature` over the transaction's signing payload.
/// Callers compare it against `tx.from`.
pub fn transaction_signer(
    tx: &Transaction,
    chain_id: u64,
    signature: &[u8; 65],
) -> Result<Address, CryptoError> {
    recover_personal(tx.signing_payload(chain_id).as_bytes(), signature)
}
