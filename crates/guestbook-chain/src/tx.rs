use guestbook_crypto::{parse_signature, transaction_hash, transaction_signer};
use guestbook_types::{Transaction, TxHash};

use crate::error::Revert;

/// A transaction whose signature has been checked against its `from` field.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub tx: Transaction,
    pub signature: [u8; 65],
    pub hash: TxHash,
}

impl SignedTransaction {
    /// Fails when there is no usable signature or it belongs to someone else.
    pub fn verify(tx: Transaction, signature: &str, chain_id: u64) -> Result<Self, Revert> {
        let signature = parse_signature(signature)?;
        let recovered = transaction_signer(&tx, chain_id, &signature)?;
        if recovered != tx.from {
            return Err(Revert::SignerMismatch {
                claimed: tx.from,
                recovered,
            });
        }
        let hash = transaction_hash(&tx, chain_id);
        Ok(Self { tx, signature, hash })
    }
}
