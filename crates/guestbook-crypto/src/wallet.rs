use k256::ecdsa::SigningKey;
use rand_core::OsRng;

use guestbook_types::{Address, Transaction};

use crate::hash::personal_message_hash;
use crate::signature::{CryptoError, address_of};

/// A secp256k1 key pair that signs the way browser wallets do.
#[derive(Clone)]
pub struct Wallet {
    key: SigningKey,
    address: Address,
}

impl Wallet {
    pub fn random() -> Self {
        Self::from_key(SigningKey::random(&mut OsRng))
    }

    /// Load a 32-byte private key from `0x` hex.
    pub fn from_hex(private_key: &str) -> Result<Self, CryptoError> {
        let digits = private_key.strip_prefix("0x").unwrap_or(private_key);
        let bytes = hex::decode(digits).map_err(|_| CryptoError::PrivateKey)?;
        let key = SigningKey::from_slice(&bytes).map_err(|_| CryptoError::PrivateKey)?;
        Ok(Self::from_key(key))
    }

    fn from_key(key: SigningKey) -> Self {
        let address = address_of(key.verifying_key());
        Self { key, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign a digest; `v` is emitted as 27/28.
    pub fn sign_prehash(&self, digest: &[u8; 32]) -> Result<[u8; 65], CryptoError> {
        let (sig, recid) = self
            .key
            .sign_prehash_recoverable(digest)
            .map_err(|_| CryptoError::Malformed)?;
        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&sig.to_bytes());
        out[64] = recid.to_byte() + 27;
        Ok(out)
    }

    /// EIP-191 `personal_sign`.
    pub fn sign_message(&self, message: &[u8]) -> Result<[u8; 65], CryptoError> {
        self.sign_prehash(&personal_message_hash(message))
    }

    pub fn sign_transaction(
        &self,
        tx: &Transaction,
        chain_id: u64,
    ) -> Result<[u8; 65], CryptoError> {
        self.sign_message(tx.signing_payload(chain_id).as_bytes())
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet").field("address", &self.address).finish_non_exhaustive()
    }
}
