/// Guestbook Crypto Library
///
/// Ethereum-compatible primitives used to establish who sent a transaction:
/// - Keccak-256 hashing and EIP-191 personal-message digests
/// - secp256k1 signer recovery and address derivation
/// - Transaction hashing and signer checks over the canonical signing payload
///
/// The `client` feature adds `Wallet` for key generation and signing. The
/// node only ever verifies.

pub mod hash;
pub mod signature;
pub mod tx;

#[cfg(feature = "client")]
pub mod wallet;

pub use hash::{keccak256, personal_message_hash};
pub use signature::{CryptoError, address_of, parse_signature, recover_personal, signature_to_hex};
pub use tx::{transaction_hash, transaction_signer};

#[cfg(feature = "client")]
pub use wallet::Wallet;
