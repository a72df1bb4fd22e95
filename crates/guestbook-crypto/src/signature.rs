use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

use guestbook_types::Address;

use crate::hash::{keccak256, personal_message_hash};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("signature must be 65 bytes, got {0}")]
    SignatureLength(usize),
    #[error("signature is not valid hex")]
    SignatureHex,
    #[error("invalid recovery id {0}")]
    RecoveryId(u8),
    #[error("malformed signature")]
    Malformed,
    #[error("signature does not recover to a public key")]
    Recovery,
    #[error("invalid private key")]
    PrivateKey,
}

/// Parse a `0x`-prefixed (or bare) hex `r || s || v` signature.
pub fn parse_signature(encoded: &str) -> Result<[u8; 65], CryptoError> {
    let digits = encoded.strip_prefix("0x").unwrap_or(encoded);
    let bytes = hex::decode(digits).map_err(|_| CryptoError::SignatureHex)?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| CryptoError::SignatureLength(len))
}

pub fn signature_to_hex(signature: &[u8; 65]) -> String {
    format!("0x{}", hex::encode(signature))
}

/// Address = last 20 bytes of keccak256(uncompressed public key without the 0x04 tag).
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash[12..]);
    Address(out)
}

/// Recover the signer of a 32-byte digest. Accepts `v` as 27/28 or 0/1.
pub fn recover_prehash(digest: &[u8; 32], signature: &[u8; 65]) -> Result<Address, CryptoError> {
    let v = signature[64];
    let recid_byte = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        other => return Err(CryptoError::RecoveryId(other)),
    };
    let recid = RecoveryId::from_byte(recid_byte).ok_or(CryptoError::RecoveryId(v))?;
    let sig = Signature::from_slice(&signature[..64]).map_err(|_| CryptoError::Malformed)?;
    let key = VerifyingKey::recover_from_prehash(digest, &sig, recid)
        .map_err(|_| CryptoError::Recovery)?;
    Ok(address_of(&key))
}

/// Recover the signer of an EIP-191 personal message.
pub fn recover_personal(message: &[u8], signature: &[u8; 65]) -> Result<Address, CryptoError> {
    recover_prehash(&personal_message_hash(message), signature)
}
