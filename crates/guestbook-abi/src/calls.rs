use std::sync::LazyLock;

use guestbook_crypto::keccak256;

use crate::codec::{AbiError, Decoder, WORD, encode_bytes_tail, uint_word};

pub const SIGN_GUESTBOOK_SIGNATURE: &str = "signGuestbook(string,string)";
pub const GET_ENTRIES_SIGNATURE: &str = "getEntries()";

pub static SIGN_GUESTBOOK_SELECTOR: LazyLock<[u8; 4]> =
    LazyLock::new(|| selector(SIGN_GUESTBOOK_SIGNATURE));
pub static GET_ENTRIES_SELECTOR: LazyLock<[u8; 4]> =
    LazyLock::new(|| selector(GET_ENTRIES_SIGNATURE));

/// First four bytes of keccak256 of the canonical function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// A decoded contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuestbookCall {
    SignGuestbook { display_name: String, message: String },
    GetEntries,
}

impl GuestbookCall {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::SignGuestbook { display_name, message } => {
                encode_sign_guestbook(display_name, message)
            }
            Self::GetEntries => GET_ENTRIES_SELECTOR.to_vec(),
        }
    }

    /// Trailing bytes past the last argument are ignored, as the EVM does.
    pub fn decode(data: &[u8]) -> Result<Self, AbiError> {
        if data.len() < 4 {
            return Err(AbiError::MissingSelector);
        }
        let sel = [data[0], data[1], data[2], data[3]];
        let args = Decoder::new(&data[4..]);

        if sel == *SIGN_GUESTBOOK_SELECTOR {
            Ok(Self::SignGuestbook {
                display_name: args.string_at_head(0)?,
                message: args.string_at_head(WORD)?,
            })
        } else if sel == *GET_ENTRIES_SELECTOR {
            Ok(Self::GetEntries)
        } else {
            Err(AbiError::UnknownSelector(sel))
        }
    }

    /// Only `signGuestbook` accepts attached value.
    pub fn is_payable(&self) -> bool {
        matches!(self, Self::SignGuestbook { .. })
    }

    pub fn mutates_state(&self) -> bool {
        matches!(self, Self::SignGuestbook { .. })
    }
}

pub fn encode_sign_guestbook(display_name: &str, message: &str) -> Vec<u8> {
    let name = encode_bytes_tail(display_name.as_bytes());
    let msg = encode_bytes_tail(message.as_bytes());

    let mut out = Vec::with_capacity(4 + 2 * WORD + name.len() + msg.len());
    out.extend_from_slice(&*SIGN_GUESTBOOK_SELECTOR);
    out.extend_from_slice(&uint_word((2 * WORD) as u128));
    out.extend_from_slice(&uint_word((2 * WORD + name.len()) as u128));
    out.extend_from_slice(&name);
    out.extend_from_slice(&msg);
    out
}
