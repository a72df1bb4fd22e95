use crate::calls::GuestbookCall;

/// Flat cost of any transaction.
pub const TX_BASE_GAS: u64 = 21_000;
pub const CALLDATA_ZERO_BYTE_GAS: u64 = 4;
pub const CALLDATA_NONZERO_BYTE_GAS: u64 = 16;

/// Appending an entry: array length bump plus author, timestamp and tip flag slots.
pub const ENTRY_BASE_GAS: u64 = 4 * 22_100;

/// Each 32-byte word of stored string data.
pub const STRING_WORD_GAS: u64 = 22_100;

pub fn intrinsic_gas(data: &[u8]) -> u64 {
    data.iter().fold(TX_BASE_GAS, |acc, byte| {
        acc.saturating_add(if *byte == 0 {
            CALLDATA_ZERO_BYTE_GAS
        } else {
            CALLDATA_NONZERO_BYTE_GAS
        })
    })
}

pub fn execution_gas(call: &GuestbookCall) -> u64 {
    match call {
        GuestbookCall::SignGuestbook { display_name, message } => {
            let words = (display_name.len().div_ceil(32) + message.len().div_ceil(32)) as u64;
            ENTRY_BASE_GAS.saturating_add(STRING_WORD_GAS.saturating_mul(words))
        }
        GuestbookCall::GetEntries => 0,
    }
}

/// Gas a transaction carrying `data` that decodes to `call` must be allowed.
pub fn required_gas(data: &[u8], call: &GuestbookCall) -> u64 {
    intrinsic_gas(data).saturating_add(execution_gas(call))
}
