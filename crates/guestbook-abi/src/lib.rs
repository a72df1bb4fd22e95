/// Binary contract interface for the guestbook ledger.
///
/// Solidity ABI v2 encoding of the two contract functions:
///
/// ```text
/// signGuestbook(string displayName, string message)   payable, no return
/// getEntries() view returns ((address,string,string,uint256,bool)[])
/// ```
///
/// plus the gas schedule shared by the node and clients.

pub mod calls;
pub mod codec;
pub mod entries;
pub mod gas;
pub mod json;

pub use calls::{GET_ENTRIES_SIGNATURE, GuestbookCall, SIGN_GUESTBOOK_SIGNATURE, encode_sign_guestbook, selector};
pub use codec::AbiError;
pub use entries::{decode_entries, encode_entries};
pub use json::abi_json;
