use guestbook_abi::{GuestbookCall, encode_entries};
use guestbook_types::{Address, Entry, Wei};

use crate::error::Revert;

/// Execution environment of one call. Filled in by the executor from the
/// transaction and the block, never from the caller's arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub sender: Address,
    pub value: Wei,
    pub block_time: u64,
}

/// What a successful state-changing call asks storage to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Append(Entry),
    None,
}

/// `signGuestbook(displayName, message)`. The author is the sender; the
/// display name is taken as given.
pub fn sign_guestbook(ctx: &CallContext, display_name: String, message: String) -> Entry {
    Entry {
        author: ctx.sender,
        display_name,
        message,
        timestamp: ctx.block_time,
        has_tipped: ctx.value > 0,
    }
}

/// Transaction entry point.
pub fn execute(ctx: &CallContext, call: &GuestbookCall) -> Result<Effect, Revert> {
    if ctx.value > 0 && !call.is_payable() {
        return Err(Revert::NonPayable);
    }

    match call {
        GuestbookCall::SignGuestbook { display_name, message } => Ok(Effect::Append(
            sign_guestbook(ctx, display_name.clone(), message.clone()),
        )),
        GuestbookCall::GetEntries => Ok(Effect::None),
    }
}

/// Contract storage: the entry array and the accumulated tip balance.
/// There is no operation that edits or removes an entry, and none that
/// withdraws the balance.
#[derive(Debug, Clone, Default)]
pub struct Guestbook {
    entries: Vec<Entry>,
    balance: Wei,
}

impl Guestbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn restore(entries: Vec<Entry>, balance: Wei) -> Self {
        Self { entries, balance }
    }

    /// `getEntries()`: the whole history in insertion order.
    pub fn get_entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry(&self, index: u64) -> Option<&Entry> {
        usize::try_from(index).ok().and_then(|i| self.entries.get(i))
    }

    pub fn len(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn balance(&self) -> Wei {
        self.balance
    }

    /// Read-only call (no transaction, no gas charged to the caller).
    pub fn call(&self, data: &[u8]) -> Result<Vec<u8>, Revert> {
        let call = GuestbookCall::decode(data)?;
        if call.mutates_state() {
            return Err(Revert::StaticCallViolation);
        }
        Ok(encode_entries(&self.entries))
    }

    pub(crate) fn append(&mut self, entry: Entry) -> u64 {
        self.entries.push(entry);
        self.entries.len() as u64 - 1
    }

    pub(crate) fn set_balance(&mut self, balance: Wei) {
        self.balance = balance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guestbook_abi::{GuestbookCall, decode_entries, encode_sign_guestbook};

    fn ctx(byte: u8, value: Wei, block_time: u64) -> CallContext {
        CallContext {
            sender: Address([byte; 20]),
            value,
            block_time,
        }
    }

    #[test]
    fn author_comes_from_sender_not_display_name() {
        let entry = sign_guestbook(&ctx(0xaa, 0, 100), "0xbbbb-the-owner".into(), "hi".into());
        assert_eq!(entry.author, Address([0xaa; 20]));
        assert_eq!(entry.display_name, "0xbbbb-the-owner");
        assert_eq!(entry.timestamp, 100);
    }

    #[test]
    fn tip_flag_tracks_attached_value() {
        assert!(!sign_guestbook(&ctx(1, 0, 1), "a".into(), "b".into()).has_tipped);
        assert!(sign_guestbook(&ctx(1, 1, 1), "a".into(), "b".into()).has_tipped);
    }

    #[test]
    fn get_entries_is_not_payable() {
        assert_eq!(
            execute(&ctx(1, 5, 1), &GuestbookCall::GetEntries),
            Err(Revert::NonPayable)
        );
        assert_eq!(execute(&ctx(1, 0, 1), &GuestbookCall::GetEntries), Ok(Effect::None));
    }

    #[test]
    fn static_call_reads_and_refuses_writes() {
        let mut book = Guestbook::new();
        book.append(sign_guestbook(&ctx(0xaa, 0, 100), "Visitor".into(), "hello world".into()));

        let data = GuestbookCall::GetEntries.encode();
        let first = book.call(&data).unwrap();
        let second = book.call(&data).unwrap();
        assert_eq!(first, second);
        assert_eq!(decode_entries(&first).unwrap(), book.get_entries());

        assert_eq!(
            book.call(&encode_sign_guestbook("Visitor", "sneaky")),
            Err(Revert::StaticCallViolation)
        );
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn append_assigns_sequential_indices() {
        let mut book = Guestbook::new();
        assert!(book.is_empty());
        assert_eq!(book.append(sign_guestbook(&ctx(1, 0, 1), "a".into(), "1".into())), 0);
        assert_eq!(book.append(sign_guestbook(&ctx(2, 0, 2), "b".into(), "2".into())), 1);
        assert_eq!(book.entry(1).unwrap().message, "2");
        assert!(book.entry(2).is_none());
    }
}
