use std::collections::{BTreeMap, HashMap};

use guestbook_abi::GuestbookCall;
use guestbook_abi::gas::{intrinsic_gas, required_gas};
use guestbook_types::{Account, Address, Block, Entry, Receipt, TxStatus, Wei};

use crate::block::SealedBlock;
use crate::contract::{CallContext, Effect, Guestbook, execute};
use crate::error::Revert;
use crate::tx::SignedTransaction;

/// In-memory view of the ledger: accounts, the contract and the chain head.
#[derive(Debug, Clone)]
pub struct WorldState {
    genesis_balance: Wei,
    accounts: HashMap<Address, Account>,
    guestbook: Guestbook,
    block_number: u64,
    last_timestamp: u64,
}

/// Outcome of one transaction inside a block.
struct Applied {
    gas_used: u64,
    entry: Option<Entry>,
}

impl WorldState {
    /// Rebuild from persisted rows.
    pub fn restore(
        genesis_balance: Wei,
        accounts: Vec<(Address, Account)>,
        entries: Vec<Entry>,
        contract_balance: Wei,
        head: Option<Block>,
    ) -> Self {
        let (block_number, last_timestamp) = head.map_or((0, 0), |b| (b.number, b.timestamp));
        Self {
            genesis_balance,
            accounts: accounts.into_iter().collect(),
            guestbook: Guestbook::restore(entries, contract_balance),
            block_number,
            last_timestamp,
        }
    }

    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    pub fn guestbook(&self) -> &Guestbook {
        &self.guestbook
    }

    /// Accounts never seen before are prefunded with the genesis balance.
    pub fn account(&self, address: &Address) -> Account {
        self.accounts.get(address).copied().unwrap_or(Account {
            balance: self.genesis_balance,
            nonce: 0,
        })
    }

    /// Execute `txs` in order against an overlay. `self` is not modified.
    pub fn build_block(&self, txs: &[SignedTransaction], now: u64) -> SealedBlock {
        let number = self.block_number + 1;
        let timestamp = now.max(self.last_timestamp);

        let mut touched: BTreeMap<Address, Account> = BTreeMap::new();
        let mut contract_balance = self.guestbook.balance();
        let mut entries = Vec::new();
        let mut receipts = Vec::with_capacity(txs.len());
        let mut next_index = self.guestbook.len();

        for signed in txs {
            let sender = touched
                .get(&signed.tx.from)
                .copied()
                .unwrap_or_else(|| self.account(&signed.tx.from));

            let mut receipt = Receipt::pending(signed.hash, signed.tx.from);
            receipt.block_number = Some(number);

            match self.apply_transaction(signed, &sender, timestamp) {
                Ok(applied) => {
                    let value = signed.tx.value;
                    touched.insert(
                        signed.tx.from,
                        Account {
                            balance: sender.balance - value,
                            nonce: sender.nonce + 1,
                        },
                    );
                    contract_balance = contract_balance.saturating_add(value);

                    if let Some(entry) = applied.entry {
                        entries.push((next_index, entry, signed.hash));
                        receipt.entry_index = Some(next_index);
                        next_index += 1;
                    }
                    receipt.status = TxStatus::Success;
                    receipt.gas_used = applied.gas_used;
                }
                Err(revert) => {
                    tracing::debug!(tx = %signed.hash, reason = %revert, "transaction reverted");
                    receipt.status = TxStatus::Reverted;
                    receipt.revert_reason = Some(revert.to_string());
                }
            }
            receipts.push(receipt);
        }

        SealedBlock {
            block: Block {
                number,
                timestamp,
                transactions: txs.iter().map(|t| t.hash).collect(),
            },
            entries,
            accounts: touched.into_iter().collect(),
            contract_balance,
            receipts,
        }
    }

    fn apply_transaction(
        &self,
        signed: &SignedTransaction,
        sender: &Account,
        block_time: u64,
    ) -> Result<Applied, Revert> {
        let tx = &signed.tx;

        if tx.nonce != sender.nonce {
            return Err(Revert::NonceMismatch {
                expected: sender.nonce,
                got: tx.nonce,
            });
        }

        if sender.balance < tx.value {
            return Err(Revert::InsufficientFunds {
                balance: sender.balance,
                value: tx.value,
            });
        }

        let call = GuestbookCall::decode(&tx.data);
        let required = match &call {
            Ok(call) => required_gas(&tx.data, call),
            Err(_) => intrinsic_gas(&tx.data),
        };
        if tx.gas_limit < required {
            return Err(Revert::OutOfGas {
                limit: tx.gas_limit,
                required,
            });
        }

        let ctx = CallContext {
            sender: tx.from,
            value: tx.value,
            block_time,
        };
        let entry = match execute(&ctx, &call?)? {
            Effect::Append(entry) => Some(entry),
            Effect::None => None,
        };

        Ok(Applied {
            gas_used: required,
            entry,
        })
    }

    /// Make a persisted block visible.
    pub fn apply(&mut self, sealed: &SealedBlock) {
        for (address, account) in &sealed.accounts {
            self.accounts.insert(*address, *account);
        }
        for (index, entry, _) in &sealed.entries {
            let appended = self.guestbook.append(entry.clone());
            debug_assert_eq!(appended, *index);
        }
        self.guestbook.set_balance(sealed.contract_balance);
        self.block_number = sealed.block.number;
        self.last_timestamp = sealed.block.timestamp;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guestbook_abi::encode_sign_guestbook;
    use guestbook_crypto::{Wallet, signature_to_hex};
    use guestbook_types::{Transaction, WEI_PER_ETH};

    const CHAIN: u64 = 31337;

    fn signed(wallet: &Wallet, nonce: u64, value: Wei, data: Vec<u8>) -> SignedTransaction {
        let tx = Transaction {
            from: wallet.address(),
            nonce,
            gas_limit: 500_000,
            value,
            data,
        };
        let sig = signature_to_hex(&wallet.sign_transaction(&tx, CHAIN).unwrap());
        SignedTransaction::verify(tx, &sig, CHAIN).unwrap()
    }

    fn state() -> WorldState {
        WorldState::restore(10 * WEI_PER_ETH, Vec::new(), Vec::new(), 0, None)
    }

    #[test]
    fn successful_sign_moves_value_and_bumps_nonce() {
        let mut state = state();
        let wallet = Wallet::random();
        let tip = 2 * WEI_PER_ETH / 1000;
        let block = state.build_block(
            &[signed(&wallet, 0, tip, encode_sign_guestbook("Visitor", "hello"))],
            1_000,
        );
        state.apply(&block);

        assert_eq!(block.receipts[0].status, TxStatus::Success);
        assert_eq!(block.receipts[0].entry_index, Some(0));
        let account = state.account(&wallet.address());
        assert_eq!(account.balance, 10 * WEI_PER_ETH - tip);
        assert_eq!(account.nonce, 1);
        assert_eq!(state.guestbook().balance(), tip);

        let entry = &state.guestbook().get_entries()[0];
        assert_eq!(entry.author, wallet.address());
        assert!(entry.has_tipped);
        assert_eq!(entry.timestamp, 1_000);
    }

    #[test]
    fn reverts_leave_state_untouched() {
        let mut state = state();
        let wallet = Wallet::random();
        let data = encode_sign_guestbook("Visitor", "hello");

        let block = state.build_block(
            &[
                signed(&wallet, 5, 0, data.clone()),
                signed(&wallet, 0, 11 * WEI_PER_ETH, data.clone()),
                signed(&wallet, 0, 1, guestbook_abi::GuestbookCall::GetEntries.encode()),
            ],
            1_000,
        );
        state.apply(&block);

        let reasons: Vec<_> = block.receipts.iter().map(|r| r.status).collect();
        assert_eq!(reasons, vec![TxStatus::Reverted; 3]);
        assert!(block.receipts[0].revert_reason.as_deref().unwrap().contains("nonce"));
        assert!(block.receipts[1].revert_reason.as_deref().unwrap().contains("insufficient"));
        assert!(block.receipts[2].revert_reason.as_deref().unwrap().contains("payable"));
        assert!(state.guestbook().is_empty());
        assert_eq!(state.account(&wallet.address()).nonce, 0);
        assert_eq!(state.guestbook().balance(), 0);
    }

    #[test]
    fn out_of_gas_reverts() {
        let state = state();
        let wallet = Wallet::random();
        let data = encode_sign_guestbook("Visitor", "hello");
        let tx = Transaction {
            from: wallet.address(),
            nonce: 0,
            gas_limit: 21_000,
            value: 0,
            data,
        };
        let sig = signature_to_hex(&wallet.sign_transaction(&tx, CHAIN).unwrap());
        let signed = SignedTransaction::verify(tx, &sig, CHAIN).unwrap();

        let block = state.build_block(&[signed], 1);
        assert_eq!(block.receipts[0].status, TxStatus::Reverted);
        assert!(block.entries.is_empty());
        assert!(block.accounts.is_empty());
    }

    #[test]
    fn sequential_nonces_in_one_block() {
        let mut state = state();
        let wallet = Wallet::random();
        let block = state.build_block(
            &[
                signed(&wallet, 0, 0, encode_sign_guestbook("A", "first")),
                signed(&wallet, 1, 0, encode_sign_guestbook("A", "second")),
            ],
            7,
        );
        state.apply(&block);

        let messages: Vec<_> = state
            .guestbook()
            .get_entries()
            .iter()
            .map(|e| e.message.as_str())
            .collect();
        assert_eq!(messages, ["first", "second"]);
        assert_eq!(state.account(&wallet.address()).nonce, 2);
    }

    #[test]
    fn block_time_never_goes_backwards() {
        let mut state = state();
        let wallet = Wallet::random();
        let first = state.build_block(&[signed(&wallet, 0, 0, encode_sign_guestbook("A", "1"))], 500);
        state.apply(&first);
        let second = state.build_block(&[signed(&wallet, 1, 0, encode_sign_guestbook("A", "2"))], 400);

        assert_eq!(second.block.timestamp, 500);
        assert_eq!(second.block.number, 2);
        assert_eq!(second.entries[0].1.timestamp, 500);
    }

    #[test]
    fn events_follow_block_order() {
        use guestbook_types::events::FeedEvent;

        let state = state();
        let wallet = Wallet::random();
        let block = state.build_block(
            &[
                signed(&wallet, 3, 0, encode_sign_guestbook("A", "bad nonce")),
                signed(&wallet, 0, 0, encode_sign_guestbook("A", "ok")),
            ],
            9,
        );
        let events = block.events();
        assert!(matches!(events[0], FeedEvent::TransactionReverted { .. }));
        assert!(matches!(events[1], FeedEvent::EntryAppended { index: 0, .. }));
        assert!(matches!(events[2], FeedEvent::BlockMined { number: 1, transaction_count: 2, .. }));
    }
}
