pub mod api;
pub mod events;
pub mod models;
pub mod tx;

pub use models::{Account, Address, Block, Entry, Receipt, TxHash, TxStatus, WEI_PER_ETH, Wei};
pub use tx::Transaction;
