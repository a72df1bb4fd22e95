use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Amounts are denominated in wei. 1 ETH = 10^18 wei.
pub type Wei = u128;

pub const WEI_PER_ETH: Wei = 1_000_000_000_000_000_000;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParseHexError {
    #[error("missing 0x prefix")]
    MissingPrefix,
    #[error("expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

fn parse_prefixed<const N: usize>(s: &str) -> Result<[u8; N], ParseHexError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or(ParseHexError::MissingPrefix)?;
    let bytes = hex::decode(digits)?;
    let actual = bytes.len();
    bytes.try_into().map_err(|_| ParseHexError::Length { expected: N, actual })
}

/// 20-byte account address, rendered as lowercase `0x` hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// `0x1234...abcd` form used in feeds.
    pub fn short(&self) -> String {
        let full = self.to_string();
        format!("{}...{}", &full[..6], &full[full.len() - 4..])
    }

    /// Block explorer link for this address, e.g. `https://sepolia.etherscan.io/address/0x..`.
    pub fn explorer_url(&self, explorer_base: &str) -> String {
        format!("{}/address/{}", explorer_base.trim_end_matches('/'), self)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = ParseHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_prefixed::<20>(s).map(Address)
    }
}

/// Keccak-256 transaction hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TxHash(pub [u8; 32]);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self)
    }
}

impl FromStr for TxHash {
    type Err = ParseHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_prefixed::<32>(s).map(TxHash)
    }
}

macro_rules! hex_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_serde!(Address);
hex_serde!(TxHash);

/// Serde helper: wei amounts travel as decimal strings so JS clients keep full precision.
pub mod wei_string {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Wei;

    pub fn serialize<S: Serializer>(value: &Wei, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Wei, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.trim().parse().map_err(serde::de::Error::custom)
    }
}

/// One signed guestbook record. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Transaction sender, not the self-declared display name.
    pub author: Address,
    pub display_name: String,
    pub message: String,
    /// Block time in unix seconds.
    pub timestamp: u64,
    pub has_tipped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(with = "wei_string")]
    pub balance: Wei,
    pub nonce: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub number: u64,
    pub timestamp: u64,
    pub transactions: Vec<TxHash>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Success,
    Reverted,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Success => "success",
            TxStatus::Reverted => "reverted",
        }
    }
}

impl FromStr for TxStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TxStatus::Pending),
            "success" => Ok(TxStatus::Success),
            "reverted" => Ok(TxStatus::Reverted),
            other => Err(format!("unknown transaction status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub from: Address,
    pub status: TxStatus,
    pub revert_reason: Option<String>,
    pub block_number: Option<u64>,
    /// Ledger index of the appended entry, for successful `signGuestbook` calls.
    pub entry_index: Option<u64>,
    pub gas_used: u64,
}

impl Receipt {
    pub fn pending(tx_hash: TxHash, from: Address) -> Self {
        Self {
            tx_hash,
            from,
            status: TxStatus::Pending,
            revert_reason: None,
            block_number: None,
            entry_index: None,
            gas_used: 0,
        }
    }
}

/// Render a wei amount as a decimal ETH string without losing precision.
pub fn format_eth(wei: Wei) -> String {
    let whole = wei / WEI_PER_ETH;
    let frac = wei % WEI_PER_ETH;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:018}", frac);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}
