use serde::{Deserialize, Serialize};

use crate::models::{Address, Wei, wei_string};

/// An unsigned contract transaction. `data` is ABI calldata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub from: Address,
    pub nonce: u64,
    pub gas_limit: u64,
    #[serde(with = "wei_string")]
    pub value: Wei,
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
}

impl Transaction {
    /// Text the sender signs as an EIP-191 personal message. The transaction
    /// hash is keccak256 over these same bytes.
    pub fn signing_payload(&self, chain_id: u64) -> String {
        format!(
            "guestbook-tx\nchain:{}\nfrom:{}\nnonce:{}\ngas:{}\nvalue:{}\ndata:0x{}",
            chain_id,
            self.from,
            self.nonce,
            self.gas_limit,
            self.value,
            hex::encode(&self.data)
        )
    }
}

/// `0x`-prefixed hex for byte payloads (calldata, signatures, return data).
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&format_args!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        let digits = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(digits).map_err(serde::de::Error::custom)
    }
}
