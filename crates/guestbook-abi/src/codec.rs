use guestbook_types::Address;

/// ABI word size in bytes.
pub const WORD: usize = 32;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AbiError {
    #[error("calldata shorter than a 4-byte selector")]
    MissingSelector,
    #[error("unknown selector 0x{}", hex::encode(.0))]
    UnknownSelector([u8; 4]),
    #[error("data truncated")]
    Truncated,
    #[error("offset out of range")]
    InvalidOffset,
    #[error("integer does not fit the target type")]
    Overflow,
    #[error("address word has non-zero padding")]
    InvalidAddress,
    #[error("bool word is neither 0 nor 1")]
    InvalidBool,
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
}

pub fn uint_word(value: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

pub fn address_word(address: &Address) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

pub fn bool_word(value: bool) -> [u8; WORD] {
    uint_word(value as u128)
}

/// Tail encoding of `bytes`/`string`: length word, then the data right-padded to a word boundary.
pub fn encode_bytes_tail(bytes: &[u8]) -> Vec<u8> {
    let padded = bytes.len().div_ceil(WORD) * WORD;
    let mut out = Vec::with_capacity(WORD + padded);
    out.extend_from_slice(&uint_word(bytes.len() as u128));
    out.extend_from_slice(bytes);
    out.resize(WORD + padded, 0);
    out
}

/// Bounds-checked reads over an encoded region. Offsets are relative to the
/// start of the region, which is how ABI head offsets are defined.
#[derive(Clone, Copy)]
pub struct Decoder<'a> {
    data: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Sub-region starting at `offset`.
    pub fn region(&self, offset: usize) -> Result<Decoder<'a>, AbiError> {
        self.data
            .get(offset..)
            .map(Decoder::new)
            .ok_or(AbiError::InvalidOffset)
    }

    pub fn word(&self, offset: usize) -> Result<&'a [u8], AbiError> {
        let end = offset.checked_add(WORD).ok_or(AbiError::InvalidOffset)?;
        self.data.get(offset..end).ok_or(AbiError::Truncated)
    }

    pub fn uint(&self, offset: usize) -> Result<u128, AbiError> {
        let word = self.word(offset)?;
        if word[..16].iter().any(|b| *b != 0) {
            return Err(AbiError::Overflow);
        }
        let mut low = [0u8; 16];
        low.copy_from_slice(&word[16..]);
        Ok(u128::from_be_bytes(low))
    }

    pub fn usize_at(&self, offset: usize) -> Result<usize, AbiError> {
        usize::try_from(self.uint(offset)?).map_err(|_| AbiError::Overflow)
    }

    pub fn u64_at(&self, offset: usize) -> Result<u64, AbiError> {
        u64::try_from(self.uint(offset)?).map_err(|_| AbiError::Overflow)
    }

    pub fn address(&self, offset: usize) -> Result<Address, AbiError> {
        let word = self.word(offset)?;
        if word[..12].iter().any(|b| *b != 0) {
            return Err(AbiError::InvalidAddress);
        }
        let mut out = [0u8; 20];
        out.copy_from_slice(&word[12..]);
        Ok(Address(out))
    }

    pub fn bool(&self, offset: usize) -> Result<bool, AbiError> {
        match self.uint(offset) {
            Ok(0) => Ok(false),
            Ok(1) => Ok(true),
            Ok(_) | Err(AbiError::Overflow) => Err(AbiError::InvalidBool),
            Err(e) => Err(e),
        }
    }

    /// Read a string whose length word sits at `offset`.
    pub fn string(&self, offset: usize) -> Result<String, AbiError> {
        let len = self.usize_at(offset)?;
        let start = offset + WORD;
        let end = start.checked_add(len).ok_or(AbiError::Overflow)?;
        let bytes = self.data.get(start..end).ok_or(AbiError::Truncated)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| AbiError::InvalidUtf8)
    }

    /// Follow the head word at `head` to a dynamic string.
    pub fn string_at_head(&self, head: usize) -> Result<String, AbiError> {
        let offset = self.usize_at(head)?;
        if offset > self.data.len() {
            return Err(AbiError::InvalidOffset);
        }
        self.string(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_tail_is_padded() {
        let tail = encode_bytes_tail(b"hi");
        assert_eq!(tail.len(), 64);
        assert_eq!(tail[31], 2);
        assert_eq!(&tail[32..34], b"hi");
        assert!(tail[34..].iter().all(|b| *b == 0));

        assert_eq!(encode_bytes_tail(b"").len(), 32);
        assert_eq!(encode_bytes_tail(&[7u8; 32]).len(), 64);
        assert_eq!(encode_bytes_tail(&[7u8; 33]).len(), 96);
    }

    #[test]
    fn decoder_rejects_dirty_padding() {
        let mut word = address_word(&Address([0x11; 20]));
        let d = Decoder::new(&word);
        assert_eq!(d.address(0).unwrap(), Address([0x11; 20]));

        word[0] = 1;
        let d = Decoder::new(&word);
        assert_eq!(d.address(0), Err(AbiError::InvalidAddress));
        assert_eq!(d.uint(0), Err(AbiError::Overflow));
        assert_eq!(d.bool(0), Err(AbiError::InvalidBool));
    }

    #[test]
    fn decoder_bounds() {
        let word = uint_word(2);
        let d = Decoder::new(&word);
        assert_eq!(d.bool(0), Err(AbiError::InvalidBool));
        assert_eq!(d.word(1), Err(AbiError::Truncated));
        assert_eq!(d.string(0), Err(AbiError::Truncated));
        assert!(d.region(33).is_err());
        assert!(d.region(32).unwrap().is_empty());
    }
}
