use guestbook_types::Entry;

use crate::codec::{AbiError, Decoder, WORD, address_word, bool_word, encode_bytes_tail, uint_word};

/// Head words of one `(address,string,string,uint256,bool)` tuple.
const TUPLE_HEAD: usize = 5 * WORD;

fn encode_entry(entry: &Entry) -> Vec<u8> {
    let name = encode_bytes_tail(entry.display_name.as_bytes());
    let msg = encode_bytes_tail(entry.message.as_bytes());

    let mut out = Vec::with_capacity(TUPLE_HEAD + name.len() + msg.len());
    out.extend_from_slice(&address_word(&entry.author));
    out.extend_from_slice(&uint_word(TUPLE_HEAD as u128));
    out.extend_from_slice(&uint_word((TUPLE_HEAD + name.len()) as u128));
    out.extend_from_slice(&uint_word(entry.timestamp as u128));
    out.extend_from_slice(&bool_word(entry.has_tipped));
    out.extend_from_slice(&name);
    out.extend_from_slice(&msg);
    out
}

fn decode_entry(tuple: Decoder<'_>) -> Result<Entry, AbiError> {
    Ok(Entry {
        author: tuple.address(0)?,
        display_name: tuple.string_at_head(WORD)?,
        message: tuple.string_at_head(2 * WORD)?,
        timestamp: tuple.u64_at(3 * WORD)?,
        has_tipped: tuple.bool(4 * WORD)?,
    })
}

/// Return data of `getEntries()`: a single dynamic array of dynamic tuples.
pub fn encode_entries(entries: &[Entry]) -> Vec<u8> {
    let tuples: Vec<Vec<u8>> = entries.iter().map(encode_entry).collect();
    let body: usize = tuples.iter().map(Vec::len).sum();

    let mut out = Vec::with_capacity(2 * WORD + tuples.len() * WORD + body);
    out.extend_from_slice(&uint_word(WORD as u128));
    out.extend_from_slice(&uint_word(tuples.len() as u128));

    // Element offsets are relative to the first head, just past the length word.
    let mut offset = tuples.len() * WORD;
    for tuple in &tuples {
        out.extend_from_slice(&uint_word(offset as u128));
        offset += tuple.len();
    }
    for tuple in tuples {
        out.extend_from_slice(&tuple);
    }
    out
}

pub fn decode_entries(data: &[u8]) -> Result<Vec<Entry>, AbiError> {
    let root = Decoder::new(data);
    let array = root.region(root.usize_at(0)?)?;
    let count = array.usize_at(0)?;
    let heads = array.region(WORD)?;

    // Each element needs at least a head word; reject counts the data cannot hold.
    if count.checked_mul(WORD).is_none_or(|needed| needed > heads.len()) {
        return Err(AbiError::Truncated);
    }

    (0..count)
        .map(|i| {
            let tuple = heads.region(heads.usize_at(i * WORD)?)?;
            decode_entry(tuple)
        })
        .collect()
}
