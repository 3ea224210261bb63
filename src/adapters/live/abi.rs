//! Minimal contract ABI codec for the task store.
//!
//! Covers exactly what the store's interface needs: `uint256`, `bool` and
//! dynamic `string` arguments, and the `(uint256,string,string,bool)[]`
//! returned by the task read.

use thiserror::Error;

use crate::model::{TaskId, TaskRecord};

/// A 4-byte function selector.
pub type Selector = [u8; 4];

/// `getMyTask()`
pub const GET_MY_TASK: Selector = [0xe0, 0x8e, 0x86, 0xb8];
/// `addTask(string,string,bool)`
pub const ADD_TASK: Selector = [0x1d, 0xb0, 0x0d, 0x0b];
/// `deleteTask(uint256)`
pub const DELETE_TASK: Selector = [0x56, 0x0f, 0x31, 0x92];

const WORD: usize = 32;

/// An ABI-encodable call argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `uint256` (values beyond `u64` are never needed here).
    Uint(u64),
    /// `bool`
    Bool(bool),
    /// Dynamic `string`.
    Str(String),
}

/// Failures decoding call data or return data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AbiError {
    /// The payload is not valid hex.
    #[error("invalid hex payload: {0}")]
    Hex(String),
    /// A selector was not exactly four bytes.
    #[error("selector must be 4 bytes, got {0}")]
    SelectorLength(usize),
    /// A read ran past the end of the payload.
    #[error("payload truncated at byte {0}")]
    Truncated(usize),
    /// A word did not fit the expected integer width.
    #[error("value at byte {0} does not fit in 64 bits")]
    Overflow(usize),
    /// A string was not UTF-8.
    #[error("string at byte {0} is not valid UTF-8")]
    Utf8(usize),
}

/// Encodes a call as `0x`-prefixed hex call data.
#[must_use]
pub fn encode_call(selector: Selector, args: &[Token]) -> String {
    let head_len = args.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for arg in args {
        match arg {
            Token::Uint(value) => head.extend_from_slice(&uint_word(*value)),
            Token::Bool(flag) => head.extend_from_slice(&uint_word(u64::from(*flag))),
            Token::Str(text) => {
                head.extend_from_slice(&uint_word((head_len + tail.len()) as u64));
                tail.extend(string_tail(text));
            }
        }
    }

    let mut data = selector.to_vec();
    data.extend(head);
    data.extend(tail);
    format!("0x{}", hex::encode(data))
}

/// Parses a `0x`-prefixed (or bare) 4-byte selector.
///
/// # Errors
///
/// Returns an error if the input is not hex or not four bytes long.
pub fn parse_selector(raw: &str) -> Result<Selector, AbiError> {
    let bytes = decode_hex(raw)?;
    Selector::try_from(bytes.as_slice()).map_err(|_| AbiError::SelectorLength(bytes.len()))
}

/// Decodes the `(uint256 id, string text, string title, bool deleted)[]` return value.
///
/// An empty payload (`0x`) decodes to no records.
///
/// # Errors
///
/// Returns an error if the payload is truncated or malformed.
pub fn decode_task_records(payload: &str) -> Result<Vec<TaskRecord>, AbiError> {
    let data = decode_hex(payload)?;
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let array_at = read_usize(&data, 0)?;
    let len = read_usize(&data, array_at)?;
    let elements_at = advance(array_at, WORD)?;

    (0..len)
        .map(|index| {
            let slot = index.checked_mul(WORD).ok_or(AbiError::Overflow(elements_at))?;
            let offset = read_usize(&data, advance(elements_at, slot)?)?;
            decode_task_tuple(&data, advance(elements_at, offset)?)
        })
        .collect()
}

fn decode_task_tuple(data: &[u8], at: usize) -> Result<TaskRecord, AbiError> {
    let id = read_u64(data, at)?;
    let body = read_string(data, advance(at, read_usize(data, advance(at, WORD)?)?)?)?;
    let title = read_string(data, advance(at, read_usize(data, advance(at, 2 * WORD)?)?)?)?;
    let deleted = read_u64(data, advance(at, 3 * WORD)?)? != 0;
    Ok(TaskRecord { id: TaskId(id), title, body, deleted })
}

/// `at + by` for offsets taken from the payload itself.
fn advance(at: usize, by: usize) -> Result<usize, AbiError> {
    at.checked_add(by).ok_or(AbiError::Overflow(at))
}

fn decode_hex(raw: &str) -> Result<Vec<u8>, AbiError> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(digits).map_err(|e| AbiError::Hex(e.to_string()))
}

fn uint_word(value: u64) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

fn string_tail(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut out = uint_word(bytes.len() as u64).to_vec();
    out.extend_from_slice(bytes);
    let padding = (WORD - bytes.len() % WORD) % WORD;
    out.resize(out.len() + padding, 0);
    out
}

fn read_word(data: &[u8], at: usize) -> Result<&[u8], AbiError> {
    let end = at.checked_add(WORD).ok_or(AbiError::Truncated(at))?;
    data.get(at..end).ok_or(AbiError::Truncated(at))
}

fn read_u64(data: &[u8], at: usize) -> Result<u64, AbiError> {
    let word = read_word(data, at)?;
    if word[..WORD - 8].iter().any(|byte| *byte != 0) {
        return Err(AbiError::Overflow(at));
    }
    let mut low = [0u8; 8];
    low.copy_from_slice(&word[WORD - 8..]);
    Ok(u64::from_be_bytes(low))
}

fn read_usize(data: &[u8], at: usize) -> Result<usize, AbiError> {
    usize::try_from(read_u64(data, at)?).map_err(|_| AbiError::Overflow(at))
}

fn read_string(data: &[u8], at: usize) -> Result<String, AbiError> {
    let len = read_usize(data, at)?;
    let start = advance(at, WORD)?;
    let end = start.checked_add(len).ok_or(AbiError::Truncated(at))?;
    let bytes = data.get(start..end).ok_or(AbiError::Truncated(start))?;
    String::from_utf8(bytes.to_vec()).map_err(|_| AbiError::Utf8(at))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Encodes a task array the way the contract returns it.
    fn encode_records(records: &[(u64, &str, &str, bool)]) -> String {
        let tuples: Vec<Vec<u8>> = records
            .iter()
            .map(|(id, text, title, deleted)| {
                let text_tail = string_tail(text);
                let mut tuple = Vec::new();
                tuple.extend_from_slice(&uint_word(*id));
                tuple.extend_from_slice(&uint_word(4 * WORD as u64));
                tuple.extend_from_slice(&uint_word((4 * WORD + text_tail.len()) as u64));
                tuple.extend_from_slice(&uint_word(u64::from(*deleted)));
                tuple.extend(text_tail);
                tuple.extend(string_tail(title));
                tuple
            })
            .collect();

        let mut data = uint_word(WORD as u64).to_vec();
        data.extend_from_slice(&uint_word(records.len() as u64));
        let mut offset = tuples.len() * WORD;
        for tuple in &tuples {
            data.extend_from_slice(&uint_word(offset as u64));
            offset += tuple.len();
        }
        for tuple in tuples {
            data.extend(tuple);
        }
        format!("0x{}", hex::encode(data))
    }

    #[test]
    fn encodes_delete_call() {
        let data = encode_call(DELETE_TASK, &[Token::Uint(7)]);
        assert_eq!(
            data,
            "0x560f31920000000000000000000000000000000000000000000000000000000000000007"
        );
    }

    #[test]
    fn encodes_dynamic_strings_after_head() {
        let data = encode_call(
            ADD_TASK,
            &[Token::Str("2%".into()), Token::Str("Buy milk".into()), Token::Bool(false)],
        );
        let bytes = hex::decode(data.trim_start_matches("0x")).unwrap();
        let args = &bytes[4..];

        // Three head words, then two one-word strings each preceded by a length word.
        assert_eq!(args.len(), 3 * WORD + 2 * (2 * WORD));
        assert_eq!(read_u64(args, 0).unwrap(), 0x60);
        assert_eq!(read_u64(args, WORD).unwrap(), 0xa0);
        assert_eq!(read_u64(args, 2 * WORD).unwrap(), 0);
        assert_eq!(read_string(args, 0x60).unwrap(), "2%");
        assert_eq!(read_string(args, 0xa0).unwrap(), "Buy milk");
    }

    #[test]
    fn decodes_task_array() {
        let payload = encode_records(&[
            (1, "2%", "Buy milk", false),
            (2, "a body that is definitely longer than thirty-two bytes", "Long", true),
        ]);
        let records = decode_task_records(&payload).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, TaskId(1));
        assert_eq!(records[0].title, "Buy milk");
        assert_eq!(records[0].body, "2%");
        assert!(!records[0].deleted);
        assert_eq!(records[1].title, "Long");
        assert!(records[1].deleted);
    }

    #[test]
    fn empty_payload_is_no_records() {
        assert!(decode_task_records("0x").unwrap().is_empty());
        assert!(decode_task_records(&encode_records(&[])).unwrap().is_empty());
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let payload = encode_records(&[(1, "body", "title", false)]);
        let cut = &payload[..payload.len() - 64];
        assert!(matches!(decode_task_records(cut), Err(AbiError::Truncated(_))));
    }

    #[test]
    fn offsets_past_the_address_space_are_errors() {
        let mut data = uint_word(WORD as u64).to_vec();
        data.extend_from_slice(&uint_word(1));
        data.extend_from_slice(&uint_word(u64::MAX));
        let payload = format!("0x{}", hex::encode(&data));
        assert!(matches!(decode_task_records(&payload), Err(AbiError::Overflow(_))));

        // Element offset is fine, the string offset inside the tuple is not.
        let mut data = uint_word(WORD as u64).to_vec();
        data.extend_from_slice(&uint_word(1));
        data.extend_from_slice(&uint_word(WORD as u64));
        data.extend_from_slice(&uint_word(7));
        data.extend_from_slice(&uint_word(u64::MAX));
        data.extend_from_slice(&uint_word(u64::MAX));
        data.extend_from_slice(&uint_word(0));
        let payload = format!("0x{}", hex::encode(&data));
        assert!(matches!(decode_task_records(&payload), Err(AbiError::Overflow(_))));
    }

    #[test]
    fn parses_selectors() {
        assert_eq!(parse_selector("0x560f3192").unwrap(), DELETE_TASK);
        assert_eq!(parse_selector("e08e86b8").unwrap(), GET_MY_TASK);
        assert_eq!(parse_selector("0x1234"), Err(AbiError::SelectorLength(2)));
        assert!(matches!(parse_selector("0xzz"), Err(AbiError::Hex(_))));
    }
}
