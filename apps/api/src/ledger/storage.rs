//! On-chain encoding of contract text.
//!
//! Text is stored as a data contract: the runtime code is a STOP opcode followed by
//! the UTF-8 bytes, so the contract can never be executed and its code *is* the record.
//! Creation code is a fixed 10-byte loader that copies the runtime out of the init
//! code and returns it:
//!
//! ```text
//! 61 LLLL   PUSH2 runtime_len
//! 80        DUP1
//! 60 0a     PUSH1 0x0a          (loader length)
//! 3d        RETURNDATASIZE      (0)
//! 39        CODECOPY            mem[0..len] = code[0x0a..]
//! 3d        RETURNDATASIZE      (0)
//! f3        RETURN              mem[0..len]
//! ```
//!
//! Records written by a Solidity storage contract exposing `contractContent()` are
//! read through an `eth_call` instead.

use thiserror::Error;

use crate::ledger::address::keccak256;

/// EIP-170 runtime code limit.
pub const MAX_CODE_SIZE: usize = 24_576;
/// Largest text that fits next to the leading STOP byte.
pub const MAX_CONTENT_BYTES: usize = MAX_CODE_SIZE - 1;

const LOADER_LEN: u8 = 0x0a;
const STOP: u8 = 0x00;

pub const CONTENT_GETTER: &str = "contractContent()";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("contract text is empty")]
    Empty,

    #[error("contract text is {0} bytes; the ledger stores at most {MAX_CONTENT_BYTES}")]
    TooLarge(usize),

    #[error("contract text contains NUL characters")]
    ContainsNul,

    #[error("stored content is not valid UTF-8")]
    NotUtf8,

    #[error("malformed ABI string: {0}")]
    BadAbi(&'static str),
}

/// What the code at an address holds.
#[derive(Debug, PartialEq, Eq)]
pub enum StoredCode {
    /// No code (or only zero bytes): nothing was deployed there.
    Missing,
    /// A data contract written by this service.
    Data(String),
    /// Some other contract; the text has to be read through its getter.
    Program,
}

/// Builds the creation code for a data contract holding `content`.
pub fn creation_code(content: &str) -> Result<Vec<u8>, StorageError> {
    if content.trim().is_empty() {
        return Err(StorageError::Empty);
    }
    if content.contains('\0') {
        return Err(StorageError::ContainsNul);
    }
    let bytes = content.as_bytes();
    if bytes.len() > MAX_CONTENT_BYTES {
        return Err(StorageError::TooLarge(bytes.len()));
    }

    let runtime_len = (bytes.len() + 1) as u16;
    let [hi, lo] = runtime_len.to_be_bytes();
    let mut code = Vec::with_capacity(LOADER_LEN as usize + bytes.len() + 1);
    code.extend_from_slice(&[0x61, hi, lo, 0x80, 0x60, LOADER_LEN, 0x3d, 0x39, 0x3d, 0xf3]);
    code.push(STOP);
    code.extend_from_slice(bytes);
    Ok(code)
}

/// Classifies the runtime code returned by `eth_getCode`.
pub fn decode_runtime(code: &[u8]) -> Result<StoredCode, StorageError> {
    if code.iter().all(|b| *b == 0) {
        return Ok(StoredCode::Missing);
    }
    match code.split_first() {
        Some((&STOP, rest)) => String::from_utf8(rest.to_vec())
            .map(StoredCode::Data)
            .map_err(|_| StorageError::NotUtf8),
        _ => Ok(StoredCode::Program),
    }
}

/// First four bytes of the keccak256 hash of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Call data for the `contractContent()` getter.
pub fn content_getter_call() -> Vec<u8> {
    selector(CONTENT_GETTER).to_vec()
}

/// Decodes ABI-encoded return data holding a single `string`.
pub fn decode_abi_string(data: &[u8]) -> Result<String, StorageError> {
    let offset = read_word(data, 0)?;
    let len = read_word(data, offset)?;
    let start = offset
        .checked_add(32)
        .ok_or(StorageError::BadAbi("offset overflow"))?;
    let end = start
        .checked_add(len)
        .ok_or(StorageError::BadAbi("length overflow"))?;
    let bytes = data
        .get(start..end)
        .ok_or(StorageError::BadAbi("string runs past the end of the data"))?;
    String::from_utf8(bytes.to_vec()).map_err(|_| StorageError::NotUtf8)
}

/// Reads a 32-byte big-endian word that must fit in a usize.
fn read_word(data: &[u8], at: usize) -> Result<usize, StorageError> {
    let word = at
        .checked_add(32)
        .and_then(|end| data.get(at..end))
        .ok_or(StorageError::BadAbi("truncated word"))?;
    let (high, low) = word.split_at(24);
    if high.iter().any(|b| *b != 0) {
        return Err(StorageError::BadAbi("word does not fit in usize"));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(low);
    usize::try_from(u64::from_be_bytes(buf)).map_err(|_| StorageError::BadAbi("word does not fit in usize"))
}

#[cfg(test)]
pub(crate) fn encode_abi_string(s: &str) -> Vec<u8> {
    let bytes = s.as_bytes();
    let mut out = vec![0u8; 64];
    out[31] = 0x20;
    out[56..64].copy_from_slice(&(bytes.len() as u64).to_be_bytes());
    out.extend_from_slice(bytes);
    let padding = (32 - bytes.len() % 32) % 32;
    out.extend(std::iter::repeat(0u8).take(padding));
    out
}
