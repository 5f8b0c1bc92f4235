use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use sha3::{Digest, Keccak256};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,

    #[error("address must start with 0x")]
    MissingPrefix,

    #[error("address must be 40 hex digits after 0x, got {0}")]
    BadLength(usize),

    #[error("address contains a non-hex character")]
    NotHex,

    #[error("address has an invalid EIP-55 checksum")]
    BadChecksum,
}

/// A 20-byte ledger account or contract address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; 20]);

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

impl Address {
    #[cfg(test)]
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Lowercase `0x`-prefixed form, as sent over JSON-RPC.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// EIP-55 mixed-case checksum form.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = keccak256(lower.as_bytes());
        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

/// Parses a `0x`-prefixed address. Mixed-case input must carry a valid EIP-55 checksum;
/// all-lowercase and all-uppercase input is accepted as-is.
pub fn parse_address(input: &str) -> Result<Address, AddressError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AddressError::Empty);
    }
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .ok_or(AddressError::MissingPrefix)?;
    if digits.chars().count() != 40 {
        return Err(AddressError::BadLength(digits.chars().count()));
    }
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AddressError::NotHex);
    }

    let mut bytes = [0u8; 20];
    hex::decode_to_slice(digits, &mut bytes).map_err(|_| AddressError::NotHex)?;
    let address = Address(bytes);

    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && address.to_checksum()[2..] != *digits {
        return Err(AddressError::BadChecksum);
    }
    Ok(address)
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_address(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test vectors from EIP-55.
    const CHECKSUMMED: &[&str] = &[
        "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
        "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
        "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
        "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
    ];

    #[test]
    fn test_keccak256_of_empty_input() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_checksum_vectors_round_trip() {
        for input in CHECKSUMMED {
            let address = parse_address(input).unwrap();
            assert_eq!(address.to_checksum(), *input);
        }
    }

    #[test]
    fn test_lowercase_and_uppercase_are_accepted() {
        let lower = CHECKSUMMED[0].to_lowercase();
        let upper = format!("0x{}", CHECKSUMMED[0][2..].to_uppercase());
        assert_eq!(parse_address(&lower).unwrap(), parse_address(&upper).unwrap());
    }

    #[test]
    fn test_bad_checksum_is_rejected() {
        // Flip the case of one letter in a valid checksummed address.
        let tampered = "0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
        assert_eq!(parse_address(tampered), Err(AddressError::BadChecksum));
    }

    #[test]
    fn test_malformed_inputs_are_rejected() {
        assert_eq!(parse_address(""), Err(AddressError::Empty));
        assert_eq!(parse_address("   "), Err(AddressError::Empty));
        assert_eq!(
            parse_address("5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"),
            Err(AddressError::MissingPrefix)
        );
        assert_eq!(parse_address("0x1234"), Err(AddressError::BadLength(4)));
        assert_eq!(
            parse_address("0xSomeOtherAddress"),
            Err(AddressError::BadLength(16))
        );
        assert_eq!(
            parse_address("0xzz00000000000000000000000000000000000000"),
            Err(AddressError::NotHex)
        );
    }

    #[test]
    fn test_to_hex_is_lowercase() {
        let address = parse_address(CHECKSUMMED[0]).unwrap();
        assert_eq!(address.to_hex(), CHECKSUMMED[0].to_lowercase());
    }

    #[test]
    fn test_serializes_as_checksum() {
        let address = parse_address(&CHECKSUMMED[1].to_lowercase()).unwrap();
        assert_eq!(
            serde_json::to_string(&address).unwrap(),
            format!("\"{}\"", CHECKSUMMED[1])
        );
    }
}
