//! Hex-encoded identifiers exchanged with the node.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Length of a reward address in bytes.
pub const ADDRESS_LENGTH: usize = 20;

/// Decode operator-supplied hex.
///
/// Accepts an optional `0x`/`0X` prefix and odd-length input, which is
/// treated as if it had a leading `0`.
pub fn decode_hex(input: &str) -> Result<Vec<u8>, Error> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let decoded = if digits.len() % 2 == 1 {
        hex::decode(format!("0{digits}"))
    } else {
        hex::decode(digits)
    };
    decoded.map_err(|e| Error::InvalidInput(format!("'{}' is not valid hex: {}", trimmed, e)))
}

/// Reward (coinbase) address.
///
/// Built from bytes the way the node does it: input longer than 20 bytes
/// keeps its trailing 20 bytes, shorter input is left-padded with zeros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// Create an address from raw bytes, cropping or padding on the left.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut out = [0u8; ADDRESS_LENGTH];
        let bytes = if bytes.len() > ADDRESS_LENGTH {
            &bytes[bytes.len() - ADDRESS_LENGTH..]
        } else {
            bytes
        };
        out[ADDRESS_LENGTH - bytes.len()..].copy_from_slice(bytes);
        Self(out)
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_hex(s).map(|bytes| Self::from_slice(&bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Identity of a smesher on the network. Opaque bytes of any length.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SmesherId(Vec<u8>);

impl FromStr for SmesherId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_hex(s).map(Self)
    }
}

impl fmt::Display for SmesherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

// Both identifiers travel as 0x-prefixed hex strings.

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

impl Serialize for SmesherId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SmesherId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_length_address() {
        let addr: Address = "0x00112233445566778899aabbccddeeff00112233".parse().unwrap();
        assert_eq!(addr.0[0], 0x00);
        assert_eq!(addr.0[19], 0x33);
        assert_eq!(addr.to_string(), "0x00112233445566778899aabbccddeeff00112233");
    }

    #[test]
    fn test_short_address_is_left_padded() {
        let addr: Address = "abc".parse().unwrap();
        assert_eq!(addr.to_string(), "0x0000000000000000000000000000000000000abc");
    }

    #[test]
    fn test_long_address_keeps_trailing_bytes() {
        let addr: Address = "0xffff00112233445566778899aabbccddeeff00112233"
            .parse()
            .unwrap();
        assert_eq!(addr.to_string(), "0x00112233445566778899aabbccddeeff00112233");
    }

    #[test]
    fn test_invalid_hex_is_rejected() {
        let err = "0xnothex".parse::<Address>().unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_smesher_id_keeps_length() {
        let id: SmesherId = " 0X0a0b0c ".parse().unwrap();
        assert_eq!(id.0, vec![0x0a, 0x0b, 0x0c]);
        assert_eq!(id.to_string(), "0x0a0b0c");
    }

    #[test]
    fn test_serde_as_hex_string() {
        let addr = Address::from_slice(&[0x12, 0x34]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x0000000000000000000000000000000000001234\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);

        assert!(serde_json::from_str::<SmesherId>("\"zz\"").is_err());
    }
}
