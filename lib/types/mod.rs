//! Common types.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use thiserror::Error as ThisError;

pub const ADDRESS_BYTES: usize = 20;

#[derive(Debug, ThisError)]
pub enum AddressParseError {
    #[error("failed to decode address hex")]
    Hex(#[from] hex::FromHexError),
    #[error("wrong address length: expected {ADDRESS_BYTES} bytes, got {0}")]
    WrongLength(usize),
}

/// Account identifier, rendered as hex.
#[serde_as]
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub struct Address(
    #[serde_as(as = "serde_with::hex::Hex")] pub [u8; ADDRESS_BYTES],
);

impl Address {
    pub fn as_bytes(&self) -> &[u8; ADDRESS_BYTES] {
        &self.0
    }
}

impl From<[u8; ADDRESS_BYTES]> for Address {
    fn from(bytes: [u8; ADDRESS_BYTES]) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        if bytes.len() != ADDRESS_BYTES {
            return Err(AddressParseError::WrongLength(bytes.len()));
        }
        let mut array = [0u8; ADDRESS_BYTES];
        array.copy_from_slice(&bytes);
        Ok(Self(array))
    }
}
