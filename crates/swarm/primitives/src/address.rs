//! Fixed-size overlay address.

use std::{fmt, str::FromStr};

use alloy_primitives::{B256, FixedBytes};

/// Size of an overlay address in bytes (N). Fixed for the whole deployment.
pub const ADDRESS_SIZE: usize = 32;

/// Errors produced when constructing a [`SwarmAddress`] from untrusted input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AddressError {
    /// Input was not exactly [`ADDRESS_SIZE`] bytes.
    #[error("invalid address length: expected {ADDRESS_SIZE} bytes, got {0}")]
    InvalidLength(usize),

    /// Textual form was not valid hex.
    #[error("invalid address hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// An address in the Swarm overlay.
///
/// Immutable, exactly [`ADDRESS_SIZE`] bytes. Ordering is bit-lexicographic
/// (most significant bit first), but routing never uses that order: it uses
/// [`proximity`](crate::proximity).
///
/// The textual form is the plain lowercase hex encoding of the bytes, without
/// a `0x` prefix or any other framing.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SwarmAddress(B256);

impl SwarmAddress {
    /// The all-zero address.
    pub const ZERO: Self = Self(B256::ZERO);

    /// Wrap raw bytes.
    pub const fn new(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(FixedBytes(bytes))
    }

    /// Build an address from a slice, failing unless it is exactly
    /// [`ADDRESS_SIZE`] bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AddressError> {
        let bytes: [u8; ADDRESS_SIZE] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidLength(bytes.len()))?;
        Ok(Self::new(bytes))
    }

    /// Borrow the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0.0
    }

    /// Render as a string of `0`/`1` characters, most significant bit first.
    pub fn bin(&self) -> String {
        self.0.iter().map(|b| format!("{b:08b}")).collect()
    }

    /// A uniformly random address.
    #[cfg(feature = "rand")]
    pub fn random() -> Self {
        Self::new(rand::random())
    }
}

impl From<[u8; ADDRESS_SIZE]> for SwarmAddress {
    fn from(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self::new(bytes)
    }
}

impl From<B256> for SwarmAddress {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl From<SwarmAddress> for B256 {
    fn from(value: SwarmAddress) -> Self {
        value.0
    }
}

impl TryFrom<&[u8]> for SwarmAddress {
    type Error = AddressError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::from_slice(bytes)
    }
}

impl AsRef<[u8]> for SwarmAddress {
    fn as_ref(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl fmt::Display for SwarmAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for SwarmAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for SwarmAddress {
    type Err = AddressError;

    /// Parse the plain hex form. A leading `0x` is tolerated on input.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for SwarmAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for SwarmAddress {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
