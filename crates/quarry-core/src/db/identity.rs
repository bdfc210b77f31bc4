use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Width of an encoded identifier in bytes.
pub const IDENTIFIER_LEN: usize = 16;

///
/// Identifier
///
/// Opaque 128-bit entity identifier.
/// Byte order (big-endian) equals numeric order, so encoded identifiers sort
/// the same way the values do. Used both as scan owner and as tie-break key.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Identifier(Ulid);

impl Identifier {
    pub const MIN: Self = Self(Ulid(0));
    pub const MAX: Self = Self(Ulid(u128::MAX));

    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(Ulid(value))
    }

    #[must_use]
    pub const fn from_ulid(value: Ulid) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn from_bytes(bytes: [u8; IDENTIFIER_LEN]) -> Self {
        Self(Ulid(u128::from_be_bytes(bytes)))
    }

    /// Decode an identifier from exactly [`IDENTIFIER_LEN`] bytes.
    #[must_use]
    pub fn try_from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; IDENTIFIER_LEN] = bytes.try_into().ok()?;

        Some(Self::from_bytes(bytes))
    }

    /// Decode the identifier stored in the trailing bytes of a column name.
    #[must_use]
    pub fn from_column_suffix(column: &[u8]) -> Option<Self> {
        let start = column.len().checked_sub(IDENTIFIER_LEN)?;

        Self::try_from_slice(&column[start..])
    }

    #[must_use]
    pub const fn to_bytes(self) -> [u8; IDENTIFIER_LEN] {
        self.0.0.to_be_bytes()
    }

    #[must_use]
    pub const fn as_u128(self) -> u128 {
        self.0.0
    }

    #[must_use]
    pub const fn as_ulid(self) -> Ulid {
        self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Ulid> for Identifier {
    fn from(value: Ulid) -> Self {
        Self(value)
    }
}

///
/// TESTS
///
