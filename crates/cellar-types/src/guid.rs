use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Globally unique identity of an object (random UUID v4).
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectGuid(uuid::Uuid);

impl ObjectGuid {
    /// Generate a fresh random GUID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// The all-zero GUID.
    pub const fn nil() -> Self {
        Self(uuid::Uuid::nil())
    }

    /// Create from an existing UUID.
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(uuid::Uuid::from_bytes(bytes))
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// Returns `true` for the all-zero GUID.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Parse from the hyphenated or simple textual form.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        uuid::Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| TypeError::InvalidGuid(e.to_string()))
    }
}

impl fmt::Debug for ObjectGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectGuid({})", self.0)
    }
}

impl fmt::Display for ObjectGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ObjectGuid {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
