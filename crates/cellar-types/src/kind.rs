use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Declared type of a field, as reported by the schema provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Boolean,
    Integer,
    /// Date of uncertain precision, packed into a 32-bit integer.
    GenDate,
    Int64,
    Time,
    Guid,
    Binary,
    Image,
    Unicode,
    /// Rich text in a single language.
    String,
    MultiString,
    MultiUnicode,
    OwningAtomic,
    ReferenceAtomic,
    OwningCollection,
    ReferenceCollection,
    OwningSequence,
    ReferenceSequence,
    /// Application-defined object kept as an uninterpreted blob.
    Opaque,
}

/// The typed store that holds values of a [`ValueKind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Boolean,
    Integer,
    Int64,
    Guid,
    Binary,
    Unicode,
    String,
    MultiString,
    Object,
    Sequence,
    Opaque,
}

impl ValueKind {
    /// All kinds, in code order.
    pub const ALL: [ValueKind; 19] = [
        Self::Boolean,
        Self::Integer,
        Self::GenDate,
        Self::Int64,
        Self::Time,
        Self::Guid,
        Self::Binary,
        Self::Image,
        Self::Unicode,
        Self::String,
        Self::MultiString,
        Self::MultiUnicode,
        Self::OwningAtomic,
        Self::ReferenceAtomic,
        Self::OwningCollection,
        Self::ReferenceCollection,
        Self::OwningSequence,
        Self::ReferenceSequence,
        Self::Opaque,
    ];

    /// Store that holds values of this kind.
    pub fn store_kind(&self) -> StoreKind {
        match self {
            Self::Boolean => StoreKind::Boolean,
            Self::Integer | Self::GenDate => StoreKind::Integer,
            Self::Int64 | Self::Time => StoreKind::Int64,
            Self::Guid => StoreKind::Guid,
            Self::Binary | Self::Image => StoreKind::Binary,
            Self::Unicode => StoreKind::Unicode,
            Self::String => StoreKind::String,
            Self::MultiString | Self::MultiUnicode => StoreKind::MultiString,
            Self::OwningAtomic | Self::ReferenceAtomic => StoreKind::Object,
            Self::OwningCollection
            | Self::ReferenceCollection
            | Self::OwningSequence
            | Self::ReferenceSequence => StoreKind::Sequence,
            Self::Opaque => StoreKind::Opaque,
        }
    }

    /// Returns `true` if the field owns its targets.
    pub fn is_owning(&self) -> bool {
        matches!(
            self,
            Self::OwningAtomic | Self::OwningCollection | Self::OwningSequence
        )
    }

    /// Returns `true` for collection and sequence kinds.
    pub fn is_vector(&self) -> bool {
        self.store_kind() == StoreKind::Sequence
    }

    /// Returns `true` for per-language text kinds.
    pub fn is_multilingual(&self) -> bool {
        self.store_kind() == StoreKind::MultiString
    }

    /// Numeric code used in schema dumps.
    pub fn code(&self) -> u32 {
        match self {
            Self::Boolean => 1,
            Self::Integer => 2,
            Self::Time => 5,
            Self::Guid => 6,
            Self::Image => 7,
            Self::GenDate => 8,
            Self::Binary => 9,
            Self::String => 13,
            Self::MultiString => 14,
            Self::Unicode => 15,
            Self::MultiUnicode => 16,
            Self::Int64 => 17,
            Self::Opaque => 18,
            Self::OwningAtomic => 23,
            Self::ReferenceAtomic => 24,
            Self::OwningCollection => 25,
            Self::ReferenceCollection => 26,
            Self::OwningSequence => 27,
            Self::ReferenceSequence => 28,
        }
    }

    /// Parse from a numeric code.
    pub fn from_code(code: u32) -> Result<Self, TypeError> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.code() == code)
            .ok_or(TypeError::UnknownKindCode(code))
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::GenDate => "gen_date",
            Self::Int64 => "int64",
            Self::Time => "time",
            Self::Guid => "guid",
            Self::Binary => "binary",
            Self::Image => "image",
            Self::Unicode => "unicode",
            Self::String => "string",
            Self::MultiString => "multi_string",
            Self::MultiUnicode => "multi_unicode",
            Self::OwningAtomic => "owning_atomic",
            Self::ReferenceAtomic => "reference_atomic",
            Self::OwningCollection => "owning_collection",
            Self::ReferenceCollection => "reference_collection",
            Self::OwningSequence => "owning_sequence",
            Self::ReferenceSequence => "reference_sequence",
            Self::Opaque => "opaque",
        };
        f.write_str(name)
    }
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Int64 => "int64",
            Self::Guid => "guid",
            Self::Binary => "binary",
            Self::Unicode => "unicode",
            Self::String => "string",
            Self::MultiString => "multi-string",
            Self::Object => "object",
            Self::Sequence => "sequence",
            Self::Opaque => "opaque",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_roundtrip_for_every_kind() {
        for kind in ValueKind::ALL {
            assert_eq!(ValueKind::from_code(kind.code()), Ok(kind));
        }
    }

    #[test]
    fn codes_are_distinct() {
        let mut codes: Vec<u32> = ValueKind::ALL.iter().map(ValueKind::code).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), ValueKind::ALL.len());
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert_eq!(ValueKind::from_code(99), Err(TypeError::UnknownKindCode(99)));
    }

    #[test]
    fn store_mapping() {
        assert_eq!(ValueKind::GenDate.store_kind(), StoreKind::Integer);
        assert_eq!(ValueKind::Time.store_kind(), StoreKind::Int64);
        assert_eq!(ValueKind::Image.store_kind(), StoreKind::Binary);
        assert_eq!(ValueKind::MultiUnicode.store_kind(), StoreKind::MultiString);
        assert_eq!(ValueKind::ReferenceAtomic.store_kind(), StoreKind::Object);
        assert_eq!(ValueKind::OwningCollection.store_kind(), StoreKind::Sequence);
    }

    #[test]
    fn ownership_flags() {
        assert!(ValueKind::OwningSequence.is_owning());
        assert!(ValueKind::OwningAtomic.is_owning());
        assert!(!ValueKind::ReferenceSequence.is_owning());
        assert!(ValueKind::ReferenceSequence.is_vector());
        assert!(!ValueKind::OwningAtomic.is_vector());
        assert!(ValueKind::MultiString.is_multilingual());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&ValueKind::OwningSequence).unwrap();
        assert_eq!(json, "\"owning_sequence\"");
        let parsed: ValueKind = serde_json::from_str("\"multi_unicode\"").unwrap();
        assert_eq!(parsed, ValueKind::MultiUnicode);
    }

    #[test]
    fn display_matches_serde_name() {
        for kind in ValueKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json.trim_matches('"'), kind.to_string());
        }
    }
}
