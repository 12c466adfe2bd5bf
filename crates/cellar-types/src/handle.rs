use std::fmt;

use serde::{Deserialize, Serialize};

/// Integer handle identifying a domain object inside a cache.
///
/// Handle `0` is reserved as the null handle: it never names an object and
/// must never be used as a key.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectHandle(u32);

impl ObjectHandle {
    /// The null handle.
    pub const NULL: Self = Self(0);

    /// Create a handle from its raw value.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw integer value.
    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// Returns `true` for the reserved null handle.
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for ObjectHandle {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectHandle({})", self.0)
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of an attribute or relationship.
///
/// The meaning and value kind of a field belong to the schema provider; the
/// cache never infers them from data.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(u32);

impl FieldId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u32 {
        self.0
    }
}

impl From<u32> for FieldId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldId({})", self.0)
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field {}", self.0)
    }
}

/// Identifier of a class in the schema.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(u32);

impl ClassId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u32 {
        self.0
    }
}

impl From<u32> for ClassId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class {}", self.0)
    }
}

/// Writing system of a multilingual text alternative.
///
/// Only strictly positive values address a language; zero and negative
/// values are invalid input.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageId(i32);

impl LanguageId {
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> i32 {
        self.0
    }

    /// Returns `true` if this id may address a language.
    pub const fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl From<i32> for LanguageId {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LanguageId({})", self.0)
    }
}

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ws {}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_handle() {
        assert!(ObjectHandle::NULL.is_null());
        assert!(ObjectHandle::default().is_null());
        assert!(!ObjectHandle::new(1).is_null());
    }

    #[test]
    fn handle_ordering_follows_raw_value() {
        assert!(ObjectHandle::new(3) < ObjectHandle::new(10));
    }

    #[test]
    fn language_validity() {
        assert!(LanguageId::new(1).is_valid());
        assert!(!LanguageId::new(0).is_valid());
        assert!(!LanguageId::new(-5).is_valid());
    }

    #[test]
    fn display_formats() {
        assert_eq!(format!("{}", ObjectHandle::new(42)), "#42");
        assert_eq!(format!("{}", FieldId::new(7)), "field 7");
        assert_eq!(format!("{}", ClassId::new(2)), "class 2");
        assert_eq!(format!("{}", LanguageId::new(-1)), "ws -1");
    }

    #[test]
    fn serde_is_transparent() {
        let json = serde_json::to_string(&ObjectHandle::new(1000)).unwrap();
        assert_eq!(json, "1000");
        let parsed: FieldId = serde_json::from_str("5002").unwrap();
        assert_eq!(parsed, FieldId::new(5002));
    }
}
