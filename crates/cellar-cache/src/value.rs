use std::fmt;
use std::sync::Arc;

use cellar_types::{ObjectGuid, ObjectHandle, RichText, StoreKind, ValueKind};

/// Application-defined object stored in an opaque slot.
///
/// The cache never interprets the contents; it only needs a stable byte
/// image to compare and export the value.
pub trait OpaqueValue: fmt::Debug + Send + Sync {
    /// Name of the application type, for diagnostics.
    fn type_name(&self) -> &str;

    /// Serialized image of the value.
    fn to_bytes(&self) -> Vec<u8>;
}

/// Plain byte blob usable as an [`OpaqueValue`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpaqueBlob {
    type_name: String,
    bytes: Vec<u8>,
}

impl OpaqueBlob {
    pub fn new(type_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            type_name: type_name.into(),
            bytes,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl OpaqueValue for OpaqueBlob {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}

/// A single cached value.
///
/// The variant doubles as the store tag: which variant holds a key is the
/// kind the key was written with.
#[derive(Clone, Debug)]
pub enum PropertyValue {
    Boolean(bool),
    Integer(i32),
    /// 64-bit integer; also holds `Time` fields.
    Int64(i64),
    Guid(ObjectGuid),
    Binary(Vec<u8>),
    Unicode(String),
    String(RichText),
    Object(ObjectHandle),
    Sequence(Vec<ObjectHandle>),
    Opaque(Arc<dyn OpaqueValue>),
}

impl PropertyValue {
    /// Store this variant lives in.
    pub fn store_kind(&self) -> StoreKind {
        match self {
            Self::Boolean(_) => StoreKind::Boolean,
            Self::Integer(_) => StoreKind::Integer,
            Self::Int64(_) => StoreKind::Int64,
            Self::Guid(_) => StoreKind::Guid,
            Self::Binary(_) => StoreKind::Binary,
            Self::Unicode(_) => StoreKind::Unicode,
            Self::String(_) => StoreKind::String,
            Self::Object(_) => StoreKind::Object,
            Self::Sequence(_) => StoreKind::Sequence,
            Self::Opaque(_) => StoreKind::Opaque,
        }
    }

    /// Whether this value may be stored under a field of `kind`.
    ///
    /// Multilingual fields take [`PropertyValue::String`] per alternative.
    pub fn fits(&self, kind: ValueKind) -> bool {
        match kind.store_kind() {
            StoreKind::MultiString => matches!(self, Self::String(_)),
            store => self.store_kind() == store,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int64(&self) -> Option<i64> {
        match self {
            Self::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_guid(&self) -> Option<ObjectGuid> {
        match self {
            Self::Guid(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_unicode(&self) -> Option<&str> {
        match self {
            Self::Unicode(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&RichText> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<ObjectHandle> {
        match self {
            Self::Object(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[ObjectHandle]> {
        match self {
            Self::Sequence(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_opaque(&self) -> Option<&Arc<dyn OpaqueValue>> {
        match self {
            Self::Opaque(v) => Some(v),
            _ => None,
        }
    }
}

impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Int64(a), Self::Int64(b)) => a == b,
            (Self::Guid(a), Self::Guid(b)) => a == b,
            (Self::Binary(a), Self::Binary(b)) => a == b,
            (Self::Unicode(a), Self::Unicode(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::Sequence(a), Self::Sequence(b)) => a == b,
            (Self::Opaque(a), Self::Opaque(b)) => {
                a.type_name() == b.type_name() && a.to_bytes() == b.to_bytes()
            }
            _ => false,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Guid(v) => write!(f, "{v}"),
            Self::Binary(v) => write!(f, "<{} bytes>", v.len()),
            Self::Unicode(v) => write!(f, "{v:?}"),
            Self::String(v) => write!(f, "{:?}", v.text()),
            Self::Object(v) => write!(f, "{v}"),
            Self::Sequence(v) => {
                let items: Vec<String> = v.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Self::Opaque(v) => write!(f, "<{}>", v.type_name()),
        }
    }
}
