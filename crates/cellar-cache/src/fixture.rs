//! JSON fixtures: populate a cache from a document of objects, or capture a
//! cache's contents as one.
//!
//! ```json
//! { "objects": [
//!     { "handle": 5, "class": 1, "guid": "4f6c2c51-3f0e-4d7e-9c1a-7a1de6f0b2aa",
//!       "props": { "1001": { "sequence": [6, 7] },
//!                  "1003": { "multi": { "1": "dog", "2": "chien" } } } },
//!     { "handle": 6, "class": 2 },
//!     { "handle": 7, "class": 2 } ] }
//! ```
//!
//! Fixtures load through the `cache_*` path: nothing is marked dirty, and
//! ownership facts are rebuilt from the owning properties once every value
//! is in place. Loading stops at the first rejected value; objects loaded
//! before it remain in the cache.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use cellar_types::{ClassId, FieldId, LanguageId, ObjectGuid, ObjectHandle, RichText};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cache::PropertyCache;
use crate::error::{CacheError, CacheResult};
use crate::value::{OpaqueBlob, PropertyValue};

/// A document of objects to load into a cache.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub objects: Vec<FixtureObject>,
}

/// One object: handle, class, optional identity GUID, and properties keyed
/// by raw field id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixtureObject {
    pub handle: u32,
    pub class: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<ObjectGuid>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub props: BTreeMap<u32, FixtureValue>,
}

/// A property value tagged by kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureValue {
    Boolean(bool),
    Integer(i32),
    Int64(i64),
    Time(i64),
    Guid(ObjectGuid),
    /// Hex-encoded bytes.
    Binary(String),
    Unicode(String),
    String(RichText),
    /// Plain text per language id.
    Multi(BTreeMap<i32, String>),
    Object(u32),
    Sequence(Vec<u32>),
    Opaque {
        type_name: String,
        /// Hex-encoded bytes.
        bytes: String,
    },
}

/// Counts of what a fixture put into a cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FixtureSummary {
    pub objects: usize,
    pub properties: usize,
    pub alternatives: usize,
    pub owning_fields: usize,
}

fn decode_hex(handle: u32, field: u32, encoded: &str) -> CacheResult<Vec<u8>> {
    hex::decode(encoded)
        .map_err(|e| CacheError::Fixture(format!("object {handle}, field {field}: bad hex: {e}")))
}

impl FixtureValue {
    fn into_property(self, handle: u32, field: u32) -> CacheResult<PropertyValue> {
        Ok(match self {
            Self::Boolean(v) => PropertyValue::Boolean(v),
            Self::Integer(v) => PropertyValue::Integer(v),
            Self::Int64(v) | Self::Time(v) => PropertyValue::Int64(v),
            Self::Guid(v) => PropertyValue::Guid(v),
            Self::Binary(encoded) => PropertyValue::Binary(decode_hex(handle, field, &encoded)?),
            Self::Unicode(v) => PropertyValue::Unicode(v),
            Self::String(v) => PropertyValue::String(v),
            Self::Object(target) => PropertyValue::Object(ObjectHandle::new(target)),
            Self::Sequence(items) => {
                PropertyValue::Sequence(items.into_iter().map(ObjectHandle::new).collect())
            }
            Self::Opaque { type_name, bytes } => PropertyValue::Opaque(Arc::new(OpaqueBlob::new(
                type_name,
                decode_hex(handle, field, &bytes)?,
            ))),
            Self::Multi(_) => {
                return Err(CacheError::Fixture(format!(
                    "object {handle}, field {field}: multilingual value outside the alternative path"
                )))
            }
        })
    }

    fn from_property(value: &PropertyValue) -> Self {
        match value {
            PropertyValue::Boolean(v) => Self::Boolean(*v),
            PropertyValue::Integer(v) => Self::Integer(*v),
            PropertyValue::Int64(v) => Self::Int64(*v),
            PropertyValue::Guid(v) => Self::Guid(*v),
            PropertyValue::Binary(v) => Self::Binary(hex::encode(v)),
            PropertyValue::Unicode(v) => Self::Unicode(v.clone()),
            PropertyValue::String(v) => Self::String(v.clone()),
            PropertyValue::Object(v) => Self::Object(v.raw()),
            PropertyValue::Sequence(v) => Self::Sequence(v.iter().map(|h| h.raw()).collect()),
            PropertyValue::Opaque(v) => Self::Opaque {
                type_name: v.type_name().to_string(),
                bytes: hex::encode(v.to_bytes()),
            },
        }
    }
}

impl Fixture {
    pub fn from_json_str(input: &str) -> CacheResult<Self> {
        serde_json::from_str(input).map_err(|e| CacheError::Fixture(e.to_string()))
    }

    pub fn load(path: &Path) -> CacheResult<Self> {
        let input = std::fs::read_to_string(path)
            .map_err(|e| CacheError::Fixture(format!("{}: {e}", path.display())))?;
        let fixture = Self::from_json_str(&input)?;
        info!(path = %path.display(), objects = fixture.objects.len(), "fixture read");
        Ok(fixture)
    }

    pub fn to_json_string(&self) -> CacheResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CacheError::Fixture(e.to_string()))
    }

    /// Load every object into `cache`, or nothing at all.
    ///
    /// Classes are cached first so that references between objects in the
    /// same document resolve regardless of order; properties follow, then
    /// ownership facts are rebuilt for every owning property. The document
    /// is loaded into a copy of `cache` that replaces it only once every
    /// value has been accepted.
    pub fn apply(&self, cache: &mut PropertyCache) -> CacheResult<FixtureSummary> {
        let mut staged = cache.clone();
        let summary = self.load_into(&mut staged)?;
        *cache = staged;
        info!(
            objects = summary.objects,
            properties = summary.properties,
            alternatives = summary.alternatives,
            "fixture loaded"
        );
        Ok(summary)
    }

    fn load_into(&self, cache: &mut PropertyCache) -> CacheResult<FixtureSummary> {
        let mut summary = FixtureSummary::default();
        let system = *cache.system_fields();

        for object in &self.objects {
            let class = i32::try_from(object.class).map_err(|_| {
                CacheError::Fixture(format!("object {}: class {} out of range", object.handle, object.class))
            })?;
            cache.cache_int_prop(ObjectHandle::new(object.handle), system.class, class)?;
            summary.objects += 1;
        }

        let mut owning = Vec::new();
        for object in &self.objects {
            let handle = ObjectHandle::new(object.handle);
            if let Some(guid) = object.guid {
                cache.cache_guid_prop(handle, system.guid, guid)?;
            }
            for (&raw_field, value) in &object.props {
                let field = FieldId::new(raw_field);
                if field == system.class || field == system.guid {
                    warn!(%handle, %field, "identity field in props ignored; use class/guid");
                    continue;
                }
                match value {
                    FixtureValue::Multi(alternatives) => {
                        for (&language, text) in alternatives {
                            let language = LanguageId::new(language);
                            cache.cache_multi_string_alt(
                                handle,
                                field,
                                language,
                                RichText::plain(text.as_str(), language),
                            )?;
                            summary.alternatives += 1;
                        }
                    }
                    value => {
                        let property = value.clone().into_property(object.handle, raw_field)?;
                        let is_link = matches!(property, PropertyValue::Object(_) | PropertyValue::Sequence(_));
                        cache.cache_value(handle, field, property)?;
                        summary.properties += 1;
                        if is_link && is_owning(cache, field) {
                            owning.push((handle, field));
                        }
                    }
                }
            }
        }

        for (owner, field) in owning {
            cache.reindex_owned(owner, field)?;
            summary.owning_fields += 1;
        }
        Ok(summary)
    }

    /// Snapshot every object in `cache`.
    ///
    /// Ownership facts are left out: loading the snapshot rebuilds them.
    pub fn capture(cache: &PropertyCache) -> Self {
        let system = *cache.system_fields();
        let mut objects = Vec::new();
        for handle in cache.handles() {
            let Some(class) = cache.class_of(handle).ok().map(|c: ClassId| c.raw()) else {
                continue;
            };
            let guid = cache
                .peek(handle, system.guid)
                .and_then(PropertyValue::as_guid);
            let mut props = BTreeMap::new();
            for (field, value) in cache.properties_of(handle) {
                if system.contains(field) {
                    continue;
                }
                props.insert(field.raw(), FixtureValue::from_property(value));
            }
            for (field, language, text) in cache.alternatives_of(handle) {
                let entry = props
                    .entry(field.raw())
                    .or_insert_with(|| FixtureValue::Multi(BTreeMap::new()));
                if let FixtureValue::Multi(alternatives) = entry {
                    alternatives.insert(language.raw(), text.text().to_string());
                }
            }
            objects.push(FixtureObject {
                handle: handle.raw(),
                class,
                guid,
                props,
            });
        }
        Self { objects }
    }
}

fn is_owning(cache: &PropertyCache, field: FieldId) -> bool {
    cache
        .schema()
        .and_then(|schema| schema.field_type(field))
        .is_some_and(|kind| kind.is_owning())
}
