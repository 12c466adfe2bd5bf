use std::path::Path;

use cellar_schema::SystemFields;
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, CacheResult};

/// Configuration for a [`PropertyCache`](crate::PropertyCache).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// First handle issued by `make_new_object`. Must be non-zero.
    pub first_handle: u32,
    /// Ids of the distinguished per-object fields. Must agree with the
    /// schema provider.
    pub system_fields: SystemFields,
    /// Whether the empty value returned for a missing multilingual
    /// alternative is stored, so later reads hit the cache.
    pub cache_multilingual_fallback: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            first_handle: 1,
            system_fields: SystemFields::default(),
            cache_multilingual_fallback: true,
        }
    }
}

impl CacheConfig {
    /// Parse and validate a TOML configuration.
    pub fn from_toml_str(input: &str) -> CacheResult<Self> {
        let config: Self = toml::from_str(input).map_err(|e| CacheError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML configuration file.
    pub fn load(path: &Path) -> CacheResult<Self> {
        let input = std::fs::read_to_string(path)
            .map_err(|e| CacheError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&input)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> CacheResult<()> {
        if self.first_handle == 0 {
            return Err(CacheError::Config("first_handle must be non-zero".into()));
        }
        let defs = self.system_fields.definitions();
        for (i, (a, _, _)) in defs.iter().enumerate() {
            if defs[i + 1..].iter().any(|(b, _, _)| a == b) {
                return Err(CacheError::Config(format!(
                    "system field id {} is used twice",
                    a.raw()
                )));
            }
        }
        Ok(())
    }
}
