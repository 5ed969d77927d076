//! Mapping configuration: loading, resolution, and pre-flight validation.

pub mod resolve;
pub mod types;
pub mod validation;

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::Result;

pub use resolve::{
    resolve, IdentAttribute, OwnershipBinding, PlayerBinding, PlayerKind, ResolvedEntry,
};
pub use types::{
    AttributePlayerDef, ByAttributeDef, ByPlayersDef, ColumnMapping, Columns, ConceptKind, Config,
    Defaults, GeneratorDef, IdentDef, MappingEntry, OwnershipDef, SystemResources,
};
pub use validation::{preflight, ValidationReport};

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// SHA256 hash of the configuration, for resume safety.
    pub fn hash(&self) -> String {
        let serialized = serde_yaml::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(serialized.as_bytes());
        hex::encode(hasher.finalize())
    }
}
