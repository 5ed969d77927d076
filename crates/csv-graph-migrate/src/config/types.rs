//! Configuration type definitions.
//!
//! The mapping configuration mirrors what a run needs: a registry of named
//! concept generators and an ordered list of dataset entries binding data
//! files to those generators. Worker counts left unset are auto-tuned from
//! detected CPU cores.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sysinfo::System;
use tracing::info;

use crate::codec::{PreprocessorSpec, ValueType};

/// System resource information for auto-tuning.
#[derive(Debug, Clone)]
pub struct SystemResources {
    /// Number of CPU cores.
    pub cpu_cores: usize,
}

impl SystemResources {
    /// Detect system resources.
    pub fn detect() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();
        Self {
            cpu_cores: sys.cpus().len(),
        }
    }

    /// Worker threads for a dataset that did not configure any: cores - 2,
    /// clamped to [1, 16].
    pub fn default_threads(&self) -> usize {
        self.cpu_cores.saturating_sub(2).clamp(1, 16)
    }

    /// Log detected system resources.
    pub fn log(&self) {
        info!("System resources: {} CPU cores", self.cpu_cores);
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Run-wide defaults for per-dataset settings.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named concept generators, resolved against the live schema.
    pub generators: BTreeMap<String, GeneratorDef>,

    /// Dataset entries, in configuration order.
    pub datasets: Vec<MappingEntry>,
}

/// Run-wide defaults applied where a dataset entry leaves a value unset.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Defaults {
    /// Rows per worker commit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,

    /// Worker threads per dataset. Auto-tuned from CPU cores if not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
}

/// One data source and how its rows map to the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingEntry {
    /// Dataset identity, unique within the configuration.
    pub key: String,

    /// Data file path(s). `.gz` files are decompressed on the fly.
    pub data_paths: Vec<PathBuf>,

    /// Field separator (default: comma).
    #[serde(default = "default_separator")]
    pub separator: char,

    /// Rows per worker commit. Falls back to `defaults.batch_size`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,

    /// Worker threads. Falls back to `defaults.threads`, then auto-tuning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,

    /// What kind of concept each row produces.
    pub kind: ConceptKind,

    /// Schema label of the generated concept.
    pub concept_type: String,

    /// Ordered column mappings.
    pub columns: Vec<ColumnMapping>,

    /// Process this entry before the class-ordered bulk, ascending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_before: Option<u32>,

    /// Process this entry after the class-ordered bulk, ascending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_after: Option<u32>,

    /// Skip this entry entirely.
    #[serde(default)]
    pub ignore: bool,
}

/// Concept kinds a dataset entry can generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConceptKind {
    /// Independent attribute instances.
    Attribute,
    /// Entities with owned attributes.
    Entity,
    /// Relations over matched players.
    Relation,
    /// Append attributes to an existing thing.
    AttributeAppend,
    /// Append attributes, inserting the thing when the match finds nothing.
    AppendOrInsert,
}

/// Binds one or more source columns to a named generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Name of the generator in the registry.
    pub generator: String,

    /// Source column name or names. Multi-column mappings pair positionally
    /// with a player's identifying attributes.
    pub column: Columns,

    /// Splits one cell into several constraints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_separator: Option<String>,

    /// Applied to the cleaned cell before type coercion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preprocessor: Option<PreprocessorSpec>,

    /// For append-style entries: this mapping locates the existing thing
    /// rather than contributing a value to write.
    #[serde(default)]
    pub is_match: bool,
}

/// A single column name or a list of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Columns {
    One(String),
    Many(Vec<String>),
}

impl Columns {
    pub fn names(&self) -> Vec<String> {
        match self {
            Columns::One(name) => vec![name.clone()],
            Columns::Many(names) => names.clone(),
        }
    }
}

/// A named generator: how one configured piece of a statement is produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum GeneratorDef {
    /// An attribute ownership (or an independent attribute).
    Ownership(OwnershipDef),

    /// A relation player that *is* an attribute value.
    Attribute(AttributePlayerDef),

    /// A relation player matched by its owned attribute(s).
    ByAttribute(ByAttributeDef),

    /// A relation player that is itself a relation, matched by its own
    /// players.
    ByPlayers(ByPlayersDef),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnershipDef {
    /// Attribute type label.
    pub attribute: String,

    pub value_type: ValueType,

    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributePlayerDef {
    /// Role the player fills.
    pub role: String,

    /// The attribute type the player is an instance of.
    pub player_type: String,

    pub value_type: ValueType,

    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ByAttributeDef {
    pub role: String,

    /// Entity or relation type of the player.
    pub player_type: String,

    /// Identifying attribute type(s) and value type(s); the mapping's columns
    /// pair with these positionally.
    pub idents: Vec<IdentDef>,

    #[serde(default)]
    pub required: bool,
}

/// One identifying attribute of a `by-attribute` player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentDef {
    pub attribute: String,
    pub value_type: ValueType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ByPlayersDef {
    pub role: String,

    /// Relation type of the player.
    pub player_type: String,

    /// Column mappings for the nested relation's own players; each must
    /// reference a player generator.
    pub players: Vec<ColumnMapping>,

    #[serde(default)]
    pub required: bool,
}

fn default_separator() -> char {
    ','
}
