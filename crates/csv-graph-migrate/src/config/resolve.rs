//! Resolution of generator-name references into self-contained entries.
//!
//! The pattern builders never look at the raw configuration: they consume
//! `ResolvedEntry` trees in which every generator reference has been replaced
//! by the generator itself, preprocessors are compiled, and batch/thread
//! settings carry their effective values.

use std::path::PathBuf;

use crate::codec::{Preprocessor, ValueType};
use crate::config::types::{
    ColumnMapping, ConceptKind, Config, GeneratorDef, MappingEntry, SystemResources,
};
use crate::error::{MigrateError, Result};

/// Maximum nesting depth for `by-players` references; deeper references are
/// treated as configuration cycles.
const MAX_PLAYER_DEPTH: usize = 8;

const DEFAULT_BATCH_SIZE: usize = 1000;

/// A dataset entry with all generator references resolved.
#[derive(Debug, Clone)]
pub struct ResolvedEntry {
    pub key: String,
    pub data_paths: Vec<PathBuf>,
    pub separator: u8,
    pub batch_size: usize,
    pub threads: usize,
    pub kind: ConceptKind,
    pub concept_type: String,
    pub ownerships: Vec<OwnershipBinding>,
    pub players: Vec<PlayerBinding>,
    pub order_before: Option<u32>,
    pub order_after: Option<u32>,
    pub ignore: bool,
}

impl ResolvedEntry {
    /// Rows accumulated per chunk before fanning out to workers.
    pub fn chunk_size(&self) -> usize {
        self.batch_size * self.threads
    }
}

/// An attribute ownership bound to its source column(s).
#[derive(Debug, Clone)]
pub struct OwnershipBinding {
    pub attribute: String,
    pub value_type: ValueType,
    pub required: bool,
    pub is_match: bool,
    pub columns: Vec<String>,
    pub list_separator: Option<String>,
    pub preprocessor: Option<Preprocessor>,
}

/// A relation player bound to its source column(s).
#[derive(Debug, Clone)]
pub struct PlayerBinding {
    pub role: String,
    pub player_type: String,
    pub required: bool,
    pub columns: Vec<String>,
    pub list_separator: Option<String>,
    pub preprocessor: Option<Preprocessor>,
    pub kind: PlayerKind,
}

/// The closed set of player classifications.
#[derive(Debug, Clone)]
pub enum PlayerKind {
    /// The player is an attribute value.
    Attribute { value_type: ValueType },

    /// The player is a thing identified by owned attribute(s).
    ByAttribute { idents: Vec<IdentAttribute> },

    /// The player is a relation identified by its own players.
    ByPlayers { players: Vec<PlayerBinding> },
}

/// One identifying attribute of a `by-attribute` player.
#[derive(Debug, Clone)]
pub struct IdentAttribute {
    pub attribute: String,
    pub value_type: ValueType,
}

/// Resolve every dataset entry of a configuration.
pub fn resolve(config: &Config) -> Result<Vec<ResolvedEntry>> {
    let resources = SystemResources::detect();
    resolve_with_resources(config, &resources)
}

/// Resolution with explicit system resources, for deterministic tests.
pub fn resolve_with_resources(
    config: &Config,
    resources: &SystemResources,
) -> Result<Vec<ResolvedEntry>> {
    config
        .datasets
        .iter()
        .map(|entry| resolve_entry(config, entry, resources))
        .collect()
}

fn resolve_entry(
    config: &Config,
    entry: &MappingEntry,
    resources: &SystemResources,
) -> Result<ResolvedEntry> {
    let mut ownerships = Vec::new();
    let mut players = Vec::new();

    for mapping in &entry.columns {
        match lookup(config, &entry.key, &mapping.generator)? {
            GeneratorDef::Ownership(def) => ownerships.push(OwnershipBinding {
                attribute: def.attribute.clone(),
                value_type: def.value_type,
                required: def.required,
                is_match: mapping.is_match,
                columns: mapping.column.names(),
                list_separator: mapping.list_separator.clone(),
                preprocessor: compile_preprocessor(mapping)?,
            }),
            player_def => {
                players.push(resolve_player(config, &entry.key, mapping, player_def, 0)?)
            }
        }
    }

    if entry.kind == ConceptKind::Attribute && ownerships.len() != 1 {
        return Err(MigrateError::config(format!(
            "dataset '{}': attribute entries need exactly one ownership mapping, found {}",
            entry.key,
            ownerships.len()
        )));
    }

    let batch_size = entry
        .batch_size
        .or(config.defaults.batch_size)
        .unwrap_or(DEFAULT_BATCH_SIZE);
    let threads = entry
        .threads
        .or(config.defaults.threads)
        .unwrap_or_else(|| resources.default_threads());

    Ok(ResolvedEntry {
        key: entry.key.clone(),
        data_paths: entry.data_paths.clone(),
        separator: entry.separator as u8,
        batch_size,
        threads,
        kind: entry.kind,
        concept_type: entry.concept_type.clone(),
        ownerships,
        players,
        order_before: entry.order_before,
        order_after: entry.order_after,
        ignore: entry.ignore,
    })
}

fn resolve_player(
    config: &Config,
    entry_key: &str,
    mapping: &ColumnMapping,
    def: &GeneratorDef,
    depth: usize,
) -> Result<PlayerBinding> {
    if depth > MAX_PLAYER_DEPTH {
        return Err(MigrateError::config(format!(
            "dataset '{}': player generator '{}' nests deeper than {} levels (reference cycle?)",
            entry_key, mapping.generator, MAX_PLAYER_DEPTH
        )));
    }

    let binding = match def {
        GeneratorDef::Ownership(_) => {
            return Err(MigrateError::config(format!(
                "dataset '{}': generator '{}' is an ownership, but is used as a player",
                entry_key, mapping.generator
            )))
        }
        GeneratorDef::Attribute(def) => PlayerBinding {
            role: def.role.clone(),
            player_type: def.player_type.clone(),
            required: def.required,
            columns: mapping.column.names(),
            list_separator: mapping.list_separator.clone(),
            preprocessor: compile_preprocessor(mapping)?,
            kind: PlayerKind::Attribute {
                value_type: def.value_type,
            },
        },
        GeneratorDef::ByAttribute(def) => PlayerBinding {
            role: def.role.clone(),
            player_type: def.player_type.clone(),
            required: def.required,
            columns: mapping.column.names(),
            list_separator: mapping.list_separator.clone(),
            preprocessor: compile_preprocessor(mapping)?,
            kind: PlayerKind::ByAttribute {
                idents: def
                    .idents
                    .iter()
                    .map(|i| IdentAttribute {
                        attribute: i.attribute.clone(),
                        value_type: i.value_type,
                    })
                    .collect(),
            },
        },
        GeneratorDef::ByPlayers(def) => {
            let mut nested = Vec::with_capacity(def.players.len());
            for sub in &def.players {
                let sub_def = lookup(config, entry_key, &sub.generator)?;
                nested.push(resolve_player(config, entry_key, sub, sub_def, depth + 1)?);
            }
            PlayerBinding {
                role: def.role.clone(),
                player_type: def.player_type.clone(),
                required: def.required,
                columns: mapping.column.names(),
                list_separator: mapping.list_separator.clone(),
                preprocessor: compile_preprocessor(mapping)?,
                kind: PlayerKind::ByPlayers { players: nested },
            }
        }
    };

    Ok(binding)
}

fn lookup<'a>(config: &'a Config, entry_key: &str, name: &str) -> Result<&'a GeneratorDef> {
    config.generators.get(name).ok_or_else(|| {
        MigrateError::config(format!(
            "dataset '{}': unknown generator '{}'",
            entry_key, name
        ))
    })
}

fn compile_preprocessor(mapping: &ColumnMapping) -> Result<Option<Preprocessor>> {
    mapping
        .preprocessor
        .as_ref()
        .map(Preprocessor::compile)
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resources() -> SystemResources {
        SystemResources { cpu_cores: 6 }
    }

    fn config(yaml: &str) -> Config {
        serde_yaml::from_str(yaml).unwrap()
    }

    const NESTED: &str = r#"
generators:
  person-phone:
    kind: ownership
    attribute: phone-number
    value_type: string
    required: true
  peer:
    kind: by-attribute
    role: peer
    player_type: person
    required: true
    idents:
      - attribute: phone-number
        value_type: string
  caller:
    kind: by-attribute
    role: caller
    player_type: person
    required: true
    idents:
      - attribute: phone-number
        value_type: string
  callee:
    kind: by-attribute
    role: callee
    player_type: person
    required: true
    idents:
      - attribute: phone-number
        value_type: string
  past-call:
    kind: by-players
    role: past-call
    player_type: call
    required: true
    players:
      - generator: caller
        column: caller_id
      - generator: callee
        column: callee_id
datasets:
  - key: channels
    data_paths: ["channels.csv"]
    kind: relation
    concept_type: communication-channel
    threads: 2
    batch_size: 50
    columns:
      - generator: peer
        column: peer_1
      - generator: peer
        column: peer_2
      - generator: past-call
        column: [caller_id, callee_id]
"#;

    #[test]
    fn test_resolves_nested_players() {
        let entries = resolve_with_resources(&config(NESTED), &resources()).unwrap();
        let entry = &entries[0];
        assert_eq!(entry.players.len(), 3);
        assert_eq!(entry.chunk_size(), 100);
        match &entry.players[2].kind {
            PlayerKind::ByPlayers { players } => {
                assert_eq!(players.len(), 2);
                assert_eq!(players[0].role, "caller");
                assert!(matches!(players[0].kind, PlayerKind::ByAttribute { .. }));
            }
            other => panic!("expected by-players, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_generator_is_config_error() {
        let yaml = NESTED.replace("generator: peer", "generator: missing");
        let err = resolve_with_resources(&config(&yaml), &resources()).unwrap_err();
        assert!(matches!(err, MigrateError::Config(_)));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_threads_auto_tuned_when_unset() {
        let yaml = NESTED.replace("    threads: 2\n", "");
        let entries = resolve_with_resources(&config(&yaml), &resources()).unwrap();
        assert_eq!(entries[0].threads, 4); // 6 cores - 2
    }

    #[test]
    fn test_attribute_entry_needs_one_ownership() {
        let yaml = r#"
generators:
  phone:
    kind: ownership
    attribute: phone-number
    value_type: string
datasets:
  - key: phones
    data_paths: ["phones.csv"]
    kind: attribute
    concept_type: phone-number
    columns: []
"#;
        let err = resolve_with_resources(&config(yaml), &resources()).unwrap_err();
        assert!(err.to_string().contains("exactly one ownership"));
    }
}
