//! Pre-flight configuration validation.
//!
//! Collects everything wrong with a configuration into one report instead of
//! failing on the first problem. Errors block the migration; warnings do not.

use tracing::{error, warn};

use crate::codec::ValueType;
use crate::config::resolve::{OwnershipBinding, PlayerBinding, PlayerKind, ResolvedEntry};
use crate::config::types::ConceptKind;
use crate::schema::Schema;
use crate::source::read_header;

/// Outcome of the pre-flight pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Migration must not start while errors are outstanding.
    pub fn is_blocking(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn log(&self) {
        for warning in &self.warnings {
            warn!("config: {}", warning);
        }
        for e in &self.errors {
            error!("config: {}", e);
        }
    }

    fn error(&mut self, entry: &str, message: impl AsRef<str>) {
        self.errors.push(format!("dataset '{}': {}", entry, message.as_ref()));
    }

    fn warning(&mut self, entry: &str, message: impl AsRef<str>) {
        self.warnings
            .push(format!("dataset '{}': {}", entry, message.as_ref()));
    }
}

/// Validate resolved entries against the live schema and the actual data
/// file headers.
pub fn preflight(entries: &[ResolvedEntry], schema: &Schema) -> ValidationReport {
    let mut report = ValidationReport::default();

    for (i, entry) in entries.iter().enumerate() {
        if entries[..i].iter().any(|other| other.key == entry.key) {
            report.error(&entry.key, "duplicate dataset key");
        }
        check_entry(entry, schema, &mut report);
        check_headers(entry, &mut report);
    }

    report
}

fn check_entry(entry: &ResolvedEntry, schema: &Schema, report: &mut ValidationReport) {
    if entry.batch_size == 0 {
        report.error(&entry.key, "batch_size must be at least 1");
    }
    if entry.threads == 0 {
        report.error(&entry.key, "threads must be at least 1");
    }
    if entry.data_paths.is_empty() {
        report.error(&entry.key, "no data paths configured");
    }
    if entry.order_before.is_some() && entry.order_after.is_some() {
        report.error(&entry.key, "order_before and order_after are mutually exclusive");
    }

    match entry.kind {
        ConceptKind::Attribute => {
            check_attribute_entry(entry, schema, report);
        }
        ConceptKind::Entity => {
            if !schema.has_thing_type(&entry.concept_type) {
                report.error(
                    &entry.key,
                    format!("concept type '{}' not in schema", entry.concept_type),
                );
            }
            check_ownerships(entry, &entry.ownerships, schema, report);
            if !entry.players.is_empty() {
                report.error(&entry.key, "entity entries cannot configure players");
            }
        }
        ConceptKind::Relation => {
            if !schema.relations.contains_key(&entry.concept_type) {
                report.error(
                    &entry.key,
                    format!("relation type '{}' not in schema", entry.concept_type),
                );
            }
            check_ownerships(entry, &entry.ownerships, schema, report);
            if entry.players.is_empty() {
                report.error(&entry.key, "relation entries need at least one player");
            }
            for player in &entry.players {
                check_player(entry, &entry.concept_type, player, schema, report);
            }
        }
        ConceptKind::AttributeAppend | ConceptKind::AppendOrInsert => {
            if !schema.has_thing_type(&entry.concept_type) {
                report.error(
                    &entry.key,
                    format!("concept type '{}' not in schema", entry.concept_type),
                );
            }
            check_ownerships(entry, &entry.ownerships, schema, report);
            if !entry.ownerships.iter().any(|o| o.is_match) {
                report.error(&entry.key, "append entries need at least one is_match mapping");
            }
            if !entry.ownerships.iter().any(|o| !o.is_match) {
                report.error(&entry.key, "append entries need at least one mapping to write");
            }
        }
    }
}

fn check_attribute_entry(entry: &ResolvedEntry, schema: &Schema, report: &mut ValidationReport) {
    match schema.attribute_value_type(&entry.concept_type) {
        None => report.error(
            &entry.key,
            format!("attribute type '{}' not in schema", entry.concept_type),
        ),
        Some(value_type) => {
            if let Some(ownership) = entry.ownerships.first() {
                if ownership.value_type != value_type {
                    report.error(
                        &entry.key,
                        format!(
                            "attribute '{}' is {} in the schema, configured as {}",
                            entry.concept_type, value_type, ownership.value_type
                        ),
                    );
                }
            }
        }
    }
}

fn check_ownerships(
    entry: &ResolvedEntry,
    ownerships: &[OwnershipBinding],
    schema: &Schema,
    report: &mut ValidationReport,
) {
    for ownership in ownerships {
        check_attribute(entry, &ownership.attribute, ownership.value_type, schema, report);
    }
}

fn check_attribute(
    entry: &ResolvedEntry,
    attribute: &str,
    configured: ValueType,
    schema: &Schema,
    report: &mut ValidationReport,
) {
    match schema.attribute_value_type(attribute) {
        None => report.error(
            &entry.key,
            format!("attribute type '{}' not in schema", attribute),
        ),
        Some(value_type) if value_type != configured => report.error(
            &entry.key,
            format!(
                "attribute '{}' is {} in the schema, configured as {}",
                attribute, value_type, configured
            ),
        ),
        Some(_) => {}
    }
}

fn check_player(
    entry: &ResolvedEntry,
    relation: &str,
    player: &PlayerBinding,
    schema: &Schema,
    report: &mut ValidationReport,
) {
    if !schema.relation_has_role(relation, &player.role) {
        report.error(
            &entry.key,
            format!("relation '{}' has no role '{}'", relation, player.role),
        );
    }

    match &player.kind {
        PlayerKind::Attribute { value_type } => {
            check_attribute(entry, &player.player_type, *value_type, schema, report);
        }
        PlayerKind::ByAttribute { idents } => {
            if !schema.has_thing_type(&player.player_type) {
                report.error(
                    &entry.key,
                    format!("player type '{}' not in schema", player.player_type),
                );
            }
            if idents.is_empty() {
                report.error(
                    &entry.key,
                    format!("player '{}' has no identifying attributes", player.role),
                );
            }
            for ident in idents {
                check_attribute(entry, &ident.attribute, ident.value_type, schema, report);
            }
            if player.columns.len() < idents.len() {
                report.error(
                    &entry.key,
                    format!(
                        "player '{}' maps {} columns for {} identifying attributes",
                        player.role,
                        player.columns.len(),
                        idents.len()
                    ),
                );
            }
        }
        PlayerKind::ByPlayers { players } => {
            if !schema.relations.contains_key(&player.player_type) {
                report.error(
                    &entry.key,
                    format!("nested relation type '{}' not in schema", player.player_type),
                );
            }
            if players.is_empty() {
                report.error(
                    &entry.key,
                    format!("nested player '{}' has no players of its own", player.role),
                );
            }
            for sub in players {
                check_player(entry, &player.player_type, sub, schema, report);
            }
        }
    }
}

/// Check that every mapped column exists in the data file headers.
fn check_headers(entry: &ResolvedEntry, report: &mut ValidationReport) {
    let mut columns: Vec<&str> = Vec::new();
    for ownership in &entry.ownerships {
        columns.extend(ownership.columns.iter().map(String::as_str));
    }
    for player in &entry.players {
        collect_player_columns(player, &mut columns);
    }

    for path in &entry.data_paths {
        match read_header(path, entry.separator) {
            Err(e) => report.error(&entry.key, e.to_string()),
            Ok(header) => {
                for column in &columns {
                    if !header.contains(column) {
                        report.error(
                            &entry.key,
                            format!("column '{}' not in header of {}", column, path.display()),
                        );
                    }
                }
                if header.len() > columns.len() {
                    report.warning(
                        &entry.key,
                        format!(
                            "{} of {} header columns in {} are unmapped",
                            header.len() - columns.len(),
                            header.len(),
                            path.display()
                        ),
                    );
                }
            }
        }
    }
}

fn collect_player_columns<'a>(player: &'a PlayerBinding, out: &mut Vec<&'a str>) {
    out.extend(player.columns.iter().map(String::as_str));
    if let PlayerKind::ByPlayers { players } = &player.kind {
        for sub in players {
            collect_player_columns(sub, out);
        }
    }
}
