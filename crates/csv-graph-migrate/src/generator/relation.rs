//! Relation inserts over matched players.

use tracing::debug;

use crate::config::ResolvedEntry;
use crate::generator::{ownership_values, player};
use crate::pattern::{Pattern, ThingPattern};
use crate::source::Header;

/// Assemble the configured players, then bind one relation variable with one
/// `(role, variable)` pair per accepted player. A relation with zero accepted
/// players produces no statement.
pub fn build(entry: &ResolvedEntry, header: &Header, fields: &[String]) -> Option<Pattern> {
    let assembled = player::assemble(&entry.players, header, fields);
    if assembled.role_players.is_empty() {
        debug!("dataset '{}': row accepted no players", entry.key);
        return None;
    }

    let mut insert = ThingPattern::new(&entry.concept_type, &entry.concept_type);
    insert.role_players = assembled.role_players;
    for binding in &entry.ownerships {
        for value in ownership_values(binding, header, fields) {
            insert.push_has(&binding.attribute, value);
        }
    }

    Some(Pattern::MatchInsert {
        matches: assembled.matches,
        insert,
    })
}
