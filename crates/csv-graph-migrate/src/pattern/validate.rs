//! Structural statement completeness check.
//!
//! Decides whether a built pattern satisfies the configuration's
//! required-field contract. The check walks the pattern tree against the
//! resolved entry - never the rendered statement text - and returns false on
//! any missing requirement; it never errors.

use crate::config::{ConceptKind, PlayerBinding, PlayerKind, ResolvedEntry};
use crate::pattern::{Pattern, ThingPattern};

/// True when the pattern is safe to submit for this dataset.
pub fn is_complete(pattern: &Pattern, entry: &ResolvedEntry) -> bool {
    if !pattern.variables_are_bound() {
        return false;
    }

    match entry.kind {
        ConceptKind::Attribute => {
            let insert = pattern.insert();
            insert.isa.as_deref() == Some(entry.concept_type.as_str()) && insert.value.is_some()
        }

        ConceptKind::Entity => {
            let insert = pattern.insert();
            declares_type(insert, entry) && required_ownerships_present(insert, entry, false)
        }

        ConceptKind::Relation => {
            let insert = pattern.insert();
            declares_type(insert, entry)
                && !insert.role_players.is_empty()
                && required_ownerships_present(insert, entry, false)
                && entry
                    .players
                    .iter()
                    .all(|player| player_satisfied(pattern, insert, player))
        }

        ConceptKind::AttributeAppend | ConceptKind::AppendOrInsert => {
            let insert = pattern.insert();
            let Some(matched) = pattern.matches().first() else {
                return false;
            };
            declares_type(matched, entry)
                && !matched.has.is_empty()
                && !insert.has.is_empty()
                && required_ownerships_present(matched, entry, true)
                && required_ownerships_present(insert, entry, false)
        }
    }
}

fn declares_type(thing: &ThingPattern, entry: &ResolvedEntry) -> bool {
    thing.isa.as_deref() == Some(entry.concept_type.as_str())
}

/// Every required ownership on the given side has at least one `has` edge.
fn required_ownerships_present(thing: &ThingPattern, entry: &ResolvedEntry, matching: bool) -> bool {
    entry
        .ownerships
        .iter()
        .filter(|o| o.required && o.is_match == matching)
        .all(|o| thing.has_count(&o.attribute) > 0)
}

/// A required player's role must be bound; a bound `by-players` player must
/// have its required sub-players transitively bound.
fn player_satisfied(pattern: &Pattern, insert: &ThingPattern, binding: &PlayerBinding) -> bool {
    let bound_vars: Vec<&str> = insert
        .role_players
        .iter()
        .filter(|(role, _)| role == &binding.role)
        .map(|(_, var)| var.as_str())
        .collect();

    if binding.required && bound_vars.is_empty() {
        return false;
    }

    if let PlayerKind::ByPlayers { players } = &binding.kind {
        for var in bound_vars {
            let Some(nested) = pattern.match_for_var(var) else {
                return false;
            };
            if !players
                .iter()
                .all(|sub| nested_player_satisfied(pattern, nested, sub))
            {
                return false;
            }
        }
    }

    true
}

fn nested_player_satisfied(
    pattern: &Pattern,
    nested: &ThingPattern,
    binding: &PlayerBinding,
) -> bool {
    if binding.required && !nested.binds_role(&binding.role) {
        return false;
    }
    if let PlayerKind::ByPlayers { players } = &binding.kind {
        for (_, var) in nested.role_players.iter().filter(|(r, _)| r == &binding.role) {
            let Some(inner) = pattern.match_for_var(var) else {
                return false;
            };
            if !players
                .iter()
                .all(|sub| nested_player_satisfied(pattern, inner, sub))
            {
                return false;
            }
        }
    }
    true
}
