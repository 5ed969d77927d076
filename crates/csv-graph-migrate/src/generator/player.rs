//! Recursive player assembly for relation patterns.
//!
//! Each configured player is one of three kinds: an attribute value, a thing
//! matched by owned attribute(s), or a relation matched recursively by its
//! own players. Players whose columns produce nothing are dropped; accepted
//! players are numbered contiguously, so variable indices never have gaps.

use crate::codec::encode;
use crate::config::{IdentAttribute, PlayerBinding, PlayerKind};
use crate::generator::cell;
use crate::pattern::ThingPattern;
use crate::source::Header;

/// The match-side patterns and role bindings produced for one relation.
#[derive(Debug, Default)]
pub struct AssembledPlayers {
    pub matches: Vec<ThingPattern>,
    pub role_players: Vec<(String, String)>,
}

/// Assemble all configured players of a relation from one row.
pub fn assemble(players: &[PlayerBinding], header: &Header, fields: &[String]) -> AssembledPlayers {
    let mut out = AssembledPlayers::default();
    let mut index = 0usize;
    for binding in players {
        assemble_player(binding, header, fields, None, &mut index, &mut out);
    }
    out
}

/// Assemble one player binding; returns how many player instances were
/// accepted. `index` advances only for accepted instances.
fn assemble_player(
    binding: &PlayerBinding,
    header: &Header,
    fields: &[String],
    parent_var: Option<&str>,
    index: &mut usize,
    out: &mut AssembledPlayers,
) -> usize {
    match &binding.kind {
        PlayerKind::Attribute { value_type } => {
            let mut accepted = 0;
            for column in &binding.columns {
                for value in encode(
                    cell(header, fields, column),
                    *value_type,
                    binding.preprocessor.as_ref(),
                    binding.list_separator.as_deref(),
                ) {
                    let var = player_var(binding, parent_var, *index);
                    *index += 1;
                    out.matches
                        .push(ThingPattern::new(var.clone(), &binding.player_type).with_value(value));
                    out.role_players.push((binding.role.clone(), var));
                    accepted += 1;
                }
            }
            accepted
        }

        PlayerKind::ByAttribute { idents } if idents.len() == 1 => {
            // One identifying attribute: each produced value matches its own
            // player instance.
            let ident = &idents[0];
            let mut accepted = 0;
            for column in &binding.columns {
                for value in encode(
                    cell(header, fields, column),
                    ident.value_type,
                    binding.preprocessor.as_ref(),
                    binding.list_separator.as_deref(),
                ) {
                    let var = player_var(binding, parent_var, *index);
                    *index += 1;
                    let mut thing = ThingPattern::new(var.clone(), &binding.player_type);
                    thing.push_has(&ident.attribute, value);
                    out.matches.push(thing);
                    out.role_players.push((binding.role.clone(), var));
                    accepted += 1;
                }
            }
            accepted
        }

        PlayerKind::ByAttribute { idents } => {
            // Several identifying attributes, paired positionally with the
            // mapped columns; one player instance matched by whichever
            // identifiers the row provides.
            let constraints = ident_constraints(idents, binding, header, fields);
            if constraints.is_empty() {
                return 0;
            }
            let var = player_var(binding, parent_var, *index);
            *index += 1;
            let mut thing = ThingPattern::new(var.clone(), &binding.player_type);
            for (attribute, value) in constraints {
                thing.push_has(attribute, value);
            }
            out.matches.push(thing);
            out.role_players.push((binding.role.clone(), var));
            1
        }

        PlayerKind::ByPlayers { players } => {
            let var = player_var(binding, parent_var, *index);
            let mut nested = AssembledPlayers::default();
            let mut nested_index = 0usize;
            for sub in players {
                let accepted =
                    assemble_player(sub, header, fields, Some(&var), &mut nested_index, &mut nested);
                if sub.required && accepted == 0 {
                    // A required sub-player is unresolvable: drop the whole
                    // player. The parent relation simply omits this role.
                    return 0;
                }
            }
            if nested.role_players.is_empty() {
                return 0;
            }
            *index += 1;
            out.matches.extend(nested.matches);
            let mut rel = ThingPattern::new(var.clone(), &binding.player_type);
            rel.role_players = nested.role_players;
            out.matches.push(rel);
            out.role_players.push((binding.role.clone(), var));
            1
        }
    }
}

fn ident_constraints<'a>(
    idents: &'a [IdentAttribute],
    binding: &PlayerBinding,
    header: &Header,
    fields: &[String],
) -> Vec<(&'a str, crate::codec::Value)> {
    idents
        .iter()
        .zip(&binding.columns)
        .filter_map(|(ident, column)| {
            encode(
                cell(header, fields, column),
                ident.value_type,
                binding.preprocessor.as_ref(),
                binding.list_separator.as_deref(),
            )
            .into_iter()
            .next()
            .map(|value| (ident.attribute.as_str(), value))
        })
        .collect()
}

fn player_var(binding: &PlayerBinding, parent_var: Option<&str>, index: usize) -> String {
    match parent_var {
        None => format!("{}-{}", binding.player_type, index),
        Some(parent) => format!("{}-{}", parent, index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::resolve::resolve_with_resources;
    use crate::config::{Config, SystemResources};

    fn players(yaml: &str) -> Vec<PlayerBinding> {
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        resolve_with_resources(&config, &SystemResources { cpu_cores: 4 })
            .unwrap()
            .remove(0)
            .players
    }

    fn header(names: &[&str]) -> Header {
        Header::new(names.iter().map(|s| s.to_string()).collect())
    }

    fn fields(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    const CHANNELS: &str = r#"
generators:
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
    columns:
      - generator: peer
        column: peer_1
      - generator: peer
        column: peer_2
      - generator: past-call
        column: [caller_id, callee_id]
"#;

    const CHANNEL_HEADER: &[&str] = &["peer_1", "peer_2", "caller_id", "callee_id"];

    #[test]
    fn test_nested_relation_assembly() {
        let players = players(CHANNELS);
        let out = assemble(
            &players,
            &header(CHANNEL_HEADER),
            &fields(&["+44", "+45", "+44", "+45"]),
        );

        // 2 leaf person patterns + 2 nested leaf patterns + 1 nested relation
        // match pattern.
        assert_eq!(out.matches.len(), 5);
        assert_eq!(out.role_players.len(), 3);
        assert_eq!(
            out.role_players,
            vec![
                ("peer".to_string(), "person-0".to_string()),
                ("peer".to_string(), "person-1".to_string()),
                ("past-call".to_string(), "call-2".to_string()),
            ]
        );

        let nested = out.matches.iter().find(|m| m.var == "call-2").unwrap();
        assert_eq!(nested.isa.as_deref(), Some("call"));
        assert_eq!(
            nested.role_players,
            vec![
                ("caller".to_string(), "call-2-0".to_string()),
                ("callee".to_string(), "call-2-1".to_string()),
            ]
        );
        assert!(out.matches.iter().any(|m| m.var == "call-2-0"));
        assert!(out.matches.iter().any(|m| m.var == "call-2-1"));
    }

    #[test]
    fn test_variable_names_are_unique() {
        let players = players(CHANNELS);
        let out = assemble(
            &players,
            &header(CHANNEL_HEADER),
            &fields(&["+44", "+45", "+44", "+45"]),
        );
        let mut names: Vec<&str> = out.matches.iter().map(|m| m.var.as_str()).collect();
        names.sort();
        let len = names.len();
        names.dedup();
        assert_eq!(names.len(), len);
    }

    #[test]
    fn test_required_sub_player_drop_propagates_without_index_gap() {
        let players = players(CHANNELS);
        // callee_id empty: the nested call player must drop entirely and the
        // surviving players keep contiguous indices.
        let out = assemble(
            &players,
            &header(CHANNEL_HEADER),
            &fields(&["+44", "+45", "+44", ""]),
        );
        assert_eq!(
            out.role_players,
            vec![
                ("peer".to_string(), "person-0".to_string()),
                ("peer".to_string(), "person-1".to_string()),
            ]
        );
        assert!(!out.matches.iter().any(|m| m.var.starts_with("call")));
    }

    #[test]
    fn test_dropped_player_renumbers_contiguously() {
        let players = players(CHANNELS);
        // First peer missing: the second peer takes index 0.
        let out = assemble(
            &players,
            &header(CHANNEL_HEADER),
            &fields(&["", "+45", "+44", "+45"]),
        );
        assert_eq!(out.role_players[0], ("peer".to_string(), "person-0".to_string()));
        assert_eq!(out.role_players[1], ("past-call".to_string(), "call-1".to_string()));
    }

    #[test]
    fn test_list_separator_fans_out_players() {
        let yaml = r#"
generators:
  peer:
    kind: by-attribute
    role: peer
    player_type: person
    idents:
      - attribute: phone-number
        value_type: string
datasets:
  - key: channels
    data_paths: ["channels.csv"]
    kind: relation
    concept_type: communication-channel
    columns:
      - generator: peer
        column: peers
        list_separator: ";"
"#;
        let players = players(yaml);
        let out = assemble(&players, &header(&["peers"]), &fields(&["+44;+45;+46"]));
        assert_eq!(out.role_players.len(), 3);
        assert_eq!(out.role_players[2].1, "person-2");
    }

    #[test]
    fn test_attribute_player() {
        let yaml = r#"
generators:
  at:
    kind: attribute
    role: at
    player_type: started-at
    value_type: datetime
datasets:
  - key: meetings
    data_paths: ["meetings.csv"]
    kind: relation
    concept_type: meeting
    columns:
      - generator: at
        column: started
"#;
        let players = players(yaml);
        let out = assemble(&players, &header(&["started"]), &fields(&["2021-01-01"]));
        assert_eq!(out.matches.len(), 1);
        assert_eq!(out.matches[0].var, "started-at-0");
        assert!(out.matches[0].value.is_some());
        assert_eq!(out.role_players[0].0, "at");
    }

    #[test]
    fn test_multi_ident_player_partial_identifiers() {
        let yaml = r#"
generators:
  contractor:
    kind: by-attribute
    role: contractor
    player_type: company
    idents:
      - attribute: company-name
        value_type: string
      - attribute: company-number
        value_type: long
datasets:
  - key: contracts
    data_paths: ["contracts.csv"]
    kind: relation
    concept_type: contract
    columns:
      - generator: contractor
        column: [name, number]
"#;
        let players = players(yaml);
        let out = assemble(&players, &header(&["name", "number"]), &fields(&["Acme", ""]));
        assert_eq!(out.matches.len(), 1);
        assert_eq!(out.matches[0].has.len(), 1);
        assert_eq!(out.matches[0].has[0].attribute, "company-name");

        let out = assemble(&players, &header(&["name", "number"]), &fields(&["", ""]));
        assert!(out.role_players.is_empty());
    }
}
