//! Entity inserts with owned attributes.

use crate::config::ResolvedEntry;
use crate::generator::ownership_values;
use crate::pattern::{Pattern, ThingPattern};
use crate::source::Header;

/// One bound thing variable with a `has` edge per produced value across all
/// configured ownerships. Whether the result is submittable is the
/// validator's call, not the builder's.
pub fn build(entry: &ResolvedEntry, header: &Header, fields: &[String]) -> Pattern {
    let mut insert = ThingPattern::new(&entry.concept_type, &entry.concept_type);
    for binding in &entry.ownerships {
        for value in ownership_values(binding, header, fields) {
            insert.push_has(&binding.attribute, value);
        }
    }
    Pattern::DirectInsert { insert }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::testutil::{entry, fields, header};

    const PERSONS: &str = r#"
generators:
  first-name:
    kind: ownership
    attribute: first-name
    value_type: string
  phone:
    kind: ownership
    attribute: phone-number
    value_type: string
    required: true
datasets:
  - key: persons
    data_paths: ["persons.csv"]
    kind: entity
    concept_type: person
    columns:
      - generator: first-name
        column: first_name
      - generator: phone
        column: phone_number
"#;

    #[test]
    fn test_entity_with_two_ownerships() {
        let entry = entry(PERSONS);
        let pattern = build(
            &entry,
            &header(&["first_name", "phone_number"]),
            &fields(&["Melli", "+7 171 898 0853"]),
        );
        assert_eq!(
            pattern.to_string(),
            "insert $person isa person, has first-name \"Melli\", \
             has phone-number \"+7 171 898 0853\";"
        );
    }

    #[test]
    fn test_empty_cells_are_omitted() {
        let entry = entry(PERSONS);
        let pattern = build(
            &entry,
            &header(&["first_name", "phone_number"]),
            &fields(&["", "+44"]),
        );
        assert_eq!(
            pattern.to_string(),
            "insert $person isa person, has phone-number \"+44\";"
        );
    }
}
