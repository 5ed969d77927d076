//! Independent attribute inserts.

use crate::config::ResolvedEntry;
use crate::generator::ownership_values;
use crate::pattern::{Pattern, ThingPattern};
use crate::source::Header;

/// One insert-only statement per produced value; a multi-valued cell yields
/// multiple independent statements.
pub fn build(entry: &ResolvedEntry, header: &Header, fields: &[String]) -> Vec<Pattern> {
    let binding = &entry.ownerships[0];
    ownership_values(binding, header, fields)
        .into_iter()
        .map(|value| Pattern::DirectInsert {
            insert: ThingPattern::new(&entry.concept_type, &entry.concept_type).with_value(value),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::testutil::{entry, fields, header};

    const PHONES: &str = r#"
generators:
  phone:
    kind: ownership
    attribute: phone-number
    value_type: string
    required: true
datasets:
  - key: phones
    data_paths: ["phones.csv"]
    kind: attribute
    concept_type: phone-number
    columns:
      - generator: phone
        column: phone_number
        list_separator: ";"
"#;

    #[test]
    fn test_multi_value_cell_yields_independent_statements() {
        let entry = entry(PHONES);
        let patterns = build(&entry, &header(&["phone_number"]), &fields(&["+44;+45;+46"]));
        assert_eq!(patterns.len(), 3);
        assert_eq!(
            patterns[1].to_string(),
            "insert $phone-number \"+45\" isa phone-number;"
        );
    }

    #[test]
    fn test_empty_cell_yields_no_statements() {
        let entry = entry(PHONES);
        assert!(build(&entry, &header(&["phone_number"]), &fields(&[""])).is_empty());
    }
}
