//! Attribute-append statements: locate an existing thing by its matching
//! attribute(s), append the remaining attributes.

use crate::config::ResolvedEntry;
use crate::generator::ownership_values;
use crate::pattern::{Pattern, ThingPattern};
use crate::source::Header;

/// Build the match/insert pair. With `with_fallback`, also build the
/// standalone direct-insert statement used when the match finds nothing
/// (append-or-insert entries).
pub fn build(
    entry: &ResolvedEntry,
    header: &Header,
    fields: &[String],
    with_fallback: bool,
) -> (Pattern, Option<Pattern>) {
    let mut matched = ThingPattern::new(&entry.concept_type, &entry.concept_type);
    let mut insert = ThingPattern::unbound(&entry.concept_type);

    for binding in &entry.ownerships {
        let values = ownership_values(binding, header, fields);
        let side = if binding.is_match { &mut matched } else { &mut insert };
        for value in values {
            side.push_has(&binding.attribute, value);
        }
    }

    let fallback = with_fallback.then(|| {
        let mut direct = ThingPattern::new(&entry.concept_type, &entry.concept_type);
        direct.has = matched.has.iter().chain(insert.has.iter()).cloned().collect();
        Pattern::DirectInsert { insert: direct }
    });

    let pattern = Pattern::MatchInsert {
        matches: vec![matched],
        insert,
    };
    (pattern, fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::testutil::{entry, fields, header};

    const TWITTER: &str = r#"
generators:
  phone:
    kind: ownership
    attribute: phone-number
    value_type: string
    required: true
  twitter:
    kind: ownership
    attribute: twitter-username
    value_type: string
    required: true
datasets:
  - key: twitter
    data_paths: ["twitter.csv"]
    kind: attribute-append
    concept_type: person
    columns:
      - generator: phone
        column: phone_number
        is_match: true
      - generator: twitter
        column: twitter
        list_separator: ";"
"#;

    #[test]
    fn test_append_splits_match_and_insert() {
        let entry = entry(TWITTER);
        let (pattern, fallback) = build(
            &entry,
            &header(&["phone_number", "twitter"]),
            &fields(&["+44", "@jojo"]),
            false,
        );
        assert!(fallback.is_none());
        assert_eq!(
            pattern.to_string(),
            "match $person isa person, has phone-number \"+44\"; \
             insert $person, has twitter-username \"@jojo\";"
        );
    }

    #[test]
    fn test_missing_match_cell_leaves_match_unconstrained() {
        let entry = entry(TWITTER);
        let (pattern, _) = build(
            &entry,
            &header(&["phone_number", "twitter"]),
            &fields(&["", "@jojo"]),
            false,
        );
        assert!(pattern.matches()[0].has.is_empty());
    }

    #[test]
    fn test_append_or_insert_builds_fallback() {
        let yaml = TWITTER.replace("kind: attribute-append", "kind: append-or-insert");
        let entry = entry(&yaml);
        let (_, fallback) = build(
            &entry,
            &header(&["phone_number", "twitter"]),
            &fields(&["+44", "@jojo;@jj"]),
            true,
        );
        assert_eq!(
            fallback.unwrap().to_string(),
            "insert $person isa person, has phone-number \"+44\", \
             has twitter-username \"@jojo\", has twitter-username \"@jj\";"
        );
    }
}
