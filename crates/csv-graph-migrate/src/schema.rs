//! Minimal surface of the live store schema.
//!
//! The migrator never defines or infers schema; it only needs enough of it to
//! reconcile the mapping configuration during pre-flight validation: which
//! attribute types exist (and their value types), which thing types exist,
//! and which roles each relation declares.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::codec::ValueType;
use crate::error::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    /// Attribute type label to value type.
    #[serde(default)]
    pub attributes: BTreeMap<String, ValueType>,

    /// Entity type labels.
    #[serde(default)]
    pub entities: BTreeSet<String>,

    /// Relation type label to its declared roles.
    #[serde(default)]
    pub relations: BTreeMap<String, BTreeSet<String>>,
}

impl Schema {
    /// Load a schema description from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let schema: Schema = serde_yaml::from_str(&content)?;
        Ok(schema)
    }

    pub fn attribute_value_type(&self, label: &str) -> Option<ValueType> {
        self.attributes.get(label).copied()
    }

    /// Entity, relation, or attribute type with this label exists.
    pub fn has_concept(&self, label: &str) -> bool {
        self.entities.contains(label)
            || self.relations.contains_key(label)
            || self.attributes.contains_key(label)
    }

    /// Entity or relation type with this label exists.
    pub fn has_thing_type(&self, label: &str) -> bool {
        self.entities.contains(label) || self.relations.contains_key(label)
    }

    pub fn relation_has_role(&self, relation: &str, role: &str) -> bool {
        self.relations
            .get(relation)
            .map(|roles| roles.contains(role))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_yaml() {
        let yaml = r#"
attributes:
  phone-number: string
  started-at: datetime
entities: [person]
relations:
  call: [caller, callee]
"#;
        let schema: Schema = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            schema.attribute_value_type("phone-number"),
            Some(ValueType::String)
        );
        assert!(schema.has_thing_type("person"));
        assert!(schema.has_thing_type("call"));
        assert!(!schema.has_thing_type("phone-number"));
        assert!(schema.has_concept("phone-number"));
        assert!(schema.relation_has_role("call", "caller"));
        assert!(!schema.relation_has_role("call", "peer"));
    }
}
