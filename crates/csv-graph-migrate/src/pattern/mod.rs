//! Generated statement patterns.
//!
//! A pattern is a tree of bound variables: leaf attribute patterns, leaf
//! thing patterns (type plus owned-attribute constraints), and relation
//! patterns binding `(role, variable)` pairs. The tree is held structurally
//! until submission; rendering to statement text happens once, at the store
//! boundary (and for the invalid-row log).

pub mod validate;

use std::fmt;

use crate::codec::Value;

/// One `has` edge: an attribute value bound to a thing.
#[derive(Debug, Clone, PartialEq)]
pub struct HasConstraint {
    pub attribute: String,
    pub value: Value,
}

/// A single bound variable with its constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct ThingPattern {
    /// Variable name, without the `$` sigil.
    pub var: String,

    /// Concept type; None on the insert side of append statements, where the
    /// match side already declared it.
    pub isa: Option<String>,

    /// Literal value, for attribute variables.
    pub value: Option<Value>,

    /// Owned attribute constraints.
    pub has: Vec<HasConstraint>,

    /// `(role, variable)` bindings, for relation variables.
    pub role_players: Vec<(String, String)>,
}

impl ThingPattern {
    pub fn new(var: impl Into<String>, isa: impl Into<String>) -> Self {
        Self {
            var: var.into(),
            isa: Some(isa.into()),
            value: None,
            has: Vec::new(),
            role_players: Vec::new(),
        }
    }

    /// An insert-side pattern that only references an already-matched
    /// variable.
    pub fn unbound(var: impl Into<String>) -> Self {
        Self {
            var: var.into(),
            isa: None,
            value: None,
            has: Vec::new(),
            role_players: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn push_has(&mut self, attribute: impl Into<String>, value: Value) {
        self.has.push(HasConstraint {
            attribute: attribute.into(),
            value,
        });
    }

    pub fn push_role_player(&mut self, role: impl Into<String>, var: impl Into<String>) {
        self.role_players.push((role.into(), var.into()));
    }

    /// Count of `has` constraints for the given attribute label.
    pub fn has_count(&self, attribute: &str) -> usize {
        self.has.iter().filter(|h| h.attribute == attribute).count()
    }

    /// Whether a role binding exists for the given role label.
    pub fn binds_role(&self, role: &str) -> bool {
        self.role_players.iter().any(|(r, _)| r == role)
    }
}

impl fmt::Display for ThingPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.var)?;
        if !self.role_players.is_empty() {
            let pairs: Vec<String> = self
                .role_players
                .iter()
                .map(|(role, var)| format!("{}: ${}", role, var))
                .collect();
            write!(f, " ({})", pairs.join(", "))?;
        }
        if let Some(value) = &self.value {
            write!(f, " {}", value)?;
        }
        if let Some(isa) = &self.isa {
            write!(f, " isa {}", isa)?;
        }
        for h in &self.has {
            write!(f, ", has {} {}", h.attribute, h.value)?;
        }
        write!(f, ";")
    }
}

/// A generated statement: either a standalone insert, or a match over
/// existing things followed by an insert referencing their variables.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    DirectInsert {
        insert: ThingPattern,
    },
    MatchInsert {
        matches: Vec<ThingPattern>,
        insert: ThingPattern,
    },
}

impl Pattern {
    pub fn insert(&self) -> &ThingPattern {
        match self {
            Pattern::DirectInsert { insert } => insert,
            Pattern::MatchInsert { insert, .. } => insert,
        }
    }

    pub fn matches(&self) -> &[ThingPattern] {
        match self {
            Pattern::DirectInsert { .. } => &[],
            Pattern::MatchInsert { matches, .. } => matches,
        }
    }

    /// All variable names introduced by this statement, match side first.
    pub fn variable_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.matches().iter().map(|m| m.var.as_str()).collect();
        names.push(self.insert().var.as_str());
        names
    }

    /// Every variable referenced on the insert side must be bound on the
    /// match side, or be the insert's own variable.
    pub fn variables_are_bound(&self) -> bool {
        let insert = self.insert();
        insert.role_players.iter().all(|(_, var)| {
            var == &insert.var || self.matches().iter().any(|m| &m.var == var)
        })
    }

    /// Locate a match-side pattern by variable name.
    pub fn match_for_var(&self, var: &str) -> Option<&ThingPattern> {
        self.matches().iter().find(|m| m.var == var)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::DirectInsert { insert } => write!(f, "insert {}", insert),
            Pattern::MatchInsert { matches, insert } => {
                write!(f, "match ")?;
                for (i, m) in matches.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", m)?;
                }
                write!(f, " insert {}", insert)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Value;

    #[test]
    fn test_entity_insert_rendering() {
        let mut insert = ThingPattern::new("person", "person");
        insert.push_has("first-name", Value::String("Melli".into()));
        insert.push_has("phone-number", Value::String("+7 171 898 0853".into()));
        let pattern = Pattern::DirectInsert { insert };
        assert_eq!(
            pattern.to_string(),
            "insert $person isa person, has first-name \"Melli\", has phone-number \"+7 171 898 0853\";"
        );
    }

    #[test]
    fn test_attribute_insert_rendering() {
        let insert =
            ThingPattern::new("phone-number", "phone-number").with_value(Value::String("+44".into()));
        let pattern = Pattern::DirectInsert { insert };
        assert_eq!(pattern.to_string(), "insert $phone-number \"+44\" isa phone-number;");
    }

    #[test]
    fn test_relation_match_insert_rendering() {
        let mut caller = ThingPattern::new("person-0", "person");
        caller.push_has("phone-number", Value::String("+44".into()));
        let mut callee = ThingPattern::new("person-1", "person");
        callee.push_has("phone-number", Value::String("+7".into()));
        let mut insert = ThingPattern::new("call", "call");
        insert.push_role_player("caller", "person-0");
        insert.push_role_player("callee", "person-1");
        let pattern = Pattern::MatchInsert {
            matches: vec![caller, callee],
            insert,
        };
        assert_eq!(
            pattern.to_string(),
            "match $person-0 isa person, has phone-number \"+44\"; \
             $person-1 isa person, has phone-number \"+7\"; \
             insert $call (caller: $person-0, callee: $person-1) isa call;"
        );
    }

    #[test]
    fn test_append_rendering_has_no_insert_isa() {
        let mut matched = ThingPattern::new("person", "person");
        matched.push_has("phone-number", Value::String("+44".into()));
        let mut insert = ThingPattern::unbound("person");
        insert.push_has("twitter-username", Value::String("@jojo".into()));
        let pattern = Pattern::MatchInsert {
            matches: vec![matched],
            insert,
        };
        assert_eq!(
            pattern.to_string(),
            "match $person isa person, has phone-number \"+44\"; \
             insert $person, has twitter-username \"@jojo\";"
        );
    }

    #[test]
    fn test_variables_are_bound() {
        let mut insert = ThingPattern::new("call", "call");
        insert.push_role_player("caller", "person-0");
        let unbound = Pattern::MatchInsert {
            matches: vec![],
            insert: insert.clone(),
        };
        assert!(!unbound.variables_are_bound());

        let bound = Pattern::MatchInsert {
            matches: vec![ThingPattern::new("person-0", "person")],
            insert,
        };
        assert!(bound.variables_are_bound());
    }

    #[test]
    fn test_direct_insert_has_no_match_side() {
        let pattern = Pattern::DirectInsert {
            insert: ThingPattern::new("person", "person"),
        };
        assert!(pattern.matches().is_empty());
        assert!(pattern.variables_are_bound());
    }
}
