//! Pattern builders: compile one tokenized row into graph write statements.

pub mod append;
pub mod attribute;
pub mod entity;
pub mod player;
pub mod relation;

use crate::codec::{encode, Value};
use crate::config::{ConceptKind, OwnershipBinding, ResolvedEntry};
use crate::pattern::Pattern;
use crate::source::Header;

/// One row compiled to a statement, with the raw row retained for the log
/// streams and, for append-or-insert entries, the direct-insert fallback used
/// when the match finds nothing.
#[derive(Debug, Clone)]
pub struct CompiledRow {
    pub raw: String,
    pub pattern: Pattern,
    pub fallback: Option<Pattern>,
}

/// Result of compiling one row.
#[derive(Debug)]
pub enum Compiled {
    /// Zero or more statements. Zero means the row produced nothing (e.g. an
    /// empty attribute cell) - not an error.
    Statements(Vec<CompiledRow>),

    /// The row cannot form a statement for this dataset.
    Rejected(String),
}

/// Compile one row according to the dataset's concept kind.
pub fn compile_row(
    entry: &ResolvedEntry,
    header: &Header,
    raw: &str,
    fields: &[String],
) -> Compiled {
    match entry.kind {
        ConceptKind::Attribute => {
            let statements = attribute::build(entry, header, fields)
                .into_iter()
                .map(|pattern| CompiledRow {
                    raw: raw.to_string(),
                    pattern,
                    fallback: None,
                })
                .collect();
            Compiled::Statements(statements)
        }
        ConceptKind::Entity => Compiled::Statements(vec![CompiledRow {
            raw: raw.to_string(),
            pattern: entity::build(entry, header, fields),
            fallback: None,
        }]),
        ConceptKind::Relation => match relation::build(entry, header, fields) {
            Some(pattern) => Compiled::Statements(vec![CompiledRow {
                raw: raw.to_string(),
                pattern,
                fallback: None,
            }]),
            None => Compiled::Rejected("no players accepted".into()),
        },
        ConceptKind::AttributeAppend => {
            let (pattern, _) = append::build(entry, header, fields, false);
            Compiled::Statements(vec![CompiledRow {
                raw: raw.to_string(),
                pattern,
                fallback: None,
            }])
        }
        ConceptKind::AppendOrInsert => {
            let (pattern, fallback) = append::build(entry, header, fields, true);
            Compiled::Statements(vec![CompiledRow {
                raw: raw.to_string(),
                pattern,
                fallback,
            }])
        }
    }
}

/// Look up one cell by column name; missing cells (short rows, unknown
/// columns) read as empty.
pub(crate) fn cell<'a>(header: &Header, fields: &'a [String], column: &str) -> &'a str {
    header
        .get(column)
        .and_then(|i| fields.get(i))
        .map(String::as_str)
        .unwrap_or("")
}

/// All values an ownership binding produces from this row, across all of its
/// configured columns.
pub(crate) fn ownership_values(
    binding: &OwnershipBinding,
    header: &Header,
    fields: &[String],
) -> Vec<Value> {
    binding
        .columns
        .iter()
        .flat_map(|column| {
            encode(
                cell(header, fields, column),
                binding.value_type,
                binding.preprocessor.as_ref(),
                binding.list_separator.as_deref(),
            )
        })
        .collect()
}
