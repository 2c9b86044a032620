use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Primary key column name assumed for every bulk-updatable table.
pub const PRIMARY_KEY_COLUMN: &str = "id";

/// Semantic column types the bulk updater knows how to write, together with
/// their Postgres storage mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Boolean,
    Integer,
    BigInt,
    Float,
    Decimal,
    Text,
    Uuid,
    Date,
    Time,
    Timestamp,
    Json,
    Jsonb,
}

impl ColumnType {
    /// The cast suffix attached to every value placed in the VALUES table.
    /// Without it Postgres infers column types from heterogeneous rows and
    /// corrupts anything that is not plain text.
    pub fn pg_cast(&self) -> &'static str {
        match self {
            ColumnType::Boolean => "::boolean",
            ColumnType::Integer => "::int",
            ColumnType::BigInt => "::bigint",
            ColumnType::Float => "::float",
            ColumnType::Decimal => "::decimal",
            ColumnType::Text => "::text",
            ColumnType::Uuid => "::uuid",
            ColumnType::Date => "::date",
            ColumnType::Time => "::time",
            ColumnType::Timestamp => "::timestamptz",
            ColumnType::Json => "::json",
            ColumnType::Jsonb => "::jsonb",
        }
    }
}

/// Immutable description of one persisted column, shared across all records
/// of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    pub name: String,
    pub column_type: ColumnType,
    pub is_array: bool,
}

impl AttributeDescriptor {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        AttributeDescriptor { name: name.into(), column_type, is_array: false }
    }

    pub fn array(name: impl Into<String>, column_type: ColumnType) -> Self {
        AttributeDescriptor { name: name.into(), column_type, is_array: true }
    }

    /// Full cast suffix for this column, including the array marker.
    pub fn cast(&self) -> String {
        if self.is_array {
            format!("{}[]", self.column_type.pg_cast())
        } else {
            self.column_type.pg_cast().to_string()
        }
    }
}

#[derive(thiserror::Error, Debug)]
#[error("unknown column `{column}` on table `{table}`")]
pub struct UnknownColumnError {
    pub table: String,
    pub column: String,
}

/// Column metadata for one table, the resolver the engine looks attribute
/// types up through. Synthetic attributes are accessor-backed names that are
/// legal on a record but have no persisted column behind them - they are
/// skipped during change extraction rather than treated as an error.
#[derive(Debug, Clone)]
pub struct TableSchema {
    table_name: String,
    columns: HashMap<String, AttributeDescriptor>,
    synthetic: HashSet<String>,
}

impl TableSchema {
    pub fn new(table_name: impl Into<String>, columns: Vec<AttributeDescriptor>) -> Self {
        TableSchema {
            table_name: table_name.into(),
            columns: columns
                .into_iter()
                .map(|descriptor| (descriptor.name.clone(), descriptor))
                .collect(),
            synthetic: HashSet::new(),
        }
    }

    pub fn with_synthetic<N: Into<String>>(
        mut self,
        attributes: impl IntoIterator<Item = N>,
    ) -> Self {
        self.synthetic.extend(attributes.into_iter().map(Into::into));
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn is_synthetic(&self, attribute: &str) -> bool {
        self.synthetic.contains(attribute)
    }

    pub fn resolve_column(
        &self,
        attribute: &str,
    ) -> Result<&AttributeDescriptor, UnknownColumnError> {
        self.columns.get(attribute).ok_or_else(|| UnknownColumnError {
            table: self.table_name.clone(),
            column: attribute.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_suffixes() {
        assert_eq!(AttributeDescriptor::new("active", ColumnType::Boolean).cast(), "::boolean");
        assert_eq!(
            AttributeDescriptor::new("seen_at", ColumnType::Timestamp).cast(),
            "::timestamptz",
        );
        assert_eq!(AttributeDescriptor::array("tags", ColumnType::Text).cast(), "::text[]");
        assert_eq!(AttributeDescriptor::array("scores", ColumnType::Integer).cast(), "::int[]");
    }

    #[test]
    fn test_resolve_column() {
        let schema =
            TableSchema::new("users", vec![AttributeDescriptor::new("name", ColumnType::Text)]);

        assert_eq!(schema.resolve_column("name").unwrap().column_type, ColumnType::Text);

        let err = schema.resolve_column("nope").unwrap_err();
        assert_eq!(err.to_string(), "unknown column `nope` on table `users`");
    }

    #[test]
    fn test_synthetic_attributes() {
        let schema = TableSchema::new("users", vec![]).with_synthetic(["full_name"]);

        assert!(schema.is_synthetic("full_name"));
        assert!(!schema.is_synthetic("name"));
    }
}
