use chrono::{DateTime, Utc};

use crate::database::sql_type_wrapper::SqlTypeWrapper;
use crate::record::Record;
use crate::schema::{TableSchema, PRIMARY_KEY_COLUMN};

/// Column stamped with the shared per-invocation timestamp on every record
/// that participates in a bulk update.
pub const UPDATED_AT_COLUMN: &str = "updated_at";

/// Outcome of the change-extraction pass: which records still qualify
/// (by index into the caller's slice) and the ordered union of attribute
/// names to write.
pub(crate) struct ExtractedChanges {
    pub survivors: Vec<usize>,
    pub attributes: Vec<String>,
}

/// Filters out records with nothing pending, stamps the survivors with the
/// shared `now` and collects the union of their changed attribute names in
/// first-appearance order, so the generated SQL is deterministic.
///
/// Synthetic accessor-backed attributes are dropped here; only persisted
/// columns reach the query builder. The primary key never appears in the
/// union, it is always written as the join key instead.
pub(crate) fn extract_changes(
    records: &mut [Record],
    schema: &TableSchema,
    now: DateTime<Utc>,
) -> ExtractedChanges {
    let survivors: Vec<usize> = records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| record.is_changed().then_some(index))
        .collect();

    let mut attributes: Vec<String> = Vec::new();
    for &index in &survivors {
        let record = &mut records[index];
        record.set(UPDATED_AT_COLUMN, SqlTypeWrapper::DateTime(now));

        for name in record.changed_attributes() {
            if name == PRIMARY_KEY_COLUMN || schema.is_synthetic(name) {
                continue;
            }
            if !attributes.iter().any(|existing| existing == name) {
                attributes.push(name.clone());
            }
        }
    }

    ExtractedChanges { survivors, attributes }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::schema::{AttributeDescriptor, ColumnType};

    fn schema() -> TableSchema {
        TableSchema::new(
            "users",
            vec![
                AttributeDescriptor::new("name", ColumnType::Text),
                AttributeDescriptor::new("active", ColumnType::Boolean),
                AttributeDescriptor::new(UPDATED_AT_COLUMN, ColumnType::Timestamp),
            ],
        )
        .with_synthetic(["display_name"])
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_unchanged_records_are_filtered_out() {
        let mut records = vec![Record::new(1), Record::new(2)];
        records[1].set("name", SqlTypeWrapper::Text("b".to_string()));

        let extracted = extract_changes(&mut records, &schema(), now());

        assert_eq!(extracted.survivors, vec![1]);
        // the untouched record is not stamped
        assert!(records[0].get(UPDATED_AT_COLUMN).is_none());
    }

    #[test]
    fn test_survivors_share_one_timestamp() {
        let mut records = vec![Record::new(1), Record::new(2)];
        records[0].set("name", SqlTypeWrapper::Text("a".to_string()));
        records[1].set("active", SqlTypeWrapper::Bool(false));

        extract_changes(&mut records, &schema(), now());

        let stamp = SqlTypeWrapper::DateTime(now());
        assert_eq!(records[0].get(UPDATED_AT_COLUMN), Some(&stamp));
        assert_eq!(records[1].get(UPDATED_AT_COLUMN), Some(&stamp));
    }

    #[test]
    fn test_union_preserves_first_appearance_order() {
        let mut records = vec![Record::new(1), Record::new(2), Record::new(3)];
        records[0].set("name", SqlTypeWrapper::Text("a".to_string()));
        records[1].set("active", SqlTypeWrapper::Bool(true));
        records[2].set("name", SqlTypeWrapper::Text("c".to_string()));

        let extracted = extract_changes(&mut records, &schema(), now());

        assert_eq!(
            extracted.attributes,
            vec!["name".to_string(), UPDATED_AT_COLUMN.to_string(), "active".to_string()],
        );
    }

    #[test]
    fn test_synthetic_attributes_are_excluded() {
        let mut records = vec![Record::new(1)];
        records[0].set("display_name", SqlTypeWrapper::Text("Ada L.".to_string()));
        records[0].set("name", SqlTypeWrapper::Text("ada".to_string()));

        let extracted = extract_changes(&mut records, &schema(), now());

        assert_eq!(
            extracted.attributes,
            vec!["name".to_string(), UPDATED_AT_COLUMN.to_string()],
        );
    }

    #[test]
    fn test_empty_input() {
        let extracted = extract_changes(&mut [], &schema(), now());
        assert!(extracted.survivors.is_empty());
        assert!(extracted.attributes.is_empty());
    }
}
