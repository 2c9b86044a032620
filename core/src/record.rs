use std::collections::HashMap;

use crate::database::sql_type_wrapper::SqlTypeWrapper;

/// A live handle to one persisted row of one table.
///
/// Tracks which attributes have been modified since the row was last
/// written. Two handles with the same id represent the same logical row and
/// may carry divergent uncommitted change sets at the same time - the bulk
/// updater reconciles them before writing.
#[derive(Debug, Clone)]
pub struct Record {
    id: i64,
    values: HashMap<String, SqlTypeWrapper>,
    // value each attribute held before its first pending change
    original: HashMap<String, SqlTypeWrapper>,
    // insertion order is preserved so generated SQL is deterministic
    changed: Vec<String>,
}

impl Record {
    pub fn new(id: i64) -> Self {
        Record { id, values: HashMap::new(), original: HashMap::new(), changed: Vec::new() }
    }

    /// Creates a handle seeded with its persisted values. Nothing is marked
    /// as changed.
    pub fn with_values<N, I>(id: i64, values: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, SqlTypeWrapper)>,
    {
        let mut record = Record::new(id);
        record.values = values.into_iter().map(|(name, value)| (name.into(), value)).collect();
        record
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn get(&self, attribute: &str) -> Option<&SqlTypeWrapper> {
        self.values.get(attribute)
    }

    /// Sets an attribute, marking it changed only when the new value differs
    /// from the last persisted one. Setting an attribute back to its
    /// persisted value removes it from the change set again.
    pub fn set(&mut self, attribute: &str, value: SqlTypeWrapper) {
        match self.original.get(attribute).cloned() {
            Some(original) => {
                if original == value {
                    self.original.remove(attribute);
                    self.changed.retain(|name| name != attribute);
                }
                self.values.insert(attribute.to_string(), value);
            }
            None => {
                let persisted =
                    self.values.get(attribute).cloned().unwrap_or(SqlTypeWrapper::Null);
                if persisted == value {
                    self.values.insert(attribute.to_string(), value);
                    return;
                }
                self.original.insert(attribute.to_string(), persisted);
                self.values.insert(attribute.to_string(), value);
                self.mark_changed(attribute);
            }
        }
    }

    /// Overwrites an attribute and unconditionally marks it changed,
    /// regardless of what the handle currently holds. Used when propagating
    /// merged values across aliases of the same row.
    pub(crate) fn overwrite(&mut self, attribute: &str, value: SqlTypeWrapper) {
        if !self.original.contains_key(attribute) {
            let persisted = self.values.get(attribute).cloned().unwrap_or(SqlTypeWrapper::Null);
            self.original.insert(attribute.to_string(), persisted);
        }
        self.values.insert(attribute.to_string(), value);
        self.mark_changed(attribute);
    }

    fn mark_changed(&mut self, attribute: &str) {
        if !self.changed.iter().any(|name| name == attribute) {
            self.changed.push(attribute.to_string());
        }
    }

    pub fn is_changed(&self) -> bool {
        !self.changed.is_empty()
    }

    /// Changed attribute names in the order they were first modified.
    pub fn changed_attributes(&self) -> &[String] {
        &self.changed
    }

    /// Marks every pending change as written. The current values become the
    /// persisted baseline for future dirty tracking.
    pub fn changes_applied(&mut self) {
        self.changed.clear();
        self.original.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_marks_changed_in_insertion_order() {
        let mut record = Record::new(1);
        record.set("name", SqlTypeWrapper::Text("zed".to_string()));
        record.set("active", SqlTypeWrapper::Bool(true));
        record.set("name", SqlTypeWrapper::Text("zed again".to_string()));

        assert!(record.is_changed());
        assert_eq!(record.changed_attributes(), &["name".to_string(), "active".to_string()]);
    }

    #[test]
    fn test_set_to_persisted_value_is_not_a_change() {
        let mut record =
            Record::with_values(1, [("name", SqlTypeWrapper::Text("zed".to_string()))]);
        record.set("name", SqlTypeWrapper::Text("zed".to_string()));

        assert!(!record.is_changed());
    }

    #[test]
    fn test_reverting_to_persisted_value_clears_the_change() {
        let mut record = Record::with_values(1, [("count", SqlTypeWrapper::I64(5))]);
        record.set("count", SqlTypeWrapper::I64(9));
        assert!(record.is_changed());

        record.set("count", SqlTypeWrapper::I64(5));
        assert!(!record.is_changed());
        assert_eq!(record.get("count"), Some(&SqlTypeWrapper::I64(5)));
    }

    #[test]
    fn test_changes_applied_resets_the_baseline() {
        let mut record = Record::with_values(1, [("count", SqlTypeWrapper::I64(5))]);
        record.set("count", SqlTypeWrapper::I64(9));
        record.changes_applied();

        assert!(!record.is_changed());

        // 9 is now the persisted value, so setting it again is a no-op
        record.set("count", SqlTypeWrapper::I64(9));
        assert!(!record.is_changed());

        record.set("count", SqlTypeWrapper::I64(5));
        assert!(record.is_changed());
    }

    #[test]
    fn test_unset_attribute_is_treated_as_null() {
        let mut record = Record::new(1);
        record.set("notes", SqlTypeWrapper::Null);
        assert!(!record.is_changed());

        record.set("notes", SqlTypeWrapper::Text("hello".to_string()));
        assert!(record.is_changed());

        record.set("notes", SqlTypeWrapper::Null);
        assert!(!record.is_changed());
    }

    #[test]
    fn test_overwrite_always_marks_changed() {
        let mut record = Record::with_values(1, [("name", SqlTypeWrapper::Text("a".to_string()))]);
        record.overwrite("name", SqlTypeWrapper::Text("a".to_string()));
        assert!(record.is_changed());
    }
}
