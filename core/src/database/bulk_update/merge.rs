use std::collections::HashMap;

use crate::database::sql_type_wrapper::SqlTypeWrapper;
use crate::record::Record;

/// Collapses handles that alias the same row into one representative per
/// identity.
///
/// Conflicting pending attributes are resolved by position: later handles in
/// the input order win. The merged values are written back onto every handle
/// in the group, so all aliases observe identical pending state before any
/// change set is cleared. Returned representatives are the first handle of
/// each identity in input order.
pub(crate) fn merge_duplicates(records: &mut [Record], survivors: &[usize]) -> Vec<usize> {
    let mut identity_order: Vec<i64> = Vec::new();
    let mut groups: HashMap<i64, Vec<usize>> = HashMap::new();
    for &index in survivors {
        let id = records[index].id();
        let group = groups.entry(id).or_insert_with(|| {
            identity_order.push(id);
            Vec::new()
        });
        group.push(index);
    }

    let mut representatives = Vec::with_capacity(identity_order.len());
    for id in identity_order {
        let group = &groups[&id];
        if group.len() == 1 {
            representatives.push(group[0]);
            continue;
        }

        // last write wins: walk the group in input order, overwriting
        let mut merged: Vec<(String, SqlTypeWrapper)> = Vec::new();
        for &index in group {
            for name in records[index].changed_attributes() {
                let value =
                    records[index].get(name).cloned().unwrap_or(SqlTypeWrapper::Null);
                match merged.iter_mut().find(|(merged_name, _)| merged_name == name) {
                    Some(slot) => slot.1 = value,
                    None => merged.push((name.clone(), value)),
                }
            }
        }

        for &index in group {
            for (name, value) in &merged {
                records[index].overwrite(name, value.clone());
            }
        }

        representatives.push(group[0]);
    }

    representatives
}
