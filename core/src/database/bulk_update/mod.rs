//! The bulk-update engine: turns a set of modified in-memory records into
//! the smallest correct number of UPDATE statements against one table.
//!
//! Control flow per invocation: extract pending changes, merge handles that
//! alias the same row, split into batches that fit the backend's
//! bind-parameter ceiling, build one UPDATE-via-VALUES-join statement per
//! batch, execute, and mark every participating handle as written.

mod batch;
mod extract;
mod merge;
mod query_builder;

use std::collections::HashSet;

use chrono::Utc;
use tracing::{debug, error};

pub use extract::UPDATED_AT_COLUMN;

use crate::database::executor::{Executor, ExecutorError};
use crate::record::Record;
use crate::schema::{TableSchema, UnknownColumnError};
use query_builder::{BuiltQuery, QueryMode, UpdateContext};

#[derive(thiserror::Error, Debug)]
pub enum BulkUpdateError {
    #[error(transparent)]
    UnknownColumn(#[from] UnknownColumnError),

    #[error("a single record needs {required} bind parameters but the backend allows {limit}")]
    BatchTooLarge { required: usize, limit: usize },

    #[error("bulk update execution failed: {0}")]
    ExecutionFailed(#[from] ExecutorError),
}

/// Updates every record with pending changes in as few statements as
/// possible.
///
/// Succeeds as a no-op when `records` is empty or nothing has changed.
/// Handles aliasing the same row are legal input; later entries in the slice
/// win on conflicting attributes and every alias observes the merged state.
/// On success all participating change sets are cleared. Batches already
/// executed before a failure stay committed - callers wanting all-or-nothing
/// semantics have to supply their own transaction boundary.
pub async fn bulk_update<E>(
    executor: &E,
    schema: &TableSchema,
    records: &mut [Record],
) -> Result<(), BulkUpdateError>
where
    E: Executor + ?Sized,
{
    // captured once so every record in the invocation shares one stamp
    let now = Utc::now();

    let extracted = extract::extract_changes(records, schema, now);
    if extracted.survivors.is_empty() {
        return Ok(());
    }

    let mut attributes = Vec::with_capacity(extracted.attributes.len());
    for name in &extracted.attributes {
        attributes.push(schema.resolve_column(name)?.clone());
    }

    let representatives = merge::merge_duplicates(records, &extracted.survivors);

    let context = UpdateContext { table_name: schema.table_name().to_string(), attributes };
    let statement_label = format!("bulk_update:{}", schema.table_name());

    if executor.supports_prepared_statements() {
        let per_record_params = context.attributes.len() + 1;
        let records_per_batch =
            batch::max_records_per_batch(per_record_params, executor.max_bind_parameters())?;

        for chunk in representatives.chunks(records_per_batch) {
            execute_batch(executor, &context, records, chunk, QueryMode::Parameterized, &statement_label)
                .await?;
        }
    } else {
        execute_batch(executor, &context, records, &representatives, QueryMode::Inline, &statement_label)
            .await?;
    }

    Ok(())
}

async fn execute_batch<E>(
    executor: &E,
    context: &UpdateContext,
    records: &mut [Record],
    chunk: &[usize],
    mode: QueryMode,
    statement_label: &str,
) -> Result<(), BulkUpdateError>
where
    E: Executor + ?Sized,
{
    let built = {
        let chunk_records: Vec<&Record> = chunk.iter().map(|&index| &records[index]).collect();
        query_builder::build_query(executor, context, &chunk_records, mode)
    };

    match built {
        BuiltQuery::Inline(sql) => {
            debug!("{} - {} record(s) inline: {}", statement_label, chunk.len(), sql);
            executor.execute(&sql).await
        }
        BuiltQuery::Parameterized { sql, values } => {
            debug!("{} - {} record(s), {} bind values", statement_label, chunk.len(), values.len());
            executor.execute_parameterized(&sql, &values, statement_label).await
        }
    }
    .map_err(|e| {
        error!("{} - batch failed: {}", statement_label, e);
        BulkUpdateError::ExecutionFailed(e)
    })?;

    mark_applied(records, chunk);
    Ok(())
}

/// Clears the change set of every handle whose row was written by the batch,
/// aliases removed by the merger included.
fn mark_applied(records: &mut [Record], chunk: &[usize]) {
    let written: HashSet<i64> = chunk.iter().map(|&index| records[index].id()).collect();
    for record in records.iter_mut() {
        if written.contains(&record.id()) {
            record.changes_applied();
        }
    }
}
