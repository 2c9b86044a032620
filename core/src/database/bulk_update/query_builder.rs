use crate::database::executor::Executor;
use crate::database::sql_type_wrapper::SqlTypeWrapper;
use crate::record::Record;
use crate::schema::{AttributeDescriptor, PRIMARY_KEY_COLUMN};

/// Immutable per-invocation build state, assembled once and threaded through
/// the pipeline instead of living in ambient state: the target table and the
/// resolved attribute list in its fixed output order.
pub(crate) struct UpdateContext {
    pub table_name: String,
    pub attributes: Vec<AttributeDescriptor>,
}

/// How values reach the server. Selected once per call from the backend's
/// capabilities, never re-decided per value.
#[derive(Debug, Clone, Copy)]
pub(crate) enum QueryMode {
    Inline,
    Parameterized,
}

pub(crate) enum BuiltQuery {
    /// Self-contained SQL with every value inlined as a quoted, cast literal.
    Inline(String),
    /// SQL with typed positional placeholders and the matching ordered bind
    /// list. Placeholder count always equals `values.len()`.
    Parameterized { sql: String, values: Vec<SqlTypeWrapper> },
}

/// Builds one UPDATE-via-VALUES-join statement covering `records` and the
/// context's attribute list:
///
/// `UPDATE t SET c = tmp.c, ... FROM (VALUES ...) AS tmp(id, c, ...) WHERE t.id = tmp.id`
///
/// Every value carries its native-type cast so the VALUES table never has to
/// infer column types from heterogeneous rows.
pub(crate) fn build_query<E>(
    executor: &E,
    context: &UpdateContext,
    records: &[&Record],
    mode: QueryMode,
) -> BuiltQuery
where
    E: Executor + ?Sized,
{
    match mode {
        QueryMode::Inline => {
            let rows: Vec<String> = records
                .iter()
                .map(|record| {
                    let mut tuple = Vec::with_capacity(context.attributes.len() + 1);
                    tuple.push(format!("{}::bigint", record.id()));
                    for descriptor in &context.attributes {
                        let value = record
                            .get(&descriptor.name)
                            .cloned()
                            .unwrap_or(SqlTypeWrapper::Null);
                        tuple.push(format!(
                            "{}{}",
                            executor.quote_literal(&value),
                            descriptor.cast(),
                        ));
                    }
                    format!("({})", tuple.join(", "))
                })
                .collect();

            BuiltQuery::Inline(build_statement(executor, context, &rows.join(", ")))
        }
        QueryMode::Parameterized => {
            let per_record = context.attributes.len() + 1;
            let mut values: Vec<SqlTypeWrapper> =
                Vec::with_capacity(records.len() * per_record);
            let mut rows = Vec::with_capacity(records.len());

            for (i, record) in records.iter().enumerate() {
                let base = i * per_record + 1;
                let mut tuple = Vec::with_capacity(per_record);

                tuple.push(format!("${}::bigint", base));
                values.push(SqlTypeWrapper::I64(record.id()));

                for (j, descriptor) in context.attributes.iter().enumerate() {
                    tuple.push(format!("${}{}", base + j + 1, descriptor.cast()));
                    values.push(
                        record.get(&descriptor.name).cloned().unwrap_or(SqlTypeWrapper::Null),
                    );
                }

                rows.push(format!("({})", tuple.join(", ")));
            }

            let sql = build_statement(executor, context, &rows.join(", "));
            BuiltQuery::Parameterized { sql, values }
        }
    }
}

fn build_statement<E>(executor: &E, context: &UpdateContext, values_clause: &str) -> String
where
    E: Executor + ?Sized,
{
    let table = quoted_table_name(executor, &context.table_name);

    let assignments = context
        .attributes
        .iter()
        .map(|descriptor| {
            let column = executor.quote_identifier(&descriptor.name);
            format!("{} = tmp.{}", column, column)
        })
        .collect::<Vec<_>>()
        .join(", ");

    let mut columns = vec![PRIMARY_KEY_COLUMN.to_string()];
    columns.extend(
        context.attributes.iter().map(|descriptor| executor.quote_identifier(&descriptor.name)),
    );

    format!(
        "UPDATE {table} SET {assignments} FROM (VALUES {values}) AS tmp({columns}) WHERE {table}.{id} = tmp.{id}",
        table = table,
        assignments = assignments,
        values = values_clause,
        columns = columns.join(", "),
        id = PRIMARY_KEY_COLUMN,
    )
}

/// Quotes a possibly schema-qualified table name part by part.
fn quoted_table_name<E>(executor: &E, table_name: &str) -> String
where
    E: Executor + ?Sized,
{
    table_name
        .split('.')
        .map(|part| executor.quote_identifier(part))
        .collect::<Vec<_>>()
        .join(".")
}
