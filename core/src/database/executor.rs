use async_trait::async_trait;

use crate::database::postgres::client::PostgresError;
use crate::database::sql_type_wrapper::SqlTypeWrapper;

#[derive(thiserror::Error, Debug)]
pub enum ExecutorError {
    #[error("{0}")]
    Postgres(#[from] PostgresError),

    #[error("backend failure: {0}")]
    Backend(String),
}

/// The connection boundary the bulk updater talks to.
///
/// The engine builds SQL; the executor owns quoting conventions, the
/// bind-parameter ceiling and the wire. `statement_label` is a caller-facing
/// tag surfaced in logs and never interpreted.
#[async_trait]
pub trait Executor: Send + Sync {
    fn quote_identifier(&self, name: &str) -> String;

    /// Renders a value as a backend-escaped literal (inline mode only).
    fn quote_literal(&self, value: &SqlTypeWrapper) -> String;

    fn max_bind_parameters(&self) -> usize;

    /// When false the engine falls back to building fully inlined SQL.
    fn supports_prepared_statements(&self) -> bool;

    async fn execute(&self, sql: &str) -> Result<u64, ExecutorError>;

    async fn execute_parameterized(
        &self,
        sql: &str,
        values: &[SqlTypeWrapper],
        statement_label: &str,
    ) -> Result<u64, ExecutorError>;
}
