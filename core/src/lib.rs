// public
mod database;
pub use database::{
    bulk_update::{bulk_update, BulkUpdateError, UPDATED_AT_COLUMN},
    executor::{Executor, ExecutorError},
    postgres::client::{
        connection_string, quote_identifier, PostgresClient, PostgresConnectionError,
        PostgresError, MAX_BIND_PARAMETERS,
    },
    sql_type_wrapper::SqlTypeWrapper,
};

mod record;
pub use record::Record;

mod schema;
pub use schema::{
    AttributeDescriptor, ColumnType, TableSchema, UnknownColumnError, PRIMARY_KEY_COLUMN,
};

mod logger;
pub use logger::{setup_info_logger, setup_logger};

// export 3rd party dependencies
pub use async_trait::async_trait;
pub use tokio_postgres::types::Type as PgType;
