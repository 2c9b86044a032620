use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type as PgType};
use uuid::Uuid;

/// A typed SQL value flowing through the bulk updater.
///
/// Carries enough type information for both execution paths: the
/// parameterized path serializes it over the wire through `ToSql`, the
/// inline path renders it as a quoted literal. The per-value association
/// with its column descriptor is kept by position in the ordered bind list.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlTypeWrapper {
    Bool(bool),
    VecBool(Vec<bool>),

    I32(i32),
    VecI32(Vec<i32>),

    I64(i64),
    VecI64(Vec<i64>),

    F64(f64),
    VecF64(Vec<f64>),

    Decimal(Decimal),
    VecDecimal(Vec<Decimal>),

    Text(String),
    VecText(Vec<String>),

    Uuid(Uuid),
    VecUuid(Vec<Uuid>),

    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(DateTime<Utc>),

    Json(Value),

    /// Explicit SQL NULL, valid for any column type.
    Null,
}

impl SqlTypeWrapper {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlTypeWrapper::Null)
    }

    /// Renders the value in the text input form Postgres expects for its
    /// type, without quoting. The caller is responsible for wrapping the
    /// result in a string literal where one is required.
    fn render(&self) -> String {
        match self {
            SqlTypeWrapper::Bool(value) => value.to_string(),
            SqlTypeWrapper::I32(value) => value.to_string(),
            SqlTypeWrapper::I64(value) => value.to_string(),
            SqlTypeWrapper::F64(value) => render_float(*value),
            SqlTypeWrapper::Decimal(value) => value.to_string(),
            SqlTypeWrapper::Text(value) => value.clone(),
            SqlTypeWrapper::Uuid(value) => value.to_string(),
            SqlTypeWrapper::Date(value) => value.format("%Y-%m-%d").to_string(),
            SqlTypeWrapper::Time(value) => value.format("%H:%M:%S%.6f").to_string(),
            SqlTypeWrapper::DateTime(value) => {
                value.format("%Y-%m-%d %H:%M:%S%.6f%:z").to_string()
            }
            SqlTypeWrapper::Json(value) => value.to_string(),
            SqlTypeWrapper::VecBool(values) => array_body(values.iter().map(bool::to_string)),
            SqlTypeWrapper::VecI32(values) => array_body(values.iter().map(i32::to_string)),
            SqlTypeWrapper::VecI64(values) => array_body(values.iter().map(i64::to_string)),
            SqlTypeWrapper::VecF64(values) => {
                array_body(values.iter().map(|value| render_float(*value)))
            }
            SqlTypeWrapper::VecDecimal(values) => {
                array_body(values.iter().map(Decimal::to_string))
            }
            SqlTypeWrapper::VecText(values) => {
                array_body(values.iter().map(|value| array_element(value)))
            }
            SqlTypeWrapper::VecUuid(values) => array_body(values.iter().map(Uuid::to_string)),
            SqlTypeWrapper::Null => "NULL".to_string(),
        }
    }

    /// Renders the value as a self-contained, backend-escaped SQL literal.
    /// Numbers and booleans stay bare, everything else becomes a quoted
    /// string literal for the server to parse via the attached cast.
    pub fn to_inline_literal(&self) -> String {
        match self {
            SqlTypeWrapper::Null => "NULL".to_string(),
            SqlTypeWrapper::Bool(value) => if *value { "TRUE" } else { "FALSE" }.to_string(),
            SqlTypeWrapper::I32(_) | SqlTypeWrapper::I64(_) | SqlTypeWrapper::Decimal(_) => {
                self.render()
            }
            SqlTypeWrapper::F64(value) if value.is_finite() => self.render(),
            _ => quote_string(&self.render()),
        }
    }
}

fn render_float(value: f64) -> String {
    // non-finite floats only exist in Postgres as the spelled-out forms
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_negative() { "-Infinity".to_string() } else { "Infinity".to_string() }
    } else {
        value.to_string()
    }
}

/// Wraps a raw value in a single-quoted SQL string literal. Backslashes force
/// the `E''` escape form so the server reads them back verbatim.
pub fn quote_string(value: &str) -> String {
    if value.contains('\\') {
        format!("E'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
    } else {
        format!("'{}'", value.replace('\'', "''"))
    }
}

fn array_body(elements: impl Iterator<Item = String>) -> String {
    format!("{{{}}}", elements.collect::<Vec<_>>().join(","))
}

// Escaping for one element inside a Postgres array body. The array parser
// has its own quoting layer on top of the string literal one.
fn array_element(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

impl ToSql for SqlTypeWrapper {
    fn to_sql(
        &self,
        ty: &PgType,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            SqlTypeWrapper::Bool(value) => value.to_sql(ty, out),
            SqlTypeWrapper::VecBool(values) => values.to_sql(ty, out),
            SqlTypeWrapper::I32(value) => value.to_sql(ty, out),
            SqlTypeWrapper::VecI32(values) => values.to_sql(ty, out),
            SqlTypeWrapper::I64(value) => value.to_sql(ty, out),
            SqlTypeWrapper::VecI64(values) => values.to_sql(ty, out),
            SqlTypeWrapper::F64(value) => value.to_sql(ty, out),
            SqlTypeWrapper::VecF64(values) => values.to_sql(ty, out),
            SqlTypeWrapper::Decimal(value) => value.to_sql(ty, out),
            SqlTypeWrapper::VecDecimal(values) => values.to_sql(ty, out),
            SqlTypeWrapper::Text(value) => value.to_sql(ty, out),
            SqlTypeWrapper::VecText(values) => values.to_sql(ty, out),
            SqlTypeWrapper::Uuid(value) => value.to_sql(ty, out),
            SqlTypeWrapper::VecUuid(values) => values.to_sql(ty, out),
            SqlTypeWrapper::Date(value) => value.to_sql(ty, out),
            SqlTypeWrapper::Time(value) => value.to_sql(ty, out),
            SqlTypeWrapper::DateTime(value) => value.to_sql(ty, out),
            SqlTypeWrapper::Json(value) => value.to_sql(ty, out),
            SqlTypeWrapper::Null => Ok(IsNull::Yes),
        }
    }

    fn accepts(_ty: &PgType) -> bool {
        true
    }

    to_sql_checked!();
}
