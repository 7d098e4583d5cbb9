use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow, PgSslMode};
use sqlx::{Column, Row as _, TypeInfo};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

use super::{DataStore, Row, Value};
use crate::error::StoreError;

const UNDEFINED_TABLE: &str = "42P01";

/// [`DataStore`] backed by a Postgres connection pool scoped to one database.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects to `database` on the server described by `url`.
    ///
    /// With `root_cert` set the connection requires TLS and verifies the
    /// server certificate and host name against it.
    pub async fn connect(
        url: &str,
        database: &str,
        root_cert: Option<&Path>,
    ) -> Result<Self, StoreError> {
        let mut options = PgConnectOptions::from_str(url)
            .map_err(|e| StoreError::Connect(e.to_string()))?
            .database(database);

        if let Some(cert) = root_cert {
            options = options
                .ssl_mode(PgSslMode::VerifyFull)
                .ssl_root_cert(cert);
        }

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connect(e.to_string()))?;

        debug!(database, "Connected to Postgres");
        Ok(Self { pool })
    }
}

#[async_trait]
impl DataStore for PgStore {
    async fn query(&self, sql: &str) -> Result<Vec<Row>, StoreError> {
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, sql))?;

        rows.iter().map(decode_row).collect()
    }
}

fn map_sqlx_error(err: sqlx::Error, sql: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some(UNDEFINED_TABLE) {
            return StoreError::UndefinedTable(db.message().to_string());
        }
    }
    StoreError::Query(format!("{err} (sql: {sql})"))
}

fn decode_row(row: &PgRow) -> Result<Row, StoreError> {
    row.columns()
        .iter()
        .map(|col| {
            let i = col.ordinal();
            let value = match col.type_info().name() {
                "BOOL" => get::<bool>(row, i)?.map(Value::Bool),
                "INT2" => get::<i16>(row, i)?.map(|v| Value::Int(v.into())),
                "INT4" => get::<i32>(row, i)?.map(|v| Value::Int(v.into())),
                "INT8" => get::<i64>(row, i)?.map(Value::Int),
                "FLOAT4" => get::<f32>(row, i)?.map(|v| Value::Float(v.into())),
                "FLOAT8" => get::<f64>(row, i)?.map(Value::Float),
                "DATE" => get::<NaiveDate>(row, i)?.map(Value::Date),
                "TIMESTAMP" => get::<NaiveDateTime>(row, i)?.map(Value::Timestamp),
                "TIMESTAMPTZ" => {
                    get::<DateTime<Utc>>(row, i)?.map(|v| Value::Timestamp(v.naive_utc()))
                }
                _ => get::<String>(row, i)?.map(Value::Text),
            };
            Ok(value.unwrap_or(Value::Null))
        })
        .collect()
}

fn get<'r, T>(row: &'r PgRow, index: usize) -> Result<Option<T>, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get::<Option<T>, _>(index)
        .map_err(|e| StoreError::Query(format!("column {index}: {e}")))
}
