//! PostgreSQL bindings for the execution template.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgRow};
use sqlx::query::Query;
use sqlx::types::{JsonValue, Uuid};
use sqlx::{Column, PgConnection, Pool, Postgres, Row};

use crate::{Connection, ConnectionFactory, Dialect, RowMapper, RowRecord, TextColumns};

fn bind_all<'q>(sql: &'q str, params: &[i64]) -> Query<'q, Postgres, PgArguments> {
    params
        .iter()
        .fold(sqlx::query(sql), |query, param| query.bind(*param))
}

#[async_trait]
impl Connection for PgConnection {
    type Row = PgRow;

    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn execute_batch(&mut self, sql: &str) -> Result<(), sqlx::Error> {
        sqlx::Executor::execute(&mut *self, sql).await?;
        Ok(())
    }

    async fn execute_update(&mut self, sql: &str, params: &[i64]) -> Result<u64, sqlx::Error> {
        let result = bind_all(sql, params).execute(&mut *self).await?;
        Ok(result.rows_affected())
    }

    async fn query_rows(&mut self, sql: &str, params: &[i64]) -> Result<Vec<PgRow>, sqlx::Error> {
        bind_all(sql, params).fetch_all(&mut *self).await
    }

    async fn query_row(&mut self, sql: &str, params: &[i64]) -> Result<Option<PgRow>, sqlx::Error> {
        bind_all(sql, params).fetch_optional(&mut *self).await
    }

    async fn release(self) -> Result<(), sqlx::Error> {
        sqlx::Connection::close(self).await
    }

    async fn discard(self) -> Result<(), sqlx::Error> {
        sqlx::Connection::close(self).await
    }

    // Dropping an unpooled connection already closes its socket.
    fn abandon(&mut self) {}
}

#[async_trait]
impl Connection for PoolConnection<Postgres> {
    type Row = PgRow;

    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn execute_batch(&mut self, sql: &str) -> Result<(), sqlx::Error> {
        (**self).execute_batch(sql).await
    }

    async fn execute_update(&mut self, sql: &str, params: &[i64]) -> Result<u64, sqlx::Error> {
        (**self).execute_update(sql, params).await
    }

    async fn query_rows(&mut self, sql: &str, params: &[i64]) -> Result<Vec<PgRow>, sqlx::Error> {
        (**self).query_rows(sql, params).await
    }

    async fn query_row(&mut self, sql: &str, params: &[i64]) -> Result<Option<PgRow>, sqlx::Error> {
        (**self).query_row(sql, params).await
    }

    async fn release(self) -> Result<(), sqlx::Error> {
        // Dropping hands the connection back to the pool.
        drop(self);
        Ok(())
    }

    async fn discard(self) -> Result<(), sqlx::Error> {
        sqlx::Connection::close(self.detach()).await
    }

    fn abandon(&mut self) {
        PoolConnection::close_on_drop(self);
    }
}

#[async_trait]
impl ConnectionFactory for Pool<Postgres> {
    type Connection = PoolConnection<Postgres>;

    async fn acquire(&self) -> Result<Self::Connection, sqlx::Error> {
        Pool::acquire(self).await
    }
}

/// Opens a fresh, unpooled connection per call.
#[async_trait]
impl ConnectionFactory for PgConnectOptions {
    type Connection = PgConnection;

    async fn acquire(&self) -> Result<Self::Connection, sqlx::Error> {
        sqlx::ConnectOptions::connect(self).await
    }
}

impl RowMapper<PgRow> for TextColumns {
    fn map_row(&self, row: &PgRow) -> Result<RowRecord, sqlx::Error> {
        let mut record = RowRecord::with_capacity(row.columns().len());
        for column in row.columns() {
            let text = column_text!(
                row, column.ordinal();
                String, i64, i32, i16, f64, f32, bool,
                NaiveDateTime, DateTime<Utc>, NaiveDate, NaiveTime, Uuid, JsonValue
            )?;
            if let Some(text) = text {
                record.insert(column.name().to_string(), text);
            }
        }
        Ok(record)
    }
}
