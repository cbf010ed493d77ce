use async_trait::async_trait;
use std::sync::Arc;

use crate::Dialect;

/// A live database session handed to a unit of work.
///
/// Only values are bound (`params`); statement text is rendered by the
/// [`Dialect`] the connection reports. Both release methods consume the
/// connection, so a connection can be given back at most once.
#[async_trait]
pub trait Connection: Send + 'static {
    /// Raw result row handed to row mappers.
    type Row: Send;

    fn dialect(&self) -> Dialect;

    /// Runs a parameterless statement outside the prepared-statement path
    /// (session settings, transaction control).
    async fn execute_batch(&mut self, sql: &str) -> Result<(), sqlx::Error>;

    /// Runs a parameterized statement and returns the number of affected rows.
    async fn execute_update(&mut self, sql: &str, params: &[i64]) -> Result<u64, sqlx::Error>;

    async fn query_rows(&mut self, sql: &str, params: &[i64])
        -> Result<Vec<Self::Row>, sqlx::Error>;

    async fn query_row(
        &mut self,
        sql: &str,
        params: &[i64],
    ) -> Result<Option<Self::Row>, sqlx::Error>;

    /// Gives the connection back to where it came from.
    async fn release(self) -> Result<(), sqlx::Error>;

    /// Gets rid of a connection whose session state can no longer be
    /// trusted, e.g. after a failed rollback. Pooled connections are closed
    /// instead of being returned to the pool.
    async fn discard(self) -> Result<(), sqlx::Error>;

    /// Marks a connection left mid-sequence by a cancelled call, so that
    /// dropping it closes the session instead of handing it back. The
    /// server rolls back whatever transaction was open.
    fn abandon(&mut self);
}

/// Hands out ready connections.
///
/// This is the only way the execution template obtains a connection; it is
/// called exactly once at the start of every operation.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    type Connection: Connection;

    async fn acquire(&self) -> Result<Self::Connection, sqlx::Error>;
}

#[async_trait]
impl<F: ConnectionFactory> ConnectionFactory for Arc<F> {
    type Connection = F::Connection;

    async fn acquire(&self) -> Result<Self::Connection, sqlx::Error> {
        (**self).acquire().await
    }
}
