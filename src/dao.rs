use async_trait::async_trait;
use serde::Deserialize;
use tracing::{error, instrument};

use crate::dialect::PAGE_SIZE;
use crate::{
    Connection, ConnectionFactory, Dialect, ExecutionError, ExecutionResult, Executor, Operation,
    RowMapper, RowRecord,
};

/// Order column used by paged listings when none is given.
pub const DEFAULT_ORDER_COLUMN: &str = "create_date";

/// Raw row type produced by the connections of factory `F`.
pub type RowOf<F> = <<F as ConnectionFactory>::Connection as Connection>::Row;

/// Pagination state supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Pager {
    /// 1-based page number. Not validated: values below 1 produce a negative
    /// offset that is passed to the database unchanged, which rejects it.
    pub current: i64,
}

impl Pager {
    pub fn new(current: i64) -> Self {
        Self { current }
    }

    /// Number of rows skipped before this page, saturating at the `i64`
    /// bounds for out-of-range page numbers.
    pub fn offset(&self) -> i64 {
        self.current.saturating_sub(1).saturating_mul(PAGE_SIZE)
    }
}

impl Default for Pager {
    fn default() -> Self {
        Self { current: 1 }
    }
}

/// Shared helpers for concrete DAOs.
///
/// Table and column names are trusted identifiers and end up verbatim in the
/// statement text; never pass values derived from user input. Ids, offsets
/// and deltas are always bound as parameters.
#[derive(Debug, Clone)]
pub struct BaseDao<F> {
    executor: Executor<F>,
}

impl<F: ConnectionFactory> BaseDao<F> {
    pub fn new(executor: Executor<F>) -> Self {
        Self { executor }
    }

    /// Template for operations the helpers below don't cover.
    pub fn executor(&self) -> &Executor<F> {
        &self.executor
    }

    /// Sets `count_column` of row `id` to the number of `ref_table` rows whose
    /// `ref_column` equals `id`. Returns whether a row was updated.
    #[instrument(skip_all, fields(table = %table, id = id))]
    pub async fn update_derived_count(
        &self,
        table: &str,
        count_column: &str,
        ref_table: &str,
        ref_column: &str,
        id: i64,
    ) -> ExecutionResult<bool> {
        self.executor
            .execute_transactional(UpdateRows {
                table,
                kind: UpdateKind::DerivedCount {
                    count_column,
                    ref_table,
                    ref_column,
                    id,
                },
            })
            .await
    }

    /// Adds `delta` to `column` of row `id`. Returns whether a row was updated.
    #[instrument(skip_all, fields(table = %table, id = id, delta = delta))]
    pub async fn increment_count(
        &self,
        id: i64,
        table: &str,
        column: &str,
        delta: i64,
    ) -> ExecutionResult<bool> {
        self.executor
            .execute_transactional(UpdateRows {
                table,
                kind: UpdateKind::Increment { column, id, delta },
            })
            .await
    }

    /// [`BaseDao::increment_count`] by one.
    pub async fn increment(&self, id: i64, table: &str, column: &str) -> ExecutionResult<bool> {
        self.increment_count(id, table, column, 1).await
    }

    /// One page of `table`, ordered by `order_column` descending.
    #[instrument(skip_all, fields(table = %table, page = pager.current))]
    pub async fn list_page<M>(
        &self,
        pager: &Pager,
        table: &str,
        order_column: &str,
        mapper: &M,
    ) -> ExecutionResult<Vec<RowRecord>>
    where
        M: RowMapper<RowOf<F>>,
    {
        self.executor
            .execute_read_only(ListRows {
                table,
                kind: ListKind::Page {
                    order_column,
                    offset: pager.offset(),
                },
                mapper,
            })
            .await
    }

    /// [`BaseDao::list_page`] ordered by [`DEFAULT_ORDER_COLUMN`].
    pub async fn list_page_by_create_date<M>(
        &self,
        pager: &Pager,
        table: &str,
        mapper: &M,
    ) -> ExecutionResult<Vec<RowRecord>>
    where
        M: RowMapper<RowOf<F>>,
    {
        self.list_page(pager, table, DEFAULT_ORDER_COLUMN, mapper)
            .await
    }

    /// Every row of `table`, ordered descending by `order_column` if given.
    #[instrument(skip_all, fields(table = %table))]
    pub async fn list_all<M>(
        &self,
        table: &str,
        order_column: Option<&str>,
        mapper: &M,
    ) -> ExecutionResult<Vec<RowRecord>>
    where
        M: RowMapper<RowOf<F>>,
    {
        self.executor
            .execute_read_only(ListRows {
                table,
                kind: ListKind::All { order_column },
                mapper,
            })
            .await
    }

    /// The row of `table` with the given id, or an empty record when there
    /// is none.
    #[instrument(skip_all, fields(table = %table, id = id))]
    pub async fn get_by_id<M>(&self, table: &str, id: i64, mapper: &M) -> ExecutionResult<RowRecord>
    where
        M: RowMapper<RowOf<F>>,
    {
        self.executor
            .execute_read_only(GetById { table, id, mapper })
            .await
    }
}

fn statement_failed<'a>(
    action: &'static str,
    table: &'a str,
) -> impl FnOnce(sqlx::Error) -> ExecutionError + 'a {
    move |source| {
        error!(table, error = %source, "{action} {table} failed");
        ExecutionError::Statement(source)
    }
}

enum UpdateKind<'a> {
    Increment {
        column: &'a str,
        id: i64,
        delta: i64,
    },
    DerivedCount {
        count_column: &'a str,
        ref_table: &'a str,
        ref_column: &'a str,
        id: i64,
    },
}

struct UpdateRows<'a> {
    table: &'a str,
    kind: UpdateKind<'a>,
}

impl UpdateRows<'_> {
    fn render(&self, dialect: Dialect) -> (String, [i64; 2]) {
        match self.kind {
            UpdateKind::Increment { column, id, delta } => {
                (dialect.increment(self.table, column), [delta, id])
            }
            UpdateKind::DerivedCount {
                count_column,
                ref_table,
                ref_column,
                id,
            } => (
                dialect.derived_count(self.table, count_column, ref_table, ref_column),
                [id, id],
            ),
        }
    }
}

#[async_trait]
impl<'a, C: Connection> Operation<C> for UpdateRows<'a> {
    type Output = bool;

    async fn run(self, conn: &mut C) -> ExecutionResult<bool> {
        let (sql, params) = self.render(conn.dialect());
        let affected = conn
            .execute_update(&sql, &params)
            .await
            .map_err(statement_failed("update", self.table))?;
        Ok(affected > 0)
    }
}

enum ListKind<'a> {
    Page { order_column: &'a str, offset: i64 },
    All { order_column: Option<&'a str> },
}

struct ListRows<'a, M> {
    table: &'a str,
    kind: ListKind<'a>,
    mapper: &'a M,
}

#[async_trait]
impl<'a, C, M> Operation<C> for ListRows<'a, M>
where
    C: Connection,
    M: RowMapper<C::Row>,
{
    type Output = Vec<RowRecord>;

    async fn run(self, conn: &mut C) -> ExecutionResult<Vec<RowRecord>> {
        let dialect = conn.dialect();
        let (sql, params) = match self.kind {
            ListKind::Page {
                order_column,
                offset,
            } => (dialect.page(self.table, order_column), vec![offset]),
            ListKind::All { order_column } => (dialect.select_all(self.table, order_column), vec![]),
        };

        let rows = conn
            .query_rows(&sql, &params)
            .await
            .map_err(statement_failed("query", self.table))?;
        rows.iter()
            .map(|row| self.mapper.map_row(row))
            .collect::<Result<Vec<_>, _>>()
            .map_err(statement_failed("map", self.table))
    }
}

struct GetById<'a, M> {
    table: &'a str,
    id: i64,
    mapper: &'a M,
}

#[async_trait]
impl<'a, C, M> Operation<C> for GetById<'a, M>
where
    C: Connection,
    M: RowMapper<C::Row>,
{
    type Output = RowRecord;

    async fn run(self, conn: &mut C) -> ExecutionResult<RowRecord> {
        let sql = conn.dialect().select_by_id(self.table);
        let row = conn
            .query_row(&sql, &[self.id])
            .await
            .map_err(statement_failed("query", self.table))?;
        match row {
            Some(row) => self
                .mapper
                .map_row(&row)
                .map_err(statement_failed("map", self.table)),
            None => Ok(RowRecord::new()),
        }
    }
}
