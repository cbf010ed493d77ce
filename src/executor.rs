use async_trait::async_trait;
use futures::future::BoxFuture;
use std::marker::PhantomData;
use tracing::{debug, error, warn};

use crate::{Connection, ConnectionFactory, ExecutionError, ExecutionResult};

/// A unit of work run against a single live connection.
///
/// The executor owns the connection lifecycle around `run`: acquisition,
/// session setup, commit or rollback and release. Implementations only issue
/// their statements.
#[async_trait]
pub trait Operation<C: Connection>: Send {
    type Output: Send;

    async fn run(self, conn: &mut C) -> ExecutionResult<Self::Output>;
}

/// Adapts a closure into an [`Operation`].
struct FnOperation<W, T> {
    work: W,
    _output: PhantomData<fn() -> T>,
}

#[async_trait]
impl<C, W, T> Operation<C> for FnOperation<W, T>
where
    C: Connection,
    W: for<'c> FnOnce(&'c mut C) -> BoxFuture<'c, ExecutionResult<T>> + Send,
    T: Send,
{
    type Output = T;

    async fn run(self, conn: &mut C) -> ExecutionResult<T> {
        (self.work)(conn).await
    }
}

/// Execution template for read-only and transactional units of work.
///
/// Every call acquires its own connection from the factory and releases it
/// before returning, whatever the outcome. The executor itself holds no
/// mutable state and can be shared freely between tasks.
#[derive(Debug, Clone)]
pub struct Executor<F> {
    factory: F,
    charset: Option<String>,
}

impl<F: ConnectionFactory> Executor<F> {
    /// Creates an executor using the dialect's default session charset.
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            charset: None,
        }
    }

    /// Overrides the character set applied to every session.
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Runs `work` on a connection marked read-only. No transaction is
    /// opened; the driver's autocommit default is left in place.
    ///
    /// The session is switched back to read-write before release so a pooled
    /// connection doesn't carry the read-only mode to its next borrower. If
    /// that fails the connection is discarded; the outcome of `work` stands.
    /// A call dropped before it completes abandons its connection.
    pub async fn execute_read_only<W>(&self, work: W) -> ExecutionResult<W::Output>
    where
        W: Operation<F::Connection>,
    {
        let mut conn = self.acquire().await?;
        let mut in_flight = InFlight::new(&mut conn);
        let (outcome, discard) = self.read_only_sequence(in_flight.conn(), work).await;
        in_flight.settle();
        finish(conn, outcome, discard).await
    }

    /// Runs `work` inside an explicit transaction.
    ///
    /// The transaction is committed when `work` succeeds. If `work` or the
    /// commit fails, a rollback is attempted before the failure is returned;
    /// a failed rollback is reported as [`ExecutionError::Rollback`] with the
    /// original failure as its cause.
    ///
    /// Dropping the returned future before it completes abandons the
    /// connection: it is closed rather than released, and the server rolls
    /// back the open transaction.
    pub async fn execute_transactional<W>(&self, work: W) -> ExecutionResult<W::Output>
    where
        W: Operation<F::Connection>,
    {
        let mut conn = self.acquire().await?;
        let mut in_flight = InFlight::new(&mut conn);
        let (outcome, discard) = self.transactional_sequence(in_flight.conn(), work).await;
        in_flight.settle();
        finish(conn, outcome, discard).await
    }

    /// Closure form of [`Executor::execute_read_only`].
    ///
    /// The returned future may only borrow the connection; anything else the
    /// closure needs must be moved into it. Use an [`Operation`] type to work
    /// with borrowed state.
    pub async fn read_only<T, W>(&self, work: W) -> ExecutionResult<T>
    where
        W: for<'c> FnOnce(&'c mut F::Connection) -> BoxFuture<'c, ExecutionResult<T>> + Send,
        T: Send,
    {
        self.execute_read_only(FnOperation {
            work,
            _output: PhantomData,
        })
        .await
    }

    /// Closure form of [`Executor::execute_transactional`].
    pub async fn transaction<T, W>(&self, work: W) -> ExecutionResult<T>
    where
        W: for<'c> FnOnce(&'c mut F::Connection) -> BoxFuture<'c, ExecutionResult<T>> + Send,
        T: Send,
    {
        self.execute_transactional(FnOperation {
            work,
            _output: PhantomData,
        })
        .await
    }

    /// Configures the session, runs `work` and restores read-write mode.
    /// Returns the outcome and whether the connection must be discarded.
    async fn read_only_sequence<W>(
        &self,
        conn: &mut F::Connection,
        work: W,
    ) -> (ExecutionResult<W::Output>, bool)
    where
        W: Operation<F::Connection>,
    {
        let outcome = match self.configure(conn, true).await {
            Ok(()) => work.run(conn).await,
            Err(err) => Err(err),
        };

        let restore = conn.dialect().set_read_only(false);
        let discard = match conn.execute_batch(restore).await {
            Ok(()) => false,
            Err(source) => {
                warn!(error = %source, "failed to restore read-write mode, discarding connection");
                true
            }
        };
        (outcome, discard)
    }

    /// Configures the session and opens the transaction, runs `work`, then
    /// commits or rolls back. A configuration failure skips the rollback
    /// since no transaction was opened.
    async fn transactional_sequence<W>(
        &self,
        conn: &mut F::Connection,
        work: W,
    ) -> (ExecutionResult<W::Output>, bool)
    where
        W: Operation<F::Connection>,
    {
        if let Err(err) = self.configure(conn, false).await {
            return (Err(err), false);
        }

        let dialect = conn.dialect();
        let outcome = match work.run(conn).await {
            Ok(value) => conn
                .execute_batch(dialect.commit())
                .await
                .map(|()| value)
                .map_err(ExecutionError::Commit),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(value) => (Ok(value), false),
            Err(cause) => {
                error!(error = %cause, "execute update failed, rolling back");
                match conn.execute_batch(dialect.rollback()).await {
                    Ok(()) => (Err(cause), false),
                    Err(source) => {
                        error!(error = %source, "rollback failed, discarding connection");
                        let err = ExecutionError::Rollback {
                            source,
                            cause: Box::new(cause),
                        };
                        (Err(err), true)
                    }
                }
            }
        }
    }

    async fn acquire(&self) -> ExecutionResult<F::Connection> {
        let conn = self.factory.acquire().await.map_err(|source| {
            warn!(error = %source, "failed to acquire connection");
            ExecutionError::Acquire(source)
        })?;
        debug!("connection acquired");
        Ok(conn)
    }

    /// Access mode and charset are set on every call since pooled sessions
    /// may carry settings left behind by a previous borrower.
    async fn configure(&self, conn: &mut F::Connection, read_only: bool) -> ExecutionResult<()> {
        let dialect = conn.dialect();
        let charset = self
            .charset
            .as_deref()
            .unwrap_or_else(|| dialect.default_charset());

        let mut steps = vec![
            ("access mode", dialect.set_read_only(read_only).to_string()),
            ("charset", dialect.set_charset(charset)),
        ];
        if !read_only {
            steps.push(("begin", dialect.begin().to_string()));
        }

        for (step, sql) in steps {
            conn.execute_batch(&sql).await.map_err(|source| {
                warn!(step, error = %source, "failed to configure connection");
                ExecutionError::Configure { step, source }
            })?;
        }
        Ok(())
    }
}

/// Connection lent to a running sequence. Dropped without [`InFlight::settle`],
/// which only happens when the caller's future is dropped mid-sequence, it
/// abandons the connection: the session may still hold an open transaction
/// or read-only mode and must not go back into service.
struct InFlight<'a, C: Connection> {
    conn: &'a mut C,
    settled: bool,
}

impl<'a, C: Connection> InFlight<'a, C> {
    fn new(conn: &'a mut C) -> Self {
        Self {
            conn,
            settled: false,
        }
    }

    fn conn(&mut self) -> &mut C {
        &mut *self.conn
    }

    /// The sequence ran to completion; the connection is finished normally.
    fn settle(mut self) {
        self.settled = true;
    }
}

impl<C: Connection> Drop for InFlight<'_, C> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("call cancelled mid-sequence, abandoning connection");
            self.conn.abandon();
        }
    }
}

/// Releases the connection and folds a release failure into the outcome.
async fn finish<C, T>(conn: C, outcome: ExecutionResult<T>, discard: bool) -> ExecutionResult<T>
where
    C: Connection,
{
    let released = if discard {
        conn.discard().await
    } else {
        conn.release().await
    };

    match released {
        Ok(()) => {
            debug!("connection released");
            outcome
        }
        Err(source) => {
            warn!(error = %source, "failed to release connection");
            Err(ExecutionError::Release {
                source,
                pending: outcome.err().map(Box::new),
            })
        }
    }
}
