use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard};
use std::collections::BTreeMap;
use std::sync::Arc;

use relational_dao::{Connection, ConnectionFactory, Dialect};

/// Raw row handed out by the fake connection.
pub type FakeRow = BTreeMap<String, String>;

/// Everything the template does to a connection, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Acquire,
    Batch(String),
    Update { sql: String, params: Vec<i64> },
    Query { sql: String, params: Vec<i64> },
    Release,
    Discard,
    Abandon,
    /// An abandoned connection was dropped, closing the session.
    Close,
}

/// Canned data and injected failures.
#[derive(Debug, Default)]
pub struct Script {
    pub fail_acquire: bool,
    /// Batch statements starting with any of these prefixes fail.
    pub fail_batches: Vec<&'static str>,
    pub fail_update: bool,
    pub fail_query: bool,
    pub fail_release: bool,
    pub affected: u64,
    pub rows: Vec<FakeRow>,
}

fn injected(what: &str) -> sqlx::Error {
    sqlx::Error::Protocol(format!("injected {what} failure"))
}

#[derive(Clone, Default)]
pub struct FakeFactory {
    log: Arc<Mutex<Vec<Event>>>,
    script: Arc<Mutex<Script>>,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock()
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.lock().clone()
    }

    pub fn count(&self, event: &Event) -> usize {
        self.log.lock().iter().filter(|e| *e == event).count()
    }

    pub fn batches(&self) -> Vec<String> {
        self.log
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Batch(sql) => Some(sql.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of acquisitions minus the number of releases, discards and
    /// closes.
    pub fn open_connections(&self) -> i64 {
        self.log.lock().iter().fold(0, |open, e| match e {
            Event::Acquire => open + 1,
            Event::Release | Event::Discard | Event::Close => open - 1,
            _ => open,
        })
    }
}

#[async_trait]
impl ConnectionFactory for FakeFactory {
    type Connection = FakeConnection;

    async fn acquire(&self) -> Result<FakeConnection, sqlx::Error> {
        if self.script.lock().fail_acquire {
            return Err(injected("acquire"));
        }
        self.log.lock().push(Event::Acquire);
        Ok(FakeConnection {
            log: self.log.clone(),
            script: self.script.clone(),
            abandoned: false,
        })
    }
}

pub struct FakeConnection {
    log: Arc<Mutex<Vec<Event>>>,
    script: Arc<Mutex<Script>>,
    abandoned: bool,
}

impl Drop for FakeConnection {
    fn drop(&mut self) {
        if self.abandoned {
            self.log.lock().push(Event::Close);
        }
    }
}

#[async_trait]
impl Connection for FakeConnection {
    type Row = FakeRow;

    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    async fn execute_batch(&mut self, sql: &str) -> Result<(), sqlx::Error> {
        self.log.lock().push(Event::Batch(sql.to_string()));
        let script = self.script.lock();
        if script.fail_batches.iter().any(|prefix| sql.starts_with(prefix)) {
            return Err(injected(sql));
        }
        Ok(())
    }

    async fn execute_update(&mut self, sql: &str, params: &[i64]) -> Result<u64, sqlx::Error> {
        self.log.lock().push(Event::Update {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        let script = self.script.lock();
        if script.fail_update {
            return Err(injected("update"));
        }
        Ok(script.affected)
    }

    async fn query_rows(&mut self, sql: &str, params: &[i64]) -> Result<Vec<FakeRow>, sqlx::Error> {
        self.log.lock().push(Event::Query {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        let script = self.script.lock();
        if script.fail_query {
            return Err(injected("query"));
        }
        Ok(script.rows.clone())
    }

    async fn query_row(&mut self, sql: &str, params: &[i64]) -> Result<Option<FakeRow>, sqlx::Error> {
        self.log.lock().push(Event::Query {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        let script = self.script.lock();
        if script.fail_query {
            return Err(injected("query"));
        }
        let id = params.first().map(|id| id.to_string());
        Ok(script
            .rows
            .iter()
            .find(|row| row.get("id") == id.as_ref())
            .cloned())
    }

    async fn release(self) -> Result<(), sqlx::Error> {
        self.log.lock().push(Event::Release);
        if self.script.lock().fail_release {
            return Err(injected("release"));
        }
        Ok(())
    }

    async fn discard(self) -> Result<(), sqlx::Error> {
        self.log.lock().push(Event::Discard);
        Ok(())
    }

    fn abandon(&mut self) {
        self.log.lock().push(Event::Abandon);
        self.abandoned = true;
    }
}
