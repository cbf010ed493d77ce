//! Relational DAO Module
//!
//! This module provides an execution template for data-access objects: it
//! acquires a connection per call, runs read-only or transactional units of
//! work, and ships the shared listing, lookup and counter helpers. Row to
//! record mapping is left to the concrete DAO.

#[macro_use]
mod mapping;

pub mod config;
pub mod connection;
pub mod dao;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod mysql;
pub mod postgres;

pub use config::{ConfigError, DaoConfig};
pub use connection::{Connection, ConnectionFactory};
pub use dao::{BaseDao, Pager, RowOf, DEFAULT_ORDER_COLUMN};
pub use dialect::{Dialect, PAGE_SIZE};
pub use error::{ExecutionError, ExecutionResult};
pub use executor::{Executor, Operation};
pub use mapping::{RowMapper, RowRecord, TextColumns};
