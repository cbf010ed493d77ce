#![allow(dead_code)]

pub mod entities;
pub mod fake;
pub mod repositories;

pub use entities::Post;
pub use fake::{Event, FakeFactory, FakeRow};
pub use repositories::{CopyColumns, PostDao};

/// Routes library logs to the test output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
