//! SQLite storage layer: connection pooling, schema migrations, the
//! single-writer queue, and a repository module per table.

pub mod migrate;
pub mod pool;
pub mod repo;
pub mod writer_queue;

pub use migrate::run_migrations;
pub use pool::{create_pool, create_test_pool};
pub use writer_queue::WriterQueue;
