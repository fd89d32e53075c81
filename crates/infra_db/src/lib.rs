//! Database infrastructure layer
//!
//! Repositories over PostgreSQL (SQLx) for balances, the transaction log,
//! the sequence ledgers, reservations, reports and rules, plus the
//! transactional services that compose them: the trade executor, the audit
//! workflow, and the filing drivers. Multi-step operations take a caller
//! owned transaction so commits happen exactly once, at the outermost
//! level.

pub mod error;
pub mod pool;
pub mod repositories;
pub mod services;

pub use error::DatabaseError;
pub use pool::{create_pool, create_pool_from_url, DatabaseConfig, DatabasePool};
pub use services::config::CoreConfig;
pub use services::{AuditService, ExecutorService, FilingService, ServiceError};

/// Embedded schema migrations, applied with `MIGRATOR.run(&pool)`
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
