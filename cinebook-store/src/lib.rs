pub mod app_config;
pub mod database;
pub mod memory_ledger;
pub mod pg_ledger;
pub mod redis_repo;

pub use database::DbClient;
pub use memory_ledger::{InMemorySeatLedger, PriceTable};
pub use pg_ledger::PgSeatLedger;
pub use redis_repo::RedisClient;
