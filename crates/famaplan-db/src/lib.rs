//! PostgreSQL persistence for famaplan: connection config, pool and
//! migrations, plan section models, and query functions.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
