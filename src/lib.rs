//! Room booking server speaking the PostgreSQL wire protocol. State is
//! kept in memory per tenant and rebuilt from an append-only WAL.

pub mod auth;
pub mod compactor;
pub mod engine;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod sql;
pub mod tenant;
pub mod tls;
pub mod wal;
pub mod wire;
