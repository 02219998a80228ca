//! Outbound adapters implementing the driven ports.
//!
//! - **persistence**: PostgreSQL repositories built on Diesel.
//! - **security**: Argon2id password hashing.
//!
//! Adapters translate between domain types and infrastructure
//! representations. They contain no business logic.

pub mod persistence;
pub mod security;
