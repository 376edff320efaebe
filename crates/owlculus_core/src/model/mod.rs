//! Domain model for cases and clients.
//!
//! # Responsibility
//! - Define the records persisted in `cases.db` and `clients.db`.
//! - Own value-level validation (case numbers, folder names, client names).
//!
//! # Invariants
//! - `Case::case_number` and `Client::name` are unique in their stores.
//! - A case's folder lives directly under the configured base path.

pub mod case;
pub mod client;
