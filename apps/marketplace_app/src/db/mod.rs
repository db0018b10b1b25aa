// apps/marketplace_app/src/db/mod.rs

//! Postgres access: the `LedgerStore` adapter and catalog lookups.

pub mod catalog;
pub mod ledger_store;

pub use ledger_store::PgLedgerStore;
