//! Workflows that span more than one table and must run as a single transaction.

pub mod lending;

pub use lending::LendingService;
