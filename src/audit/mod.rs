//! Audit ledger module
//!
//! Append-only record of every mutating action, written in the same
//! transaction as the mutation it documents.

pub mod ledger;
pub mod model;

pub use ledger::{append, AuditLedger, AuditPage};
pub use model::*;
