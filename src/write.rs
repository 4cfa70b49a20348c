//! Request builders for transactional writes.
//!
//! This module provides one builder per request kind:
//! - Putting whole records under optimistic versioning
//! - Patching a single field, or updating with an explicit expression
//! - Deleting items, optionally under conditions
//! - Checking conditions on items that are not written

/// Common utilities shared by the request builders.
pub mod common;

/// Condition check request asserting predicates on an item.
pub mod condition_check;

/// Delete request for removing items from tables.
pub mod delete;

/// The operation union and the request trait.
pub mod operation;

/// Patch request setting a single field.
pub mod patch;

/// Put request for creating or replacing records.
pub mod put;

/// Update request with a structured or raw update expression.
pub mod update;
