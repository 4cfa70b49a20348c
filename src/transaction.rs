//! Transaction orchestration.
//!
//! This module turns accumulated requests into a single `TransactWriteItems`
//! call:
//! - The client seam performing the remote call
//! - The manager slotting requests and submitting them
//! - The unit-of-work batch with its lifecycle

/// Unit-of-work batch accumulating requests until commit.
pub mod batch;

/// The remote endpoint applying a transaction.
pub mod client;

/// Settings of a batch.
pub mod config;

/// Slotting of requests and atomic submission.
pub mod manager;
