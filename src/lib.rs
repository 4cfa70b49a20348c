#![deny(missing_docs)]

//! # DynamoDB Transact
//!
//! Typed, all-or-nothing multi-item writes for Amazon DynamoDB, built on
//! `TransactWriteItems`.
//!
//! ## Overview
//!
//! This library turns in-memory records into a single atomic transaction:
//! - Records declare their table, key, attribute names and version counter once
//! - Values are encoded under one of two encoding policies (legacy or current)
//! - Puts are compare-and-swap on the version counter when one is declared
//! - Patches, deletes and condition checks are built without expression strings
//! - A unit-of-work batch submits everything exactly once, or nothing at all
//!
//! ## Quick Example
//!
//! ```no_run
//! use aws_sdk_dynamodb::Client;
//! use dynamodb_transact::{
//!     codec::{
//!         metadata::{Record, RecordMetadata},
//!         value::{ToValue, Value},
//!     },
//!     transaction::{batch::Transactor, config::TransactorConfig},
//!     write::patch::Property,
//! };
//! use std::sync::LazyLock;
//! use tokio_util::sync::CancellationToken;
//!
//! struct Order {
//!     id: String,
//!     total: f64,
//!     version: Option<u64>,
//! }
//!
//! static ORDER: LazyLock<RecordMetadata> = LazyLock::new(|| {
//!     RecordMetadata::builder("orders")
//!         .hash_key_as("id", "OrderId")
//!         .field("total")
//!         .version("version")
//!         .build()
//! });
//!
//! impl Record for Order {
//!     fn metadata() -> &'static RecordMetadata {
//!         &ORDER
//!     }
//!
//!     fn field(&self, name: &str) -> Option<Value> {
//!         match name {
//!             "id" => Some(self.id.to_value()),
//!             "total" => Some(self.total.to_value()),
//!             "version" => Some(self.version.to_value()),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! # async fn example(client: Client, order: Order) -> dynamodb_transact::Result<()> {
//! let cancellation = CancellationToken::new();
//! let mut batch = Transactor::new(client, TransactorConfig::default());
//! // put guarded by "#Version = :expectedVersion"
//! batch.create_or_update(&order)?;
//! // "SET #Property = :newValue" on another order
//! batch.patch_by_hash_key::<Order, _, _>(
//!     &"o-2",
//!     &Property {
//!         name: "total".to_string(),
//!         value: 0.0,
//!     },
//! )?;
//! batch.condition_version_equals::<Order, _>(&"o-3", "version", Some(7))?;
//! batch.commit(&cancellation).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`mod@codec`] - Value model, record metadata, encoding and decoding
//! - [`mod@common`] - Shared utilities for keys and conditions
//! - [`mod@write`] - Request builders (Put, Update, Patch, Delete, ConditionCheck)
//! - [`mod@transaction`] - Orchestration and the unit-of-work batch

/// Value model, record metadata, encoding and decoding.
pub mod codec;

/// Common utilities for keys and conditions.
pub mod common;

/// Crate error type.
pub mod error;

/// Transaction orchestration and the unit-of-work batch.
///
/// This module provides:
/// - The remote client seam
/// - Slotting of requests into transact items
/// - Batches with poisoning and exactly-once commit
pub mod transaction;

/// Request builders for transactional writes.
///
/// This module provides builders for:
/// - Putting whole records under optimistic versioning
/// - Patching a single field, or updating with an explicit expression
/// - Deleting items
/// - Checking conditions on items
pub mod write;

pub use error::{Error, Result};
