use crate::{
    Error, Result,
    codec::{EncodingPolicy, metadata::Record, value::ToValue},
    common::{
        condition::{Condition, KeyCondition, Predicates},
        key::{self, Keys},
    },
    write::{
        common::WriteInput,
        operation::{Operation, RequestKind, TransactionRequest},
    },
};

use aws_sdk_dynamodb::types;
use std::collections;

/// Assertion on an item that takes part in the transaction without being written.
///
/// Predicates accumulate and are joined with `AND`; at least one is required
/// before the request can be submitted.
///
/// ```rust
/// use dynamodb_transact::{
///     codec::{
///         EncodingPolicy,
///         metadata::{Record, RecordMetadata},
///         value::Value,
///     },
///     write::condition_check::ConditionCheckRequest,
/// };
/// use std::sync::LazyLock;
///
/// struct Account;
///
/// static ACCOUNT: LazyLock<RecordMetadata> = LazyLock::new(|| {
///     RecordMetadata::builder("accounts")
///         .hash_key("id")
///         .field("balance")
///         .version("version")
///         .build()
/// });
///
/// impl Record for Account {
///     fn metadata() -> &'static RecordMetadata {
///         &ACCOUNT
///     }
///
///     fn field(&self, _: &str) -> Option<Value> {
///         None
///     }
/// }
///
/// let check = ConditionCheckRequest::with_hash_key::<Account, _>(&"a1", EncodingPolicy::Current)
///     .and_then(|check| check.greater_than("balance", 100))
///     .and_then(|check| check.version_equals("version", Some(3)))
///     .unwrap();
/// ```
#[derive(Clone, Debug)]
pub struct ConditionCheckRequest {
    key: collections::HashMap<String, types::AttributeValue>,
    write_operation: WriteInput,
    predicates: Predicates,
}

impl ConditionCheckRequest {
    /// Check the item addressed by an explicit key.
    pub fn with_key<R: Record, K: ToValue>(keys: &Keys<K>, policy: EncodingPolicy) -> Result<Self> {
        Ok(Self::new::<R>(keys.resolve::<R>(policy)?, policy))
    }

    /// Check the item addressed by its hash key value.
    pub fn with_hash_key<R: Record, K: ToValue>(
        hash_key: &K,
        policy: EncodingPolicy,
    ) -> Result<Self> {
        Ok(Self::new::<R>(key::hash_key::<R>(hash_key, policy)?, policy))
    }

    /// Check the item a record is stored as.
    pub fn from_record<R: Record>(record: &R, policy: EncodingPolicy) -> Result<Self> {
        Ok(Self::new::<R>(key::record_key(record, policy)?, policy))
    }

    fn new<R: Record>(
        key: collections::HashMap<String, types::AttributeValue>,
        policy: EncodingPolicy,
    ) -> Self {
        let metadata = R::metadata();
        Self {
            key,
            write_operation: WriteInput::new(metadata.table_name()),
            predicates: Predicates::new(metadata, policy),
        }
    }

    /// AND a condition onto the request.
    pub fn with_condition<T: ToValue>(mut self, key_condition: KeyCondition<T>) -> Result<Self> {
        self.write_operation
            .add_predicate(&mut self.predicates, &key_condition)?;
        Ok(self)
    }

    fn predicate<T: ToValue>(self, field: &str, condition: Condition<T>) -> Result<Self> {
        self.with_condition(KeyCondition {
            condition,
            name: field.to_string(),
        })
    }

    /// Require the field to equal `value`.
    pub fn equals<T: ToValue>(self, field: &str, value: T) -> Result<Self> {
        self.predicate(field, Condition::Equals(value))
    }

    /// Require the field to differ from `value`.
    pub fn not_equals<T: ToValue>(self, field: &str, value: T) -> Result<Self> {
        self.predicate(field, Condition::NotEqual(value))
    }

    /// Require the field to be greater than `value`.
    pub fn greater_than<T: ToValue>(self, field: &str, value: T) -> Result<Self> {
        self.predicate(field, Condition::GreaterThan(value))
    }

    /// Require the field to be less than `value`.
    pub fn less_than<T: ToValue>(self, field: &str, value: T) -> Result<Self> {
        self.predicate(field, Condition::LessThan(value))
    }

    /// Require the version field to hold `expected`; `None` requires it to be absent.
    pub fn version_equals(self, field: &str, expected: Option<u64>) -> Result<Self> {
        match expected {
            Some(version) => self.predicate(field, Condition::Equals(version)),
            None => self.predicate(field, Condition::<u64>::Null),
        }
    }

    /// Which item attributes to return if the condition check fails.
    pub fn return_values_on_condition_check_failure(
        mut self,
        return_values: types::ReturnValuesOnConditionCheckFailure,
    ) -> Self {
        self.write_operation.return_values_on_condition_check_failure = Some(return_values);
        self
    }
}

impl TransactionRequest for ConditionCheckRequest {
    fn kind(&self) -> RequestKind {
        RequestKind::ConditionCheck
    }

    fn table_name(&self) -> &str {
        &self.write_operation.table_name
    }

    fn operation(&self) -> Result<Operation> {
        if self.write_operation.condition_expression.is_none() {
            return Err(Error::MissingValue("condition check predicate".to_string()));
        }
        let builder = types::ConditionCheck::builder().set_key(Some(self.key.clone()));
        let condition_check =
            crate::apply_write_operation!(builder, self.write_operation.clone()).build()?;
        Ok(Operation::ConditionCheck(condition_check))
    }
}
