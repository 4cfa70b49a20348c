use crate::{
    Error, Result,
    codec::{EncodingPolicy, metadata::Record, value::ToValue},
    common::{
        condition::{KeyCondition, Predicates},
        key::{self, Keys},
    },
    write::{
        common::WriteInput,
        operation::{Operation, RequestKind, TransactionRequest},
    },
};

use aws_sdk_dynamodb::types;
use std::collections;

/// Item removal, optionally guarded by conditions.
#[derive(Clone, Debug)]
pub struct DeleteRequest {
    key: collections::HashMap<String, types::AttributeValue>,
    write_operation: WriteInput,
    predicates: Predicates,
}

impl DeleteRequest {
    /// Delete the item addressed by an explicit key.
    pub fn with_key<R: Record, K: ToValue>(keys: &Keys<K>, policy: EncodingPolicy) -> Result<Self> {
        Self::with_raw_key::<R>(keys.resolve::<R>(policy)?, policy)
    }

    /// Delete the item addressed by its hash key value.
    pub fn with_hash_key<R: Record, K: ToValue>(
        hash_key: &K,
        policy: EncodingPolicy,
    ) -> Result<Self> {
        Self::with_raw_key::<R>(key::hash_key::<R>(hash_key, policy)?, policy)
    }

    /// Delete the item a record is stored as.
    pub fn from_record<R: Record>(record: &R, policy: EncodingPolicy) -> Result<Self> {
        Self::with_raw_key::<R>(key::record_key(record, policy)?, policy)
    }

    /// Delete the item addressed by a fully encoded key.
    pub fn with_raw_key<R: Record>(
        key: collections::HashMap<String, types::AttributeValue>,
        policy: EncodingPolicy,
    ) -> Result<Self> {
        if key.is_empty() {
            return Err(Error::MissingValue("key".to_string()));
        }
        let metadata = R::metadata();
        Ok(Self {
            key,
            write_operation: WriteInput::new(metadata.table_name()),
            predicates: Predicates::new(metadata, policy),
        })
    }

    /// AND a condition onto the request.
    pub fn with_condition<T: ToValue>(mut self, key_condition: KeyCondition<T>) -> Result<Self> {
        self.write_operation
            .add_predicate(&mut self.predicates, &key_condition)?;
        Ok(self)
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

impl TransactionRequest for DeleteRequest {
    fn kind(&self) -> RequestKind {
        RequestKind::Delete
    }

    fn table_name(&self) -> &str {
        &self.write_operation.table_name
    }

    fn operation(&self) -> Result<Operation> {
        let builder = types::Delete::builder().set_key(Some(self.key.clone()));
        let delete = crate::apply_write_operation!(builder, self.write_operation.clone()).build()?;
        Ok(Operation::Delete(delete))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        codec::{metadata::RecordMetadata, value::Value},
        common::condition::Condition,
    };

    use std::sync::LazyLock;

    struct Session {
        token: String,
    }

    static SESSION: LazyLock<RecordMetadata> = LazyLock::new(|| {
        RecordMetadata::builder("sessions")
            .hash_key_as("token", "Token")
            .field("expired")
            .build()
    });

    impl Record for Session {
        fn metadata() -> &'static RecordMetadata {
            &SESSION
        }

        fn field(&self, name: &str) -> Option<Value> {
            match name {
                "token" => Some(self.token.to_value()),
                _ => None,
            }
        }
    }

    fn expected_key() -> collections::HashMap<String, types::AttributeValue> {
        collections::HashMap::from([(
            "Token".to_string(),
            types::AttributeValue::S("t1".to_string()),
        )])
    }

    #[test]
    fn test_addressing_styles_agree() {
        let policy = EncodingPolicy::Current;
        let expected = Operation::Delete(
            types::Delete::builder()
                .set_key(Some(expected_key()))
                .table_name("sessions")
                .build()
                .unwrap(),
        );
        let requests = [
            DeleteRequest::with_key::<Session, _>(&Keys::partition("token", "t1"), policy),
            DeleteRequest::with_hash_key::<Session, _>(&"t1", policy),
            DeleteRequest::from_record(
                &Session {
                    token: "t1".to_string(),
                },
                policy,
            ),
            DeleteRequest::with_raw_key::<Session>(expected_key(), policy),
        ];
        for request in requests {
            assert_eq!(request.unwrap().operation().unwrap(), expected);
        }
    }

    #[test]
    fn test_conditional_delete() {
        let request = DeleteRequest::with_hash_key::<Session, _>(&"t1", EncodingPolicy::Legacy)
            .unwrap()
            .with_condition(KeyCondition {
                name: "expired".to_string(),
                condition: Condition::Equals(true),
            })
            .unwrap();
        let expected = types::Delete::builder()
            .set_key(Some(expected_key()))
            .condition_expression("#expired = :expired_eq0")
            .expression_attribute_names("#expired", "expired")
            .expression_attribute_values(":expired_eq0", types::AttributeValue::N("1".to_string()))
            .table_name("sessions")
            .build()
            .unwrap();
        assert_eq!(request.operation().unwrap(), Operation::Delete(expected));
    }

    #[test]
    fn test_empty_raw_key() {
        let result = DeleteRequest::with_raw_key::<Session>(
            collections::HashMap::new(),
            EncodingPolicy::Current,
        );
        assert!(matches!(result, Err(Error::MissingValue(_))));
    }
}
