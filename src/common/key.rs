use crate::{
    Error, Result,
    codec::{
        EncodingPolicy,
        encode::encode,
        metadata::{Record, RecordMetadata},
        value::{ToValue, Value},
    },
};

use aws_sdk_dynamodb::types;
use std::collections;

/// Key component, addressed by logical field name.
///
/// ```rust
/// use dynamodb_transact::common::key;
///
/// let key = key::Key {
///     name: "id".to_string(),
///     value: "1".to_string(),
/// };
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Key<T> {
    /// The logical field name of the key.
    pub name: String,
    /// The value of the key.
    pub value: T,
}

/// Primary key (partition key and optional sort key).
///
/// ```rust
/// use dynamodb_transact::common::key;
///
/// let keys = key::Keys {
///     partition_key: key::Key {
///         name: "id".to_string(),
///         value: "1".to_string(),
///     },
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Keys<T> {
    /// The partition key (required).
    pub partition_key: Key<T>,
    /// The sort key (optional, only for tables with composite primary keys).
    pub sort_key: Option<Key<T>>,
}

impl<T> Keys<T> {
    /// Primary key made of a single partition key.
    pub fn partition(name: impl Into<String>, value: T) -> Self {
        Self {
            partition_key: Key {
                name: name.into(),
                value,
            },
            sort_key: None,
        }
    }
}

impl<T: ToValue> Keys<T> {
    /// Resolve field names to attribute names and encode the values.
    pub fn resolve<R: Record>(
        &self,
        policy: EncodingPolicy,
    ) -> Result<collections::HashMap<String, types::AttributeValue>> {
        let metadata = R::metadata();
        let (name, value) = encode_key(
            metadata,
            &self.partition_key.name,
            self.partition_key.value.to_value(),
            policy,
        )?;
        let mut keys = collections::HashMap::from([(name, value)]);
        if let Some(sort_key) = &self.sort_key {
            let (name, value) =
                encode_key(metadata, &sort_key.name, sort_key.value.to_value(), policy)?;
            keys.insert(name, value);
        }
        Ok(keys)
    }
}

fn encode_key(
    metadata: &RecordMetadata,
    field: &str,
    value: Value,
    policy: EncodingPolicy,
) -> Result<(String, types::AttributeValue)> {
    let attribute_name = metadata.attribute_name(field)?;
    if value.is_null() {
        return Err(Error::MissingValue(format!("key `{field}`")));
    }
    Ok((attribute_name.to_string(), encode(&value, policy)?))
}

/// Key map addressing an item by its hash key value alone.
pub fn hash_key<R: Record>(
    value: &impl ToValue,
    policy: EncodingPolicy,
) -> Result<collections::HashMap<String, types::AttributeValue>> {
    let metadata = R::metadata();
    let field = &metadata.hash_key()?.name;
    let (name, value) = encode_key(metadata, field, value.to_value(), policy)?;
    Ok(collections::HashMap::from([(name, value)]))
}

/// Key map taken from the key fields of a record.
pub fn record_key<R: Record>(
    record: &R,
    policy: EncodingPolicy,
) -> Result<collections::HashMap<String, types::AttributeValue>> {
    let metadata = R::metadata();
    let mut keys = collections::HashMap::new();
    let hash_key = metadata.hash_key()?;
    for field in std::iter::once(hash_key).chain(metadata.range_key()) {
        let value = record.field(&field.name).unwrap_or(Value::Null);
        let (name, value) = encode_key(metadata, &field.name, value, policy)?;
        keys.insert(name, value);
    }
    Ok(keys)
}
