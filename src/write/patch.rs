use crate::{
    Error, Result,
    codec::{
        EncodingPolicy,
        encode::encode,
        metadata::Record,
        value::{ToValue, Value},
    },
    common::{
        self,
        key::{self, Keys},
    },
    write::{
        common::WriteInput,
        operation::{Operation, RequestKind, TransactionRequest},
    },
};

use aws_sdk_dynamodb::types;
use std::collections;

const PROPERTY_PLACEHOLDER: &str = "#Property";
const NEW_VALUE_PLACEHOLDER: &str = ":newValue";

/// A field and the value it should be set to.
///
/// ```rust
/// use dynamodb_transact::write::patch;
///
/// let property = patch::Property {
///     name: "status".to_string(),
///     value: "archived".to_string(),
/// };
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Property<T> {
    /// The logical field name.
    pub name: String,
    /// The new value.
    pub value: T,
}

/// Single-attribute update.
///
/// Always produces `SET #Property = :newValue`, with `#Property` bound to the
/// attribute name of the patched field.
#[derive(Clone, Debug, PartialEq)]
pub struct PatchRequest {
    key: collections::HashMap<String, types::AttributeValue>,
    update_expression: String,
    write_operation: WriteInput,
}

impl PatchRequest {
    /// Patch the item addressed by an explicit key.
    pub fn with_key<R: Record, K: ToValue, T: ToValue>(
        keys: &Keys<K>,
        property: &Property<T>,
        policy: EncodingPolicy,
    ) -> Result<Self> {
        let key = keys.resolve::<R>(policy)?;
        Self::build::<R>(key, &property.name, property.value.to_value(), policy)
    }

    /// Patch the item addressed by its hash key value.
    pub fn with_hash_key<R: Record, K: ToValue, T: ToValue>(
        hash_key: &K,
        property: &Property<T>,
        policy: EncodingPolicy,
    ) -> Result<Self> {
        let key = key::hash_key::<R>(hash_key, policy)?;
        Self::build::<R>(key, &property.name, property.value.to_value(), policy)
    }

    /// Patch one field of a record with its current value.
    ///
    /// Fails when the field currently holds no value.
    pub fn from_record<R: Record>(record: &R, field: &str, policy: EncodingPolicy) -> Result<Self> {
        let key = key::record_key(record, policy)?;
        let value = match record.field(field) {
            Some(value) if !value.is_null() => value,
            _ => return Err(Error::MissingValue(format!("field `{field}`"))),
        };
        Self::build::<R>(key, field, value, policy)
    }

    fn build<R: Record>(
        key: collections::HashMap<String, types::AttributeValue>,
        field: &str,
        value: Value,
        policy: EncodingPolicy,
    ) -> Result<Self> {
        let metadata = R::metadata();
        let attribute_name = metadata.attribute_name(field)?;
        let mut write_operation = WriteInput::new(metadata.table_name());
        let update_expression = write_operation.merge_expression(common::ExpressionInput {
            expression: format!("SET {PROPERTY_PLACEHOLDER} = {NEW_VALUE_PLACEHOLDER}"),
            expression_attribute_names: collections::HashMap::from([(
                PROPERTY_PLACEHOLDER.to_string(),
                attribute_name.to_string(),
            )]),
            expression_attribute_values: collections::HashMap::from([(
                NEW_VALUE_PLACEHOLDER.to_string(),
                encode(&value, policy)?,
            )]),
        });
        Ok(Self {
            key,
            update_expression,
            write_operation,
        })
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

impl TransactionRequest for PatchRequest {
    fn kind(&self) -> RequestKind {
        RequestKind::Patch
    }

    fn table_name(&self) -> &str {
        &self.write_operation.table_name
    }

    fn operation(&self) -> Result<Operation> {
        let builder = types::Update::builder()
            .set_key(Some(self.key.clone()))
            .update_expression(self.update_expression.clone());
        let update = crate::apply_write_operation!(builder, self.write_operation.clone()).build()?;
        Ok(Operation::Update(update))
    }
}
