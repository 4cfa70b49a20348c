use crate::{
    Result,
    codec::{EncodingPolicy, encode::encode, metadata::RecordMetadata, value::ToValue},
    common,
};

use aws_sdk_dynamodb::types;
use std::collections;

/// Condition types for DynamoDB expressions.
///
/// ```rust
/// use dynamodb_transact::common::condition;
///
/// let eq = condition::Condition::Equals("value".to_string());
/// let gt = condition::Condition::GreaterThan(100);
/// let null: condition::Condition<String> = condition::Condition::Null;
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Condition<T> {
    /// Checks if an attribute value equals a specified value.
    Equals(T),
    /// Checks if an attribute value is greater than a specified value.
    GreaterThan(T),
    /// Checks if an attribute value is less than a specified value.
    LessThan(T),
    /// Checks if an attribute value does not equal a specified value.
    NotEqual(T),
    /// Checks if an attribute exists.
    NotNull,
    /// Checks if an attribute does not exist.
    Null,
}

impl<T: ToValue> Condition<T> {
    fn get_expression(
        &self,
        key: &str,
        key_placeholder: &str,
        index: &mut usize,
        policy: EncodingPolicy,
    ) -> Result<(String, collections::HashMap<String, types::AttributeValue>)> {
        let (operator, suffix, value) = match self {
            Self::Equals(value) => ("=", "eq", value),
            Self::GreaterThan(value) => (">", "gt", value),
            Self::LessThan(value) => ("<", "lt", value),
            Self::NotEqual(value) => ("<>", "ne", value),
            Self::NotNull => {
                let expression = format!("attribute_exists({key_placeholder})");
                return Ok((expression, collections::HashMap::new()));
            }
            Self::Null => {
                let expression = format!("attribute_not_exists({key_placeholder})");
                return Ok((expression, collections::HashMap::new()));
            }
        };
        let value = encode(&value.to_value(), policy)?;
        let value_placeholder = format!(":{key}_{suffix}{index}");
        *index += 1;
        let expression = format!("{key_placeholder} {operator} {value_placeholder}");
        let expression_attribute_values = collections::HashMap::from([(value_placeholder, value)]);
        Ok((expression, expression_attribute_values))
    }
}

/// Condition applied to a field.
///
/// ```rust
/// use dynamodb_transact::common::condition;
///
/// let condition = condition::KeyCondition {
///     name: "status".to_string(),
///     condition: condition::Condition::Equals("active".to_string()),
/// };
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct KeyCondition<T> {
    /// The condition to apply to the field.
    pub condition: Condition<T>,
    /// The logical name of the field to apply the condition to.
    pub name: String,
}

/// Placeholder allocation for the predicates of one request.
///
/// Every predicate gets fresh value placeholders, so predicates on the same
/// field never collide.
#[derive(Clone, Debug)]
pub(crate) struct Predicates {
    metadata: &'static RecordMetadata,
    policy: EncodingPolicy,
    index: usize,
}

impl Predicates {
    pub(crate) fn new(metadata: &'static RecordMetadata, policy: EncodingPolicy) -> Self {
        Self {
            metadata,
            policy,
            index: 0,
        }
    }

    pub(crate) fn expression<T: ToValue>(
        &mut self,
        key_condition: &KeyCondition<T>,
    ) -> Result<common::ExpressionInput> {
        let attribute_name = self.metadata.attribute_name(&key_condition.name)?;
        let placeholder = format!("#{attribute_name}");
        let (expression, expression_attribute_values) = key_condition.condition.get_expression(
            attribute_name,
            &placeholder,
            &mut self.index,
            self.policy,
        )?;
        let expression_attribute_names =
            collections::HashMap::from([(placeholder, attribute_name.to_string())]);
        Ok(common::ExpressionInput {
            expression,
            expression_attribute_names,
            expression_attribute_values,
        })
    }
}
