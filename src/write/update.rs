use crate::{
    Error, Result,
    codec::{
        EncodingPolicy,
        encode::encode,
        metadata::{Record, RecordMetadata},
        value::ToValue,
    },
    common::{
        self,
        condition::{KeyCondition, Predicates},
    },
    write::{
        common::WriteInput,
        operation::{Operation, RequestKind, TransactionRequest},
    },
};

use aws_sdk_dynamodb::types;
use indexmap::IndexMap;
use std::collections;

/// SET action for a single field.
///
/// ```rust
/// use dynamodb_transact::write::update;
///
/// let assign = update::SetInput::Assign("value".to_string());
/// let increment = update::SetInput::Increment(10);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum SetInput<T> {
    /// Assign a new value to the attribute (replaces existing value).
    Assign(T),
    /// Increment a numeric attribute by the specified value.
    Increment(T),
    /// Decrement a numeric attribute by the specified value.
    Decrement(T),
    /// Append values to the end of a list attribute.
    ListAppend(T),
    /// Prepend values to the beginning of a list attribute.
    ListPrepend(T),
    /// Assign a value only if the attribute doesn't exist.
    IfNotExists(T),
}

impl<T> SetInput<T> {
    fn get_set_expression(&self, path: &str, value_placeholder: &str) -> (&T, String) {
        match self {
            Self::Assign(value) => (value, format!("{path} = {value_placeholder}")),
            Self::Increment(value) => (value, format!("{path} = {path} + {value_placeholder}")),
            Self::Decrement(value) => (value, format!("{path} = {path} - {value_placeholder}")),
            Self::ListAppend(value) => (
                value,
                format!("{path} = list_append({path}, {value_placeholder})"),
            ),
            Self::ListPrepend(value) => (
                value,
                format!("{path} = list_append({value_placeholder}, {path})"),
            ),
            Self::IfNotExists(value) => (
                value,
                format!("{path} = if_not_exists({path}, {value_placeholder})"),
            ),
        }
    }
}

/// Structured update expression over the fields of a record.
///
/// ```rust
/// use dynamodb_transact::write::update;
///
/// let expression = update::UpdateExpression::Combined(vec![
///     update::UpdateExpression::Set(vec![
///         ("name".to_string(), update::SetInput::Assign("New".to_string())),
///     ]),
///     update::UpdateExpression::Remove(vec!["nickname".to_string()]),
/// ]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum UpdateExpression<T> {
    /// ADD operations - add values to numbers or sets.
    Add(Vec<(String, T)>),
    /// DELETE operations - delete values from sets.
    Delete(Vec<(String, T)>),
    /// REMOVE operations - remove attributes from items.
    Remove(Vec<String>),
    /// SET operations - set or modify attribute values.
    Set(Vec<(String, SetInput<T>)>),
    /// Combined operations - multiple operation types in a single update expression.
    Combined(Vec<UpdateExpression<T>>),
}

fn name_placeholder(
    metadata: &RecordMetadata,
    field: &str,
    names: &mut collections::HashMap<String, String>,
) -> Result<String> {
    let attribute_name = metadata.attribute_name(field)?;
    let placeholder = format!("#{attribute_name}");
    names.insert(placeholder.clone(), attribute_name.to_string());
    Ok(placeholder)
}

impl<T: ToValue> UpdateExpression<T> {
    fn get_update_expression(
        &self,
        metadata: &RecordMetadata,
        policy: EncodingPolicy,
        index: &mut usize,
    ) -> Result<common::ExpressionInput> {
        let mut operation = common::ExpressionInput::default();
        let mut actions = IndexMap::new();
        self.collect_clauses(metadata, policy, index, &mut operation, &mut actions)?;
        operation.expression = actions
            .into_iter()
            .map(|(action, clauses)| format!("{action} {}", clauses.join(", ")))
            .collect::<Vec<_>>()
            .join(" ");
        Ok(operation)
    }

    /// Clauses of one action keyword are grouped under its first occurrence.
    fn collect_clauses(
        &self,
        metadata: &RecordMetadata,
        policy: EncodingPolicy,
        index: &mut usize,
        operation: &mut common::ExpressionInput,
        actions: &mut IndexMap<&'static str, Vec<String>>,
    ) -> Result<()> {
        match self {
            Self::Add(inputs) | Self::Delete(inputs) => {
                let action = if matches!(self, Self::Add(_)) {
                    "ADD"
                } else {
                    "DELETE"
                };
                for (field, value) in inputs {
                    let path = name_placeholder(
                        metadata,
                        field,
                        &mut operation.expression_attribute_names,
                    )?;
                    let value_placeholder = format!(":add_or_delete{index}");
                    *index += 1;
                    operation
                        .expression_attribute_values
                        .insert(value_placeholder.clone(), encode(&value.to_value(), policy)?);
                    actions
                        .entry(action)
                        .or_default()
                        .push(format!("{path} {value_placeholder}"));
                }
            }
            Self::Remove(fields) => {
                for field in fields {
                    let path = name_placeholder(
                        metadata,
                        field,
                        &mut operation.expression_attribute_names,
                    )?;
                    actions.entry("REMOVE").or_default().push(path);
                }
            }
            Self::Set(inputs) => {
                for (field, set_input) in inputs {
                    let path = name_placeholder(
                        metadata,
                        field,
                        &mut operation.expression_attribute_names,
                    )?;
                    let value_placeholder = format!(":set{index}");
                    *index += 1;
                    let (value, clause) = set_input.get_set_expression(&path, &value_placeholder);
                    operation
                        .expression_attribute_values
                        .insert(value_placeholder, encode(&value.to_value(), policy)?);
                    actions.entry("SET").or_default().push(clause);
                }
            }
            Self::Combined(expressions) => {
                for expression in expressions {
                    expression.collect_clauses(metadata, policy, index, operation, actions)?;
                }
            }
        }
        Ok(())
    }
}

/// Update request with a caller-supplied update expression.
///
/// The expression is either structured, with field names resolved through
/// the record metadata, or raw, with placeholders bound by the caller.
#[derive(Clone, Debug)]
pub struct UpdateRequest {
    key: collections::HashMap<String, types::AttributeValue>,
    update_expression: String,
    write_operation: WriteInput,
    predicates: Predicates,
}

impl UpdateRequest {
    /// Update the item addressed by `key` with a structured expression.
    pub fn new<R: Record, T: ToValue>(
        key: collections::HashMap<String, types::AttributeValue>,
        update_expression: &UpdateExpression<T>,
        policy: EncodingPolicy,
    ) -> Result<Self> {
        let metadata = R::metadata();
        let operation = update_expression.get_update_expression(metadata, policy, &mut 0)?;
        let mut request = Self::empty::<R>(key, policy)?;
        request.update_expression = request.write_operation.merge_expression(operation);
        request.ensure_expression()?;
        Ok(request)
    }

    /// Update the item addressed by `key` with a raw update expression.
    pub fn raw<R: Record>(
        key: collections::HashMap<String, types::AttributeValue>,
        update_expression: impl Into<String>,
        expression_attribute_names: collections::HashMap<String, String>,
        expression_attribute_values: collections::HashMap<String, types::AttributeValue>,
        policy: EncodingPolicy,
    ) -> Result<Self> {
        let mut request = Self::empty::<R>(key, policy)?;
        let operation = common::ExpressionInput {
            expression: update_expression.into(),
            expression_attribute_names,
            expression_attribute_values,
        };
        request.update_expression = request.write_operation.merge_expression(operation);
        request.ensure_expression()?;
        Ok(request)
    }

    fn empty<R: Record>(
        key: collections::HashMap<String, types::AttributeValue>,
        policy: EncodingPolicy,
    ) -> Result<Self> {
        if key.is_empty() {
            return Err(Error::MissingValue("key".to_string()));
        }
        let metadata = R::metadata();
        Ok(Self {
            key,
            update_expression: String::new(),
            write_operation: WriteInput::new(metadata.table_name()),
            predicates: Predicates::new(metadata, policy),
        })
    }

    fn ensure_expression(&self) -> Result<()> {
        if self.update_expression.trim().is_empty() {
            return Err(Error::MissingValue("update expression".to_string()));
        }
        Ok(())
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

    /// The update expression as it will be sent.
    pub fn update_expression(&self) -> &str {
        &self.update_expression
    }
}

impl TransactionRequest for UpdateRequest {
    fn kind(&self) -> RequestKind {
        RequestKind::Update
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
