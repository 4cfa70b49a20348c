use crate::{
    Result,
    codec::value::ToValue,
    common::{
        self,
        condition::{KeyCondition, Predicates},
    },
};

use aws_sdk_dynamodb::types;
use std::collections;

/// Internal representation of write request parameters.
///
/// Holds the fully resolved expression strings and attribute mappings, ready
/// to be applied to an SDK builder. The maps stay `None` until something is
/// merged into them.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct WriteInput {
    pub(crate) condition_expression: Option<String>,
    pub(crate) expression_attribute_names: Option<collections::HashMap<String, String>>,
    pub(crate) expression_attribute_values:
        Option<collections::HashMap<String, types::AttributeValue>>,
    pub(crate) return_values_on_condition_check_failure:
        Option<types::ReturnValuesOnConditionCheckFailure>,
    pub(crate) table_name: String,
}

impl WriteInput {
    pub(crate) fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Default::default()
        }
    }

    /// Merge an expression operation into this write operation.
    pub(crate) fn merge_expression(&mut self, operation: common::ExpressionInput) -> String {
        operation.merge_into(
            &mut self.expression_attribute_names,
            &mut self.expression_attribute_values,
        )
    }

    /// AND a condition onto the condition expression.
    pub(crate) fn add_condition(&mut self, operation: common::ExpressionInput) {
        let existing = common::ExpressionInput {
            expression: self.condition_expression.take().unwrap_or_default(),
            ..Default::default()
        };
        let merged = common::ExpressionInput::merge(" AND ", vec![existing, operation]);
        self.condition_expression = Some(self.merge_expression(merged));
    }

    /// Resolve and AND a field predicate onto the condition expression.
    pub(crate) fn add_predicate<T: ToValue>(
        &mut self,
        predicates: &mut Predicates,
        key_condition: &KeyCondition<T>,
    ) -> Result<()> {
        let operation = predicates.expression(key_condition)?;
        self.add_condition(operation);
        Ok(())
    }
}

/// apply common write operation settings to a builder
#[macro_export]
macro_rules! apply_write_operation {
    ($builder:expr, $write_operation:expr) => {
        $builder
            .set_condition_expression($write_operation.condition_expression)
            .set_expression_attribute_names($write_operation.expression_attribute_names)
            .set_expression_attribute_values($write_operation.expression_attribute_values)
            .set_return_values_on_condition_check_failure(
                $write_operation.return_values_on_condition_check_failure,
            )
            .table_name($write_operation.table_name)
    };
}
