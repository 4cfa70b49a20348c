use crate::Result;

use aws_sdk_dynamodb::types;
use std::fmt;

/// Kind of a transaction request.
///
/// A patch is a narrowed update and is submitted in the update slot.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RequestKind {
    /// Whole-item create or replace.
    Put,
    /// Update with a caller-supplied update expression.
    Update,
    /// Single-attribute update.
    Patch,
    /// Item removal.
    Delete,
    /// Condition asserted on an item that is not written.
    ConditionCheck,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Put => "Put",
            Self::Update => "Update",
            Self::Patch => "Patch",
            Self::Delete => "Delete",
            Self::ConditionCheck => "ConditionCheck",
        };
        f.write_str(name)
    }
}

/// Exactly one wire-level transactional operation.
#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    /// Put operation.
    Put(types::Put),
    /// Update operation, also produced by patches.
    Update(types::Update),
    /// Delete operation.
    Delete(types::Delete),
    /// Condition check operation.
    ConditionCheck(types::ConditionCheck),
}

impl Operation {
    /// The kind of the slot this operation occupies.
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Put(_) => RequestKind::Put,
            Self::Update(_) => RequestKind::Update,
            Self::Delete(_) => RequestKind::Delete,
            Self::ConditionCheck(_) => RequestKind::ConditionCheck,
        }
    }
}

/// A request that can take part in a transaction.
///
/// Implemented by every request builder of this crate, and open to callers
/// that need to submit hand-built operations.
///
/// ```rust
/// use aws_sdk_dynamodb::types;
/// use dynamodb_transact::{
///     Result,
///     write::operation::{Operation, RequestKind, TransactionRequest},
/// };
///
/// #[derive(Debug)]
/// struct Touch;
///
/// impl TransactionRequest for Touch {
///     fn kind(&self) -> RequestKind {
///         RequestKind::Update
///     }
///
///     fn table_name(&self) -> &str {
///         "users"
///     }
///
///     fn operation(&self) -> Result<Operation> {
///         let update = types::Update::builder()
///             .key("id", types::AttributeValue::S("1".to_string()))
///             .update_expression("SET #t = :t")
///             .expression_attribute_names("#t", "touched")
///             .expression_attribute_values(":t", types::AttributeValue::Bool(true))
///             .table_name("users")
///             .build()?;
///         Ok(Operation::Update(update))
///     }
/// }
/// ```
pub trait TransactionRequest: fmt::Debug + Send + Sync {
    /// The kind of the request.
    fn kind(&self) -> RequestKind;

    /// The table the request targets.
    fn table_name(&self) -> &str;

    /// Build the wire-level operation.
    fn operation(&self) -> Result<Operation>;
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case::put(RequestKind::Put, "Put")]
    #[case::patch(RequestKind::Patch, "Patch")]
    #[case::condition_check(RequestKind::ConditionCheck, "ConditionCheck")]
    fn test_request_kind_display(#[case] kind: RequestKind, #[case] expected: &str) {
        assert_eq!(kind.to_string(), expected);
    }

    #[test]
    fn test_operation_kind() {
        let delete = types::Delete::builder()
            .key("id", types::AttributeValue::S("1".to_string()))
            .table_name("t")
            .build()
            .unwrap();
        assert_eq!(Operation::Delete(delete).kind(), RequestKind::Delete);
    }
}
