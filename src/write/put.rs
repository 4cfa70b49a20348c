use crate::{
    Error, Result,
    codec::{EncodingPolicy, encode::encode_record, metadata::Record},
    common,
    write::{
        common::WriteInput,
        operation::{Operation, RequestKind, TransactionRequest},
    },
};

use aws_sdk_dynamodb::types;
use std::collections;

const VERSION_PLACEHOLDER: &str = "#Version";
const EXPECTED_VERSION_PLACEHOLDER: &str = ":expectedVersion";

/// Create-or-replace request for a whole record.
///
/// When the record declares a version field, the write is guarded by
/// optimistic concurrency: a never-written record starts at version `0`,
/// otherwise the stored version must equal the current one and is bumped by
/// one.
///
/// ```rust
/// use dynamodb_transact::{
///     codec::{
///         EncodingPolicy,
///         metadata::{Record, RecordMetadata},
///         value::{ToValue, Value},
///     },
///     write::put::PutRequest,
/// };
/// use std::sync::LazyLock;
///
/// struct User {
///     id: String,
///     version: Option<u64>,
/// }
///
/// static USER: LazyLock<RecordMetadata> = LazyLock::new(|| {
///     RecordMetadata::builder("users").hash_key("id").version("version").build()
/// });
///
/// impl Record for User {
///     fn metadata() -> &'static RecordMetadata {
///         &USER
///     }
///
///     fn field(&self, name: &str) -> Option<Value> {
///         match name {
///             "id" => Some(self.id.to_value()),
///             "version" => Some(self.version.to_value()),
///             _ => None,
///         }
///     }
/// }
///
/// let user = User { id: "1".to_string(), version: Some(2) };
/// let put = PutRequest::new(&user, EncodingPolicy::Current).unwrap();
/// assert_eq!(put.expected_version(), Some(2));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PutRequest {
    item: collections::HashMap<String, types::AttributeValue>,
    expected_version: Option<u64>,
    write_operation: WriteInput,
}

impl PutRequest {
    /// Encode a record and apply its version semantics.
    pub fn new<R: Record>(record: &R, policy: EncodingPolicy) -> Result<Self> {
        let metadata = R::metadata();
        let hash_key = metadata.hash_key_name()?;
        let mut item = encode_record(record, policy)?;
        if !item.contains_key(hash_key) {
            return Err(Error::MissingValue(format!("hash key `{hash_key}`")));
        }
        let mut write_operation = WriteInput::new(metadata.table_name());
        let mut expected_version = None;
        if let Some(version) = metadata.version() {
            let current = match item.get(&version.attribute_name) {
                None | Some(types::AttributeValue::Null(_)) => None,
                Some(types::AttributeValue::N(number)) => Some(
                    number
                        .parse::<u64>()
                        .map_err(|_| Error::InvalidVersion(number.clone()))?,
                ),
                Some(other) => return Err(Error::InvalidVersion(format!("{other:?}"))),
            };
            let next = match current {
                None => 0,
                Some(current) => {
                    let next = current
                        .checked_add(1)
                        .ok_or_else(|| Error::InvalidVersion(current.to_string()))?;
                    write_operation.add_condition(common::ExpressionInput {
                        expression: format!(
                            "{VERSION_PLACEHOLDER} = {EXPECTED_VERSION_PLACEHOLDER}"
                        ),
                        expression_attribute_names: collections::HashMap::from([(
                            VERSION_PLACEHOLDER.to_string(),
                            version.attribute_name.clone(),
                        )]),
                        expression_attribute_values: collections::HashMap::from([(
                            EXPECTED_VERSION_PLACEHOLDER.to_string(),
                            types::AttributeValue::N(current.to_string()),
                        )]),
                    });
                    next
                }
            };
            item.insert(
                version.attribute_name.clone(),
                types::AttributeValue::N(next.to_string()),
            );
            expected_version = current;
        }
        Ok(Self {
            item,
            expected_version,
            write_operation,
        })
    }

    /// The item as it will be written, version already bumped.
    pub fn item(&self) -> &collections::HashMap<String, types::AttributeValue> {
        &self.item
    }

    /// The version the stored item must carry, `None` for a first write.
    pub fn expected_version(&self) -> Option<u64> {
        self.expected_version
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

impl TransactionRequest for PutRequest {
    fn kind(&self) -> RequestKind {
        RequestKind::Put
    }

    fn table_name(&self) -> &str {
        &self.write_operation.table_name
    }

    fn operation(&self) -> Result<Operation> {
        let builder = types::Put::builder().set_item(Some(self.item.clone()));
        let put = crate::apply_write_operation!(builder, self.write_operation.clone()).build()?;
        Ok(Operation::Put(put))
    }
}
