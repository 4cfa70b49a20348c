use aws_sdk_dynamodb::{error, operation::transact_write_items::TransactWriteItemsError, types};

/// Errors raised while building or submitting a transaction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required argument (key value, record, field) was absent.
    #[error("missing required value: {0}")]
    MissingValue(String),

    /// A field name does not exist in the record metadata.
    #[error("field `{field}` not found on record stored in table `{table}`")]
    UnknownField {
        /// The table the record is stored in.
        table: String,
        /// The field that could not be resolved.
        field: String,
    },

    /// The record metadata does not declare a hash key.
    #[error("failed to find hash key attribute on record stored in table `{0}`")]
    MissingHashKey(String),

    /// The value shape cannot be encoded under the selected policy.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// The version attribute is neither absent nor a non-negative integer.
    #[error("invalid version value `{0}`")]
    InvalidVersion(String),

    /// An SDK builder rejected a request.
    #[error(transparent)]
    Build(#[from] error::BuildError),

    /// A request kind does not match the operation it produced.
    #[error("unsupported transaction request type: {0}")]
    UnsupportedRequest(String),

    /// The batch was poisoned by an earlier failure and accepts no more requests.
    #[error("transaction batch is poisoned by an earlier failure")]
    BatchPoisoned,

    /// One or more conditions failed and the whole batch was cancelled.
    #[error("transaction cancelled: {}", format_reasons(.reasons))]
    TransactionCanceled {
        /// Per-item cancellation reasons, in submission order.
        reasons: Vec<types::CancellationReason>,
    },

    /// Submission was cancelled before the remote call completed.
    #[error("transaction submission cancelled")]
    Cancelled,

    /// Transport or service failure, propagated unchanged.
    #[error(transparent)]
    Sdk(#[from] Box<error::SdkError<TransactWriteItemsError>>),

    /// An item could not be decoded.
    #[error(transparent)]
    Decode(#[from] serde_dynamo::Error),
}

fn format_reasons(reasons: &[types::CancellationReason]) -> String {
    let codes: Vec<_> = reasons
        .iter()
        .map(|reason| reason.code().unwrap_or("None"))
        .collect();
    format!("[{}]", codes.join(", "))
}

impl From<error::SdkError<TransactWriteItemsError>> for Error {
    fn from(err: error::SdkError<TransactWriteItemsError>) -> Self {
        if let Some(TransactWriteItemsError::TransactionCanceledException(canceled)) =
            err.as_service_error()
        {
            return Self::TransactionCanceled {
                reasons: canceled.cancellation_reasons().to_vec(),
            };
        }
        Self::Sdk(Box::new(err))
    }
}

/// Result type alias for transaction operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
