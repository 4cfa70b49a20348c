use crate::codec::EncodingPolicy;

/// What committing a batch with no requests does.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum EmptyBatchPolicy {
    /// Submit the empty transaction and surface whatever the service answers.
    #[default]
    Submit,
    /// Skip the remote call.
    Skip,
}

/// Settings of a [`Transactor`](super::batch::Transactor).
///
/// ```rust
/// use dynamodb_transact::{
///     codec::EncodingPolicy,
///     transaction::config::{EmptyBatchPolicy, TransactorConfig},
/// };
///
/// let config = TransactorConfig {
///     encoding: EncodingPolicy::Legacy,
///     empty_batch: EmptyBatchPolicy::Skip,
///     ..Default::default()
/// };
/// assert_eq!(config.client_request_token, None);
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TransactorConfig {
    /// Encoding scheme for every value in the batch.
    pub encoding: EncodingPolicy,
    /// Behaviour on committing an empty batch.
    pub empty_batch: EmptyBatchPolicy,
    /// Idempotency token forwarded with the submission.
    pub client_request_token: Option<String>,
}
