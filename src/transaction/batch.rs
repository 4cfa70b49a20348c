use crate::{
    Error, Result,
    codec::{EncodingPolicy, metadata::Record, value::ToValue},
    common::key::Keys,
    transaction::{
        client::TransactWriteClient,
        config::{EmptyBatchPolicy, TransactorConfig},
        manager::{self, TransactionManager},
    },
    write::{
        condition_check::ConditionCheckRequest,
        delete::DeleteRequest,
        operation::TransactionRequest,
        patch::{PatchRequest, Property},
        put::PutRequest,
        update::{UpdateExpression, UpdateRequest},
    },
};

use aws_sdk_dynamodb::{operation::transact_write_items::TransactWriteItemsOutput, types};
use std::{collections, mem};
use tokio_util::sync::CancellationToken;

/// Lifecycle of a batch.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BatchState {
    /// Accepting requests.
    Open,
    /// A request failed to build; the batch will be discarded.
    Poisoned,
    /// Submission in flight.
    Committing,
    /// Submitted or discarded.
    Closed,
}

/// How a batch ended.
#[derive(Debug)]
pub enum CommitOutcome {
    /// The transaction was applied.
    Submitted(TransactWriteItemsOutput),
    /// The batch was empty and the policy skips empty batches.
    Skipped,
    /// The batch was poisoned and nothing was sent.
    Discarded,
}

/// Unit of work accumulating requests for one atomic submission.
///
/// Any failure while building a request poisons the batch: the failure is
/// returned to the caller, later appends are refused and the batch is
/// discarded on commit instead of being sent partially.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_transact::{
///     codec::{
///         metadata::{Record, RecordMetadata},
///         value::{ToValue, Value},
///     },
///     transaction::{batch::Transactor, config::TransactorConfig},
/// };
/// use std::sync::LazyLock;
/// use tokio_util::sync::CancellationToken;
///
/// struct Account {
///     id: String,
///     balance: i64,
///     version: Option<u64>,
/// }
///
/// static ACCOUNT: LazyLock<RecordMetadata> = LazyLock::new(|| {
///     RecordMetadata::builder("accounts")
///         .hash_key("id")
///         .field("balance")
///         .version("version")
///         .build()
/// });
///
/// impl Record for Account {
///     fn metadata() -> &'static RecordMetadata {
///         &ACCOUNT
///     }
///
///     fn field(&self, name: &str) -> Option<Value> {
///         match name {
///             "id" => Some(self.id.to_value()),
///             "balance" => Some(self.balance.to_value()),
///             "version" => Some(self.version.to_value()),
///             _ => None,
///         }
///     }
/// }
///
/// # async fn example(
/// #     client: Client,
/// #     from: Account,
/// #     to: Account,
/// # ) -> dynamodb_transact::Result<()> {
/// let cancellation = CancellationToken::new();
/// Transactor::scope(client, TransactorConfig::default(), &cancellation, async |batch| {
///     batch.create_or_update(&from)?;
///     batch.create_or_update(&to)?;
///     Ok(())
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub struct Transactor<C> {
    manager: TransactionManager<C>,
    config: TransactorConfig,
    requests: Vec<Box<dyn TransactionRequest>>,
    state: BatchState,
}

impl<C: TransactWriteClient> Transactor<C> {
    /// Open an empty batch.
    pub fn new(client: C, config: TransactorConfig) -> Self {
        Self {
            manager: TransactionManager::new(client),
            config,
            requests: Vec::new(),
            state: BatchState::Open,
        }
    }

    /// Run `body` against a fresh batch, then commit it.
    ///
    /// The batch is submitted exactly once when `body` succeeds and discarded
    /// when it fails, in which case the error of `body` is returned.
    pub async fn scope<T, F>(
        client: C,
        config: TransactorConfig,
        cancellation: &CancellationToken,
        body: F,
    ) -> Result<(T, CommitOutcome)>
    where
        F: AsyncFnOnce(&mut Self) -> Result<T>,
    {
        let mut transactor = Self::new(client, config);
        match body(&mut transactor).await {
            Ok(value) => {
                let outcome = transactor.commit(cancellation).await?;
                Ok((value, outcome))
            }
            Err(err) => {
                transactor.poison(&err);
                transactor.commit(cancellation).await?;
                Err(err)
            }
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Number of accumulated requests.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Whether no request has been accumulated.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Settings of the batch.
    pub fn config(&self) -> &TransactorConfig {
        &self.config
    }

    fn poison(&mut self, err: &Error) {
        if self.state == BatchState::Poisoned {
            return;
        }
        self.state = BatchState::Poisoned;
        #[cfg(feature = "tracing")]
        tracing::warn!(error = %err, pending = self.requests.len(), "transaction batch poisoned");
        #[cfg(not(feature = "tracing"))]
        let _ = err;
    }

    fn append<R, F>(&mut self, build: F) -> Result<()>
    where
        R: TransactionRequest + 'static,
        F: FnOnce(EncodingPolicy) -> Result<R>,
    {
        if self.state != BatchState::Open {
            return Err(Error::BatchPoisoned);
        }
        let built = build(self.config.encoding).and_then(|request| {
            manager::transact_item(&request)?;
            Ok(request)
        });
        match built {
            Ok(request) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    kind = %request.kind(),
                    table = request.table_name(),
                    "request appended"
                );
                self.requests.push(Box::new(request));
                Ok(())
            }
            Err(err) => {
                self.poison(&err);
                Err(err)
            }
        }
    }

    /// Append a whole-record put under optimistic versioning.
    pub fn create_or_update<R: Record>(&mut self, record: &R) -> Result<()> {
        self.append(|policy| PutRequest::new(record, policy))
    }

    /// Append a patch of one field of a record with its current value.
    pub fn patch<R: Record>(&mut self, record: &R, field: &str) -> Result<()> {
        self.append(|policy| PatchRequest::from_record(record, field, policy))
    }

    /// Append a patch of the item addressed by its hash key value.
    pub fn patch_by_hash_key<R: Record, K: ToValue, T: ToValue>(
        &mut self,
        hash_key: &K,
        property: &Property<T>,
    ) -> Result<()> {
        self.append(|policy| PatchRequest::with_hash_key::<R, K, T>(hash_key, property, policy))
    }

    /// Append a patch of the item addressed by an explicit key.
    pub fn patch_by_key<R: Record, K: ToValue, T: ToValue>(
        &mut self,
        keys: &Keys<K>,
        property: &Property<T>,
    ) -> Result<()> {
        self.append(|policy| PatchRequest::with_key::<R, K, T>(keys, property, policy))
    }

    /// Append an update with a structured update expression.
    pub fn update<R: Record, K: ToValue, T: ToValue>(
        &mut self,
        keys: &Keys<K>,
        update_expression: &UpdateExpression<T>,
    ) -> Result<()> {
        self.append(|policy| {
            UpdateRequest::new::<R, T>(keys.resolve::<R>(policy)?, update_expression, policy)
        })
    }

    /// Append the deletion of the item a record is stored as.
    pub fn delete<R: Record>(&mut self, record: &R) -> Result<()> {
        self.append(|policy| DeleteRequest::from_record(record, policy))
    }

    /// Append the deletion of the item addressed by its hash key value.
    pub fn delete_by_hash_key<R: Record, K: ToValue>(&mut self, hash_key: &K) -> Result<()> {
        self.append(|policy| DeleteRequest::with_hash_key::<R, K>(hash_key, policy))
    }

    /// Append the deletion of the item addressed by an explicit key.
    pub fn delete_by_key<R: Record, K: ToValue>(&mut self, keys: &Keys<K>) -> Result<()> {
        self.append(|policy| DeleteRequest::with_key::<R, K>(keys, policy))
    }

    /// Append the deletion of the item addressed by a fully encoded key.
    pub fn delete_by_raw_key<R: Record>(
        &mut self,
        key: collections::HashMap<String, types::AttributeValue>,
    ) -> Result<()> {
        self.append(|policy| DeleteRequest::with_raw_key::<R>(key, policy))
    }

    /// Append a check that a field equals `value`.
    pub fn condition_equals<R: Record, K: ToValue, T: ToValue>(
        &mut self,
        hash_key: &K,
        field: &str,
        value: T,
    ) -> Result<()> {
        self.append(|policy| {
            ConditionCheckRequest::with_hash_key::<R, K>(hash_key, policy)?.equals(field, value)
        })
    }

    /// Append a check that a field differs from `value`.
    pub fn condition_not_equals<R: Record, K: ToValue, T: ToValue>(
        &mut self,
        hash_key: &K,
        field: &str,
        value: T,
    ) -> Result<()> {
        self.append(|policy| {
            ConditionCheckRequest::with_hash_key::<R, K>(hash_key, policy)?.not_equals(field, value)
        })
    }

    /// Append a check that a field is greater than `value`.
    pub fn condition_greater_than<R: Record, K: ToValue, T: ToValue>(
        &mut self,
        hash_key: &K,
        field: &str,
        value: T,
    ) -> Result<()> {
        self.append(|policy| {
            ConditionCheckRequest::with_hash_key::<R, K>(hash_key, policy)?
                .greater_than(field, value)
        })
    }

    /// Append a check that a field is less than `value`.
    pub fn condition_less_than<R: Record, K: ToValue, T: ToValue>(
        &mut self,
        hash_key: &K,
        field: &str,
        value: T,
    ) -> Result<()> {
        self.append(|policy| {
            ConditionCheckRequest::with_hash_key::<R, K>(hash_key, policy)?.less_than(field, value)
        })
    }

    /// Append a check on the version field; `None` requires it to be absent.
    pub fn condition_version_equals<R: Record, K: ToValue>(
        &mut self,
        hash_key: &K,
        field: &str,
        expected: Option<u64>,
    ) -> Result<()> {
        self.append(|policy| {
            ConditionCheckRequest::with_hash_key::<R, K>(hash_key, policy)?
                .version_equals(field, expected)
        })
    }

    /// Append a prebuilt request.
    pub fn add_raw_request(&mut self, request: impl TransactionRequest + 'static) -> Result<()> {
        self.append(|_| Ok(request))
    }

    /// Submit the batch, or discard it when poisoned.
    ///
    /// Consumes the batch: it is committed at most once.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_transact.commit",
            skip_all,
            fields(requests = self.requests.len(), state = ?self.state),
            err
        )
    )]
    pub async fn commit(mut self, cancellation: &CancellationToken) -> Result<CommitOutcome> {
        if self.state == BatchState::Poisoned {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                discarded = self.requests.len(),
                "poisoned transaction batch discarded"
            );
            self.requests.clear();
            self.state = BatchState::Closed;
            return Ok(CommitOutcome::Discarded);
        }
        let requests = mem::take(&mut self.requests);
        if requests.is_empty() && self.config.empty_batch == EmptyBatchPolicy::Skip {
            self.state = BatchState::Closed;
            return Ok(CommitOutcome::Skipped);
        }
        self.state = BatchState::Committing;
        let result = self
            .manager
            .execute(
                &requests,
                self.config.client_request_token.clone(),
                cancellation,
            )
            .await;
        self.state = BatchState::Closed;
        result.map(CommitOutcome::Submitted)
    }
}

impl<C> Drop for Transactor<C> {
    fn drop(&mut self) {
        #[cfg(feature = "tracing")]
        {
            match self.state {
                BatchState::Open if !self.requests.is_empty() => tracing::warn!(
                    pending = self.requests.len(),
                    "transaction batch dropped without commit"
                ),
                BatchState::Committing => {
                    tracing::warn!("transaction batch dropped while committing")
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        codec::{metadata::RecordMetadata, value::Value},
        transaction::client::mock::RecordingClient,
        write::update::SetInput,
    };

    use rstest::rstest;
    use std::sync::{Arc, LazyLock};

    #[derive(Clone)]
    struct Account {
        id: Option<String>,
        balance: i64,
        frozen: bool,
        version: Option<u64>,
    }

    static ACCOUNT: LazyLock<RecordMetadata> = LazyLock::new(|| {
        RecordMetadata::builder("accounts")
            .hash_key_as("id", "AccountId")
            .field("balance")
            .field("frozen")
            .version("version")
            .build()
    });

    impl Record for Account {
        fn metadata() -> &'static RecordMetadata {
            &ACCOUNT
        }

        fn field(&self, name: &str) -> Option<Value> {
            match name {
                "id" => Some(self.id.to_value()),
                "balance" => Some(self.balance.to_value()),
                "frozen" => Some(self.frozen.to_value()),
                "version" => Some(self.version.to_value()),
                _ => None,
            }
        }
    }

    fn account(id: &str, version: Option<u64>) -> Account {
        Account {
            id: Some(id.to_string()),
            balance: 100,
            frozen: false,
            version,
        }
    }

    fn unkeyed() -> Account {
        Account {
            id: None,
            ..account("x", None)
        }
    }

    fn transactor(
        client: &Arc<RecordingClient>,
        config: TransactorConfig,
    ) -> Transactor<Arc<RecordingClient>> {
        Transactor::new(client.clone(), config)
    }

    #[tokio::test]
    async fn test_commit_submits_every_request_once_in_order() {
        let client = Arc::new(RecordingClient::default());
        let mut batch = transactor(&client, TransactorConfig::default());
        batch.create_or_update(&account("a1", Some(1))).unwrap();
        batch.patch(&account("a2", None), "balance").unwrap();
        batch
            .condition_greater_than::<Account, _, _>(&"a3", "balance", 10i64)
            .unwrap();
        batch.delete_by_hash_key::<Account, _>(&"a4").unwrap();
        assert_eq!(batch.len(), 4);
        assert_eq!(batch.state(), BatchState::Open);
        let outcome = batch.commit(&CancellationToken::new()).await.unwrap();
        assert!(matches!(outcome, CommitOutcome::Submitted(_)));
        let submissions = client.submissions();
        assert_eq!(submissions.len(), 1);
        let items = &submissions[0].items;
        assert_eq!(items.len(), 4);
        assert!(items[0].put().is_some());
        assert!(items[1].update().is_some());
        assert!(items[2].condition_check().is_some());
        assert!(items[3].delete().is_some());
        assert_eq!(
            items[0].put().and_then(|put| put.condition_expression()),
            Some("#Version = :expectedVersion")
        );
    }

    #[tokio::test]
    async fn test_failed_append_poisons_and_discards() {
        let client = Arc::new(RecordingClient::default());
        let mut batch = transactor(&client, TransactorConfig::default());
        batch.create_or_update(&account("a1", None)).unwrap();
        let result = batch.create_or_update(&unkeyed());
        assert!(matches!(result, Err(Error::MissingValue(_))));
        assert_eq!(batch.state(), BatchState::Poisoned);
        assert!(matches!(
            batch.delete_by_hash_key::<Account, _>(&"a1"),
            Err(Error::BatchPoisoned)
        ));
        assert_eq!(batch.len(), 1);
        let outcome = batch.commit(&CancellationToken::new()).await.unwrap();
        assert!(matches!(outcome, CommitOutcome::Discarded));
        assert!(client.submissions().is_empty());
    }

    #[rstest]
    #[case::unknown_field(|batch: &mut Transactor<Arc<RecordingClient>>| {
        batch.patch(&account("a1", None), "missing")
    })]
    #[case::absent_hash_key(|batch: &mut Transactor<Arc<RecordingClient>>| {
        batch.delete(&unkeyed())
    })]
    #[case::non_finite(|batch: &mut Transactor<Arc<RecordingClient>>| {
        batch.condition_less_than::<Account, _, _>(&"a1", "balance", f64::NAN)
    })]
    #[case::empty_raw_key(|batch: &mut Transactor<Arc<RecordingClient>>| {
        batch.delete_by_raw_key::<Account>(collections::HashMap::new())
    })]
    #[tokio::test]
    async fn test_any_build_failure_poisons(
        #[case] append: fn(&mut Transactor<Arc<RecordingClient>>) -> Result<()>,
    ) {
        let client = Arc::new(RecordingClient::default());
        let mut batch = transactor(&client, TransactorConfig::default());
        assert!(append(&mut batch).is_err());
        assert_eq!(batch.state(), BatchState::Poisoned);
        batch.commit(&CancellationToken::new()).await.unwrap();
        assert!(client.submissions().is_empty());
    }

    #[rstest]
    #[case::submit(EmptyBatchPolicy::Submit, 1)]
    #[case::skip(EmptyBatchPolicy::Skip, 0)]
    #[tokio::test]
    async fn test_empty_batch(#[case] empty_batch: EmptyBatchPolicy, #[case] calls: usize) {
        let client = Arc::new(RecordingClient::default());
        let config = TransactorConfig {
            empty_batch,
            ..Default::default()
        };
        let outcome = transactor(&client, config)
            .commit(&CancellationToken::new())
            .await
            .unwrap();
        let submissions = client.submissions();
        assert_eq!(submissions.len(), calls);
        assert!(submissions.iter().all(|submission| submission.items.is_empty()));
        match empty_batch {
            EmptyBatchPolicy::Submit => assert!(matches!(outcome, CommitOutcome::Submitted(_))),
            EmptyBatchPolicy::Skip => assert!(matches!(outcome, CommitOutcome::Skipped)),
        }
    }

    #[tokio::test]
    async fn test_config_flows_into_submission() {
        let client = Arc::new(RecordingClient::default());
        let config = TransactorConfig {
            encoding: EncodingPolicy::Legacy,
            client_request_token: Some("idempotent".to_string()),
            ..Default::default()
        };
        let mut batch = transactor(&client, config);
        batch.patch(&account("a1", None), "frozen").unwrap();
        batch.commit(&CancellationToken::new()).await.unwrap();
        let submissions = client.submissions();
        assert_eq!(
            submissions[0].client_request_token.as_deref(),
            Some("idempotent")
        );
        let update = submissions[0].items[0].update().unwrap();
        assert_eq!(
            update
                .expression_attribute_values()
                .and_then(|values| values.get(":newValue")),
            Some(&types::AttributeValue::N("0".to_string()))
        );
    }

    #[tokio::test]
    async fn test_commit_surfaces_transaction_cancellation() {
        let client = Arc::new(RecordingClient {
            cancellation_reasons: Some(vec![
                types::CancellationReason::builder().code("None").build(),
                types::CancellationReason::builder()
                    .code("ConditionalCheckFailed")
                    .build(),
            ]),
            ..Default::default()
        });
        let mut batch = transactor(&client, TransactorConfig::default());
        batch.create_or_update(&account("a1", None)).unwrap();
        batch
            .patch_by_hash_key::<Account, _, _>(
                &"missing",
                &Property {
                    name: "balance".to_string(),
                    value: 5i64,
                },
            )
            .unwrap();
        batch
            .condition_version_equals::<Account, _>(&"a2", "version", Some(2))
            .unwrap();
        let result = batch.commit(&CancellationToken::new()).await;
        assert!(
            matches!(result, Err(Error::TransactionCanceled { ref reasons }) if reasons.len() == 2)
        );
        let submissions = client.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].items.len(), 3);
        assert!(submissions[0].items[0].put().is_some());
        assert!(submissions[0].items[1].update().is_some());
    }

    #[tokio::test]
    async fn test_commit_cancelled() {
        let client = Arc::new(RecordingClient {
            hang: true,
            ..Default::default()
        });
        let mut batch = transactor(&client, TransactorConfig::default());
        batch.delete_by_hash_key::<Account, _>(&"a1").unwrap();
        let cancellation = CancellationToken::new();
        let trigger = cancellation.clone();
        tokio::spawn(async move { trigger.cancel() });
        let result = batch.commit(&cancellation).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_scope_commits_on_success() {
        let client = Arc::new(RecordingClient::default());
        let (value, outcome) = Transactor::scope(
            client.clone(),
            TransactorConfig::default(),
            &CancellationToken::new(),
            async |batch| {
                batch.create_or_update(&account("a1", None))?;
                batch.update::<Account, _, _>(
                    &Keys::partition("id", "a2"),
                    &UpdateExpression::Set(vec![(
                        "balance".to_string(),
                        SetInput::Decrement(5i64),
                    )]),
                )?;
                Ok(batch.len())
            },
        )
        .await
        .unwrap();
        assert_eq!(value, 2);
        assert!(matches!(outcome, CommitOutcome::Submitted(_)));
        assert_eq!(client.submissions().len(), 1);
    }

    #[tokio::test]
    async fn test_scope_discards_on_failure() {
        let client = Arc::new(RecordingClient::default());
        let result = Transactor::scope(
            client.clone(),
            TransactorConfig::default(),
            &CancellationToken::new(),
            async |batch| {
                batch.create_or_update(&account("a1", None))?;
                batch.create_or_update(&unkeyed())?;
                Ok(())
            },
        )
        .await;
        assert!(matches!(result, Err(Error::MissingValue(_))));
        assert!(client.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_add_raw_request() {
        let client = Arc::new(RecordingClient::default());
        let mut batch = transactor(&client, TransactorConfig::default());
        let request = DeleteRequest::with_hash_key::<Account, _>(&"a1", EncodingPolicy::Current)
            .unwrap();
        batch.add_raw_request(request).unwrap();
        batch.commit(&CancellationToken::new()).await.unwrap();
        assert!(client.submissions()[0].items[0].delete().is_some());
    }

    #[tokio::test]
    async fn test_unbuildable_raw_request_poisons_on_append() {
        let client = Arc::new(RecordingClient::default());
        let mut batch = transactor(&client, TransactorConfig::default());
        batch.create_or_update(&account("a1", None)).unwrap();
        let request =
            ConditionCheckRequest::with_hash_key::<Account, _>(&"a2", EncodingPolicy::Current)
                .unwrap();
        let result = batch.add_raw_request(request);
        assert!(matches!(result, Err(Error::MissingValue(_))));
        assert_eq!(batch.state(), BatchState::Poisoned);
        assert_eq!(batch.len(), 1);
        let outcome = batch.commit(&CancellationToken::new()).await.unwrap();
        assert!(matches!(outcome, CommitOutcome::Discarded));
        assert!(client.submissions().is_empty());
    }
}
