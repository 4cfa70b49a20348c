use crate::{
    Error, Result,
    transaction::client::TransactWriteClient,
    write::operation::{Operation, RequestKind, TransactionRequest},
};

use aws_sdk_dynamodb::{operation::transact_write_items::TransactWriteItemsOutput, types};
use tokio_util::sync::CancellationToken;

/// Slot a request into its transact item.
///
/// Patches land in the update slot. A request whose operation does not match
/// its kind is rejected.
pub fn transact_item(request: &dyn TransactionRequest) -> Result<types::TransactWriteItem> {
    let kind = request.kind();
    let builder = types::TransactWriteItem::builder();
    let builder = match (kind, request.operation()?) {
        (RequestKind::Put, Operation::Put(put)) => builder.put(put),
        (RequestKind::Update | RequestKind::Patch, Operation::Update(update)) => {
            builder.update(update)
        }
        (RequestKind::Delete, Operation::Delete(delete)) => builder.delete(delete),
        (RequestKind::ConditionCheck, Operation::ConditionCheck(condition_check)) => {
            builder.condition_check(condition_check)
        }
        (kind, operation) => {
            return Err(Error::UnsupportedRequest(format!(
                "{kind} request on table `{}` produced a {} operation",
                request.table_name(),
                operation.kind()
            )));
        }
    };
    Ok(builder.build())
}

/// Slot every request, preserving order.
pub fn transact_items(
    requests: &[Box<dyn TransactionRequest>],
) -> Result<Vec<types::TransactWriteItem>> {
    requests
        .iter()
        .map(|request| transact_item(request.as_ref()))
        .collect()
}

/// Submits accumulated requests as one atomic transaction.
#[derive(Clone, Debug)]
pub struct TransactionManager<C> {
    client: C,
}

impl<C: TransactWriteClient> TransactionManager<C> {
    /// Create a manager around a client.
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// The underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Build the transact items and submit them in a single call.
    ///
    /// Nothing is sent when a request fails to build. Cancelling `cancellation`
    /// abandons the pending call with [`Error::Cancelled`].
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_transact.execute",
            skip_all,
            fields(requests = requests.len()),
            err
        )
    )]
    pub async fn execute(
        &self,
        requests: &[Box<dyn TransactionRequest>],
        client_request_token: Option<String>,
        cancellation: &CancellationToken,
    ) -> Result<TransactWriteItemsOutput> {
        let items = transact_items(requests)?;
        tokio::select! {
            biased;
            _ = cancellation.cancelled() => Err(Error::Cancelled),
            output = self.client.submit(items, client_request_token) => output,
        }
    }
}
