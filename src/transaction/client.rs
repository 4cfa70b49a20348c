use crate::Result;

use aws_sdk_dynamodb::{Client, operation::transact_write_items::TransactWriteItemsOutput, types};
use std::{future::Future, sync::Arc};

/// Remote endpoint able to apply a batch of transactional writes atomically.
///
/// Implemented for the SDK [`Client`]; tests and alternative transports
/// provide their own.
pub trait TransactWriteClient: Send + Sync {
    /// Submit the items as a single all-or-nothing transaction.
    fn submit(
        &self,
        items: Vec<types::TransactWriteItem>,
        client_request_token: Option<String>,
    ) -> impl Future<Output = Result<TransactWriteItemsOutput>> + Send;
}

impl TransactWriteClient for Client {
    fn submit(
        &self,
        items: Vec<types::TransactWriteItem>,
        client_request_token: Option<String>,
    ) -> impl Future<Output = Result<TransactWriteItemsOutput>> + Send {
        let request = self
            .transact_write_items()
            .set_transact_items(Some(items))
            .set_client_request_token(client_request_token);
        async move { Ok(request.send().await?) }
    }
}

impl<C: TransactWriteClient> TransactWriteClient for Arc<C> {
    fn submit(
        &self,
        items: Vec<types::TransactWriteItem>,
        client_request_token: Option<String>,
    ) -> impl Future<Output = Result<TransactWriteItemsOutput>> + Send {
        (**self).submit(items, client_request_token)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use crate::Error;

    use std::sync::Mutex;

    /// One recorded submission.
    #[derive(Clone, Debug, PartialEq)]
    pub(crate) struct Submission {
        pub(crate) items: Vec<types::TransactWriteItem>,
        pub(crate) client_request_token: Option<String>,
    }

    /// Client recording every submission instead of calling DynamoDB.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingClient {
        pub(crate) submissions: Mutex<Vec<Submission>>,
        pub(crate) cancellation_reasons: Option<Vec<types::CancellationReason>>,
        pub(crate) hang: bool,
    }

    impl RecordingClient {
        pub(crate) fn submissions(&self) -> Vec<Submission> {
            self.submissions.lock().unwrap().clone()
        }
    }

    impl TransactWriteClient for RecordingClient {
        fn submit(
            &self,
            items: Vec<types::TransactWriteItem>,
            client_request_token: Option<String>,
        ) -> impl Future<Output = Result<TransactWriteItemsOutput>> + Send {
            self.submissions.lock().unwrap().push(Submission {
                items,
                client_request_token,
            });
            let hang = self.hang;
            let cancellation_reasons = self.cancellation_reasons.clone();
            async move {
                if hang {
                    std::future::pending::<()>().await;
                }
                match cancellation_reasons {
                    Some(reasons) => Err(Error::TransactionCanceled { reasons }),
                    None => Ok(TransactWriteItemsOutput::builder().build()),
                }
            }
        }
    }
}
