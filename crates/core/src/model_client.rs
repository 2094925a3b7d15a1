use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use daytrip_model::{
    ModelProvider, ModelProviderError, ModelRequest, ModelResponse,
};
use tracing::Instrument;

use crate::config::RetryPolicy;
use crate::error::{Error, ErrorKind};

type SendRequestResult = Result<ModelResponse, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type HandlerFn =
    Arc<dyn Fn(&ModelRequest) -> BoxedSendRequestFuture + Send + Sync>;

/// A wrapper around a model provider that bounds every attempt in time,
/// retries transient failures and provides a type-erased interface for the
/// other modules.
#[derive(Clone)]
pub(crate) struct ModelClient {
    handler_fn: HandlerFn,
    timeout: Duration,
    retry: RetryPolicy,
}

impl ModelClient {
    #[inline]
    pub fn new<P: ModelProvider + 'static>(
        provider: P,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        // Erase `P` so that the planner doesn't need a generic parameter.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(req);
            Box::pin(async move {
                fut.await
                    .map_err(|err| Box::new(err) as Box<dyn ModelProviderError>)
            })
        });
        Self {
            handler_fn,
            timeout,
            retry,
        }
    }

    /// Sends a request, retrying rate limits and timeouts with exponential
    /// backoff until the retry budget is spent.
    pub async fn send_request(
        &self,
        req: &ModelRequest,
    ) -> Result<ModelResponse, Error> {
        let max_retries = self.retry.max_retries;
        let mut attempt = 0;
        backoff::future::retry(self.retry.backoff(), || {
            attempt += 1;
            let attempt = attempt;
            let fut = self.send_once(req);
            async move {
                fut.await.map_err(|err| {
                    if err.kind().is_transient() && attempt <= max_retries {
                        warn!("agent attempt {attempt} failed, retrying: {err}");
                        backoff::Error::transient(err)
                    } else {
                        backoff::Error::permanent(err)
                    }
                })
            }
        })
        .instrument(debug_span!("agent request"))
        .await
    }

    fn send_once(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<ModelResponse, Error>> + Send + 'static {
        trace!("sending a request: {req:?}");
        let fut = (self.handler_fn)(req);
        let timeout = self.timeout;
        async move {
            match tokio::time::timeout(timeout, fut).await {
                Ok(Ok(resp)) => Ok(resp),
                Ok(Err(err)) => Err(Error::new(err.kind(), err.to_string())),
                Err(_) => Err(Error::new(
                    ErrorKind::Timeout,
                    format!("no answer within {timeout:?}"),
                )),
            }
        }
    }
}
