//! A local fake planning agent for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use daytrip_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse,
};
use tokio::time::sleep;

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Error {
    #[inline]
    pub fn message(&self) -> &'static str {
        self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

#[derive(Default)]
struct Script {
    steps: VecDeque<PresetResponse>,
    requests: Vec<ModelRequest>,
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to setup the script, which is how the
/// model should answer each request. Steps are consumed in order, one per
/// successful request. If there are no enough steps in the script, an error
/// will be returned. Every received request is recorded and can be
/// inspected with [`TestModelProvider::requests`].
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Arc<Mutex<Script>>,
    delay: Option<Duration>,
    failure_kind: Option<ErrorKind>,
}

impl TestModelProvider {
    #[inline]
    pub fn add_response_step(&self, preset: PresetResponse) {
        self.lock().steps.push_back(preset);
    }

    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Sets the error kind returned by injected failures, defaults to
    /// [`ErrorKind::RateLimitExceeded`].
    #[inline]
    pub fn set_failure_kind(&mut self, kind: ErrorKind) {
        self.failure_kind = Some(kind);
    }

    /// Returns all requests received so far.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.lock().requests.clone()
    }

    /// Returns the number of steps not consumed yet.
    pub fn remaining_steps(&self) -> usize {
        self.lock().steps.len()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn preset_failure(&self) -> Error {
        Error {
            message: "preset failure",
            kind: self.failure_kind.unwrap_or(ErrorKind::RateLimitExceeded),
        }
    }

    fn next_answer(&self, req: &ModelRequest) -> Result<ModelResponse, Error> {
        let mut script = self.lock();
        script.requests.push(req.clone());

        let Some(step) = script.steps.front_mut() else {
            return Err(Error {
                message: "no enough steps",
                kind: ErrorKind::Other,
            });
        };
        match step.failures {
            Some(0) => return Err(self.preset_failure()),
            Some(remaining) => {
                step.failures = (remaining > 1).then(|| remaining - 1);
                return Err(self.preset_failure());
            }
            None => {}
        }

        let Some(step) = script.steps.pop_front() else {
            unreachable!("the front step has been checked");
        };
        let finish_reason = if step.tool_calls.is_empty() {
            ModelFinishReason::Stop
        } else {
            ModelFinishReason::ToolCalls
        };
        Ok(ModelResponse {
            content: step.content,
            tool_calls: step.tool_calls,
            finish_reason,
        })
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<ModelResponse, Self::Error>> + Send + 'static
    {
        let answer = self.next_answer(req);
        let delay = self.delay.unwrap_or(Duration::from_millis(1));
        async move {
            sleep(delay).await;
            answer
        }
    }
}

#[cfg(test)]
mod tests {
    use daytrip_model::{ModelMessage, ModelTool, ToolCallRequest};
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_send_request() {
        let provider = TestModelProvider::default();
        provider.add_response_step(PresetResponse::with_tool_calls([
            ToolCallRequest {
                id: "call_1".to_owned(),
                name: "search_places".to_owned(),
                arguments: json!({ "query": "museum", "ll": "49.75,8.65" }),
            },
        ]));
        provider.add_response_step(PresetResponse::with_text("Done."));

        let mut req = ModelRequest {
            messages: vec![ModelMessage::User("Plan my day".to_owned())],
            tools: vec![ModelTool {
                name: "search_places".to_owned(),
                description: "Searches places".to_owned(),
                parameters: json!({ "type": "object" }),
            }],
            ..Default::default()
        };
        let resp = provider.send_request(&req).await.unwrap();
        assert_eq!(resp.finish_reason, ModelFinishReason::ToolCalls);
        assert_eq!(resp.tool_calls[0].name, "search_places");

        req.messages.push(resp.to_message());
        let resp = provider.send_request(&req).await.unwrap();
        assert_eq!(resp.content, "Done.");
        assert_eq!(resp.finish_reason, ModelFinishReason::Stop);

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].messages.len(), 2);
        assert_eq!(provider.remaining_steps(), 0);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let provider = TestModelProvider::default();
        provider.add_response_step(
            PresetResponse::with_text("finally").with_failures(2),
        );
        let req = ModelRequest::default();

        for _ in 0..2 {
            let err = provider.send_request(&req).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        }
        let resp = provider.send_request(&req).await.unwrap();
        assert_eq!(resp.content, "finally");
    }

    #[tokio::test]
    async fn test_permanent_failure() {
        let mut provider = TestModelProvider::default();
        provider.set_failure_kind(ErrorKind::Moderated);
        provider.add_response_step(
            PresetResponse::with_text("never").with_failures(0),
        );
        let req = ModelRequest::default();
        for _ in 0..3 {
            let err = provider.send_request(&req).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Moderated);
        }
        assert_eq!(provider.remaining_steps(), 1);
    }

    #[tokio::test]
    async fn test_no_enough_steps() {
        let provider = TestModelProvider::default();
        let err = provider
            .send_request(&ModelRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.message(), "no enough steps");
        assert_eq!(err.kind(), ErrorKind::Other);
    }
}
