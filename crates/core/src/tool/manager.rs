use std::collections::BTreeMap;
use std::future::ready;
use std::pin::Pin;

use daytrip_model::{ModelTool, ToolCallRequest};
use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tracing::Instrument;

use crate::tool::{AnyTool, Error, Tool, ToolObject, ToolResult};

/// The result of one tool call, paired with the call it answers.
#[derive(Debug)]
pub(crate) struct ToolCallOutcome {
    pub id: String,
    pub name: String,
    pub result: ToolResult,
}

/// An object that manages the toolset and executes calls from the agent.
#[derive(Default)]
pub(crate) struct Manager {
    // Ordered by name so that requests to the agent are reproducible.
    tools: BTreeMap<String, Box<dyn ToolObject>>,
}

impl Manager {
    pub fn add_tool<T: Tool>(&mut self, tool: T) {
        let name = tool.name().to_owned();
        self.tools.insert(name, Box::new(AnyTool(tool)));
    }

    #[inline]
    pub fn definitions(&self) -> Vec<ModelTool> {
        self.tools
            .values()
            .map(|tool| ModelTool {
                name: tool.name().to_owned(),
                description: tool.description().to_owned(),
                parameters: tool.parameter_schema().clone(),
            })
            .collect()
    }

    /// Executes all calls with at most `concurrency` of them in flight.
    ///
    /// Every call gets exactly one outcome, in the order of `requests`. A
    /// failing call doesn't affect its siblings.
    pub async fn execute_all(
        &self,
        requests: &[ToolCallRequest],
        concurrency: usize,
    ) -> Vec<ToolCallOutcome> {
        let semaphore = Semaphore::new(concurrency.max(1));
        let semaphore = &semaphore;

        let calls = requests.iter().map(|req| {
            let fut: Pin<Box<dyn Future<Output = ToolResult> + Send>> =
                match self.tools.get(&req.name) {
                    Some(tool) => tool.execute(req.arguments.clone()),
                    None => {
                        warn!("tool not found: {}", req.name);
                        Box::pin(ready(Err(Error::unknown_tool(&req.name))))
                    }
                };
            let id = req.id.clone();
            let name = req.name.clone();
            async move {
                // The semaphore is never closed.
                let _permit = semaphore.acquire().await.ok();
                trace!("tool call started");
                let result = fut.await;
                if let Err(err) = &result {
                    warn!("tool call failed: {err}");
                }
                ToolCallOutcome { id, name, result }
            }
            .instrument(debug_span!("tool call", id = %req.id, name = %req.name))
        });
        join_all(calls).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use serde_json::{Value, json};

    use super::*;
    use crate::tool::{ErrorKind, ToolOutput};

    static EMPTY_SCHEMA: &Value = &Value::Null;

    #[derive(Default)]
    struct SlowTool {
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl Tool for SlowTool {
        type Input = Value;

        fn name(&self) -> &str {
            "slow_tool"
        }

        fn description(&self) -> &str {
            "A tool that takes a while"
        }

        fn parameter_schema(&self) -> &Value {
            EMPTY_SCHEMA
        }

        fn execute(
            &self,
            input: Self::Input,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            let in_flight = Arc::clone(&self.in_flight);
            let peak = Arc::clone(&self.peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                if input["fail"] == true {
                    return Err(Error::execution_error().with_reason("boom"));
                }
                Ok(ToolOutput {
                    content: input,
                    places: vec![],
                })
            }
        }
    }

    fn call(id: &str, name: &str, arguments: Value) -> ToolCallRequest {
        ToolCallRequest {
            id: id.to_owned(),
            name: name.to_owned(),
            arguments,
        }
    }

    #[tokio::test]
    async fn test_execute_all() {
        let mut manager = Manager::default();
        manager.add_tool(SlowTool::default());

        let requests = vec![
            call("call_1", "slow_tool", json!({ "n": 1 })),
            call("call_2", "book_tickets", json!({})),
            call("call_3", "slow_tool", json!({ "fail": true })),
            call("call_4", "slow_tool", json!({ "n": 4 })),
        ];
        let outcomes = manager.execute_all(&requests, 4).await;

        let ids: Vec<_> = outcomes.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, ["call_1", "call_2", "call_3", "call_4"]);
        assert_eq!(outcomes[0].result.as_ref().unwrap().content["n"], 1);
        assert_eq!(
            outcomes[1].result.as_ref().unwrap_err().kind(),
            ErrorKind::UnknownTool
        );
        assert_eq!(
            outcomes[2].result.as_ref().unwrap_err().kind(),
            ErrorKind::ExecutionError
        );
        assert_eq!(outcomes[3].result.as_ref().unwrap().content["n"], 4);
    }

    #[tokio::test]
    async fn test_concurrency_bound() {
        let tool = SlowTool::default();
        let peak = Arc::clone(&tool.peak);
        let mut manager = Manager::default();
        manager.add_tool(tool);

        let requests: Vec<_> = (0..6)
            .map(|n| call(&format!("call_{n}"), "slow_tool", json!({ "n": n })))
            .collect();
        let outcomes = manager.execute_all(&requests, 2).await;

        assert_eq!(outcomes.len(), 6);
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_definitions() {
        let mut manager = Manager::default();
        manager.add_tool(SlowTool::default());
        let definitions = manager.definitions();
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].name, "slow_tool");
    }
}
