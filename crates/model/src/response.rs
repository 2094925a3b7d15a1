use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::request::{AssistantMessage, ModelMessage};

/// A complete answer from the model provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelResponse {
    /// The text content of the answer.
    pub content: String,
    /// Tool calls requested by the model, in the order the model emitted
    /// them.
    pub tool_calls: Vec<ToolCallRequest>,
    /// The reason the model finished generating.
    pub finish_reason: ModelFinishReason,
}

impl ModelResponse {
    /// Converts the answer into a history message.
    #[inline]
    pub fn to_message(&self) -> ModelMessage {
        ModelMessage::Assistant(AssistantMessage {
            content: self.content.clone(),
            tool_calls: self.tool_calls.clone(),
        })
    }
}

/// The reason why a model response has finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFinishReason {
    /// The model needs to call a tool.
    ToolCalls,
    /// The model has finished generating text.
    Stop,
    /// The answer was cut off by the token limit.
    Length,
}

/// Describes a tool call request from the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// The unique identifier for the tool call request.
    ///
    /// Identifiers are unique within one response, and the result of the
    /// call must be sent back with the same identifier.
    pub id: String,
    /// The name of the tool to call.
    pub name: String,
    /// The arguments object to pass to the tool.
    pub arguments: Value,
}
