use daytrip_model::ToolCallRequest;
use serde::{Deserialize, Serialize};

/// The preset answer for one request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Text content of the answer.
    #[serde(default)]
    pub content: String,
    /// Tool calls in the answer.
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRequest>,
    /// If set, the request will fail in the first `failures` attempts.
    /// `Some(0)` means the request will fail infinitely.
    #[serde(default)]
    pub failures: Option<u64>,
}

impl PresetResponse {
    /// Creates a text-only `PresetResponse`.
    #[inline]
    pub fn with_text<S: Into<String>>(content: S) -> Self {
        Self {
            content: content.into(),
            tool_calls: vec![],
            failures: None,
        }
    }

    /// Creates a `PresetResponse` that only calls tools.
    #[inline]
    pub fn with_tool_calls(
        tool_calls: impl Into<Vec<ToolCallRequest>>,
    ) -> Self {
        Self {
            content: String::new(),
            tool_calls: tool_calls.into(),
            failures: None,
        }
    }

    /// Sets failure times before a successful response. `0` means the
    /// response will always be a failure.
    #[inline]
    pub fn with_failures(mut self, failures: u64) -> Self {
        self.failures = Some(failures);
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_deserialize_script() {
        let preset: PresetResponse = serde_json::from_value(json!({
            "tool_calls": [{
                "id": "call_1",
                "name": "search_places",
                "arguments": { "query": "museum", "ll": "49.75,8.65" }
            }],
            "failures": 2
        }))
        .unwrap();

        let expected = PresetResponse::with_tool_calls([ToolCallRequest {
            id: "call_1".to_owned(),
            name: "search_places".to_owned(),
            arguments: json!({ "query": "museum", "ll": "49.75,8.65" }),
        }])
        .with_failures(2);
        assert_eq!(preset, expected);
    }
}
