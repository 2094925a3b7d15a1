use daytrip_model::{ErrorKind, ModelFinishReason, ModelResponse};

use crate::Error;
use crate::proto::{ChatCompletion, ErrorEnvelope, convert_tool_call};

/// Parses a successful chat completion body.
pub fn parse_completion(body: &str) -> Result<ModelResponse, Error> {
    let completion = serde_json::from_str::<ChatCompletion>(body)
        .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;
    trace!("got completion: {}", completion.id);

    let Some(choice) = completion.choices.into_iter().next() else {
        return Err(Error::new("completion has no choices", ErrorKind::Other));
    };

    let finish_reason = match choice.finish_reason.as_deref() {
        Some("tool_calls") => ModelFinishReason::ToolCalls,
        Some("length") => ModelFinishReason::Length,
        Some("content_filter") => {
            return Err(Error::new(
                "completion was filtered",
                ErrorKind::Moderated,
            ));
        }
        _ => ModelFinishReason::Stop,
    };
    if let Some(refusal) = choice.message.refusal {
        return Err(Error::new(refusal, ErrorKind::Moderated));
    }

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(convert_tool_call)
        .collect();

    Ok(ModelResponse {
        content: choice.message.content.unwrap_or_default(),
        tool_calls,
        finish_reason,
    })
}

/// Builds an error from a non-success status code and its body.
pub fn status_error(status: u16, body: &str) -> Error {
    let kind = match status {
        429 => ErrorKind::RateLimitExceeded,
        408 | 504 => ErrorKind::Timeout,
        _ => ErrorKind::Other,
    };
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.code {
            Some(code) => format!("{status} {code}: {}", envelope.error.message),
            None => format!("{status}: {}", envelope.error.message),
        },
        Err(_) => format!("{status}: {body}"),
    };
    Error::new(message, kind)
}

#[cfg(test)]
mod tests {
    use daytrip_model::ModelProviderError;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_tool_call_response() {
        let resp =
            parse_completion(include_str!("../fixtures/tool_calls.json"))
                .unwrap();
        assert_eq!(resp.finish_reason, ModelFinishReason::ToolCalls);
        assert_eq!(resp.content, "");
        assert_eq!(resp.tool_calls.len(), 2);
        assert_eq!(resp.tool_calls[0].id, "call_museum");
        assert_eq!(resp.tool_calls[0].name, "search_places");
        assert_eq!(
            resp.tool_calls[0].arguments,
            json!({ "query": "museum", "ll": "49.75,8.65" })
        );
        assert_eq!(resp.tool_calls[1].id, "call_lunch");
        assert_eq!(resp.tool_calls[1].arguments["limit"], 3);
    }

    #[test]
    fn test_text_response() {
        let resp =
            parse_completion(include_str!("../fixtures/text.json")).unwrap();
        assert_eq!(resp.finish_reason, ModelFinishReason::Stop);
        assert!(resp.tool_calls.is_empty());
        assert!(resp.content.starts_with("{\"assistant_message\""));
    }

    #[test]
    fn test_content_filter() {
        let body = json!({
            "id": "chatcmpl-x",
            "choices": [{
                "message": { "content": null },
                "finish_reason": "content_filter"
            }]
        });
        let err = parse_completion(&body.to_string()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Moderated);
    }

    #[test]
    fn test_empty_choices() {
        let err = parse_completion(r#"{"id":"x","choices":[]}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[test]
    fn test_status_error() {
        let err = status_error(
            429,
            r#"{"error":{"message":"Slow down","code":"rate_limit_exceeded"}}"#,
        );
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        assert_eq!(err.message(), "429 rate_limit_exceeded: Slow down");

        let err = status_error(500, "upstream exploded");
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(err.message(), "500: upstream exploded");
    }
}
