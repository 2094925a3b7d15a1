use std::collections::HashMap;

use daytrip_model::{
    ModelMessage, ModelRequest, ModelResponse, ModelTool, ResponseFormat,
    ToolCallResult, ToolChoice,
};
use daytrip_services::PlaceRecord;

use super::prompt;
use crate::plan::PlanRequest;
use crate::tool::ToolCallOutcome;

/// Places discovered during one run, keyed by id.
///
/// The first record seen for an id wins, later duplicates are dropped.
#[derive(Debug, Default)]
pub(crate) struct FoundPlaces {
    records: Vec<PlaceRecord>,
    index: HashMap<String, usize>,
}

impl FoundPlaces {
    /// Adds a record, returning `false` if its id is already known.
    pub fn insert(&mut self, record: PlaceRecord) -> bool {
        if record.id.is_empty() {
            debug!("dropping place without id: {}", record.name);
            return false;
        }
        if self.index.contains_key(&record.id) {
            trace!("duplicated place: {}", record.id);
            return false;
        }
        self.index.insert(record.id.clone(), self.records.len());
        self.records.push(record);
        true
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<&PlaceRecord> {
        self.index.get(id).map(|&idx| &self.records[idx])
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &PlaceRecord> {
        self.records.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The working state of one run.
///
/// It owns a copy of the caller's conversation, so concurrent runs never
/// share anything.
pub(super) struct RunContext {
    messages: Vec<ModelMessage>,
    found: FoundPlaces,
}

impl RunContext {
    pub fn new(request: &PlanRequest) -> Self {
        let mut messages = vec![ModelMessage::System(prompt::SYSTEM_PROMPT.to_owned())];
        messages.extend(request.conversation.to_messages());
        messages.push(ModelMessage::User(prompt::context_turn(request)));
        Self {
            messages,
            found: FoundPlaces::default(),
        }
    }

    #[inline]
    pub fn found(&self) -> &FoundPlaces {
        &self.found
    }

    pub fn discovery_request(&self, tools: Vec<ModelTool>) -> ModelRequest {
        ModelRequest {
            messages: self.messages.clone(),
            tools,
            tool_choice: ToolChoice::Auto,
            response_format: ResponseFormat::Text,
        }
    }

    pub fn synthesis_request(&self) -> ModelRequest {
        ModelRequest {
            messages: self.messages.clone(),
            tools: vec![],
            tool_choice: ToolChoice::None,
            response_format: ResponseFormat::JsonObject,
        }
    }

    /// Records the agent's tool-calling answer.
    #[inline]
    pub fn push_response(&mut self, resp: &ModelResponse) {
        self.messages.push(resp.to_message());
    }

    #[inline]
    pub fn push_system(&mut self, content: String) {
        self.messages.push(ModelMessage::System(content));
    }

    /// Merges the results of the tool calls, in call order.
    pub fn absorb(&mut self, outcomes: Vec<ToolCallOutcome>) {
        for outcome in outcomes {
            trace!("merging result of {} ({})", outcome.name, outcome.id);
            let content = match outcome.result {
                Ok(output) => {
                    for record in output.places {
                        self.found.insert(record);
                    }
                    output.content.to_string()
                }
                Err(err) => err.to_value().to_string(),
            };
            self.messages.push(ModelMessage::Tool(ToolCallResult {
                id: outcome.id,
                content,
            }));
        }
        debug!("{} distinct places found", self.found.len());
    }
}
