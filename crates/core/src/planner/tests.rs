use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use daytrip_model::{
    ErrorKind, ModelMessage, ResponseFormat, ToolCallRequest, ToolChoice,
};
use daytrip_services::{
    Error as ServiceError, LatLng, PlaceQuery, PlaceRecord, PlaceSearch,
    PriceResult, PriceSearch,
};
use daytrip_test_model::{PresetResponse, TestModelProvider};
use serde_json::{Value, json};

use super::*;
use crate::config::RetryPolicy;
use crate::conversation::Conversation;

const SINGLE_STOP: &str = r#"{"itinerary":[{"id":"p1","time_range":"09:00-10:30","description":"Museum visit","price":12}]}"#;

#[derive(Default)]
struct FakePlaces {
    results: HashMap<String, Result<Vec<PlaceRecord>, ServiceError>>,
    queries: Mutex<Vec<PlaceQuery>>,
}

impl FakePlaces {
    fn with(
        mut self,
        query: &str,
        result: Result<Vec<PlaceRecord>, ServiceError>,
    ) -> Self {
        self.results.insert(query.to_owned(), result);
        self
    }

    fn queries(&self) -> Vec<PlaceQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlaceSearch for FakePlaces {
    async fn search(
        &self,
        query: &PlaceQuery,
    ) -> Result<Vec<PlaceRecord>, ServiceError> {
        self.queries.lock().unwrap().push(query.clone());
        self.results
            .get(&query.query)
            .cloned()
            .unwrap_or_else(|| Ok(vec![]))
    }
}

#[derive(Default)]
struct FakePrices {
    queries: Mutex<Vec<String>>,
}

impl FakePrices {
    fn queries(&self) -> Vec<String> {
        let mut queries = self.queries.lock().unwrap().clone();
        queries.sort();
        queries
    }
}

#[async_trait]
impl PriceSearch for FakePrices {
    async fn search(&self, query: &str) -> Result<Vec<PriceResult>, ServiceError> {
        self.queries.lock().unwrap().push(query.to_owned());
        if query.contains("Closed") {
            return Err(ServiceError::transport("connection reset"));
        }
        Ok((0..5)
            .map(|n| PriceResult {
                title: format!("Result {n}"),
                snippet: "Adults 12 €, kids 6 €".to_owned(),
                link: format!("https://example.com/{n}"),
            })
            .collect())
    }
}

fn place(id: &str, name: &str) -> PlaceRecord {
    PlaceRecord {
        id: id.to_owned(),
        name: name.to_owned(),
        address: format!("{name} street 1"),
        latitude: Some(49.75),
        longitude: Some(8.65),
        ..Default::default()
    }
}

fn search_call(id: &str, query: &str) -> ToolCallRequest {
    ToolCallRequest {
        id: id.to_owned(),
        name: "search_places".to_owned(),
        arguments: json!({ "query": query, "ll": "49.75,8.65" }),
    }
}

fn request() -> PlanRequest {
    let mut conversation = Conversation::new();
    conversation.push_user("Museums and a good lunch, please.");
    PlanRequest::new(conversation, LatLng::new(49.75, 8.65)).with_radius(5000)
}

fn config() -> PlannerConfig {
    PlannerConfig::builder()
        .with_agent_timeout(Duration::from_secs(1))
        .with_retry(RetryPolicy {
            max_retries: 3,
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(2),
        })
        .with_concurrency(4)
        .build()
}

struct Harness {
    agent: TestModelProvider,
    places: Arc<FakePlaces>,
    prices: Arc<FakePrices>,
    planner: Planner,
}

fn harness(agent: TestModelProvider, places: FakePlaces) -> Harness {
    let places = Arc::new(places);
    let prices = Arc::new(FakePrices::default());
    let planner =
        PlannerBuilder::new(agent.clone(), places.clone(), prices.clone())
            .with_config(config())
            .build();
    Harness {
        agent,
        places,
        prices,
        planner,
    }
}

fn tool_results(messages: &[ModelMessage]) -> HashMap<String, Value> {
    messages
        .iter()
        .filter_map(|msg| match msg {
            ModelMessage::Tool(result) => Some((
                result.id.clone(),
                serde_json::from_str(&result.content).unwrap(),
            )),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_single_stop_itinerary() {
    let agent = TestModelProvider::default();
    agent.add_response_step(PresetResponse::with_tool_calls([search_call(
        "call_1", "museum",
    )]));
    agent.add_response_step(PresetResponse::with_text(SINGLE_STOP));
    let h = harness(
        agent,
        FakePlaces::default().with("museum", Ok(vec![place("p1", "Museum")])),
    );

    let plan = h.planner.run(&request()).await.unwrap();

    assert_eq!(plan.outcome, PlanOutcome::Itinerary);
    assert_eq!(plan.entries.len(), 1);
    assert_eq!(plan.entries[0].place_id, "p1");
    assert_eq!(plan.entries[0].price, 12.0);
    assert_eq!(plan.entries[0].time_range, "09:00-10:30");
    assert_eq!(plan.entries[0].cost, 12);
    assert_eq!(plan.places, vec![place("p1", "Museum")]);
    assert_eq!(plan.total_cost, 12);

    let queries = h.places.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].center, LatLng::new(49.75, 8.65));
    assert_eq!(queries[0].radius_m, 5000);

    // Snippets are capped per place.
    assert_eq!(plan.price_hints.len(), 1);
    assert_eq!(plan.price_hints[0].place_id, "p1");
    assert_eq!(plan.price_hints[0].price_info.len(), 3);
}

#[tokio::test]
async fn test_unknown_place_is_dropped() {
    let agent = TestModelProvider::default();
    agent.add_response_step(PresetResponse::with_tool_calls([search_call(
        "call_1", "museum",
    )]));
    agent.add_response_step(PresetResponse::with_text(
        SINGLE_STOP.replace("p1", "p99"),
    ));
    let h = harness(
        agent,
        FakePlaces::default().with("museum", Ok(vec![place("p1", "Museum")])),
    );

    let plan = h.planner.run(&request()).await.unwrap();

    assert_eq!(plan.outcome, PlanOutcome::Itinerary);
    assert!(plan.entries.is_empty());
    assert!(plan.places.is_empty());
    assert_eq!(plan.total_cost, 0);
}

#[tokio::test]
async fn test_direct_answer() {
    let agent = TestModelProvider::default();
    agent.add_response_step(PresetResponse::with_text(
        "Which city are you visiting?",
    ));
    let h = harness(agent, FakePlaces::default());

    let plan = h.planner.run(&request()).await.unwrap();

    assert_eq!(plan.outcome, PlanOutcome::DirectAnswer);
    assert_eq!(plan.answer, "Which city are you visiting?");
    assert!(plan.entries.is_empty());
    assert!(plan.places.is_empty());
    assert_eq!(h.agent.requests().len(), 1);
    assert!(h.places.queries().is_empty());
    assert!(h.prices.queries().is_empty());
}

#[tokio::test]
async fn test_failed_search_is_isolated() {
    let agent = TestModelProvider::default();
    agent.add_response_step(PresetResponse::with_tool_calls([
        search_call("call_1", "museum"),
        search_call("call_2", "cafe"),
        search_call("call_3", "park"),
        ToolCallRequest {
            id: "call_4".to_owned(),
            name: "book_tickets".to_owned(),
            arguments: json!({}),
        },
    ]));
    agent.add_response_step(PresetResponse::with_text(
        r#"{"itinerary":[
            {"id":"p1","time_range":"09:00-10:00","description":"A","price":12},
            {"id":"p3","time_range":"10:30-11:30","description":"B","price":0},
            {"id":"p2","time_range":"12:00-13:00","description":"C","price":"4 EUR"}
        ]}"#,
    ));
    let h = harness(
        agent,
        FakePlaces::default()
            .with("museum", Ok(vec![place("p1", "Museum")]))
            .with("cafe", Err(ServiceError::status(503, "unavailable")))
            .with(
                "park",
                Ok(vec![place("p2", "Herrngarten"), place("p3", "Rosenhöhe")]),
            ),
    );

    let plan = h.planner.run(&request()).await.unwrap();

    let place_ids: Vec<_> = plan.places.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(place_ids, ["p1", "p3", "p2"]);
    assert_eq!(plan.entries.len(), 3);
    assert_eq!(plan.total_cost, 16);

    let requests = h.agent.requests();
    let results = tool_results(&requests[1].messages);
    assert_eq!(results.len(), 4);
    assert_eq!(results["call_1"]["results"][0]["place_id"], "p1");
    assert_eq!(results["call_2"]["error"], true);
    assert_eq!(results["call_2"]["status"], 503);
    assert_eq!(results["call_3"]["results"].as_array().unwrap().len(), 2);
    assert_eq!(results["call_4"]["kind"], "unknown_tool");

    // Every found place is enriched, the failed search contributes none.
    assert_eq!(h.prices.queries().len(), 3);
}

#[tokio::test]
async fn test_duplicate_places_keep_first_seen() {
    let agent = TestModelProvider::default();
    agent.add_response_step(PresetResponse::with_tool_calls([
        search_call("call_1", "museum"),
        search_call("call_2", "art"),
    ]));
    agent.add_response_step(PresetResponse::with_text(SINGLE_STOP));
    let h = harness(
        agent,
        FakePlaces::default()
            .with("museum", Ok(vec![place("p1", "Old name")]))
            .with(
                "art",
                Ok(vec![place("p1", "New name"), place("p2", "Gallery")]),
            ),
    );

    let plan = h.planner.run(&request()).await.unwrap();

    assert_eq!(plan.places[0].name, "Old name");
    assert_eq!(
        h.prices.queries(),
        [
            "entrance fee Gallery Gallery street 1",
            "entrance fee Old name Old name street 1",
        ]
    );
    let hint_ids: Vec<_> =
        plan.price_hints.iter().map(|h| h.place_id.as_str()).collect();
    assert_eq!(hint_ids, ["p1", "p2"]);
}

#[tokio::test]
async fn test_price_failure_leaves_empty_hints() {
    let agent = TestModelProvider::default();
    agent.add_response_step(PresetResponse::with_tool_calls([search_call(
        "call_1", "museum",
    )]));
    agent.add_response_step(PresetResponse::with_text(SINGLE_STOP));
    let h = harness(
        agent,
        FakePlaces::default().with(
            "museum",
            Ok(vec![place("p1", "Museum"), place("p2", "Closed Museum")]),
        ),
    );

    let plan = h.planner.run(&request()).await.unwrap();

    assert_eq!(plan.price_hints.len(), 2);
    assert_eq!(plan.price_hints[0].price_info.len(), 3);
    assert!(plan.price_hints[1].price_info.is_empty());
    assert_eq!(plan.outcome, PlanOutcome::Itinerary);
}

#[tokio::test]
async fn test_enrichment_is_reproducible() {
    let mut seen = vec![];
    for _ in 0..2 {
        let agent = TestModelProvider::default();
        agent.add_response_step(PresetResponse::with_tool_calls([
            search_call("call_1", "museum"),
        ]));
        agent.add_response_step(PresetResponse::with_text(SINGLE_STOP));
        let h = harness(
            agent,
            FakePlaces::default()
                .with("museum", Ok(vec![place("p1", "Museum")])),
        );
        h.planner.run(&request()).await.unwrap();
        seen.push(h.prices.queries());
    }
    assert_eq!(seen[0], seen[1]);
    assert_eq!(seen[0], ["entrance fee Museum Museum street 1"]);
}

#[tokio::test]
async fn test_request_shapes() {
    let agent = TestModelProvider::default();
    agent.add_response_step(PresetResponse::with_tool_calls([search_call(
        "call_1", "museum",
    )]));
    agent.add_response_step(PresetResponse::with_text(SINGLE_STOP));
    let h = harness(
        agent,
        FakePlaces::default()
            .with("museum in Darmstadt", Ok(vec![place("p1", "Museum")])),
    );
    let request = request().with_city("Darmstadt").with_exchange_rate(1.5);

    h.planner.run(&request).await.unwrap();

    let requests = h.agent.requests();
    assert_eq!(requests.len(), 2);

    let discovery = &requests[0];
    assert_eq!(discovery.tool_choice, ToolChoice::Auto);
    assert_eq!(discovery.response_format, ResponseFormat::Text);
    assert_eq!(discovery.tools.len(), 1);
    assert_eq!(discovery.tools[0].name, "search_places");
    assert!(matches!(&discovery.messages[0], ModelMessage::System(_)));
    assert_eq!(
        discovery.messages[1],
        ModelMessage::User("Museums and a good lunch, please.".to_owned())
    );
    let ModelMessage::User(context) = &discovery.messages[2] else {
        panic!("expected the context turn");
    };
    assert!(context.starts_with("Context:\n- Budget: 100.00 EUR"));

    let synthesis = &requests[1];
    assert!(synthesis.tools.is_empty());
    assert_eq!(synthesis.tool_choice, ToolChoice::None);
    assert_eq!(synthesis.response_format, ResponseFormat::JsonObject);
    let ModelMessage::Assistant(assistant) = &synthesis.messages[3] else {
        panic!("expected the tool-calling answer");
    };
    assert_eq!(assistant.tool_calls[0].id, "call_1");
    let ModelMessage::System(price_data) = synthesis.messages.last().unwrap()
    else {
        panic!("expected the price data turn");
    };
    assert!(price_data.starts_with("CRITICAL PRICE DATA: [{"));
    assert!(price_data.contains("\"place_id\":\"p1\""));
    assert!(price_data.contains("1 EUR = 1.5"));

    assert_eq!(h.places.queries()[0].query, "museum in Darmstadt");
}

#[tokio::test]
async fn test_caller_conversation_is_untouched() {
    let agent = TestModelProvider::default();
    agent.add_response_step(PresetResponse::with_tool_calls([search_call(
        "call_1", "museum",
    )]));
    agent.add_response_step(PresetResponse::with_text(SINGLE_STOP));
    let h = harness(
        agent,
        FakePlaces::default().with("museum", Ok(vec![place("p1", "Museum")])),
    );
    let request = request();
    let before = request.conversation.clone();

    h.planner.run(&request).await.unwrap();

    assert_eq!(request.conversation, before);
    assert_eq!(request.conversation.len(), 1);
}

#[tokio::test]
async fn test_unstructured_synthesis() {
    let agent = TestModelProvider::default();
    agent.add_response_step(PresetResponse::with_tool_calls([search_call(
        "call_1", "museum",
    )]));
    agent.add_response_step(PresetResponse::with_text(
        "Start at the museum, then have lunch nearby.",
    ));
    let h = harness(
        agent,
        FakePlaces::default().with("museum", Ok(vec![place("p1", "Museum")])),
    );

    let plan = h.planner.run(&request()).await.unwrap();

    assert_eq!(plan.outcome, PlanOutcome::Unstructured);
    assert_eq!(plan.answer, "Start at the museum, then have lunch nearby.");
    assert!(plan.entries.is_empty());
    assert!(plan.places.is_empty());
}

#[tokio::test]
async fn test_synthesis_failure_degrades() {
    let agent = TestModelProvider::default();
    agent.add_response_step(PresetResponse::with_tool_calls([search_call(
        "call_1", "museum",
    )]));
    let h = harness(
        agent,
        FakePlaces::default().with("museum", Ok(vec![place("p1", "Museum")])),
    );

    let plan = h.planner.run(&request()).await.unwrap();

    assert_eq!(plan.outcome, PlanOutcome::SynthesisFailed);
    assert!(plan.entries.is_empty());
    assert_eq!(plan.price_hints.len(), 1);
}

#[tokio::test]
async fn test_discovery_failure_is_an_error() {
    let mut agent = TestModelProvider::default();
    agent.set_failure_kind(ErrorKind::Moderated);
    agent.add_response_step(
        PresetResponse::with_text("unreachable").with_failures(0),
    );
    let h = harness(agent, FakePlaces::default());

    let err = h.planner.run(&request()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Moderated);
    assert_eq!(h.agent.requests().len(), 1);
    assert!(h.places.queries().is_empty());
}

#[tokio::test]
async fn test_rate_limited_discovery_is_retried() {
    let agent = TestModelProvider::default();
    agent.add_response_step(
        PresetResponse::with_tool_calls([search_call("call_1", "museum")])
            .with_failures(2),
    );
    agent.add_response_step(PresetResponse::with_text(SINGLE_STOP));
    let h = harness(
        agent,
        FakePlaces::default().with("museum", Ok(vec![place("p1", "Museum")])),
    );

    let plan = h.planner.run(&request()).await.unwrap();

    assert_eq!(plan.entries.len(), 1);
    assert_eq!(h.agent.requests().len(), 4);
    assert_eq!(h.agent.remaining_steps(), 0);
}

#[tokio::test]
async fn test_concurrent_runs_are_independent() {
    let agent = TestModelProvider::default();
    for _ in 0..2 {
        agent.add_response_step(PresetResponse::with_tool_calls([
            search_call("call_1", "museum"),
        ]));
    }
    let h = harness(
        agent,
        FakePlaces::default().with("museum", Ok(vec![place("p1", "Museum")])),
    );
    h.agent.add_response_step(PresetResponse::with_text(SINGLE_STOP));
    h.agent.add_response_step(PresetResponse::with_text(SINGLE_STOP));

    let plain = request();
    let in_city = request().with_city("Darmstadt");
    let (a, b) = tokio::join!(h.planner.run(&plain), h.planner.run(&in_city));
    let (a, b) = (a.unwrap(), b.unwrap());

    // The second run searches a different query and finds nothing.
    assert_eq!(a.places.len() + b.places.len(), 1);
    assert_eq!(h.agent.remaining_steps(), 0);
}
