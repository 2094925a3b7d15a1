use daytrip_services::{PlaceRecord, PriceSearch};
use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tracing::Instrument;

use super::context::FoundPlaces;
use super::prompt;
use crate::plan::{PlanRequest, PriceSnippet};

/// Builds the price search query for a place. The same place always yields
/// the same query.
pub(crate) fn price_query(place: &PlaceRecord) -> String {
    format!("entrance fee {} {}", place.name.trim(), place.address.trim())
        .trim()
        .to_owned()
}

/// Searches price hints for every found place, with at most `concurrency`
/// searches in flight.
///
/// A failed search yields an empty snippet list for that place only.
pub(super) async fn gather_prices(
    prices: &dyn PriceSearch,
    found: &FoundPlaces,
    concurrency: usize,
    snippets_per_place: usize,
) -> Vec<PriceSnippet> {
    let semaphore = Semaphore::new(concurrency.max(1));
    let semaphore = &semaphore;

    let searches = found.iter().map(|place| {
        let query = price_query(place);
        async move {
            // The semaphore is never closed.
            let _permit = semaphore.acquire().await.ok();
            let mut price_info = match prices.search(&query).await {
                Ok(results) => results,
                Err(err) => {
                    warn!("price search failed: {err}");
                    vec![]
                }
            };
            price_info.truncate(snippets_per_place);
            PriceSnippet {
                place: place.name.clone(),
                place_id: place.id.clone(),
                price_info,
            }
        }
        .instrument(debug_span!("price search", place = %place.id))
    });
    join_all(searches).await
}

/// Builds the system turn that hands the price hints to the agent.
pub(super) fn price_data_turn(
    hints: &[PriceSnippet],
    request: &PlanRequest,
) -> String {
    let data = serde_json::to_string(hints).unwrap_or_else(|err| {
        warn!("failed to encode price data: {err}");
        "[]".to_owned()
    });
    let mut turn = format!(
        "CRITICAL PRICE DATA: {data}\n{}",
        prompt::PRICE_DATA_INSTRUCTION
    );
    if let Some(note) = prompt::conversion_note(request) {
        turn.push('\n');
        turn.push_str(&note);
    }
    turn
}
