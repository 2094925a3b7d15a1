use std::fmt::Write;

use crate::plan::PlanRequest;

pub(super) const SYSTEM_PROMPT: &str = r#"You are a day-trip planner.
Goal: propose a realistic one-day itinerary within the traveler's fixed budget.
Rules:
- Use search_places to find real places nearby. Issue ALL the searches the whole day needs at once, unless the traveler asked for something narrower.
- After your searches the system provides real-world price data for the places found. Base your budget calculations on it.
- Aim for a total cost between 85% and 90% of the budget and never exceed it. Do not mention these targets to the traveler.
- Use the provided price data for every activity. If data is missing use your best estimate, without disclaimers.
- Only use places returned by the searches of this request. Ignore places from earlier turns, especially if the search center changed.
- ID MATCHING: every itinerary item's 'id' MUST be the exact 'place_id' string from the search results.
- Return a JSON object with the keys 'assistant_message', 'itinerary', 'adult_count' and 'kid_count'.
- Infer the number of adults and kids from the chat. Default to 1 adult and 0 kids.
- 'assistant_message': a brief, friendly reply in plain text, without markdown.
- 'itinerary': 5 to 7 objects, each with 'id', 'time_range', 'description' and 'price' (the raw per-person number found in the price data, in local currency, 0 if free).
- Prefer a packed schedule. Assume the traveler takes a taxi when walking would take too long.
- Do not compute or mention travel times, the system adds them.
- 'description' is exactly 3 sentences and names neither the place nor any price.
- No optional activities or alternatives. Provide exactly one definitive plan."#;

pub(super) const PRICE_DATA_INSTRUCTION: &str = "Treat this price data as authoritative \
when setting each item's 'price'. Use the raw local amount found in the snippets.";

/// Builds the turn that tells the agent where and for whom to plan.
pub(super) fn context_turn(request: &PlanRequest) -> String {
    let mut turn = String::from("Context:\n");
    // Writing to a `String` never fails.
    let _ = writeln!(turn, "- Budget: {:.2} {}", request.budget, request.currency);
    let _ = writeln!(turn, "- Search center (ll): {}", request.center);
    let _ = writeln!(turn, "- Search radius: {} m", request.radius_m);
    let _ = writeln!(turn, "- Traveler Profile: {}", request.persona);
    if let Some(city) = &request.city {
        let _ = writeln!(turn, "- City: {city}");
    }
    turn.push_str("\nPlan a day trip for today based on my preferences in this chat.");
    turn
}

/// Explains how local prices relate to the budget currency.
pub(super) fn conversion_note(request: &PlanRequest) -> Option<String> {
    let rate = request.exchange_rate.filter(|rate| rate.is_finite() && *rate > 0.0)?;
    Some(format!(
        "CONVERSION: 1 {currency} = {rate} local units. Costs are converted by \
         dividing the local price by {rate}, the system does this for you.",
        currency = request.currency,
    ))
}
