//! Reading the agent's final answer back into a plan.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::context::FoundPlaces;
use crate::plan::{
    ItineraryEntry, Plan, PlanOutcome, PlanRequest, PriceSnippet, Travelers,
};

#[derive(Debug, Deserialize)]
pub(super) struct SynthesisOutput {
    #[serde(default)]
    assistant_message: String,
    itinerary: Vec<SynthesizedItem>,
    #[serde(default, deserialize_with = "lenient_count")]
    adult_count: Option<u32>,
    #[serde(default, deserialize_with = "lenient_count")]
    kid_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SynthesizedItem {
    #[serde(default, deserialize_with = "lenient_string")]
    id: String,
    #[serde(default)]
    time_range: String,
    #[serde(default)]
    description: String,
    #[serde(default, alias = "local_price", deserialize_with = "lenient_price")]
    price: f64,
}

/// Parses the synthesis answer, tolerating a surrounding code fence.
pub(super) fn parse(raw: &str) -> Option<SynthesisOutput> {
    let body = strip_code_fence(raw.trim());
    match serde_json::from_str(body) {
        Ok(output) => Some(output),
        Err(err) => {
            warn!("synthesis answer is not an itinerary: {err}");
            None
        }
    }
}

/// Turns a parsed answer into a plan, keeping only entries that refer to a
/// found place.
pub(super) fn assemble(
    output: SynthesisOutput,
    found: &FoundPlaces,
    price_hints: Vec<PriceSnippet>,
    request: &PlanRequest,
) -> Plan {
    let travelers = Travelers {
        adults: output.adult_count.unwrap_or(1),
        kids: output.kid_count.unwrap_or(0),
    };
    let rate = request.effective_rate();
    let multiplier = travelers.multiplier();

    let mut entries = Vec::with_capacity(output.itinerary.len());
    let mut places = vec![];
    let mut referenced = HashSet::new();
    for item in output.itinerary {
        let Some(place) = found.get(&item.id) else {
            debug!("dropping itinerary item with unknown id: {:?}", item.id);
            continue;
        };
        if referenced.insert(place.id.clone()) {
            places.push(place.clone());
        }
        entries.push(ItineraryEntry {
            cost: group_cost(item.price, rate, multiplier),
            place_id: place.id.clone(),
            time_range: item.time_range,
            description: item.description,
            price: item.price,
        });
    }

    Plan {
        outcome: PlanOutcome::Itinerary,
        answer: strip_markdown(&output.assistant_message),
        total_cost: entries.iter().map(|entry| entry.cost).sum(),
        entries,
        places,
        price_hints,
        travelers,
    }
}

/// Converts a per-person local price into the group's cost in the budget
/// currency, rounded up.
fn group_cost(price: f64, rate: f64, multiplier: f64) -> u64 {
    if !price.is_finite() || price <= 0.0 {
        return 0;
    }
    (price / rate * multiplier).ceil() as u64
}

fn strip_code_fence(raw: &str) -> &str {
    let Some(rest) = raw.strip_prefix("```") else {
        return raw;
    };
    // Drop the info string, e.g. "json".
    let rest = rest.split_once('\n').map_or(rest, |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn strip_markdown(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '#' | '*' | '_'))
        .collect::<String>()
        .trim()
        .to_owned()
}

fn lenient_string<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_price<'de, D: Deserializer<'de>>(de: D) -> Result<f64, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => leading_number(&s).unwrap_or(0.0),
        _ => 0.0,
    })
}

fn lenient_count<'de, D: Deserializer<'de>>(
    de: D,
) -> Result<Option<u32>, D::Error> {
    let count = match Value::deserialize(de)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => leading_number(&s),
        _ => None,
    };
    Ok(count
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n.round() as u32))
}

/// Reads the first number in strings like `"12.50 EUR"`, `"8,50 €"` or
/// `"1,200 INR"`.
fn leading_number(s: &str) -> Option<f64> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let token: String = s[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    let token = token.trim_end_matches(['.', ',']);
    let normalized = match token.rsplit_once(',') {
        // A comma followed by three digits groups thousands.
        Some((_, tail)) if token.contains('.') || tail.len() == 3 => {
            token.replace(',', "")
        }
        Some(_) => token.replace(',', "."),
        None => token.to_owned(),
    };
    normalized.parse().ok()
}
