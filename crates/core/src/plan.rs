//! Inputs and outputs of a planning run.

use daytrip_services::{LatLng, PlaceRecord, PriceResult};
use serde::{Deserialize, Serialize};

use crate::conversation::Conversation;

/// Everything a planning run needs to know about the traveler.
#[derive(Clone, Debug, PartialEq)]
pub struct PlanRequest {
    /// The chat so far. The last turn is usually the traveler's request.
    pub conversation: Conversation,
    /// Where the traveler starts from.
    pub center: LatLng,
    /// Search radius in meters.
    pub radius_m: u32,
    /// Spending limit for the day.
    pub budget: f64,
    /// Currency of `budget`.
    pub currency: String,
    /// Free-form description of the traveler.
    pub persona: String,
    /// City appended to place searches, if known.
    pub city: Option<String>,
    /// Units of local currency per unit of the traveler's currency.
    pub exchange_rate: Option<f64>,
}

impl PlanRequest {
    /// Creates a request with a 5 km radius, a budget of 100 EUR and a
    /// general traveler profile.
    pub fn new(conversation: Conversation, center: LatLng) -> Self {
        Self {
            conversation,
            center,
            radius_m: 5000,
            budget: 100.0,
            currency: "EUR".to_owned(),
            persona: "General Traveler".to_owned(),
            city: None,
            exchange_rate: None,
        }
    }

    /// Sets the search radius.
    #[inline]
    pub fn with_radius(mut self, radius_m: u32) -> Self {
        self.radius_m = radius_m;
        self
    }

    /// Sets the budget and its currency.
    #[inline]
    pub fn with_budget<S: Into<String>>(mut self, budget: f64, currency: S) -> Self {
        self.budget = budget;
        self.currency = currency.into();
        self
    }

    /// Sets the traveler profile.
    #[inline]
    pub fn with_persona<S: Into<String>>(mut self, persona: S) -> Self {
        self.persona = persona.into();
        self
    }

    /// Sets the city appended to place searches.
    #[inline]
    pub fn with_city<S: Into<String>>(mut self, city: S) -> Self {
        self.city = Some(city.into());
        self
    }

    /// Sets the exchange rate used to convert local prices.
    #[inline]
    pub fn with_exchange_rate(mut self, rate: f64) -> Self {
        self.exchange_rate = Some(rate);
        self
    }

    /// Returns the usable exchange rate, `1.0` when none or an invalid one
    /// is set.
    pub(crate) fn effective_rate(&self) -> f64 {
        self.exchange_rate
            .filter(|rate| rate.is_finite() && *rate > 0.0)
            .unwrap_or(1.0)
    }
}

/// Web snippets that may mention what visiting a place costs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSnippet {
    /// Name of the place.
    pub place: String,
    /// Identifier of the place.
    pub place_id: String,
    /// Up to three search results, empty when the search failed.
    pub price_info: Vec<PriceResult>,
}

/// The group the plan is made for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Travelers {
    /// Number of adults.
    pub adults: u32,
    /// Number of kids.
    pub kids: u32,
}

impl Travelers {
    /// Returns how many full-price tickets the group amounts to. Kids count
    /// as half.
    #[inline]
    pub fn multiplier(&self) -> f64 {
        self.adults as f64 + 0.5 * self.kids as f64
    }
}

impl Default for Travelers {
    #[inline]
    fn default() -> Self {
        Self { adults: 1, kids: 0 }
    }
}

/// One stop of the itinerary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItineraryEntry {
    /// Identifier of a place found during the run.
    pub place_id: String,
    /// Free-form time slot, e.g. `"09:00-10:30"`.
    pub time_range: String,
    /// What to do there.
    pub description: String,
    /// Per-person price in local currency, `0.0` if free or unknown.
    pub price: f64,
    /// Price for the whole group in the traveler's currency, rounded up.
    pub cost: u64,
}

/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanOutcome {
    /// The agent answered without searching, e.g. a clarifying question.
    DirectAnswer,
    /// A structured itinerary was produced.
    Itinerary,
    /// The agent's final answer couldn't be read as an itinerary. Its raw
    /// text is kept as the answer.
    Unstructured,
    /// The agent didn't answer in the synthesis phase.
    SynthesisFailed,
}

/// The result of a planning run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// How the run ended.
    pub outcome: PlanOutcome,
    /// Text for the traveler.
    pub answer: String,
    /// Itinerary stops in the agent's order.
    pub entries: Vec<ItineraryEntry>,
    /// The places the entries refer to, distinct, in order of first
    /// reference.
    pub places: Vec<PlaceRecord>,
    /// Price hints gathered for every place found.
    pub price_hints: Vec<PriceSnippet>,
    /// The group the plan is for.
    pub travelers: Travelers,
    /// Sum of entry costs.
    pub total_cost: u64,
}

impl Plan {
    pub(crate) fn text_only(outcome: PlanOutcome, answer: String) -> Self {
        Self {
            outcome,
            answer,
            entries: vec![],
            places: vec![],
            price_hints: vec![],
            travelers: Travelers::default(),
            total_cost: 0,
        }
    }

    /// Returns the place behind each entry in visiting order, together with
    /// its coordinates. A revisited place appears once per visit; entries
    /// whose place has no known location are skipped.
    pub fn stops(&self) -> impl Iterator<Item = (&PlaceRecord, LatLng)> + '_ {
        self.entries.iter().filter_map(|entry| {
            let place = self.places.iter().find(|p| p.id == entry.place_id)?;
            Some((place, place.location()?))
        })
    }

    /// Returns the coordinates of [`Plan::stops`], in visiting order.
    pub fn waypoints(&self) -> Vec<LatLng> {
        self.stops().map(|(_, location)| location).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_rate() {
        let request = PlanRequest::new(Conversation::new(), LatLng::new(0.0, 0.0));
        assert_eq!(request.effective_rate(), 1.0);
        assert_eq!(request.clone().with_exchange_rate(0.0).effective_rate(), 1.0);
        assert_eq!(
            request.clone().with_exchange_rate(f64::NAN).effective_rate(),
            1.0
        );
        assert_eq!(request.with_exchange_rate(4.2).effective_rate(), 4.2);
    }

    #[test]
    fn test_multiplier() {
        let travelers = Travelers { adults: 2, kids: 3 };
        assert_eq!(travelers.multiplier(), 3.5);
        assert_eq!(Travelers::default().multiplier(), 1.0);
    }

    fn place(id: &str, location: Option<(f64, f64)>) -> PlaceRecord {
        PlaceRecord {
            id: id.to_owned(),
            name: id.to_owned(),
            latitude: location.map(|l| l.0),
            longitude: location.map(|l| l.1),
            ..Default::default()
        }
    }

    fn entry(place_id: &str) -> ItineraryEntry {
        ItineraryEntry {
            place_id: place_id.to_owned(),
            time_range: String::new(),
            description: String::new(),
            price: 0.0,
            cost: 0,
        }
    }

    #[test]
    fn test_waypoints_follow_entries() {
        let mut plan = Plan::text_only(PlanOutcome::Itinerary, String::new());
        plan.places = vec![
            place("hotel", Some((49.0, 8.0))),
            place("museum", Some((50.0, 8.0))),
            place("kiosk", None),
        ];
        plan.entries = ["hotel", "museum", "kiosk", "hotel"]
            .into_iter()
            .map(entry)
            .collect();

        assert_eq!(
            plan.waypoints(),
            [
                LatLng::new(49.0, 8.0),
                LatLng::new(50.0, 8.0),
                LatLng::new(49.0, 8.0)
            ]
        );
        let ids: Vec<_> = plan.stops().map(|(p, _)| p.id.as_str()).collect();
        assert_eq!(ids, ["hotel", "museum", "hotel"]);
    }
}
