use std::fmt::Write;
use std::time::Duration;

use daytrip_core::{Plan, PlanOutcome};

/// Renders a plan as the assistant turn kept in the chat history, so that
/// follow-up requests can refer to it.
pub fn history_turn(plan: &Plan) -> String {
    let mut turn = plan.answer.clone();
    if plan.outcome != PlanOutcome::Itinerary || plan.entries.is_empty() {
        return turn;
    }
    if !turn.is_empty() {
        turn.push_str("\n\n");
    }
    turn.push_str("Itinerary:");
    for entry in &plan.entries {
        let name = plan
            .places
            .iter()
            .find(|place| place.id == entry.place_id)
            .map_or(entry.place_id.as_str(), |place| place.name.as_str());
        // Writing to a `String` never fails.
        let _ = write!(turn, "\n- {}: {name}", entry.time_range);
    }
    turn
}

/// Formats a travel time as whole minutes, e.g. `"12 min"` or
/// `"1 h 05 min"`.
pub fn format_duration(duration: Duration) -> String {
    let minutes = duration.as_secs().div_ceil(60);
    if minutes < 60 {
        format!("{minutes} min")
    } else {
        format!("{} h {:02} min", minutes / 60, minutes % 60)
    }
}

#[cfg(test)]
mod tests {
    use daytrip_core::{ItineraryEntry, Travelers};
    use daytrip_services::PlaceRecord;

    use super::*;

    fn entry(place_id: &str, time_range: &str) -> ItineraryEntry {
        ItineraryEntry {
            place_id: place_id.to_owned(),
            time_range: time_range.to_owned(),
            description: String::new(),
            price: 0.0,
            cost: 0,
        }
    }

    #[test]
    fn test_history_turn() {
        let mut plan = Plan {
            outcome: PlanOutcome::Itinerary,
            answer: "Have a lovely day!".to_owned(),
            entries: vec![entry("p1", "09:00-10:30"), entry("p2", "11:00-12:00")],
            places: vec![
                PlaceRecord {
                    id: "p1".to_owned(),
                    name: "Mathildenhöhe".to_owned(),
                    ..Default::default()
                },
                PlaceRecord {
                    id: "p2".to_owned(),
                    name: "Prinz-Georg-Garten".to_owned(),
                    ..Default::default()
                },
            ],
            price_hints: vec![],
            travelers: Travelers::default(),
            total_cost: 0,
        };
        assert_eq!(
            history_turn(&plan),
            "Have a lovely day!\n\nItinerary:\n\
             - 09:00-10:30: Mathildenhöhe\n\
             - 11:00-12:00: Prinz-Georg-Garten"
        );

        plan.outcome = PlanOutcome::DirectAnswer;
        assert_eq!(history_turn(&plan), "Have a lovely day!");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0 min");
        assert_eq!(format_duration(Duration::from_secs(61)), "2 min");
        assert_eq!(format_duration(Duration::from_secs(3900)), "1 h 05 min");
    }
}
