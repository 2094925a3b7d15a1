//! An interactive day-trip planner for the terminal.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::path::Path;
use std::pin::pin;
use std::time::Duration;

use daytrip::core::conversation::Conversation;
use daytrip::core::{Plan, PlanOutcome, PlannerConfig};
use daytrip::services::{Router, TravelTimes};
use daytrip::{MapOverlay, Settings, format_duration, history_turn};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufReadExt};
use tokio::select;
use tokio::time::sleep;

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };
    debug!("settings: {settings:?}");

    let planner = settings.build_planner(PlannerConfig::default());
    let router = settings.build_router();

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .map(|style| style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"))
        .unwrap_or_else(|_| ProgressStyle::default_spinner());

    println!(
        "{}🧭 Tell me your interests (e.g. nature, cafés, museums) and any \
         constraints (time window, kids, mobility).",
        BAR_CHAR.bright_cyan()
    );

    let mut conversation = Conversation::new();
    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = read_line().await else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        // The turn is only kept once the planner has answered it.
        let mut pending = conversation.clone();
        pending.push_user(line);
        let request = settings.plan_request(pending.clone());

        let progress_bar = ProgressBar::new_spinner();
        progress_bar.set_style(progress_style.clone());
        progress_bar.set_message("🗺️  Planning your day...");

        let mut run = pin!(planner.run(&request));
        let result = loop {
            select! {
                result = &mut run => break result,
                _ = sleep(Duration::from_millis(100)) => progress_bar.inc(1),
            }
        };
        progress_bar.finish_and_clear();

        let plan = match result {
            Ok(plan) => plan,
            Err(err) => {
                println!(
                    "{}⚠️  {}",
                    BAR_CHAR.bright_red(),
                    format!("Planning failed: {err}").bright_white()
                );
                continue;
            }
        };

        print_plan(&plan, &router, &settings.currency).await;

        if let Some(path) = &settings.map_out {
            let overlay = MapOverlay::build(&router, settings.center, &plan).await;
            write_overlay(path, &overlay).await;
        }

        pending.push_assistant(history_turn(&plan));
        conversation = pending;
    }
}

async fn print_plan(plan: &Plan, router: &Router, currency: &str) {
    let bar = BAR_CHAR.bright_cyan();
    if !plan.answer.is_empty() {
        println!("{bar}🤖 {}", plan.answer.bright_white());
    }
    match plan.outcome {
        PlanOutcome::Itinerary => {}
        PlanOutcome::DirectAnswer | PlanOutcome::Unstructured => return,
        PlanOutcome::SynthesisFailed => {
            println!(
                "{}⚠️  The planner found places but couldn't put a day \
                 together. Please try again.",
                BAR_CHAR.bright_yellow()
            );
            return;
        }
    }
    if plan.entries.is_empty() {
        println!(
            "{}⚠️  None of the suggested stops could be verified.",
            BAR_CHAR.bright_yellow()
        );
        return;
    }

    for (idx, entry) in plan.entries.iter().enumerate() {
        let place = plan.places.iter().find(|p| p.id == entry.place_id);
        let name = place.map_or(entry.place_id.as_str(), |p| p.name.as_str());

        println!();
        println!(
            "{bar}{} {}",
            entry.time_range.bright_yellow(),
            name.bright_white().bold()
        );
        println!("{bar}📝 {}", entry.description);
        println!("{bar}💰 {} {currency}", entry.cost);

        let next = plan
            .entries
            .get(idx + 1)
            .and_then(|next| plan.places.iter().find(|p| p.id == next.place_id));
        let from = place.and_then(|p| p.location());
        let to = next.and_then(|p| p.location());
        if let (Some(from), Some(to)) = (from, to) {
            let times = router.travel_times(from, to).await;
            print_travel_times(&times);
        }
    }

    println!();
    println!(
        "{bar}{} {} {currency} ({} adults, {} kids)",
        "Total:".bold(),
        plan.total_cost,
        plan.travelers.adults,
        plan.travelers.kids,
    );
}

fn print_travel_times(times: &TravelTimes) {
    if times.is_empty() {
        return;
    }
    let show = |duration: Option<Duration>| {
        duration.map_or_else(|| "n/a".to_owned(), format_duration)
    };
    println!(
        "{}🚶 {}  🚌 {}  🚗 {}",
        BAR_CHAR.bright_black(),
        show(times.walk),
        show(times.transit),
        show(times.drive),
    );
}

async fn write_overlay(path: &Path, overlay: &MapOverlay) {
    let json = match serde_json::to_string_pretty(overlay) {
        Ok(json) => json,
        Err(err) => {
            error!("failed to encode the map overlay: {err}");
            return;
        }
    };
    match tokio::fs::write(path, json).await {
        Ok(()) => info!("map overlay written to {}", path.display()),
        Err(err) => error!("failed to write {}: {err}", path.display()),
    }
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
