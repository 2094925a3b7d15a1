use std::env;
use std::fmt::{self, Debug, Display};
use std::path::PathBuf;
use std::sync::Arc;

use daytrip_core::conversation::Conversation;
use daytrip_core::{PlanRequest, Planner, PlannerBuilder, PlannerConfig};
use daytrip_openai_model::{OpenAIConfigBuilder, OpenAIProvider};
use daytrip_services::LatLng;
use daytrip_services::places::{GooglePlaces, GooglePlacesConfig};
use daytrip_services::prices::{Serper, SerperConfig};
use daytrip_services::routing::{
    GoogleRoutes, GoogleRoutesConfig, Osrm, OsrmConfig, Router,
};

const DEFAULT_RADIUS_M: u32 = 5000;
const DEFAULT_BUDGET: f64 = 100.0;
const DEFAULT_CURRENCY: &str = "EUR";
const DEFAULT_PERSONA: &str = "General Traveler";

/// An environment variable that is missing or malformed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigError {
    variable: &'static str,
    reason: String,
}

impl ConfigError {
    fn missing(variable: &'static str) -> Self {
        Self {
            variable,
            reason: "is not set".to_owned(),
        }
    }

    fn invalid<S: Display>(variable: &'static str, reason: S) -> Self {
        Self {
            variable,
            reason: format!("is invalid: {reason}"),
        }
    }

    /// Returns the name of the offending variable.
    #[inline]
    pub fn variable(&self) -> &str {
        self.variable
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} environment variable {}", self.variable, self.reason)
    }
}

impl std::error::Error for ConfigError {}

/// Everything the planner needs from its environment.
#[derive(Clone)]
pub struct Settings {
    openai_api_key: String,
    openai_base_url: Option<String>,
    openai_model: Option<String>,
    google_maps_api_key: String,
    serper_api_key: String,
    /// Where the traveler starts from.
    pub center: LatLng,
    /// Search radius in meters.
    pub radius_m: u32,
    /// Spending limit for the day.
    pub budget: f64,
    /// Currency of the budget.
    pub currency: String,
    /// Free-form traveler profile.
    pub persona: String,
    /// City appended to place searches.
    pub city: Option<String>,
    /// Local currency units per budget currency unit.
    pub exchange_rate: Option<f64>,
    /// Where to write the map overlay of each plan.
    pub map_out: Option<PathBuf>,
}

impl Settings {
    /// Reads the settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the settings through `lookup`, which maps a variable name to
    /// its value. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let openai_api_key = get("OPENAI_API_KEY")
            .ok_or_else(|| ConfigError::missing("OPENAI_API_KEY"))?;
        let center = get("DAYTRIP_CENTER")
            .ok_or_else(|| ConfigError::missing("DAYTRIP_CENTER"))?
            .parse::<LatLng>()
            .map_err(|err| ConfigError::invalid("DAYTRIP_CENTER", err))?;

        let radius_m = match get("DAYTRIP_RADIUS") {
            Some(radius) => radius
                .parse::<u32>()
                .ok()
                .filter(|radius| *radius > 0)
                .ok_or_else(|| ConfigError::invalid("DAYTRIP_RADIUS", &radius))?,
            None => DEFAULT_RADIUS_M,
        };
        let budget = match get("DAYTRIP_BUDGET") {
            Some(budget) => parse_positive("DAYTRIP_BUDGET", &budget)?,
            None => DEFAULT_BUDGET,
        };
        let exchange_rate = get("DAYTRIP_EXCHANGE_RATE")
            .map(|rate| parse_positive("DAYTRIP_EXCHANGE_RATE", &rate))
            .transpose()?;

        let google_maps_api_key = get("GOOGLE_MAPS_API_KEY").unwrap_or_default();
        if google_maps_api_key.is_empty() {
            warn!("GOOGLE_MAPS_API_KEY is not set, place searches will fail");
        }
        let serper_api_key = get("SERPER_API_KEY").unwrap_or_default();
        if serper_api_key.is_empty() {
            warn!("SERPER_API_KEY is not set, plans will have no price hints");
        }

        Ok(Self {
            openai_api_key,
            openai_base_url: get("OPENAI_BASE_URL"),
            openai_model: get("OPENAI_MODEL"),
            google_maps_api_key,
            serper_api_key,
            center,
            radius_m,
            budget,
            currency: get("DAYTRIP_CURRENCY")
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_owned()),
            persona: get("DAYTRIP_PERSONA")
                .unwrap_or_else(|| DEFAULT_PERSONA.to_owned()),
            city: get("DAYTRIP_CITY"),
            exchange_rate,
            map_out: get("DAYTRIP_MAP_OUT").map(PathBuf::from),
        })
    }

    /// Builds the request for one planning run over `conversation`.
    pub fn plan_request(&self, conversation: Conversation) -> PlanRequest {
        let mut request = PlanRequest::new(conversation, self.center)
            .with_radius(self.radius_m)
            .with_budget(self.budget, self.currency.clone())
            .with_persona(self.persona.clone());
        if let Some(city) = &self.city {
            request = request.with_city(city.clone());
        }
        if let Some(rate) = self.exchange_rate {
            request = request.with_exchange_rate(rate);
        }
        request
    }

    /// Builds a planner backed by OpenAI, Google Places and Serper.
    pub fn build_planner(&self, config: PlannerConfig) -> Planner {
        let mut openai = OpenAIConfigBuilder::with_api_key(&self.openai_api_key)
            .with_timeout(config.agent_timeout());
        if let Some(base_url) = &self.openai_base_url {
            openai = openai.with_base_url(base_url);
        }
        if let Some(model) = &self.openai_model {
            openai = openai.with_model(model);
        }
        let openai = openai.build();
        info!("planning with {}", openai.model());

        let places = GooglePlaces::new(GooglePlacesConfig::with_api_key(
            &self.google_maps_api_key,
        ));
        let prices = Serper::new(SerperConfig::with_api_key(&self.serper_api_key));
        PlannerBuilder::new(
            OpenAIProvider::new(openai),
            Arc::new(places),
            Arc::new(prices),
        )
        .with_config(config)
        .build()
    }

    /// Builds a router with Google Routes as primary and OSRM as fallback.
    pub fn build_router(&self) -> Router {
        Router::new(
            GoogleRoutes::new(GoogleRoutesConfig::with_api_key(
                &self.google_maps_api_key,
            )),
            Osrm::new(OsrmConfig::default()),
        )
    }
}

impl Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("openai_api_key", &"<redacted>")
            .field("openai_base_url", &self.openai_base_url)
            .field("openai_model", &self.openai_model)
            .field("google_maps_api_key", &"<redacted>")
            .field("serper_api_key", &"<redacted>")
            .field("center", &self.center)
            .field("radius_m", &self.radius_m)
            .field("budget", &self.budget)
            .field("currency", &self.currency)
            .field("persona", &self.persona)
            .field("city", &self.city)
            .field("exchange_rate", &self.exchange_rate)
            .field("map_out", &self.map_out)
            .finish()
    }
}

fn parse_positive(variable: &'static str, value: &str) -> Result<f64, ConfigError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n > 0.0)
        .ok_or_else(|| ConfigError::invalid(variable, value))
}
