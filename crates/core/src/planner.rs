//! The three-phase planning run.

mod context;
mod enrich;
mod prompt;
mod synthesis;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use daytrip_model::ModelProvider;
use daytrip_services::{PlaceSearch, PriceSearch};
use tracing::Instrument;

use crate::config::PlannerConfig;
use crate::error::Error;
use crate::model_client::ModelClient;
use crate::plan::{Plan, PlanOutcome, PlanRequest};
use crate::tool::{Manager as ToolManager, SearchDefaults, SearchPlacesTool};
use context::RunContext;

/// Builder of [`Planner`].
pub struct PlannerBuilder<P> {
    provider: P,
    places: Arc<dyn PlaceSearch>,
    prices: Arc<dyn PriceSearch>,
    config: PlannerConfig,
}

impl<P: ModelProvider + 'static> PlannerBuilder<P> {
    /// Creates a builder wiring the planning agent and the two search
    /// providers together.
    pub fn new(
        provider: P,
        places: Arc<dyn PlaceSearch>,
        prices: Arc<dyn PriceSearch>,
    ) -> Self {
        Self {
            provider,
            places,
            prices,
            config: PlannerConfig::default(),
        }
    }

    /// Replaces the default tunables.
    #[inline]
    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the planner.
    pub fn build(self) -> Planner {
        let model_client = ModelClient::new(
            self.provider,
            self.config.agent_timeout,
            self.config.retry.clone(),
        );
        Planner {
            model_client,
            places: self.places,
            prices: self.prices,
            config: self.config,
        }
    }
}

/// Plans single-day itineraries.
///
/// A planner holds no per-run state, independent runs may execute
/// concurrently on the same instance.
pub struct Planner {
    model_client: ModelClient,
    places: Arc<dyn PlaceSearch>,
    prices: Arc<dyn PriceSearch>,
    config: PlannerConfig,
}

impl Planner {
    /// Returns the tunables in use.
    #[inline]
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Runs discovery, enrichment and synthesis for one request.
    ///
    /// Only a failing discovery call to the agent is an error. Failed
    /// searches are reported to the agent, failed price searches leave the
    /// place without hints, and an unusable synthesis answer degrades the
    /// plan's [`PlanOutcome`].
    pub async fn run(&self, request: &PlanRequest) -> Result<Plan, Error> {
        let span = info_span!(
            "plan",
            center = %request.center,
            radius = request.radius_m,
        );
        self.run_phases(request).instrument(span).await
    }

    async fn run_phases(&self, request: &PlanRequest) -> Result<Plan, Error> {
        let mut cx = RunContext::new(request);
        let tools = self.tool_manager(request);

        // Discovery.
        let resp = self
            .model_client
            .send_request(&cx.discovery_request(tools.definitions()))
            .instrument(debug_span!("discovery"))
            .await
            .inspect_err(|err| error!("discovery failed: {err}"))?;
        if resp.tool_calls.is_empty() {
            info!("agent answered without searching");
            return Ok(Plan::text_only(PlanOutcome::DirectAnswer, resp.content));
        }
        info!("agent requested {} searches", resp.tool_calls.len());
        cx.push_response(&resp);

        let outcomes = tools
            .execute_all(&resp.tool_calls, self.config.concurrency)
            .instrument(debug_span!("searches"))
            .await;
        cx.absorb(outcomes);

        // Enrichment.
        let price_hints = if cx.found().is_empty() {
            vec![]
        } else {
            let hints = enrich::gather_prices(
                self.prices.as_ref(),
                cx.found(),
                self.config.concurrency,
                self.config.snippets_per_place,
            )
            .instrument(debug_span!("enrichment"))
            .await;
            cx.push_system(enrich::price_data_turn(&hints, request));
            hints
        };

        // Synthesis.
        let resp = match self
            .model_client
            .send_request(&cx.synthesis_request())
            .instrument(debug_span!("synthesis"))
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                error!("synthesis failed: {err}");
                let mut plan =
                    Plan::text_only(PlanOutcome::SynthesisFailed, String::new());
                plan.price_hints = price_hints;
                return Ok(plan);
            }
        };

        let Some(output) = synthesis::parse(&resp.content) else {
            let mut plan =
                Plan::text_only(PlanOutcome::Unstructured, resp.content);
            plan.price_hints = price_hints;
            return Ok(plan);
        };
        let plan =
            synthesis::assemble(output, cx.found(), price_hints, request);
        info!(
            "planned {} stops at {} places, total cost {}",
            plan.entries.len(),
            plan.places.len(),
            plan.total_cost,
        );
        Ok(plan)
    }

    fn tool_manager(&self, request: &PlanRequest) -> ToolManager {
        let mut manager = ToolManager::default();
        manager.add_tool(SearchPlacesTool::new(
            Arc::clone(&self.places),
            SearchDefaults {
                center: request.center,
                radius_m: request.radius_m,
                limit: self.config.default_limit,
                max_limit: self.config.max_limit,
                city: request.city.clone(),
            },
        ));
        manager
    }
}
