use std::time::Duration;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};

/// How agent requests are retried after a transient failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_interval: Duration,
    /// Upper bound of the delay between two retries.
    pub max_interval: Duration,
}

impl RetryPolicy {
    pub(crate) fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_max_interval(self.max_interval)
            // Attempts are counted by the caller instead.
            .with_max_elapsed_time(None)
            .build()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(8),
        }
    }
}

/// Tunables of a planning run.
#[derive(Clone, Debug)]
pub struct PlannerConfig {
    pub(crate) agent_timeout: Duration,
    pub(crate) retry: RetryPolicy,
    pub(crate) concurrency: usize,
    pub(crate) default_limit: u32,
    pub(crate) max_limit: u32,
    pub(crate) snippets_per_place: usize,
}

impl PlannerConfig {
    /// Returns a builder starting from the default values.
    #[inline]
    pub fn builder() -> PlannerConfigBuilder {
        PlannerConfigBuilder {
            config: Self::default(),
        }
    }

    /// Returns the time limit of a single agent attempt.
    #[inline]
    pub fn agent_timeout(&self) -> Duration {
        self.agent_timeout
    }

    /// Returns the retry policy for agent requests.
    #[inline]
    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Returns the maximum number of searches in flight within one run.
    #[inline]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            agent_timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
            concurrency: 8,
            default_limit: 5,
            max_limit: 20,
            snippets_per_place: daytrip_services::prices::MAX_PRICE_RESULTS,
        }
    }
}

/// Builder of [`PlannerConfig`].
#[derive(Clone, Debug)]
pub struct PlannerConfigBuilder {
    config: PlannerConfig,
}

impl PlannerConfigBuilder {
    /// Sets the time limit of a single agent attempt.
    #[inline]
    pub fn with_agent_timeout(mut self, timeout: Duration) -> Self {
        self.config.agent_timeout = timeout;
        self
    }

    /// Sets the retry policy for agent requests.
    #[inline]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Sets the maximum number of searches in flight within one run.
    ///
    /// Zero is treated as one.
    #[inline]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency.max(1);
        self
    }

    /// Sets the result count used when the agent doesn't ask for one.
    #[inline]
    pub fn with_default_limit(mut self, limit: u32) -> Self {
        self.config.default_limit = limit.max(1);
        self
    }

    /// Sets the largest result count the agent may ask for.
    #[inline]
    pub fn with_max_limit(mut self, limit: u32) -> Self {
        self.config.max_limit = limit.max(1);
        self
    }

    /// Sets how many price snippets are kept per place.
    #[inline]
    pub fn with_snippets_per_place(mut self, count: usize) -> Self {
        self.config.snippets_per_place = count;
        self
    }

    /// Builds the config.
    #[inline]
    pub fn build(self) -> PlannerConfig {
        let mut config = self.config;
        config.default_limit = config.default_limit.min(config.max_limit);
        config
    }
}
