use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;

use super::{ModelProvider, ProviderError, ProviderKind, Reply};

/// Range the simulated response delay is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyProfile {
    pub min: Duration,
    pub max: Duration,
}

impl Default for LatencyProfile {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(500),
            max: Duration::from_millis(2500),
        }
    }
}

impl LatencyProfile {
    pub fn instant() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    pub fn fixed(delay: Duration) -> Self {
        Self {
            min: delay,
            max: delay,
        }
    }

    fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

fn canned_reply(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::OpenAi => "I understand your concern about the price. Let me explain the value you're getting and see if we can find a solution that works for both of us.",
        ProviderKind::OpenRouter => "Price is definitely important. I'd be happy to discuss the features and benefits to help you see the value. What specific budget range were you considering?",
        ProviderKind::HuggingFace => "I hear you on the pricing. Let me share some details about what makes this worth the investment and see what options we have.",
        ProviderKind::Local => "Thanks for your interest! I appreciate your feedback on pricing. Let me walk you through the value proposition and explore some possibilities.",
    }
}

/// Offline stand-in for a hosted model: answers with fixed text after a
/// simulated delay, failing with the configured probability.
#[derive(Debug, Clone)]
pub struct MockProvider {
    kind: ProviderKind,
    model: String,
    latency: LatencyProfile,
    failure_rate: f64,
}

impl MockProvider {
    pub fn new(kind: ProviderKind, model: &str) -> Self {
        Self {
            kind,
            model: model.to_string(),
            latency: LatencyProfile::default(),
            failure_rate: 0.0,
        }
    }

    pub fn with_latency(mut self, latency: LatencyProfile) -> Self {
        self.latency = latency;
        self
    }

    /// Probability in `[0, 1]`; NaN means never fail.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
        self
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn respond(&self, message: &str) -> Result<Reply, ProviderError> {
        let (delay, fail) = {
            let mut rng = rand::rng();
            (self.latency.sample(), rng.random_bool(self.failure_rate))
        };
        tracing::debug!(provider = self.kind.key(), ?delay, chars = message.len(), "mock respond");
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(ProviderError::Connection(format!(
                "{} did not respond",
                self.kind.display_name()
            )));
        }
        Ok(Reply {
            content: canned_reply(self.kind).to_string(),
            model: self.model.clone(),
        })
    }
}
