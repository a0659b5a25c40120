use genai_core::config::parse_value;

use crate::usage::Pricing;

/// Overrides the input rate (USD per 1000 tokens).
pub const INPUT_PRICE_ENV: &str = "GENAI_INPUT_TOKEN_PRICE";
/// Overrides the output rate (USD per 1000 tokens).
pub const OUTPUT_PRICE_ENV: &str = "GENAI_OUTPUT_TOKEN_PRICE";
/// Bounded channel size between a spawned transform and its consumer.
pub const STREAM_BUFFER_ENV: &str = "GENAI_STREAM_BUFFER";

const DEFAULT_STREAM_BUFFER: usize = 128;

/// Runtime settings for response streams.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformConfig {
    pub pricing: Pricing,
    pub stream_buffer_capacity: usize,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            pricing: Pricing::default(),
            stream_buffer_capacity: DEFAULT_STREAM_BUFFER,
        }
    }
}

impl TransformConfig {
    /// Reads overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup`; unset or invalid values keep the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read_rate = |key: &str| {
            lookup(key)
                .and_then(|raw| parse_value::<f64>(key, &raw))
                .filter(|rate| rate.is_finite() && *rate >= 0.0)
        };
        let defaults = Self::default();
        let pricing = Pricing {
            input_per_1k: read_rate(INPUT_PRICE_ENV).unwrap_or(defaults.pricing.input_per_1k),
            output_per_1k: read_rate(OUTPUT_PRICE_ENV).unwrap_or(defaults.pricing.output_per_1k),
        };
        let stream_buffer_capacity = lookup(STREAM_BUFFER_ENV)
            .and_then(|raw| parse_value::<usize>(STREAM_BUFFER_ENV, &raw))
            .filter(|capacity| *capacity > 0)
            .unwrap_or(defaults.stream_buffer_capacity);
        Self {
            pricing,
            stream_buffer_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_overrides() {
        let config = TransformConfig::from_lookup(|_| None);
        assert_eq!(config, TransformConfig::default());
        assert_eq!(config.pricing, Pricing::CLAUDE_HAIKU_4_5);
    }

    #[test]
    fn reads_price_and_buffer_overrides() {
        let config = TransformConfig::from_lookup(lookup_from(&[
            (INPUT_PRICE_ENV, "0.003"),
            (OUTPUT_PRICE_ENV, "0.015"),
            (STREAM_BUFFER_ENV, "16"),
        ]));
        assert_eq!(config.pricing, Pricing::new(0.003, 0.015));
        assert_eq!(config.stream_buffer_capacity, 16);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = TransformConfig::from_lookup(lookup_from(&[
            (INPUT_PRICE_ENV, "free"),
            (OUTPUT_PRICE_ENV, "-1"),
            (STREAM_BUFFER_ENV, "0"),
        ]));
        assert_eq!(config, TransformConfig::default());
    }
}
