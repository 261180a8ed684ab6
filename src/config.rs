use clap::Parser;
use std::time::Duration;

use crate::error::ConfigError;
use crate::sampler::SamplerConfig;
use crate::url_shape::{PathPattern, UrlShaper};

// Longest accepted input line in bytes
pub const MAX_LINE_LENGTH: usize = 65536;

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "honeylog")]
#[command(about = "Adaptive sampling gateway for newline-delimited JSON events")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "SERVER_PORT", default_value_t = 8080)]
    pub port: u16,

    // Fields whose values make up the sampling key, in order
    #[arg(long, env = "HONEYCOMB_SAMPLING_FIELDS", value_delimiter = ',')]
    pub sampling_fields: Vec<String>,

    // Fields holding URLs to break out into path/query components
    #[arg(long, env = "HONEYCOMB_URL_FIELDS", value_delimiter = ',')]
    pub url_fields: Vec<String>,

    // Path templates like /users/:id used to name URL path segments
    #[arg(long, env = "HONEYCOMB_URL_PATTERNS", value_delimiter = ',')]
    pub url_patterns: Vec<String>,

    // Goal sample rate; anything but a positive integer means 1
    #[arg(long, env = "HONEYCOMB_SAMPLE_RATE")]
    pub sample_rate: Option<String>,

    #[arg(long, env = "HONEYCOMB_API_KEY", default_value = "", hide_env_values = true)]
    pub api_key: String,

    #[arg(long, env = "HONEYCOMB_DATASET", default_value = "")]
    pub dataset: String,

    #[arg(long, env = "HONEYCOMB_API_HOST", default_value = "https://api.honeycomb.io")]
    pub api_host: String,

    // Seconds between sample rate recomputations
    #[arg(long, env = "SAMPLER_ADJUSTMENT_INTERVAL", default_value_t = 15)]
    pub adjustment_interval: u64,

    // Keys tracked per interval, 0 for unlimited
    #[arg(long, env = "SAMPLER_MAX_KEYS", default_value_t = 0)]
    pub max_keys: usize,

    // Largest accepted request body in bytes
    #[arg(long, env = "MAX_BODY_SIZE", default_value_t = 64 * 1024 * 1024)]
    pub max_body_size: usize,
}

/// Outbound batching settings.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub api_host: String,
    pub api_key: String,
    pub dataset: String,
    pub queue_size: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
}

impl SinkConfig {
    pub fn batch_url(&self) -> String {
        format!("{}/1/batch/{}", self.api_host.trim_end_matches('/'), self.dataset)
    }
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub sampling_fields: Vec<String>,
    pub url_fields: Vec<String>,
    pub shaper: UrlShaper,
    pub max_line_length: usize,
    pub max_body_size: usize,
    pub adjustment_interval: Duration,
    pub sampler: SamplerConfig,
    pub sink: SinkConfig,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let sampling_fields = non_empty(args.sampling_fields);
        if sampling_fields.is_empty() {
            return Err(ConfigError::NoSamplingFields);
        }
        if args.dataset.trim().is_empty() {
            return Err(ConfigError::NoDataset);
        }

        let patterns = non_empty(args.url_patterns)
            .iter()
            .map(|p| PathPattern::parse(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            port: args.port,
            sampling_fields,
            url_fields: non_empty(args.url_fields),
            shaper: UrlShaper::new(patterns),
            max_line_length: MAX_LINE_LENGTH,
            max_body_size: args.max_body_size,
            adjustment_interval: Duration::from_secs(args.adjustment_interval.max(1)),
            sampler: SamplerConfig {
                goal_sample_rate: goal_sample_rate(args.sample_rate.as_deref()),
                max_keys: args.max_keys,
                ..SamplerConfig::default()
            },
            sink: SinkConfig {
                api_host: args.api_host,
                api_key: args.api_key,
                dataset: args.dataset.trim().to_string(),
                queue_size: 10_000,
                batch_size: 100,
                flush_interval: Duration::from_millis(100),
            },
        })
    }
}

fn goal_sample_rate(raw: Option<&str>) -> u32 {
    raw.and_then(|r| r.trim().parse::<u32>().ok())
        .filter(|rate| *rate > 0)
        .unwrap_or(1)
}

// trims entries and drops the empty ones ("a,,b" or an unset variable)
fn non_empty(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["honeylog", "--dataset", "test"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn sampling_fields_are_required() {
        let err = Config::from_args(args(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::NoSamplingFields));

        let err = Config::from_args(args(&["--sampling-fields", " ,"])).unwrap_err();
        assert!(matches!(err, ConfigError::NoSamplingFields));
    }

    #[test]
    fn splits_comma_lists() {
        let config = Config::from_args(args(&[
            "--sampling-fields",
            "user, status",
            "--url-fields",
            "path,referer",
        ]))
        .unwrap();
        assert_eq!(config.sampling_fields, vec!["user", "status"]);
        assert_eq!(config.url_fields, vec!["path", "referer"]);
        assert_eq!(config.max_line_length, MAX_LINE_LENGTH);
    }

    #[test]
    fn invalid_sample_rate_falls_back_to_one() {
        assert_eq!(goal_sample_rate(None), 1);
        assert_eq!(goal_sample_rate(Some("abc")), 1);
        assert_eq!(goal_sample_rate(Some("0")), 1);
        assert_eq!(goal_sample_rate(Some("-4")), 1);
        assert_eq!(goal_sample_rate(Some(" 20 ")), 20);
    }

    #[test]
    fn bad_url_pattern_is_rejected() {
        let result = Config::from_args(args(&["--sampling-fields", "a", "--url-patterns", "nope"]));
        assert!(matches!(result, Err(ConfigError::InvalidPattern { .. })));
    }

    #[test]
    fn batch_url_joins_host_and_dataset() {
        let config = Config::from_args(args(&[
            "--sampling-fields",
            "a",
            "--api-host",
            "http://collector:8080/",
        ]))
        .unwrap();
        assert_eq!(config.sink.batch_url(), "http://collector:8080/1/batch/test");
    }
}
