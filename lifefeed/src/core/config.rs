use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_yml::Value;
use url::Url;
use yaml_merge_keys::merge_keys_serde_yml;

use super::error::ConfigError;
use crate::feed::decode::FeedFormat;
use crate::feed::queue::DEFAULT_QUEUE_CAPACITY;
use crate::feed::source::DEFAULT_CURSOR_PARAM;
use crate::runtime::controller::PipelineTiming;

pub const DEFAULT_URL: &str = "http://127.0.0.1:5000/world";
pub const DEFAULT_PERIOD_MS: u64 = 1000;
const DEFAULT_QUEUE_TIMEOUT_MS: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

pub const ENV_URL: &str = "LIFEFEED_URL";
pub const ENV_PERIOD_MS: &str = "LIFEFEED_PERIOD_MS";
pub const ENV_QUEUE_CAPACITY: &str = "LIFEFEED_QUEUE_CAPACITY";

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct FeedConfig {
    pub url: String,
    pub format: FeedFormat,
    pub cursor_param: String,
    pub period_ms: u64,
    pub queue_capacity: usize,
    pub backoff_ms: u64,
    pub poll_ms: u64,
    pub request_timeout_ms: u64,
    pub auto_update: bool,
    pub resume_after: Option<u64>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            format: FeedFormat::default(),
            cursor_param: DEFAULT_CURSOR_PARAM.to_string(),
            period_ms: DEFAULT_PERIOD_MS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            backoff_ms: DEFAULT_QUEUE_TIMEOUT_MS,
            poll_ms: DEFAULT_QUEUE_TIMEOUT_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            auto_update: false,
            resume_after: None,
        }
    }
}

impl FeedConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source =
            fs::read_to_string(path).map_err(|err| ConfigError::Read {
                path: path.display().to_string(),
                reason: err.to_string(),
            })?;

        Self::from_yaml(&source).map_err(|reason| ConfigError::Parse {
            path: path.display().to_string(),
            reason,
        })
    }

    pub fn from_yaml(source: &str) -> Result<Self, String> {
        if source.trim().is_empty() {
            return Ok(Self::default());
        }

        let raw: Value =
            serde_yml::from_str(source).map_err(|err| err.to_string())?;

        let merged = merge_keys_serde_yml(raw).map_err(|err| {
            format!("failed to process YAML merge keys: {}", err)
        })?;

        serde_yml::from_value(merged).map_err(|err| err.to_string())
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = lookup(ENV_URL) {
            self.url = url;
        }

        if let Some(period) = lookup(ENV_PERIOD_MS) {
            self.period_ms = parse_env(ENV_PERIOD_MS, &period)?;
        }

        if let Some(capacity) = lookup(ENV_QUEUE_CAPACITY) {
            self.queue_capacity = parse_env(ENV_QUEUE_CAPACITY, &capacity)?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period_ms == 0 {
            return Err(ConfigError::Zero("period_ms"));
        }

        if self.queue_capacity == 0 {
            return Err(ConfigError::Zero("queue_capacity"));
        }

        if self.backoff_ms == 0 {
            return Err(ConfigError::Zero("backoff_ms"));
        }

        if self.poll_ms == 0 {
            return Err(ConfigError::Zero("poll_ms"));
        }

        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Zero("request_timeout_ms"));
        }

        Url::parse(&self.url).map_err(|err| ConfigError::Url {
            url: self.url.clone(),
            reason: err.to_string(),
        })?;

        Ok(())
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn timing(&self) -> PipelineTiming {
        PipelineTiming {
            period: self.period(),
            queue_capacity: self.queue_capacity,
            backoff: Duration::from_millis(self.backoff_ms),
            poll_interval: Duration::from_millis(self.poll_ms),
        }
    }
}

fn parse_env<T: std::str::FromStr>(
    name: &str,
    value: &str,
) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::Env {
        name: name.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let config = FeedConfig::from_yaml("").unwrap();
        assert_eq!(config, FeedConfig::default());
        assert_eq!(config.period(), Duration::from_secs(1));
        assert_eq!(config.queue_capacity, 5);
    }

    #[test]
    fn yaml_overrides_selected_fields() {
        let config = FeedConfig::from_yaml(
            "url: http://example.test/world\n\
             format: json\n\
             period_ms: 250\n\
             auto_update: true\n\
             resume_after: 10\n",
        )
        .unwrap();

        assert_eq!(config.url, "http://example.test/world");
        assert_eq!(config.format, FeedFormat::Json);
        assert_eq!(config.period_ms, 250);
        assert!(config.auto_update);
        assert_eq!(config.resume_after, Some(10));
        assert_eq!(config.poll_ms, 10);
    }

    #[test]
    fn yaml_merge_keys_are_resolved() {
        let config = FeedConfig::from_yaml(
            "base: &base\n  period_ms: 40\n<<: *base\nqueue_capacity: 2\n",
        )
        .unwrap();
        assert_eq!(config.period_ms, 40);
        assert_eq!(config.queue_capacity, 2);
    }

    #[test]
    fn overrides_come_from_lookup() {
        let mut config = FeedConfig::default();
        config
            .apply_overrides(|name| match name {
                ENV_URL => Some("http://other.test/world".to_string()),
                ENV_PERIOD_MS => Some(" 125 ".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.url, "http://other.test/world");
        assert_eq!(config.period_ms, 125);
        assert_eq!(config.queue_capacity, 5);

        let err = config
            .apply_overrides(|name| {
                (name == ENV_QUEUE_CAPACITY).then(|| "many".to_string())
            })
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { .. }));
    }

    #[test]
    fn validate_rejects_zero_period_and_bad_url() {
        let mut config = FeedConfig {
            period_ms: 0,
            ..FeedConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Zero(_))));

        config.period_ms = 100;
        config.url = "nope".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Url { .. })));

        config.url = DEFAULT_URL.to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_request_timeout() {
        let config = FeedConfig {
            request_timeout_ms: 0,
            ..FeedConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Zero("request_timeout_ms"))
        ));
    }

    #[test]
    fn timing_uses_configured_intervals() {
        let config = FeedConfig {
            period_ms: 200,
            queue_capacity: 3,
            backoff_ms: 20,
            poll_ms: 5,
            ..FeedConfig::default()
        };
        let timing = config.timing();
        assert_eq!(timing.period, Duration::from_millis(200));
        assert_eq!(timing.queue_capacity, 3);
        assert_eq!(timing.backoff, Duration::from_millis(20));
        assert_eq!(timing.poll_interval, Duration::from_millis(5));
    }
}
