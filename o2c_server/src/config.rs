use std::{env, path::PathBuf, time::Duration};

use log::*;
use o2c_common::Secret;
use o2c_engine::{
    ingest::IngestConfig,
    retry::{Backoff, RetryPolicy, DEFAULT_BACKOFF_CAP},
};

const DEFAULT_O2C_HOST: &str = "127.0.0.1";
const DEFAULT_O2C_PORT: u16 = 8380;
const DEFAULT_EVENT_BUFFER_SIZE: usize = 50;
const DEFAULT_QUEUE_BUFFER_SIZE: usize = 100;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Webhook endpoint for alert delivery. When absent, alerts are routed to the local log sink.
    pub webhook_url: Option<Secret<String>>,
    pub pipeline: PipelineConfig,
}

/// Policy knobs for the pipeline workers. Kept separate from the server plumbing so the workers
/// can be handed a single value.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub retry: RetryPolicy,
    pub ingest: IngestConfig,
    /// Capacity of each event hook channel.
    pub event_buffer_size: usize,
    /// Capacity of the primary order queue.
    pub queue_buffer_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            ingest: IngestConfig::default(),
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            queue_buffer_size: DEFAULT_QUEUE_BUFFER_SIZE,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_O2C_HOST.to_string(),
            port: DEFAULT_O2C_PORT,
            database_url: String::default(),
            webhook_url: None,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("O2C_HOST").ok().unwrap_or_else(|| DEFAULT_O2C_HOST.into());
        let port = env::var("O2C_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for O2C_PORT. {e} Using the default, {DEFAULT_O2C_PORT}, instead."
                    );
                    DEFAULT_O2C_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_O2C_PORT);
        let database_url = env::var("O2C_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ O2C_DATABASE_URL is not set. Please set it to the URL for the hub database.");
            String::default()
        });
        let webhook_url = match env::var("O2C_WEBHOOK_URL") {
            Ok(url) if !url.trim().is_empty() => Some(Secret::new(url.trim().to_string())),
            _ => {
                info!("🪛️ O2C_WEBHOOK_URL is not set. Alerts will be written to the log.");
                None
            },
        };
        let pipeline = PipelineConfig::from_env_or_default();
        Self { host, port, database_url, webhook_url, pipeline }
    }
}

impl PipelineConfig {
    pub fn from_env_or_default() -> Self {
        let max_attempts = env_int("O2C_MAX_RETRY_ATTEMPTS", RetryPolicy::default().max_attempts);
        let retry = RetryPolicy { max_attempts, backoff: configure_backoff() };
        let mut ingest = IngestConfig::default();
        if let Ok(dir) = env::var("O2C_INBOX_DIR") {
            ingest.inbox_dir = PathBuf::from(dir);
        } else {
            info!("🪛️ O2C_INBOX_DIR is not set. Using the default, {}.", ingest.inbox_dir.display());
        }
        let poll_secs = env_int("O2C_INBOX_POLL_SECS", ingest.poll_interval.as_secs() as i64);
        ingest.poll_interval = Duration::from_secs(poll_secs.max(1) as u64);
        let event_buffer_size = env_int("O2C_EVENT_BUFFER_SIZE", DEFAULT_EVENT_BUFFER_SIZE as i64).max(1) as usize;
        let queue_buffer_size = env_int("O2C_QUEUE_BUFFER_SIZE", DEFAULT_QUEUE_BUFFER_SIZE as i64).max(1) as usize;
        Self { retry, ingest, event_buffer_size, queue_buffer_size }
    }
}

fn configure_backoff() -> Backoff {
    let delay = Duration::from_secs(env_int("O2C_RETRY_DELAY_SECS", 2).max(1) as u64);
    match env::var("O2C_RETRY_BACKOFF").map(|s| s.to_lowercase()) {
        Ok(s) if s == "exponential" => Backoff::Exponential { base: delay, cap: DEFAULT_BACKOFF_CAP },
        Ok(s) if s == "fixed" => Backoff::Fixed(delay),
        Ok(s) => {
            warn!("🪛️ {s} is not a valid value for O2C_RETRY_BACKOFF (fixed|exponential). Using fixed.");
            Backoff::Fixed(delay)
        },
        Err(_) => Backoff::Fixed(delay),
    }
}

fn env_int(name: &str, default: i64) -> i64 {
    env::var(name)
        .map_err(|_| info!("🪛️ {name} is not set. Using the default value of {default}."))
        .and_then(|s| {
            s.parse::<i64>().map_err(|e| warn!("🪛️ Invalid configuration value for {name}: {s}. {e}"))
        })
        .ok()
        .unwrap_or(default)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ServerConfig::default();
        assert_eq!(config.host, DEFAULT_O2C_HOST);
        assert_eq!(config.port, DEFAULT_O2C_PORT);
        assert!(config.webhook_url.is_none());
        assert_eq!(config.pipeline.retry.max_attempts, 5);
        assert_eq!(config.pipeline.ingest.pending_extension, "csv");
    }
}
