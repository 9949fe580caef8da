//! Alert worker configuration.

use std::time::Duration;

use hestia_notify::DispatcherConfig;

/// Worker configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development; override via
/// environment variables in production. The database URL and channel
/// provider settings are read separately (`DATABASE_URL`, `SMTP_*`,
/// `*_WEBHOOK_URL`).
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How often to poll for listings awaiting their alert pass.
    pub poll_interval: Duration,
    /// Maximum concurrent notification sends within one dispatch.
    pub send_concurrency: usize,
    /// Wallclock bound on one notification send.
    pub send_timeout: Duration,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var              | Default |
    /// |----------------------|---------|
    /// | `POLL_INTERVAL_SECS` | `5`     |
    /// | `SEND_CONCURRENCY`   | `8`     |
    /// | `SEND_TIMEOUT_SECS`  | `10`    |
    pub fn from_env() -> Self {
        let poll_interval_secs: u64 = std::env::var("POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("POLL_INTERVAL_SECS must be a valid u64");

        let send_concurrency: usize = std::env::var("SEND_CONCURRENCY")
            .unwrap_or_else(|_| "8".into())
            .parse()
            .expect("SEND_CONCURRENCY must be a valid usize");

        let send_timeout_secs: u64 = std::env::var("SEND_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("SEND_TIMEOUT_SECS must be a valid u64");

        Self {
            poll_interval: Duration::from_secs(poll_interval_secs),
            // A zero cap would stall the fan-out stream.
            send_concurrency: send_concurrency.max(1),
            send_timeout: Duration::from_secs(send_timeout_secs),
        }
    }

    /// The dispatcher tunables carried by this configuration.
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            send_concurrency: self.send_concurrency,
            send_timeout: self.send_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_environment() {
        let config = WorkerConfig::from_env();
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.send_concurrency, 8);
        assert_eq!(config.send_timeout, Duration::from_secs(10));

        let dispatcher = config.dispatcher_config();
        assert_eq!(dispatcher.send_concurrency, 8);
        assert_eq!(dispatcher.send_timeout, Duration::from_secs(10));
    }
}
