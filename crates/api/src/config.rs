use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use hookd_worker::QueueCapacity;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a valid {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("NB_WORKERS must be at least 1")]
    NoWorkers,
}

/// Server configuration loaded from environment variables.
///
/// Read once at startup and never re-read. In production, override the
/// defaults via environment variables (or a `.env` file).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// Worker pool size (default: `2`).
    pub nb_workers: usize,
    /// Job queue bound, `0` for unbounded (default: `1024`).
    pub queue_capacity: usize,
    /// Default per-job timeout in seconds (default: `10`).
    pub hook_timeout_secs: u64,
    /// Root directory of hook scripts (default: `scripts`).
    pub scripts_dir: PathBuf,
    /// Directory for per-job output logs. Logging is disabled when unset.
    pub hook_log_dir: Option<PathBuf>,
    /// HMAC-SHA256 secret. When set, every trigger must be signed.
    pub hook_secret: Option<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Overall graceful shutdown deadline in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Deadline for the HTTP listener to stop, in seconds (default: `10`).
    pub listener_shutdown_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default   |
    /// |----------------------------------|-----------|
    /// | `HOST`                           | `0.0.0.0` |
    /// | `PORT`                           | `8080`    |
    /// | `NB_WORKERS`                     | `2`       |
    /// | `QUEUE_CAPACITY`                 | `1024`    |
    /// | `HOOK_TIMEOUT_SECS`              | `10`      |
    /// | `SCRIPTS_DIR`                    | `scripts` |
    /// | `HOOK_LOG_DIR`                   | unset     |
    /// | `HOOK_SECRET`                    | unset     |
    /// | `REQUEST_TIMEOUT_SECS`           | `30`      |
    /// | `SHUTDOWN_TIMEOUT_SECS`          | `30`      |
    /// | `LISTENER_SHUTDOWN_TIMEOUT_SECS` | `10`      |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let nb_workers: usize = parse(&lookup, "NB_WORKERS", "2", "usize")?;
        if nb_workers == 0 {
            return Err(ConfigError::NoWorkers);
        }

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse(&lookup, "PORT", "8080", "u16")?,
            nb_workers,
            queue_capacity: parse(&lookup, "QUEUE_CAPACITY", "1024", "usize")?,
            hook_timeout_secs: parse(&lookup, "HOOK_TIMEOUT_SECS", "10", "u64")?,
            scripts_dir: lookup("SCRIPTS_DIR")
                .unwrap_or_else(|| "scripts".into())
                .into(),
            hook_log_dir: non_empty("HOOK_LOG_DIR").map(PathBuf::from),
            hook_secret: non_empty("HOOK_SECRET"),
            request_timeout_secs: parse(&lookup, "REQUEST_TIMEOUT_SECS", "30", "u64")?,
            shutdown_timeout_secs: parse(&lookup, "SHUTDOWN_TIMEOUT_SECS", "30", "u64")?,
            listener_shutdown_timeout_secs: parse(
                &lookup,
                "LISTENER_SHUTDOWN_TIMEOUT_SECS",
                "10",
                "u64",
            )?,
        })
    }

    /// Resolve `HOST:PORT` to the address the listener binds. `HOST` may be
    /// an IP literal or a name such as `localhost`.
    pub async fn listen_addr(&self) -> io::Result<SocketAddr> {
        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("HOST '{}' did not resolve to any address", self.host),
                )
            })
    }

    pub fn queue_capacity(&self) -> QueueCapacity {
        QueueCapacity::from_config(self.queue_capacity)
    }

    pub fn hook_timeout(&self) -> Duration {
        Duration::from_secs(self.hook_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn listener_shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.listener_shutdown_timeout_secs)
    }
}

fn parse<T, F>(
    lookup: &F,
    var: &'static str,
    default: &str,
    expected: &'static str,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(var).unwrap_or_else(|| default.to_string());
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        expected,
        value,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
