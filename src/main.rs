//! `auto-retry`: fetch JSON from a URL with retries and a circuit breaker.
//!
//! ```text
//! auto-retry <URL> [--max-attempts N] [--delay SECS]
//!                  [--failure-threshold N] [--recovery-timeout SECS]
//!                  [--config FILE]
//! ```
//!
//! Prints the decoded JSON to stdout. On failure prints a message to stderr
//! and exits with status 1; invalid configuration exits with status 2.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use url::Url;

use auto_retry::config::{load_config, validate_config, ResilienceConfig};
use auto_retry::http::HttpFetcher;
use auto_retry::observability::{logging, TracingSink};
use auto_retry::{retry, CircuitBreaker};

#[derive(Parser)]
#[command(name = "auto-retry")]
#[command(about = "Fetch JSON from a URL with retry logic", long_about = None)]
struct Cli {
    /// Endpoint to fetch data from.
    url: Url,

    /// Maximum number of attempts [default: 3]
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Initial delay in seconds before retrying [default: 1]. Fractions are
    /// allowed; any non-zero value below one millisecond counts as 1 ms.
    #[arg(long, value_parser = parse_seconds)]
    delay: Option<Duration>,

    /// Consecutive failures before the circuit opens [default: 3]
    #[arg(long)]
    failure_threshold: Option<u32>,

    /// Seconds before an open circuit closes again [default: 5]
    #[arg(long)]
    recovery_timeout: Option<u64>,

    /// TOML configuration file; flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn parse_seconds(raw: &str) -> Result<Duration, String> {
    let secs: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("{e}"))
}

/// Whole milliseconds, rounding a non-zero sub-millisecond delay up to 1.
fn delay_millis(delay: Duration) -> u64 {
    let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
    if millis == 0 && !delay.is_zero() {
        1
    } else {
        millis
    }
}

impl Cli {
    fn resolve_config(&self) -> Result<ResilienceConfig, String> {
        let mut config = match &self.config {
            Some(path) => load_config(path).map_err(|e| format!("{}: {e}", path.display()))?,
            None => ResilienceConfig::default(),
        };

        if let Some(max_attempts) = self.max_attempts {
            config.retry.max_attempts = max_attempts;
        }
        if let Some(delay) = self.delay {
            config.retry.initial_delay_ms = delay_millis(delay);
        }
        if let Some(threshold) = self.failure_threshold {
            config.circuit_breaker.failure_threshold = threshold;
        }
        if let Some(secs) = self.recovery_timeout {
            config.circuit_breaker.recovery_timeout_secs = secs;
        }

        validate_config(&config).map_err(|errors| {
            errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        })?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::from(2);
        }
    };

    if let Err(e) = logging::init_logging(&config.observability) {
        eprintln!("Failed to initialize logging: {e}");
    }

    fetch(&config, cli.url).await
}

/// Fetch `url` through the configured wrapper and print the JSON.
async fn fetch(config: &ResilienceConfig, url: Url) -> ExitCode {
    tracing::debug!(
        max_attempts = config.retry.max_attempts,
        initial_delay_ms = config.retry.initial_delay_ms,
        failure_threshold = config.circuit_breaker.failure_threshold,
        recovery_timeout_secs = config.circuit_breaker.recovery_timeout_secs,
        "Configuration loaded"
    );

    let fetcher = match HttpFetcher::new(&config.http) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            eprintln!("Failed to build HTTP client: {e}");
            return ExitCode::FAILURE;
        }
    };

    let fetch_data = retry(config.retry.clone(), |url: Url| {
        let fetcher = fetcher.clone();
        async move { fetcher.get_json(url).await }
    })
    .with_circuit_breaker(CircuitBreaker::new(config.circuit_breaker.clone()))
    .with_event_sink(Arc::new(TracingSink::named("fetch_data")));

    match fetch_data.call(url).await {
        Ok(data) => match serde_json::to_string_pretty(&data) {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to fetch data: {e}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            match e.failure() {
                Some(cause) if e.is_exhausted() => {
                    eprintln!("Failed to fetch data: {e}: {cause}")
                }
                _ => eprintln!("Failed to fetch data: {e}"),
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["auto-retry", "http://localhost/data"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_without_flags() {
        let config = parse(&[]).resolve_config().unwrap();
        assert_eq!(config, ResilienceConfig::default());
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "[retry]\nmax_attempts = 5\ninitial_delay_ms = 3000\n\n[circuit_breaker]\nfailure_threshold = 7\n"
        )
        .unwrap();
        let path = file.path().to_str().unwrap();

        let config = parse(&["--config", path, "--max-attempts", "2", "--delay", "0.5"])
            .resolve_config()
            .unwrap();

        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.initial_delay(), Duration::from_millis(500));
        // Not overridden, so the file value stands.
        assert_eq!(config.circuit_breaker.failure_threshold, 7);
    }

    #[test]
    fn test_zero_max_attempts_is_invalid() {
        let err = parse(&["--max-attempts", "0"]).resolve_config().unwrap_err();
        assert!(err.contains("retry.max_attempts"), "got {err}");
    }

    #[test]
    fn test_zero_delay_is_invalid() {
        let err = parse(&["--delay", "0"]).resolve_config().unwrap_err();
        assert!(err.contains("retry.initial_delay_ms"), "got {err}");
    }

    #[test]
    fn test_sub_millisecond_delay_rounds_up() {
        let config = parse(&["--delay", "0.0004"]).resolve_config().unwrap();
        assert_eq!(config.retry.initial_delay_ms, 1);
    }

    #[test]
    fn test_negative_or_malformed_delay_is_rejected() {
        for bad in ["-1", "soon", "NaN"] {
            let argv = ["auto-retry", "http://localhost/", "--delay", bad];
            assert!(Cli::try_parse_from(argv).is_err(), "accepted --delay {bad}");
        }
    }

    #[test]
    fn test_missing_config_file_is_invalid() {
        let err = parse(&["--config", "/nonexistent/auto-retry.toml"])
            .resolve_config()
            .unwrap_err();
        assert!(err.contains("auto-retry.toml"), "got {err}");
    }

    #[tokio::test]
    async fn test_unreachable_url_exits_with_failure() {
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let mut config = ResilienceConfig::default();
        config.retry.max_attempts = 2;
        config.retry.initial_delay_ms = 1;

        let url = Url::parse(&format!("http://{addr}/")).unwrap();

        assert_eq!(fetch(&config, url).await, ExitCode::FAILURE);
    }
}
