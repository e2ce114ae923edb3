//! Server configuration
//!
//! Every setting is a CLI flag backed by an environment variable. Files given
//! with `--env-file` are loaded into the environment before the flags are
//! parsed, so they behave exactly like exported variables (already-exported
//! variables win).

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use url::Url;

use crate::stripe::client::DEFAULT_API_BASE;

/// Configuration errors that prevent startup
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),
}

/// Donation server configuration
#[derive(Parser, Clone)]
#[command(name = "donation-server")]
#[command(version)]
#[command(about = "Stripe donation backend with Kafka notifications")]
pub struct Config {
    /// Env files loaded before the rest of the configuration
    #[arg(long = "env-file", value_name = "PATH")]
    pub env_files: Vec<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "4242")]
    pub port: u16,

    /// Host to bind to
    #[arg(short = 'H', long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Stripe publishable key handed to the browser
    #[arg(long, env = "STRIPE_PUBLISHABLE_KEY", hide_env_values = true)]
    pub stripe_publishable_key: String,

    /// Stripe secret API key
    #[arg(long, env = "STRIPE_SECRET_KEY", hide_env_values = true)]
    pub stripe_secret_key: String,

    /// Webhook endpoint signing secret (whsec_...)
    #[arg(long, env = "STRIPE_WEBHOOK_SECRET", hide_env_values = true, default_value = "")]
    pub stripe_webhook_secret: String,

    /// Stripe API base URL
    #[arg(long, env = "STRIPE_API_BASE", default_value = DEFAULT_API_BASE)]
    pub stripe_api_base: String,

    /// Timeout for Stripe API calls in milliseconds
    #[arg(long, env = "STRIPE_TIMEOUT_MS", default_value = "10000")]
    pub stripe_timeout_ms: u64,

    /// Accepted clock skew for webhook signatures in seconds
    #[arg(long, env = "STRIPE_SIGNATURE_TOLERANCE_SECS", default_value = "300")]
    pub signature_tolerance_secs: u64,

    /// Currency for payment intents
    #[arg(long, env = "DONATION_CURRENCY", default_value = "eur")]
    pub currency: String,

    /// Kafka REST endpoint; without it the webhook route is disabled
    #[arg(long, env = "KAFKA_REST_URL")]
    pub kafka_rest_url: Option<Url>,

    /// Topic donation events are written to
    #[arg(long, env = "CUSTOMERS_TOPIC", default_value = "donations")]
    pub customers_topic: String,

    /// Kafka REST username
    #[arg(long, env = "KAFKA_USERNAME")]
    pub kafka_username: Option<String>,

    /// Kafka REST password
    #[arg(long, env = "KAFKA_PASSWORD", hide_env_values = true)]
    pub kafka_password: Option<String>,

    /// Upper bound for publishing one donation event in milliseconds
    #[arg(long, env = "PUBLISH_TIMEOUT_MS", default_value = "500")]
    pub publish_timeout_ms: u64,

    /// Allowed CORS origins (comma separated, `*` for any)
    #[arg(long = "cors-origin", env = "CORS_ALLOWED_ORIGINS", value_delimiter = ',', default_value = "*")]
    pub cors_origins: Vec<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Load env files named on the command line, then parse the full configuration.
    pub fn load() -> Self {
        let args = std::env::args_os().skip(1).filter_map(|a| a.into_string().ok());
        for path in env_files_from_args(args) {
            if let Err(e) = dotenvy::from_path(&path) {
                // Logging is not initialized yet
                eprintln!("Error loading {}: {}", path.display(), e);
            }
        }
        Self::parse()
    }

    /// Check the settings the server cannot run without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stripe_publishable_key.trim().is_empty() {
            return Err(ConfigError::Empty("STRIPE_PUBLISHABLE_KEY"));
        }
        if self.stripe_secret_key.trim().is_empty() {
            return Err(ConfigError::Empty("STRIPE_SECRET_KEY"));
        }
        if self.customers_topic.trim().is_empty() {
            return Err(ConfigError::Empty("CUSTOMERS_TOPIC"));
        }
        self.listen_addr()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(format!("{}:{}", self.host, self.port)))
    }

    pub fn stripe_timeout(&self) -> Duration {
        Duration::from_millis(self.stripe_timeout_ms)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }

    pub fn signature_tolerance(&self) -> Duration {
        Duration::from_secs(self.signature_tolerance_secs)
    }

    pub fn webhook_enabled(&self) -> bool {
        self.kafka_rest_url.is_some()
    }
}

/// Every `--env-file <path>` and `--env-file=<path>` in argv order, up to `--`.
///
/// Runs before clap so the files can supply values for required flags.
fn env_files_from_args<I>(args: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = String>,
{
    let mut files = Vec::new();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--" {
            break;
        }
        if arg == "--env-file" {
            if let Some(path) = args.next() {
                files.push(PathBuf::from(path));
            }
        } else if let Some(path) = arg.strip_prefix("--env-file=") {
            files.push(PathBuf::from(path));
        }
    }
    files
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("stripe_publishable_key", &self.stripe_publishable_key)
            .field("stripe_secret_key", &"[REDACTED]")
            .field("stripe_webhook_secret", &"[REDACTED]")
            .field("stripe_api_base", &self.stripe_api_base)
            .field("currency", &self.currency)
            .field("kafka_rest_url", &self.kafka_rest_url.as_ref().map(Url::as_str))
            .field("customers_topic", &self.customers_topic)
            .field("kafka_username", &self.kafka_username)
            .field("publish_timeout_ms", &self.publish_timeout_ms)
            .field("cors_origins", &self.cors_origins)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec![
            "donation-server",
            "--stripe-publishable-key",
            "pk_test_1",
            "--stripe-secret-key",
            "sk_test_1",
        ];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);
        assert_eq!(config.port, 4242);
        assert_eq!(config.currency, "eur");
        assert_eq!(config.publish_timeout(), Duration::from_millis(500));
        assert_eq!(config.signature_tolerance(), Duration::from_secs(300));
        assert_eq!(config.cors_origins, vec!["*".to_string()]);
        assert!(!config.webhook_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_kafka_url_enables_webhook() {
        let config = parse(&["--kafka-rest-url", "https://broker.example.com"]);
        assert!(config.webhook_enabled());
    }

    #[test]
    fn test_cors_origin_list() {
        let config = parse(&["--cors-origin", "https://a.example,https://b.example"]);
        assert_eq!(config.cors_origins.len(), 2);
    }

    #[test]
    fn test_empty_publishable_key_rejected() {
        let mut config = parse(&[]);
        config.stripe_publishable_key = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Empty("STRIPE_PUBLISHABLE_KEY"))
        ));
    }

    #[test]
    fn test_invalid_host_rejected() {
        let config = parse(&["--host", "not a host"]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidAddress(_))
        ));
    }

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_env_files_after_other_flags() {
        let files = env_files_from_args(argv(&["--port", "5000", "--env-file", "a.env"]));
        assert_eq!(files, vec![PathBuf::from("a.env")]);
    }

    #[test]
    fn test_env_files_repeated_and_interleaved() {
        let files = env_files_from_args(argv(&[
            "--env-file",
            "a.env",
            "--verbose",
            "--env-file=b.env",
            "--currency",
            "usd",
            "--env-file",
            "c.env",
        ]));
        assert_eq!(
            files,
            vec![
                PathBuf::from("a.env"),
                PathBuf::from("b.env"),
                PathBuf::from("c.env")
            ]
        );
    }

    #[test]
    fn test_env_files_stop_at_double_dash() {
        let files = env_files_from_args(argv(&["--env-file", "a.env", "--", "--env-file", "b.env"]));
        assert_eq!(files, vec![PathBuf::from("a.env")]);
    }

    #[test]
    fn test_env_files_match_clap() {
        let config = parse(&["--port", "5000", "--env-file", "a.env", "--env-file=b.env"]);
        assert_eq!(config.env_files, vec![PathBuf::from("a.env"), PathBuf::from("b.env")]);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = parse(&["--stripe-webhook-secret", "whsec_very_secret"]);
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk_test_1"));
        assert!(!rendered.contains("whsec_very_secret"));
    }
}
