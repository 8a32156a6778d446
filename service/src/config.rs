use clap::builder::TypedValueParser as _;
use clap::Parser;
use delivery::RetryConfig;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        default_value = "http://localhost:3000,https://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 4000)]
    pub port: u16,

    /// Seconds between heartbeat frames on each open event stream
    #[arg(long, env, default_value_t = 15)]
    pub heartbeat_interval_secs: u64,

    /// Maximum delivery attempts per outbound provider call
    #[arg(long, env, default_value_t = 3)]
    pub delivery_max_attempts: u32,

    /// Backoff delay in milliseconds before the first delivery retry
    #[arg(long, env, default_value_t = 1200)]
    pub delivery_initial_delay_ms: u64,

    /// Upper bound in milliseconds for any single backoff delay
    #[arg(long, env, default_value_t = 5000)]
    pub delivery_max_delay_ms: u64,

    /// Multiplier applied to the backoff delay after each failed attempt
    #[arg(long, env, default_value_t = 1.75)]
    pub delivery_backoff_factor: f64,

    /// Static bearer credentials for the event stream, as a comma-separated
    /// list of `recipient=token` pairs. Development/seed use only; production
    /// deployments plug in their own credential verifier.
    #[arg(long, env, value_delimiter = ',')]
    stream_tokens: Option<Vec<String>>,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    /// Interval between heartbeat frames per open stream session.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Retry tuning for outbound deliveries. Values below the policy's sane
    /// floors are clamped when the policy is built.
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.delivery_max_attempts,
            initial_delay: Duration::from_millis(self.delivery_initial_delay_ms),
            max_delay: Duration::from_millis(self.delivery_max_delay_ms),
            backoff_factor: self.delivery_backoff_factor,
        }
    }

    /// Configured `recipient=token` stream credentials, if any.
    pub fn stream_tokens(&self) -> &[String] {
        self.stream_tokens.as_deref().unwrap_or(&[])
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}
