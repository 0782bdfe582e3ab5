use clap::Parser;
use std::env;
use url::Url;

/// # Relay Configuration
///
/// Configuration from command-line arguments, environment variables, and an
/// optional .env file. Environment names match the original deployment so an
/// existing Grok IDE .env keeps working.
#[derive(Debug, Clone, Parser)]
#[command(name = "grok-relay")]
#[command(about = "Streaming relay between the Grok IDE front-end and the xAI chat-completions API")]
#[command(version)]
pub struct Config {
    // =========================================================================
    // SERVER
    // =========================================================================
    /// Server port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Server host to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    // =========================================================================
    // UPSTREAM (xAI)
    // =========================================================================
    /// xAI API key (bearer token). Requests fail with 503 when absent.
    #[arg(long, env = "XAI_API_KEY")]
    pub api_key: Option<String>,

    /// Base URL of the xAI API
    #[arg(long, env = "XAI_BASE_URL", default_value = "https://api.x.ai/v1")]
    pub base_url: String,

    /// Upstream request timeout in seconds
    #[arg(long, env = "XAI_TIMEOUT", default_value = "120")]
    pub upstream_timeout: u64,

    /// Bounded transport-level retries for network errors and upstream 5xx
    #[arg(long, env = "XAI_RETRIES", default_value = "3")]
    pub upstream_retries: u32,

    /// Linear backoff base between retries, in milliseconds
    #[arg(long, env = "XAI_RETRY_BACKOFF_MS", default_value = "1000")]
    pub retry_backoff_ms: u64,

    /// Default text chat model
    #[arg(long, env = "XAI_CHAT_MODEL", default_value = "grok-4-0709")]
    pub chat_model: String,

    /// Vision-capable model used when messages carry image parts
    #[arg(long, env = "XAI_VISION_MODEL", default_value = "grok-vision-beta")]
    pub vision_model: String,

    /// Image generation model
    #[arg(long, env = "XAI_IMAGE_MODEL", default_value = "grok-2-image")]
    pub image_model: String,

    // =========================================================================
    // COMPLETION DEFAULTS
    // =========================================================================
    /// Default sampling temperature when the request omits one
    #[arg(long, env = "AI_DEFAULT_TEMPERATURE", default_value = "0.7")]
    pub default_temperature: f32,

    /// Default max-token budget when the request omits one
    #[arg(long, env = "AI_DEFAULT_MAX_TOKENS", default_value = "8000")]
    pub default_max_tokens: u32,

    /// Whether streaming responses are enabled at all
    #[arg(long, env = "AI_STREAMING_ENABLED", default_value = "true")]
    pub streaming_enabled: bool,

    /// Safety timeout for a streaming response, in seconds. A stream with no
    /// terminal marker by this deadline triggers the single fallback call.
    #[arg(long, env = "STREAM_TIMEOUT", default_value = "30")]
    pub stream_timeout: u64,

    // =========================================================================
    // PAYLOAD-SIZE TOKEN SCALING
    //
    // Tunable heuristic: larger serialized contexts get a proportionally
    // larger completion budget, capped. The numbers are not load-bearing.
    // =========================================================================
    /// Serialized-messages size (chars) above which the medium scale applies
    #[arg(long, env = "AI_PAYLOAD_MEDIUM_THRESHOLD", default_value = "50000")]
    pub payload_medium_threshold: usize,

    /// Serialized-messages size (chars) above which the large scale applies
    #[arg(long, env = "AI_PAYLOAD_LARGE_THRESHOLD", default_value = "100000")]
    pub payload_large_threshold: usize,

    /// Multiplier applied above the medium threshold
    #[arg(long, env = "AI_MEDIUM_TOKEN_SCALE", default_value = "1.5")]
    pub medium_token_scale: f32,

    /// Multiplier applied above the large threshold
    #[arg(long, env = "AI_LARGE_TOKEN_SCALE", default_value = "2.0")]
    pub large_token_scale: f32,

    /// Token cap for the medium scale
    #[arg(long, env = "AI_MEDIUM_TOKEN_CAP", default_value = "12000")]
    pub medium_token_cap: u32,

    /// Token cap for the large scale
    #[arg(long, env = "AI_LARGE_TOKEN_CAP", default_value = "16000")]
    pub large_token_cap: u32,

    // =========================================================================
    // LOGGING / SECURITY
    // =========================================================================
    /// Log level filter (error, warn, info, debug, trace)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// CORS origin (use * for development only)
    #[arg(long, env = "CORS_ORIGIN", default_value = "*")]
    pub cors_origin: String,
}

impl Config {
    /// Parse configuration from CLI arguments, environment variables, and a
    /// .env file if present, then set up logging and validate.
    pub fn parse_args() -> Self {
        let _ = dotenv::dotenv();

        let config = Self::parse();

        config.setup_logging();

        if let Err(err) = config.validate() {
            eprintln!("Configuration validation failed: {}", err);
            std::process::exit(1);
        }

        config
    }

    /// Minimal configuration for tests. No API key; tests that hit an
    /// upstream set `api_key` and `base_url` themselves.
    pub fn for_test() -> Self {
        Self {
            port: 3000,
            host: "127.0.0.1".to_string(),
            api_key: None,
            base_url: "http://localhost:8000/v1".to_string(),
            upstream_timeout: 30,
            upstream_retries: 0,
            retry_backoff_ms: 1,
            chat_model: "grok-4-0709".to_string(),
            vision_model: "grok-vision-beta".to_string(),
            image_model: "grok-2-image".to_string(),
            default_temperature: 0.7,
            default_max_tokens: 8000,
            streaming_enabled: true,
            stream_timeout: 30,
            payload_medium_threshold: 50_000,
            payload_large_threshold: 100_000,
            medium_token_scale: 1.5,
            large_token_scale: 2.0,
            medium_token_cap: 12_000,
            large_token_cap: 16_000,
            log_level: "info".to_string(),
            cors_origin: "*".to_string(),
        }
    }

    /// Initialize the tracing subscriber from the configured filter.
    fn setup_logging(&self) {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", &self.log_level);
        }

        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&self.log_level)),
            )
            .with_target(false)
            .try_init();
    }

    /// Validate configuration values with helpful messages. Hard errors for
    /// values that cannot work; warnings for values that are merely suspect.
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("Port cannot be 0. Please specify a valid port number (1-65535).".to_string());
        }

        if self.host.is_empty() {
            return Err("Host cannot be empty.".to_string());
        }

        if self.api_key.is_none() {
            eprintln!(
                "Warning: XAI_API_KEY is not set. AI endpoints will respond with 503 \
                until a key is configured."
            );
        }

        match Url::parse(&self.base_url) {
            Ok(url) => {
                if !["http", "https"].contains(&url.scheme()) {
                    return Err(format!(
                        "Invalid URL scheme '{}'. Only 'http' and 'https' are supported.",
                        url.scheme()
                    ));
                }
                if url.host().is_none() {
                    return Err(
                        "Base URL must include a host (e.g. 'https://api.x.ai/v1').".to_string()
                    );
                }
            }
            Err(err) => {
                return Err(format!(
                    "Invalid base URL '{}': {}. Please provide a valid URL.",
                    self.base_url, err
                ));
            }
        }

        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(format!(
                "Default temperature {} is out of range. Must be between 0.0 and 2.0.",
                self.default_temperature
            ));
        }

        if self.default_max_tokens == 0 {
            return Err("Default max tokens must be at least 1.".to_string());
        }

        if self.upstream_timeout == 0 {
            return Err("Upstream timeout must be greater than 0 seconds.".to_string());
        }

        if self.stream_timeout == 0 {
            return Err("Stream safety timeout must be greater than 0 seconds.".to_string());
        }

        if self.payload_medium_threshold >= self.payload_large_threshold {
            return Err(format!(
                "Payload medium threshold ({}) must be below the large threshold ({}).",
                self.payload_medium_threshold, self.payload_large_threshold
            ));
        }

        if self.medium_token_scale < 1.0 || self.large_token_scale < 1.0 {
            return Err("Token scale multipliers must be at least 1.0.".to_string());
        }

        if self.medium_token_cap > self.large_token_cap {
            eprintln!(
                "Warning: medium token cap ({}) exceeds large token cap ({}).",
                self.medium_token_cap, self.large_token_cap
            );
        }

        if self.upstream_retries > 10 {
            eprintln!(
                "Warning: {} upstream retries is very high; requests may hang for a long time.",
                self.upstream_retries
            );
        }

        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        let base_level = self.log_level.split(',').next().unwrap_or("");
        if !valid_log_levels.contains(&base_level) && !self.log_level.contains('=') {
            return Err(format!(
                "Invalid log level '{}'. Valid options are: {}",
                self.log_level,
                valid_log_levels.join(", ")
            ));
        }

        Ok(())
    }

    /// Base URL without a trailing slash, ready for path concatenation.
    pub fn base_url_trimmed(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Listen address built from the configured host and port.
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, String> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|err| {
                format!(
                    "Invalid listen address '{}:{}': {}",
                    self.host, self.port, err
                )
            })
    }
}
