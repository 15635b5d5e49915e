use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::planner::PlannerPolicy;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub interview: InterviewConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

/// Planner and validator tunables. Defaults reproduce the shipped interview
/// behavior; every threshold is adjustable without a rebuild.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterviewConfig {
    pub checkpoint_interval: u32,
    pub checkpoint_min_completion_pct: u8,
    pub smart_exit_min_rounds: u32,
    pub smart_exit_min_completion_pct: u8,
    pub smart_exit_min_filled: usize,
    pub phrase_exit_min_rounds: u32,
    /// Whether medium-severity off-topic verdicts also trigger a correction.
    /// Off by default: only high severity corrects, medium is advisory.
    pub correct_medium_severity: bool,
    /// Number of recent transcript turns fed back into model context.
    pub history_window: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    DeepSeek,
    OpenAi,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                provider: LlmProvider::DeepSeek,
                api_key: None,
                base_url: "https://api.deepseek.com".to_string(),
                model: "deepseek-chat".to_string(),
                timeout_secs: 30,
                max_retries: 2,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            interview: InterviewConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl Default for InterviewConfig {
    fn default() -> Self {
        let policy = PlannerPolicy::default();
        Self {
            checkpoint_interval: policy.checkpoint_interval,
            checkpoint_min_completion_pct: policy.checkpoint_min_completion_pct,
            smart_exit_min_rounds: policy.smart_exit_min_rounds,
            smart_exit_min_completion_pct: policy.smart_exit_min_completion_pct,
            smart_exit_min_filled: policy.smart_exit_min_filled,
            phrase_exit_min_rounds: policy.phrase_exit_min_rounds,
            correct_medium_severity: false,
            history_window: 6,
        }
    }
}

impl InterviewConfig {
    pub fn planner_policy(&self) -> PlannerPolicy {
        PlannerPolicy {
            checkpoint_interval: self.checkpoint_interval,
            checkpoint_min_completion_pct: self.checkpoint_min_completion_pct,
            smart_exit_min_rounds: self.smart_exit_min_rounds,
            smart_exit_min_completion_pct: self.smart_exit_min_completion_pct,
            smart_exit_min_filled: self.smart_exit_min_filled,
            phrase_exit_min_rounds: self.phrase_exit_min_rounds,
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "deepseek" => Ok(Self::DeepSeek),
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected deepseek|openai|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    server: Option<ServerPatch>,
    interview: Option<InterviewPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct InterviewPatch {
    checkpoint_interval: Option<u32>,
    checkpoint_min_completion_pct: Option<u8>,
    smart_exit_min_rounds: Option<u32>,
    smart_exit_min_completion_pct: Option<u8>,
    smart_exit_min_filled: Option<usize>,
    phrase_exit_min_rounds: Option<u32>,
    correct_medium_severity: Option<bool>,
    history_window: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("retrospect.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(interview) = patch.interview {
            if let Some(checkpoint_interval) = interview.checkpoint_interval {
                self.interview.checkpoint_interval = checkpoint_interval;
            }
            if let Some(pct) = interview.checkpoint_min_completion_pct {
                self.interview.checkpoint_min_completion_pct = pct;
            }
            if let Some(rounds) = interview.smart_exit_min_rounds {
                self.interview.smart_exit_min_rounds = rounds;
            }
            if let Some(pct) = interview.smart_exit_min_completion_pct {
                self.interview.smart_exit_min_completion_pct = pct;
            }
            if let Some(filled) = interview.smart_exit_min_filled {
                self.interview.smart_exit_min_filled = filled;
            }
            if let Some(rounds) = interview.phrase_exit_min_rounds {
                self.interview.phrase_exit_min_rounds = rounds;
            }
            if let Some(correct) = interview.correct_medium_severity {
                self.interview.correct_medium_severity = correct;
            }
            if let Some(window) = interview.history_window {
                self.interview.history_window = window;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("RETROSPECT_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("RETROSPECT_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("RETROSPECT_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("RETROSPECT_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("RETROSPECT_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("RETROSPECT_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("RETROSPECT_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("RETROSPECT_LLM_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("RETROSPECT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("RETROSPECT_SERVER_PORT") {
            self.server.port = parse_u16("RETROSPECT_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("RETROSPECT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("RETROSPECT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("RETROSPECT_LOGGING_LEVEL").or_else(|| read_env("RETROSPECT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("RETROSPECT_LOGGING_FORMAT").or_else(|| read_env("RETROSPECT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = llm_base_url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_server(&self.server)?;
        validate_interview(&self.interview)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("retrospect.toml"), PathBuf::from("config/retrospect.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    let base_url = llm.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "llm.base_url must start with `http://` or `https://`".to_string(),
        ));
    }

    if llm.provider != LlmProvider::Ollama {
        let missing_key = llm
            .api_key
            .as_ref()
            .map(|key| key.expose_secret().is_empty())
            .unwrap_or(true);
        if missing_key {
            return Err(ConfigError::Validation(
                "llm.api_key is required for hosted providers (set RETROSPECT_LLM_API_KEY)"
                    .to_string(),
            ));
        }
    }

    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be nonzero".to_string()));
    }
    if server.graceful_shutdown_secs == 0 || server.graceful_shutdown_secs > 120 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be in range 1..=120".to_string(),
        ));
    }
    Ok(())
}

fn validate_interview(interview: &InterviewConfig) -> Result<(), ConfigError> {
    if interview.checkpoint_interval == 0 {
        return Err(ConfigError::Validation(
            "interview.checkpoint_interval must be at least 1".to_string(),
        ));
    }
    if interview.checkpoint_min_completion_pct > 100
        || interview.smart_exit_min_completion_pct > 100
    {
        return Err(ConfigError::Validation(
            "interview completion percentages must be in range 0..=100".to_string(),
        ));
    }
    if interview.history_window < 2 {
        return Err(ConfigError::Validation(
            "interview.history_window must be at least 2".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    const KNOWN_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
    let level = logging.level.trim().to_ascii_lowercase();
    if !KNOWN_LEVELS.contains(&level.as_str()) {
        return Err(ConfigError::Validation(format!(
            "logging.level `{level}` is not one of trace|debug|info|warn|error"
        )));
    }
    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.trim().parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}
