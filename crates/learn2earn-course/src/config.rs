//! Configuration types for Learn2Earn.
//!
//! Settings are read from `learn2earn.json` in camelCase. Every field has a
//! default, so an empty object or a missing file yields a working setup.

use std::path::{Path, PathBuf};

use learn2earn_chain::abi::parse_address;
use learn2earn_chain::contract::DEFAULT_CONTRACT_ADDRESS;
use learn2earn_chain::thor::DEFAULT_NODE_URL;
use serde::{Deserialize, Serialize};

use crate::error::{CourseError, Result};

/// The default config file name.
pub const CONFIG_FILE_NAME: &str = "learn2earn.json";

/// Upper bound for the artificial delay before a run.
const MAX_RUN_DELAY_MS: u64 = 5000;

/// Default backend port.
const fn default_port() -> u16 {
    3001
}

/// Default loading delay shown before a run, in milliseconds.
const fn default_run_delay_ms() -> u64 {
    300
}

/// Default reward text shown on course completion.
fn default_reward_label() -> String {
    "10 B3TR".to_string()
}

fn default_contract_address() -> String {
    DEFAULT_CONTRACT_ADDRESS.to_string()
}

fn default_node_url() -> String {
    DEFAULT_NODE_URL.to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

const fn default_generator_timeout() -> u64 {
    60
}

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Port the backend listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory with additional course JSON files.
    #[serde(default)]
    pub courses_dir: Option<PathBuf>,

    /// Loading delay before each run, in milliseconds.
    #[serde(default = "default_run_delay_ms")]
    pub run_delay_ms: u64,

    /// Learn2Earn contract settings.
    #[serde(default)]
    pub contract: ContractConfig,

    /// AI course generator settings.
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Reward text shown when a course is complete.
    #[serde(default = "default_reward_label")]
    pub reward_label: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            courses_dir: None,
            run_delay_ms: default_run_delay_ms(),
            contract: ContractConfig::default(),
            generator: GeneratorConfig::default(),
            reward_label: default_reward_label(),
        }
    }
}

impl Config {
    /// Loads `learn2earn.json` from the current working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is invalid.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            CourseError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads `learn2earn.json` from `dir`, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is invalid.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::ConfigParseError` if the file cannot be read or
    /// holds invalid JSON, and `CourseError::ConfigValidationError` if a value
    /// is out of range.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(CourseError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| CourseError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::ConfigValidationError` for the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(CourseError::config_validation(
                "port must be greater than 0",
                "Set port to a free TCP port in your learn2earn.json (default 3001)",
            ));
        }

        if self.run_delay_ms > MAX_RUN_DELAY_MS {
            return Err(CourseError::config_validation(
                format!("runDelayMs must be at most {MAX_RUN_DELAY_MS}"),
                "Lower runDelayMs in your learn2earn.json",
            ));
        }

        if parse_address(&self.contract.address).is_err() {
            return Err(CourseError::config_validation(
                format!("contract.address '{}' is not a 20-byte hex address", self.contract.address),
                "Use a 0x-prefixed address with 40 hex digits",
            ));
        }

        if self.contract.node_url.trim().is_empty() {
            return Err(CourseError::config_validation(
                "contract.nodeUrl must not be empty",
                "Provide a Thor node URL in your learn2earn.json",
            ));
        }

        if self.generator.timeout_seconds == 0 {
            return Err(CourseError::config_validation(
                "generator.timeoutSeconds must be greater than 0",
                "Set generator.timeoutSeconds to at least 1 second in your learn2earn.json",
            ));
        }

        for (field, value) in [
            ("generator.model", &self.generator.model),
            ("generator.endpoint", &self.generator.endpoint),
            ("generator.apiKeyEnv", &self.generator.api_key_env),
        ] {
            if value.trim().is_empty() {
                return Err(CourseError::config_validation(
                    format!("{field} must not be empty"),
                    format!("Remove {field} from your learn2earn.json to use the default"),
                ));
            }
        }

        Ok(())
    }
}

/// Where the Learn2Earn contract lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractConfig {
    /// Contract address.
    #[serde(default = "default_contract_address")]
    pub address: String,

    /// Thor node used for read calls.
    #[serde(default = "default_node_url")]
    pub node_url: String,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: default_contract_address(),
            node_url: default_node_url(),
        }
    }
}

/// AI course generator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorConfig {
    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,

    /// API base URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Request timeout in seconds.
    #[serde(default = "default_generator_timeout")]
    pub timeout_seconds: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: default_endpoint(),
            api_key_env: default_api_key_env(),
            timeout_seconds: default_generator_timeout(),
        }
    }
}

impl GeneratorConfig {
    /// Reads the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}
