use event_shapes::Registry;
use std::env::var;
use thiserror::Error;
use tracing::{debug, info};

/// Base directory used when LAMBDA_TASK_ROOT is not set
const DEFAULT_TASK_ROOT: &str = ".";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid EVENT_SOURCE_REGISTRY: {0}")]
    InvalidRegistry(#[from] serde_json::Error),
}

/// Settings handed over to the telemetry agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// NEW_RELIC_APP_NAME or the name of the function, e.g. `my-lambda`
    pub app_name: Option<String>,
    /// NEW_RELIC_DISTRIBUTED_TRACING_ENABLED, on unless set to anything but `true`
    pub distributed_tracing_enabled: bool,
    /// NEW_RELIC_NO_CONFIG_FILE, on unless set to anything but `true`.
    /// Informational only: `TracingAgent` logs it at startup and never reads config files.
    pub no_config_file: bool,
    /// NEW_RELIC_TRUSTED_ACCOUNT_KEY or NEW_RELIC_ACCOUNT_ID.
    /// Informational only: logged by `TracingAgent` at startup, does not filter traces.
    pub trusted_account_key: Option<String>,
    /// NEW_RELIC_SERVERLESS_MODE_ENABLED. Ignored when running inside Lambda (LAMBDA_TASK_ROOT is set).
    /// Informational only: logged by `TracingAgent` at startup, does not change how traces are reported.
    pub serverless_mode_enabled: Option<String>,
}

pub struct Config {
    /// E.g. `index.handler` from NEW_RELIC_LAMBDA_HANDLER.
    /// Checked on every invocation, so it is not required at startup.
    pub handler: Option<String>,
    /// E.g. /var/task
    pub task_root: String,
    /// Names of the fields copied from the request into custom attributes, from CUSTOM_REQUEST_BODY_NAMES
    pub custom_request_body_names: Vec<String>,
    /// Replacement for the standard event shapes, from EVENT_SOURCE_REGISTRY
    pub registry: Registry,
    pub agent: AgentConfig,
}

impl Config {
    /// Creates a new Config instance from the environment variables.
    /// Uses default values where possible.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| var(key).ok())
    }

    /// Builds the config from any source of variables.
    /// Empty values are treated the same as missing ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let handler = lookup("NEW_RELIC_LAMBDA_HANDLER");
        let task_root = lookup("LAMBDA_TASK_ROOT");

        let custom_request_body_names = lookup("CUSTOM_REQUEST_BODY_NAMES")
            .map(|names| split_names(&names))
            .unwrap_or_default();

        let registry = match lookup("EVENT_SOURCE_REGISTRY") {
            Some(json) => {
                let registry = Registry::from_json(&json)?;
                info!("Using {} event shapes from EVENT_SOURCE_REGISTRY", registry.len());
                registry
            }
            None => Registry::standard(),
        };

        let agent = AgentConfig {
            app_name: lookup("NEW_RELIC_APP_NAME").or_else(|| lookup("AWS_LAMBDA_FUNCTION_NAME")),
            distributed_tracing_enabled: flag(lookup("NEW_RELIC_DISTRIBUTED_TRACING_ENABLED")),
            no_config_file: flag(lookup("NEW_RELIC_NO_CONFIG_FILE")),
            trusted_account_key: lookup("NEW_RELIC_TRUSTED_ACCOUNT_KEY").or_else(|| lookup("NEW_RELIC_ACCOUNT_ID")),
            // inside Lambda the agent always runs in serverless mode
            serverless_mode_enabled: if task_root.is_some() {
                None
            } else {
                lookup("NEW_RELIC_SERVERLESS_MODE_ENABLED")
            },
        };

        debug!(
            "Handler: {:?}, task root: {:?}, body names: {:?}",
            handler, task_root, custom_request_body_names
        );

        Ok(Self {
            handler,
            task_root: task_root.unwrap_or_else(|| DEFAULT_TASK_ROOT.to_string()),
            custom_request_body_names,
            registry,
            agent,
        })
    }
}

/// Splits a comma-separated list, dropping blanks.
fn split_names(names: &str) -> Vec<String> {
    names
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Missing flags default to `true`.
fn flag(value: Option<String>) -> bool {
    value.map(|v| v.trim().eq_ignore_ascii_case("true")).unwrap_or(true)
}
