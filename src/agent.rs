use crate::config::AgentConfig;
use lambda_runtime::{Error, LambdaEvent};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, error, info, info_span};

/// The invocable function the agent wraps and hands back to the runtime.
pub type Invoke = Arc<dyn Fn(LambdaEvent<Value>) -> Result<Value, Error> + Send + Sync>;

/// The observability agent as seen by the wrapper.
pub trait TelemetryAgent: Send + Sync {
    /// Attaches a key/value pair to the current trace.
    fn add_custom_attribute(&self, key: &str, value: Value);

    /// Returns a function that instruments every call to `inner`.
    fn wrap(&self, inner: Invoke) -> Invoke;
}

/// An agent that reports traces through `tracing`.
///
/// Custom attributes are collected per invocation and logged together with the elapsed time
/// when the invocation ends.
#[derive(Clone)]
pub struct TracingAgent {
    config: Arc<AgentConfig>,
    attributes: Arc<Mutex<Map<String, Value>>>,
}

impl TracingAgent {
    pub fn new(config: AgentConfig) -> Self {
        info!(
            "Agent: app {}, distributed tracing {}",
            config.app_name.as_deref().unwrap_or("<unnamed>"),
            config.distributed_tracing_enabled
        );
        debug!(
            "Agent: trusted account key {:?}, no config file {}, serverless mode {:?}",
            config.trusted_account_key, config.no_config_file, config.serverless_mode_enabled
        );

        Self {
            config: Arc::new(config),
            attributes: Arc::new(Mutex::new(Map::new())),
        }
    }

    /// A copy of the attributes recorded for the current (or last) invocation.
    pub fn attributes(&self) -> Map<String, Value> {
        match self.attributes.lock() {
            Ok(attributes) => attributes.clone(),
            Err(_) => {
                error!("Poisoned lock on custom attributes. It's a bug");
                Map::new()
            }
        }
    }

    fn start_trace(&self) {
        if let Ok(mut attributes) = self.attributes.lock() {
            attributes.clear();
        } else {
            error!("Poisoned lock on custom attributes. It's a bug");
        }
    }

    fn end_trace(&self, started: Instant, result: &Result<Value, Error>) {
        let elapsed = started.elapsed();

        if let Err(e) = result {
            error!("Invocation failed: {e}");
        }

        let attributes = Value::Object(self.attributes());
        info!("Invocation finished in {}ms, attributes: {}", elapsed.as_millis(), attributes);
    }
}

impl TelemetryAgent for TracingAgent {
    fn add_custom_attribute(&self, key: &str, value: Value) {
        debug!("Custom attribute {key}={value}");

        if let Ok(mut attributes) = self.attributes.lock() {
            attributes.insert(key.to_string(), value);
        } else {
            error!("Poisoned lock on custom attributes. It's a bug");
        }
    }

    fn wrap(&self, inner: Invoke) -> Invoke {
        let agent = self.clone();

        Arc::new(move |event: LambdaEvent<Value>| {
            agent.start_trace();

            // the trace id is only propagated when distributed tracing is on
            let trace_id = if agent.config.distributed_tracing_enabled {
                event.context.xray_trace_id.clone().unwrap_or_default()
            } else {
                String::new()
            };

            let span = info_span!(
                "invocation",
                app = agent.config.app_name.as_deref().unwrap_or_default(),
                request_id = %event.context.request_id,
                trace_id = %trace_id,
            );
            let _guard = span.enter();

            let started = Instant::now();
            let result = inner(event);
            agent.end_trace(started, &result);

            result
        })
    }
}
