use crate::agent::{Invoke, TelemetryAgent};
use crate::attributes::{event_source_attributes, request_attributes};
use crate::config::Config;
use crate::handlers::{resolve_handler, ModuleTable};
use crate::iopipe::IoPipe;
use event_shapes::detect;
use lambda_runtime::{Error, LambdaEvent};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};

/// Sits between the runtime and the user handler.
pub struct Wrapper {
    config: Config,
    modules: ModuleTable,
    agent: Arc<dyn TelemetryAgent>,
}

impl Wrapper {
    pub fn new(config: Config, modules: ModuleTable, agent: Arc<dyn TelemetryAgent>) -> Self {
        Self { config, modules, agent }
    }

    /// Tags the trace with attributes taken from the event, then passes the event
    /// on to the user handler and returns whatever it returns.
    pub fn invoke(&self, event: LambdaEvent<Value>) -> Result<Value, Error> {
        let detection = detect(&event.payload, &self.config.registry);
        debug!("Detected event type: {}", detection.name());

        let attributes = event_source_attributes(&event.payload, &detection).into_iter().chain(request_attributes(
            &event.payload,
            &detection,
            &self.config.custom_request_body_names,
        ));
        for (key, value) in attributes {
            self.agent.add_custom_attribute(&key, value);
        }

        // resolved on every call so a misconfigured handler fails the invocation rather than the runtime
        let handler = match resolve_handler(self.config.handler.as_deref(), &self.config.task_root, &self.modules) {
            Ok(v) => v,
            Err(e) => {
                error!("{e}");
                return Err(Error::from(e));
            }
        };

        let iopipe = IoPipe::new(self.agent.clone());
        handler(event, &iopipe)
    }

    /// Converts the wrapper into a function instrumented by the agent.
    pub fn into_invoke(self) -> Invoke {
        let agent = self.agent.clone();
        let wrapper = Arc::new(self);

        agent.wrap(Arc::new(move |event: LambdaEvent<Value>| wrapper.invoke(event)))
    }
}
