//! Runs a user-supplied Lambda handler under a telemetry agent.
//!
//! The handler is looked up by the `<module>.<export>` name in NEW_RELIC_LAMBDA_HANDLER.
//! Before it is called, the event is matched against known event source shapes and the
//! fields listed in CUSTOM_REQUEST_BODY_NAMES are recorded as custom attributes.
//!
//! ```no_run
//! use lambda_telemetry_wrapper::{Module, ModuleTable};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), lambda_runtime::Error> {
//!     let modules = ModuleTable::new().with_module(
//!         "index",
//!         Module::new().function("handler", |event, _iopipe| Ok(event.payload)),
//!     );
//!     lambda_telemetry_wrapper::run(modules).await
//! }
//! ```

use lambda_runtime::tower::Service;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

pub mod agent;
pub mod attributes;
pub mod config;
pub mod handlers;
pub mod iopipe;
pub mod wrapper;

pub use agent::{Invoke, TelemetryAgent, TracingAgent};
pub use config::{AgentConfig, Config, ConfigError};
pub use handlers::{resolve_handler, Export, Handler, HandlerError, Module, ModuleTable};
pub use iopipe::IoPipe;
pub use wrapper::Wrapper;

/// Starts the Lambda runtime with the handlers from `modules` wrapped by the tracing agent.
/// Reads the configuration from the environment.
pub async fn run(modules: ModuleTable) -> Result<(), Error> {
    init_tracing();

    let config = Config::from_env()?;
    let agent = Arc::new(TracingAgent::new(config.agent.clone()));
    let invoke = Wrapper::new(config, modules, agent).into_invoke();

    if let Err(e) = lambda_runtime::run(service(invoke)).await {
        debug!("Runtime error: {:?}", e);
        return Err(e);
    }

    Ok(())
}

/// Turns the instrumented function into a service the runtime can drive.
pub fn service(invoke: Invoke) -> impl Service<LambdaEvent<Value>, Response = Value, Error = Error> {
    service_fn(move |event: LambdaEvent<Value>| {
        let invoke = invoke.clone();
        async move { invoke(event) }
    })
}

/// Initializes the tracing from RUST_LOG env var if present or logs INFO for the wrapper only.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(
                    Directive::from_str("lambda_telemetry_wrapper=info").expect("Invalid logging filter. It's a bug."),
                )
                .from_env_lossy(),
        )
        // CloudWatch does not render colour codes
        .with_ansi(false)
        .with_target(false)
        .without_time()
        .compact()
        .init();
}
