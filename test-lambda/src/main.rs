/// This is a basic lambda for trying out the wrapper.
/// Set NEW_RELIC_LAMBDA_HANDLER=index.handler to run `my_handler`.
use lambda_runtime::{Error, LambdaEvent};
use lambda_telemetry_wrapper::{IoPipe, Module, ModuleTable};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

#[derive(Deserialize, Debug)]
struct Request {
    command: String,
}

#[derive(Serialize)]
struct Response {
    req_id: String,
    msg: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let modules = ModuleTable::new().with_module(
        "index",
        Module::new()
            .function("handler", my_handler)
            .value("version", Value::from(env!("CARGO_PKG_VERSION"))),
    );

    lambda_telemetry_wrapper::run(modules).await
}

pub(crate) fn my_handler(event: LambdaEvent<Value>, iopipe: &IoPipe) -> Result<Value, Error> {
    info!("Handler invoked");

    // the wrapper passes the raw event through, so the handler parses it itself
    let request: Request = serde_json::from_value(event.payload)?;

    info!("Command received: {}", request.command);

    // still works, but logs a deprecation warning
    iopipe.label(&request.command);

    let resp = Response {
        req_id: event.context.request_id,
        msg: format!("Command {} executed.", request.command),
    };

    Ok(serde_json::to_value(resp)?)
}
