use crate::iopipe::IoPipe;
use lambda_runtime::{Error, LambdaEvent};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A user handler: takes the invocation and the legacy IOpipe handle, returns the response payload.
pub type Handler = Arc<dyn Fn(LambdaEvent<Value>, &IoPipe) -> Result<Value, Error> + Send + Sync>;

/// Anything a module can export under a name. Only functions can be used as handlers.
#[derive(Clone)]
pub enum Export {
    Function(Handler),
    Value(Value),
}

/// A named collection of exports, e.g. `index` exporting `handler`.
#[derive(Clone, Default)]
pub struct Module {
    exports: HashMap<String, Export>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exports a handler function under `name`.
    pub fn function<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(LambdaEvent<Value>, &IoPipe) -> Result<Value, Error> + Send + Sync + 'static,
    {
        self.exports.insert(name.to_string(), Export::Function(Arc::new(handler)));
        self
    }

    /// Exports a plain value under `name`.
    pub fn value(mut self, name: &str, value: Value) -> Self {
        self.exports.insert(name.to_string(), Export::Value(value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Export> {
        self.exports.get(name)
    }
}

/// All modules the function was built with, by module name.
#[derive(Clone, Default)]
pub struct ModuleTable {
    modules: HashMap<String, Module>,
}

impl ModuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, name: &str, module: Module) -> Self {
        self.modules.insert(name.to_string(), module);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HandlerError {
    #[error("No NEW_RELIC_LAMBDA_HANDLER environment variable set.")]
    NotConfigured,
    #[error("Improperly formatted handler environment variable: {0}")]
    Malformed(String),
    #[error("Unable to import module '{module}'")]
    ModuleNotFound { module: String },
    #[error("Handler '{handler}' missing on module '{module}'")]
    ExportMissing { module: String, handler: String },
    #[error("Handler '{handler}' from '{module}' is not a function")]
    NotCallable { module: String, handler: String },
}

/// Finds the user handler named by `<module>.<export>`, e.g. `index.handler`.
/// `task_root` is the directory the modules were packaged from and is only used for logging.
pub fn resolve_handler(handler: Option<&str>, task_root: &str, modules: &ModuleTable) -> Result<Handler, HandlerError> {
    let handler = handler.ok_or(HandlerError::NotConfigured)?;

    let (module_name, export_name) = match handler.split('.').collect::<Vec<&str>>().as_slice() {
        [module_name, export_name] => (module_name.to_string(), export_name.to_string()),
        _ => return Err(HandlerError::Malformed(handler.to_string())),
    };

    debug!("Importing {export_name} from {task_root}/{module_name}");

    let module = modules.get(&module_name).ok_or_else(|| HandlerError::ModuleNotFound {
        module: module_name.clone(),
    })?;

    match module.get(&export_name) {
        Some(Export::Function(f)) => Ok(f.clone()),
        Some(Export::Value(_)) => Err(HandlerError::NotCallable {
            module: module_name,
            handler: export_name,
        }),
        None => Err(HandlerError::ExportMissing {
            module: module_name,
            handler: export_name,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn modules() -> ModuleTable {
        ModuleTable::new().with_module(
            "index",
            Module::new()
                .function("handler", |event, _iopipe| Ok(event.payload))
                .value("version", json!("1.0")),
        )
    }

    fn resolve_err(handler: Option<&str>) -> HandlerError {
        match resolve_handler(handler, ".", &modules()) {
            Ok(_) => panic!("{handler:?} should not resolve"),
            Err(e) => e,
        }
    }

    #[test]
    fn resolves_exported_function() {
        assert!(resolve_handler(Some("index.handler"), "/var/task", &modules()).is_ok());
    }

    #[test]
    fn distinct_failures() {
        assert_eq!(resolve_err(None), HandlerError::NotConfigured);
        assert_eq!(resolve_err(Some("index")), HandlerError::Malformed("index".to_string()));
        assert_eq!(
            resolve_err(Some("lib.index.handler")),
            HandlerError::Malformed("lib.index.handler".to_string())
        );
        assert_eq!(
            resolve_err(Some("missing.handler")),
            HandlerError::ModuleNotFound {
                module: "missing".to_string()
            }
        );
        assert_eq!(
            resolve_err(Some("index.other")),
            HandlerError::ExportMissing {
                module: "index".to_string(),
                handler: "other".to_string()
            }
        );
        assert_eq!(
            resolve_err(Some("index.version")),
            HandlerError::NotCallable {
                module: "index".to_string(),
                handler: "version".to_string()
            }
        );
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            resolve_err(None).to_string(),
            "No NEW_RELIC_LAMBDA_HANDLER environment variable set."
        );
        assert_eq!(
            resolve_err(Some("a.b.c")).to_string(),
            "Improperly formatted handler environment variable: a.b.c"
        );
        assert_eq!(resolve_err(Some("nope.handler")).to_string(), "Unable to import module 'nope'");
        assert_eq!(
            resolve_err(Some("index.other")).to_string(),
            "Handler 'other' missing on module 'index'"
        );
        assert_eq!(
            resolve_err(Some("index.version")).to_string(),
            "Handler 'version' from 'index' is not a function"
        );
    }
}
