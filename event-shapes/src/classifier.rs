use crate::path::resolve;
use crate::registry::{EventShape, Registry};
use serde_json::Value;
use tracing::debug;

/// Name reported for events that match no registered shape.
pub const UNKNOWN: &str = "unknown";

/// Outcome of [detect]. Not matching anything is a normal result, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection<'r> {
    Shape(&'r EventShape),
    Unknown,
}

impl<'r> Detection<'r> {
    /// The shape name or `unknown`.
    pub fn name(&self) -> &str {
        match self {
            Detection::Shape(shape) => &shape.name,
            Detection::Unknown => UNKNOWN,
        }
    }

    pub fn shape(&self) -> Option<&'r EventShape> {
        match self {
            Detection::Shape(shape) => Some(*shape),
            Detection::Unknown => None,
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.shape().map(|s| s.name == name).unwrap_or(false)
    }
}

/// True if every required key of `shape` resolves to a non-null value in `event`.
/// A shape with no required keys matches anything.
pub fn matches(event: &Value, shape: &EventShape) -> bool {
    shape
        .required_keys
        .iter()
        .all(|path| resolve(event, path).map(|v| !v.is_null()).unwrap_or(false))
}

/// Returns the first shape in `registry` that `event` matches.
pub fn detect<'r>(event: &Value, registry: &'r Registry) -> Detection<'r> {
    match registry.iter().find(|shape| matches(event, shape)) {
        Some(shape) => {
            debug!("Event shape: {}", shape.name);
            Detection::Shape(shape)
        }
        None => {
            debug!("Event shape: {UNKNOWN}");
            Detection::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::API_GATEWAY;
    use serde_json::json;

    fn api_gateway_event() -> Value {
        json!({
            "headers": {},
            "httpMethod": "GET",
            "path": "/",
            "requestContext": {"stage": "prod"}
        })
    }

    #[test]
    fn detects_api_gateway() {
        let registry = Registry::standard();
        let detection = detect(&api_gateway_event(), &registry);

        assert!(detection.is(API_GATEWAY));
        assert_eq!(detection.name(), API_GATEWAY);
    }

    #[test]
    fn missing_stage_is_unknown() {
        let registry = Registry::standard();
        let mut event = api_gateway_event();
        event["requestContext"] = json!({});

        assert_eq!(detect(&event, &registry), Detection::Unknown);
        assert_eq!(detect(&event, &registry).name(), UNKNOWN);
    }

    #[test]
    fn null_value_does_not_satisfy_required_key() {
        let registry = Registry::standard();
        let mut event = api_gateway_event();
        event["headers"] = Value::Null;

        assert_eq!(detect(&event, &registry), Detection::Unknown);
    }

    #[test]
    fn presence_check_ignores_value_types() {
        let registry = Registry::standard();
        let event = json!({
            "headers": false,
            "httpMethod": 0,
            "path": "",
            "requestContext": {"stage": []}
        });

        assert!(detect(&event, &registry).is(API_GATEWAY));
    }

    #[test]
    fn empty_registry_is_unknown() {
        assert_eq!(detect(&api_gateway_event(), &Registry::empty()), Detection::Unknown);
        assert_eq!(detect(&Value::Null, &Registry::empty()), Detection::Unknown);
    }

    #[test]
    fn first_match_wins() {
        let registry = Registry::new(vec![
            EventShape::new("narrow", ["headers", "path"]),
            EventShape::api_gateway(),
        ]);

        assert_eq!(detect(&api_gateway_event(), &registry).name(), "narrow");
    }

    #[test]
    fn shape_without_required_keys_matches_everything() {
        let registry = Registry::new(vec![EventShape::new("anything", Vec::<String>::new())]);

        assert_eq!(detect(&json!(null), &registry).name(), "anything");
        assert_eq!(detect(&json!([1, 2]), &registry).name(), "anything");
    }

    #[test]
    fn match_implies_every_required_key_resolves() {
        let registry = Registry::new(vec![
            EventShape::new("records", ["Records[0].eventSource"]),
            EventShape::api_gateway(),
        ]);
        let events = vec![
            api_gateway_event(),
            json!({"Records": [{"eventSource": "aws:sqs"}]}),
            json!({"Records": []}),
            json!("scalar"),
        ];

        for event in &events {
            if let Detection::Shape(shape) = detect(event, &registry) {
                for key in &shape.required_keys {
                    assert!(resolve(event, key).map(|v| !v.is_null()).unwrap_or(false));
                }
            }
        }
    }

    #[test]
    fn signed_index_does_not_satisfy_required_key() {
        let registry = Registry::new(vec![EventShape::new("records", ["Records.+0.eventSource"])]);
        let event = json!({"Records": [{"eventSource": "aws:sqs"}]});

        assert_eq!(detect(&event, &registry), Detection::Unknown);
    }

    #[test]
    fn detection_is_repeatable() {
        let registry = Registry::standard();
        let event = api_gateway_event();

        assert_eq!(detect(&event, &registry), detect(&event, &registry));
    }
}
