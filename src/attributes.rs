use event_shapes::{resolve, Detection, API_GATEWAY};
use serde_json::{Map, Value};
use tracing::debug;

/// Attributes described by the matched shape's attribute map.
/// Paths that are missing or null are skipped.
pub fn event_source_attributes(event: &Value, detection: &Detection) -> Vec<(String, Value)> {
    let shape = match detection.shape() {
        Some(v) => v,
        None => return Vec::new(),
    };

    shape
        .attributes
        .iter()
        .filter_map(|(attribute, path)| match resolve(event, path) {
            Some(v) if !v.is_null() => Some((attribute.clone(), v.clone())),
            _ => None,
        })
        .collect()
}

/// Copies the fields listed in `names` out of the request.
///
/// * API Gateway events: the fields are taken from the JSON-encoded `body`
/// * unknown events: the fields are taken from the top level of the event
/// * any other shape: nothing is copied
pub fn request_attributes(event: &Value, detection: &Detection, names: &[String]) -> Vec<(String, Value)> {
    if names.is_empty() {
        return Vec::new();
    }

    match detection {
        Detection::Shape(_) if detection.is(API_GATEWAY) => match parse_body(event) {
            Some(body) => pick(&body, names),
            None => Vec::new(),
        },
        Detection::Unknown => match event.as_object() {
            Some(fields) => pick(fields, names),
            None => Vec::new(),
        },
        Detection::Shape(_) => Vec::new(),
    }
}

/// Returns the body of an API Gateway event if it is a string holding a JSON object.
fn parse_body(event: &Value) -> Option<Map<String, Value>> {
    let body = event.get("body")?.as_str()?;

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(fields)) => Some(fields),
        Ok(_) => {
            debug!("Request body is not a JSON object");
            None
        }
        Err(e) => {
            debug!("Request body is not JSON: {e}");
            None
        }
    }
}

fn pick(fields: &Map<String, Value>, names: &[String]) -> Vec<(String, Value)> {
    names
        .iter()
        .filter_map(|name| fields.get(name).map(|v| (name.clone(), v.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_shapes::{detect, EventShape, Registry};
    use serde_json::json;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn api_gateway_event(body: Value) -> Value {
        json!({
            "headers": {"content-type": "application/json"},
            "httpMethod": "POST",
            "path": "/orders",
            "requestContext": {
                "stage": "prod",
                "accountId": "123456789012",
                "apiId": "abc123",
                "resourcePath": null
            },
            "body": body
        })
    }

    #[test]
    fn takes_fields_from_api_gateway_body() {
        let registry = Registry::standard();
        let event = api_gateway_event(json!(r#"{"userId": "u-1", "total": 12.5, "other": true}"#));
        let detection = detect(&event, &registry);

        assert_eq!(
            request_attributes(&event, &detection, &names(&["userId", "total", "missing"])),
            vec![("userId".to_string(), json!("u-1")), ("total".to_string(), json!(12.5))]
        );
    }

    #[test]
    fn ignores_api_gateway_body_that_is_not_a_json_object() {
        let registry = Registry::standard();
        let wanted = names(&["userId"]);

        for body in [json!("not json"), json!("[1, 2]"), json!(null), json!({"userId": "u-1"})] {
            let event = api_gateway_event(body);
            let detection = detect(&event, &registry);
            assert!(request_attributes(&event, &detection, &wanted).is_empty());
        }
    }

    #[test]
    fn takes_top_level_fields_from_unknown_events() {
        let registry = Registry::standard();
        let event = json!({"userId": "u-2", "nested": {"userId": "no"}});
        let detection = detect(&event, &registry);

        assert_eq!(
            request_attributes(&event, &detection, &names(&["userId"])),
            vec![("userId".to_string(), json!("u-2"))]
        );
        assert!(request_attributes(&json!([1]), &detection, &names(&["userId"])).is_empty());
    }

    #[test]
    fn other_shapes_copy_nothing() {
        let registry = Registry::new(vec![EventShape::new("custom", ["userId"])]);
        let event = json!({"userId": "u-3"});
        let detection = detect(&event, &registry);

        assert!(request_attributes(&event, &detection, &names(&["userId"])).is_empty());
    }

    #[test]
    fn nothing_without_names() {
        let event = json!({"userId": "u-4"});
        assert!(request_attributes(&event, &Detection::Unknown, &[]).is_empty());
    }

    #[test]
    fn event_source_attributes_skip_missing_and_null() {
        let registry = Registry::standard();
        let event = api_gateway_event(json!("{}"));
        let detection = detect(&event, &registry);

        assert_eq!(
            event_source_attributes(&event, &detection),
            vec![
                ("aws.lambda.eventSource.accountId".to_string(), json!("123456789012")),
                ("aws.lambda.eventSource.apiId".to_string(), json!("abc123")),
                ("aws.lambda.eventSource.stage".to_string(), json!("prod")),
            ]
        );
        assert!(event_source_attributes(&event, &Detection::Unknown).is_empty());
    }
}
