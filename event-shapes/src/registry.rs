use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Name of the API Gateway (REST proxy) event shape.
pub const API_GATEWAY: &str = "apiGateway";

/// A named pattern identifying a class of event payloads.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct EventShape {
    /// E.g. `apiGateway`
    pub name: String,
    /// Dotted paths that must all resolve to a non-null value for the event to match
    pub required_keys: Vec<String>,
    /// Attribute name -> dotted path of the value to record when the event matches.
    /// Written as a JSON object, kept in the order it was written.
    #[serde(default, with = "ordered_pairs")]
    pub attributes: Vec<(String, String)>,
}

impl EventShape {
    pub fn new<N, K, P>(name: N, required_keys: K) -> Self
    where
        N: Into<String>,
        K: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            name: name.into(),
            required_keys: required_keys.into_iter().map(Into::into).collect(),
            attributes: Vec::new(),
        }
    }

    /// Adds an attribute taken from `path` when this shape matches.
    /// Replaces the path of an attribute with the same name.
    pub fn with_attribute(mut self, attribute: impl Into<String>, path: impl Into<String>) -> Self {
        let (attribute, path) = (attribute.into(), path.into());
        match self.attributes.iter_mut().find(|(name, _)| *name == attribute) {
            Some(existing) => existing.1 = path,
            None => self.attributes.push((attribute, path)),
        }
        self
    }

    /// The path recorded under `attribute`, if any.
    pub fn attribute(&self, attribute: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == attribute)
            .map(|(_, path)| path.as_str())
    }

    /// API Gateway REST proxy integration events.
    pub fn api_gateway() -> Self {
        EventShape::new(
            API_GATEWAY,
            ["headers", "httpMethod", "path", "requestContext", "requestContext.stage"],
        )
        .with_attribute("aws.lambda.eventSource.accountId", "requestContext.accountId")
        .with_attribute("aws.lambda.eventSource.apiId", "requestContext.apiId")
        .with_attribute("aws.lambda.eventSource.resourceId", "requestContext.resourceId")
        .with_attribute("aws.lambda.eventSource.resourcePath", "requestContext.resourcePath")
        .with_attribute("aws.lambda.eventSource.stage", "requestContext.stage")
    }
}

/// (De)serializes `Vec<(String, String)>` as a JSON object without reordering the keys.
/// A repeated key keeps its first position and its last value.
mod ordered_pairs {
    use super::*;

    pub fn serialize<S: Serializer>(pairs: &[(String, String)], serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(pairs.len()))?;
        for (key, value) in pairs {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<(String, String)>, D::Error> {
        deserializer.deserialize_map(PairsVisitor)
    }

    struct PairsVisitor;

    impl<'de> Visitor<'de> for PairsVisitor {
        type Value = Vec<(String, String)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an object of attribute names to dotted paths")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut pairs: Vec<(String, String)> = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((key, value)) = access.next_entry::<String, String>()? {
                match pairs.iter_mut().find(|(name, _)| *name == key) {
                    Some(existing) => existing.1 = value,
                    None => pairs.push((key, value)),
                }
            }
            Ok(pairs)
        }
    }
}

/// Known event shapes in the order they are checked. The first full match wins.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct Registry {
    shapes: Vec<EventShape>,
}

impl Registry {
    pub fn new(shapes: Vec<EventShape>) -> Self {
        Self { shapes }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// The shapes recognised out of the box.
    pub fn standard() -> Self {
        Self::new(vec![EventShape::api_gateway()])
    }

    /// Parses a JSON array of shapes, e.g.
    /// `[{"name":"custom","required_keys":["detail.type"],"attributes":{"type":"detail.type"}}]`
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventShape> {
        self.shapes.iter()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}
