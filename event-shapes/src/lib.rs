//! Detection of Lambda event source shapes.
//!
//! An event is matched against an ordered [Registry] of [EventShape]s by checking that all
//! required dotted paths resolve to non-null values. The same path resolver is used to pull
//! attribute values out of the payload.
//!
//! ```
//! use event_shapes::{detect, get, Registry};
//! use serde_json::json;
//!
//! let event = json!({
//!     "headers": {},
//!     "httpMethod": "GET",
//!     "path": "/",
//!     "requestContext": {"stage": "prod"}
//! });
//!
//! let registry = Registry::standard();
//! assert_eq!(detect(&event, &registry).name(), "apiGateway");
//! assert_eq!(get(&event, "requestContext.stage", json!(null)), json!("prod"));
//! ```

pub mod classifier;
pub mod path;
pub mod registry;

pub use classifier::{detect, matches, Detection, UNKNOWN};
pub use path::{get, resolve, Path, Segment, MAX_PATH_DEPTH};
pub use registry::{EventShape, Registry, API_GATEWAY};
