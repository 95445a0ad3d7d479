//! Stand-ins for the retired `context.iopipe` API.
//!
//! Functions written against IOpipe keep working: labels and metrics become custom attributes
//! on the current trace. Every call logs a deprecation warning.

use crate::agent::TelemetryAgent;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

const DEPRECATION_WARNING: &str = "Use of context.iopipe.* is no longer supported. \
    Record custom attributes through the telemetry agent instead.";

/// Start and end times of a named mark, in ms since the epoch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mark {
    pub start: Option<u64>,
    pub end: Option<u64>,
}

/// The handle passed to the user handler with every invocation.
/// Marks live as long as the handle, i.e. one invocation.
pub struct IoPipe {
    agent: Arc<dyn TelemetryAgent>,
    marks: RefCell<HashMap<String, Mark>>,
}

/// Accessor for `iopipe.mark.start` / `iopipe.mark.end`
pub struct Marks<'a> {
    iopipe: &'a IoPipe,
}

impl IoPipe {
    pub fn new(agent: Arc<dyn TelemetryAgent>) -> Self {
        Self {
            agent,
            marks: RefCell::new(HashMap::new()),
        }
    }

    /// Records `customLabel.<name>` = `name`.
    pub fn label(&self, name: &str) {
        warn!("iopipe.label: {DEPRECATION_WARNING}");
        self.agent
            .add_custom_attribute(&format!("customLabel.{name}"), Value::from(name));
    }

    /// Records `customMetric.<name>` = `value`.
    pub fn metric(&self, name: &str, value: impl Into<Value>) {
        warn!("iopipe.metric: {DEPRECATION_WARNING}");
        self.agent
            .add_custom_attribute(&format!("customMetric.{name}"), value.into());
    }

    pub fn mark(&self) -> Marks<'_> {
        Marks { iopipe: self }
    }

    /// Records `customMetric.<name>` = end time of mark `end` - start time of mark `start`.
    /// Nothing is recorded unless both times are known.
    pub fn measure(&self, name: &str, start: &str, end: &str) {
        warn!("iopipe.measure: {DEPRECATION_WARNING}");

        let duration = {
            let marks = self.marks.borrow();
            let started = marks.get(start).and_then(|m| m.start);
            let ended = marks.get(end).and_then(|m| m.end);
            match (started, ended) {
                (Some(started), Some(ended)) => Some(ended.saturating_sub(started)),
                _ => None,
            }
        };

        match duration {
            Some(duration) if !name.is_empty() => {
                self.agent
                    .add_custom_attribute(&format!("customMetric.{name}"), Value::from(duration));
            }
            _ => {
                warn!("iopipe.measure: cannot measure {name} between marks {start} and {end}");
            }
        }
    }

    /// A copy of the named mark.
    pub fn get_mark(&self, name: &str) -> Option<Mark> {
        self.marks.borrow().get(name).copied()
    }
}

impl<'a> Marks<'a> {
    pub fn start(&self, name: &str) -> Mark {
        let mut marks = self.iopipe.marks.borrow_mut();
        let mark = marks.entry(name.to_string()).or_default();
        mark.start = Some(now_ms());
        *mark
    }

    /// Sets the end time of the mark and measures it against its own start.
    pub fn end(&self, name: &str) {
        {
            let mut marks = self.iopipe.marks.borrow_mut();
            marks.entry(name.to_string()).or_default().end = Some(now_ms());
        }
        self.iopipe.measure(name, name, name);
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
