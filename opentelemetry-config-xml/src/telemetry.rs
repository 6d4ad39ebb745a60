//! Minimal telemetry item and context handed to initializers and channels.

use std::time::SystemTime;

use opentelemetry::{Key, KeyValue, Value};

/// Context properties shared by telemetry items.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TelemetryContext {
    properties: Vec<KeyValue>,
}

impl TelemetryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a property, replacing any previous value for the same key.
    pub fn set(&mut self, key: impl Into<Key>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.properties.iter_mut().find(|kv| kv.key == key) {
            Some(existing) => existing.value = value,
            None => self.properties.push(KeyValue::new(key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find(|kv| kv.key.as_str() == key)
            .map(|kv| &kv.value)
    }

    pub fn properties(&self) -> &[KeyValue] {
        &self.properties
    }
}

/// A single telemetry item travelling through the pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct TelemetryItem {
    name: String,
    timestamp: Option<SystemTime>,
    context: TelemetryContext,
}

impl TelemetryItem {
    pub fn new(name: impl Into<String>) -> Self {
        TelemetryItem {
            name: name.into(),
            timestamp: None,
            context: TelemetryContext::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timestamp(&self) -> Option<SystemTime> {
        self.timestamp
    }

    pub fn with_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn set_timestamp(&mut self, timestamp: SystemTime) {
        self.timestamp = Some(timestamp);
    }

    pub fn context(&self) -> &TelemetryContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut TelemetryContext {
        &mut self.context
    }
}
