//! In-memory telemetry channel installed by default.

use std::{sync::Mutex, time::Duration};

use opentelemetry::{otel_debug, otel_warn};

use crate::{
    component::{Component, TelemetryChannel},
    registry::TypeRegistry,
    telemetry::TelemetryItem,
};

const DEFAULT_ENDPOINT_ADDRESS: &str = "https://dc.services.visualstudio.com/v2/track";
const DEFAULT_MAX_TELEMETRY_BUFFER_CAPACITY: i32 = 500;
const DEFAULT_SENDING_INTERVAL: Duration = Duration::from_secs(30);

/// Buffers telemetry items in memory until they are flushed.
///
/// Items sent while the buffer is full are dropped.
#[derive(Debug)]
pub struct InMemoryChannel {
    developer_mode: Option<bool>,
    endpoint_address: String,
    max_telemetry_buffer_capacity: i32,
    sending_interval: Duration,
    buffer: Mutex<Vec<TelemetryItem>>,
}

impl InMemoryChannel {
    pub fn new() -> Self {
        InMemoryChannel {
            developer_mode: None,
            endpoint_address: DEFAULT_ENDPOINT_ADDRESS.to_string(),
            max_telemetry_buffer_capacity: DEFAULT_MAX_TELEMETRY_BUFFER_CAPACITY,
            sending_interval: DEFAULT_SENDING_INTERVAL,
            buffer: Mutex::new(Vec::new()),
        }
    }

    pub fn with_developer_mode(mut self, developer_mode: bool) -> Self {
        self.developer_mode = Some(developer_mode);
        self
    }

    pub fn with_endpoint_address(mut self, endpoint_address: impl Into<String>) -> Self {
        self.endpoint_address = endpoint_address.into();
        self
    }

    pub fn max_telemetry_buffer_capacity(&self) -> i32 {
        self.max_telemetry_buffer_capacity
    }

    pub fn sending_interval(&self) -> Duration {
        self.sending_interval
    }

    /// Number of buffered items.
    pub fn len(&self) -> usize {
        self.buffer.lock().map(|buffer| buffer.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes and returns all buffered items.
    pub fn flush(&self) -> Vec<TelemetryItem> {
        match self.buffer.lock() {
            Ok(mut buffer) => std::mem::take(&mut *buffer),
            Err(_) => Vec::new(),
        }
    }
}

impl Default for InMemoryChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for InMemoryChannel {
    fn as_telemetry_channel(&self) -> Option<&dyn TelemetryChannel> {
        Some(self)
    }
}

impl TelemetryChannel for InMemoryChannel {
    fn developer_mode(&self) -> Option<bool> {
        self.developer_mode
    }

    fn endpoint_address(&self) -> &str {
        &self.endpoint_address
    }

    fn send(&self, item: TelemetryItem) {
        let Ok(mut buffer) = self.buffer.lock() else {
            otel_warn!(name: "InMemoryChannel.BufferPoisoned", item = item.name());
            return;
        };
        let capacity = usize::try_from(self.max_telemetry_buffer_capacity).unwrap_or(0);
        if buffer.len() >= capacity {
            otel_warn!(
                name: "InMemoryChannel.ItemDropped",
                item = item.name(),
                capacity = self.max_telemetry_buffer_capacity
            );
            return;
        }
        otel_debug!(name: "InMemoryChannel.ItemBuffered", item = item.name());
        buffer.push(item);
    }
}

pub(crate) fn register(registry: &mut TypeRegistry) {
    registry
        .register::<InMemoryChannel>()
        .alias("InMemoryChannel")
        .property("DeveloperMode", |c| &mut c.developer_mode)
        .property("EndpointAddress", |c| &mut c.endpoint_address)
        .property("MaxTelemetryBufferCapacity", |c| {
            &mut c.max_telemetry_buffer_capacity
        })
        .property("SendingInterval", |c| &mut c.sending_interval);
}
